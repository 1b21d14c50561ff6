pub mod catalog_dto;
pub mod diagnostics;
pub mod error;
pub mod host;
pub mod mod_dto;
pub mod overlay;
pub mod paths;
pub mod scan;
