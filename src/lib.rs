pub mod commands;
pub mod config;
pub mod core;
pub mod logging;
pub mod models;
pub mod utils;

pub use crate::core::catalog::{Catalog, CatalogEntry};
pub use crate::core::engine::ModEngine;
pub use crate::models::error::SError;
pub use crate::models::host::HostVersions;
pub use crate::models::scan::ActivationResult;
