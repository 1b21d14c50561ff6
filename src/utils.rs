pub mod context;
pub mod thread;
pub mod toml;
