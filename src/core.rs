pub mod activation;
pub mod archive;
pub mod assembly;
pub mod catalog;
pub mod engine;
pub mod extractor;
pub mod registry;
pub mod resolver;
pub mod scanner;
pub mod state_store;
pub mod version;
