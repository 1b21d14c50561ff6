use derive_more::Display;
use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Display, Debug, Clone, PartialEq, Eq)]
pub enum SError {
    /// The packages root itself cannot be read; the whole scan is aborted.
    #[display("Packages root is not accessible: {_0}")]
    ScanFatal(String),
    /// A single entry could not be read during a scan.
    #[display("Skipped '{path}': {reason}")]
    CandidateSkipped { path: String, reason: String },
    #[display("Parse error: {_0}")]
    ParseError(String),
    #[display("Failed to toggle '{id}': {reason}")]
    ActivationIo { id: String, reason: String },
    #[display("Mod not found: {_0}")]
    ModNotFound(String),
    #[display("Mod '{id}' cannot be activated: {reason}")]
    NotActivatable { id: String, reason: String },
    #[display("Scan cancelled")]
    Cancelled,
    #[display("IO error: {_0}")]
    IOError(String),
    #[display("Config error: {_0}")]
    ConfigError(String),
    #[display("Async runtime error: {_0}")]
    AsyncRuntimeError(String),
}

impl std::error::Error for SError {}

impl From<std::io::Error> for SError {
    fn from(e: std::io::Error) -> Self {
        SError::IOError(e.to_string())
    }
}

impl From<serde_json::Error> for SError {
    fn from(e: serde_json::Error) -> Self {
        SError::ParseError(e.to_string())
    }
}

impl From<zip::result::ZipError> for SError {
    fn from(e: zip::result::ZipError) -> Self {
        SError::ParseError(e.to_string())
    }
}

impl From<toml::de::Error> for SError {
    fn from(e: toml::de::Error) -> Self {
        SError::ParseError(e.to_string())
    }
}

impl From<toml::ser::Error> for SError {
    fn from(e: toml::ser::Error) -> Self {
        SError::ParseError(e.to_string())
    }
}

impl From<confy::ConfyError> for SError {
    fn from(e: confy::ConfyError) -> Self {
        SError::ConfigError(e.to_string())
    }
}

impl From<camino::FromPathBufError> for SError {
    fn from(e: camino::FromPathBufError) -> Self {
        SError::ParseError(format!("Invalid UTF-8 path: {}", e.as_path().display()))
    }
}
