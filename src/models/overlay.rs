use serde::{Deserialize, Serialize};

/// Remote mod-database information attached to a package for display.
/// Dependency resolution never reads it.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
pub struct ModDbInfo {
    pub latest_version: Option<String>,
    pub compatible_host_version: Option<String>,
    pub install_url: Option<String>,
}
