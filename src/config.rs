use crate::models::error::SError;
use crate::models::host::HostVersions;
use crate::models::paths::DataPaths;
use camino::Utf8PathBuf;
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

const APP_NAME: &str = "mod_catalog";
const CONFIG_NAME: &str = "settings";

/// Settings persisted between runs.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct EngineSettings {
    pub version: u8,
    pub packages_root: Option<Utf8PathBuf>,
    #[serde(default)]
    pub host: HostVersions,
    /// Overrides the located data directory when set.
    pub data_dir: Option<Utf8PathBuf>,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            version: 1,
            packages_root: None,
            host: HostVersions::default(),
            data_dir: None,
        }
    }
}

impl EngineSettings {
    pub fn load() -> Result<EngineSettings, SError> {
        Ok(confy::load(APP_NAME, CONFIG_NAME)?)
    }

    pub fn save(&self) -> Result<(), SError> {
        Ok(confy::store(APP_NAME, CONFIG_NAME, self)?)
    }

    /// Files under the configured or located data directory.
    pub fn data_paths(&self) -> DataPaths {
        let base = self
            .data_dir
            .clone()
            .unwrap_or_else(DataDirLocator::locate);
        DataPaths::new(&base)
    }
}

/// Resolves the per-user application data directory.
pub struct DataDirLocator;

impl DataDirLocator {
    pub fn locate() -> Utf8PathBuf {
        ProjectDirs::from("com", "modcatalog", APP_NAME)
            .and_then(|dirs| Utf8PathBuf::try_from(dirs.data_dir().to_path_buf()).ok())
            .or_else(|| {
                std::env::current_exe()
                    .ok()
                    .and_then(|exe| exe.parent().map(|p| p.to_path_buf()))
                    .and_then(|dir| Utf8PathBuf::try_from(dir).ok())
            })
            .unwrap_or_else(|| Utf8PathBuf::from("."))
    }
}
