use crate::models::error::SError;
use camino::Utf8Path;

pub struct Toml;

impl Toml {
    /// Writes `data` next to `path` first and renames it into place, so a
    /// reader never sees a half-written document.
    pub fn write<T: serde::Serialize>(path: &Utf8Path, data: &T) -> Result<(), SError> {
        let text = toml::to_string(data).map_err(|e| SError::ParseError(e.to_string()))?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let tmp = path.with_extension("toml.tmp");
        std::fs::write(&tmp, text).map_err(|e| SError::IOError(e.to_string()))?;
        std::fs::rename(&tmp, path).map_err(|e| {
            let _ = std::fs::remove_file(&tmp);
            SError::IOError(e.to_string())
        })
    }

    pub fn read<T: serde::de::DeserializeOwned>(path: &Utf8Path) -> Result<T, SError> {
        let s = std::fs::read_to_string(path).map_err(|e| SError::IOError(e.to_string()))?;
        toml::from_str::<T>(&s).map_err(|e| SError::ParseError(e.to_string()))
    }
}
