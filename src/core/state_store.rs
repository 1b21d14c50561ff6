use crate::models::error::SError;
use crate::utils::toml::Toml;
use camino::{Utf8Path, Utf8PathBuf};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Durable ModId -> enabled record. Only the activation coordinator writes
/// through it.
pub trait ActivationStore: Send + Sync {
    fn load(&self) -> Result<BTreeMap<String, bool>, SError>;
    fn save(&self, state: &BTreeMap<String, bool>) -> Result<(), SError>;
}

#[derive(Serialize, Deserialize, Default)]
struct ActivationDocument {
    #[serde(default)]
    mods: BTreeMap<String, bool>,
}

/// Stores activation state as a TOML document.
pub struct TomlActivationStore {
    path: Utf8PathBuf,
}

impl TomlActivationStore {
    pub fn new(path: impl Into<Utf8PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Utf8Path {
        &self.path
    }
}

impl ActivationStore for TomlActivationStore {
    /// A missing document is an empty record, not an error.
    fn load(&self) -> Result<BTreeMap<String, bool>, SError> {
        if !self.path.exists() {
            return Ok(BTreeMap::new());
        }
        Toml::read::<ActivationDocument>(&self.path).map(|doc| doc.mods)
    }

    fn save(&self, state: &BTreeMap<String, bool>) -> Result<(), SError> {
        Toml::write(
            &self.path,
            &ActivationDocument {
                mods: state.clone(),
            },
        )
    }
}

/// Keeps activation state in memory only.
#[derive(Default)]
pub struct MemoryActivationStore {
    state: Mutex<BTreeMap<String, bool>>,
}

impl MemoryActivationStore {
    pub fn with_state(state: BTreeMap<String, bool>) -> Self {
        Self {
            state: Mutex::new(state),
        }
    }
}

impl ActivationStore for MemoryActivationStore {
    fn load(&self) -> Result<BTreeMap<String, bool>, SError> {
        Ok(self.state.lock().clone())
    }

    fn save(&self, state: &BTreeMap<String, bool>) -> Result<(), SError> {
        *self.state.lock() = state.clone();
        Ok(())
    }
}
