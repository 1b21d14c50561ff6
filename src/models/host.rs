use serde::{Deserialize, Serialize};

/// Mod id standing for the running host application.
pub const HOST_MOD_ID: &str = "game";
/// Mod id standing for the optional companion ruleset shipped with the host.
pub const COMPANION_MOD_ID: &str = "survival";

/// Versions of the virtual dependency targets, supplied by whoever knows
/// which host build is installed. An empty or unparsable version is
/// unknown and satisfies every constraint.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct HostVersions {
    pub game: String,
    #[serde(default)]
    pub survival: Option<String>,
}

impl HostVersions {
    pub fn new(game: impl Into<String>) -> Self {
        Self {
            game: game.into(),
            survival: None,
        }
    }

    pub fn with_companion(mut self, version: impl Into<String>) -> Self {
        self.survival = Some(version.into());
        self
    }

    pub fn is_virtual(mod_id: &str) -> bool {
        mod_id == HOST_MOD_ID || mod_id == COMPANION_MOD_ID
    }

    /// Raw version text reported for a virtual target.
    pub fn version_of(&self, mod_id: &str) -> Option<&str> {
        match mod_id {
            HOST_MOD_ID => Some(self.game.as_str()),
            COMPANION_MOD_ID => self.survival.as_deref(),
            _ => None,
        }
    }
}

impl Default for HostVersions {
    fn default() -> Self {
        Self::new(String::new())
    }
}
