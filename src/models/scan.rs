use crate::models::mod_dto::{PackageRecord, SourceKind};
use camino::Utf8PathBuf;
use serde::{Deserialize, Serialize};

/// Which of the two physical locations an artifact was found in.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub enum Placement {
    Active,
    Inactive,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Candidate {
    pub path: Utf8PathBuf,
    pub kind: SourceKind,
    pub placement: Placement,
}

/// An extracted record plus the activation state its placement implies.
#[derive(Clone, Debug)]
pub struct ScannedPackage {
    pub record: PackageRecord,
    /// `Some` for relocating kinds, whose placement is authoritative.
    pub observed_enabled: Option<bool>,
}

impl ScannedPackage {
    pub fn new(record: PackageRecord, placement: Placement) -> Self {
        let observed_enabled = record
            .source_kind
            .relocates_on_toggle()
            .then_some(placement == Placement::Active);
        Self {
            record,
            observed_enabled,
        }
    }
}

/// Outcome of one `set_active` request, as shown by a presentation layer.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct ActivationResult {
    pub success: bool,
    pub error_message: Option<String>,
}

impl ActivationResult {
    pub fn ok() -> Self {
        Self {
            success: true,
            error_message: None,
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            success: false,
            error_message: Some(message.into()),
        }
    }
}
