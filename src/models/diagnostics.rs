use derive_more::Display;
use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Display, Clone, Debug, PartialEq, Eq)]
pub enum Diagnostic {
    #[display("missing dependency '{target}'")]
    MissingDependency { target: String },
    #[display("'{target}' requires {required}, found {found}")]
    VersionMismatch {
        target: String,
        required: String,
        found: String,
    },
    #[display("duplicate mod id, shadowed by another package")]
    DuplicateModId,
    #[display("unparsable metadata: {_0}")]
    Unparsable(String),
}

/// Every finding for one package. Empty means `Ok`.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq, Default)]
pub struct Diagnostics(pub Vec<Diagnostic>);

impl Diagnostics {
    pub fn ok() -> Self {
        Self::default()
    }

    pub fn is_ok(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Vec<Diagnostic>> for Diagnostics {
    fn from(v: Vec<Diagnostic>) -> Self {
        Self(v)
    }
}
