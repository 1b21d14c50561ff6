use camino::Utf8PathBuf;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Physical form of a discovered package.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SourceKind {
    Folder,
    ZipArchive,
    Assembly,
}

impl SourceKind {
    /// Whether toggling moves the artifact between the active and inactive
    /// locations. Kinds that don't relocate only flip the persisted flag.
    pub fn relocates_on_toggle(self) -> bool {
        match self {
            SourceKind::Folder => false,
            SourceKind::ZipArchive | SourceKind::Assembly => true,
        }
    }
}

/// Where a package is meaningful.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum Side {
    Client,
    Server,
    #[default]
    Both,
}

impl Side {
    /// Parses the free-form side text found in metadata. `Universal` is an
    /// accepted spelling of `Both`.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "client" => Some(Side::Client),
            "server" => Some(Side::Server),
            "both" | "universal" => Some(Side::Both),
            _ => None,
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct DependencyConstraint {
    pub target: String,
    /// Version text as declared, kept for display.
    pub raw_version: String,
    /// Normalized minimum; `None` means any version satisfies.
    pub min_version: Option<String>,
    pub exact: bool,
}

impl DependencyConstraint {
    pub fn any(target: impl Into<String>) -> Self {
        Self {
            target: target.into(),
            raw_version: String::new(),
            min_version: None,
            exact: false,
        }
    }

    pub fn at_least(target: impl Into<String>, version: &str) -> Self {
        Self {
            target: target.into(),
            raw_version: version.to_string(),
            min_version: crate::core::version::normalize(Some(version)),
            exact: false,
        }
    }

    pub fn exactly(target: impl Into<String>, version: &str) -> Self {
        Self {
            exact: true,
            ..Self::at_least(target, version)
        }
    }
}

/// One discovered mod, replaced wholesale on every scan.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct PackageRecord {
    pub mod_id: String,
    pub name: Option<String>,
    pub description: Option<String>,
    pub website: Option<String>,
    pub raw_version: Option<String>,
    pub normalized_version: Option<String>,
    pub raw_network_version: Option<String>,
    pub network_version: Option<String>,
    pub source_kind: SourceKind,
    pub source_path: Utf8PathBuf,
    pub authors: Vec<String>,
    pub contributors: Vec<String>,
    pub dependencies: Vec<DependencyConstraint>,
    pub side: Side,
    pub required_on_client: Option<bool>,
    pub required_on_server: Option<bool>,
    pub parse_error: Option<String>,
}

impl PackageRecord {
    /// A record that only occupies catalog space so the operator can see
    /// the broken package.
    pub fn unusable(
        mod_id: impl Into<String>,
        source_kind: SourceKind,
        source_path: Utf8PathBuf,
        reason: impl Into<String>,
    ) -> Self {
        Self {
            mod_id: mod_id.into(),
            name: None,
            description: None,
            website: None,
            raw_version: None,
            normalized_version: None,
            raw_network_version: None,
            network_version: None,
            source_kind,
            source_path,
            authors: Vec::new(),
            contributors: Vec::new(),
            dependencies: Vec::new(),
            side: Side::default(),
            required_on_client: None,
            required_on_server: None,
            parse_error: Some(reason.into()),
        }
    }

    pub fn display_name(&self) -> &str {
        self.name
            .as_deref()
            .filter(|n| !n.trim().is_empty())
            .unwrap_or(&self.mod_id)
    }

    pub fn is_usable(&self) -> bool {
        self.parse_error.is_none()
    }
}

/// The `modinfo.json` document. Keys are lower-cased before deserializing so
/// `ModID`, `modId` and `modid` are all accepted.
#[derive(Deserialize, Clone, Debug, Default)]
pub struct ModInfoDocument {
    #[serde(default)]
    pub modid: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub website: Option<String>,
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub networkversion: Option<String>,
    #[serde(default)]
    pub authors: StringList,
    #[serde(default)]
    pub contributors: StringList,
    #[serde(default)]
    pub side: Option<String>,
    #[serde(default)]
    pub requiredonclient: Option<bool>,
    #[serde(default)]
    pub requiredonserver: Option<bool>,
    #[serde(default)]
    pub dependencies: BTreeMap<String, String>,
}

/// Accepts either a JSON array of strings or a single string.
#[derive(Deserialize, Clone, Debug, Default, PartialEq)]
#[serde(untagged)]
pub enum StringList {
    #[default]
    None,
    One(String),
    Many(Vec<String>),
}

impl StringList {
    pub fn into_vec(self) -> Vec<String> {
        match self {
            StringList::None => Vec::new(),
            StringList::One(s) => vec![s],
            StringList::Many(v) => v,
        }
    }
}
