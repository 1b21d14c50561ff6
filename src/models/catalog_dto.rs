use crate::core::catalog::CatalogEntry;
use crate::models::mod_dto::{Side, SourceKind};
use crate::models::overlay::ModDbInfo;
use camino::Utf8PathBuf;
use serde::{Deserialize, Serialize};

/// Owned, serializable view of one listed package.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct PackageView {
    pub mod_id: String,
    pub name: String,
    pub version: Option<String>,
    pub kind: SourceKind,
    pub side: Side,
    pub path: Utf8PathBuf,
    pub enabled: bool,
    pub shadowed: bool,
    pub parse_error: Option<String>,
    pub diagnostics: Vec<String>,
    pub overlay: Option<ModDbInfo>,
}

impl From<&CatalogEntry<'_>> for PackageView {
    fn from(entry: &CatalogEntry<'_>) -> Self {
        let record = entry.record;
        Self {
            mod_id: record.mod_id.clone(),
            name: record.display_name().to_string(),
            version: record
                .normalized_version
                .clone()
                .or_else(|| record.raw_version.clone()),
            kind: record.source_kind,
            side: record.side,
            path: record.source_path.clone(),
            enabled: entry.enabled,
            shadowed: entry.shadowed,
            parse_error: record.parse_error.clone(),
            diagnostics: entry.diagnostics.iter().map(|d| d.to_string()).collect(),
            overlay: entry.overlay.cloned(),
        }
    }
}
