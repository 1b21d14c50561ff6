use crate::core::archive::Archive;
use crate::core::assembly::{self, AssemblyMetadata};
use crate::core::scanner::SourceScanner;
use crate::core::version::normalize;
use crate::models::error::SError;
use crate::models::mod_dto::{
    DependencyConstraint, ModInfoDocument, PackageRecord, Side, SourceKind,
};
use crate::models::paths::METADATA_FILE;
use crate::models::scan::Candidate;
use camino::Utf8Path;
use serde_json::Value;
use tracing::debug;

pub struct MetadataExtractor;

impl MetadataExtractor {
    /// Builds the record for one candidate. Never fails: any problem is
    /// recorded in `parse_error` and the package keeps a derived id so it
    /// stays visible.
    pub fn extract(candidate: &Candidate) -> PackageRecord {
        let result = match candidate.kind {
            SourceKind::Folder => Self::read_folder_document(&candidate.path),
            SourceKind::ZipArchive => Archive::read_metadata(&candidate.path),
            SourceKind::Assembly => {
                return assembly::read_assembly_metadata(&candidate.path)
                    .map(|meta| Self::from_assembly(meta, candidate))
                    .unwrap_or_else(|e| Self::unusable(candidate, e));
            }
        }
        .and_then(|text| text.ok_or_else(|| SError::ParseError(format!("{METADATA_FILE} not found"))))
        .and_then(|text| Self::parse_document(&text))
        .and_then(|doc| Self::from_document(doc, candidate));

        result.unwrap_or_else(|e| Self::unusable(candidate, e))
    }

    fn read_folder_document(dir: &Utf8Path) -> Result<Option<String>, SError> {
        match SourceScanner::find_metadata_file(dir)? {
            Some(path) => Ok(Some(std::fs::read_to_string(path)?)),
            None => Ok(None),
        }
    }

    /// Parses a metadata document, matching top-level keys case-insensitively.
    pub fn parse_document(text: &str) -> Result<ModInfoDocument, SError> {
        let value: Value = serde_json::from_str(text.trim_start_matches('\u{feff}'))?;
        let Value::Object(map) = value else {
            return Err(SError::ParseError(format!("{METADATA_FILE} is not a JSON object")));
        };

        let lowered = map
            .into_iter()
            .map(|(k, v)| (k.to_ascii_lowercase(), v))
            .collect::<serde_json::Map<_, _>>();
        Ok(serde_json::from_value(Value::Object(lowered))?)
    }

    fn from_document(doc: ModInfoDocument, candidate: &Candidate) -> Result<PackageRecord, SError> {
        let mod_id = doc
            .modid
            .as_deref()
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .ok_or_else(|| SError::ParseError("missing required field 'modid'".into()))?
            .to_string();

        let dependencies = doc
            .dependencies
            .iter()
            .map(|(target, text)| Self::dependency_from_text(target, text))
            .collect();

        Ok(PackageRecord {
            mod_id,
            normalized_version: normalize(doc.version.as_deref()),
            raw_version: doc.version,
            network_version: normalize(doc.networkversion.as_deref()),
            raw_network_version: doc.networkversion,
            name: doc.name,
            description: doc.description,
            website: doc.website,
            source_kind: candidate.kind,
            source_path: candidate.path.clone(),
            authors: doc.authors.into_vec(),
            contributors: doc.contributors.into_vec(),
            dependencies,
            side: doc.side.as_deref().and_then(Side::parse).unwrap_or_default(),
            required_on_client: doc.requiredonclient,
            required_on_server: doc.requiredonserver,
            parse_error: None,
        })
    }

    fn from_assembly(meta: AssemblyMetadata, candidate: &Candidate) -> PackageRecord {
        let info = &meta.info;
        let version = info.named_str("Version").map(str::to_string);
        let network = info.named_str("NetworkVersion").map(str::to_string);

        PackageRecord {
            mod_id: meta.mod_id().to_string(),
            name: Some(meta.display_name().to_string()),
            description: info.named_str("Description").map(str::to_string),
            website: info.named_str("Website").map(str::to_string),
            normalized_version: normalize(version.as_deref()),
            raw_version: version,
            network_version: normalize(network.as_deref()),
            raw_network_version: network,
            source_kind: candidate.kind,
            source_path: candidate.path.clone(),
            authors: info.named_list("Authors"),
            contributors: info.named_list("Contributors"),
            dependencies: meta
                .dependencies
                .iter()
                .map(|(target, text)| Self::dependency_from_text(target, text))
                .collect(),
            side: info.named_str("Side").and_then(Side::parse).unwrap_or_default(),
            required_on_client: info.named_bool("RequiredOnClient"),
            required_on_server: info.named_bool("RequiredOnServer"),
            parse_error: None,
        }
    }

    /// Interprets declared version text: empty or `*` means any version, a
    /// leading `=` asks for an exact match.
    pub fn dependency_from_text(target: &str, text: &str) -> DependencyConstraint {
        let trimmed = text.trim();
        let (exact, version) = match trimmed.strip_prefix('=') {
            Some(rest) => (true, rest.trim()),
            None => (false, trimmed),
        };

        if version.is_empty() || version == "*" {
            return DependencyConstraint {
                raw_version: text.to_string(),
                ..DependencyConstraint::any(target)
            };
        }

        DependencyConstraint {
            target: target.to_string(),
            raw_version: text.to_string(),
            min_version: normalize(Some(version)),
            exact,
        }
    }

    /// Id used when the metadata can't supply one: the artifact's file name.
    pub fn fallback_id(path: &Utf8Path) -> String {
        path.file_name().unwrap_or(path.as_str()).to_string()
    }

    fn unusable(candidate: &Candidate, e: SError) -> PackageRecord {
        let reason = match e {
            SError::ParseError(reason) | SError::IOError(reason) => reason,
            other => other.to_string(),
        };
        debug!("Unusable package at {}: {reason}", candidate.path);
        PackageRecord::unusable(
            Self::fallback_id(&candidate.path),
            candidate.kind,
            candidate.path.clone(),
            reason,
        )
    }
}
