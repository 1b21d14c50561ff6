use crate::models::error::SError;
use crate::models::mod_dto::SourceKind;
use crate::models::paths::{
    has_extension, PackagesRootPaths, ARCHIVE_EXTENSIONS, ASSEMBLY_EXTENSIONS, METADATA_FILE,
};
use crate::models::scan::{Candidate, Placement};
use camino::{Utf8Path, Utf8PathBuf};
use std::fs;
use tracing::debug;
use walkdir::WalkDir;

pub struct SourceScanner;

/// Candidates found under a packages root, plus entries that had to be
/// skipped. Skips are data for the caller to log, never a failure.
#[derive(Debug, Default)]
pub struct Discovery {
    pub candidates: Vec<Candidate>,
    pub skipped: Vec<SError>,
}

impl SourceScanner {
    /// Enumerates the immediate children of `root` and of its inactive
    /// directory and classifies each one.
    ///
    /// Only an inaccessible `root` is fatal.
    pub fn scan(root: &Utf8Path) -> Result<Discovery, SError> {
        let entries = fs::read_dir(root).map_err(|e| SError::ScanFatal(format!("{root}: {e}")))?;
        let paths = PackagesRootPaths::new(root);
        let mut discovery = Discovery::default();

        Self::classify_entries(entries, Placement::Active, &paths, &mut discovery);

        // The inactive directory is optional; it appears after the first disable.
        match fs::read_dir(&paths.inactive) {
            Ok(entries) => {
                Self::classify_entries(entries, Placement::Inactive, &paths, &mut discovery)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => discovery.skipped.push(SError::CandidateSkipped {
                path: paths.inactive.to_string(),
                reason: e.to_string(),
            }),
        }

        // read_dir order is platform dependent; later-wins duplicate handling needs a stable order.
        discovery
            .candidates
            .sort_by(|a, b| a.placement_rank().cmp(&b.placement_rank()).then(a.path.cmp(&b.path)));

        debug!(
            "Discovered {} candidates under {root} ({} skipped)",
            discovery.candidates.len(),
            discovery.skipped.len()
        );
        Ok(discovery)
    }

    fn classify_entries(
        entries: fs::ReadDir,
        placement: Placement,
        paths: &PackagesRootPaths,
        discovery: &mut Discovery,
    ) {
        for entry in entries {
            let path = match entry.map_err(SError::from).and_then(|e| {
                Utf8PathBuf::try_from(e.path()).map_err(SError::from)
            }) {
                Ok(path) => path,
                Err(e) => {
                    debug!("Skipping unreadable entry: {e}");
                    discovery.skipped.push(SError::CandidateSkipped {
                        path: String::new(),
                        reason: e.to_string(),
                    });
                    continue;
                }
            };

            if path == paths.inactive {
                continue;
            }

            match Self::classify(&path, placement) {
                Some(Ok(candidate)) => discovery.candidates.push(candidate),
                Some(Err(e)) => discovery.skipped.push(e),
                None => debug!("Ignoring {path}"),
            }
        }
    }

    /// Classifies one entry. `None` means "not a package", which is not
    /// reported at all.
    pub fn classify(path: &Utf8Path, placement: Placement) -> Option<Result<Candidate, SError>> {
        Self::process_as_directory(path, placement)
            .or_else(|| Self::process_as_file(path, placement, ARCHIVE_EXTENSIONS, SourceKind::ZipArchive))
            .or_else(|| Self::process_as_file(path, placement, ASSEMBLY_EXTENSIONS, SourceKind::Assembly))
    }

    /// Strategy A: a directory with the metadata document at its top level.
    /// Folders never relocate, so only the active location is considered.
    fn process_as_directory(path: &Utf8Path, placement: Placement) -> Option<Result<Candidate, SError>> {
        if placement != Placement::Active {
            return None;
        }
        let meta = match fs::metadata(path) {
            Ok(meta) => meta,
            Err(e) => return Some(Err(Self::skipped(path, e))),
        };
        if !meta.is_dir() {
            return None;
        }

        match Self::find_metadata_file(path) {
            Ok(Some(_)) => Some(Ok(Candidate {
                path: path.to_owned(),
                kind: SourceKind::Folder,
                placement,
            })),
            Ok(None) => None,
            Err(e) => Some(Err(Self::skipped(path, e))),
        }
    }

    /// Strategy B: a regular file with a recognized extension.
    fn process_as_file(
        path: &Utf8Path,
        placement: Placement,
        extensions: &[&str],
        kind: SourceKind,
    ) -> Option<Result<Candidate, SError>> {
        if !has_extension(path, extensions) {
            return None;
        }
        match fs::metadata(path) {
            Ok(meta) if meta.is_file() => Some(Ok(Candidate {
                path: path.to_owned(),
                kind,
                placement,
            })),
            Ok(_) => None,
            Err(e) => Some(Err(Self::skipped(path, e))),
        }
    }

    /// Finds the metadata document in `dir`, matching its name case-insensitively.
    pub fn find_metadata_file(dir: &Utf8Path) -> std::io::Result<Option<Utf8PathBuf>> {
        let exact = dir.join(METADATA_FILE);
        if exact.is_file() {
            return Ok(Some(exact));
        }

        // An unreadable directory is an error here, not an empty listing.
        fs::read_dir(dir)?;
        Ok(WalkDir::new(dir)
            .min_depth(1)
            .max_depth(1)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
            .filter_map(|e| e.file_name().to_str().map(str::to_string))
            .find(|name| name.eq_ignore_ascii_case(METADATA_FILE))
            .map(|name| dir.join(name)))
    }

    fn skipped(path: &Utf8Path, e: std::io::Error) -> SError {
        debug!("Skipping {path}: {e}");
        SError::CandidateSkipped {
            path: path.to_string(),
            reason: e.to_string(),
        }
    }
}

impl Candidate {
    /// Inactive candidates sort first, so under later-wins an active copy
    /// takes precedence over an inactive one with the same id.
    fn placement_rank(&self) -> u8 {
        match self.placement {
            Placement::Inactive => 0,
            Placement::Active => 1,
        }
    }
}
