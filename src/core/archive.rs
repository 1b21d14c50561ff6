use crate::models::error::SError;
use crate::models::paths::METADATA_FILE;
use camino::Utf8Path;
use std::fs::File;
use std::io::Read;

pub struct Archive;

/// Upper bound on the metadata document we are willing to inflate.
const MAX_METADATA_BYTES: u64 = 1024 * 1024;

impl Archive {
    /// Reads the metadata document out of a zip archive without extracting
    /// anything else.
    ///
    /// The document is looked up at the archive root first, then inside a
    /// single top-level folder (a common packaging mistake). Returns
    /// `Ok(None)` when the archive has no metadata document.
    pub fn read_metadata(archive_path: &Utf8Path) -> Result<Option<String>, SError> {
        // 1. Open the archive; a corrupt archive surfaces as a ParseError
        let file = File::open(archive_path)?;
        let mut archive = zip::ZipArchive::new(file)?;

        // 2. Locate the entry by name only, nothing is decompressed yet
        let Some(index) = Self::find_metadata_entry(&mut archive) else {
            return Ok(None);
        };

        // 3. Inflate just that entry
        let mut entry = archive.by_index(index)?;
        if entry.size() > MAX_METADATA_BYTES {
            return Err(SError::ParseError(format!(
                "{METADATA_FILE} is too large ({} bytes)",
                entry.size()
            )));
        }

        let mut raw = Vec::with_capacity(entry.size() as usize);
        entry.read_to_end(&mut raw)?;
        String::from_utf8(raw)
            .map(Some)
            .map_err(|e| SError::ParseError(format!("{METADATA_FILE} is not UTF-8: {e}")))
    }

    fn find_metadata_entry<R: Read + std::io::Seek>(archive: &mut zip::ZipArchive<R>) -> Option<usize> {
        let mut nested = None;

        for i in 0..archive.len() {
            let Ok(entry) = archive.by_index_raw(i) else {
                continue;
            };
            if entry.is_dir() {
                continue;
            }
            // Security: only trust names that stay inside the archive
            let Some(path) = entry.enclosed_name() else {
                continue;
            };

            let depth = path.components().count();
            let is_metadata = path
                .file_name()
                .and_then(|n| n.to_str())
                .map(|n| n.eq_ignore_ascii_case(METADATA_FILE))
                .unwrap_or(false);

            match (is_metadata, depth) {
                (true, 1) => return Some(i),
                (true, 2) if nested.is_none() => nested = Some(i),
                _ => {}
            }
        }

        nested
    }
}
