use crate::core::registry::CatalogHandle;
use crate::core::state_store::ActivationStore;
use crate::models::error::SError;
use crate::models::mod_dto::PackageRecord;
use crate::models::paths::PackagesRootPaths;
use crate::models::scan::ActivationResult;
use crate::utils::thread::KeyedFifoLock;
use camino::{Utf8Path, Utf8PathBuf};
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::fs;
use std::sync::Arc;
use tracing::{info, instrument, warn};

/// Applies activation changes to disk, the persisted record and the
/// published catalog, in that order. Requests for the same ModId run one at
/// a time in arrival order.
pub struct ActivationCoordinator {
    root: Utf8PathBuf,
    paths: PackagesRootPaths,
    store: Arc<dyn ActivationStore>,
    persisted: Mutex<BTreeMap<String, bool>>,
    locks: KeyedFifoLock,
}

/// A rename that already happened and must be undone if persisting fails.
struct Relocation {
    from: Utf8PathBuf,
    to: Utf8PathBuf,
}

impl ActivationCoordinator {
    pub fn new(root: &Utf8Path, store: Arc<dyn ActivationStore>) -> Result<Self, SError> {
        let persisted = store.load()?;
        Ok(Self {
            root: root.to_path_buf(),
            paths: PackagesRootPaths::new(root),
            store,
            persisted: Mutex::new(persisted),
            locks: KeyedFifoLock::new(),
        })
    }

    /// The last successfully written activation record.
    pub fn persisted(&self) -> BTreeMap<String, bool> {
        self.persisted.lock().clone()
    }

    #[instrument(skip(self, handle))]
    pub fn set_active(&self, handle: &CatalogHandle, mod_id: &str, enabled: bool) -> ActivationResult {
        let _turn = self.locks.acquire(mod_id);

        match self.apply(handle, mod_id, enabled) {
            Ok(()) => ActivationResult::ok(),
            Err(e) => {
                warn!("Could not set {mod_id} to enabled={enabled}: {e}");
                ActivationResult::failed(e.to_string())
            }
        }
    }

    fn apply(&self, handle: &CatalogHandle, mod_id: &str, enabled: bool) -> Result<(), SError> {
        // 1. Validate against the current snapshot
        let snapshot = handle.snapshot();
        let record = snapshot
            .lookup(mod_id)
            .ok_or_else(|| SError::ModNotFound(mod_id.to_string()))?;
        if let Some(reason) = &record.parse_error {
            return Err(SError::NotActivatable {
                id: mod_id.to_string(),
                reason: reason.clone(),
            });
        }
        if snapshot.is_enabled(mod_id) == Some(enabled) {
            return Ok(());
        }

        // 2. Move the artifact if its kind is toggled by placement
        let relocation = if record.source_kind.relocates_on_toggle() {
            Some(self.relocate(record, enabled)?)
        } else {
            None
        };

        // 3. Persist, undoing the move on failure
        if let Err(e) = self.persist(mod_id, enabled) {
            if let Some(moved) = &relocation {
                if let Err(undo) = fs::rename(&moved.to, &moved.from) {
                    warn!("Could not move {} back to {}: {undo}", moved.to, moved.from);
                }
            }
            return Err(e);
        }

        // 4. Publish
        handle.publish_toggle(mod_id, enabled, relocation.map(|r| r.to));
        info!("{} {mod_id}", if enabled { "Enabled" } else { "Disabled" });
        Ok(())
    }

    fn relocate(&self, record: &PackageRecord, enabled: bool) -> Result<Relocation, SError> {
        let io_error = |reason: String| SError::ActivationIo {
            id: record.mod_id.clone(),
            reason,
        };

        let from = record.source_path.clone();
        let file_name = from
            .file_name()
            .ok_or_else(|| io_error(format!("{from} has no file name")))?;
        let to = self.paths.placement_for(&self.root, file_name, enabled);

        if to.exists() {
            return Err(io_error(format!("{to} already exists")));
        }
        if !enabled {
            fs::create_dir_all(&self.paths.inactive)
                .map_err(|e| io_error(format!("{}: {e}", self.paths.inactive)))?;
        }
        fs::rename(&from, &to).map_err(|e| io_error(format!("{from} -> {to}: {e}")))?;

        Ok(Relocation { from, to })
    }

    fn persist(&self, mod_id: &str, enabled: bool) -> Result<(), SError> {
        let mut persisted = self.persisted.lock();
        let previous = persisted.insert(mod_id.to_string(), enabled);

        if let Err(e) = self.store.save(&persisted) {
            match previous {
                Some(state) => persisted.insert(mod_id.to_string(), state),
                None => persisted.remove(mod_id),
            };
            return Err(SError::ActivationIo {
                id: mod_id.to_string(),
                reason: e.to_string(),
            });
        }
        Ok(())
    }
}
