use crate::config::EngineSettings;
use crate::core::activation::ActivationCoordinator;
use crate::core::catalog::Catalog;
use crate::core::extractor::MetadataExtractor;
use crate::core::registry::CatalogHandle;
use crate::core::scanner::SourceScanner;
use crate::core::state_store::{ActivationStore, TomlActivationStore};
use crate::models::error::SError;
use crate::models::host::HostVersions;
use crate::models::overlay::ModDbInfo;
use crate::models::scan::{ActivationResult, ScannedPackage};
use crate::utils::context::{ScanContext, ScanProgress};
use camino::{Utf8Path, Utf8PathBuf};
use rayon::prelude::*;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tracing::{info, instrument, warn};

/// Owns the published catalog for one packages root and every operation
/// that replaces it.
pub struct ModEngine {
    root: Utf8PathBuf,
    handle: Arc<CatalogHandle>,
    coordinator: ActivationCoordinator,
}

impl ModEngine {
    /// Opens an engine over `root`. Nothing is scanned yet; the published
    /// catalog starts empty.
    pub fn open(
        root: &Utf8Path,
        store: Arc<dyn ActivationStore>,
        host: HostVersions,
    ) -> Result<Self, SError> {
        let root = canonical_root(root);
        let coordinator = ActivationCoordinator::new(&root, store)?;
        Ok(Self {
            root,
            handle: Arc::new(CatalogHandle::with_host(Catalog::default(), host)),
            coordinator,
        })
    }

    /// Opens the engine described by persisted settings, storing activation
    /// state in the data directory.
    pub fn from_settings(settings: &EngineSettings) -> Result<Self, SError> {
        let root = settings
            .packages_root
            .as_deref()
            .ok_or_else(|| SError::ConfigError("packages_root is not set".into()))?;
        let data = settings.data_paths();
        if let Some(parent) = data.activation.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let store = Arc::new(TomlActivationStore::new(data.activation));
        Self::open(root, store, settings.host.clone())
    }

    pub fn root(&self) -> &Utf8Path {
        &self.root
    }

    pub fn handle(&self) -> Arc<CatalogHandle> {
        self.handle.clone()
    }

    pub fn snapshot(&self) -> Arc<Catalog> {
        self.handle.snapshot()
    }

    pub fn scan(&self) -> Result<Arc<Catalog>, SError> {
        self.scan_with(&ScanContext::new())
    }

    /// Rescans the root and publishes the merged, resolved catalog. A
    /// cancelled scan publishes nothing.
    #[instrument(skip(self, ctx), fields(root = %self.root))]
    pub fn scan_with(&self, ctx: &ScanContext) -> Result<Arc<Catalog>, SError> {
        let base_revision = self.handle.revision();
        let scanned = scan_packages(&self.root, ctx)?;
        ctx.check()?;

        let catalog =
            self.handle
                .publish_scan(base_revision, scanned, &self.coordinator.persisted());

        info!(
            "Scan complete: {} packages, {} enabled, {} shadowed",
            catalog.len(),
            catalog.enabled_count(),
            catalog.shadowed().len()
        );
        Ok(catalog)
    }

    pub fn set_active(&self, mod_id: &str, enabled: bool) -> ActivationResult {
        self.coordinator.set_active(&self.handle, mod_id, enabled)
    }

    pub fn subscribe<F>(&self, listener: F)
    where
        F: Fn(&Arc<Catalog>) + Send + Sync + 'static,
    {
        self.handle.subscribe(listener);
    }

    /// Attaches remote database information. Diagnostics are untouched.
    pub fn apply_overlay(&self, overlay: BTreeMap<String, ModDbInfo>) -> Arc<Catalog> {
        self.handle.publish_with(|current| current.with_overlay(overlay))
    }

    /// Replaces the host versions and re-resolves the current catalog.
    pub fn set_host_versions(&self, host: HostVersions) -> Arc<Catalog> {
        self.handle.publish_host(host)
    }

    pub fn host_versions(&self) -> HostVersions {
        self.handle.host()
    }

    pub fn persisted(&self) -> BTreeMap<String, bool> {
        self.coordinator.persisted()
    }
}

/// Discovers and extracts every package under `root`, one candidate per
/// worker. Returns `Cancelled` as soon as `ctx` is cancelled.
pub fn scan_packages(root: &Utf8Path, ctx: &ScanContext) -> Result<Vec<ScannedPackage>, SError> {
    let discovery = SourceScanner::scan(root)?;
    for skipped in &discovery.skipped {
        warn!("Skipped candidate: {skipped}");
    }
    ctx.check()?;

    let total = discovery.candidates.len();
    let done = AtomicUsize::new(0);
    ctx.emit(ScanProgress { done: 0, total });

    // Collecting into Result keeps candidate order, which duplicate handling relies on.
    discovery
        .candidates
        .par_iter()
        .map(|candidate| {
            ctx.check()?;
            let record = MetadataExtractor::extract(candidate);
            let done = done.fetch_add(1, Ordering::SeqCst) + 1;
            ctx.emit(ScanProgress { done, total });
            Ok(ScannedPackage::new(record, candidate.placement))
        })
        .collect()
}

fn canonical_root(root: &Utf8Path) -> Utf8PathBuf {
    dunce::canonicalize(root)
        .ok()
        .and_then(|p| Utf8PathBuf::try_from(p).ok())
        .unwrap_or_else(|| root.to_path_buf())
}
