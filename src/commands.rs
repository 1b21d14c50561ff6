use crate::core::catalog::Catalog;
use crate::core::engine::ModEngine;
use crate::models::catalog_dto::PackageView;
use crate::models::error::SError;
use crate::models::scan::ActivationResult;
use crate::utils::context::ScanContext;
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::spawn_blocking;
use tracing::{debug, error, info};

/// Runs a blocking engine operation off the async runtime.
async fn blocking<F, R>(f: F) -> Result<R, SError>
where
    F: FnOnce() -> R + Send + 'static,
    R: Send + 'static,
{
    spawn_blocking(f)
        .await
        .map_err(|e| SError::AsyncRuntimeError(e.to_string()))
}

pub async fn scan(engine: Arc<ModEngine>, ctx: ScanContext) -> Result<Vec<PackageView>, SError> {
    info!("Starting scan of {}", engine.root());
    let catalog = blocking(move || engine.scan_with(&ctx)).await??;
    Ok(package_views(&catalog))
}

pub async fn list(engine: Arc<ModEngine>) -> Vec<PackageView> {
    package_views(&engine.snapshot())
}

pub async fn set_active(engine: Arc<ModEngine>, mod_id: String, enabled: bool) -> ActivationResult {
    debug!("set_active {mod_id} -> {enabled}");
    match blocking(move || engine.set_active(&mod_id, enabled)).await {
        Ok(result) => result,
        Err(e) => {
            error!("Toggle task failed: {e}");
            ActivationResult::failed(e.to_string())
        }
    }
}

/// A receiver that always holds the latest published catalog.
pub fn watch_catalog(engine: &ModEngine) -> watch::Receiver<Arc<Catalog>> {
    let (tx, rx) = watch::channel(engine.snapshot());
    engine.subscribe(move |catalog| {
        // Closed receivers are fine; the engine outlives any single watcher.
        let _ = tx.send(catalog.clone());
    });
    rx
}

pub fn package_views(catalog: &Catalog) -> Vec<PackageView> {
    catalog.entries().iter().map(PackageView::from).collect()
}
