use crate::core::catalog::Catalog;
use crate::core::resolver::DependencyResolver;
use crate::models::host::HostVersions;
use crate::models::scan::ScannedPackage;
use camino::Utf8PathBuf;
use parking_lot::{Mutex, ReentrantMutex, RwLock};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tracing::debug;

pub type CatalogListener = Box<dyn Fn(&Arc<Catalog>) + Send + Sync>;

/// The single published catalog. Readers clone the `Arc` and always see a
/// complete snapshot; writers replace it under the lock.
pub struct CatalogHandle {
    published: Mutex<Published>,
    listeners: RwLock<Vec<CatalogListener>>,
    /// Held from swap until the last listener returns, so notifications
    /// arrive in publish order. Reentrant: a listener may publish again.
    notify: ReentrantMutex<()>,
}

struct Published {
    catalog: Arc<Catalog>,
    revision: u64,
    /// Revision at which each id's last toggle was published.
    toggled_at: HashMap<String, u64>,
    host: HostVersions,
}

impl CatalogHandle {
    pub fn new(catalog: Catalog) -> Self {
        Self::with_host(catalog, HostVersions::default())
    }

    pub fn with_host(catalog: Catalog, host: HostVersions) -> Self {
        Self {
            published: Mutex::new(Published {
                catalog: Arc::new(catalog),
                revision: 0,
                toggled_at: HashMap::new(),
                host,
            }),
            listeners: RwLock::new(Vec::new()),
            notify: ReentrantMutex::new(()),
        }
    }

    pub fn snapshot(&self) -> Arc<Catalog> {
        self.published.lock().catalog.clone()
    }

    /// Incremented on every replacement.
    pub fn revision(&self) -> u64 {
        self.published.lock().revision
    }

    /// Host versions the current snapshot was resolved against.
    pub fn host(&self) -> HostVersions {
        self.published.lock().host.clone()
    }

    /// Registers a hook fired after every replacement with the new snapshot.
    /// Hooks run on the publishing thread, in publish order.
    pub fn subscribe<F>(&self, listener: F)
    where
        F: Fn(&Arc<Catalog>) + Send + Sync + 'static,
    {
        self.listeners.write().push(Box::new(listener));
    }

    /// Publishes a scan that started at `base_revision`.
    ///
    /// Ids toggled after the scan started keep their toggled state and path,
    /// since the scan may have observed the artifact before it moved.
    pub(crate) fn publish_scan(
        &self,
        base_revision: u64,
        scanned: Vec<ScannedPackage>,
        persisted: &BTreeMap<String, bool>,
    ) -> Arc<Catalog> {
        self.replace(|published, _| {
            let current = &published.catalog;
            let mut merged = current.merge_scan(scanned, persisted);

            let recent = published
                .toggled_at
                .iter()
                .filter(|(_, at)| **at > base_revision)
                .map(|(id, _)| id);
            for id in recent {
                let (Some(state), Some(record)) = (current.is_enabled(id), current.lookup(id)) else {
                    continue;
                };
                if merged.lookup(id).is_none() {
                    continue;
                }
                debug!("Keeping in-flight toggle of {id} over scan observation");
                merged = merged
                    .with_activation(id, state)
                    .with_source_path(id, record.source_path.clone());
            }

            DependencyResolver::new(&published.host).resolve(&merged)
        })
    }

    /// Applies a completed toggle onto whatever snapshot is current now.
    pub(crate) fn publish_toggle(
        &self,
        mod_id: &str,
        enabled: bool,
        new_path: Option<Utf8PathBuf>,
    ) -> Arc<Catalog> {
        self.replace(|published, revision| {
            published.toggled_at.insert(mod_id.to_string(), revision);
            let mut next = published.catalog.with_activation(mod_id, enabled);
            if let Some(path) = new_path {
                next = next.with_source_path(mod_id, path);
            }
            DependencyResolver::new(&published.host).resolve(&next)
        })
    }

    /// Swaps in new host versions and re-resolves under the same lock, so no
    /// publish can resolve against a stale host.
    pub(crate) fn publish_host(&self, host: HostVersions) -> Arc<Catalog> {
        self.replace(|published, _| {
            published.host = host;
            DependencyResolver::new(&published.host).resolve(&published.catalog)
        })
    }

    /// Applies a pure transformation to the current snapshot.
    pub(crate) fn publish_with<F>(&self, f: F) -> Arc<Catalog>
    where
        F: FnOnce(&Catalog) -> Catalog,
    {
        self.replace(|published, _| f(&published.catalog))
    }

    fn replace<F>(&self, f: F) -> Arc<Catalog>
    where
        F: FnOnce(&mut Published, u64) -> Catalog,
    {
        let _sequenced = self.notify.lock();

        let snapshot = {
            let mut published = self.published.lock();
            let revision = published.revision + 1;
            let next = Arc::new(f(&mut published, revision));
            published.catalog = next.clone();
            published.revision = revision;
            next
        };

        for listener in self.listeners.read_recursive().iter() {
            listener(&snapshot);
        }
        snapshot
    }
}

impl Default for CatalogHandle {
    fn default() -> Self {
        Self::new(Catalog::default())
    }
}
