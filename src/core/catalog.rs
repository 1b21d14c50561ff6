use crate::models::diagnostics::{Diagnostic, Diagnostics};
use crate::models::mod_dto::PackageRecord;
use crate::models::overlay::ModDbInfo;
use crate::models::scan::ScannedPackage;
use camino::Utf8PathBuf;
use std::collections::BTreeMap;

/// Immutable snapshot of every installed package, its activation state and
/// its diagnostics. Every change produces a new value.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Catalog {
    pub(crate) records: BTreeMap<String, PackageRecord>,
    pub(crate) activation: BTreeMap<String, bool>,
    pub(crate) diagnostics: BTreeMap<String, Diagnostics>,
    /// Packages that lost a ModId collision.
    pub(crate) shadowed: Vec<PackageRecord>,
    pub(crate) overlay: BTreeMap<String, ModDbInfo>,
}

/// One listed package with everything a presentation layer shows for it.
#[derive(Clone, Debug, PartialEq)]
pub struct CatalogEntry<'a> {
    pub record: &'a PackageRecord,
    pub enabled: bool,
    pub diagnostics: Diagnostics,
    pub overlay: Option<&'a ModDbInfo>,
    pub shadowed: bool,
}

impl Catalog {
    pub fn builder() -> CatalogBuilder {
        CatalogBuilder::default()
    }

    pub fn lookup(&self, mod_id: &str) -> Option<&PackageRecord> {
        self.records.get(mod_id)
    }

    /// Every listed package, shadowed duplicates included, ordered by display
    /// name (case-insensitive) then ModId.
    pub fn all(&self) -> Vec<&PackageRecord> {
        self.entries().into_iter().map(|e| e.record).collect()
    }

    pub fn entries(&self) -> Vec<CatalogEntry<'_>> {
        let shadowed = self.shadowed.iter().map(|record| CatalogEntry {
            record,
            enabled: self.is_enabled(&record.mod_id).unwrap_or(false),
            diagnostics: vec![Diagnostic::DuplicateModId].into(),
            overlay: None,
            shadowed: true,
        });

        let winners = self.records.values().map(|record| CatalogEntry {
            record,
            enabled: self.is_enabled(&record.mod_id).unwrap_or(false),
            diagnostics: self.diagnostics.get(&record.mod_id).cloned().unwrap_or_default(),
            overlay: self.overlay.get(&record.mod_id),
            shadowed: false,
        });

        let mut entries: Vec<_> = shadowed.chain(winners).collect();
        // Stable sort keeps shadowed copies ahead of the winner they lost to.
        entries.sort_by_cached_key(|e| {
            (
                e.record.display_name().to_lowercase(),
                e.record.mod_id.clone(),
            )
        });
        entries
    }

    pub fn is_enabled(&self, mod_id: &str) -> Option<bool> {
        self.activation.get(mod_id).copied()
    }

    pub fn diagnostics(&self, mod_id: &str) -> Option<&Diagnostics> {
        self.diagnostics.get(mod_id)
    }

    pub fn overlay(&self, mod_id: &str) -> Option<&ModDbInfo> {
        self.overlay.get(mod_id)
    }

    pub fn shadowed(&self) -> &[PackageRecord] {
        &self.shadowed
    }

    pub fn activation(&self) -> &BTreeMap<String, bool> {
        &self.activation
    }

    pub fn len(&self) -> usize {
        self.records.len() + self.shadowed.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn enabled_count(&self) -> usize {
        self.activation.values().filter(|enabled| **enabled).count()
    }

    /// Returns a copy with one package's state changed. Unknown ids leave the
    /// catalog as it is. Touches nothing on disk.
    pub fn with_activation(&self, mod_id: &str, enabled: bool) -> Catalog {
        let mut next = self.clone();
        if let Some(state) = next.activation.get_mut(mod_id) {
            *state = enabled;
        }
        next
    }

    /// Merges fresh records from a scan. Existing state is kept for ids that
    /// are still present; new ids start enabled.
    pub fn with_scan_results(&self, records: Vec<PackageRecord>) -> Catalog {
        let scanned = records
            .into_iter()
            .map(|record| ScannedPackage {
                record,
                observed_enabled: None,
            })
            .collect();
        self.merge_scan(scanned, &BTreeMap::new())
    }

    /// Full merge used by the engine.
    ///
    /// State precedence per id: placement observed on disk, then the state in
    /// this catalog, then `persisted`, then enabled. Ids that disappeared lose
    /// their state and overlay. Later packages win ModId collisions, unless
    /// an earlier one sits where this catalog's winner for that id sits, so a
    /// toggled duplicate keeps winning after it moves.
    pub fn merge_scan(
        &self,
        scanned: Vec<ScannedPackage>,
        persisted: &BTreeMap<String, bool>,
    ) -> Catalog {
        let mut records: BTreeMap<String, PackageRecord> = BTreeMap::new();
        let mut observed: BTreeMap<String, Option<bool>> = BTreeMap::new();
        let mut shadowed = Vec::new();

        for ScannedPackage {
            record,
            observed_enabled,
        } in scanned
        {
            let keeps_previous = records.get(&record.mod_id).is_some_and(|previous| {
                self.is_published_winner(previous) && !self.is_published_winner(&record)
            });
            if keeps_previous {
                shadowed.push(record);
                continue;
            }

            observed.insert(record.mod_id.clone(), observed_enabled);
            if let Some(previous) = records.insert(record.mod_id.clone(), record) {
                shadowed.push(previous);
            }
        }

        let activation = records
            .keys()
            .map(|id| {
                let enabled = observed
                    .get(id)
                    .copied()
                    .flatten()
                    .or_else(|| self.activation.get(id).copied())
                    .or_else(|| persisted.get(id).copied())
                    .unwrap_or(true);
                (id.clone(), enabled)
            })
            .collect();

        let diagnostics = records
            .keys()
            .map(|id| (id.clone(), Diagnostics::ok()))
            .collect();

        let overlay = self
            .overlay
            .iter()
            .filter(|(id, _)| records.contains_key(*id))
            .map(|(id, info)| (id.clone(), info.clone()))
            .collect();

        Catalog {
            records,
            activation,
            diagnostics,
            shadowed,
            overlay,
        }
    }

    /// Attaches remote database information for the listed ids that exist.
    pub fn with_overlay(&self, overlay: BTreeMap<String, ModDbInfo>) -> Catalog {
        let mut next = self.clone();
        for (id, info) in overlay {
            if next.records.contains_key(&id) {
                next.overlay.insert(id, info);
            }
        }
        next
    }

    fn is_published_winner(&self, record: &PackageRecord) -> bool {
        self.records
            .get(&record.mod_id)
            .is_some_and(|winner| winner.source_path == record.source_path)
    }

    pub(crate) fn with_source_path(&self, mod_id: &str, path: Utf8PathBuf) -> Catalog {
        let mut next = self.clone();
        if let Some(record) = next.records.get_mut(mod_id) {
            record.source_path = path;
        }
        next
    }
}

/// Assembles a catalog directly from typed parts, for fixtures and embedders
/// that already hold diagnostics or overlay data.
#[derive(Default)]
pub struct CatalogBuilder {
    catalog: Catalog,
}

impl CatalogBuilder {
    pub fn record(mut self, record: PackageRecord, enabled: bool) -> Self {
        let id = record.mod_id.clone();
        if let Some(previous) = self.catalog.records.insert(id.clone(), record) {
            self.catalog.shadowed.push(previous);
        }
        self.catalog.activation.insert(id.clone(), enabled);
        self.catalog.diagnostics.entry(id).or_default();
        self
    }

    pub fn diagnostics(mut self, mod_id: &str, diagnostics: Diagnostics) -> Self {
        if self.catalog.records.contains_key(mod_id) {
            self.catalog.diagnostics.insert(mod_id.to_string(), diagnostics);
        }
        self
    }

    pub fn overlay(mut self, mod_id: &str, info: ModDbInfo) -> Self {
        if self.catalog.records.contains_key(mod_id) {
            self.catalog.overlay.insert(mod_id.to_string(), info);
        }
        self
    }

    pub fn build(self) -> Catalog {
        self.catalog
    }
}
