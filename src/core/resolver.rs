use crate::core::catalog::Catalog;
use crate::core::version::{normalize, satisfies};
use crate::models::diagnostics::{Diagnostic, Diagnostics};
use crate::models::host::HostVersions;
use crate::models::mod_dto::{DependencyConstraint, PackageRecord};
use std::collections::BTreeMap;
use tracing::debug;

/// Computes per-package diagnostics. Presence and version are checked for
/// each declared dependency independently, so cycles need no special care.
pub struct DependencyResolver<'a> {
    host: &'a HostVersions,
}

impl<'a> DependencyResolver<'a> {
    pub fn new(host: &'a HostVersions) -> Self {
        Self { host }
    }

    /// Returns `catalog` with one diagnostics entry per listed ModId.
    pub fn resolve(&self, catalog: &Catalog) -> Catalog {
        let diagnostics: BTreeMap<String, Diagnostics> = catalog
            .records
            .iter()
            .map(|(id, record)| (id.clone(), self.diagnose(record, catalog)))
            .collect();

        let failing = diagnostics.values().filter(|d| !d.is_ok()).count();
        debug!("Resolved {} packages, {failing} with findings", diagnostics.len());

        Catalog {
            diagnostics,
            ..catalog.clone()
        }
    }

    /// Every finding for one package; failing constraints are all reported.
    pub fn diagnose(&self, record: &PackageRecord, catalog: &Catalog) -> Diagnostics {
        if let Some(reason) = &record.parse_error {
            return vec![Diagnostic::Unparsable(reason.clone())].into();
        }

        record
            .dependencies
            .iter()
            .filter_map(|constraint| self.check(constraint, catalog))
            .collect::<Vec<_>>()
            .into()
    }

    fn check(&self, constraint: &DependencyConstraint, catalog: &Catalog) -> Option<Diagnostic> {
        let found = if HostVersions::is_virtual(&constraint.target) {
            normalize(self.host.version_of(&constraint.target))
        } else {
            // A disabled package is as good as absent for its dependents.
            let target = catalog
                .lookup(&constraint.target)
                .filter(|_| catalog.is_enabled(&constraint.target).unwrap_or(false));
            let Some(target) = target else {
                return Some(Diagnostic::MissingDependency {
                    target: constraint.target.clone(),
                });
            };
            target.normalized_version.clone()
        };

        if satisfies(found.as_deref(), constraint) {
            return None;
        }

        Some(Diagnostic::VersionMismatch {
            target: constraint.target.clone(),
            required: constraint.min_version.clone().unwrap_or_default(),
            found: found.unwrap_or_default(),
        })
    }
}

pub fn resolve(catalog: &Catalog, host: &HostVersions) -> Catalog {
    DependencyResolver::new(host).resolve(catalog)
}
