mod common;

use common::*;
use mod_catalog_lib::core::engine::ModEngine;
use mod_catalog_lib::core::state_store::{ActivationStore, MemoryActivationStore};
use mod_catalog_lib::models::diagnostics::Diagnostic;
use mod_catalog_lib::models::error::SError;
use mod_catalog_lib::models::host::HostVersions;
use mod_catalog_lib::utils::context::ScanContext;
use std::collections::BTreeMap;
use std::fs;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Barrier};
use std::thread;

#[test]
fn test_disabling_archive_moves_it_aside() {
    let fx = Fixture::new();
    write_zip(&fx.root, "ruins.zip", &modinfo("ruins", "1.0.0", &[]));
    let engine = fx.engine(HostVersions::default());
    engine.scan().unwrap();

    let result = engine.set_active("ruins", false);
    assert!(result.success, "{:?}", result.error_message);
    assert!(!fx.root.join("ruins.zip").exists());
    assert!(fx.inactive().join("ruins.zip").exists());

    let catalog = engine.snapshot();
    assert_eq!(catalog.is_enabled("ruins"), Some(false));
    assert_eq!(catalog.lookup("ruins").unwrap().source_path, fx.inactive().join("ruins.zip"));

    // A fresh scan reads the state back from placement.
    let catalog = engine.scan().unwrap();
    assert_eq!(catalog.is_enabled("ruins"), Some(false));

    assert!(engine.set_active("ruins", true).success);
    assert!(fx.root.join("ruins.zip").exists());
    assert!(!fx.inactive().join("ruins.zip").exists());
}

#[test]
fn test_folder_state_is_a_persisted_flag() {
    let fx = Fixture::new();
    let dir = write_folder(&fx.root, "tools", &modinfo("tools", "1.0.0", &[]));
    let engine = fx.engine(HostVersions::default());
    engine.scan().unwrap();

    assert!(engine.set_active("tools", false).success);
    assert!(dir.join("modinfo.json").exists());
    assert!(!fx.inactive().exists());
    assert_eq!(engine.persisted().get("tools"), Some(&false));

    // A new session starts from the persisted record.
    drop(engine);
    let reopened = fx.engine(HostVersions::default());
    let catalog = reopened.scan().unwrap();
    assert_eq!(catalog.is_enabled("tools"), Some(false));
}

#[test]
fn test_toggle_is_idempotent() {
    let fx = Fixture::new();
    write_assembly(&fx.root, "Code.dll", &assembly_bytes("Code", "code", "1.0", &[]));
    let engine = fx.engine(HostVersions::default());
    engine.scan().unwrap();

    assert!(engine.set_active("code", false).success);
    let after_first = fs::read_to_string(fx.activation_file()).unwrap();
    let revision = engine.handle().revision();

    assert!(engine.set_active("code", false).success);
    assert_eq!(fs::read_to_string(fx.activation_file()).unwrap(), after_first);
    assert!(fx.inactive().join("Code.dll").exists());
    assert_eq!(engine.handle().revision(), revision);

    assert!(engine.set_active("code", true).success);
    assert!(engine.set_active("code", true).success);
    assert!(fx.root.join("Code.dll").exists());
}

#[test]
fn test_failed_move_leaves_state_untouched() {
    let fx = Fixture::new();
    write_zip(&fx.root, "ruins.zip", &modinfo("ruins", "1.0.0", &[]));
    let engine = fx.engine(HostVersions::default());
    engine.scan().unwrap();

    // A plain file where the inactive directory should go blocks the move.
    fs::write(fx.inactive(), "in the way").unwrap();
    let before = engine.snapshot();

    let result = engine.set_active("ruins", false);
    assert!(!result.success);
    assert!(result.error_message.unwrap().contains("ruins"));
    assert_eq!(engine.snapshot(), before);
    assert_eq!(engine.snapshot().is_enabled("ruins"), Some(true));
    assert!(fx.root.join("ruins.zip").exists());
    assert!(!fx.activation_file().exists());

    fs::remove_file(fx.inactive()).unwrap();
    assert!(engine.set_active("ruins", false).success);
    assert_eq!(engine.snapshot().is_enabled("ruins"), Some(false));
}

struct FlakyStore {
    inner: MemoryActivationStore,
    fail: AtomicBool,
}

impl ActivationStore for FlakyStore {
    fn load(&self) -> Result<BTreeMap<String, bool>, SError> {
        self.inner.load()
    }

    fn save(&self, state: &BTreeMap<String, bool>) -> Result<(), SError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(SError::IOError("disk full".into()));
        }
        self.inner.save(state)
    }
}

#[test]
fn test_failed_persist_rolls_back_the_move() {
    let fx = Fixture::new();
    write_zip(&fx.root, "ruins.zip", &modinfo("ruins", "1.0.0", &[]));
    let store = Arc::new(FlakyStore {
        inner: MemoryActivationStore::default(),
        fail: AtomicBool::new(true),
    });
    let engine = ModEngine::open(&fx.root, store.clone(), HostVersions::default()).unwrap();
    engine.scan().unwrap();

    let result = engine.set_active("ruins", false);
    assert!(!result.success);
    assert!(result.error_message.unwrap().contains("disk full"));
    assert!(fx.root.join("ruins.zip").exists());
    assert!(!fx.inactive().join("ruins.zip").exists());
    assert!(engine.persisted().is_empty());
    assert_eq!(engine.snapshot().is_enabled("ruins"), Some(true));

    store.fail.store(false, Ordering::SeqCst);
    assert!(engine.set_active("ruins", false).success);
    assert_eq!(store.inner.load().unwrap().get("ruins"), Some(&false));
}

#[test]
fn test_unknown_and_unusable_packages_are_rejected() {
    let fx = Fixture::new();
    write_folder(&fx.root, "broken", "not json");
    let engine = fx.engine(HostVersions::default());
    engine.scan().unwrap();

    let missing = engine.set_active("ghost", false);
    assert!(!missing.success);
    assert!(missing.error_message.unwrap().contains("ghost"));

    let broken = engine.set_active("broken", false);
    assert!(!broken.success);
    assert_eq!(engine.snapshot().is_enabled("broken"), Some(true));
}

#[test]
fn test_toggle_updates_dependents_without_cascading() {
    let fx = Fixture::new();
    write_zip(&fx.root, "lib.zip", &modinfo("lib", "1.0.0", &[]));
    write_folder(&fx.root, "app", &modinfo("app", "1.0.0", &[("lib", "1.0.0")]));
    let engine = fx.engine(HostVersions::default());
    let catalog = engine.scan().unwrap();
    assert!(catalog.diagnostics("app").unwrap().is_ok());

    assert!(engine.set_active("lib", false).success);
    let catalog = engine.snapshot();
    assert_eq!(catalog.is_enabled("app"), Some(true));
    assert_eq!(
        catalog.diagnostics("app").unwrap().0,
        vec![Diagnostic::MissingDependency {
            target: "lib".into()
        }]
    );

    assert!(engine.set_active("lib", true).success);
    assert!(engine.snapshot().diagnostics("app").unwrap().is_ok());
}

#[test]
fn test_same_id_requests_never_interleave() {
    let fx = Fixture::new();
    write_zip(&fx.root, "ruins.zip", &modinfo("ruins", "1.0.0", &[]));
    let engine = fx.engine(HostVersions::default());
    engine.scan().unwrap();

    let barrier = Arc::new(Barrier::new(8));
    let handles: Vec<_> = (0..8)
        .map(|i| {
            let engine = engine.clone();
            let barrier = barrier.clone();
            thread::spawn(move || {
                barrier.wait();
                engine.set_active("ruins", i % 2 == 0)
            })
        })
        .collect();
    for handle in handles {
        assert!(handle.join().unwrap().success);
    }

    let enabled = engine.snapshot().is_enabled("ruins").unwrap();
    let active = fx.root.join("ruins.zip").exists();
    let inactive = fx.inactive().join("ruins.zip").exists();
    assert!(active ^ inactive);
    assert_eq!(active, enabled);
    assert_eq!(engine.persisted().get("ruins").copied().unwrap_or(true), enabled);
}

#[test]
fn test_listeners_see_every_replacement() {
    let fx = Fixture::new();
    write_folder(&fx.root, "a", &modinfo("a", "1.0.0", &[]));
    let engine = fx.engine(HostVersions::default());

    let seen = Arc::new(AtomicUsize::new(0));
    let counter = seen.clone();
    engine.subscribe(move |catalog| {
        assert!(catalog.lookup("a").is_some());
        counter.fetch_add(1, Ordering::SeqCst);
    });

    engine.scan().unwrap();
    engine.set_active("a", false);
    engine.set_active("a", false);
    assert_eq!(seen.load(Ordering::SeqCst), 2);
}

#[test]
fn test_cancelled_scan_publishes_nothing() {
    let fx = Fixture::new();
    for i in 0..4 {
        write_folder(&fx.root, &format!("m{i}"), &modinfo(&format!("m{i}"), "1.0.0", &[]));
    }
    let engine = fx.engine(HostVersions::default());

    let ctx = ScanContext::new();
    ctx.cancel();
    let err = engine.scan_with(&ctx).unwrap_err();
    assert_eq!(err, SError::Cancelled);
    assert!(engine.snapshot().is_empty());
    assert_eq!(engine.handle().revision(), 0);
}

#[test]
fn test_progress_reaches_total() {
    let fx = Fixture::new();
    for i in 0..3 {
        write_zip(&fx.root, &format!("z{i}.zip"), &modinfo(&format!("z{i}"), "1.0.0", &[]));
    }
    let engine = fx.engine(HostVersions::default());

    let last = Arc::new(AtomicUsize::new(0));
    let sink = last.clone();
    let ctx = ScanContext::new().with_progress(move |p| {
        assert_eq!(p.total, 3);
        sink.fetch_max(p.done, Ordering::SeqCst);
    });
    engine.scan_with(&ctx).unwrap();
    assert_eq!(last.load(Ordering::SeqCst), 3);
}

#[test]
fn test_toggle_during_scan_is_not_lost() {
    let fx = Fixture::new();
    write_zip(&fx.root, "ruins.zip", &modinfo("ruins", "1.0.0", &[]));
    let engine = fx.engine(HostVersions::default());
    engine.scan().unwrap();

    // The scan observes the archive in the active location, then a toggle
    // completes before the scan publishes.
    let toggled = Arc::new(AtomicBool::new(false));
    let ctx = {
        let engine = engine.clone();
        let toggled = toggled.clone();
        ScanContext::new().with_progress(move |p| {
            if p.done == p.total && !toggled.swap(true, Ordering::SeqCst) {
                assert!(engine.set_active("ruins", false).success);
            }
        })
    };

    let catalog = engine.scan_with(&ctx).unwrap();
    assert!(toggled.load(Ordering::SeqCst));
    assert_eq!(catalog.is_enabled("ruins"), Some(false));
    assert_eq!(
        catalog.lookup("ruins").unwrap().source_path,
        fx.inactive().join("ruins.zip")
    );
}

#[test]
fn test_cancel_during_extraction_keeps_previous_snapshot() {
    let fx = Fixture::new();
    for i in 0..3 {
        write_zip(&fx.root, &format!("z{i}.zip"), &modinfo(&format!("z{i}"), "1.0.0", &[]));
    }
    let engine = fx.engine(HostVersions::default());
    let before = engine.scan().unwrap();
    let revision = engine.handle().revision();

    for i in 3..8 {
        write_zip(&fx.root, &format!("z{i}.zip"), &modinfo(&format!("z{i}"), "1.0.0", &[]));
    }
    let ctx = ScanContext::new();
    let canceller = ctx.clone();
    let ctx = ctx.with_progress(move |p| {
        if p.done >= 1 {
            canceller.cancel();
        }
    });

    let err = engine.scan_with(&ctx).unwrap_err();
    assert_eq!(err, SError::Cancelled);
    assert_eq!(engine.handle().revision(), revision);
    assert_eq!(engine.snapshot(), before);
    assert!(engine.snapshot().lookup("z7").is_none());
}

#[test]
fn test_disabled_duplicate_stays_the_winner_after_rescan() {
    let fx = Fixture::new();
    write_zip(&fx.root, "a_copy.zip", &modinfo("shared", "1.0.0", &[]));
    write_zip(&fx.root, "b_copy.zip", &modinfo("shared", "1.1.0", &[]));
    let engine = fx.engine(HostVersions::default());

    let catalog = engine.scan().unwrap();
    assert_eq!(catalog.lookup("shared").unwrap().source_path, fx.root.join("b_copy.zip"));

    assert!(engine.set_active("shared", false).success);
    assert!(fx.inactive().join("b_copy.zip").exists());

    let catalog = engine.scan().unwrap();
    assert_eq!(catalog.is_enabled("shared"), Some(false));
    assert_eq!(
        catalog.lookup("shared").unwrap().source_path,
        fx.inactive().join("b_copy.zip")
    );
    assert_eq!(catalog.shadowed().len(), 1);
    assert_eq!(catalog.shadowed()[0].source_path, fx.root.join("a_copy.zip"));

    assert!(engine.set_active("shared", true).success);
    let catalog = engine.scan().unwrap();
    assert_eq!(catalog.is_enabled("shared"), Some(true));
    assert_eq!(catalog.lookup("shared").unwrap().source_path, fx.root.join("b_copy.zip"));
}
