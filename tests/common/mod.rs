#![allow(dead_code)]

use camino::{Utf8Path, Utf8PathBuf};
use mod_catalog_lib::core::assembly::{AttributeBlob, NamedValue};
use mod_catalog_lib::core::engine::ModEngine;
use mod_catalog_lib::core::state_store::TomlActivationStore;
use mod_catalog_lib::models::host::HostVersions;
use serde_json::json;
use std::fs;
use std::io::Write;
use std::sync::Arc;
use tempfile::TempDir;
use zip::write::SimpleFileOptions;

/// A packages root and a data directory inside one temp dir.
pub struct Fixture {
    _tmp: TempDir,
    pub root: Utf8PathBuf,
    pub data: Utf8PathBuf,
}

impl Fixture {
    pub fn new() -> Self {
        let tmp = tempfile::tempdir().unwrap();
        let base = Utf8PathBuf::from_path_buf(tmp.path().to_path_buf()).unwrap();
        let base = Utf8PathBuf::from_path_buf(dunce::canonicalize(&base).unwrap()).unwrap();

        let root = base.join("Mods");
        let data = base.join("data");
        fs::create_dir_all(&root).unwrap();
        fs::create_dir_all(&data).unwrap();

        Self {
            _tmp: tmp,
            root,
            data,
        }
    }

    pub fn activation_file(&self) -> Utf8PathBuf {
        self.data.join("activation.toml")
    }

    pub fn engine(&self, host: HostVersions) -> Arc<ModEngine> {
        let store = Arc::new(TomlActivationStore::new(self.activation_file()));
        Arc::new(ModEngine::open(&self.root, store, host).unwrap())
    }

    pub fn inactive(&self) -> Utf8PathBuf {
        self.root.join("_inactive")
    }
}

/// A `modinfo.json` body with the given dependencies.
pub fn modinfo(id: &str, version: &str, deps: &[(&str, &str)]) -> String {
    let deps: serde_json::Map<String, serde_json::Value> = deps
        .iter()
        .map(|(target, v)| (target.to_string(), json!(v)))
        .collect();
    json!({
        "type": "code",
        "modid": id,
        "name": format!("Mod {id}"),
        "version": version,
        "authors": ["tester"],
        "dependencies": deps,
    })
    .to_string()
}

pub fn write_folder(dir: &Utf8Path, name: &str, document: &str) -> Utf8PathBuf {
    let path = dir.join(name);
    fs::create_dir_all(&path).unwrap();
    fs::write(path.join("modinfo.json"), document).unwrap();
    fs::write(path.join("readme.txt"), "not metadata").unwrap();
    path
}

/// Writes a zip with `document` stored under `entry_name`.
pub fn write_zip_entry(dir: &Utf8Path, file_name: &str, entry_name: &str, document: &str) -> Utf8PathBuf {
    fs::create_dir_all(dir).unwrap();
    let path = dir.join(file_name);
    let file = fs::File::create(&path).unwrap();
    let mut zip = zip::ZipWriter::new(file);
    let options = SimpleFileOptions::default();

    zip.start_file("assets/readme.txt", options).unwrap();
    zip.write_all(b"padding").unwrap();
    zip.start_file(entry_name, options).unwrap();
    zip.write_all(document.as_bytes()).unwrap();
    zip.finish().unwrap();
    path
}

pub fn write_zip(dir: &Utf8Path, file_name: &str, document: &str) -> Utf8PathBuf {
    write_zip_entry(dir, file_name, "modinfo.json", document)
}

/// A minimal image carrying a package attribute plus dependency attributes.
pub fn assembly_bytes(name: &str, id: &str, version: &str, deps: &[(&str, &str)]) -> Vec<u8> {
    let info = AttributeBlob {
        fixed: vec![name.to_string(), id.to_string()],
        named: vec![
            ("Version".into(), NamedValue::Str(Some(version.to_string()))),
            ("Side".into(), NamedValue::Str(Some("Server".into()))),
            ("Authors".into(), NamedValue::StrArray(vec!["tester".into()])),
        ],
    };

    let mut bytes = b"MZ\x90\x00".to_vec();
    bytes.extend([0u8; 120]);
    for (target, v) in deps {
        let dep = AttributeBlob {
            fixed: vec![target.to_string(), v.to_string()],
            named: vec![],
        };
        bytes.extend(dep.encode());
        bytes.extend([0u8; 8]);
    }
    bytes.extend(info.encode());
    bytes.extend([0u8; 16]);
    bytes
}

pub fn write_assembly(dir: &Utf8Path, file_name: &str, bytes: &[u8]) -> Utf8PathBuf {
    fs::create_dir_all(dir).unwrap();
    let path = dir.join(file_name);
    fs::write(&path, bytes).unwrap();
    path
}
