//! Reads package metadata out of the custom attributes embedded in a managed
//! assembly, without loading or executing it.
//!
//! Attribute values are stored as blobs: a `0x0001` prolog, the fixed
//! constructor arguments, a `u16` count of named arguments and the named
//! arguments themselves. Only string constructor arguments are understood,
//! which covers both the package attribute `(name, modid)` and dependency
//! attributes `(modid, version)`.

use crate::models::error::SError;
use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use camino::Utf8Path;
use regex::Regex;
use std::io::{Cursor, Read};
use std::sync::OnceLock;

const PROLOG: [u8; 2] = [0x01, 0x00];
const FIXED_STRING_ARGS: usize = 2;
/// Named arguments beyond this are treated as noise rather than a real blob.
const MAX_NAMED_ARGS: u16 = 32;

const NAMED_FIELD: u8 = 0x53;
const NAMED_PROPERTY: u8 = 0x54;
const ELEM_BOOLEAN: u8 = 0x02;
const ELEM_STRING: u8 = 0x0E;
const ELEM_SZARRAY: u8 = 0x1D;
const NULL_STRING: u8 = 0xFF;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum NamedValue {
    Str(Option<String>),
    Bool(bool),
    StrArray(Vec<String>),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AttributeBlob {
    pub fixed: Vec<String>,
    pub named: Vec<(String, NamedValue)>,
}

impl AttributeBlob {
    pub fn named_str(&self, name: &str) -> Option<&str> {
        self.named_value(name).and_then(|v| match v {
            NamedValue::Str(s) => s.as_deref(),
            _ => None,
        })
    }

    pub fn named_bool(&self, name: &str) -> Option<bool> {
        self.named_value(name).and_then(|v| match v {
            NamedValue::Bool(b) => Some(*b),
            _ => None,
        })
    }

    /// String arrays, or a single comma-separated string.
    pub fn named_list(&self, name: &str) -> Vec<String> {
        match self.named_value(name) {
            Some(NamedValue::StrArray(items)) => items.clone(),
            Some(NamedValue::Str(Some(s))) => s
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect(),
            _ => Vec::new(),
        }
    }

    fn named_value(&self, name: &str) -> Option<&NamedValue> {
        self.named
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v)
    }

    /// Serializes the blob in the same layout [`scan_blobs`] reads.
    pub fn encode(&self) -> Vec<u8> {
        let mut out = PROLOG.to_vec();
        for s in &self.fixed {
            write_ser_string(&mut out, Some(s));
        }
        let _ = out.write_u16::<LittleEndian>(self.named.len() as u16);
        for (name, value) in &self.named {
            out.push(NAMED_PROPERTY);
            match value {
                NamedValue::Str(_) => out.push(ELEM_STRING),
                NamedValue::Bool(_) => out.push(ELEM_BOOLEAN),
                NamedValue::StrArray(_) => out.extend([ELEM_SZARRAY, ELEM_STRING]),
            }
            write_ser_string(&mut out, Some(name));
            match value {
                NamedValue::Str(s) => write_ser_string(&mut out, s.as_deref()),
                NamedValue::Bool(b) => out.push(u8::from(*b)),
                NamedValue::StrArray(items) => {
                    let _ = out.write_u32::<LittleEndian>(items.len() as u32);
                    for item in items {
                        write_ser_string(&mut out, Some(item));
                    }
                }
            }
        }
        out
    }
}

/// Metadata recovered from one assembly.
#[derive(Clone, Debug)]
pub struct AssemblyMetadata {
    pub info: AttributeBlob,
    /// `(target, version text)` pairs.
    pub dependencies: Vec<(String, String)>,
}

impl AssemblyMetadata {
    pub fn display_name(&self) -> &str {
        &self.info.fixed[0]
    }

    pub fn mod_id(&self) -> &str {
        &self.info.fixed[1]
    }
}

pub fn read_assembly_metadata(path: &Utf8Path) -> Result<AssemblyMetadata, SError> {
    let bytes = std::fs::read(path)?;
    parse_assembly(&bytes)
}

pub fn parse_assembly(bytes: &[u8]) -> Result<AssemblyMetadata, SError> {
    if !bytes.starts_with(b"MZ") {
        return Err(SError::ParseError("not a PE image (missing MZ signature)".into()));
    }

    // Prefer a blob carrying named arguments; a bare `(name, modid)` pair is
    // told apart from a dependency by its second argument not being a version.
    let blobs = scan_blobs(bytes);
    let info_index = blobs
        .iter()
        .position(|b| !b.named.is_empty() && is_mod_id(&b.fixed[1]))
        .or_else(|| {
            blobs
                .iter()
                .position(|b| is_mod_id(&b.fixed[1]) && !looks_like_version_text(&b.fixed[1]))
        })
        .ok_or_else(|| SError::ParseError("no package attribute found in assembly".into()))?;

    let dependencies = blobs
        .iter()
        .enumerate()
        .filter(|(i, b)| *i != info_index && b.named.is_empty())
        .filter(|(_, b)| is_mod_id(&b.fixed[0]) && looks_like_version_text(&b.fixed[1]))
        .map(|(_, b)| (b.fixed[0].clone(), b.fixed[1].clone()))
        .collect();

    Ok(AssemblyMetadata {
        info: blobs[info_index].clone(),
        dependencies,
    })
}

/// Finds every well-formed attribute blob with two string constructor
/// arguments.
pub fn scan_blobs(bytes: &[u8]) -> Vec<AttributeBlob> {
    let mut blobs = Vec::new();
    let mut pos = 0;

    while pos + PROLOG.len() <= bytes.len() {
        if bytes[pos..].starts_with(&PROLOG) {
            let mut cursor = Cursor::new(&bytes[pos + PROLOG.len()..]);
            if let Some(blob) = read_blob(&mut cursor) {
                blobs.push(blob);
                pos += PROLOG.len() + cursor.position() as usize;
                continue;
            }
        }
        pos += 1;
    }

    blobs
}

fn read_blob(cursor: &mut Cursor<&[u8]>) -> Option<AttributeBlob> {
    let fixed = (0..FIXED_STRING_ARGS)
        .map(|_| read_ser_string(cursor).flatten())
        .collect::<Option<Vec<_>>>()?;

    let count = cursor.read_u16::<LittleEndian>().ok()?;
    if count > MAX_NAMED_ARGS {
        return None;
    }

    let named = (0..count)
        .map(|_| read_named_arg(cursor))
        .collect::<Option<Vec<_>>>()?;

    Some(AttributeBlob { fixed, named })
}

fn read_named_arg(cursor: &mut Cursor<&[u8]>) -> Option<(String, NamedValue)> {
    let kind = cursor.read_u8().ok()?;
    if kind != NAMED_FIELD && kind != NAMED_PROPERTY {
        return None;
    }

    let elem = cursor.read_u8().ok()?;
    if elem == ELEM_SZARRAY && cursor.read_u8().ok()? != ELEM_STRING {
        return None;
    }
    let name = read_ser_string(cursor)??;

    let value = match elem {
        ELEM_STRING => NamedValue::Str(read_ser_string(cursor)?),
        ELEM_BOOLEAN => match cursor.read_u8().ok()? {
            0 => NamedValue::Bool(false),
            1 => NamedValue::Bool(true),
            _ => return None,
        },
        ELEM_SZARRAY => {
            let len = cursor.read_u32::<LittleEndian>().ok()?;
            if len == u32::MAX {
                NamedValue::StrArray(Vec::new())
            } else {
                let remaining = cursor.get_ref().len() as u64 - cursor.position();
                if u64::from(len) > remaining {
                    return None;
                }
                let items = (0..len)
                    .map(|_| read_ser_string(cursor).map(Option::unwrap_or_default))
                    .collect::<Option<Vec<_>>>()?;
                NamedValue::StrArray(items)
            }
        }
        _ => return None,
    };

    Some((name, value))
}

/// Outer `None`: malformed. Inner `None`: the serialized null string.
fn read_ser_string(cursor: &mut Cursor<&[u8]>) -> Option<Option<String>> {
    let first = cursor.read_u8().ok()?;
    if first == NULL_STRING {
        return Some(None);
    }

    let len = match first {
        b if b & 0x80 == 0 => u32::from(b),
        b if b & 0xC0 == 0x80 => (u32::from(b & 0x3F) << 8) | u32::from(cursor.read_u8().ok()?),
        b if b & 0xE0 == 0xC0 => {
            let rest = cursor.read_u24::<byteorder::BigEndian>().ok()?;
            (u32::from(b & 0x1F) << 24) | rest
        }
        _ => return None,
    };
    let len = len as usize;

    let remaining = cursor.get_ref().len().saturating_sub(cursor.position() as usize);
    if len > remaining {
        return None;
    }

    let mut buf = vec![0u8; len];
    cursor.read_exact(&mut buf).ok()?;
    let s = String::from_utf8(buf).ok()?;
    if s.chars().any(|c| c.is_control()) {
        return None;
    }
    Some(Some(s))
}

fn write_ser_string(out: &mut Vec<u8>, s: Option<&str>) {
    let Some(s) = s else {
        out.push(NULL_STRING);
        return;
    };
    let len = s.len() as u32;
    if len < 0x80 {
        out.push(len as u8);
    } else if len < 0x4000 {
        let _ = out.write_u16::<byteorder::BigEndian>(0x8000 | len as u16);
    } else {
        let _ = out.write_u32::<byteorder::BigEndian>(0xC000_0000 | len);
    }
    out.extend_from_slice(s.as_bytes());
}

fn is_mod_id(s: &str) -> bool {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[A-Za-z0-9][A-Za-z0-9_.\-]*$").ok())
        .as_ref()
        .is_some_and(|re| re.is_match(s))
}

fn looks_like_version_text(s: &str) -> bool {
    let s = s.trim().trim_start_matches('=');
    s.is_empty() || s == "*" || s.starts_with(|c: char| c.is_ascii_digit())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn info_blob() -> AttributeBlob {
        AttributeBlob {
            fixed: vec!["Better Ruins".into(), "betterruins".into()],
            named: vec![
                ("Version".into(), NamedValue::Str(Some("1.4.2".into()))),
                ("Side".into(), NamedValue::Str(Some("Universal".into()))),
                ("RequiredOnClient".into(), NamedValue::Bool(false)),
                (
                    "Authors".into(),
                    NamedValue::StrArray(vec!["Ann".into(), "Bo".into()]),
                ),
            ],
        }
    }

    fn image(blobs: &[AttributeBlob]) -> Vec<u8> {
        let mut bytes = b"MZ\x90\x00\x03\x00\x00\x00".to_vec();
        bytes.extend([0u8; 64]);
        for blob in blobs {
            bytes.extend(blob.encode());
            bytes.extend([0u8, 0x13, 0x37]);
        }
        bytes
    }

    #[test]
    fn test_reads_package_attribute() {
        let meta = parse_assembly(&image(&[info_blob()])).unwrap();
        assert_eq!(meta.mod_id(), "betterruins");
        assert_eq!(meta.display_name(), "Better Ruins");
        assert_eq!(meta.info.named_str("version"), Some("1.4.2"));
        assert_eq!(meta.info.named_bool("RequiredOnClient"), Some(false));
        assert_eq!(meta.info.named_list("Authors"), vec!["Ann", "Bo"]);
    }

    #[test]
    fn test_reads_dependency_attributes() {
        let dep = AttributeBlob {
            fixed: vec!["game".into(), "1.19.0".into()],
            named: vec![],
        };
        let meta = parse_assembly(&image(&[dep.clone(), info_blob()])).unwrap();
        assert_eq!(meta.mod_id(), "betterruins");
        assert_eq!(meta.dependencies, vec![("game".to_string(), "1.19.0".to_string())]);
    }

    #[test]
    fn test_package_attribute_without_named_args() {
        let plain = AttributeBlob {
            fixed: vec!["Plain Mod".into(), "plainmod".into()],
            named: vec![],
        };
        let meta = parse_assembly(&image(&[plain])).unwrap();
        assert_eq!(meta.mod_id(), "plainmod");
        assert_eq!(meta.display_name(), "Plain Mod");
        assert!(meta.info.named_str("Version").is_none());
        assert!(meta.dependencies.is_empty());
    }

    #[test]
    fn test_bare_dependencies_are_not_package_attributes() {
        let dep = AttributeBlob {
            fixed: vec!["game".into(), "1.19.0".into()],
            named: vec![],
        };
        let err = parse_assembly(&image(&[dep])).unwrap_err();
        assert!(err.to_string().contains("no package attribute"));
    }

    #[test]
    fn test_rejects_non_pe_bytes() {
        let err = parse_assembly(b"\x7fELF....").unwrap_err();
        assert!(matches!(err, SError::ParseError(_)));
    }

    #[test]
    fn test_missing_package_attribute() {
        let err = parse_assembly(&image(&[])).unwrap_err();
        assert!(err.to_string().contains("no package attribute"));
    }

    #[test]
    fn test_long_strings_use_two_byte_length() {
        let mut blob = info_blob();
        blob.named
            .push(("Description".into(), NamedValue::Str(Some("x".repeat(300)))));
        let found = scan_blobs(&blob.encode());
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].named_str("Description").map(str::len), Some(300));
    }

    #[test]
    fn test_comma_separated_authors() {
        let blob = AttributeBlob {
            fixed: vec!["A".into(), "a".into()],
            named: vec![("Authors".into(), NamedValue::Str(Some("Ann, Bo".into())))],
        };
        assert_eq!(blob.named_list("authors"), vec!["Ann", "Bo"]);
    }
}
