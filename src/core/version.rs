use crate::models::mod_dto::DependencyConstraint;
use semver::Version;
use std::cmp::Ordering;

/// Number of segments kept by [`normalize`]; anything past patch is dropped.
const MAX_SEGMENTS: usize = 3;

/// Reduces free-form version text to `major[.minor[.patch]]`.
///
/// Only the leading run of digits and dots is kept, so trailing qualifiers
/// such as `-rc1` or `+build` disappear while a leading `v`, or leading
/// whitespace, yields nothing. Returns `None` when nothing numeric survives.
pub fn normalize(raw: Option<&str>) -> Option<String> {
    let run: String = raw?
        .chars()
        .take_while(|c| c.is_ascii_digit() || *c == '.')
        .collect();

    let trimmed = run.trim_matches('.');
    if trimmed.trim().is_empty() {
        return None;
    }

    let joined = trimmed
        .split('.')
        .filter(|s| !s.is_empty())
        .take(MAX_SEGMENTS)
        .collect::<Vec<_>>()
        .join(".");

    (!joined.is_empty()).then_some(joined)
}

/// Converts a normalized version into a comparable value, padding missing
/// segments with `0`. Segments too large for `u64` make the version
/// incomparable.
pub fn parse_normalized(normalized: &str) -> Option<Version> {
    let mut parts = [0u64; MAX_SEGMENTS];
    for (slot, segment) in parts.iter_mut().zip(normalized.split('.')) {
        *slot = segment.parse().ok()?;
    }
    Some(Version::new(parts[0], parts[1], parts[2]))
}

/// Segment-wise comparison of two normalized versions.
pub fn compare(a: &str, b: &str) -> Option<Ordering> {
    Some(parse_normalized(a)?.cmp(&parse_normalized(b)?))
}

/// Whether a target at `found` meets `constraint`.
///
/// An unknown or incomparable version on either side satisfies: it cannot be
/// proven incompatible.
pub fn satisfies(found: Option<&str>, constraint: &DependencyConstraint) -> bool {
    let (Some(found), Some(required)) = (found, constraint.min_version.as_deref()) else {
        return true;
    };

    match compare(found, required) {
        Some(Ordering::Less) => false,
        Some(Ordering::Greater) => !constraint.exact,
        Some(Ordering::Equal) | None => true,
    }
}
