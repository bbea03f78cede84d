//! Library version ordering.

use semver::Version;
use std::cmp::Ordering;

/// Order two library versions.
///
/// Semver when both sides parse (a leading `v` is ignored). The empty
/// version, used by a fresh record, sorts before everything. Anything else
/// falls back to plain string order.
pub fn compare_versions(a: &str, b: &str) -> Ordering {
    match (a.is_empty(), b.is_empty()) {
        (true, true) => return Ordering::Equal,
        (true, false) => return Ordering::Less,
        (false, true) => return Ordering::Greater,
        _ => {}
    }

    match (parse(a), parse(b)) {
        (Some(a), Some(b)) => a.cmp(&b),
        _ => a.cmp(b),
    }
}

fn parse(version: &str) -> Option<Version> {
    Version::parse(version.trim().trim_start_matches('v')).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_semver_order() {
        assert_eq!(compare_versions("2.3.0", "2.4.0"), Ordering::Less);
        assert_eq!(compare_versions("2.10.0", "2.9.0"), Ordering::Greater);
        assert_eq!(compare_versions("v2.4.0", "2.4.0"), Ordering::Equal);
    }

    #[test]
    fn test_empty_sorts_first() {
        assert_eq!(compare_versions("", "2.3.0"), Ordering::Less);
        assert_eq!(compare_versions("", ""), Ordering::Equal);
    }

    #[test]
    fn test_non_semver_fallback() {
        assert_eq!(compare_versions("nightly", "nightly"), Ordering::Equal);
        assert_ne!(compare_versions("2.4", "2.3"), Ordering::Less);
    }
}
