//! Identifier normalization
//!
//! Both extracts carry object identifiers in heterogeneous encodings: bare
//! (`ID`), URL-like (`scheme://host/path/ID`), and with a fragment
//! (`scheme://host/path/ID#0`). Normalization collapses all of them to `ID`,
//! which is the join key for the whole reconciliation.
//!
//! Algorithm:
//! 1. If the text contains `/`, keep only what follows the last `/`
//! 2. If the result contains `#`, keep only what precedes the first `#`

use crate::error::IdentityError;
use serde::Serialize;
use std::fmt;

const PATH_SEPARATOR: char = '/';
const FRAGMENT_SEPARATOR: char = '#';

/// Normalized object identifier
///
/// Only obtainable through [`normalize`], so every `ArchiveId` is canonical
/// and normalizing it again yields the same value.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct ArchiveId(String);

impl ArchiveId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ArchiveId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for ArchiveId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Canonicalize a raw identifier
///
/// Fails with [`IdentityError::Empty`] on empty input and with
/// [`IdentityError::NoIdentity`] when stripping leaves nothing (`a/b/`, `#x`):
/// a record without identity cannot take part in reconciliation.
pub fn normalize(raw: &str) -> Result<ArchiveId, IdentityError> {
    if raw.is_empty() {
        return Err(IdentityError::Empty);
    }

    let tail = match raw.rfind(PATH_SEPARATOR) {
        Some(pos) => &raw[pos + PATH_SEPARATOR.len_utf8()..],
        None => raw,
    };

    let id = match tail.find(FRAGMENT_SEPARATOR) {
        Some(pos) => &tail[..pos],
        None => tail,
    };

    if id.is_empty() {
        return Err(IdentityError::NoIdentity(raw.to_string()));
    }

    Ok(ArchiveId(id.to_string()))
}

/// Canonicalize an identifier that may be absent
///
/// An absent identifier fails exactly like an empty one.
pub fn normalize_opt(raw: Option<&str>) -> Result<ArchiveId, IdentityError> {
    match raw {
        Some(raw) => normalize(raw),
        None => Err(IdentityError::Empty),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_url_with_fragment() {
        assert_eq!(normalize("scheme://a/b/ID#0").unwrap().as_str(), "ID");
    }

    #[test]
    fn test_bare_identifier_unchanged() {
        assert_eq!(normalize("ID").unwrap().as_str(), "ID");
    }

    #[test]
    fn test_path_without_fragment() {
        assert_eq!(
            normalize("info:fedora/archive/uuid-1234").unwrap().as_str(),
            "uuid-1234"
        );
    }

    #[test]
    fn test_fragment_without_path() {
        assert_eq!(normalize("uuid-1234#master").unwrap().as_str(), "uuid-1234");
    }

    #[test]
    fn test_fragment_cut_at_first_hash() {
        assert_eq!(normalize("x/ID#a#b").unwrap().as_str(), "ID");
    }

    #[test]
    fn test_hash_before_last_slash_is_ignored() {
        // Path stripping happens first, so a '#' in an earlier segment is gone
        assert_eq!(normalize("a#b/c/ID").unwrap().as_str(), "ID");
    }

    #[test]
    fn test_empty_fails() {
        assert_eq!(normalize(""), Err(IdentityError::Empty));
    }

    #[test]
    fn test_absent_fails() {
        assert_eq!(normalize_opt(None), Err(IdentityError::Empty));
        assert_eq!(normalize_opt(Some("a/ID")).unwrap().as_str(), "ID");
    }

    #[test]
    fn test_nothing_left_fails() {
        assert!(matches!(normalize("a/b/"), Err(IdentityError::NoIdentity(_))));
        assert!(matches!(normalize("#frag"), Err(IdentityError::NoIdentity(_))));
        assert!(matches!(normalize("a/#frag"), Err(IdentityError::NoIdentity(_))));
    }

    #[test]
    fn test_idempotent() {
        let inputs = [
            "ID",
            "scheme://a/b/ID#0",
            "a/b/c",
            "x#y",
            "info:fedora/uuid:5f3a-77#DS1",
            "  padded ",
            "ünïcødé/ïd#frag",
        ];
        for raw in inputs {
            let once = normalize(raw).unwrap();
            let twice = normalize(once.as_str()).unwrap();
            assert_eq!(once, twice, "normalization not idempotent for {:?}", raw);
        }
    }

    #[test]
    fn test_different_encodings_collapse() {
        let a = normalize("http://catalog.example/objects/abc#1").unwrap();
        let b = normalize("tape://vault7/abc").unwrap();
        let c = normalize("abc").unwrap();
        assert_eq!(a, b);
        assert_eq!(b, c);
    }
}
