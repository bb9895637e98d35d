//! Dotted field paths
//!
//! `"address.state"` addresses the `state` field of the document stored in
//! `address`. Paths are validated once when a filter, update or pipeline is
//! built.

use std::fmt;

use crate::errors::{StoreError, StoreResult};

/// A validated, pre-split field path
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FieldPath {
    raw: String,
    segments: Vec<String>,
}

impl FieldPath {
    /// Parse a dotted path.
    ///
    /// Rejects empty paths, empty segments and segments starting with `$`.
    pub fn parse(raw: &str) -> StoreResult<Self> {
        if raw.is_empty() {
            return Err(StoreError::invalid_argument("field path must not be empty"));
        }

        let mut segments = Vec::new();
        for segment in raw.split('.') {
            if segment.is_empty() {
                return Err(StoreError::invalid_argument(format!(
                    "field path '{}' contains an empty segment",
                    raw
                )));
            }
            if segment.starts_with('$') {
                return Err(StoreError::invalid_argument(format!(
                    "field path '{}' contains operator-like segment '{}'",
                    raw, segment
                )));
            }
            segments.push(segment.to_string());
        }

        Ok(Self {
            raw: raw.to_string(),
            segments,
        })
    }

    /// Parse a `$field` reference as used inside pipeline stages
    pub fn parse_reference(raw: &str) -> StoreResult<Self> {
        match raw.strip_prefix('$') {
            Some(path) => Self::parse(path),
            None => Err(StoreError::invalid_argument(format!(
                "field reference '{}' must start with '$'",
                raw
            ))),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// The leading segments joined back together, e.g. `prefix(1)` of
    /// `a.b.c` is `a`
    pub fn prefix(&self, len: usize) -> String {
        self.segments[..len.min(self.segments.len())].join(".")
    }

    /// Returns true if this is the identifier field
    pub fn is_id(&self) -> bool {
        self.segments.len() == 1 && self.segments[0] == super::ID_FIELD
    }

    /// Returns true if either path is a prefix of the other (same field or
    /// one nested inside the other)
    pub fn overlaps(&self, other: &FieldPath) -> bool {
        self.segments
            .iter()
            .zip(other.segments.iter())
            .all(|(a, b)| a == b)
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_dotted() {
        let path = FieldPath::parse("address.state").unwrap();
        assert_eq!(path.segments(), &["address".to_string(), "state".to_string()]);
        assert_eq!(path.as_str(), "address.state");
        assert_eq!(path.prefix(1), "address");
    }

    #[test]
    fn test_rejects_malformed() {
        assert!(FieldPath::parse("").is_err());
        assert!(FieldPath::parse("a..b").is_err());
        assert!(FieldPath::parse("a.$b").is_err());
    }

    #[test]
    fn test_reference() {
        let path = FieldPath::parse_reference("$scores.score").unwrap();
        assert_eq!(path.as_str(), "scores.score");
        assert!(FieldPath::parse_reference("scores").is_err());
    }

    #[test]
    fn test_overlaps() {
        let a = FieldPath::parse("a").unwrap();
        let ab = FieldPath::parse("a.b").unwrap();
        let c = FieldPath::parse("c").unwrap();
        assert!(a.overlaps(&ab));
        assert!(ab.overlaps(&a));
        assert!(!a.overlaps(&c));
    }
}
