//! Cell and batch identity types.
//!
//! A result record is keyed by (cell id, time slice). Cell ids come from the
//! upstream probability model and are treated as opaque strings.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier of one spatial unit (grid cell, district polygon, field).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, JsonSchema)]
#[serde(transparent)]
pub struct CellId(pub String);

impl CellId {
    pub fn new(id: impl Into<String>) -> Self {
        CellId(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CellId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for CellId {
    fn from(id: &str) -> Self {
        CellId(id.to_string())
    }
}

impl From<String> for CellId {
    fn from(id: String) -> Self {
        CellId(id)
    }
}

/// Batch ID for tracking one evaluation run.
///
/// Format: `pw-YYYYMMDD-HHMMSS-XXXX`
/// Example: `pw-20260115-143022-a7xq`
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(transparent)]
pub struct BatchId(pub String);

impl BatchId {
    /// Generate a new batch ID.
    pub fn new() -> Self {
        let now = chrono::Utc::now();
        let suffix = generate_base32_suffix();
        BatchId(format!(
            "pw-{}-{}-{}",
            now.format("%Y%m%d"),
            now.format("%H%M%S"),
            suffix
        ))
    }

    /// Parse an existing batch ID string.
    pub fn parse(s: &str) -> Option<Self> {
        if s.len() != 23 {
            return None;
        }
        let bytes = s.as_bytes();
        if bytes.first() != Some(&b'p')
            || bytes.get(1) != Some(&b'w')
            || bytes.get(2) != Some(&b'-')
            || bytes.get(11) != Some(&b'-')
            || bytes.get(18) != Some(&b'-')
        {
            return None;
        }
        let date = &s[3..11];
        let time = &s[12..18];
        let suffix = &s[19..23];
        if !date.chars().all(|c| c.is_ascii_digit()) {
            return None;
        }
        if !time.chars().all(|c| c.is_ascii_digit()) {
            return None;
        }
        if !suffix.chars().all(|c| matches!(c, 'a'..='z' | '2'..='7')) {
            return None;
        }
        Some(BatchId(s.to_string()))
    }
}

impl Default for BatchId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for BatchId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Four lowercase base32 characters drawn from a v4 UUID.
fn generate_base32_suffix() -> String {
    const ALPHABET: &[u8; 32] = b"abcdefghijklmnopqrstuvwxyz234567";
    let bytes = uuid::Uuid::new_v4().into_bytes();
    bytes[..4]
        .iter()
        .map(|b| ALPHABET[(*b as usize) % 32] as char)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn batch_id_format() {
        let id = BatchId::new();
        assert!(id.0.starts_with("pw-"));
        assert_eq!(id.0.len(), 23);
        assert!(BatchId::parse(&id.0).is_some());
    }

    #[test]
    fn batch_ids_are_unique() {
        let a = BatchId::new();
        let b = BatchId::new();
        // Same second is likely; the suffix still differs with overwhelming probability.
        assert_ne!(a, b);
    }

    #[test]
    fn batch_id_parse_rejects_malformed() {
        assert!(BatchId::parse("px-20260115-143022-a7xq").is_none());
        assert!(BatchId::parse("pw-2026011-143022-a7xqq").is_none());
        assert!(BatchId::parse("pw-20260115-143022-A7XQ").is_none());
        assert!(BatchId::parse("pw-20260115-143022-a7x1").is_none());
        assert!(BatchId::parse("").is_none());
    }

    #[test]
    fn batch_id_parse_accepts_valid() {
        let parsed = BatchId::parse("pw-20260115-143022-a7xq").unwrap();
        assert_eq!(parsed.to_string(), "pw-20260115-143022-a7xq");
    }

    #[test]
    fn cell_id_serializes_transparently() {
        let id = CellId::new("tile-042");
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"tile-042\"");
        let back: CellId = serde_json::from_str("\"tile-042\"").unwrap();
        assert_eq!(back, id);
    }
}
