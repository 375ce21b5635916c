//! Correlation identifiers.
//!
//! One ID is minted per tool invocation and threaded through logs and the
//! output envelope. IDs are random v4 UUIDs rendered in hyphenated form.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Correlation identifier - identifies a single tool invocation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CorrelationId(Uuid);

impl CorrelationId {
    /// Create a new random CorrelationId
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for CorrelationId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for CorrelationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.hyphenated())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_id_creation_is_unique() {
        let a = CorrelationId::new();
        let b = CorrelationId::new();
        assert_ne!(a, b);
    }

    #[test]
    fn test_id_display_is_hyphenated_uuid() {
        let s = CorrelationId::new().to_string();
        assert_eq!(s.len(), 36);
        assert_eq!(s.matches('-').count(), 4);
    }

    #[test]
    fn test_id_serializes_as_plain_string() {
        let id = CorrelationId::new();
        let json = serde_json::to_value(id).unwrap();
        assert_eq!(json, serde_json::Value::String(id.to_string()));
        let back: CorrelationId = serde_json::from_value(json).unwrap();
        assert_eq!(back, id);
    }
}
