//! JSON output envelope.
//!
//! Every invocation renders exactly one envelope:
//!
//! ```json
//! {"status": "success", "data": {...}, "meta": {...}}
//! {"status": "error", "error": {"code": "...", ...}, "meta": {...}}
//! ```
//!
//! Field names are a stable contract for scripts and agents consuming the
//! output; optional metadata is rendered as `null` rather than omitted.

use grc_core::{CorrelationId, Timestamp};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

use crate::trait_::{AuthStatus, FailureKind, ToolFailure};

/// Envelope header
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolMeta {
    /// Invocation correlation ID
    pub correlation_id: CorrelationId,
    /// Canonical task reference
    pub task_ref: Option<String>,
    /// Tool name as invoked
    pub tool: String,
    /// Wall time from start of invocation to envelope
    pub duration_ms: u64,
    /// Start of invocation
    pub timestamp: Timestamp,
    /// Authentication status, for API-backed tools
    pub auth_status: Option<AuthStatus>,
    /// `api`, `cache` or `local`
    pub data_source: Option<String>,
}

/// Error classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// Rejected input
    Validation,
    /// Unknown tool or missing resource
    NotFound,
    /// Everything else
    Internal,
}

impl ErrorCode {
    /// Wire spelling
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Validation => "VALIDATION",
            Self::NotFound => "NOT_FOUND",
            Self::Internal => "INTERNAL",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl From<FailureKind> for ErrorCode {
    fn from(kind: FailureKind) -> Self {
        match kind {
            FailureKind::Validation => Self::Validation,
            FailureKind::NotFound => Self::NotFound,
            FailureKind::Internal => Self::Internal,
        }
    }
}

/// Error body of an error envelope
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolError {
    /// Classification
    pub code: ErrorCode,
    /// Human-readable message
    pub message: String,
    /// Same as `meta.correlation_id`
    pub correlation_id: CorrelationId,
    /// Structured context, e.g. per-field validation errors
    pub details: Map<String, Value>,
}

impl ToolError {
    /// Create an error body with no details
    #[must_use]
    pub fn new(code: ErrorCode, message: impl Into<String>, correlation_id: CorrelationId) -> Self {
        Self {
            code,
            message: message.into(),
            correlation_id,
            details: Map::new(),
        }
    }

    /// Build from a handler failure
    #[must_use]
    pub fn from_failure(failure: ToolFailure, correlation_id: CorrelationId) -> Self {
        Self {
            code: failure.kind.into(),
            message: failure.message,
            correlation_id,
            details: failure.details,
        }
    }

    /// Add a detail entry
    #[must_use]
    pub fn with_detail(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.details.insert(key.into(), value.into());
        self
    }
}

/// Success or error envelope
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Envelope {
    /// Tool ran and produced data
    Success {
        /// Tool payload
        data: Value,
        /// Header
        meta: ToolMeta,
    },
    /// Invocation failed
    Error {
        /// Error body
        error: ToolError,
        /// Header
        meta: ToolMeta,
    },
}

impl Envelope {
    /// Success envelope
    #[must_use]
    pub fn success(data: Value, meta: ToolMeta) -> Self {
        Self::Success { data, meta }
    }

    /// Error envelope
    #[must_use]
    pub fn error(error: ToolError, meta: ToolMeta) -> Self {
        Self::Error { error, meta }
    }

    /// Header
    #[must_use]
    pub fn meta(&self) -> &ToolMeta {
        match self {
            Self::Success { meta, .. } | Self::Error { meta, .. } => meta,
        }
    }

    /// Whether this is a success envelope
    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }

    /// Error code, for error envelopes
    #[must_use]
    pub fn error_code(&self) -> Option<ErrorCode> {
        match self {
            Self::Success { .. } => None,
            Self::Error { error, .. } => Some(error.code),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn meta() -> ToolMeta {
        ToolMeta {
            correlation_id: CorrelationId::new(),
            task_ref: None,
            tool: "docs-reader".to_string(),
            duration_ms: 3,
            timestamp: Timestamp::now(),
            auth_status: None,
            data_source: None,
        }
    }

    #[test]
    fn test_success_shape() {
        let env = Envelope::success(json!({"result": 1}), meta());
        let value = serde_json::to_value(&env).unwrap();
        assert_eq!(value["status"], json!("success"));
        assert_eq!(value["data"], json!({"result": 1}));
        let meta = value["meta"].as_object().unwrap();
        for key in [
            "correlation_id",
            "task_ref",
            "tool",
            "duration_ms",
            "timestamp",
            "auth_status",
            "data_source",
        ] {
            assert!(meta.contains_key(key), "missing meta.{key}");
        }
        assert_eq!(meta["task_ref"], Value::Null);
    }

    #[test]
    fn test_error_shape() {
        let meta = meta();
        let error = ToolError::new(ErrorCode::NotFound, "tool not found", meta.correlation_id)
            .with_detail("tool", "nope");
        let env = Envelope::error(error, meta.clone());
        let value = serde_json::to_value(&env).unwrap();
        assert_eq!(value["status"], json!("error"));
        assert_eq!(value["error"]["code"], json!("NOT_FOUND"));
        assert_eq!(value["error"]["details"]["tool"], json!("nope"));
        assert_eq!(value["error"]["correlation_id"], value["meta"]["correlation_id"]);
        assert!(value.get("data").is_none());
        assert_eq!(env.error_code(), Some(ErrorCode::NotFound));
        assert!(!env.is_success());
    }

    #[test]
    fn test_error_code_from_failure_kind() {
        assert_eq!(ErrorCode::from(FailureKind::Validation), ErrorCode::Validation);
        assert_eq!(ErrorCode::from(FailureKind::NotFound).to_string(), "NOT_FOUND");
        assert_eq!(ErrorCode::from(FailureKind::Internal), ErrorCode::Internal);
    }

    #[test]
    fn test_envelope_round_trips() {
        let env = Envelope::success(json!({"k": "v"}), meta());
        let text = serde_json::to_string(&env).unwrap();
        let back: Envelope = serde_json::from_str(&text).unwrap();
        assert_eq!(back, env);
    }
}
