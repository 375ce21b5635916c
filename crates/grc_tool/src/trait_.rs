//! Tool handler trait and handler results.

use grc_core::{CoreError, Timestamp};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

use crate::context::ToolContext;
use crate::params::Params;

/// A tool's behavior.
///
/// Handlers receive parameters that already passed the tool's rule set, with
/// normalized values merged in. They must not write to stdout; the envelope
/// is the only output.
pub trait ToolHandler: Send + Sync {
    /// Run the tool
    ///
    /// # Errors
    ///
    /// Returns a `ToolFailure` whose kind decides the envelope error code
    fn execute(&self, ctx: &ToolContext, params: &Params) -> Result<ToolOutput, ToolFailure>;
}

impl<F> ToolHandler for F
where
    F: Fn(&ToolContext, &Params) -> Result<ToolOutput, ToolFailure> + Send + Sync,
{
    fn execute(&self, ctx: &ToolContext, params: &Params) -> Result<ToolOutput, ToolFailure> {
        self(ctx, params)
    }
}

/// Successful handler result
#[derive(Debug, Clone, PartialEq)]
pub struct ToolOutput {
    /// Tool-specific payload
    pub data: Value,
    /// Where the data came from
    pub evidence_source: Option<EvidenceSource>,
    /// Authentication state, for tools that talk to the platform API
    pub auth_status: Option<AuthStatus>,
}

impl ToolOutput {
    /// Output with a payload and nothing else
    #[must_use]
    pub fn new(data: Value) -> Self {
        Self {
            data,
            evidence_source: None,
            auth_status: None,
        }
    }

    /// Attach an evidence source
    #[must_use]
    pub fn with_evidence_source(mut self, source: EvidenceSource) -> Self {
        self.evidence_source = Some(source);
        self
    }

    /// Attach authentication status
    #[must_use]
    pub fn with_auth_status(mut self, status: AuthStatus) -> Self {
        self.auth_status = Some(status);
        self
    }
}

/// How a handler failed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// The input was unacceptable
    Validation,
    /// Something the input names does not exist
    NotFound,
    /// Anything else
    Internal,
}

/// Failed handler result
#[derive(Debug, Clone, PartialEq)]
pub struct ToolFailure {
    /// Classification
    pub kind: FailureKind,
    /// Human-readable message
    pub message: String,
    /// Structured context
    pub details: Map<String, Value>,
}

impl ToolFailure {
    /// Create a failure
    #[must_use]
    pub fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            details: Map::new(),
        }
    }

    /// Input was unacceptable
    #[must_use]
    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(FailureKind::Validation, message)
    }

    /// Referenced item does not exist
    #[must_use]
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(FailureKind::NotFound, message)
    }

    /// Unexpected failure
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(FailureKind::Internal, message)
    }

    /// Add a detail entry
    #[must_use]
    pub fn with_detail(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.details.insert(key.into(), value.into());
        self
    }
}

impl fmt::Display for ToolFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}: {}", self.kind, self.message)
    }
}

impl std::error::Error for ToolFailure {}

impl From<CoreError> for ToolFailure {
    fn from(err: CoreError) -> Self {
        let kind = match &err {
            CoreError::Validation { .. } => FailureKind::Validation,
            CoreError::NotFound { .. } => FailureKind::NotFound,
            CoreError::Io { .. } => FailureKind::Internal,
        };
        Self::new(kind, err.to_string()).with_detail("kind", err.kind())
    }
}

/// Origin of tool data
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    /// Live platform API
    Api,
    /// Local cache of API data
    Cache,
    /// Local files
    Local,
}

impl SourceKind {
    /// Lowercase name, as used for `meta.data_source`
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Api => "api",
            Self::Cache => "cache",
            Self::Local => "local",
        }
    }
}

/// Provenance of tool data
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvidenceSource {
    /// Source kind
    pub source: SourceKind,
    /// What was read (path, endpoint, cache key)
    pub resource: String,
    /// When it was read
    pub extracted_at: Timestamp,
}

impl EvidenceSource {
    /// Source read now
    #[must_use]
    pub fn new(source: SourceKind, resource: impl Into<String>) -> Self {
        Self {
            source,
            resource: resource.into(),
            extracted_at: Timestamp::now(),
        }
    }
}

/// Authentication state reported by API-backed tools
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthStatus {
    /// Whether a credential was available
    pub authenticated: bool,
    /// Credential provider name
    pub provider: String,
    /// Whether cached credentials were used
    pub cache_used: bool,
}
