//! Per-invocation context and metadata tracking.

use grc_core::{CorrelationId, Stopwatch, Timestamp};
use std::path::{Path, PathBuf};

use crate::envelope::ToolMeta;
use crate::trait_::AuthStatus;

/// What a handler sees of the invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolContext {
    /// Root directory all path parameters are confined to
    pub data_dir: PathBuf,
    /// Correlation ID of this invocation
    pub correlation_id: CorrelationId,
    /// Canonical task reference, if one was given
    pub task_ref: Option<String>,
}

impl ToolContext {
    /// Context rooted at `data_dir` with a fresh correlation ID
    #[must_use]
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            correlation_id: CorrelationId::new(),
            task_ref: None,
        }
    }

    /// Use a specific correlation ID
    #[must_use]
    pub fn with_correlation_id(mut self, id: CorrelationId) -> Self {
        self.correlation_id = id;
        self
    }

    /// Attach a task reference
    #[must_use]
    pub fn with_task_ref(mut self, task_ref: Option<String>) -> Self {
        self.task_ref = task_ref;
        self
    }

    /// Resolve a validated path parameter against the data directory
    #[must_use]
    pub fn resolve_path(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.data_dir.join(path)
        }
    }
}

/// Accumulates envelope metadata over one invocation.
///
/// Created when the invocation starts; [`InvocationContext::finish`] stamps
/// the duration and produces the immutable [`ToolMeta`].
#[derive(Debug, Clone)]
pub struct InvocationContext {
    correlation_id: CorrelationId,
    tool: String,
    task_ref: Option<String>,
    started_at: Timestamp,
    stopwatch: Stopwatch,
    auth_status: Option<AuthStatus>,
    data_source: Option<String>,
}

impl InvocationContext {
    /// Start tracking an invocation of `tool`
    #[must_use]
    pub fn begin(tool: impl Into<String>) -> Self {
        Self {
            correlation_id: CorrelationId::new(),
            tool: tool.into(),
            task_ref: None,
            started_at: Timestamp::now(),
            stopwatch: Stopwatch::start(),
            auth_status: None,
            data_source: None,
        }
    }

    /// Correlation ID of this invocation
    #[must_use]
    pub fn correlation_id(&self) -> CorrelationId {
        self.correlation_id
    }

    /// Tool name
    #[must_use]
    pub fn tool(&self) -> &str {
        &self.tool
    }

    /// Canonical task reference, if set
    #[must_use]
    pub fn task_ref(&self) -> Option<&str> {
        self.task_ref.as_deref()
    }

    /// Record the canonical task reference
    pub fn set_task_ref(&mut self, task_ref: impl Into<String>) {
        self.task_ref = Some(task_ref.into());
    }

    /// Record authentication status reported by the handler
    pub fn record_auth_status(&mut self, status: AuthStatus) {
        self.auth_status = Some(status);
    }

    /// Record where the result data came from
    pub fn record_data_source(&mut self, source: impl Into<String>) {
        self.data_source = Some(source.into());
    }

    /// Handler-facing view of this invocation
    #[must_use]
    pub fn tool_context(&self, data_dir: &Path) -> ToolContext {
        ToolContext {
            data_dir: data_dir.to_path_buf(),
            correlation_id: self.correlation_id,
            task_ref: self.task_ref.clone(),
        }
    }

    /// Produce the envelope metadata with the elapsed duration
    #[must_use]
    pub fn finish(&self) -> ToolMeta {
        ToolMeta {
            correlation_id: self.correlation_id,
            task_ref: self.task_ref.clone(),
            tool: self.tool.clone(),
            duration_ms: self.stopwatch.elapsed_ms(),
            timestamp: self.started_at,
            auth_status: self.auth_status.clone(),
            data_source: self.data_source.clone(),
        }
    }
}
