//! Tool dispatch.
//!
//! [`Dispatcher::invoke`] runs one invocation end to end and always returns
//! an envelope:
//!
//! 1. unknown tool: `NOT_FOUND`, nothing else runs
//! 2. `--task-ref` is normalized and merged into params as `task_ref`
//! 3. params are validated against the tool's rules; failures become a
//!    `VALIDATION` envelope and the handler is never called
//! 4. normalized values replace the raw ones
//! 5. the handler runs; its failure kind picks the error code and a panic
//!    becomes `INTERNAL`

use grc_core::CorrelationId;
use serde_json::{Map, Value};
use std::any::Any;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::context::{InvocationContext, ToolContext};
use crate::envelope::{Envelope, ErrorCode, ToolError};
use crate::normalize::normalize_task_ref;
use crate::params::{ParamValue, Params};
use crate::registry::{ToolEntry, ToolRegistry};
use crate::trait_::{ToolFailure, ToolOutput};
use crate::validate::{validate_parameters, TASK_REF_FIELD};

/// Error from [`Dispatcher::execute_tool`]
#[derive(Debug, Clone, PartialEq)]
pub enum DispatchError {
    /// No tool with this name
    NotFound { name: String },
    /// Handler returned a failure
    Failed(ToolFailure),
    /// Handler panicked
    Panicked { name: String, message: String },
}

impl DispatchError {
    /// Envelope error code
    #[must_use]
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::NotFound { .. } => ErrorCode::NotFound,
            Self::Failed(failure) => failure.kind.into(),
            Self::Panicked { .. } => ErrorCode::Internal,
        }
    }

    /// Convert into an envelope error body
    #[must_use]
    pub fn into_tool_error(self, correlation_id: CorrelationId) -> ToolError {
        match self {
            Self::NotFound { name } => {
                ToolError::new(ErrorCode::NotFound, format!("tool not found: {}", name), correlation_id)
                    .with_detail("tool", name)
            }
            Self::Failed(failure) => ToolError::from_failure(failure, correlation_id),
            Self::Panicked { name, message } => ToolError::new(
                ErrorCode::Internal,
                format!("tool {} failed unexpectedly", name),
                correlation_id,
            )
            .with_detail("panic", message),
        }
    }
}

impl fmt::Display for DispatchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound { name } => write!(f, "tool not found: {}", name),
            Self::Failed(failure) => write!(f, "{}", failure),
            Self::Panicked { name, message } => write!(f, "tool {} panicked: {}", name, message),
        }
    }
}

impl std::error::Error for DispatchError {}

/// One request to run a tool
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    /// Tool name
    pub tool: String,
    /// Raw parameters
    pub params: Params,
    /// Raw `--task-ref` value
    pub task_ref: Option<String>,
}

impl Invocation {
    /// Invocation with no parameters
    #[must_use]
    pub fn new(tool: impl Into<String>) -> Self {
        Self {
            tool: tool.into(),
            params: Params::new(),
            task_ref: None,
        }
    }

    /// Add a parameter
    #[must_use]
    pub fn with_param(mut self, name: impl Into<String>, value: impl Into<ParamValue>) -> Self {
        self.params.insert(name.into(), value.into());
        self
    }

    /// Replace all parameters
    #[must_use]
    pub fn with_params(mut self, params: Params) -> Self {
        self.params = params;
        self
    }

    /// Set the task reference
    #[must_use]
    pub fn with_task_ref(mut self, task_ref: impl Into<String>) -> Self {
        self.task_ref = Some(task_ref.into());
        self
    }
}

/// Runs tools from a frozen registry against one data directory
#[derive(Debug, Clone)]
pub struct Dispatcher {
    registry: Arc<ToolRegistry>,
    data_dir: PathBuf,
}

impl Dispatcher {
    /// Create a dispatcher
    #[must_use]
    pub fn new(registry: Arc<ToolRegistry>, data_dir: impl Into<PathBuf>) -> Self {
        Self {
            registry,
            data_dir: data_dir.into(),
        }
    }

    /// The registry tools are looked up in
    #[must_use]
    pub fn registry(&self) -> &Arc<ToolRegistry> {
        &self.registry
    }

    /// Root directory for path parameters
    #[must_use]
    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    fn resolve(&self, name: &str) -> Result<&ToolEntry, DispatchError> {
        self.registry.lookup(name).map_err(|_| DispatchError::NotFound {
            name: name.to_string(),
        })
    }

    /// Run a tool's handler with already-validated parameters.
    ///
    /// # Errors
    ///
    /// - `DispatchError::NotFound` if no tool has this name
    /// - `DispatchError::Failed` with the handler's failure
    /// - `DispatchError::Panicked` if the handler panicked
    pub fn execute_tool(
        &self,
        ctx: &ToolContext,
        name: &str,
        params: &Params,
    ) -> Result<ToolOutput, DispatchError> {
        let handler = Arc::clone(&self.resolve(name)?.handler);

        tracing::debug!(tool = name, correlation_id = %ctx.correlation_id, "executing tool");
        match panic::catch_unwind(AssertUnwindSafe(|| handler.execute(ctx, params))) {
            Ok(Ok(output)) => Ok(output),
            Ok(Err(failure)) => Err(DispatchError::Failed(failure)),
            Err(payload) => Err(DispatchError::Panicked {
                name: name.to_string(),
                message: panic_message(payload.as_ref()),
            }),
        }
    }

    /// Run the full pipeline and produce the envelope
    #[must_use]
    pub fn invoke(&self, invocation: Invocation) -> Envelope {
        let Invocation {
            tool,
            mut params,
            task_ref,
        } = invocation;
        let mut tracker = InvocationContext::begin(&tool);
        let correlation_id = tracker.correlation_id();
        tracing::info!(correlation_id = %correlation_id, tool = %tool, "tool invocation started");

        let rules = match self.resolve(&tool) {
            Ok(entry) => entry.info.rules.clone(),
            Err(err) => return self.finish(&tracker, Err(err.into_tool_error(correlation_id))),
        };

        if let Some(raw) = task_ref.filter(|raw| !raw.trim().is_empty()) {
            let Some(canonical) = normalize_task_ref(&raw) else {
                let mut errors = Map::new();
                errors.insert(
                    TASK_REF_FIELD.to_string(),
                    Value::Array(vec![Value::String(invalid_task_ref_message(&raw))]),
                );
                let error = ToolError::new(
                    ErrorCode::Validation,
                    invalid_task_ref_message(&raw),
                    correlation_id,
                )
                .with_detail("errors", Value::Object(errors));
                return self.finish(&tracker, Err(error));
            };
            tracker.set_task_ref(canonical.clone());
            params.insert(TASK_REF_FIELD.to_string(), ParamValue::String(canonical));
        }

        let validation = validate_parameters(&params, &rules, &self.data_dir);
        if !validation.valid {
            let message = match validation.first_error() {
                Some(first) if validation.error_count() > 1 => format!(
                    "invalid parameters: {} (and {} more)",
                    first,
                    validation.error_count() - 1
                ),
                Some(first) => format!("invalid parameters: {}", first),
                None => "invalid parameters".to_string(),
            };
            let error = ToolError::new(ErrorCode::Validation, message, correlation_id)
                .with_detail("errors", validation.errors_json());
            return self.finish(&tracker, Err(error));
        }
        params.extend(validation.normalized);

        if let Some(task_ref) = params.get(TASK_REF_FIELD).and_then(ParamValue::as_str) {
            if let Some(canonical) = normalize_task_ref(task_ref) {
                tracker.set_task_ref(canonical);
            }
        }

        let ctx = tracker.tool_context(&self.data_dir);
        let outcome = match self.execute_tool(&ctx, &tool, &params) {
            Ok(output) => {
                if let Some(status) = output.auth_status.clone() {
                    tracker.record_auth_status(status);
                }
                let mut data = Map::new();
                data.insert("result".to_string(), output.data);
                if let Some(source) = output.evidence_source {
                    tracker.record_data_source(source.source.as_str());
                    match serde_json::to_value(&source) {
                        Ok(value) => {
                            data.insert("evidence_source".to_string(), value);
                        }
                        Err(err) => {
                            tracing::warn!(error = %err, "failed to serialize evidence source");
                        }
                    }
                }
                Ok(Value::Object(data))
            }
            Err(err) => {
                tracing::error!(correlation_id = %correlation_id, tool = %tool, error = %err, "tool failed");
                Err(err.into_tool_error(correlation_id))
            }
        };
        self.finish(&tracker, outcome)
    }

    /// Envelope for `tool list`: `{tools: [...], count: N}`
    #[must_use]
    pub fn list_tools(&self) -> Envelope {
        let tracker = InvocationContext::begin("list");
        let tools = self.registry.list();
        let outcome = serde_json::to_value(&tools)
            .map(|tools| serde_json::json!({ "tools": tools, "count": self.registry.count() }))
            .map_err(|err| {
                ToolError::new(
                    ErrorCode::Internal,
                    format!("failed to serialize tool list: {}", err),
                    tracker.correlation_id(),
                )
            });
        self.finish(&tracker, outcome)
    }

    /// Envelope for `tool stats`
    #[must_use]
    pub fn registry_stats(&self) -> Envelope {
        let tracker = InvocationContext::begin("stats");
        let outcome = serde_json::to_value(self.registry.stats()).map_err(|err| {
            ToolError::new(
                ErrorCode::Internal,
                format!("failed to serialize registry stats: {}", err),
                tracker.correlation_id(),
            )
        });
        self.finish(&tracker, outcome)
    }

    fn finish(&self, tracker: &InvocationContext, outcome: Result<Value, ToolError>) -> Envelope {
        let meta = tracker.finish();
        tracing::info!(
            correlation_id = %meta.correlation_id,
            tool = %meta.tool,
            duration_ms = meta.duration_ms,
            success = outcome.is_ok(),
            "tool invocation finished"
        );
        match outcome {
            Ok(data) => Envelope::success(data, meta),
            Err(error) => Envelope::error(error, meta),
        }
    }
}

fn invalid_task_ref_message(raw: &str) -> String {
    format!(
        "invalid task reference format: '{}'. Expected formats: ET-101, ET 101, ET101, 328001, or plain numeric ID",
        raw
    )
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
