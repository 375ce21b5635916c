//! Declarative parameter rules.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Rules for a tool's parameters, keyed by field name and checked in order.
pub type RuleSet = IndexMap<String, ValidationRule>;

/// Expected type of a parameter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParamType {
    /// Free text
    #[default]
    String,
    /// Signed integer
    Int,
    /// Boolean
    Bool,
    /// Filesystem path
    Path,
}

impl fmt::Display for ParamType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::String => "string",
            Self::Int => "int",
            Self::Bool => "bool",
            Self::Path => "path",
        };
        write!(f, "{}", name)
    }
}

/// Constraint on one named parameter.
///
/// `pattern`, `allowed_values`, the length bounds and `task_reference` only apply
/// to [`ParamType::String`]; `path_safety` only to [`ParamType::Path`].
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidationRule {
    /// Whether the field must be present and non-empty
    pub required: bool,
    /// Expected type
    #[serde(rename = "type")]
    pub param_type: ParamType,
    /// Regex the value must match
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,
    /// Exhaustive list of accepted values (case-sensitive)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub allowed_values: Option<Vec<String>>,
    /// Minimum length in characters
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_length: Option<usize>,
    /// Maximum length in characters
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_length: Option<usize>,
    /// Confine the path to the data directory
    pub path_safety: bool,
    /// Canonicalize the value as an evidence-task reference
    pub task_reference: bool,
}

impl ValidationRule {
    /// Optional rule of the given type
    #[must_use]
    pub fn new(param_type: ParamType) -> Self {
        Self {
            param_type,
            ..Self::default()
        }
    }

    /// Optional string
    #[must_use]
    pub fn string() -> Self {
        Self::new(ParamType::String)
    }

    /// Optional integer
    #[must_use]
    pub fn int() -> Self {
        Self::new(ParamType::Int)
    }

    /// Optional boolean
    #[must_use]
    pub fn bool() -> Self {
        Self::new(ParamType::Bool)
    }

    /// Optional path
    #[must_use]
    pub fn path() -> Self {
        Self::new(ParamType::Path)
    }

    /// Mark as required
    #[must_use]
    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    /// Set a regex pattern
    #[must_use]
    pub fn with_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.pattern = Some(pattern.into());
        self
    }

    /// Restrict to a set of values
    #[must_use]
    pub fn with_allowed_values<I, S>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.allowed_values = Some(values.into_iter().map(Into::into).collect());
        self
    }

    /// Set a minimum length
    #[must_use]
    pub fn with_min_length(mut self, min: usize) -> Self {
        self.min_length = Some(min);
        self
    }

    /// Set a maximum length
    #[must_use]
    pub fn with_max_length(mut self, max: usize) -> Self {
        self.max_length = Some(max);
        self
    }

    /// Confine to the data directory
    #[must_use]
    pub fn with_path_safety(mut self) -> Self {
        self.path_safety = true;
        self
    }

    /// Normalize as a task reference
    #[must_use]
    pub fn as_task_reference(mut self) -> Self {
        self.task_reference = true;
        self
    }
}
