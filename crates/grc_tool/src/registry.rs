//! Tool registry.
//!
//! Tools are registered on a [`ToolRegistryBuilder`] at start-up and frozen
//! into a [`ToolRegistry`], which has no way to add or remove tools. The
//! frozen registry is shared read-only (`Arc<ToolRegistry>`).

use indexmap::IndexMap;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use crate::schema::{RuleSet, ValidationRule};
use crate::trait_::ToolHandler;

/// Category reported for tools registered without one.
pub const UNCATEGORIZED: &str = "uncategorized";

/// Error from registry operations
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    /// Tool already registered
    DuplicateTool { name: String },
    /// Tool name is empty or blank
    EmptyName,
    /// Tool not found
    NotFound { name: String },
}

impl fmt::Display for RegistryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DuplicateTool { name } => write!(f, "tool already registered: {}", name),
            Self::EmptyName => write!(f, "tool name must not be empty"),
            Self::NotFound { name } => write!(f, "tool not found: {}", name),
        }
    }
}

impl std::error::Error for RegistryError {}

/// Static description of a tool
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ToolInfo {
    /// Tool name; set on registration
    pub name: String,
    /// One-line description
    pub description: String,
    /// Grouping for listings and stats
    pub category: String,
    /// Parameter rules checked before dispatch
    pub rules: RuleSet,
}

impl ToolInfo {
    /// Describe a tool
    #[must_use]
    pub fn new(description: impl Into<String>) -> Self {
        Self {
            name: String::new(),
            description: description.into(),
            category: String::new(),
            rules: RuleSet::new(),
        }
    }

    /// Set the category
    #[must_use]
    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = category.into();
        self
    }

    /// Declare a parameter rule
    #[must_use]
    pub fn with_rule(mut self, field: impl Into<String>, rule: ValidationRule) -> Self {
        self.rules.insert(field.into(), rule);
        self
    }

    /// Category, or [`UNCATEGORIZED`] when none was given
    #[must_use]
    pub fn category_or_default(&self) -> &str {
        if self.category.trim().is_empty() {
            UNCATEGORIZED
        } else {
            &self.category
        }
    }
}

/// Entry for a registered tool
#[derive(Clone)]
pub struct ToolEntry {
    /// Static description
    pub info: ToolInfo,
    /// The tool itself
    pub handler: Arc<dyn ToolHandler>,
}

impl fmt::Debug for ToolEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ToolEntry")
            .field("info", &self.info)
            .finish_non_exhaustive()
    }
}

/// Aggregate registry statistics
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RegistryStats {
    /// Number of tools
    pub total_count: usize,
    /// Tools per category
    pub count_by_category: BTreeMap<String, usize>,
    /// Tool names, sorted
    pub tool_names: Vec<String>,
}

/// Collects tools before the registry is frozen
#[derive(Default)]
pub struct ToolRegistryBuilder {
    tools: IndexMap<String, ToolEntry>,
}

impl ToolRegistryBuilder {
    /// Create an empty builder
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a tool under `name`
    ///
    /// # Errors
    ///
    /// Returns error if the name is blank or already registered
    pub fn register(
        &mut self,
        name: impl Into<String>,
        handler: Arc<dyn ToolHandler>,
        mut info: ToolInfo,
    ) -> Result<(), RegistryError> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(RegistryError::EmptyName);
        }
        if self.tools.contains_key(&name) {
            return Err(RegistryError::DuplicateTool { name });
        }

        tracing::debug!(tool = %name, category = info.category_or_default(), "registering tool");
        info.name.clone_from(&name);
        self.tools.insert(name, ToolEntry { info, handler });
        Ok(())
    }

    /// Number of tools registered so far
    #[must_use]
    pub fn len(&self) -> usize {
        self.tools.len()
    }

    /// Whether nothing is registered yet
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Freeze into a read-only registry
    #[must_use]
    pub fn build(mut self) -> ToolRegistry {
        self.tools.sort_keys();
        ToolRegistry { tools: self.tools }
    }
}

/// Read-only registry of tools, ordered by name
pub struct ToolRegistry {
    tools: IndexMap<String, ToolEntry>,
}

impl ToolRegistry {
    /// Look up a tool
    ///
    /// # Errors
    ///
    /// Returns error if tool not found
    pub fn lookup(&self, name: &str) -> Result<&ToolEntry, RegistryError> {
        self.tools.get(name).ok_or_else(|| RegistryError::NotFound {
            name: name.to_string(),
        })
    }

    /// Check if a tool is registered
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    /// All tools, sorted by name
    #[must_use]
    pub fn list(&self) -> Vec<&ToolInfo> {
        self.tools.values().map(|entry| &entry.info).collect()
    }

    /// Aggregate statistics
    #[must_use]
    pub fn stats(&self) -> RegistryStats {
        let mut count_by_category = BTreeMap::new();
        for entry in self.tools.values() {
            *count_by_category
                .entry(entry.info.category_or_default().to_string())
                .or_insert(0) += 1;
        }

        RegistryStats {
            total_count: self.tools.len(),
            count_by_category,
            tool_names: self.tools.keys().cloned().collect(),
        }
    }

    /// Get the count of registered tools
    #[must_use]
    pub fn count(&self) -> usize {
        self.tools.len()
    }

    /// Check if registry is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

impl fmt::Debug for ToolRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ToolRegistry")
            .field("tools", &self.tools.keys().collect::<Vec<_>>())
            .finish()
    }
}
