//! Parameter validation and path safety.
//!
//! [`validate_parameters`] walks a [`RuleSet`] in order and checks each
//! declared field. It never fails and never panics: every problem, including
//! a broken rule, becomes a message in [`ValidationResult::errors`].
//! Parameters without a rule pass through untouched.

use indexmap::IndexMap;
use regex::Regex;
use serde::Serialize;
use serde_json::Value;
use std::path::{Component, Path, PathBuf};

use crate::normalize::normalize_task_ref;
use crate::params::{ParamValue, Params};
use crate::schema::{ParamType, RuleSet, ValidationRule};

/// Field name treated as a task reference without an explicit opt-in.
pub const TASK_REF_FIELD: &str = "task_ref";

/// Path components refused anywhere in a path parameter.
pub const DENIED_COMPONENTS: &[&str] = &[".ssh", ".git", ".env"];

/// Outcome of validating one parameter map
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationResult {
    /// True iff `errors` is empty
    pub valid: bool,
    /// Messages per field, in rule order
    pub errors: IndexMap<String, Vec<String>>,
    /// Canonicalized values for fields that were transformed
    pub normalized: Params,
}

impl ValidationResult {
    /// Empty, valid result
    #[must_use]
    pub fn new() -> Self {
        Self {
            valid: true,
            errors: IndexMap::new(),
            normalized: Params::new(),
        }
    }

    /// Record an error against a field
    pub fn add_error(&mut self, field: &str, message: impl Into<String>) {
        self.valid = false;
        self.errors
            .entry(field.to_string())
            .or_default()
            .push(message.into());
    }

    /// Total number of messages
    #[must_use]
    pub fn error_count(&self) -> usize {
        self.errors.values().map(Vec::len).sum()
    }

    /// First message, for one-line summaries
    #[must_use]
    pub fn first_error(&self) -> Option<&str> {
        self.errors
            .values()
            .flat_map(|messages| messages.iter())
            .map(String::as_str)
            .next()
    }

    /// Errors as a JSON object of field to message list
    #[must_use]
    pub fn errors_json(&self) -> Value {
        Value::Object(
            self.errors
                .iter()
                .map(|(field, messages)| {
                    (
                        field.clone(),
                        Value::Array(messages.iter().cloned().map(Value::String).collect()),
                    )
                })
                .collect(),
        )
    }
}

impl Default for ValidationResult {
    fn default() -> Self {
        Self::new()
    }
}

/// Validate `params` against `rules`, confining path fields to `root`.
///
/// Per field, in rule order:
/// 1. absent or empty: error if required, otherwise skipped
/// 2. type check; `int` and `bool` accept parseable strings and emit the
///    coerced value in `normalized`. A mismatch stops checks for the field
/// 3. task references are canonicalized before any string check, so
///    patterns see the canonical spelling
/// 4. length bounds, pattern and allowed values; each failure is recorded
/// 5. path safety for `path` fields that ask for it
#[must_use]
pub fn validate_parameters(params: &Params, rules: &RuleSet, root: &Path) -> ValidationResult {
    let mut result = ValidationResult::new();

    for (field, rule) in rules {
        let Some(value) = params.get(field).filter(|v| !v.is_empty()) else {
            if rule.required {
                result.add_error(field, format!("{} is required", field));
            }
            continue;
        };

        match rule.param_type {
            ParamType::String => check_string(field, value, rule, &mut result),
            ParamType::Int => check_int(field, value, &mut result),
            ParamType::Bool => check_bool(field, value, &mut result),
            ParamType::Path => check_path(field, value, rule, root, &mut result),
        }
    }

    if result.valid {
        tracing::debug!(fields = rules.len(), normalized = result.normalized.len(), "parameters valid");
    } else {
        tracing::debug!(errors = result.error_count(), "parameters invalid");
    }
    result
}

fn check_string(field: &str, value: &ParamValue, rule: &ValidationRule, result: &mut ValidationResult) {
    let Some(mut text) = value.as_text() else {
        result.add_error(field, format!("{} must be a string", field));
        return;
    };

    if rule.task_reference || field == TASK_REF_FIELD {
        if let Some(canonical) = normalize_task_ref(&text) {
            result
                .normalized
                .insert(field.to_string(), ParamValue::String(canonical.clone()));
            text = canonical;
        }
    }

    let length = text.chars().count();
    if let Some(min) = rule.min_length {
        if length < min {
            result.add_error(field, format!("{} must be at least {} characters long", field, min));
        }
    }
    if let Some(max) = rule.max_length {
        if length > max {
            result.add_error(field, format!("{} must be no more than {} characters long", field, max));
        }
    }

    if let Some(pattern) = &rule.pattern {
        match Regex::new(pattern) {
            Ok(re) => {
                if !re.is_match(&text) {
                    result.add_error(field, format!("{} does not match required pattern: {}", field, pattern));
                }
            }
            Err(err) => {
                tracing::warn!(field, pattern = %pattern, error = %err, "invalid validation pattern");
                result.add_error(field, format!("{} has an invalid validation pattern", field));
            }
        }
    }

    if let Some(allowed) = &rule.allowed_values {
        if !allowed.iter().any(|candidate| *candidate == text) {
            result.add_error(field, format!("{} must be one of: {}", field, allowed.join(", ")));
        }
    }
}

fn check_int(field: &str, value: &ParamValue, result: &mut ValidationResult) {
    match value {
        ParamValue::Int(_) => {}
        ParamValue::String(s) => match s.trim().parse::<i64>() {
            Ok(n) => {
                result.normalized.insert(field.to_string(), ParamValue::Int(n));
            }
            Err(_) => result.add_error(field, format!("{} must be an integer", field)),
        },
        _ => result.add_error(field, format!("{} must be an integer", field)),
    }
}

fn check_bool(field: &str, value: &ParamValue, result: &mut ValidationResult) {
    match value {
        ParamValue::Bool(_) => {}
        ParamValue::String(s) => match parse_bool(s) {
            Some(b) => {
                result.normalized.insert(field.to_string(), ParamValue::Bool(b));
            }
            None => result.add_error(field, format!("{} must be a boolean", field)),
        },
        _ => result.add_error(field, format!("{} must be a boolean", field)),
    }
}

fn check_path(
    field: &str,
    value: &ParamValue,
    rule: &ValidationRule,
    root: &Path,
    result: &mut ValidationResult,
) {
    let Some(path) = value.as_path() else {
        result.add_error(field, format!("{} must be a path", field));
        return;
    };
    if rule.path_safety {
        if let Err(message) = check_path_safety(&path, root) {
            result.add_error(field, message);
        }
    }
}

/// Parse the boolean spellings accepted on the command line.
#[must_use]
pub fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "t" | "1" | "yes" => Some(true),
        "false" | "f" | "0" | "no" => Some(false),
        _ => None,
    }
}

/// Check that `path` stays inside `root`.
///
/// Lexical checks run first (`..`, denied components, absolute paths outside
/// the root). If the path, or the deepest existing ancestor of it, is on
/// disk, symlinks are resolved and containment is checked again. The path
/// itself is never rewritten.
///
/// # Errors
///
/// Returns the user-facing message describing the violation.
pub fn check_path_safety(path: &Path, root: &Path) -> Result<(), String> {
    if path.components().any(|c| matches!(c, Component::ParentDir)) {
        return Err("path traversal not allowed (contains '..')".to_string());
    }

    for component in path.components() {
        if let Component::Normal(name) = component {
            let name = name.to_string_lossy().to_ascii_lowercase();
            if let Some(denied) = DENIED_COMPONENTS.iter().find(|d| **d == name) {
                return Err(format!("path contains potentially dangerous component: {}", denied));
            }
        }
    }

    let root = lexical_absolute(root);
    let joined = if path.is_absolute() {
        let candidate = lexical_absolute(path);
        if !candidate.starts_with(&root) {
            return Err(format!("absolute path escapes data directory: {}", root.display()));
        }
        candidate
    } else {
        root.join(path)
    };

    let Some(existing) = joined
        .ancestors()
        .find(|ancestor| ancestor.starts_with(&root) && ancestor.exists())
    else {
        // Nothing under the root exists yet; there is no symlink to follow.
        return Ok(());
    };

    let escape = || format!("path resolves outside data directory: {}", root.display());
    let canonical_root = root.canonicalize().map_err(|_| escape())?;
    let canonical = existing.canonicalize().map_err(|_| escape())?;
    if canonical.starts_with(&canonical_root) {
        Ok(())
    } else {
        tracing::warn!(path = %path.display(), resolved = %canonical.display(), "symlink escapes data directory");
        Err(escape())
    }
}

/// Make `path` absolute against the working directory and drop `.`
/// components without touching the filesystem.
fn lexical_absolute(path: &Path) -> PathBuf {
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .map(|cwd| cwd.join(path))
            .unwrap_or_else(|_| path.to_path_buf())
    };

    let mut out = PathBuf::new();
    for component in absolute.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use tempfile::TempDir;

    fn params(pairs: &[(&str, ParamValue)]) -> Params {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), v.clone()))
            .collect()
    }

    fn rules(pairs: &[(&str, ValidationRule)]) -> RuleSet {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn test_required_missing_and_empty() {
        let rules = rules(&[("name", ValidationRule::string().required())]);

        let result = validate_parameters(&Params::new(), &rules, Path::new("/data"));
        assert!(!result.valid);
        assert_eq!(result.errors["name"], vec!["name is required".to_string()]);

        let result = validate_parameters(&params(&[("name", "  ".into())]), &rules, Path::new("/data"));
        assert_eq!(result.errors["name"], vec!["name is required".to_string()]);
    }

    #[test]
    fn test_optional_absent_skipped() {
        let rules = rules(&[("name", ValidationRule::string().with_min_length(3))]);
        let result = validate_parameters(&Params::new(), &rules, Path::new("/data"));
        assert!(result.valid);
        assert!(result.normalized.is_empty());
    }

    #[test]
    fn test_unruled_params_pass_through() {
        let result = validate_parameters(
            &params(&[("extra", ParamValue::Bool(true))]),
            &RuleSet::new(),
            Path::new("/data"),
        );
        assert!(result.valid);
        assert!(result.normalized.is_empty());
    }

    #[test]
    fn test_type_mismatch_stops_field() {
        let rules = rules(&[("name", ValidationRule::string().with_min_length(50))]);
        let result = validate_parameters(&params(&[("name", 5i64.into())]), &rules, Path::new("/data"));
        assert_eq!(result.errors["name"], vec!["name must be a string".to_string()]);
    }

    #[test]
    fn test_int_coercion() {
        let rules = rules(&[("limit", ValidationRule::int())]);
        let result = validate_parameters(&params(&[("limit", " 42 ".into())]), &rules, Path::new("/data"));
        assert!(result.valid);
        assert_eq!(result.normalized["limit"], ParamValue::Int(42));

        let result = validate_parameters(&params(&[("limit", "4x".into())]), &rules, Path::new("/data"));
        assert_eq!(result.errors["limit"], vec!["limit must be an integer".to_string()]);

        let result = validate_parameters(&params(&[("limit", true.into())]), &rules, Path::new("/data"));
        assert!(!result.valid);
    }

    #[test]
    fn test_bool_coercion() {
        let rules = rules(&[("force", ValidationRule::bool())]);
        for (raw, expected) in [("YES", true), ("t", true), ("0", false), ("False", false)] {
            let result = validate_parameters(&params(&[("force", raw.into())]), &rules, Path::new("/data"));
            assert_eq!(result.normalized["force"], ParamValue::Bool(expected), "{raw}");
        }
        let result = validate_parameters(&params(&[("force", "maybe".into())]), &rules, Path::new("/data"));
        assert_eq!(result.errors["force"], vec!["force must be a boolean".to_string()]);
    }

    #[test]
    fn test_string_checks_accumulate() {
        let rules = rules(&[(
            "kind",
            ValidationRule::string()
                .with_min_length(5)
                .with_pattern("^[a-z]+$")
                .with_allowed_values(["policy", "control"]),
        )]);
        let result = validate_parameters(&params(&[("kind", "AB".into())]), &rules, Path::new("/data"));
        assert_eq!(result.errors["kind"].len(), 3);
        assert_eq!(result.error_count(), 3);
        assert_eq!(result.first_error(), Some("kind must be at least 5 characters long"));
    }

    #[test]
    fn test_min_length_counts_chars() {
        let rules = rules(&[("name", ValidationRule::string().with_min_length(3))]);
        let result = validate_parameters(&params(&[("name", "héé".into())]), &rules, Path::new("/data"));
        assert!(result.valid);
    }

    #[test]
    fn test_max_length() {
        let rules = rules(&[("name", ValidationRule::string().with_max_length(3))]);
        let result = validate_parameters(&params(&[("name", "abcd".into())]), &rules, Path::new("/data"));
        assert_eq!(result.errors["name"], vec!["name must be no more than 3 characters long".to_string()]);
    }

    #[test]
    fn test_allowed_values_case_sensitive() {
        let rules = rules(&[("kind", ValidationRule::string().with_allowed_values(["policy"]))]);
        let result = validate_parameters(&params(&[("kind", "Policy".into())]), &rules, Path::new("/data"));
        assert!(!result.valid);
    }

    #[test]
    fn test_invalid_pattern_fails_closed() {
        let rules = rules(&[("name", ValidationRule::string().with_pattern("(unclosed"))]);
        let result = validate_parameters(&params(&[("name", "x".into())]), &rules, Path::new("/data"));
        assert_eq!(result.errors["name"], vec!["name has an invalid validation pattern".to_string()]);
    }

    #[test]
    fn test_task_ref_normalized_before_pattern() {
        let rules = rules(&[(
            "task_ref",
            ValidationRule::string().with_pattern(r"^(ET-?\s*\d+|\d+)$"),
        )]);
        let result = validate_parameters(&params(&[("task_ref", "et101".into())]), &rules, Path::new("/data"));
        assert!(result.valid, "{:?}", result.errors);
        assert_eq!(result.normalized["task_ref"], ParamValue::from("ET-0101"));
    }

    #[test]
    fn test_task_reference_opt_in() {
        let rules = rules(&[("evidence", ValidationRule::string().as_task_reference())]);
        let result = validate_parameters(&params(&[("evidence", "ET 7".into())]), &rules, Path::new("/data"));
        assert_eq!(result.normalized["evidence"], ParamValue::from("ET-0007"));

        let rules = self::rules(&[("evidence", ValidationRule::string())]);
        let result = validate_parameters(&params(&[("evidence", "ET 7".into())]), &rules, Path::new("/data"));
        assert!(result.normalized.is_empty());
    }

    #[test]
    fn test_errors_json() {
        let mut result = ValidationResult::new();
        result.add_error("path", "bad");
        assert_eq!(result.errors_json(), serde_json::json!({"path": ["bad"]}));
        assert!(!result.valid);
    }

    #[test]
    fn test_path_traversal_rejected() {
        let err = check_path_safety(Path::new("../../etc/passwd"), Path::new("/data")).unwrap_err();
        assert_eq!(err, "path traversal not allowed (contains '..')");
        assert!(check_path_safety(Path::new("docs/../../x"), Path::new("/data")).is_err());
    }

    #[test]
    fn test_path_denied_components() {
        let err = check_path_safety(Path::new("repo/.git/config"), Path::new("/data")).unwrap_err();
        assert!(err.contains(".git"));
        assert!(check_path_safety(Path::new(".SSH/id_rsa"), Path::new("/data")).is_err());
        assert!(check_path_safety(Path::new("notes.env.md"), Path::new("/data")).is_ok());
    }

    #[test]
    fn test_absolute_path_outside_root() {
        let err = check_path_safety(Path::new("/etc/passwd"), Path::new("/data")).unwrap_err();
        assert_eq!(err, "absolute path escapes data directory: /data");
        assert!(check_path_safety(Path::new("/database/x"), Path::new("/data")).is_err());
    }

    #[test]
    fn test_contained_paths_accepted() {
        assert!(check_path_safety(Path::new("/data/docs/a.md"), Path::new("/data")).is_ok());
        assert!(check_path_safety(Path::new("docs/a.md"), Path::new("/data")).is_ok());
        assert!(check_path_safety(Path::new("./docs/./a.md"), Path::new("/data/.")).is_ok());
    }

    #[test]
    fn test_existing_file_accepted() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir(dir.path().join("docs")).unwrap();
        std::fs::write(dir.path().join("docs/a.md"), "x").unwrap();
        assert!(check_path_safety(Path::new("docs/a.md"), dir.path()).is_ok());
        assert!(check_path_safety(Path::new("docs/new.md"), dir.path()).is_ok());
    }

    #[cfg(unix)]
    #[test]
    fn test_symlink_escape_rejected() {
        let outside = TempDir::new().unwrap();
        let root = TempDir::new().unwrap();
        std::fs::write(outside.path().join("secret.txt"), "x").unwrap();
        std::os::unix::fs::symlink(outside.path(), root.path().join("link")).unwrap();

        let err = check_path_safety(Path::new("link/secret.txt"), root.path()).unwrap_err();
        assert!(err.starts_with("path resolves outside data directory"));
        // A file that does not exist yet, under an escaping directory link.
        assert!(check_path_safety(Path::new("link/new.txt"), root.path()).is_err());
    }

    #[test]
    fn test_path_rule_value_not_rewritten() {
        let rules = rules(&[("path", ValidationRule::path().required().with_path_safety())]);
        let result = validate_parameters(&params(&[("path", "docs/a.md".into())]), &rules, Path::new("/data"));
        assert!(result.valid);
        assert!(result.normalized.is_empty());

        let result = validate_parameters(&params(&[("path", 3i64.into())]), &rules, Path::new("/data"));
        assert_eq!(result.errors["path"], vec!["path must be a path".to_string()]);
    }

    #[test]
    fn test_parse_bool() {
        assert_eq!(parse_bool("Yes"), Some(true));
        assert_eq!(parse_bool("no"), Some(false));
        assert_eq!(parse_bool("2"), None);
    }

    fn arb_value() -> impl Strategy<Value = ParamValue> {
        prop_oneof![
            any::<bool>().prop_map(ParamValue::Bool),
            any::<i64>().prop_map(ParamValue::Int),
            "\\PC{0,24}".prop_map(ParamValue::String),
            "[a-z./]{0,16}".prop_map(|s| ParamValue::Path(PathBuf::from(s))),
            proptest::collection::vec("[a-z]{0,4}", 0..3).prop_map(ParamValue::List),
        ]
    }

    fn arb_rule() -> impl Strategy<Value = ValidationRule> {
        (
            any::<bool>(),
            prop_oneof![
                Just(ParamType::String),
                Just(ParamType::Int),
                Just(ParamType::Bool),
                Just(ParamType::Path),
            ],
            proptest::option::of("[a-z(\\[*+?]{0,6}"),
            proptest::option::of(0usize..8),
            any::<bool>(),
            any::<bool>(),
        )
            .prop_map(|(required, param_type, pattern, min_length, path_safety, task_reference)| {
                ValidationRule {
                    required,
                    param_type,
                    pattern,
                    allowed_values: None,
                    min_length,
                    max_length: None,
                    path_safety,
                    task_reference,
                }
            })
    }

    proptest! {
        #[test]
        fn prop_never_panics_and_valid_matches_errors(
            entries in proptest::collection::vec(("[a-z_]{1,8}", arb_value()), 0..6),
            rule_entries in proptest::collection::vec(("[a-z_]{1,8}", arb_rule()), 0..6),
        ) {
            let params: Params = entries.into_iter().collect();
            let rules: RuleSet = rule_entries.into_iter().collect();
            let result = validate_parameters(&params, &rules, Path::new("/data"));
            prop_assert_eq!(result.valid, result.errors.is_empty());
        }

        #[test]
        fn prop_dotdot_always_rejected(prefix in "[a-z]{0,6}", suffix in "[a-z]{0,6}") {
            let path = PathBuf::from(prefix).join("..").join(suffix);
            prop_assert!(check_path_safety(&path, Path::new("/data")).is_err());
        }
    }
}
