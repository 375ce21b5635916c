//! Data redaction for sensitive information.
//!
//! Two mechanisms run together:
//! - key-based: any value stored under a sensitive key (`password`,
//!   `api_key`, `cookie`, ...) is replaced wholesale;
//! - value-based: string values are scanned for secret-shaped substrings
//!   (bearer tokens, cookie headers, `token=...` assignments, well-known
//!   vendor prefixes, long opaque tokens) and only the secret part is masked.

use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashSet;

/// Fixed-length mask written in place of every secret.
pub const MASK: &str = "[REDACTED]";

/// Minimum length of an opaque token candidate.
const OPAQUE_TOKEN_MIN_LEN: usize = 40;

/// A separator-free run this long inside a candidate marks it as a token
/// rather than a slug or a path.
const OPAQUE_SEGMENT_MIN_LEN: usize = 24;

/// Key names that always hold secrets. A key matches when these segments
/// appear as a contiguous run of its `_`-separated segments, so `api_key`,
/// `x_api_key_id` and `password_hash` all match but `keywords` does not.
const SENSITIVE_KEYS: &[&str] = &[
    "api_key",
    "apikey",
    "token",
    "access_token",
    "refresh_token",
    "bearer_token",
    "password",
    "passwd",
    "pwd",
    "secret",
    "client_secret",
    "cookie",
    "session",
    "session_id",
    "authorization",
    "auth",
    "key",
    "private_key",
    "public_key",
    "credential",
    "credentials",
    "x_api_key",
    "x_auth_token",
];

/// Exact key names that contain a sensitive segment but carry only status.
const NON_SENSITIVE_KEYS: &[&str] = &["auth_status", "auth_mode"];

/// Built-in value patterns, in application order.
static BUILTIN_RULES: Lazy<Vec<RedactionRule>> = Lazy::new(|| {
    let specs: [(&str, &str, String); 8] = [
        (
            "bearer_token",
            r"(?i)(\bbearer\s+)[A-Za-z0-9\-._~+/]+=*",
            format!("${{1}}{MASK}"),
        ),
        (
            "basic_auth",
            r"(?i)(\bbasic\s+)[A-Za-z0-9+/]{8,}={0,2}",
            format!("${{1}}{MASK}"),
        ),
        (
            "cookie_header",
            r"(?i)(\b(?:set-)?cookie\s*:\s*)[^\r\n]+",
            format!("${{1}}{MASK}"),
        ),
        (
            "secret_assignment",
            r#"(?i)(\b(?:api[_-]?key|access[_-]?token|auth[_-]?token|client[_-]?secret|secret|password|passwd|token)["']?\s*[:=]\s*["']?)[^\s"',;&]+"#,
            format!("${{1}}{MASK}"),
        ),
        (
            "github_token",
            r"\b(?:gh[pousr]_[A-Za-z0-9]{30,}|github_pat_[A-Za-z0-9_]{30,})",
            MASK.to_string(),
        ),
        (
            "aws_access_key",
            r"\b(?:AKIA|ASIA)[0-9A-Z]{16}\b",
            MASK.to_string(),
        ),
        (
            "secret_key_prefix",
            r"\bsk-[A-Za-z0-9_\-]{20,}",
            MASK.to_string(),
        ),
        (
            "opaque_token",
            r"[A-Za-z0-9_\-+/]{40,}={0,2}",
            MASK.to_string(),
        ),
    ];

    specs
        .into_iter()
        .filter_map(|(name, pattern, replacement)| {
            match RedactionRule::regex(name.to_string(), pattern, replacement) {
                Ok(rule) => Some(rule),
                Err(err) => {
                    tracing::error!(rule = name, error = %err, "built-in redaction rule failed to compile");
                    None
                }
            }
        })
        .map(|rule| {
            if rule.name == "opaque_token" {
                rule.with_filter(looks_like_opaque_token)
            } else {
                rule
            }
        })
        .collect()
});

/// Redaction rule
#[derive(Debug, Clone)]
pub struct RedactionRule {
    /// Rule name
    pub name: String,
    /// Compiled pattern
    pattern: Regex,
    /// Replacement string; may reference capture groups (`${1}`)
    pub replacement: String,
    /// Optional predicate a match must satisfy to be replaced
    filter: Option<fn(&str) -> bool>,
}

impl RedactionRule {
    /// Create a literal rule: every occurrence of `literal` is replaced
    #[must_use]
    pub fn new(name: String, literal: &str, replacement: String) -> Self {
        Self {
            name,
            pattern: Regex::new(&regex::escape(literal)).unwrap_or_else(|_| never_matches()),
            replacement: replacement.replace('$', "$$"),
            filter: None,
        }
    }

    /// Create a regex rule
    ///
    /// # Errors
    ///
    /// Returns error if the pattern is not a valid regex
    pub fn regex(name: String, pattern: &str, replacement: String) -> Result<Self, regex::Error> {
        Ok(Self {
            name,
            pattern: Regex::new(pattern)?,
            replacement,
            filter: None,
        })
    }

    /// Only replace matches accepted by `filter`
    #[must_use]
    pub fn with_filter(mut self, filter: fn(&str) -> bool) -> Self {
        self.filter = Some(filter);
        self
    }

    /// Pattern source
    #[must_use]
    pub fn pattern(&self) -> &str {
        self.pattern.as_str()
    }

    /// Apply rule to text, returning the new text and the number of replacements
    #[must_use]
    pub fn apply(&self, text: &str) -> (String, usize) {
        let mut count = 0;
        let out = self.pattern.replace_all(text, |caps: &Captures<'_>| {
            let whole = caps.get(0).map_or("", |m| m.as_str());
            if let Some(filter) = self.filter {
                if !filter(whole) {
                    return whole.to_string();
                }
            }
            count += 1;
            let mut expanded = String::new();
            caps.expand(&self.replacement, &mut expanded);
            expanded
        });
        (out.into_owned(), count)
    }
}

/// Redacted view of a string
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RedactedView {
    /// Redacted data
    pub redacted: String,
    /// Number of redactions applied
    pub redaction_count: usize,
    /// Rules that were applied
    pub applied_rules: Vec<String>,
}

impl RedactedView {
    /// Create a view with no redactions applied
    #[must_use]
    pub fn untouched(value: String) -> Self {
        Self {
            redacted: value,
            redaction_count: 0,
            applied_rules: Vec::new(),
        }
    }

    /// Get the redacted content
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.redacted
    }

    /// Check if any redactions were applied
    #[must_use]
    pub fn is_redacted(&self) -> bool {
        self.redaction_count > 0
    }
}

/// Redactor for applying redaction rules
#[derive(Debug, Clone)]
pub struct Redactor {
    /// Redaction rules
    rules: Vec<RedactionRule>,
    /// Fields to always redact, lowercase
    sensitive_fields: HashSet<String>,
}

impl Redactor {
    /// Create a redactor with no rules and no sensitive fields
    #[must_use]
    pub fn new() -> Self {
        Self {
            rules: Vec::new(),
            sensitive_fields: HashSet::new(),
        }
    }

    /// Create a redactor with the built-in secret patterns and key names
    #[must_use]
    pub fn standard() -> Self {
        Self {
            rules: BUILTIN_RULES.clone(),
            sensitive_fields: SENSITIVE_KEYS.iter().map(|k| (*k).to_string()).collect(),
        }
    }

    /// Add a redaction rule
    #[must_use]
    pub fn with_rule(mut self, rule: RedactionRule) -> Self {
        self.rules.push(rule);
        self
    }

    /// Add a sensitive field name
    #[must_use]
    pub fn with_sensitive_field(mut self, field: String) -> Self {
        self.sensitive_fields
            .insert(field.to_ascii_lowercase().replace('-', "_"));
        self
    }

    /// Redact a string value
    #[must_use]
    pub fn redact(&self, value: &str) -> RedactedView {
        let mut redacted = value.to_string();
        let mut redaction_count = 0;
        let mut applied_rules = Vec::new();

        for rule in &self.rules {
            let (next, count) = rule.apply(&redacted);
            if count > 0 {
                redaction_count += count;
                applied_rules.push(rule.name.clone());
            }
            redacted = next;
        }

        RedactedView {
            redacted,
            redaction_count,
            applied_rules,
        }
    }

    /// Redact a specific field
    #[must_use]
    pub fn redact_field(&self, field_name: &str, value: &str) -> RedactedView {
        if self.is_sensitive(field_name) {
            return RedactedView {
                redacted: MASK.to_string(),
                redaction_count: 1,
                applied_rules: vec!["sensitive_field".to_string()],
            };
        }

        self.redact(value)
    }

    /// Check if a field is sensitive
    #[must_use]
    pub fn is_sensitive(&self, field_name: &str) -> bool {
        let normalized = field_name.to_ascii_lowercase().replace('-', "_");
        if NON_SENSITIVE_KEYS.contains(&normalized.as_str()) {
            return false;
        }
        let segments = key_segments(&normalized);
        self.sensitive_fields.iter().any(|key| {
            let wanted = key_segments(key);
            !wanted.is_empty() && segments.windows(wanted.len()).any(|run| run == wanted.as_slice())
        })
    }

    /// Redact a JSON value recursively, returning a new value
    #[must_use]
    pub fn redact_value(&self, value: &Value) -> Value {
        let mut count = 0;
        let out = self.redact_value_counted(value, &mut count);
        if count > 0 {
            tracing::debug!(redactions = count, "redacted sensitive values");
        }
        out
    }

    fn redact_value_counted(&self, value: &Value, count: &mut usize) -> Value {
        match value {
            Value::String(s) => {
                let view = self.redact(s);
                *count += view.redaction_count;
                Value::String(view.redacted)
            }
            Value::Array(items) => Value::Array(
                items
                    .iter()
                    .map(|item| self.redact_value_counted(item, count))
                    .collect(),
            ),
            Value::Object(map) => {
                let mut out = serde_json::Map::with_capacity(map.len());
                for (k, v) in map {
                    if !v.is_null() && self.is_sensitive(k) {
                        *count += 1;
                        out.insert(k.clone(), Value::String(MASK.to_string()));
                    } else {
                        out.insert(k.clone(), self.redact_value_counted(v, count));
                    }
                }
                Value::Object(out)
            }
            Value::Null | Value::Bool(_) | Value::Number(_) => value.clone(),
        }
    }
}

impl Default for Redactor {
    fn default() -> Self {
        Self::standard()
    }
}

/// Accept a candidate only when some run between `/`, `-`, `_` or `+` is long.
/// Keeps long slugs and file paths readable while masking random tokens.
fn looks_like_opaque_token(candidate: &str) -> bool {
    candidate.len() >= OPAQUE_TOKEN_MIN_LEN
        && candidate
            .trim_end_matches('=')
            .split(['/', '-', '_', '+'])
            .any(|segment| segment.len() >= OPAQUE_SEGMENT_MIN_LEN)
}

fn never_matches() -> Regex {
    // `[^\s\S]` matches nothing and always compiles.
    Regex::new(r"[^\s\S]").unwrap_or_else(|_| unreachable!())
}

fn key_segments(key: &str) -> Vec<&str> {
    key.split('_').filter(|segment| !segment.is_empty()).collect()
}
