//! Reference normalization.
//!
//! Humans type references loosely (`et101`, `ET 7`, `ac1`). Everything
//! downstream keys on the canonical spelling, so normalization happens once,
//! at the edge, and is idempotent. All digit handling is string-wise; a
//! reference with more digits than fit in a machine integer still
//! normalizes.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Minimum digits in a canonical evidence-task reference.
const TASK_REF_WIDTH: usize = 4;
/// Minimum digits in a canonical policy reference.
const POLICY_REF_WIDTH: usize = 4;
/// Minimum digits in a canonical control number.
const CONTROL_REF_WIDTH: usize = 2;

/// Control families accepted as control-reference prefixes.
pub const CONTROL_PREFIXES: &[&str] = &[
    "AA", "AC", "AT", "CC", "CM", "CR", "DP", "DS", "HR", "IM", "OM", "RM", "SO", "SS", "VM", "WS",
];

/// Reference normalization error
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReferenceError {
    /// Nothing to normalize
    Empty { kind: ReferenceKind },
    /// Input does not look like a reference of this kind
    Malformed { kind: ReferenceKind, value: String },
    /// Control given as a bare number
    MissingPrefix { value: String },
    /// Control prefix not in [`CONTROL_PREFIXES`]
    UnknownPrefix { prefix: String },
    /// Unrecognized reference kind name
    UnknownKind { kind: String },
}

impl fmt::Display for ReferenceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty { kind } => write!(f, "{} reference is empty", kind),
            Self::Malformed { kind, value } => {
                write!(f, "invalid {} reference: {}", kind, value)
            }
            Self::MissingPrefix { value } => write!(
                f,
                "control reference requires prefix (e.g., AC-1, CC-1.1): {}",
                value
            ),
            Self::UnknownPrefix { prefix } => {
                write!(f, "unknown control prefix: {}", prefix)
            }
            Self::UnknownKind { kind } => write!(
                f,
                "unknown document type: {} (expected evidence, policy or control)",
                kind
            ),
        }
    }
}

impl std::error::Error for ReferenceError {}

/// Kind of document a reference points at
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReferenceKind {
    /// Evidence task (`ET-0101`)
    Evidence,
    /// Policy (`POL-0001`)
    Policy,
    /// Control (`AC-01`, `CC-01_1`)
    Control,
}

impl ReferenceKind {
    /// Lowercase name
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Evidence => "evidence",
            Self::Policy => "policy",
            Self::Control => "control",
        }
    }
}

impl fmt::Display for ReferenceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for ReferenceKind {
    type Err = ReferenceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "evidence" => Ok(Self::Evidence),
            "policy" => Ok(Self::Policy),
            "control" => Ok(Self::Control),
            other => Err(ReferenceError::UnknownKind {
                kind: other.to_string(),
            }),
        }
    }
}

/// Canonicalize an evidence-task reference.
///
/// - `ET` + optional `-` + optional whitespace + digits (any case) becomes
///   `ET-` followed by the number padded to at least four digits
/// - bare digits are returned trimmed and otherwise unchanged
/// - anything else is `None`
///
/// ```
/// use grc_tool::normalize_task_ref;
///
/// assert_eq!(normalize_task_ref("et101").as_deref(), Some("ET-0101"));
/// assert_eq!(normalize_task_ref(" 328001 ").as_deref(), Some("328001"));
/// assert_eq!(normalize_task_ref("POL-1"), None);
/// ```
#[must_use]
pub fn normalize_task_ref(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if is_ascii_digits(trimmed) {
        return Some(trimmed.to_string());
    }
    let digits = strip_prefixed_number(trimmed, "ET")?;
    Some(format!("ET-{}", pad_number(digits, TASK_REF_WIDTH)))
}

/// Whether `raw` is recognized as an evidence-task reference.
#[must_use]
pub fn is_task_ref(raw: &str) -> bool {
    normalize_task_ref(raw).is_some()
}

/// Canonicalize a reference of the given kind.
///
/// | kind     | accepted                         | canonical           |
/// |----------|----------------------------------|---------------------|
/// | evidence | `ET-101`, `et 101`, `101`         | `ET-0101`           |
/// | policy   | `POL-1`, `pol1`, `1`              | `POL-0001`          |
/// | control  | `AC-1`, `ac 1`, `CC-1_1`, `CC1.1` | `AC-01`, `CC-01_1`  |
///
/// # Errors
///
/// Returns `ReferenceError` when the input is empty, malformed, a bare
/// numeric control, or uses an unknown control prefix.
pub fn normalize_reference(kind: ReferenceKind, raw: &str) -> Result<String, ReferenceError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(ReferenceError::Empty { kind });
    }
    let malformed = || ReferenceError::Malformed {
        kind,
        value: trimmed.to_string(),
    };

    match kind {
        ReferenceKind::Evidence => {
            let digits = if is_ascii_digits(trimmed) {
                trimmed
            } else {
                strip_prefixed_number(trimmed, "ET").ok_or_else(malformed)?
            };
            if is_zero(digits) {
                return Err(malformed());
            }
            Ok(format!("ET-{}", pad_number(digits, TASK_REF_WIDTH)))
        }
        ReferenceKind::Policy => {
            let digits = if is_ascii_digits(trimmed) {
                trimmed
            } else {
                strip_prefixed_number(trimmed, "POL").ok_or_else(malformed)?
            };
            if is_zero(digits) {
                return Err(malformed());
            }
            Ok(format!("POL-{}", pad_number(digits, POLICY_REF_WIDTH)))
        }
        ReferenceKind::Control => normalize_control(trimmed),
    }
}

fn normalize_control(value: &str) -> Result<String, ReferenceError> {
    if is_ascii_digits(value) {
        return Err(ReferenceError::MissingPrefix {
            value: value.to_string(),
        });
    }

    let malformed = || ReferenceError::Malformed {
        kind: ReferenceKind::Control,
        value: value.to_string(),
    };

    let prefix_len = value
        .char_indices()
        .find(|(_, c)| !c.is_ascii_alphabetic())
        .map_or(value.len(), |(i, _)| i);
    let prefix = value[..prefix_len].to_ascii_uppercase();
    if prefix.is_empty() {
        return Err(malformed());
    }
    if !CONTROL_PREFIXES.contains(&prefix.as_str()) {
        return Err(ReferenceError::UnknownPrefix { prefix });
    }

    let rest = &value[prefix_len..];
    let rest = rest.strip_prefix('-').unwrap_or(rest).trim_start();
    let (number, sub) = match rest.split_once(['_', '.']) {
        Some((number, sub)) => (number, Some(sub)),
        None => (rest, None),
    };
    if !is_ascii_digits(number) {
        return Err(malformed());
    }

    let mut canonical = format!("{}-{}", prefix, pad_number(number, CONTROL_REF_WIDTH));
    if let Some(sub) = sub {
        if !is_ascii_digits(sub) {
            return Err(malformed());
        }
        canonical.push('_');
        canonical.push_str(&pad_number(sub, 1));
    }
    Ok(canonical)
}

/// `<prefix>` + optional `-` + optional whitespace + digits, prefix matched
/// case-insensitively. Returns the digits.
fn strip_prefixed_number<'a>(value: &'a str, prefix: &str) -> Option<&'a str> {
    let head = value.get(..prefix.len())?;
    if !head.eq_ignore_ascii_case(prefix) {
        return None;
    }
    let rest = &value[prefix.len()..];
    let rest = rest.strip_prefix('-').unwrap_or(rest);
    let digits = rest.trim_start();
    is_ascii_digits(digits).then_some(digits)
}

fn is_ascii_digits(value: &str) -> bool {
    !value.is_empty() && value.bytes().all(|b| b.is_ascii_digit())
}

fn is_zero(digits: &str) -> bool {
    digits.bytes().all(|b| b == b'0')
}

/// Strip leading zeros, then left-pad with zeros to `width`.
fn pad_number(digits: &str, width: usize) -> String {
    let significant = digits.trim_start_matches('0');
    format!("{:0>width$}", significant, width = width.max(1))
}
