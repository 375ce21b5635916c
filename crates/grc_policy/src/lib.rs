//! grctool redaction policy
//!
//! Everything written by a tool passes through a [`Redactor`] before it
//! leaves the process. Secrets are masked, never dropped, so the shape of
//! the payload stays intact for debugging.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod redact;

pub use redact::{RedactedView, RedactionRule, Redactor, MASK};
