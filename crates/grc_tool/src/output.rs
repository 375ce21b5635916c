//! Envelope rendering.
//!
//! Secrets are scrubbed from `data`, `error.message` and `error.details`
//! before anything is serialized. `meta` is framework-generated and passes
//! through as is. The envelope itself is never modified.

use grc_policy::Redactor;
use serde_json::Value;
use std::io::{self, Stdout, Write};

use crate::envelope::Envelope;

/// Error writing an envelope
#[derive(Debug, thiserror::Error)]
pub enum OutputError {
    /// Envelope could not be serialized
    #[error("failed to serialize envelope: {0}")]
    Serialize(#[from] serde_json::Error),
    /// Output stream rejected the write
    #[error("failed to write envelope: {0}")]
    Io(#[from] io::Error),
}

/// Destination for envelopes
pub trait OutputWriter {
    /// Redact and write one envelope; `quiet` selects compact single-line JSON
    ///
    /// # Errors
    ///
    /// Returns error if serialization or the underlying write fails
    fn write_output(&mut self, envelope: &Envelope, quiet: bool) -> Result<(), OutputError>;
}

/// JSON writer over any `io::Write`
pub struct JsonOutputWriter<W: Write> {
    writer: W,
    redactor: Redactor,
}

impl JsonOutputWriter<Stdout> {
    /// Writer targeting stdout
    #[must_use]
    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }
}

impl<W: Write> JsonOutputWriter<W> {
    /// Writer with the standard redaction rules
    #[must_use]
    pub fn new(writer: W) -> Self {
        Self {
            writer,
            redactor: Redactor::standard(),
        }
    }

    /// Use a custom redactor
    #[must_use]
    pub fn with_redactor(mut self, redactor: Redactor) -> Self {
        self.redactor = redactor;
        self
    }

    /// Recover the underlying writer
    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write> OutputWriter for JsonOutputWriter<W> {
    fn write_output(&mut self, envelope: &Envelope, quiet: bool) -> Result<(), OutputError> {
        let rendered = render(envelope, quiet, &self.redactor)?;
        self.writer.write_all(rendered.as_bytes())?;
        self.writer.write_all(b"\n")?;
        self.writer.flush()?;
        Ok(())
    }
}

/// Serialize an envelope with secrets redacted.
///
/// # Errors
///
/// Returns error if the envelope cannot be converted to JSON
pub fn render(envelope: &Envelope, quiet: bool, redactor: &Redactor) -> Result<String, OutputError> {
    let mut value = serde_json::to_value(envelope)?;
    redact_envelope(&mut value, redactor);
    let text = if quiet {
        serde_json::to_string(&value)?
    } else {
        serde_json::to_string_pretty(&value)?
    };
    Ok(text)
}

fn redact_envelope(value: &mut Value, redactor: &Redactor) {
    let Some(root) = value.as_object_mut() else {
        return;
    };
    if let Some(data) = root.get_mut("data") {
        *data = redactor.redact_value(data);
    }
    if let Some(error) = root.get_mut("error").and_then(Value::as_object_mut) {
        for key in ["message", "details"] {
            if let Some(field) = error.get_mut(key) {
                *field = redactor.redact_value(field);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::envelope::{ErrorCode, ToolError, ToolMeta};
    use grc_core::{CorrelationId, Timestamp};
    use grc_policy::MASK;
    use serde_json::json;

    const TOKEN: &str = "Qw8Er5Ty2Ui9Op3As6Df1Gh4Jk7Lz0XcVbNmPoIu";

    fn meta() -> ToolMeta {
        ToolMeta {
            correlation_id: CorrelationId::new(),
            task_ref: Some("ET-0101".to_string()),
            tool: "docs-reader".to_string(),
            duration_ms: 12,
            timestamp: Timestamp::now(),
            auth_status: None,
            data_source: Some("local".to_string()),
        }
    }

    fn write(envelope: &Envelope, quiet: bool) -> String {
        let mut writer = JsonOutputWriter::new(Vec::new());
        writer.write_output(envelope, quiet).unwrap();
        String::from_utf8(writer.into_inner()).unwrap()
    }

    #[test]
    fn test_quiet_is_single_line() {
        let env = Envelope::success(json!({"result": {"a": 1}}), meta());
        let out = write(&env, true);
        assert_eq!(out.trim_end().lines().count(), 1);
        let parsed: Value = serde_json::from_str(&out).unwrap();
        assert_eq!(parsed["status"], json!("success"));
    }

    #[test]
    fn test_pretty_is_indented() {
        let env = Envelope::success(json!({"result": {"a": 1}}), meta());
        let out = write(&env, false);
        assert!(out.lines().count() > 1);
        assert!(out.contains("\n  \"data\""));
    }

    #[test]
    fn test_bearer_token_redacted_in_data() {
        assert_eq!(TOKEN.len(), 40);
        let env = Envelope::success(
            json!({"result": {"header": format!("Authorization: Bearer {TOKEN}"), "api_key": "k"}}),
            meta(),
        );
        let out = write(&env, true);
        assert!(!out.contains(TOKEN));
        assert!(out.contains(MASK));
        let parsed: Value = serde_json::from_str(&out).unwrap();
        assert_eq!(parsed["data"]["result"]["api_key"], json!(MASK));
    }

    #[test]
    fn test_session_and_auth_keys_redacted() {
        let env = Envelope::success(
            json!({"result": {"session": "sess-abc123", "auth": "admin:hunter2", "x_api_key_id": "k1"}}),
            meta(),
        );
        let out = write(&env, true);
        assert!(!out.contains("sess-abc123"));
        assert!(!out.contains("admin:hunter2"));
        assert!(!out.contains("\"k1\""));
        let parsed: Value = serde_json::from_str(&out).unwrap();
        assert_eq!(parsed["data"]["result"]["auth"], json!(MASK));
    }

    #[test]
    fn test_error_message_and_details_redacted() {
        let meta = meta();
        let error = ToolError::new(
            ErrorCode::Internal,
            format!("request failed with token={TOKEN}"),
            meta.correlation_id,
        )
        .with_detail("cookie", "session=abc");
        let env = Envelope::error(error, meta);
        let out = write(&env, true);
        assert!(!out.contains(TOKEN));
        assert!(!out.contains("session=abc"));
        let parsed: Value = serde_json::from_str(&out).unwrap();
        assert_eq!(parsed["error"]["code"], json!("INTERNAL"));
    }

    #[test]
    fn test_meta_untouched_and_envelope_not_mutated() {
        let env = Envelope::success(json!({"result": {"password": "hunter2"}}), meta());
        let before = env.clone();
        let out = write(&env, true);
        assert_eq!(env, before);
        let parsed: Value = serde_json::from_str(&out).unwrap();
        assert_eq!(parsed["meta"]["task_ref"], json!("ET-0101"));
        assert_eq!(parsed["meta"]["correlation_id"], json!(env.meta().correlation_id.to_string()));
    }

    struct FailingWriter;

    impl Write for FailingWriter {
        fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
            Err(io::Error::new(io::ErrorKind::BrokenPipe, "closed"))
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_write_failure_is_reported() {
        let env = Envelope::success(json!({}), meta());
        let mut writer = JsonOutputWriter::new(FailingWriter);
        let err = writer.write_output(&env, true).unwrap_err();
        assert!(matches!(err, OutputError::Io(_)));
    }
}
