//! Built-in tools.
//!
//! - `reference-normalizer`: canonicalize evidence, policy and control references
//! - `docs-reader`: read a document from the data directory

use grc_core::{CoreError, CoreResult};
use serde_json::json;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::context::ToolContext;
use crate::normalize::{normalize_reference, ReferenceError, ReferenceKind};
use crate::params::{ParamValue, Params};
use crate::registry::{RegistryError, ToolInfo, ToolRegistryBuilder};
use crate::schema::ValidationRule;
use crate::trait_::{EvidenceSource, SourceKind, ToolFailure, ToolOutput};

/// Name of the reference normalizer tool.
pub const REFERENCE_NORMALIZER: &str = "reference-normalizer";
/// Name of the document reader tool.
pub const DOCS_READER: &str = "docs-reader";

/// Bytes returned by `docs-reader` when `max_bytes` is not given.
pub const DEFAULT_MAX_BYTES: u64 = 1024 * 1024;

/// Register every built-in tool.
///
/// # Errors
///
/// Returns error if a built-in name is already taken
pub fn register_builtin_tools(builder: &mut ToolRegistryBuilder) -> Result<(), RegistryError> {
    builder.register(
        REFERENCE_NORMALIZER,
        Arc::new(reference_normalizer),
        ToolInfo::new("Normalize an evidence, policy or control reference to its canonical form")
            .with_category("naming")
            .with_rule(
                "document_type",
                ValidationRule::string()
                    .required()
                    .with_allowed_values(["evidence", "policy", "control"]),
            )
            .with_rule("reference_id", ValidationRule::string().required()),
    )?;

    builder.register(
        DOCS_READER,
        Arc::new(docs_reader),
        ToolInfo::new("Read a document from the data directory")
            .with_category("storage")
            .with_rule("path", ValidationRule::path().required().with_path_safety())
            .with_rule("max_bytes", ValidationRule::int()),
    )?;

    Ok(())
}

fn reference_normalizer(_ctx: &ToolContext, params: &Params) -> Result<ToolOutput, ToolFailure> {
    let document_type = string_param(params, "document_type")?;
    let reference_id = string_param(params, "reference_id")?;

    let kind: ReferenceKind = document_type
        .parse()
        .map_err(|err: ReferenceError| ToolFailure::validation(err.to_string()))?;
    let normalized = normalize_reference(kind, reference_id).map_err(|err| {
        ToolFailure::validation(err.to_string()).with_detail("reference_id", reference_id)
    })?;

    tracing::debug!(kind = %kind, raw = reference_id, normalized = %normalized, "reference normalized");
    Ok(ToolOutput::new(json!({
        "document_type": kind,
        "reference_id": reference_id,
        "normalized": normalized,
    })))
}

fn docs_reader(ctx: &ToolContext, params: &Params) -> Result<ToolOutput, ToolFailure> {
    let relative = params
        .get("path")
        .and_then(ParamValue::as_path)
        .ok_or_else(|| ToolFailure::validation("path is required"))?;
    let max_bytes = match params.get("max_bytes").and_then(ParamValue::as_int) {
        None => DEFAULT_MAX_BYTES,
        Some(n) if n > 0 => n.unsigned_abs(),
        Some(n) => {
            return Err(ToolFailure::validation("max_bytes must be positive").with_detail("max_bytes", n));
        }
    };

    let full: PathBuf = ctx.resolve_path(&relative);
    let shown = relative.display().to_string();
    let document = read_document(&full, &shown, max_bytes)
        .map_err(|err| ToolFailure::from(err).with_detail("path", shown.clone()))?;
    tracing::debug!(
        path = %shown,
        size_bytes = document.size_bytes,
        truncated = document.truncated,
        "document read"
    );

    Ok(ToolOutput::new(json!({
        "path": shown,
        "size_bytes": document.size_bytes,
        "truncated": document.truncated,
        "content": String::from_utf8_lossy(&document.content),
    }))
    .with_evidence_source(EvidenceSource::new(SourceKind::Local, shown)))
}

struct Document {
    content: Vec<u8>,
    size_bytes: u64,
    truncated: bool,
}

fn read_document(full: &Path, shown: &str, max_bytes: u64) -> CoreResult<Document> {
    let metadata = std::fs::metadata(full).map_err(|err| match err.kind() {
        std::io::ErrorKind::NotFound => CoreError::NotFound {
            kind: "document".to_string(),
            id: shown.to_string(),
        },
        _ => CoreError::io(format!("stat {}", shown), &err),
    })?;
    if !metadata.is_file() {
        return Err(CoreError::Validation {
            field: "path".to_string(),
            reason: format!("not a regular file: {}", shown),
        });
    }

    let file = std::fs::File::open(full).map_err(|err| CoreError::io(format!("open {}", shown), &err))?;
    let mut content = Vec::new();
    file.take(max_bytes)
        .read_to_end(&mut content)
        .map_err(|err| CoreError::io(format!("read {}", shown), &err))?;

    let size_bytes = metadata.len();
    Ok(Document {
        content,
        size_bytes,
        truncated: size_bytes > max_bytes,
    })
}

fn string_param<'a>(params: &'a Params, name: &str) -> Result<&'a str, ToolFailure> {
    params
        .get(name)
        .and_then(ParamValue::as_str)
        .ok_or_else(|| ToolFailure::validation(format!("{} is required", name)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::trait_::FailureKind;
    use tempfile::TempDir;

    fn params(pairs: &[(&str, ParamValue)]) -> Params {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn test_register_builtin_tools() {
        let mut builder = ToolRegistryBuilder::new();
        register_builtin_tools(&mut builder).unwrap();
        let registry = builder.build();
        assert!(registry.contains(REFERENCE_NORMALIZER));
        assert!(registry.contains(DOCS_READER));
        assert!(register_builtin_tools(&mut ToolRegistryBuilder::new()).is_ok());
    }

    #[test]
    fn test_reference_normalizer() {
        let ctx = ToolContext::new("/data");
        let out = reference_normalizer(
            &ctx,
            &params(&[("document_type", "control".into()), ("reference_id", "cc1.1".into())]),
        )
        .unwrap();
        assert_eq!(out.data["normalized"], json!("CC-01_1"));
        assert_eq!(out.data["document_type"], json!("control"));
    }

    #[test]
    fn test_reference_normalizer_validation_failure() {
        let ctx = ToolContext::new("/data");
        let failure = reference_normalizer(
            &ctx,
            &params(&[("document_type", "control".into()), ("reference_id", "12".into())]),
        )
        .unwrap_err();
        assert_eq!(failure.kind, FailureKind::Validation);
        assert!(failure.message.contains("requires prefix"));
    }

    #[test]
    fn test_docs_reader_reads_and_truncates() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("policy.md"), "0123456789").unwrap();
        let ctx = ToolContext::new(dir.path());

        let out = docs_reader(&ctx, &params(&[("path", "policy.md".into())])).unwrap();
        assert_eq!(out.data["content"], json!("0123456789"));
        assert_eq!(out.data["truncated"], json!(false));
        assert_eq!(out.evidence_source.unwrap().source, SourceKind::Local);

        let out = docs_reader(
            &ctx,
            &params(&[("path", "policy.md".into()), ("max_bytes", 4i64.into())]),
        )
        .unwrap();
        assert_eq!(out.data["content"], json!("0123"));
        assert_eq!(out.data["truncated"], json!(true));
        assert_eq!(out.data["size_bytes"], json!(10));
    }

    #[test]
    fn test_docs_reader_missing_is_not_found() {
        let dir = TempDir::new().unwrap();
        let ctx = ToolContext::new(dir.path());
        let failure = docs_reader(&ctx, &params(&[("path", "nope.md".into())])).unwrap_err();
        assert_eq!(failure.kind, FailureKind::NotFound);
        assert_eq!(failure.message, "document not found: nope.md");
        assert_eq!(failure.details["kind"], json!("not_found"));
        assert_eq!(failure.details["path"], json!("nope.md"));
    }

    #[test]
    fn test_docs_reader_rejects_bad_max_bytes_and_dirs() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir(dir.path().join("sub")).unwrap();
        let ctx = ToolContext::new(dir.path());

        let failure = docs_reader(
            &ctx,
            &params(&[("path", "sub".into()), ("max_bytes", 0i64.into())]),
        )
        .unwrap_err();
        assert_eq!(failure.kind, FailureKind::Validation);

        let failure = docs_reader(&ctx, &params(&[("path", "sub".into())])).unwrap_err();
        assert_eq!(failure.kind, FailureKind::Validation);
        assert!(failure.message.contains("not a regular file: sub"));
        assert_eq!(failure.details["kind"], json!("validation"));
    }
}
