//! Schema validation of parsed documents.
//!
//! Wraps the libxml2 validation call into a plain pass/fail outcome with
//! ordered diagnostics. Validator-internal failures are folded into a
//! failed outcome with a single runtime diagnostic instead of
//! propagating an error: a document the validator cannot process is an
//! invalid document, not a pipeline failure.

use crate::document::ParsedDocument;
use crate::libxml2::{LibXml2Wrapper, ValidationResult, XmlSchemaPtr};

/// Result of validating one document (local or remote) against one
/// schema.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationOutcome {
    pub passed: bool,
    /// Ordered human-readable messages; empty when `passed`.
    pub diagnostics: Vec<String>,
}

impl ValidationOutcome {
    pub fn passed() -> Self {
        Self {
            passed: true,
            diagnostics: Vec::new(),
        }
    }

    pub fn failed(diagnostics: Vec<String>) -> Self {
        Self {
            passed: false,
            diagnostics,
        }
    }
}

/// Validate a parsed document against the given compiled schema.
pub fn validate(
    wrapper: &LibXml2Wrapper,
    schema: &XmlSchemaPtr,
    doc: &ParsedDocument,
) -> ValidationOutcome {
    match wrapper.validate_document(schema, doc.doc()) {
        Ok(ValidationResult::Valid) => ValidationOutcome::passed(),
        Ok(ValidationResult::Invalid { errors, .. }) => ValidationOutcome::failed(errors),
        Ok(ValidationResult::InternalError { code }) => ValidationOutcome::failed(vec![format!(
            "ValidationRuntimeError: libxml2 internal error code {code}"
        )]),
        Err(e) => ValidationOutcome::failed(vec![format!("ValidationRuntimeError: {e}")]),
    }
}
