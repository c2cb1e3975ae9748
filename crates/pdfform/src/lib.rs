use thiserror::Error;

pub mod context;
pub mod fields;
pub mod fill;
pub mod parser;
pub mod types;

pub use context::{resolve_context, resolve_contexts, SearchConfig};
pub use fields::enumerate_fields;
pub use fill::{fill_form, FillReport};
pub use types::*;

#[derive(Debug, Error)]
pub enum PdfError {
    /// The document stream cannot be parsed at all. Fatal: extraction
    /// aborts and the error is surfaced to the caller.
    #[error("malformed PDF document: {0}")]
    Malformed(String),
    #[error("document is encrypted")]
    Encrypted,
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// A parsed contract PDF holding the extracted runs and enumerated fields.
///
/// Constructed via [`ParsedForm::from_bytes`]. An empty `runs` list means
/// the document parsed but carries no extractable text (e.g. a rasterized
/// scan): callers must treat that as "no context available", not as a
/// failure. An empty `fields` list means the document has no AcroForm;
/// flat-layout detection is an external collaborator.
pub struct ParsedForm {
    backend: parser::LopdfBackend,
    pub runs: Vec<TextRun>,
    pub fields: Vec<FormField>,
}

impl ParsedForm {
    /// Parse PDF bytes and enumerate text runs and form fields.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, PdfError> {
        let backend = parser::LopdfBackend::load_bytes(bytes)?;
        let runs = parser::extract_all_runs(&backend)?;
        let fields = fields::enumerate_fields(backend.raw_doc())?;
        Ok(ParsedForm {
            backend,
            runs,
            fields,
        })
    }

    /// Resolve the directional context for every enumerated field.
    pub fn resolve_contexts(&self, config: &SearchConfig) -> Vec<FieldContext> {
        context::resolve_contexts(&self.fields, &self.runs, config)
    }

    /// Direct access to the parsing backend.
    pub fn backend(&self) -> &parser::LopdfBackend {
        &self.backend
    }
}

// ---------------------------------------------------------------------------
// Convenience free functions (stateless, re-parse each call)
// ---------------------------------------------------------------------------

/// Parse PDF bytes and resolve every field's context in one pass.
pub fn extract(bytes: &[u8], config: &SearchConfig) -> Result<Vec<FieldContext>, PdfError> {
    Ok(ParsedForm::from_bytes(bytes)?.resolve_contexts(config))
}

/// Fill a PDF's interactive fields from resolved assignments.
pub fn fill(
    bytes: &[u8],
    assignments: &[FieldAssignment],
) -> Result<(Vec<u8>, FillReport), PdfError> {
    fill::fill_form(bytes, assignments)
}
