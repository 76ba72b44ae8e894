use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur while processing a single batch item.
///
/// Every variant is caught at the smallest scope that can isolate it: a
/// link fetch failure never fails the whole file, a file failure never
/// fails the whole batch. The batch orchestrator pattern-matches on the
/// kind to build the per-file report.
#[derive(Error, Debug)]
pub enum ProcessError {
    #[error("Erro ao fazer parse do XML: {details}")]
    Parse { details: String },

    #[error("Tipo de arquivo incorreto: esperado '{expected}', encontrado '{found}'")]
    WrongRole { expected: String, found: String },

    #[error("Unhandled: {details}")]
    Unhandled { details: String },
}

/// Failure fetching one remote diploma document.
///
/// Recorded per URL in the parent file's `fetch_errors`; never fails the
/// file itself.
#[derive(Error, Debug)]
pub enum FetchError {
    #[error("Timeout: {url} after {timeout_seconds}s")]
    Timeout { url: String, timeout_seconds: u64 },

    #[error("HTTP {status} for {url}")]
    HttpStatus { url: String, status: u16 },

    #[error("{0}")]
    Http(#[from] reqwest::Error),
}

/// Startup-only errors. A schema that fails to compile is the single
/// unrecoverable error in the system: the process refuses to start.
#[derive(Error, Debug)]
pub enum StartupError {
    #[error("Schema file not found: {path}")]
    SchemaNotFound { path: PathBuf },

    #[error("Schema compilation failed: {path} - {details}")]
    SchemaCompile { path: PathBuf, details: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// LibXML2-specific error types.
#[derive(Error, Debug)]
pub enum LibXml2Error {
    #[error("Schema parsing failed: null pointer returned")]
    SchemaParseFailed,

    #[error("Document parsing failed: {details}")]
    DocumentParseFailed { details: String },

    #[error("Validation context creation failed")]
    ValidationContextCreationFailed,

    #[error("Memory allocation failed in libxml2")]
    MemoryAllocation,
}

/// LibXML2 result type alias.
pub type LibXml2Result<T> = std::result::Result<T, LibXml2Error>;

impl From<LibXml2Error> for ProcessError {
    fn from(err: LibXml2Error) -> Self {
        match err {
            LibXml2Error::DocumentParseFailed { details } => ProcessError::Parse { details },
            other => ProcessError::Unhandled {
                details: other.to_string(),
            },
        }
    }
}
