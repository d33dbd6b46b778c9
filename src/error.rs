//! Error types for the edgequake-tables library.
//!
//! Three error types reflect three distinct failure scopes:
//!
//! * [`TableSearchError`] — **Fatal**: the request cannot proceed at all
//!   (document does not decode, embeddings have inconsistent lengths,
//!   provider not configured). Returned as `Err(TableSearchError)` from the
//!   top-level entry points.
//!
//! * [`PageError`] — **Non-fatal**: one page failed somewhere in its
//!   pipeline. Stored inside [`crate::output::PageResult`]; the page simply
//!   contributes no tables and every other page carries on.
//!
//! * [`CollaboratorError`] — a single call to an external service failed.
//!   The page pipeline wraps it into the matching [`PageError`] variant.

use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the edgequake-tables library.
///
/// Page-level failures use [`PageError`] and are stored in
/// [`crate::output::PageResult`] rather than propagated here.
#[derive(Debug, Error)]
pub enum TableSearchError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// Input file was not found at the given path.
    #[error("PDF file not found: '{path}'\nCheck the path exists and is readable.")]
    FileNotFound { path: PathBuf },

    /// Process does not have read permission on the file.
    #[error("Permission denied reading '{path}'\nTry: chmod +r {path:?}")]
    PermissionDenied { path: PathBuf },

    /// The input string is not a valid file path or URL.
    #[error("Invalid input '{input}': not a file path or a valid HTTP/HTTPS URL")]
    InvalidInput { input: String },

    /// HTTP URL was syntactically valid but download failed.
    #[error("Failed to download '{url}': {reason}\nCheck your internet connection.")]
    DownloadFailed { url: String, reason: String },

    /// Download exceeded the configured timeout.
    #[error("Download timed out after {secs}s for '{url}'\nIncrease --download-timeout.")]
    DownloadTimeout { url: String, secs: u64 },

    /// The payload was read, but is not a PDF.
    #[error("Input '{source_name}' is not a PDF\nFirst bytes: {magic:?}")]
    NotAPdf { source_name: String, magic: [u8; 4] },

    // ── Document errors ───────────────────────────────────────────────────
    /// The document could not be parsed or a page could not be re-serialised.
    #[error("PDF could not be decoded: {detail}")]
    Decode { detail: String },

    // ── Retrieval errors ──────────────────────────────────────────────────
    /// An index entry's embedding length differs from the reference vector.
    ///
    /// Distances between vectors of different lengths are meaningless, so
    /// the whole search is aborted rather than truncating or padding.
    #[error(
        "Embedding dimension mismatch on page {page}: reference has {expected} dimensions, entry has {actual}"
    )]
    DimensionMismatch {
        page: usize,
        expected: usize,
        actual: usize,
    },

    // ── Collaborator errors ───────────────────────────────────────────────
    /// The configured LLM provider is not initialised (missing API key etc.).
    #[error("LLM provider '{provider}' is not configured.\n{hint}")]
    ProviderNotConfigured { provider: String, hint: String },

    /// A collaborator call made outside any page pipeline failed
    /// (e.g. embedding a text query).
    #[error(transparent)]
    Collaborator(#[from] CollaboratorError),

    /// Could not bind to a pdfium library.
    #[error(
        "Failed to bind to pdfium library: {0}\n\n\
Set PDFIUM_LIB_PATH=/path/to/libpdfium, or place the library next to the\n\
binary or in a system library directory.\n"
    )]
    PdfiumBindingFailed(String),

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// A non-fatal error for a single page.
///
/// Stored alongside [`crate::output::PageResult`] when a page fails.
/// The page contributes no index entries; the run continues.
#[derive(Debug, Clone, Error, serde::Serialize, serde::Deserialize)]
pub enum PageError {
    /// Structured-text extraction failed.
    #[error("Page {page}: layout analysis failed: {detail}")]
    Layout { page: usize, detail: String },

    /// The table detector failed or returned garbage.
    #[error("Page {page}: table detection failed: {detail}")]
    TableDetection { page: usize, detail: String },

    /// The table describer failed.
    #[error("Page {page}: table description failed: {detail}")]
    Description { page: usize, detail: String },

    /// The embedding generator failed.
    #[error("Page {page}: embedding failed: {detail}")]
    Embedding { page: usize, detail: String },

    /// The page task itself died (panic or cancellation).
    #[error("Page {page}: task failed: {detail}")]
    TaskFailed { page: usize, detail: String },
}

impl PageError {
    /// 1-based page number the error belongs to.
    pub fn page(&self) -> usize {
        match self {
            PageError::Layout { page, .. }
            | PageError::TableDetection { page, .. }
            | PageError::Description { page, .. }
            | PageError::Embedding { page, .. }
            | PageError::TaskFailed { page, .. } => *page,
        }
    }
}

/// Failure of one call to an external collaborator.
#[derive(Debug, Clone, Error)]
pub enum CollaboratorError {
    /// The request could not be sent or the connection failed.
    #[error("{service}: request failed: {detail}")]
    Request { service: &'static str, detail: String },

    /// The service answered with a non-success HTTP status.
    #[error("{service}: HTTP {status}: {body}")]
    Status {
        service: &'static str,
        status: u16,
        body: String,
    },

    /// The service answered, but the payload could not be understood.
    #[error("{service}: invalid response: {detail}")]
    InvalidResponse { service: &'static str, detail: String },

    /// Local document processing failed (pdfium, blocking task).
    #[error("{service}: {detail}")]
    Local { service: &'static str, detail: String },
}
