//! Error types for the edgequake-pdf2table library.
//!
//! Two failure modes, two types:
//!
//! * [`Pdf2TableError`] is **fatal**: the stage cannot proceed at all (bad
//!   input file, zero-page document, pdfium missing, provider not
//!   configured). Returned as `Err` from the stage and run functions.
//!
//! * [`ItemError`] is **non-fatal**: one image or one text file failed.
//!   Stored inside [`crate::output::ItemResult`]; the stage moves on to the
//!   next item.
//!
//! [`ServiceError`] is what a [`crate::pipeline::llm::TableExtractor`]
//! returns; the extraction stage wraps it into [`ItemError::ServiceFailed`].

use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the edgequake-pdf2table library.
#[derive(Debug, Error)]
pub enum Pdf2TableError {
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
    #[error("Download timed out after {secs}s for '{url}'")]
    DownloadTimeout { url: String, secs: u64 },

    /// The file exists and was read, but is not a PDF.
    #[error("File is not a valid PDF: '{path}'\nFirst bytes: {magic:?}")]
    NotAPdf { path: PathBuf, magic: [u8; 4] },

    // ── PDF errors ────────────────────────────────────────────────────────
    /// PDF header/trailer/xref is corrupt and cannot be parsed.
    #[error("PDF '{path}' is corrupt: {detail}")]
    CorruptPdf { path: PathBuf, detail: String },

    /// PDF requires a password but none was provided.
    #[error("PDF '{path}' is encrypted and requires a password.\nProvide it with --password <PASSWORD>.")]
    PasswordRequired { path: PathBuf },

    /// A password was provided but it is wrong.
    #[error("Wrong password for PDF '{path}'")]
    WrongPassword { path: PathBuf },

    /// The document opened but yielded no pages; nothing downstream can run.
    #[error("No pages could be rendered from '{path}'")]
    EmptyDocument { path: PathBuf },

    /// pdfium-render failed on a specific page, or the page image could not be saved.
    #[error("Rasterisation failed for page {page}: {detail}")]
    RasterisationFailed { page: usize, detail: String },

    /// Could not bind to a pdfium library.
    #[error(
        "Failed to bind to pdfium library: {0}\n\n\
Install libpdfium for your platform (https://github.com/bblanchon/pdfium-binaries)\n\
and either place it on the library search path or set PDFIUM_LIB_PATH=/path/to/libpdfium.\n"
    )]
    PdfiumBindingFailed(String),

    // ── LLM errors ────────────────────────────────────────────────────────
    /// The configured provider is not initialised (missing API key etc.).
    #[error("LLM provider '{provider}' is not configured.\n{hint}")]
    ProviderNotConfigured { provider: String, hint: String },

    // ── I/O errors ────────────────────────────────────────────────────────
    /// A stage directory could not be created or listed.
    #[error("Cannot use directory '{path}': {source}")]
    DirectoryFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// A non-fatal error for a single image or text file.
#[derive(Debug, Clone, PartialEq, Eq, Error, serde::Serialize, serde::Deserialize)]
pub enum ItemError {
    /// The input file could not be read.
    #[error("{file}: read failed: {detail}")]
    ReadFailed { file: String, detail: String },

    /// The completion service call failed.
    #[error("{file}: completion service failed: {detail}")]
    ServiceFailed { file: String, detail: String },

    /// The output file could not be written.
    #[error("{file}: write failed: {detail}")]
    WriteFailed { file: String, detail: String },

    /// No JSON payload could be located in the extracted text.
    #[error("{file}: unparseable JSON: {detail}")]
    Unparseable { file: String, detail: String },

    /// The JSON parsed but has no tabular shape (e.g. a bare string).
    #[error("{file}: JSON is not tabular: {detail}")]
    NotTabular { file: String, detail: String },
}

impl ItemError {
    /// The filename the error refers to.
    pub fn file(&self) -> &str {
        match self {
            ItemError::ReadFailed { file, .. }
            | ItemError::ServiceFailed { file, .. }
            | ItemError::WriteFailed { file, .. }
            | ItemError::Unparseable { file, .. }
            | ItemError::NotTabular { file, .. } => file,
        }
    }
}

/// Failure reported by a completion service.
#[derive(Debug, Clone, Error)]
#[error("{provider}: {detail}")]
pub struct ServiceError {
    pub provider: String,
    pub detail: String,
}

impl ServiceError {
    pub fn new(provider: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            provider: provider.into(),
            detail: detail.into(),
        }
    }
}
