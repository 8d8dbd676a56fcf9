//! Error types for the pdf-translate-html library.
//!
//! Three error types reflect three failure scopes:
//!
//! * [`TranslatePdfError`] — **Fatal**: the run cannot proceed at all (bad
//!   input file, unwritable output, backend not configured). Returned as
//!   `Err(TranslatePdfError)` from the top-level `translate*` functions and
//!   always checked before any page work is dispatched.
//!
//! * [`PageError`] — **Non-fatal**: a single page could not be decoded or its
//!   worker panicked. The page is replaced by an error-marker fragment and
//!   every other page is still rendered.
//!
//! * [`TranslationError`] — **Non-fatal**: one backend call failed. The
//!   dispatcher retries transient failures and falls back to the original
//!   text once retries are exhausted; it never reaches the page boundary.
//!
//! [`PageWarning`] records degradations that did not fail anything (skipped
//! images, dropped links, translation fallbacks) for the end-of-run summary.

use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the pdf-translate-html library.
///
/// Page-level failures use [`PageError`] and are stored in
/// [`crate::output::PageResult`] rather than propagated here.
#[derive(Debug, Error)]
pub enum TranslatePdfError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// Input file was not found at the given path.
    #[error("PDF file not found: '{path}'\nCheck the path exists and is readable.")]
    FileNotFound { path: PathBuf },

    /// Process does not have read permission on the file.
    #[error("Permission denied reading '{path}'\nTry: chmod +r {path:?}")]
    PermissionDenied { path: PathBuf },

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

    /// Selected page numbers exceed the actual page count.
    #[error("Page {page} is out of range (document has {total} pages)")]
    PageOutOfRange { page: usize, total: usize },

    // ── Output errors ─────────────────────────────────────────────────────
    /// The directory that should receive the HTML file does not exist.
    #[error("Output directory does not exist: '{path}'")]
    OutputDirMissing { path: PathBuf },

    /// Could not create or write the output HTML file.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Translation errors ────────────────────────────────────────────────
    /// The selected translation backend could not be constructed.
    #[error("Translation backend '{backend}' is not configured.\n{hint}")]
    BackendNotConfigured { backend: String, hint: String },

    /// Every page failed; output would contain nothing but error markers.
    #[error("All {total} pages failed.\nFirst error: {first_error}")]
    AllPagesFailed { total: usize, first_error: String },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Pdfium binding errors ─────────────────────────────────────────────
    /// Could not bind to a pdfium library.
    #[error(
        "Failed to bind to pdfium library: {0}\n\n\
Set PDFIUM_LIB_PATH=/path/to/dir-containing-libpdfium, place the library\n\
next to the executable, or install it system-wide.\n"
    )]
    PdfiumBindingFailed(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// A non-fatal error for a single page.
///
/// The orchestrator replaces the page with an error-marker fragment and
/// keeps going. The run only fails as a whole when every page fails.
#[derive(Debug, Clone, PartialEq, Error, serde::Serialize, serde::Deserialize)]
pub enum PageError {
    /// The PDF decoder could not produce this page.
    #[error("Page {page}: decoding failed: {detail}")]
    DecodeFailed { page: usize, detail: String },

    /// The page worker panicked or was cancelled.
    #[error("Page {page}: worker aborted: {detail}")]
    WorkerPanicked { page: usize, detail: String },

    /// The worker finished without reporting a result for this page.
    #[error("Page {page}: no result produced")]
    Missing { page: usize },
}

impl PageError {
    /// 1-based page number the error belongs to.
    pub fn page(&self) -> usize {
        match self {
            Self::DecodeFailed { page, .. }
            | Self::WorkerPanicked { page, .. }
            | Self::Missing { page } => *page,
        }
    }
}

/// Failure of a single backend `translate` call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TranslationError {
    /// Rate limit, timeout, 5xx, dropped connection. Worth retrying.
    #[error("transient translation failure: {0}")]
    Transient(String),

    /// Bad request, rejected language pair, unparseable response.
    #[error("translation rejected: {0}")]
    Permanent(String),
}

impl TranslationError {
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Transient(_))
    }
}

/// A degradation that did not fail the page.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PageWarning {
    /// An embedded image stream could not be decoded and was left out.
    ImageSkipped { page: usize, detail: String },

    /// A link annotation pointed somewhere that cannot be expressed in HTML.
    LinkDropped { page: usize, detail: String },

    /// Translation failed after retries; the original text was kept.
    TranslationFallback { page: usize, detail: String },
}

impl std::fmt::Display for PageWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ImageSkipped { page, detail } => {
                write!(f, "page {page}: image skipped ({detail})")
            }
            Self::LinkDropped { page, detail } => {
                write!(f, "page {page}: link dropped ({detail})")
            }
            Self::TranslationFallback { page, detail } => {
                write!(f, "page {page}: kept original text ({detail})")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn all_pages_failed_display() {
        let e = TranslatePdfError::AllPagesFailed {
            total: 4,
            first_error: "Page 1: decoding failed: bad xref".into(),
        };
        let msg = e.to_string();
        assert!(msg.contains("All 4 pages"), "got: {msg}");
        assert!(msg.contains("bad xref"));
    }

    #[test]
    fn page_error_reports_its_page() {
        let e = PageError::WorkerPanicked {
            page: 7,
            detail: "boom".into(),
        };
        assert_eq!(e.page(), 7);
        assert!(e.to_string().starts_with("Page 7"));
    }

    #[test]
    fn transient_classification() {
        assert!(TranslationError::Transient("429".into()).is_transient());
        assert!(!TranslationError::Permanent("400".into()).is_transient());
    }

    #[test]
    fn warning_serialises_with_kind_tag() {
        let w = PageWarning::LinkDropped {
            page: 2,
            detail: "destination page 99 does not exist".into(),
        };
        let json = serde_json::to_string(&w).unwrap();
        assert!(json.contains("\"kind\":\"link_dropped\""), "got: {json}");
        assert!(w.to_string().contains("page 2"));
    }

    #[test]
    fn backend_not_configured_display() {
        let e = TranslatePdfError::BackendNotConfigured {
            backend: "local".into(),
            hint: "Is ollama running?".into(),
        };
        assert!(e.to_string().contains("local"));
        assert!(e.to_string().contains("ollama"));
    }
}
