//! Result types returned by the translation entry points.
//!
//! Everything here is `Serialize` so the CLI can dump a run report as JSON
//! without a second set of types.

use crate::error::{PageError, PageWarning};
use serde::{Deserialize, Serialize};

/// Complete result of translating one document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranslationOutput {
    /// The assembled HTML document.
    pub html: String,
    /// Per-page results in page order.
    pub pages: Vec<PageResult>,
    pub metadata: DocumentMetadata,
    pub stats: TranslationStats,
}

impl TranslationOutput {
    /// True when at least one page was replaced by an error marker.
    pub fn is_partial(&self) -> bool {
        self.stats.failed_pages > 0
    }

    /// All warnings across pages, in page order.
    pub fn warnings(&self) -> impl Iterator<Item = &PageWarning> {
        self.pages.iter().flat_map(|p| p.warnings.iter())
    }
}

/// Outcome for a single page.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageResult {
    /// 1-indexed page number.
    pub page_num: usize,
    /// Rendered `<section>` fragment, or the error marker.
    #[serde(skip_serializing)]
    pub html: String,
    /// Content items found on the page.
    pub items: usize,
    /// Text items sent through the dispatcher.
    pub text_items: usize,
    /// Text items that kept their original text.
    pub fallbacks: usize,
    pub warnings: Vec<PageWarning>,
    pub duration_ms: u64,
    /// Set when the page could not be processed.
    pub error: Option<PageError>,
}

impl PageResult {
    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }
}

/// PDF document metadata.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DocumentMetadata {
    pub title: Option<String>,
    pub author: Option<String>,
    pub subject: Option<String>,
    pub creator: Option<String>,
    pub producer: Option<String>,
    pub page_count: usize,
    pub pdf_version: String,
}

/// Run-level counters.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TranslationStats {
    /// Pages in the document.
    pub total_pages: usize,
    /// Pages rendered (possibly with fallbacks).
    pub processed_pages: usize,
    /// Pages replaced by an error marker.
    pub failed_pages: usize,
    /// Pages excluded by the page selection.
    pub skipped_pages: usize,
    /// Backend attempts, retries included.
    pub backend_calls: u64,
    /// Lookups answered by the cache.
    pub cache_hits: u64,
    /// Text items that kept their original text.
    pub fallbacks: u64,
    /// Warnings across all pages.
    pub warnings: usize,
    pub total_duration_ms: u64,
    pub decode_duration_ms: u64,
    pub translate_duration_ms: u64,
}
