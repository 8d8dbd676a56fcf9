//! # pdf-translate-html
//!
//! Translate a PDF document into a single, self-contained HTML file.
//!
//! Text is pulled out of each page in reading order, grouped into
//! paragraphs, sent to a translation service, and laid out again as HTML.
//! Images are embedded inline as data URIs and link annotations survive as
//! `<a href>`: external links keep their URL and internal ones jump to the
//! `#page-N` section of the destination page.
//!
//! ## Pipeline Overview
//!
//! ```text
//! PDF
//!  │
//!  ├─ 1. Input     validate the input PDF and the output directory
//!  ├─ 2. Decode    read pages via pdfium (once, spawn_blocking)
//!  ├─ 3. Extract   runs → text blocks + images, ordered top to bottom
//!  ├─ 4. Links     attach link annotations to the text they cover
//!  ├─ 5. Render    translate through the shared cache, emit <section>
//!  └─ 6. Assemble  fragments in page order → HTML document
//! ```
//!
//! Steps 3–5 run per page on a bounded pool of tokio tasks. Identical text
//! on different pages is translated once.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use pdf_translate_html::{translate_to_file, TranslationConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = TranslationConfig::builder()
//!         .source_lang("en")
//!         .target_lang("fr")
//!         .build()?;
//!     let output = translate_to_file("paper.pdf", "paper.fr.html", &config).await?;
//!     eprintln!(
//!         "{} pages, {} backend calls, {} cache hits",
//!         output.stats.processed_pages,
//!         output.stats.backend_calls,
//!         output.stats.cache_hits
//!     );
//!     Ok(())
//! }
//! ```
//!
//! ## Backends
//!
//! | Backend | Selected by | Needs |
//! |---------|-------------|-------|
//! | Google  | `BackendKind::Google` (default) | network access |
//! | Local   | `BackendKind::Local` | a model server reachable through `edgequake-llm` (Ollama by default) |
//! | Custom  | `TranslationConfigBuilder::translator` | your own [`TranslationBackend`] |
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `translate_pdf` binary (clap + anyhow + indicatif + tracing-subscriber) |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! pdf-translate-html = { version = "0.1", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod convert;
pub mod error;
pub mod model;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod prompts;
pub mod translate;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{BackendKind, PageSelection, TranslationConfig, TranslationConfigBuilder};
pub use convert::{
    translate_document, translate_pages, translate_source, translate_sync, translate_to_file,
};
pub use error::{PageError, PageWarning, TranslatePdfError, TranslationError};
pub use model::{ContentItem, DecodedPage, LinkTarget, PageSource};
pub use output::{DocumentMetadata, PageResult, TranslationOutput, TranslationStats};
pub use progress::{NoopProgressCallback, ProgressCallback, TranslationProgressCallback};
pub use translate::{Dispatcher, IdentityBackend, TranslationBackend, TranslationCache};
