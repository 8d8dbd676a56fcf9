//! Translation entry points and the page worker pool.
//!
//! ## Flow
//!
//! Everything that can fail the whole run (input, output directory, backend
//! construction, PDF load) is checked before a single page is dispatched.
//! Pages then run as independent tokio tasks, at most `config.concurrency`
//! at a time, sharing one [`Dispatcher`] and therefore one cache. Each task
//! writes into its own result slot; the document is assembled only once
//! every slot is filled, so completion order never leaks into the output.

use crate::config::{PageSelection, TranslationConfig};
use crate::error::{PageError, TranslatePdfError};
use crate::model::{ContentItem, PageSource};
use crate::output::{DocumentMetadata, PageResult, TranslationOutput, TranslationStats};
use crate::pipeline::assemble::assemble_document;
use crate::pipeline::decode::{self, panic_message};
use crate::pipeline::extract::{extract_items, order_items, ExtractOptions};
use crate::pipeline::input;
use crate::pipeline::links::resolve_links;
use crate::pipeline::render::{error_fragment, render_page, RenderOptions};
use crate::translate::{resolve_backend, Dispatcher};
use futures::stream::{self, StreamExt};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Translate a PDF file into an HTML document.
///
/// This is the primary entry point for the library.
///
/// # Returns
/// `Ok(TranslationOutput)` when at least one page was rendered, even if
/// others failed (check [`TranslationOutput::is_partial`]).
///
/// # Errors
/// Returns `Err(TranslatePdfError)` only for fatal errors:
/// - File not found / permission denied / not a PDF
/// - Backend could not be constructed
/// - The PDF could not be opened
/// - Every selected page failed
pub async fn translate_document(
    input_path: impl AsRef<Path>,
    config: &TranslationConfig,
) -> Result<TranslationOutput, TranslatePdfError> {
    let total_start = Instant::now();

    // ── Step 1: Validate input ───────────────────────────────────────────
    let pdf_path = input::resolve_input(input_path)?;
    info!("Starting translation: {}", pdf_path.display());

    // ── Step 2: Build the backend ────────────────────────────────────────
    let backend = resolve_backend(config)?;
    let dispatcher = Arc::new(Dispatcher::from_config(backend, config));
    debug!("Using {} backend", dispatcher.backend_name());

    // ── Step 3: Decode selected pages ────────────────────────────────────
    let decode_start = Instant::now();
    let (document, metadata) = decode::decode_document(
        &pdf_path,
        config.password.as_deref(),
        &config.pages,
        config.include_images,
    )
    .await?;
    let decode_duration_ms = decode_start.elapsed().as_millis() as u64;
    info!(
        "Decoded {} pages in {}ms",
        metadata.page_count, decode_duration_ms
    );

    // ── Step 4: Translate and assemble ───────────────────────────────────
    let doc_name = input::document_name(&pdf_path);
    let mut output = run(Arc::new(document), dispatcher, &doc_name, config).await?;

    output.metadata = metadata;
    output.stats.decode_duration_ms = decode_duration_ms;
    output.stats.total_duration_ms = total_start.elapsed().as_millis() as u64;
    info!(
        "Translation complete: {}/{} pages, {}ms total",
        output.stats.processed_pages, output.stats.total_pages, output.stats.total_duration_ms
    );
    Ok(output)
}

/// Translate pages from an already-decoded source.
///
/// Skips input validation and pdfium entirely. `doc_name` is used for the
/// document title.
pub async fn translate_source(
    source: Arc<dyn PageSource>,
    doc_name: &str,
    config: &TranslationConfig,
) -> Result<TranslationOutput, TranslatePdfError> {
    let start = Instant::now();
    let backend = resolve_backend(config)?;
    let dispatcher = Arc::new(Dispatcher::from_config(backend, config));
    let mut output = run(source, dispatcher, doc_name, config).await?;
    output.stats.total_duration_ms = start.elapsed().as_millis() as u64;
    Ok(output)
}

/// Translate a PDF and write the HTML to `output_path`.
///
/// The output directory is checked before any work starts. The file is
/// written atomically: nothing appears at `output_path` unless the whole
/// document was written.
pub async fn translate_to_file(
    input_path: impl AsRef<Path>,
    output_path: impl AsRef<Path>,
    config: &TranslationConfig,
) -> Result<TranslationOutput, TranslatePdfError> {
    let output_path = input::validate_output(output_path)?;
    let output = translate_document(input_path, config).await?;

    let path = output_path.clone();
    let html = output.html.clone();
    tokio::task::spawn_blocking(move || write_output(&path, &html))
        .await
        .map_err(|e| TranslatePdfError::Internal(format!("Write task panicked: {e}")))??;

    info!("Wrote {} bytes to {}", output.html.len(), output_path.display());
    Ok(output)
}

/// Synchronous wrapper around [`translate_document`].
///
/// Creates a temporary tokio runtime internally.
pub fn translate_sync(
    input_path: impl AsRef<Path>,
    config: &TranslationConfig,
) -> Result<TranslationOutput, TranslatePdfError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| TranslatePdfError::Internal(format!("Failed to create tokio runtime: {}", e)))?
        .block_on(translate_document(input_path, config))
}

/// Write `html` to `path` through a temp file in the same directory.
pub fn write_output(path: &Path, html: &str) -> Result<(), TranslatePdfError> {
    let write_err = |source: std::io::Error| TranslatePdfError::OutputWriteFailed {
        path: path.to_path_buf(),
        source,
    };
    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    };

    let mut tmp = tempfile::NamedTempFile::new_in(&dir).map_err(write_err)?;
    tmp.write_all(html.as_bytes()).map_err(write_err)?;
    tmp.flush().map_err(write_err)?;
    tmp.persist(path).map_err(|e| write_err(e.error))?;
    Ok(())
}

/// Run every page in `page_indices` (0-based) through
/// extract → links → render on a bounded pool of tokio tasks.
///
/// Returns one [`PageResult`] per index, in the order of `page_indices`.
/// A page that cannot be decoded, or whose task panics, comes back with
/// `error` set and an error-marker fragment as its HTML.
pub async fn translate_pages(
    source: Arc<dyn PageSource>,
    dispatcher: Arc<Dispatcher>,
    config: &TranslationConfig,
    page_indices: &[usize],
) -> Vec<PageResult> {
    let total = page_indices.len();
    let page_count = source.page_count();
    let options = Arc::new(PageOptions {
        extract: ExtractOptions {
            include_images: config.include_images,
            heading_ratio: config.heading_ratio,
        },
        render: RenderOptions::from_config(config),
    });

    let mut slots: Vec<Option<PageResult>> = vec![None; total];

    let mut completions = stream::iter(page_indices.iter().copied().enumerate().map(|(slot, index)| {
        let source = Arc::clone(&source);
        let dispatcher = Arc::clone(&dispatcher);
        let options = Arc::clone(&options);
        let callback = config.progress_callback.clone();
        async move {
            let handle = tokio::spawn(async move {
                if let Some(ref cb) = callback {
                    cb.on_page_start(index + 1, total);
                }
                process_page(source, dispatcher, options, index, page_count).await
            });
            (slot, index, handle.await)
        }
    }))
    .buffer_unordered(config.concurrency.max(1));

    while let Some((slot, index, joined)) = completions.next().await {
        let page_num = index + 1;
        let result = match joined {
            Ok(result) => result,
            Err(e) => {
                let detail = if e.is_panic() {
                    panic_message(&*e.into_panic())
                } else {
                    "task cancelled".to_string()
                };
                failed_page(page_num, PageError::WorkerPanicked { page: page_num, detail }, 0)
            }
        };

        if let Some(ref cb) = config.progress_callback {
            match &result.error {
                None => cb.on_page_complete(page_num, total, result.html.len()),
                Some(e) => cb.on_page_error(page_num, total, &e.to_string()),
            }
        }
        slots[slot] = Some(result);
    }

    slots
        .into_iter()
        .zip(page_indices)
        .map(|(slot, &index)| {
            slot.unwrap_or_else(|| {
                let page_num = index + 1;
                failed_page(page_num, PageError::Missing { page: page_num }, 0)
            })
        })
        .collect()
}

// ── Internal helpers ─────────────────────────────────────────────────────

struct PageOptions {
    extract: ExtractOptions,
    render: RenderOptions,
}

/// Page selection, worker pool, barrier, assembly, stats.
async fn run(
    source: Arc<dyn PageSource>,
    dispatcher: Arc<Dispatcher>,
    doc_name: &str,
    config: &TranslationConfig,
) -> Result<TranslationOutput, TranslatePdfError> {
    let total_pages = source.page_count();
    let page_indices = config.pages.to_indices(total_pages);
    if page_indices.is_empty() {
        return Err(TranslatePdfError::PageOutOfRange {
            page: first_requested_page(&config.pages),
            total: total_pages,
        });
    }
    debug!("Selected {} of {} pages", page_indices.len(), total_pages);

    if let Some(ref cb) = config.progress_callback {
        cb.on_translation_start(page_indices.len());
    }

    let translate_start = Instant::now();
    let pages = translate_pages(
        Arc::clone(&source),
        Arc::clone(&dispatcher),
        config,
        &page_indices,
    )
    .await;
    let translate_duration_ms = translate_start.elapsed().as_millis() as u64;

    let processed = pages.iter().filter(|p| p.is_ok()).count();
    let failed = pages.len() - processed;

    if let Some(ref cb) = config.progress_callback {
        cb.on_translation_complete(page_indices.len(), processed);
    }

    if processed == 0 {
        let first_error = pages
            .iter()
            .find_map(|p| p.error.as_ref())
            .map(|e| e.to_string())
            .unwrap_or_else(|| "Unknown error".to_string());
        return Err(TranslatePdfError::AllPagesFailed {
            total: pages.len(),
            first_error,
        });
    }
    if failed > 0 {
        warn!("{} of {} pages failed", failed, pages.len());
    }

    let fragments: Vec<&str> = pages.iter().map(|p| p.html.as_str()).collect();
    let html = assemble_document(&fragments, &config.target_lang, doc_name);

    let dispatch = dispatcher.stats();
    let stats = TranslationStats {
        total_pages,
        processed_pages: processed,
        failed_pages: failed,
        skipped_pages: total_pages - page_indices.len(),
        backend_calls: dispatch.backend_calls(),
        cache_hits: dispatch.cache_hits(),
        fallbacks: dispatch.fallbacks(),
        warnings: pages.iter().map(|p| p.warnings.len()).sum(),
        total_duration_ms: 0,
        decode_duration_ms: 0,
        translate_duration_ms,
    };

    Ok(TranslationOutput {
        html,
        pages,
        metadata: DocumentMetadata {
            page_count: total_pages,
            ..Default::default()
        },
        stats,
    })
}

/// The body of one page task.
async fn process_page(
    source: Arc<dyn PageSource>,
    dispatcher: Arc<Dispatcher>,
    options: Arc<PageOptions>,
    index: usize,
    page_count: usize,
) -> PageResult {
    let start = Instant::now();
    let page_num = index + 1;

    let page = match source.take_page(index) {
        Ok(page) => page,
        Err(e) => {
            warn!("{}", e);
            return failed_page(page_num, e, start.elapsed().as_millis() as u64);
        }
    };

    let mut extracted = extract_items(&page, &options.extract);
    let items: Vec<ContentItem> = extracted.by_ref().collect();
    let mut warnings = extracted.into_warnings();

    let (items, link_warnings) = resolve_links(order_items(items), &page.links, page_num, page_count);
    warnings.extend(link_warnings);
    // Items own their bytes from here on.
    drop(page);

    let rendered = render_page(page_num, &items, &dispatcher, &options.render).await;
    warnings.extend(rendered.warnings);

    PageResult {
        page_num,
        html: rendered.html,
        items: items.len(),
        text_items: rendered.text_items,
        fallbacks: rendered.fallbacks,
        warnings,
        duration_ms: start.elapsed().as_millis() as u64,
        error: None,
    }
}

fn failed_page(page_num: usize, error: PageError, duration_ms: u64) -> PageResult {
    PageResult {
        page_num,
        html: error_fragment(page_num, &error),
        items: 0,
        text_items: 0,
        fallbacks: 0,
        warnings: Vec::new(),
        duration_ms,
        error: Some(error),
    }
}

fn first_requested_page(selection: &PageSelection) -> usize {
    match selection {
        PageSelection::All => 0,
        PageSelection::Single(p) | PageSelection::Range(p, _) => *p,
        PageSelection::Set(pages) => pages.iter().copied().min().unwrap_or(0),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn write_output_replaces_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("out.html");
        std::fs::write(&path, "old").unwrap();
        write_output(&path, "<html>new</html>").unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "<html>new</html>");
        let leftovers = std::fs::read_dir(dir.path()).unwrap().count();
        assert_eq!(leftovers, 1, "temp file must be renamed, not left behind");
    }

    #[test]
    fn write_output_into_missing_dir_fails() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nope").join("out.html");
        let err = write_output(&path, "x").unwrap_err();
        assert!(matches!(err, TranslatePdfError::OutputWriteFailed { .. }));
    }

    #[test]
    fn requested_page_for_errors() {
        assert_eq!(first_requested_page(&PageSelection::Single(9)), 9);
        assert_eq!(first_requested_page(&PageSelection::Range(4, 8)), 4);
        assert_eq!(first_requested_page(&PageSelection::Set(vec![12, 10])), 10);
        assert_eq!(first_requested_page(&PageSelection::All), 0);
    }

    #[tokio::test]
    async fn output_dir_is_checked_before_input() {
        let dir = tempdir().unwrap();
        let out = dir.path().join("missing").join("out.html");
        let err = translate_to_file("/no/such/input.pdf", &out, &TranslationConfig::default())
            .await
            .unwrap_err();
        assert!(matches!(err, TranslatePdfError::OutputDirMissing { .. }));
    }
}
