//! End-to-end tests against real PDF files in `./test_cases/`.
//!
//! These need a pdfium shared library and are gated behind the
//! `E2E_ENABLED` environment variable so they do not run in CI unless
//! explicitly requested. The Google test also needs network access.
//!
//! Run with:
//!   PDFIUM_LIB_PATH=. E2E_ENABLED=1 cargo test --test e2e -- --nocapture

use pdf_translate_html::{
    translate_document, translate_to_file, BackendKind, IdentityBackend, PageSelection,
    TranslatePdfError, TranslationConfig,
};
use std::path::PathBuf;
use std::sync::Arc;

// ── Test helpers ─────────────────────────────────────────────────────────────

fn test_cases_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("test_cases")
}

/// Skip this test if E2E_ENABLED is not set *or* no PDF file at `path`.
macro_rules! e2e_skip_unless_ready {
    ($path:expr) => {{
        if std::env::var("E2E_ENABLED").is_err() {
            println!("SKIP — set E2E_ENABLED=1 to run e2e tests");
            return;
        }
        let p: PathBuf = $path;
        if !p.exists() {
            println!("SKIP — test file not found: {}", p.display());
            return;
        }
        p
    }};
}

/// Basic structural checks on an assembled document.
fn assert_html_document(html: &str, pages: usize, context: &str) {
    assert!(
        html.starts_with("<!DOCTYPE html>"),
        "[{context}] missing doctype"
    );
    assert!(html.contains("<meta charset=\"UTF-8\">"), "[{context}] missing charset");
    assert_eq!(
        html.matches("<section class=\"page").count(),
        pages,
        "[{context}] wrong number of page sections"
    );
    for n in 1..pages {
        let a = html.find(&format!("id=\"page-{n}\""));
        let b = html.find(&format!("id=\"page-{}\"", n + 1));
        if let (Some(a), Some(b)) = (a, b) {
            assert!(a < b, "[{context}] page {n} appears after page {}", n + 1);
        }
    }
}

fn identity_config() -> TranslationConfig {
    TranslationConfig::builder()
        .translator(Arc::new(IdentityBackend))
        .build()
        .unwrap()
}

// ── Tests ────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_identity_translation_of_sample() {
    let pdf = e2e_skip_unless_ready!(test_cases_dir().join("sample.pdf"));

    let output = translate_document(&pdf, &identity_config())
        .await
        .expect("translation should succeed");

    let selected = output.stats.processed_pages + output.stats.failed_pages;
    assert_html_document(&output.html, selected, "sample");
    assert!(output.stats.processed_pages > 0);
    assert_eq!(output.stats.fallbacks, 0, "identity backend never falls back");
    assert!(output.html.contains("<title>Translation of sample.pdf</title>"));
    println!(
        "sample.pdf: {} pages, {} text items, {} warnings",
        output.stats.processed_pages,
        output.pages.iter().map(|p| p.text_items).sum::<usize>(),
        output.stats.warnings
    );
}

#[tokio::test]
async fn test_first_page_to_file() {
    let pdf = e2e_skip_unless_ready!(test_cases_dir().join("sample.pdf"));
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("sample.html");

    let mut config = identity_config();
    config.pages = PageSelection::Single(1);

    let output = translate_to_file(&pdf, &out, &config).await.unwrap();
    let written = std::fs::read_to_string(&out).unwrap();
    assert_eq!(written, output.html);
    assert_html_document(&written, 1, "first page");
}

#[tokio::test]
async fn test_google_translation_of_first_page() {
    let pdf = e2e_skip_unless_ready!(test_cases_dir().join("sample.pdf"));

    let config = TranslationConfig::builder()
        .backend(BackendKind::Google)
        .source_lang("en")
        .target_lang("it")
        .pages(PageSelection::Single(1))
        .build()
        .unwrap();

    let output = translate_document(&pdf, &config).await.unwrap();
    assert!(output.stats.backend_calls > 0);
    assert!(output.html.contains("<html lang=\"it\">"));
}

#[tokio::test]
async fn test_non_pdf_is_rejected() {
    let _ = e2e_skip_unless_ready!(test_cases_dir());
    let dir = tempfile::tempdir().unwrap();
    let fake = dir.path().join("fake.pdf");
    std::fs::write(&fake, b"<html>not a pdf</html>").unwrap();

    let err = translate_document(&fake, &identity_config())
        .await
        .unwrap_err();
    assert!(matches!(err, TranslatePdfError::NotAPdf { .. }));
}
