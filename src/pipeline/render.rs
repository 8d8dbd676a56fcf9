//! Page rendering: ordered content items → one HTML `<section>`.
//!
//! Every text item goes through the [`Dispatcher`], so the renderer is the
//! only stage that awaits. Items are translated one after another: the order
//! of the fragment is the order of `items`, and the per-page cost is bounded
//! by the worker pool one level up.
//!
//! The output is a fragment, not a document; see
//! [`assemble`](super::assemble) for the surrounding template.

use crate::config::TranslationConfig;
use crate::error::{PageError, PageWarning};
use crate::model::{page_anchor, ContentItem, ImageItem, TextItem};
use crate::translate::Dispatcher;
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use std::fmt::Write as _;
use tracing::debug;

/// Marker placed in front of text that kept its original wording.
pub const TRANSLATION_FAILED_MARKER: &str = "[Translation Failed]";

/// Settings shared by every page of a run.
#[derive(Debug, Clone)]
pub struct RenderOptions {
    pub source_lang: String,
    pub target_lang: String,
    /// Emit a `--- Page n ---` footer after each page.
    pub page_footer: bool,
}

impl RenderOptions {
    pub fn from_config(config: &TranslationConfig) -> Self {
        Self {
            source_lang: config.source_lang.clone(),
            target_lang: config.target_lang.clone(),
            page_footer: config.page_footer,
        }
    }
}

/// A rendered page and what happened while rendering it.
#[derive(Debug, Clone, Default)]
pub struct RenderedPage {
    pub html: String,
    /// Text items sent to the dispatcher.
    pub text_items: usize,
    /// Text items that kept their original text.
    pub fallbacks: usize,
    pub warnings: Vec<PageWarning>,
}

/// Render page `page_num` (1-indexed) from its ordered items.
pub async fn render_page(
    page_num: usize,
    items: &[ContentItem],
    dispatcher: &Dispatcher,
    options: &RenderOptions,
) -> RenderedPage {
    let mut page = RenderedPage::default();
    let mut html = String::with_capacity(256 + items.len() * 128);
    let _ = writeln!(html, r#"<section class="page" id="{}">"#, page_anchor(page_num));

    for item in items {
        match item {
            ContentItem::Text(text) => {
                page.text_items += 1;
                let translation = dispatcher
                    .translate_or_fallback(&text.text, &options.source_lang, &options.target_lang)
                    .await;
                match translation.error {
                    None => html.push_str(&text_element(text, &translation.text, false)),
                    Some(e) => {
                        page.fallbacks += 1;
                        page.warnings.push(PageWarning::TranslationFallback {
                            page: page_num,
                            detail: e.to_string(),
                        });
                        html.push_str(&text_element(text, &text.text, true));
                    }
                }
            }
            ContentItem::Image(image) => html.push_str(&image_element(image, page_num)),
        }
        html.push('\n');
    }

    if options.page_footer {
        let _ = writeln!(
            html,
            r#"<div class="page-footer"><hr><p>--- Page {page_num} ---</p></div>"#
        );
    }
    html.push_str("</section>");

    debug!(
        "Rendered page {}: {} items, {} fallbacks, {} bytes",
        page_num,
        items.len(),
        page.fallbacks,
        html.len()
    );
    page.html = html;
    page
}

/// Marker section for a page that could not be processed.
///
/// Keeps the page anchor so links pointing at the page still land somewhere.
pub fn error_fragment(page_num: usize, error: &PageError) -> String {
    let reason = match error {
        PageError::DecodeFailed { detail, .. } => format!("decoding failed: {detail}"),
        PageError::WorkerPanicked { detail, .. } => format!("worker aborted: {detail}"),
        PageError::Missing { .. } => "no result produced".to_string(),
    };
    format!(
        "<section class=\"page page-error\" id=\"{}\">\n<p class=\"error\"><strong>Error processing page {}: {}</strong></p>\n</section>",
        page_anchor(page_num),
        page_num,
        html_escape::encode_text(&reason)
    )
}

fn text_element(item: &TextItem, body: &str, failed: bool) -> String {
    let tag = if item.style.heading { "h2" } else { "p" };
    let mut inner = html_escape::encode_text(body).into_owned();
    if let Some(ref link) = item.link {
        inner = format!(
            r#"<a href="{}">{}</a>"#,
            html_escape::encode_double_quoted_attribute(&link.href()),
            inner
        );
    }
    if failed {
        format!("<{tag}><em>{TRANSLATION_FAILED_MARKER}</em> {inner}</{tag}>")
    } else {
        format!("<{tag}>{inner}</{tag}>")
    }
}

fn image_element(image: &ImageItem, page_num: usize) -> String {
    format!(
        r#"<figure><img src="data:{};base64,{}" alt="Image from page {}"></figure>"#,
        image.format.to_mime_type(),
        STANDARD.encode(&image.bytes),
        page_num
    )
}
