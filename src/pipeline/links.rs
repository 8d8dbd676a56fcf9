//! Link resolution: attach link annotations to the text they cover.
//!
//! A text item takes the target of the first annotation, in document order,
//! whose rectangle overlaps the item's box and whose target resolves.
//! Internal destinations become `#page-N` anchors; external targets must be
//! absolute URLs. Anything else degrades the text to plain and leaves a
//! [`PageWarning::LinkDropped`] behind.

use crate::error::PageWarning;
use crate::model::{page_anchor, ContentItem, LinkAction, LinkAnnotation, LinkTarget};
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

static RE_ABSOLUTE_URL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-zA-Z][a-zA-Z0-9+.\-]*:[^\s]+$").unwrap());

/// Resolve `annotations` against the text items of page `page_num`
/// (1-indexed) in a document of `page_count` pages.
pub fn resolve_links(
    mut items: Vec<ContentItem>,
    annotations: &[LinkAnnotation],
    page_num: usize,
    page_count: usize,
) -> (Vec<ContentItem>, Vec<PageWarning>) {
    let mut warnings = Vec::new();
    let targets: Vec<Option<LinkTarget>> = annotations
        .iter()
        .map(|a| resolve_target(&a.action, page_num, page_count, &mut warnings))
        .collect();

    for item in items.iter_mut() {
        let ContentItem::Text(text) = item else {
            continue;
        };
        text.link = annotations
            .iter()
            .zip(&targets)
            .filter(|(a, _)| a.rect.intersects(&text.bbox))
            .find_map(|(_, t)| t.clone());
    }

    (items, warnings)
}

fn resolve_target(
    action: &LinkAction,
    page_num: usize,
    page_count: usize,
    warnings: &mut Vec<PageWarning>,
) -> Option<LinkTarget> {
    match action {
        LinkAction::Uri(url) => {
            let url = url.trim();
            if is_safe_absolute_url(url) {
                Some(LinkTarget::External { url: url.to_string() })
            } else {
                warnings.push(PageWarning::LinkDropped {
                    page: page_num,
                    detail: format!("not an absolute URL: '{url}'"),
                });
                None
            }
        }
        LinkAction::Destination(Some(index)) if *index < page_count => Some(LinkTarget::Internal {
            anchor: page_anchor(index + 1),
        }),
        LinkAction::Destination(Some(index)) => {
            warnings.push(PageWarning::LinkDropped {
                page: page_num,
                detail: format!("destination page {} does not exist", index + 1),
            });
            None
        }
        LinkAction::Destination(None) => {
            warnings.push(PageWarning::LinkDropped {
                page: page_num,
                detail: "destination page unknown".into(),
            });
            None
        }
        LinkAction::Unsupported => {
            debug!("Page {}: ignoring unsupported link action", page_num);
            None
        }
    }
}

fn is_safe_absolute_url(url: &str) -> bool {
    RE_ABSOLUTE_URL.is_match(url) && !url.to_ascii_lowercase().starts_with("javascript:")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Rect, StyleHints, TextItem};

    fn text(s: &str, bbox: Rect) -> ContentItem {
        ContentItem::Text(TextItem {
            text: s.into(),
            vertical_offset: bbox.top,
            bbox,
            style: StyleHints::default(),
            link: None,
        })
    }

    fn link_of(item: &ContentItem) -> Option<&LinkTarget> {
        match item {
            ContentItem::Text(t) => t.link.as_ref(),
            ContentItem::Image(_) => None,
        }
    }

    fn annotation(rect: Rect, action: LinkAction) -> LinkAnnotation {
        LinkAnnotation { rect, action }
    }

    #[test]
    fn overlapping_annotation_links_text() {
        let items = vec![
            text("see chapter 2", Rect::new(50.0, 100.0, 300.0, 112.0)),
            text("unrelated", Rect::new(50.0, 400.0, 300.0, 412.0)),
        ];
        let annotations = [annotation(
            Rect::new(200.0, 98.0, 260.0, 114.0),
            LinkAction::Destination(Some(4)),
        )];
        let (items, warnings) = resolve_links(items, &annotations, 1, 10);
        assert_eq!(
            link_of(&items[0]),
            Some(&LinkTarget::Internal { anchor: "page-5".into() })
        );
        assert_eq!(link_of(&items[1]), None);
        assert!(warnings.is_empty());
    }

    #[test]
    fn first_annotation_in_document_order_wins() {
        let items = vec![text("both", Rect::new(0.0, 0.0, 100.0, 10.0))];
        let annotations = [
            annotation(Rect::new(0.0, 0.0, 50.0, 10.0), LinkAction::Uri("https://first.example".into())),
            annotation(Rect::new(50.0, 0.0, 100.0, 10.0), LinkAction::Uri("https://second.example".into())),
        ];
        let (items, _) = resolve_links(items, &annotations, 1, 1);
        assert_eq!(
            link_of(&items[0]),
            Some(&LinkTarget::External { url: "https://first.example".into() })
        );
    }

    #[test]
    fn out_of_range_destination_is_dropped() {
        let items = vec![text("broken", Rect::new(0.0, 0.0, 100.0, 10.0))];
        let annotations = [annotation(
            Rect::new(0.0, 0.0, 100.0, 10.0),
            LinkAction::Destination(Some(99)),
        )];
        let (items, warnings) = resolve_links(items, &annotations, 3, 10);
        assert_eq!(link_of(&items[0]), None);
        assert_eq!(warnings.len(), 1);
        assert!(matches!(&warnings[0], PageWarning::LinkDropped { page: 3, detail } if detail.contains("100")));
    }

    #[test]
    fn dropped_annotation_falls_through_to_next() {
        let items = vec![text("x", Rect::new(0.0, 0.0, 100.0, 10.0))];
        let annotations = [
            annotation(Rect::new(0.0, 0.0, 100.0, 10.0), LinkAction::Destination(None)),
            annotation(Rect::new(0.0, 0.0, 100.0, 10.0), LinkAction::Destination(Some(0))),
        ];
        let (items, warnings) = resolve_links(items, &annotations, 2, 2);
        assert_eq!(
            link_of(&items[0]),
            Some(&LinkTarget::Internal { anchor: "page-1".into() })
        );
        assert_eq!(warnings.len(), 1);
    }

    #[test]
    fn relative_and_script_urls_are_rejected() {
        assert!(is_safe_absolute_url("https://example.org/a?b=c"));
        assert!(is_safe_absolute_url("mailto:someone@example.org"));
        assert!(!is_safe_absolute_url("docs/page.html"));
        assert!(!is_safe_absolute_url("JavaScript:alert(1)"));
        assert!(!is_safe_absolute_url("http://has space"));
    }

    #[test]
    fn unsupported_actions_are_silent() {
        let items = vec![text("x", Rect::new(0.0, 0.0, 10.0, 10.0))];
        let annotations = [annotation(Rect::new(0.0, 0.0, 10.0, 10.0), LinkAction::Unsupported)];
        let (items, warnings) = resolve_links(items, &annotations, 1, 1);
        assert_eq!(link_of(&items[0]), None);
        assert!(warnings.is_empty());
    }
}
