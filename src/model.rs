//! Content model shared by every pipeline stage.
//!
//! Coordinates are PDF points in a **top-left origin** space: `top` grows
//! downward, so `top < bottom` for every well-formed [`Rect`]. The decoder
//! flips pdfium's bottom-left origin once, and nothing downstream has to care.

use crate::error::PageError;
use image::ImageFormat;

// ── Geometry ─────────────────────────────────────────────────────────────

/// Axis-aligned rectangle in top-left-origin page space.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Rect {
    pub left: f32,
    pub top: f32,
    pub right: f32,
    pub bottom: f32,
}

impl Rect {
    pub fn new(left: f32, top: f32, right: f32, bottom: f32) -> Self {
        Self {
            left: left.min(right),
            top: top.min(bottom),
            right: left.max(right),
            bottom: top.max(bottom),
        }
    }

    pub fn width(&self) -> f32 {
        self.right - self.left
    }

    pub fn height(&self) -> f32 {
        self.bottom - self.top
    }

    /// True when the two rectangles share a region of positive area.
    /// Touching edges do not count.
    pub fn intersects(&self, other: &Rect) -> bool {
        self.left < other.right
            && other.left < self.right
            && self.top < other.bottom
            && other.top < self.bottom
    }

    /// Smallest rectangle containing both.
    pub fn union(&self, other: &Rect) -> Rect {
        Rect {
            left: self.left.min(other.left),
            top: self.top.min(other.top),
            right: self.right.max(other.right),
            bottom: self.bottom.max(other.bottom),
        }
    }
}

// ── Decoded page (decoder output) ────────────────────────────────────────

/// A contiguous run of text sharing one font and one line.
#[derive(Debug, Clone, PartialEq)]
pub struct TextRun {
    pub text: String,
    pub bbox: Rect,
    pub font_size: f32,
}

/// An image placed on the page. `data` is the encoded image, or the reason
/// the stream could not be read.
#[derive(Debug, Clone)]
pub struct PlacedImage {
    pub bbox: Rect,
    pub data: Result<Vec<u8>, String>,
}

/// What a link annotation does when clicked.
#[derive(Debug, Clone, PartialEq)]
pub enum LinkAction {
    /// Open an external URI.
    Uri(String),
    /// Jump inside the document. `None` when the destination page could not
    /// be determined.
    Destination(Option<usize>),
    /// Launch, JavaScript, remote go-to and friends.
    Unsupported,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LinkAnnotation {
    pub rect: Rect,
    pub action: LinkAction,
}

/// Everything the pipeline needs from one page, detached from the decoder.
#[derive(Debug, Clone, Default)]
pub struct DecodedPage {
    /// 0-based page index in the document.
    pub index: usize,
    pub width: f32,
    pub height: f32,
    /// Text runs in content-stream order.
    pub runs: Vec<TextRun>,
    pub images: Vec<PlacedImage>,
    /// Link annotations in document order.
    pub links: Vec<LinkAnnotation>,
}

impl DecodedPage {
    /// 1-based page number.
    pub fn page_num(&self) -> usize {
        self.index + 1
    }
}

/// Hands decoded pages to the worker tasks.
///
/// Implemented by the pdfium adapter and by test doubles. Implementations
/// must be shareable across worker tasks.
///
/// Each page is handed over once. The worker owns it and drops it when its
/// fragment is rendered, so a source never keeps a finished page alive.
pub trait PageSource: Send + Sync {
    /// Number of pages in the document.
    fn page_count(&self) -> usize;

    /// Take the page at the 0-based `index`. A page that was already taken
    /// is [`PageError::Missing`].
    fn take_page(&self, index: usize) -> Result<DecodedPage, PageError>;
}

// ── Content items (extractor output) ─────────────────────────────────────

/// Where a piece of linked text points.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkTarget {
    /// Anchor id of a page section in the same document.
    Internal { anchor: String },
    /// Absolute URL.
    External { url: String },
}

impl LinkTarget {
    /// Value for the `href` attribute.
    pub fn href(&self) -> String {
        match self {
            LinkTarget::Internal { anchor } => format!("#{anchor}"),
            LinkTarget::External { url } => url.clone(),
        }
    }
}

/// Stable anchor id of a page section, shared by the link resolver and the
/// renderer.
pub fn page_anchor(page_num: usize) -> String {
    format!("page-{page_num}")
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct StyleHints {
    pub font_size: f32,
    pub heading: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TextItem {
    pub text: String,
    pub vertical_offset: f32,
    pub bbox: Rect,
    pub style: StyleHints,
    pub link: Option<LinkTarget>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ImageItem {
    pub bytes: Vec<u8>,
    pub format: ImageFormat,
    pub vertical_offset: f32,
    pub bbox: Rect,
}

/// One unit of page content in reading order.
#[derive(Debug, Clone, PartialEq)]
pub enum ContentItem {
    Text(TextItem),
    Image(ImageItem),
}

impl ContentItem {
    /// Distance from the top of the page to the top of the item. The only
    /// ordering key within a page.
    pub fn vertical_offset(&self) -> f32 {
        match self {
            ContentItem::Text(t) => t.vertical_offset,
            ContentItem::Image(i) => i.vertical_offset,
        }
    }

    pub fn bbox(&self) -> Rect {
        match self {
            ContentItem::Text(t) => t.bbox,
            ContentItem::Image(i) => i.bbox,
        }
    }

    pub fn is_text(&self) -> bool {
        matches!(self, ContentItem::Text(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rect_normalises_corners() {
        let r = Rect::new(10.0, 50.0, 0.0, 20.0);
        assert_eq!(r, Rect { left: 0.0, top: 20.0, right: 10.0, bottom: 50.0 });
        assert_eq!(r.width(), 10.0);
        assert_eq!(r.height(), 30.0);
    }

    #[test]
    fn intersection_requires_overlap() {
        let a = Rect::new(0.0, 0.0, 10.0, 10.0);
        assert!(a.intersects(&Rect::new(5.0, 5.0, 15.0, 15.0)));
        assert!(!a.intersects(&Rect::new(10.0, 0.0, 20.0, 10.0)), "shared edge");
        assert!(!a.intersects(&Rect::new(0.0, 11.0, 10.0, 20.0)));
    }

    #[test]
    fn union_covers_both() {
        let u = Rect::new(0.0, 0.0, 5.0, 5.0).union(&Rect::new(3.0, 4.0, 9.0, 12.0));
        assert_eq!(u, Rect::new(0.0, 0.0, 9.0, 12.0));
    }

    #[test]
    fn link_href() {
        let internal = LinkTarget::Internal { anchor: page_anchor(4) };
        assert_eq!(internal.href(), "#page-4");
        let external = LinkTarget::External { url: "https://example.org".into() };
        assert_eq!(external.href(), "https://example.org");
    }
}
