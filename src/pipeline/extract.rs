//! Content extraction: decoded page → text blocks and images.
//!
//! Text runs arrive one per baseline segment. Runs sitting on the same line
//! are joined with a space, lines are stacked into paragraph blocks, and a
//! new block starts when:
//!
//! - the vertical gap exceeds 1.5 × the page's average line spacing or
//!   twice the line height,
//! - the text moves back up the page (next column),
//! - the font size changes by more than 1pt, or
//! - the heading flag flips.
//!
//! Extraction is lazy: [`ContentItems`] builds one block per `next()` call
//! and yields images after the text. Reading order is imposed afterwards by
//! [`order_items`].

use crate::error::PageWarning;
use crate::model::{ContentItem, DecodedPage, ImageItem, PlacedImage, StyleHints, TextItem, TextRun};
use crate::pipeline::normalize::normalize_block;
use tracing::debug;

/// Gap multiplier over the average line spacing that ends a paragraph.
const PARAGRAPH_GAP_FACTOR: f32 = 1.5;

/// Font-size change (points) that ends a block.
const FONT_SIZE_TOLERANCE: f32 = 1.0;

#[derive(Debug, Clone, Copy)]
pub struct ExtractOptions {
    pub include_images: bool,
    pub heading_ratio: f32,
}

impl Default for ExtractOptions {
    fn default() -> Self {
        Self {
            include_images: true,
            heading_ratio: 1.35,
        }
    }
}

/// Lazily extract the content of `page` in extraction order.
pub fn extract_items<'a>(page: &'a DecodedPage, options: &ExtractOptions) -> ContentItems<'a> {
    let median = median_font_size(&page.runs);
    ContentItems {
        page_num: page.page_num(),
        runs: &page.runs,
        next_run: 0,
        avg_spacing: average_line_spacing(&page.runs),
        heading_size: if median > 0.0 { median * options.heading_ratio } else { f32::INFINITY },
        images: if options.include_images { page.images.iter() } else { page.images[..0].iter() },
        warnings: Vec::new(),
    }
}

/// Stable sort by vertical offset. Items at the same offset keep their
/// extraction order.
pub fn order_items(mut items: Vec<ContentItem>) -> Vec<ContentItem> {
    items.sort_by(|a, b| a.vertical_offset().total_cmp(&b.vertical_offset()));
    items
}

/// One-shot iterator over a page's content. See [`extract_items`].
pub struct ContentItems<'a> {
    page_num: usize,
    runs: &'a [TextRun],
    next_run: usize,
    avg_spacing: f32,
    heading_size: f32,
    images: std::slice::Iter<'a, PlacedImage>,
    warnings: Vec<PageWarning>,
}

impl ContentItems<'_> {
    /// Warnings recorded so far (skipped images).
    pub fn warnings(&self) -> &[PageWarning] {
        &self.warnings
    }

    pub fn into_warnings(self) -> Vec<PageWarning> {
        self.warnings
    }

    fn is_heading(&self, run: &TextRun) -> bool {
        run.font_size >= self.heading_size
    }

    fn next_block(&mut self) -> Option<TextItem> {
        let runs = self.runs;
        loop {
            let first = runs.get(self.next_run)?;
            self.next_run += 1;

            let heading = self.is_heading(first);
            let mut text = first.text.clone();
            let mut bbox = first.bbox;
            let mut size_sum = first.font_size;
            let mut count = 1usize;
            let mut line_top = first.bbox.top;
            let mut line_height = first.bbox.height();

            while let Some(run) = runs.get(self.next_run) {
                let same_line = (run.bbox.top - line_top).abs() < 0.5 * line_height.min(run.bbox.height()).max(1.0);
                if same_line {
                    text.push(' ');
                } else {
                    let delta = run.bbox.top - line_top;
                    let breaks = delta <= 0.0
                        || delta > self.avg_spacing * PARAGRAPH_GAP_FACTOR
                        || delta > 2.0 * line_height.max(run.bbox.height())
                        || (run.font_size - size_sum / count as f32).abs() > FONT_SIZE_TOLERANCE
                        || self.is_heading(run) != heading;
                    if breaks {
                        break;
                    }
                    text.push('\n');
                    line_top = run.bbox.top;
                    line_height = run.bbox.height();
                }
                text.push_str(&run.text);
                bbox = bbox.union(&run.bbox);
                size_sum += run.font_size;
                count += 1;
                self.next_run += 1;
            }

            let text = normalize_block(&text);
            if text.is_empty() {
                continue;
            }
            return Some(TextItem {
                text,
                vertical_offset: bbox.top,
                bbox,
                style: StyleHints {
                    font_size: size_sum / count as f32,
                    heading,
                },
                link: None,
            });
        }
    }

    fn next_image(&mut self) -> Option<ImageItem> {
        for placed in self.images.by_ref() {
            let bytes = match &placed.data {
                Ok(bytes) => bytes,
                Err(e) => {
                    debug!("Page {}: unreadable image stream: {}", self.page_num, e);
                    self.warnings.push(PageWarning::ImageSkipped {
                        page: self.page_num,
                        detail: e.clone(),
                    });
                    continue;
                }
            };
            match image::guess_format(bytes) {
                Ok(format) => {
                    return Some(ImageItem {
                        bytes: bytes.clone(),
                        format,
                        vertical_offset: placed.bbox.top,
                        bbox: placed.bbox,
                    })
                }
                Err(e) => self.warnings.push(PageWarning::ImageSkipped {
                    page: self.page_num,
                    detail: format!("unrecognised image data: {e}"),
                }),
            }
        }
        None
    }
}

impl Iterator for ContentItems<'_> {
    type Item = ContentItem;

    fn next(&mut self) -> Option<ContentItem> {
        if let Some(block) = self.next_block() {
            return Some(ContentItem::Text(block));
        }
        self.next_image().map(ContentItem::Image)
    }
}

fn median_font_size(runs: &[TextRun]) -> f32 {
    let mut sizes: Vec<f32> = runs
        .iter()
        .map(|r| r.font_size)
        .filter(|s| s.is_finite() && *s > 0.0)
        .collect();
    if sizes.is_empty() {
        return 0.0;
    }
    sizes.sort_by(f32::total_cmp);
    sizes[sizes.len() / 2]
}

/// Mean top-to-top distance between consecutive lines, ignoring runs on the
/// same line and upward jumps.
fn average_line_spacing(runs: &[TextRun]) -> f32 {
    let deltas: Vec<f32> = runs
        .windows(2)
        .filter_map(|w| {
            let delta = w[1].bbox.top - w[0].bbox.top;
            let threshold = 0.5 * w[0].bbox.height().min(w[1].bbox.height()).max(1.0);
            (delta > threshold).then_some(delta)
        })
        .collect();
    if deltas.is_empty() {
        f32::INFINITY
    } else {
        deltas.iter().sum::<f32>() / deltas.len() as f32
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Rect;
    use image::{Rgba, RgbaImage};
    use std::io::Cursor;

    fn text_run(text: &str, left: f32, top: f32, width: f32, size: f32) -> TextRun {
        TextRun {
            text: text.to_string(),
            bbox: Rect::new(left, top, left + width, top + size),
            font_size: size,
        }
    }

    fn png() -> Vec<u8> {
        let mut buf = Vec::new();
        RgbaImage::from_pixel(2, 2, Rgba([0, 128, 255, 255]))
            .write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)
            .unwrap();
        buf
    }

    fn page(runs: Vec<TextRun>, images: Vec<PlacedImage>) -> DecodedPage {
        DecodedPage {
            index: 0,
            width: 600.0,
            height: 800.0,
            runs,
            images,
            links: vec![],
        }
    }

    fn texts(items: &[ContentItem]) -> Vec<String> {
        items
            .iter()
            .filter_map(|i| match i {
                ContentItem::Text(t) => Some(t.text.clone()),
                ContentItem::Image(_) => None,
            })
            .collect()
    }

    #[test]
    fn empty_page_yields_nothing() {
        let p = page(vec![], vec![]);
        let mut items = extract_items(&p, &ExtractOptions::default());
        assert!(items.next().is_none());
        assert!(items.warnings().is_empty());
    }

    #[test]
    fn lines_join_into_paragraphs() {
        let p = page(
            vec![
                text_run("First line of a para-", 50.0, 100.0, 300.0, 10.0),
                text_run("graph continues here.", 50.0, 112.0, 300.0, 10.0),
                text_run("Second", 50.0, 160.0, 60.0, 10.0),
                text_run("paragraph.", 115.0, 160.0, 80.0, 10.0),
                text_run("Still second.", 50.0, 172.0, 100.0, 10.0),
            ],
            vec![],
        );
        let items: Vec<_> = extract_items(&p, &ExtractOptions::default()).collect();
        assert_eq!(
            texts(&items),
            vec![
                "First line of a paragraph continues here.",
                "Second paragraph. Still second."
            ]
        );
    }

    #[test]
    fn large_font_is_a_heading_block() {
        let p = page(
            vec![
                text_run("Introduction", 50.0, 60.0, 200.0, 20.0),
                text_run("Body text one.", 50.0, 90.0, 200.0, 10.0),
                text_run("Body text two.", 50.0, 102.0, 200.0, 10.0),
                text_run("Body text three.", 50.0, 114.0, 200.0, 10.0),
            ],
            vec![],
        );
        let items: Vec<_> = extract_items(&p, &ExtractOptions::default()).collect();
        assert_eq!(items.len(), 2);
        match &items[0] {
            ContentItem::Text(t) => {
                assert_eq!(t.text, "Introduction");
                assert!(t.style.heading);
            }
            other => panic!("unexpected {other:?}"),
        }
        match &items[1] {
            ContentItem::Text(t) => assert!(!t.style.heading),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn whitespace_blocks_are_dropped() {
        let p = page(vec![text_run(" \u{200B} ", 50.0, 100.0, 10.0, 10.0)], vec![]);
        assert_eq!(extract_items(&p, &ExtractOptions::default()).count(), 0);
    }

    #[test]
    fn corrupt_images_are_skipped_with_warning() {
        let p = page(
            vec![],
            vec![
                PlacedImage {
                    bbox: Rect::new(0.0, 10.0, 50.0, 60.0),
                    data: Err("bad stream".into()),
                },
                PlacedImage {
                    bbox: Rect::new(0.0, 100.0, 50.0, 160.0),
                    data: Ok(b"garbage".to_vec()),
                },
                PlacedImage {
                    bbox: Rect::new(0.0, 200.0, 50.0, 260.0),
                    data: Ok(png()),
                },
            ],
        );
        let mut extracted = extract_items(&p, &ExtractOptions::default());
        let items: Vec<_> = extracted.by_ref().collect();
        assert_eq!(items.len(), 1);
        match &items[0] {
            ContentItem::Image(img) => {
                assert_eq!(img.format, image::ImageFormat::Png);
                assert_eq!(img.vertical_offset, 200.0);
            }
            other => panic!("unexpected {other:?}"),
        }
        let warnings = extracted.into_warnings();
        assert_eq!(warnings.len(), 2);
        assert!(warnings
            .iter()
            .all(|w| matches!(w, PageWarning::ImageSkipped { page: 1, .. })));
    }

    #[test]
    fn images_can_be_excluded() {
        let p = page(
            vec![],
            vec![PlacedImage {
                bbox: Rect::new(0.0, 0.0, 1.0, 1.0),
                data: Ok(png()),
            }],
        );
        let options = ExtractOptions {
            include_images: false,
            ..Default::default()
        };
        assert_eq!(extract_items(&p, &options).count(), 0);
    }

    #[test]
    fn ordering_interleaves_images_and_is_stable() {
        let p = page(
            vec![
                text_run("Top", 50.0, 50.0, 100.0, 10.0),
                text_run("Bottom", 50.0, 500.0, 100.0, 10.0),
                text_run("Tie", 300.0, 300.0, 100.0, 10.0),
            ],
            vec![PlacedImage {
                bbox: Rect::new(50.0, 300.0, 250.0, 450.0),
                data: Ok(png()),
            }],
        );
        let items = order_items(extract_items(&p, &ExtractOptions::default()).collect());
        let offsets: Vec<f32> = items.iter().map(ContentItem::vertical_offset).collect();
        assert_eq!(offsets, vec![50.0, 300.0, 300.0, 500.0]);
        // Equal offsets keep extraction order: text blocks precede images.
        assert!(items[1].is_text());
        assert!(!items[2].is_text());
    }
}
