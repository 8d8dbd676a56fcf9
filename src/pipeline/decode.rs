//! PDF decoding: turn the selected pages into owned [`DecodedPage`]s via pdfium.
//!
//! ## Why decode up front?
//!
//! pdfium is a C++ library with global state; `pdfium-render` serialises
//! every call behind one lock when built with `thread_safe`, and its document
//! handles borrow the bindings so they cannot cross task boundaries. Decoding
//! all selected pages in one `spawn_blocking` call costs a single pass over
//! the file and leaves the async workers with plain owned data. Translation,
//! not decoding, dominates wall-clock time.
//!
//! Each worker takes its page out of the [`DecodedDocument`], so a page's
//! text and image bytes are freed as soon as its fragment is rendered.
//!
//! ## Images
//!
//! An image stream that already is a complete image file (a DCT-encoded
//! JPEG, usually) is kept byte for byte. Anything else is rendered by pdfium
//! and re-encoded as PNG.
//!
//! ## Coordinates
//!
//! pdfium reports rectangles with a bottom-left origin. Everything here is
//! flipped to top-left (`top = page_height - pdf_top`) before it leaves the
//! module.

use crate::config::PageSelection;
use crate::error::{PageError, TranslatePdfError};
use crate::model::{DecodedPage, LinkAction, LinkAnnotation, PageSource, PlacedImage, Rect, TextRun};
use crate::output::DocumentMetadata;
use pdfium_render::prelude::*;
use std::io::Cursor;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::{debug, info, warn};

type Slot = Option<Result<DecodedPage, PageError>>;

/// Decoded pages of one document, indexed by 0-based page index.
///
/// Pages that were not selected hold [`PageError::Missing`]. A slot is
/// emptied when its page is taken.
pub struct DecodedDocument {
    page_count: usize,
    slots: Mutex<Vec<Slot>>,
}

impl DecodedDocument {
    pub fn new(pages: Vec<Result<DecodedPage, PageError>>) -> Self {
        Self {
            page_count: pages.len(),
            slots: Mutex::new(pages.into_iter().map(Some).collect()),
        }
    }

    /// Number of pages that have not been taken yet.
    pub fn pending(&self) -> usize {
        self.lock().iter().filter(|slot| slot.is_some()).count()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<Slot>> {
        self.slots.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl PageSource for DecodedDocument {
    fn page_count(&self) -> usize {
        self.page_count
    }

    fn take_page(&self, index: usize) -> Result<DecodedPage, PageError> {
        self.lock()
            .get_mut(index)
            .and_then(Option::take)
            .unwrap_or(Err(PageError::Missing { page: index + 1 }))
    }
}

/// Bind to a pdfium library.
///
/// Search order: `PDFIUM_LIB_PATH` (a directory), the working directory,
/// the executable's directory, then the system library path.
pub fn create_pdfium() -> Result<Pdfium, TranslatePdfError> {
    let mut candidates: Vec<PathBuf> = Vec::new();
    if let Ok(dir) = std::env::var("PDFIUM_LIB_PATH") {
        if !dir.is_empty() {
            candidates.push(PathBuf::from(dir));
        }
    }
    candidates.push(PathBuf::from("./"));
    if let Some(dir) = std::env::current_exe().ok().and_then(|p| p.parent().map(Path::to_path_buf)) {
        candidates.push(dir);
    }

    let mut last_err = String::from("no candidate locations");
    for dir in &candidates {
        match Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path(dir)) {
            Ok(bindings) => {
                debug!("Bound pdfium from {}", dir.display());
                return Ok(Pdfium::new(bindings));
            }
            Err(e) => last_err = format!("{}: {:?}", dir.display(), e),
        }
    }

    Pdfium::bind_to_system_library()
        .map(Pdfium::new)
        .map_err(|e| TranslatePdfError::PdfiumBindingFailed(format!("{last_err}; system: {e:?}")))
}

/// Decode the pages picked by `pages` and read the metadata.
///
/// Runs inside `spawn_blocking`. Document-level failures are fatal; a page
/// that fails (or panics inside pdfium) becomes a [`PageError`] in its slot.
pub async fn decode_document(
    pdf_path: &Path,
    password: Option<&str>,
    pages: &PageSelection,
    include_images: bool,
) -> Result<(DecodedDocument, DocumentMetadata), TranslatePdfError> {
    let path = pdf_path.to_path_buf();
    let password = password.map(str::to_string);
    let pages = pages.clone();

    tokio::task::spawn_blocking(move || {
        decode_blocking(&path, password.as_deref(), &pages, include_images)
    })
    .await
    .map_err(|e| TranslatePdfError::Internal(format!("Decode task panicked: {e}")))?
}

fn decode_blocking(
    pdf_path: &Path,
    password: Option<&str>,
    pages: &PageSelection,
    include_images: bool,
) -> Result<(DecodedDocument, DocumentMetadata), TranslatePdfError> {
    let pdfium = create_pdfium()?;
    let document = pdfium
        .load_pdf_from_file(pdf_path, password)
        .map_err(|e| classify_load_error(pdf_path, password.is_some(), e))?;

    let metadata = read_document_metadata(&document);
    let total = metadata.page_count;
    info!("PDF loaded: {} pages", total);

    let mut slots: Vec<Result<DecodedPage, PageError>> = (0..total)
        .map(|i| Err(PageError::Missing { page: i + 1 }))
        .collect();

    let selected = pages.to_indices(total);
    let pages = document.pages();
    for idx in selected {
        let outcome = catch_unwind(AssertUnwindSafe(|| -> Result<DecodedPage, PageError> {
            let page = pages.get(idx as u16).map_err(|e| PageError::DecodeFailed {
                page: idx + 1,
                detail: format!("{e:?}"),
            })?;
            decode_page(idx, &page, include_images)
        }));

        slots[idx] = match outcome {
            Ok(Ok(decoded)) => {
                debug!(
                    "Decoded page {}: {} runs, {} images, {} links",
                    idx + 1,
                    decoded.runs.len(),
                    decoded.images.len(),
                    decoded.links.len()
                );
                Ok(decoded)
            }
            Ok(Err(e)) => {
                warn!("{}", e);
                Err(e)
            }
            Err(panic) => {
                let e = PageError::DecodeFailed {
                    page: idx + 1,
                    detail: format!("pdfium panicked: {}", panic_message(&*panic)),
                };
                warn!("{}", e);
                Err(e)
            }
        };
    }

    Ok((DecodedDocument::new(slots), metadata))
}

fn classify_load_error(path: &Path, had_password: bool, e: PdfiumError) -> TranslatePdfError {
    let detail = format!("{e:?}");
    if detail.to_ascii_lowercase().contains("password") {
        if had_password {
            TranslatePdfError::WrongPassword {
                path: path.to_path_buf(),
            }
        } else {
            TranslatePdfError::PasswordRequired {
                path: path.to_path_buf(),
            }
        }
    } else {
        TranslatePdfError::CorruptPdf {
            path: path.to_path_buf(),
            detail,
        }
    }
}

fn read_document_metadata(document: &PdfDocument) -> DocumentMetadata {
    let metadata = document.metadata();
    let get_meta = |tag: PdfDocumentMetadataTagType| -> Option<String> {
        metadata
            .get(tag)
            .map(|t| t.value().to_string())
            .filter(|v| !v.is_empty())
    };

    DocumentMetadata {
        title: get_meta(PdfDocumentMetadataTagType::Title),
        author: get_meta(PdfDocumentMetadataTagType::Author),
        subject: get_meta(PdfDocumentMetadataTagType::Subject),
        creator: get_meta(PdfDocumentMetadataTagType::Creator),
        producer: get_meta(PdfDocumentMetadataTagType::Producer),
        page_count: document.pages().len() as usize,
        pdf_version: format!("{:?}", document.version()),
    }
}

fn decode_page(index: usize, page: &PdfPage, include_images: bool) -> Result<DecodedPage, PageError> {
    let width = page.width().value;
    let height = page.height().value;
    let flip = |left: f32, top: f32, right: f32, bottom: f32| {
        Rect::new(left, height - top, right, height - bottom)
    };

    // Text: pdfium segments are runs sharing one baseline and font. Segment
    // height stands in for the font size, which segments do not expose.
    // A page without a readable text layer fails as a whole.
    let text_page = require_text_layer(index + 1, page.text())?;
    let mut runs = Vec::new();
    for segment in text_page.segments().iter() {
        let text = segment.text();
        if text.trim().is_empty() {
            continue;
        }
        let b = segment.bounds();
        let bbox = flip(b.left().value, b.top().value, b.right().value, b.bottom().value);
        runs.push(TextRun {
            text,
            font_size: bbox.height(),
            bbox,
        });
    }

    let mut images = Vec::new();
    if include_images {
        for object in page.objects().iter() {
            let Some(image) = object.as_image_object() else {
                continue;
            };
            let bbox = match object.bounds() {
                Ok(b) => flip(b.left().value, b.top().value, b.right().value, b.bottom().value),
                Err(e) => {
                    debug!("Page {}: image without bounds: {:?}", index + 1, e);
                    continue;
                }
            };
            images.push(PlacedImage {
                bbox,
                data: image_bytes(image),
            });
        }
    }

    let mut links = Vec::new();
    for link in page.links().iter() {
        let Ok(r) = link.rect() else {
            continue;
        };
        let rect = flip(r.left().value, r.top().value, r.right().value, r.bottom().value);
        let action = match link.action() {
            Some(PdfAction::Uri(uri)) => match uri.uri() {
                Ok(u) => LinkAction::Uri(u),
                Err(_) => LinkAction::Unsupported,
            },
            Some(PdfAction::LocalDestination(dest)) => LinkAction::Destination(
                dest.destination()
                    .ok()
                    .and_then(|d| d.page_index().ok())
                    .map(|i| i as usize),
            ),
            Some(_) => LinkAction::Unsupported,
            None => match link.destination() {
                Some(d) => LinkAction::Destination(d.page_index().ok().map(|i| i as usize)),
                None => LinkAction::Unsupported,
            },
        };
        links.push(LinkAnnotation { rect, action });
    }

    Ok(DecodedPage {
        index,
        width,
        height,
        runs,
        images,
        links,
    })
}

fn require_text_layer<T, E: std::fmt::Debug>(page: usize, text: Result<T, E>) -> Result<T, PageError> {
    text.map_err(|e| PageError::DecodeFailed {
        page,
        detail: format!("text layer unreadable: {e:?}"),
    })
}

/// Stream bytes when they already form an embeddable file, otherwise the
/// decoded bitmap as PNG.
fn image_bytes(image: &PdfPageImageObject) -> Result<Vec<u8>, String> {
    match image.get_raw_image_data() {
        Ok(raw) if is_embeddable(&raw) => return Ok(raw),
        Ok(_) => {}
        Err(e) => debug!("Raw image stream unavailable: {:?}", e),
    }
    let bitmap = image.get_raw_image().map_err(|e| format!("{e:?}"))?;
    let mut buf = Vec::new();
    bitmap
        .write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)
        .map_err(|e| e.to_string())?;
    Ok(buf)
}

/// Formats a browser shows from a data URI.
fn is_embeddable(bytes: &[u8]) -> bool {
    matches!(
        image::guess_format(bytes),
        Ok(image::ImageFormat::Jpeg
            | image::ImageFormat::Png
            | image::ImageFormat::Gif
            | image::ImageFormat::Bmp
            | image::ImageFormat::WebP)
    )
}

pub(crate) fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    panic
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| panic.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_string())
}
