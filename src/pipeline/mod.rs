//! Pipeline stages for PDF-to-translated-HTML conversion.
//!
//! Each submodule implements one transformation step and can be tested on
//! its own. Only [`decode`] touches pdfium and only [`render`] awaits.
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ decode ──▶ extract ──▶ links ──▶ render ──▶ assemble
//! (path)    (pdfium)   (blocks)    (hrefs)   (translate)  (template)
//! ```
//!
//! 1. [`input`]  — validate the input PDF and the output location
//! 2. [`decode`] — read the selected pages into owned [`DecodedPage`]s in one
//!    `spawn_blocking` pass
//! 3. [`extract`] — group text runs into blocks and emit ordered content
//!    items; [`normalize`] cleans each block
//! 4. [`links`]  — attach link annotations to the text they cover
//! 5. [`render`] — translate text through the dispatcher and emit the page
//!    `<section>`
//! 6. [`assemble`] — wrap the fragments, in page order, in the HTML template
//!
//! [`DecodedPage`]: crate::model::DecodedPage

pub mod assemble;
pub mod decode;
pub mod extract;
pub mod input;
pub mod links;
pub mod normalize;
pub mod render;
