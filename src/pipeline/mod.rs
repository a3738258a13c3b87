//! Pipeline stages for PDF-to-table extraction.
//!
//! ```text
//! input ──▶ render ──▶ encode ──▶ llm ──▶ parse ──▶ table
//! (URL/path) (pdfium)  (base64)   (VLM)   (JSON)    (CSV)
//! ```
//!
//! Stage drivers:
//!
//! 1. [`render`]:     rasterise every page to `page_{n}.png`; pdfium runs in
//!    `spawn_blocking`
//! 2. [`extract`]:    one VLM call per image, raw text to `response{n}.txt`
//! 3. [`structure`]:  locate JSON in each response and write `response{n}.csv`
//!
//! Helpers: [`input`] resolves the document, [`encode`] wraps image bytes for
//! the request, [`llm`] is the completion-service seam, [`parse`] and
//! [`table`] turn text into records, [`files`] owns naming and ordering.

pub mod encode;
pub mod extract;
pub mod files;
pub mod input;
pub mod llm;
pub mod parse;
pub mod render;
pub mod structure;
pub mod table;
