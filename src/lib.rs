//! # edgequake-pdf2table
//!
//! Extract tables from PDF documents into CSV files using Vision Language
//! Models (VLMs).
//!
//! Scanned statements, invoices, and reports rarely carry a usable text
//! layer, and when they do, table cells come out as an unordered soup. This
//! crate rasterises each page, asks a VLM to read the tables off the image as
//! JSON, and writes each page's rows to a CSV file.
//!
//! ## Pipeline Overview
//!
//! ```text
//! PDF
//!  │
//!  ├─ 1. Render     pdfium → extracted_images/page_{n}.png
//!  ├─ 2. Extract    PNG → base64 → VLM → extracted_txt_files/response{n}.txt
//!  └─ 3. Structure  JSON → extracted_csv_files/response{n}.csv
//! ```
//!
//! Stages run one after another, one item at a time. Each stage reads only
//! the previous stage's directory, so any stage can be re-run on its own.
//! A failing page or response is logged, recorded in the stage report, and
//! skipped; only a document with no pages stops the run.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use edgequake_pdf2table::{run_pipeline, PipelineConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Provider auto-detected from OPENAI_API_KEY / ANTHROPIC_API_KEY / GEMINI_API_KEY
//!     let config = PipelineConfig::builder()
//!         .input("statement.pdf")
//!         .build()?;
//!     let report = run_pipeline(&config).await?;
//!     eprintln!(
//!         "{} pages, {} CSV files, {} failures",
//!         report.pages.len(),
//!         report.structuring.succeeded(),
//!         report.extraction.failed() + report.structuring.failed()
//!     );
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `pdf2table` binary (clap + anyhow + tracing-subscriber + indicatif) |

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod error;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod prompts;
pub mod run;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{PipelineConfig, PipelineConfigBuilder};
pub use error::{ItemError, Pdf2TableError, ServiceError};
pub use output::{
    ExtractionResult, ItemResult, PageImage, PipelineReport, StageReport, TableFile,
};
pub use pipeline::llm::{Completion, TableExtractor, VisionExtractor};
pub use pipeline::render::{PageRasteriser, PageSink, PdfiumRasteriser};
pub use pipeline::table::RecordSet;
pub use progress::{NoopProgressCallback, PipelineProgressCallback, ProgressCallback, Stage};
pub use run::{
    extract_stage, extract_stage_with, render_stage, render_stage_with, run_pipeline,
    run_pipeline_sync, run_pipeline_with, structure_stage,
};
