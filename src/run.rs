//! Pipeline entry points.
//!
//! [`run_pipeline`] runs render → extract → structure with the production
//! collaborators (pdfium, an `edgequake-llm` provider). Each stage can also
//! be run on its own from the same config, which is how an operator resumes
//! after fixing a failed stage: there is no checkpointing, a stage simply
//! rewrites its output directory.

use crate::config::PipelineConfig;
use crate::error::Pdf2TableError;
use crate::output::{ExtractionResult, PageImage, PipelineReport, StageReport, TableFile};
use crate::pipeline::extract::extract_tables;
use crate::pipeline::llm::{TableExtractor, VisionExtractor};
use crate::pipeline::render::{render_to_dir, PageRasteriser, PdfiumRasteriser};
use crate::pipeline::structure::structure_tables;
use crate::pipeline::input;
use std::time::Instant;
use tracing::info;

fn pdfium_rasteriser(config: &PipelineConfig) -> PdfiumRasteriser {
    PdfiumRasteriser::new(config.pdfium_lib_path.clone(), config.password.clone())
}

/// Run all three stages.
///
/// The LLM provider is resolved before any page is rendered, so a missing
/// API key fails the run without touching the file system.
///
/// # Errors
/// Fatal conditions only (bad input, zero-page document, provider not
/// configured, unusable directories). Per-item failures are in the report.
pub async fn run_pipeline(config: &PipelineConfig) -> Result<PipelineReport, Pdf2TableError> {
    let extractor = VisionExtractor::from_config(config)?;
    run_pipeline_with(pdfium_rasteriser(config), &extractor, config).await
}

/// [`run_pipeline`] with injected collaborators.
pub async fn run_pipeline_with<R, E>(
    rasteriser: R,
    extractor: &E,
    config: &PipelineConfig,
) -> Result<PipelineReport, Pdf2TableError>
where
    R: PageRasteriser + Send + 'static,
    E: TableExtractor,
{
    let total_start = Instant::now();
    info!("Starting pipeline: {}", config.input);

    // ── Stage 1: Render ──────────────────────────────────────────────────
    let render_start = Instant::now();
    let pages = render_stage_with(rasteriser, config).await?;
    let render_duration_ms = render_start.elapsed().as_millis() as u64;

    // ── Stage 2: Extract ─────────────────────────────────────────────────
    let extraction = extract_stage_with(extractor, config).await?;

    // ── Stage 3: Structure ───────────────────────────────────────────────
    let structuring = structure_stage(config)?;

    let report = PipelineReport {
        pages,
        render_duration_ms,
        extraction,
        structuring,
        total_duration_ms: total_start.elapsed().as_millis() as u64,
    };
    info!(
        "Pipeline complete: {} pages, {} responses, {} CSV files, {}ms total",
        report.pages.len(),
        report.extraction.succeeded(),
        report.structuring.succeeded(),
        report.total_duration_ms
    );
    Ok(report)
}

/// Render `config.input` into `config.image_dir` with pdfium.
pub async fn render_stage(config: &PipelineConfig) -> Result<Vec<PageImage>, Pdf2TableError> {
    render_stage_with(pdfium_rasteriser(config), config).await
}

/// Render `config.input` into `config.image_dir` with `rasteriser`.
pub async fn render_stage_with<R>(
    rasteriser: R,
    config: &PipelineConfig,
) -> Result<Vec<PageImage>, Pdf2TableError>
where
    R: PageRasteriser + Send + 'static,
{
    // Kept alive until rendering finishes; drops the temp download, if any.
    let resolved = input::resolve_input(&config.input, config.download_timeout_secs).await?;
    let pages = render_to_dir(
        rasteriser,
        resolved.path().to_path_buf(),
        config.dpi,
        config.image_dir.clone(),
        config.progress_callback.clone(),
    )
    .await?;
    info!(
        "Rendered {} pages at {} DPI into {}",
        pages.len(),
        config.dpi,
        config.image_dir.display()
    );
    Ok(pages)
}

/// Extract `config.image_dir` into `config.text_dir` with the configured provider.
pub async fn extract_stage(
    config: &PipelineConfig,
) -> Result<StageReport<ExtractionResult>, Pdf2TableError> {
    let extractor = VisionExtractor::from_config(config)?;
    extract_stage_with(&extractor, config).await
}

/// Extract `config.image_dir` into `config.text_dir` with `extractor`.
pub async fn extract_stage_with<E: TableExtractor>(
    extractor: &E,
    config: &PipelineConfig,
) -> Result<StageReport<ExtractionResult>, Pdf2TableError> {
    extract_tables(
        extractor,
        &config.image_dir,
        &config.text_dir,
        config.progress_callback.as_ref(),
    )
    .await
}

/// Structure `config.text_dir` into `config.table_dir`.
pub fn structure_stage(config: &PipelineConfig) -> Result<StageReport<TableFile>, Pdf2TableError> {
    structure_tables(
        &config.text_dir,
        &config.table_dir,
        config.progress_callback.as_ref(),
    )
}

/// Synchronous wrapper around [`run_pipeline`].
///
/// Creates a temporary tokio runtime internally.
pub fn run_pipeline_sync(config: &PipelineConfig) -> Result<PipelineReport, Pdf2TableError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| Pdf2TableError::Internal(format!("Failed to create tokio runtime: {}", e)))?
        .block_on(run_pipeline(config))
}
