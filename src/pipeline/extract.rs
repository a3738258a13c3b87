//! Extract stage: one completion call per page image, raw text to disk.
//!
//! Images are processed one at a time in page order. The n-th image's
//! response is written verbatim to `response{n}.txt`. Failures are isolated
//! to the image: an unreadable file or a failed call produces no output
//! file, is logged, and the loop moves on.

use crate::error::{ItemError, Pdf2TableError};
use crate::output::{ExtractionResult, ItemResult, StageReport};
use crate::pipeline::encode;
use crate::pipeline::files::{self, IMAGE_EXTENSIONS};
use crate::pipeline::llm::TableExtractor;
use crate::progress::{ProgressCallback, Stage};
use std::path::Path;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Run `extractor` over every image in `image_dir`, writing responses to `output_dir`.
///
/// # Errors
/// Only fatal conditions: `image_dir` cannot be listed or `output_dir`
/// cannot be created. Per-image failures are recorded in the report.
pub async fn extract_tables<E: TableExtractor>(
    extractor: &E,
    image_dir: &Path,
    output_dir: &Path,
    progress: Option<&ProgressCallback>,
) -> Result<StageReport<ExtractionResult>, Pdf2TableError> {
    let start = Instant::now();
    let images = files::list_inputs(image_dir, IMAGE_EXTENSIONS)?;
    files::ensure_dir(output_dir)?;

    let total = images.len();
    info!(
        "Extracting tables from {} images in {}",
        total,
        image_dir.display()
    );
    if let Some(cb) = progress {
        cb.on_stage_start(Stage::Extract, total);
    }

    let mut report = StageReport::new(Stage::Extract);
    for (pos, image_path) in images.into_iter().enumerate() {
        let index = pos + 1;
        let outcome = extract_one(extractor, &image_path, index, output_dir).await;

        match outcome {
            Ok(ref result) => {
                if let Some(cb) = progress {
                    cb.on_item_complete(Stage::Extract, index, total, &result.path);
                }
            }
            Err(ref e) => {
                warn!("Error processing {}", e);
                if let Some(cb) = progress {
                    cb.on_item_error(Stage::Extract, index, total, &e.to_string());
                }
            }
        }

        report.items.push(ItemResult {
            index,
            source: image_path,
            outcome,
        });
    }

    report.duration_ms = start.elapsed().as_millis() as u64;
    info!(
        "Extraction complete: {}/{} images, {} tokens in / {} out, {}ms",
        report.succeeded(),
        total,
        report.total_input_tokens(),
        report.total_output_tokens(),
        report.duration_ms
    );
    if let Some(cb) = progress {
        cb.on_stage_complete(Stage::Extract, total, report.succeeded());
    }
    Ok(report)
}

async fn extract_one<E: TableExtractor>(
    extractor: &E,
    image_path: &Path,
    index: usize,
    output_dir: &Path,
) -> Result<ExtractionResult, ItemError> {
    let name = files::display_name(image_path);
    info!("Processing {}...", name);
    let started = Instant::now();

    let encoded = encode::encode_image_file(image_path)
        .await
        .map_err(|e| ItemError::ReadFailed {
            file: name.clone(),
            detail: e.to_string(),
        })?;

    let completion = extractor
        .extract(&encoded)
        .await
        .map_err(|e| ItemError::ServiceFailed {
            file: name.clone(),
            detail: e.to_string(),
        })?;

    if completion.choices.is_empty() {
        debug!("{}: service returned no choices; storing empty response", name);
    }
    let text = completion.first_text();

    let out_path = output_dir.join(files::response_text_name(index));
    tokio::fs::write(&out_path, text.as_bytes())
        .await
        .map_err(|e| ItemError::WriteFailed {
            file: files::display_name(&out_path),
            detail: e.to_string(),
        })?;
    info!("Saved extracted data to {}", out_path.display());

    Ok(ExtractionResult {
        index,
        source: image_path.to_path_buf(),
        path: out_path,
        text_len: text.len(),
        input_tokens: completion.input_tokens,
        output_tokens: completion.output_tokens,
        duration_ms: started.elapsed().as_millis() as u64,
    })
}
