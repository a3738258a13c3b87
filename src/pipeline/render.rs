//! PDF rasterisation: render every page to `page_{n}.png` via pdfium.
//!
//! pdfium is blocking and keeps thread-local state, so the async entry point
//! [`render_to_dir`] moves the work onto `tokio::task::spawn_blocking`.
//!
//! Pages are handed to the writer one at a time through the
//! [`PageRasteriser`] callback: at 500 DPI a Letter page is ~90 MB of RGBA,
//! so only the page being saved is held in memory.

use crate::error::Pdf2TableError;
use crate::output::PageImage;
use crate::pipeline::files;
use crate::progress::{ProgressCallback, Stage};
use image::{DynamicImage, ImageFormat};
use pdfium_render::prelude::*;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Per-page sink passed to [`PageRasteriser::rasterise`].
/// Receives the 0-indexed page number, the document's page count, and the
/// rendered page.
pub type PageSink<'a> =
    dyn FnMut(usize, usize, DynamicImage) -> Result<(), Pdf2TableError> + 'a;

/// Turns a PDF into page images.
pub trait PageRasteriser {
    /// Render every page of `pdf_path` at `dpi`, in page order, passing each
    /// to `on_page`. Returns the document's page count.
    fn rasterise(
        &self,
        pdf_path: &Path,
        dpi: u32,
        on_page: &mut PageSink<'_>,
    ) -> Result<usize, Pdf2TableError>;
}

/// [`PageRasteriser`] backed by the pdfium C++ library.
#[derive(Debug, Clone, Default)]
pub struct PdfiumRasteriser {
    /// Library to bind. Falls back to `PDFIUM_LIB_PATH`, then the system library.
    pub lib_path: Option<PathBuf>,
    pub password: Option<String>,
}

impl PdfiumRasteriser {
    pub fn new(lib_path: Option<PathBuf>, password: Option<String>) -> Self {
        Self { lib_path, password }
    }

    fn bind(&self) -> Result<Pdfium, Pdf2TableError> {
        let explicit = self
            .lib_path
            .clone()
            .or_else(|| std::env::var_os("PDFIUM_LIB_PATH").map(PathBuf::from));

        let bindings = match explicit {
            Some(path) => Pdfium::bind_to_library(path.as_path())
                .map_err(|e| format!("{}: {}", path.display(), e)),
            None => Pdfium::bind_to_system_library().map_err(|e| e.to_string()),
        }
        .map_err(Pdf2TableError::PdfiumBindingFailed)?;

        Ok(Pdfium::new(bindings))
    }
}

impl PageRasteriser for PdfiumRasteriser {
    fn rasterise(
        &self,
        pdf_path: &Path,
        dpi: u32,
        on_page: &mut PageSink<'_>,
    ) -> Result<usize, Pdf2TableError> {
        let pdfium = self.bind()?;
        let password = self.password.as_deref();

        let document = pdfium.load_pdf_from_file(pdf_path, password).map_err(|e| {
            let err_str = format!("{:?}", e);
            if err_str.to_lowercase().contains("password") {
                if password.is_some() {
                    Pdf2TableError::WrongPassword {
                        path: pdf_path.to_path_buf(),
                    }
                } else {
                    Pdf2TableError::PasswordRequired {
                        path: pdf_path.to_path_buf(),
                    }
                }
            } else {
                Pdf2TableError::CorruptPdf {
                    path: pdf_path.to_path_buf(),
                    detail: err_str,
                }
            }
        })?;

        let pages = document.pages();
        let total_pages = pages.len() as usize;
        info!("PDF loaded: {} pages", total_pages);

        // PDF user space is 72 points per inch.
        let render_config = PdfRenderConfig::new().scale_page_by_factor(dpi as f32 / 72.0);

        for (idx, page) in pages.iter().enumerate() {
            let bitmap = page.render_with_config(&render_config).map_err(|e| {
                Pdf2TableError::RasterisationFailed {
                    page: idx + 1,
                    detail: format!("{:?}", e),
                }
            })?;
            on_page(idx, total_pages, bitmap.as_image())?;
        }

        Ok(total_pages)
    }
}

/// Render `pdf_path` into `output_dir` as `page_{n}.png`.
///
/// The directory is created when the first page arrives, so a zero-page
/// document leaves the file system untouched and fails with
/// [`Pdf2TableError::EmptyDocument`].
pub fn render_document<R: PageRasteriser + ?Sized>(
    rasteriser: &R,
    pdf_path: &Path,
    dpi: u32,
    output_dir: &Path,
    progress: Option<&ProgressCallback>,
) -> Result<Vec<PageImage>, Pdf2TableError> {
    let mut saved: Vec<PageImage> = Vec::new();
    let mut dir_ready = false;

    let mut on_page = |idx: usize, total: usize, image: DynamicImage| -> Result<(), Pdf2TableError> {
        if !dir_ready {
            files::ensure_dir(output_dir)?;
            dir_ready = true;
            if let Some(cb) = progress {
                cb.on_stage_start(Stage::Render, total);
            }
        }
        let page_num = idx + 1;
        let path = output_dir.join(files::page_image_name(page_num));

        image
            .save_with_format(&path, ImageFormat::Png)
            .map_err(|e| Pdf2TableError::RasterisationFailed {
                page: page_num,
                detail: format!("saving {}: {}", path.display(), e),
            })?;

        debug!(
            "Rendered page {} → {}x{} px",
            page_num,
            image.width(),
            image.height()
        );
        info!("Saved page {} as {}", page_num, path.display());
        if let Some(cb) = progress {
            cb.on_item_complete(Stage::Render, page_num, total, &path);
        }

        saved.push(PageImage {
            page_num,
            path,
            width: image.width(),
            height: image.height(),
            dpi,
        });
        Ok(())
    };

    let total = rasteriser.rasterise(pdf_path, dpi, &mut on_page)?;

    if total == 0 || saved.is_empty() {
        return Err(Pdf2TableError::EmptyDocument {
            path: pdf_path.to_path_buf(),
        });
    }
    if let Some(cb) = progress {
        cb.on_stage_complete(Stage::Render, total, saved.len());
    }
    Ok(saved)
}

/// Async wrapper running [`render_document`] on the blocking pool.
pub async fn render_to_dir<R>(
    rasteriser: R,
    pdf_path: PathBuf,
    dpi: u32,
    output_dir: PathBuf,
    progress: Option<ProgressCallback>,
) -> Result<Vec<PageImage>, Pdf2TableError>
where
    R: PageRasteriser + Send + 'static,
{
    tokio::task::spawn_blocking(move || {
        render_document(&rasteriser, &pdf_path, dpi, &output_dir, progress.as_ref())
    })
    .await
    .map_err(|e| Pdf2TableError::Internal(format!("Render task panicked: {}", e)))?
}
