//! Input resolution: turn the operator-supplied path or URL into a local PDF.
//!
//! pdfium needs a file-system path. URLs are downloaded into a `TempDir`
//! owned by the returned [`ResolvedInput`], so the file lives exactly as long
//! as the render stage needs it. Both branches check the `%PDF` magic bytes
//! before handing the file to pdfium.

use crate::error::Pdf2TableError;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tempfile::TempDir;
use tracing::{debug, info};

const PDF_MAGIC: &[u8; 4] = b"%PDF";

/// The resolved input: a local path or a downloaded temp file.
#[derive(Debug)]
pub enum ResolvedInput {
    Local(PathBuf),
    /// The `TempDir` is dropped (and the file deleted) with this value.
    Downloaded { path: PathBuf, _temp_dir: TempDir },
}

impl ResolvedInput {
    pub fn path(&self) -> &Path {
        match self {
            ResolvedInput::Local(p) => p,
            ResolvedInput::Downloaded { path, .. } => path,
        }
    }
}

pub fn is_url(input: &str) -> bool {
    input.starts_with("http://") || input.starts_with("https://")
}

/// Resolve the input string to a local PDF file.
pub async fn resolve_input(input: &str, timeout_secs: u64) -> Result<ResolvedInput, Pdf2TableError> {
    let input = input.trim();
    if input.is_empty() {
        return Err(Pdf2TableError::InvalidInput {
            input: input.to_string(),
        });
    }
    if is_url(input) {
        download_url(input, timeout_secs).await
    } else {
        resolve_local(Path::new(input))
    }
}

fn resolve_local(path: &Path) -> Result<ResolvedInput, Pdf2TableError> {
    let path = path.to_path_buf();
    if !path.is_file() {
        return Err(Pdf2TableError::FileNotFound { path });
    }

    let mut file = std::fs::File::open(&path).map_err(|e| match e.kind() {
        std::io::ErrorKind::PermissionDenied => Pdf2TableError::PermissionDenied { path: path.clone() },
        _ => Pdf2TableError::FileNotFound { path: path.clone() },
    })?;

    let mut head = [0u8; 4];
    // Files shorter than four bytes are left for pdfium to reject.
    if file.read_exact(&mut head).is_ok() {
        check_magic(&path, &head)?;
    }

    debug!("Resolved local PDF: {}", path.display());
    Ok(ResolvedInput::Local(path))
}

fn check_magic(path: &Path, head: &[u8]) -> Result<(), Pdf2TableError> {
    if head.len() >= 4 && &head[..4] != PDF_MAGIC {
        let mut magic = [0u8; 4];
        magic.copy_from_slice(&head[..4]);
        return Err(Pdf2TableError::NotAPdf {
            path: path.to_path_buf(),
            magic,
        });
    }
    Ok(())
}

async fn download_url(url: &str, timeout_secs: u64) -> Result<ResolvedInput, Pdf2TableError> {
    info!("Downloading PDF from: {}", url);
    let failed = |reason: String| Pdf2TableError::DownloadFailed {
        url: url.to_string(),
        reason,
    };

    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .build()
        .map_err(|e| failed(e.to_string()))?;

    let response = client.get(url).send().await.map_err(|e| {
        if e.is_timeout() {
            Pdf2TableError::DownloadTimeout {
                url: url.to_string(),
                secs: timeout_secs,
            }
        } else {
            failed(e.to_string())
        }
    })?;

    if !response.status().is_success() {
        return Err(failed(format!("HTTP {}", response.status())));
    }

    let bytes = response.bytes().await.map_err(|e| failed(e.to_string()))?;

    let temp_dir = TempDir::new().map_err(|e| Pdf2TableError::Internal(e.to_string()))?;
    let path = temp_dir.path().join(filename_from_url(url));
    check_magic(&path, &bytes)?;

    tokio::fs::write(&path, &bytes)
        .await
        .map_err(|e| Pdf2TableError::Internal(format!("Failed to write temp file: {e}")))?;

    info!("Downloaded {} bytes to: {}", bytes.len(), path.display());
    Ok(ResolvedInput::Downloaded {
        path,
        _temp_dir: temp_dir,
    })
}

/// Last path segment of the URL if it looks like a filename, else `downloaded.pdf`.
fn filename_from_url(url: &str) -> String {
    reqwest::Url::parse(url)
        .ok()
        .and_then(|u| {
            u.path_segments()
                .and_then(|mut s| s.next_back().map(str::to_string))
        })
        .filter(|last| !last.is_empty() && last.contains('.'))
        .unwrap_or_else(|| "downloaded.pdf".to_string())
}
