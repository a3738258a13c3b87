//! Stage hand-off files: naming, ordering, directory creation.
//!
//! Page images are `page_{n}.png`, responses `response{n}.txt`, tables
//! `response{n}.csv`, with `n` 1-based. Inputs are ordered by the number
//! embedded at the end of the file stem so that `page_10.png` sorts after
//! `page_9.png`; files without a number follow, by name.

use crate::error::Pdf2TableError;
use std::path::{Path, PathBuf};

/// Image extensions the extract stage picks up.
pub const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg"];
/// Response extension the structure stage picks up.
pub const TEXT_EXTENSIONS: &[&str] = &["txt"];

pub fn page_image_name(page_num: usize) -> String {
    format!("page_{page_num}.png")
}

pub fn response_text_name(index: usize) -> String {
    format!("response{index}.txt")
}

/// CSV filename mirroring a response file: same stem, `.csv` extension.
pub fn table_name_for(text_path: &Path) -> String {
    let stem = text_path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "table".to_string());
    format!("{stem}.csv")
}

/// Display name used in logs and item errors.
pub fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// Number at the end of a file stem: `page_12.png` → 12, `response3.txt` → 3.
pub fn stem_index(path: &Path) -> Option<usize> {
    let stem = path.file_stem()?.to_str()?;
    let digits = stem.len() - stem.trim_end_matches(|c: char| c.is_ascii_digit()).len();
    if digits == 0 {
        return None;
    }
    stem[stem.len() - digits..].parse().ok()
}

fn has_extension(path: &Path, extensions: &[&str]) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| extensions.iter().any(|x| x.eq_ignore_ascii_case(e)))
        .unwrap_or(false)
}

/// List regular files in `dir` with one of `extensions`, in stage order.
pub fn list_inputs(dir: &Path, extensions: &[&str]) -> Result<Vec<PathBuf>, Pdf2TableError> {
    let entries = std::fs::read_dir(dir).map_err(|e| Pdf2TableError::DirectoryFailed {
        path: dir.to_path_buf(),
        source: e,
    })?;

    let mut files = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| Pdf2TableError::DirectoryFailed {
            path: dir.to_path_buf(),
            source: e,
        })?;
        let path = entry.path();
        if path.is_file() && has_extension(&path, extensions) {
            files.push(path);
        }
    }

    sort_inputs(&mut files);
    Ok(files)
}

/// Sort by stem index, then by file name.
pub fn sort_inputs(files: &mut [PathBuf]) {
    files.sort_by(|a, b| {
        let ka = (stem_index(a).map_or(1, |_| 0), stem_index(a), a.file_name());
        let kb = (stem_index(b).map_or(1, |_| 0), stem_index(b), b.file_name());
        ka.cmp(&kb)
    });
}

/// Create `dir` and its parents if missing.
pub fn ensure_dir(dir: &Path) -> Result<(), Pdf2TableError> {
    std::fs::create_dir_all(dir).map_err(|e| Pdf2TableError::DirectoryFailed {
        path: dir.to_path_buf(),
        source: e,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn names() {
        assert_eq!(page_image_name(3), "page_3.png");
        assert_eq!(response_text_name(12), "response12.txt");
        assert_eq!(table_name_for(Path::new("out/response4.txt")), "response4.csv");
    }

    #[test]
    fn stem_index_parses_trailing_digits() {
        assert_eq!(stem_index(Path::new("page_12.png")), Some(12));
        assert_eq!(stem_index(Path::new("response3.txt")), Some(3));
        assert_eq!(stem_index(Path::new("scan.png")), None);
        assert_eq!(stem_index(Path::new("2024_report.png")), None);
    }

    #[test]
    fn list_inputs_orders_numerically_and_filters() {
        let dir = TempDir::new().unwrap();
        for name in ["page_10.png", "page_2.png", "page_1.png", "cover.PNG", "notes.md"] {
            std::fs::write(dir.path().join(name), b"x").unwrap();
        }
        std::fs::create_dir(dir.path().join("page_3.png")).unwrap();

        let files = list_inputs(dir.path(), IMAGE_EXTENSIONS).unwrap();
        let names: Vec<String> = files.iter().map(|p| display_name(p)).collect();
        assert_eq!(names, vec!["page_1.png", "page_2.png", "page_10.png", "cover.PNG"]);
    }

    #[test]
    fn list_inputs_missing_dir_is_fatal() {
        let dir = TempDir::new().unwrap();
        let err = list_inputs(&dir.path().join("absent"), TEXT_EXTENSIONS).unwrap_err();
        assert!(matches!(err, Pdf2TableError::DirectoryFailed { .. }));
    }

    #[test]
    fn ensure_dir_creates_nested() {
        let dir = TempDir::new().unwrap();
        let nested = dir.path().join("a/b/c");
        ensure_dir(&nested).unwrap();
        assert!(nested.is_dir());
        ensure_dir(&nested).unwrap();
    }
}
