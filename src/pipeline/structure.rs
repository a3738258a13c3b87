//! Structure stage: raw model responses → CSV files.
//!
//! Each `response{n}.txt` is parsed independently; a response that holds no
//! usable JSON is logged with its filename and the parse error, and no CSV
//! is written for it. Output is fully determined by the input text, so
//! re-running the stage rewrites identical files.

use crate::error::{ItemError, Pdf2TableError};
use crate::output::{ItemResult, StageReport, TableFile};
use crate::pipeline::files::{self, TEXT_EXTENSIONS};
use crate::pipeline::parse::{self, PayloadSource};
use crate::pipeline::table::RecordSet;
use crate::progress::{ProgressCallback, Stage};
use std::path::Path;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Convert every response in `text_dir` into a CSV in `output_dir`.
///
/// # Errors
/// Only fatal conditions: `text_dir` cannot be listed or `output_dir`
/// cannot be created.
pub fn structure_tables(
    text_dir: &Path,
    output_dir: &Path,
    progress: Option<&ProgressCallback>,
) -> Result<StageReport<TableFile>, Pdf2TableError> {
    let start = Instant::now();
    let texts = files::list_inputs(text_dir, TEXT_EXTENSIONS)?;
    files::ensure_dir(output_dir)?;

    let total = texts.len();
    info!("Structuring {} responses from {}", total, text_dir.display());
    if let Some(cb) = progress {
        cb.on_stage_start(Stage::Structure, total);
    }

    let mut report = StageReport::new(Stage::Structure);
    for (pos, text_path) in texts.into_iter().enumerate() {
        let index = pos + 1;
        let outcome = structure_one(&text_path, output_dir);

        match outcome {
            Ok(ref table) => {
                if let Some(cb) = progress {
                    cb.on_item_complete(Stage::Structure, index, total, &table.path);
                }
            }
            Err(ref e) => {
                warn!("Error processing {}", e);
                if let Some(cb) = progress {
                    cb.on_item_error(Stage::Structure, index, total, &e.to_string());
                }
            }
        }

        report.items.push(ItemResult {
            index,
            source: text_path,
            outcome,
        });
    }

    report.duration_ms = start.elapsed().as_millis() as u64;
    info!(
        "Structuring complete: {}/{} CSV files in {}",
        report.succeeded(),
        total,
        output_dir.display()
    );
    if let Some(cb) = progress {
        cb.on_stage_complete(Stage::Structure, total, report.succeeded());
    }
    Ok(report)
}

fn structure_one(text_path: &Path, output_dir: &Path) -> Result<TableFile, ItemError> {
    let name = files::display_name(text_path);

    let raw = std::fs::read_to_string(text_path).map_err(|e| ItemError::ReadFailed {
        file: name.clone(),
        detail: e.to_string(),
    })?;

    let payload = parse::parse_payload(&raw).map_err(|e| ItemError::Unparseable {
        file: name.clone(),
        detail: e.to_string(),
    })?;
    if payload.source != PayloadSource::Direct {
        debug!("{}: JSON located via {:?} match", name, payload.source);
    }

    let records = RecordSet::from_json(&payload.value).map_err(|e| ItemError::NotTabular {
        file: name.clone(),
        detail: e.to_string(),
    })?;

    let out_path = output_dir.join(files::table_name_for(text_path));
    records
        .write_csv_file(&out_path)
        .map_err(|e| ItemError::WriteFailed {
            file: files::display_name(&out_path),
            detail: e.to_string(),
        })?;
    info!("Saved CSV file: {}", out_path.display());

    Ok(TableFile {
        source: text_path.to_path_buf(),
        path: out_path,
        columns: records.columns,
        rows: records.rows.len(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn setup(files: &[(&str, &str)]) -> (TempDir, std::path::PathBuf, std::path::PathBuf) {
        let tmp = TempDir::new().unwrap();
        let texts = tmp.path().join("texts");
        let tables = tmp.path().join("tables");
        std::fs::create_dir_all(&texts).unwrap();
        for (name, body) in files {
            std::fs::write(texts.join(name), body).unwrap();
        }
        (tmp, texts, tables)
    }

    #[test]
    fn fenced_response_becomes_csv() {
        let body = ["```json", r#"[{"a":1,"b":2}]"#, "```"].join("\n");
        let (_tmp, texts, tables) = setup(&[("response1.txt", body.as_str())]);

        let report = structure_tables(&texts, &tables, None).unwrap();

        assert_eq!(report.succeeded(), 1);
        let csv = std::fs::read_to_string(tables.join("response1.csv")).unwrap();
        assert_eq!(csv, "a,b\n1,2\n");
        let table = report.outputs().next().unwrap();
        assert_eq!(table.columns, vec!["a", "b"]);
        assert_eq!(table.rows, 1);
    }

    #[test]
    fn bad_response_is_skipped_and_batch_continues() {
        let (_tmp, texts, tables) = setup(&[
            ("response1.txt", "Not a table"),
            ("response2.txt", r#"[{"x": "y"}]"#),
            ("response3.txt", "\"Not a table\""),
        ]);

        let report = structure_tables(&texts, &tables, None).unwrap();

        assert_eq!(report.succeeded(), 1);
        assert_eq!(report.failed(), 2);
        assert!(!tables.join("response1.csv").exists());
        assert!(tables.join("response2.csv").is_file());
        assert!(!tables.join("response3.csv").exists());

        let errors: Vec<&ItemError> = report.errors().collect();
        assert!(matches!(errors[0], ItemError::Unparseable { file, .. } if file == "response1.txt"));
        assert!(matches!(errors[1], ItemError::NotTabular { file, .. } if file == "response3.txt"));
    }

    #[test]
    fn rerun_is_byte_identical() {
        let (_tmp, texts, tables) = setup(&[
            ("response1.txt", r#"[{"q": "1,5", "r": null}]"#),
            ("response2.txt", r#"{"col": [1, 2, 3]}"#),
        ]);

        structure_tables(&texts, &tables, None).unwrap();
        let first: Vec<Vec<u8>> = ["response1.csv", "response2.csv"]
            .iter()
            .map(|n| std::fs::read(tables.join(n)).unwrap())
            .collect();

        structure_tables(&texts, &tables, None).unwrap();
        let second: Vec<Vec<u8>> = ["response1.csv", "response2.csv"]
            .iter()
            .map(|n| std::fs::read(tables.join(n)).unwrap())
            .collect();

        assert_eq!(first, second);
    }

    #[test]
    fn empty_objects_report_zero_rows() {
        let (_tmp, texts, tables) = setup(&[("response1.txt", "[{}, {}]")]);
        let report = structure_tables(&texts, &tables, None).unwrap();

        let table = report.outputs().next().unwrap();
        assert!(table.columns.is_empty());
        assert_eq!(table.rows, 0);
        assert_eq!(std::fs::read(tables.join("response1.csv")).unwrap(), b"");
    }

    #[test]
    fn non_text_files_are_ignored() {
        let (_tmp, texts, tables) = setup(&[("response1.txt", "[]"), ("notes.json", "[1]")]);
        let report = structure_tables(&texts, &tables, None).unwrap();
        assert_eq!(report.total(), 1);
        assert_eq!(std::fs::read(tables.join("response1.csv")).unwrap(), b"");
    }
}
