//! Artefacts and reports produced by the pipeline stages.

use crate::error::ItemError;
use crate::progress::Stage;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// One rendered page, saved to disk by the render stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageImage {
    /// 1-indexed page number.
    pub page_num: usize,
    pub path: PathBuf,
    pub width: u32,
    pub height: u32,
    pub dpi: u32,
}

/// The raw model response for one page image, saved to disk verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractionResult {
    /// 1-indexed sequential position of the source image.
    pub index: usize,
    pub source: PathBuf,
    pub path: PathBuf,
    /// Byte length of the stored response. Zero when the model returned no choices.
    pub text_len: usize,
    pub input_tokens: u64,
    pub output_tokens: u64,
    pub duration_ms: u64,
}

/// One CSV file written by the structure stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableFile {
    pub source: PathBuf,
    pub path: PathBuf,
    pub columns: Vec<String>,
    pub rows: usize,
}

/// Outcome of processing one item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemResult<T> {
    /// 1-indexed position of the item within its stage.
    pub index: usize,
    /// Input file of the item.
    pub source: PathBuf,
    pub outcome: Result<T, ItemError>,
}

impl<T> ItemResult<T> {
    pub fn is_ok(&self) -> bool {
        self.outcome.is_ok()
    }
}

/// Ordered per-item outcomes of one stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageReport<T> {
    pub stage: Stage,
    pub items: Vec<ItemResult<T>>,
    pub duration_ms: u64,
}

impl<T> StageReport<T> {
    pub fn new(stage: Stage) -> Self {
        Self {
            stage,
            items: Vec::new(),
            duration_ms: 0,
        }
    }

    pub fn total(&self) -> usize {
        self.items.len()
    }

    pub fn succeeded(&self) -> usize {
        self.items.iter().filter(|i| i.is_ok()).count()
    }

    pub fn failed(&self) -> usize {
        self.total() - self.succeeded()
    }

    /// Values of the items that succeeded, in stage order.
    pub fn outputs(&self) -> impl Iterator<Item = &T> {
        self.items.iter().filter_map(|i| i.outcome.as_ref().ok())
    }

    /// Errors of the items that failed, in stage order.
    pub fn errors(&self) -> impl Iterator<Item = &ItemError> {
        self.items.iter().filter_map(|i| i.outcome.as_ref().err())
    }
}

impl StageReport<ExtractionResult> {
    pub fn total_input_tokens(&self) -> u64 {
        self.outputs().map(|r| r.input_tokens).sum()
    }

    pub fn total_output_tokens(&self) -> u64 {
        self.outputs().map(|r| r.output_tokens).sum()
    }
}

/// Reports of a full render → extract → structure run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineReport {
    pub pages: Vec<PageImage>,
    pub render_duration_ms: u64,
    pub extraction: StageReport<ExtractionResult>,
    pub structuring: StageReport<TableFile>,
    pub total_duration_ms: u64,
}

impl PipelineReport {
    /// True when every extracted page produced a CSV file.
    pub fn is_complete(&self) -> bool {
        self.extraction.failed() == 0
            && self.structuring.failed() == 0
            && self.structuring.succeeded() == self.pages.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(index: usize, ok: bool) -> ItemResult<TableFile> {
        let source = PathBuf::from(format!("response{index}.txt"));
        let outcome = if ok {
            Ok(TableFile {
                source: source.clone(),
                path: PathBuf::from(format!("response{index}.csv")),
                columns: vec!["a".into()],
                rows: 1,
            })
        } else {
            Err(ItemError::Unparseable {
                file: format!("response{index}.txt"),
                detail: "expected value".into(),
            })
        };
        ItemResult {
            index,
            source,
            outcome,
        }
    }

    #[test]
    fn report_counts() {
        let mut report = StageReport::new(Stage::Structure);
        report.items.push(item(1, true));
        report.items.push(item(2, false));
        report.items.push(item(3, true));

        assert_eq!(report.total(), 3);
        assert_eq!(report.succeeded(), 2);
        assert_eq!(report.failed(), 1);
        assert_eq!(report.errors().next().unwrap().file(), "response2.txt");
        let csvs: Vec<_> = report.outputs().map(|t| t.path.clone()).collect();
        assert_eq!(
            csvs,
            vec![PathBuf::from("response1.csv"), PathBuf::from("response3.csv")]
        );
    }

    #[test]
    fn token_totals_skip_failures() {
        let mut report = StageReport::new(Stage::Extract);
        for (i, tokens) in [(1, 10u64), (2, 32)] {
            report.items.push(ItemResult {
                index: i,
                source: PathBuf::from(format!("page_{i}.png")),
                outcome: Ok(ExtractionResult {
                    index: i,
                    source: PathBuf::from(format!("page_{i}.png")),
                    path: PathBuf::from(format!("response{i}.txt")),
                    text_len: 5,
                    input_tokens: tokens,
                    output_tokens: tokens / 2,
                    duration_ms: 1,
                }),
            });
        }
        report.items.push(ItemResult {
            index: 3,
            source: PathBuf::from("page_3.png"),
            outcome: Err(ItemError::ServiceFailed {
                file: "page_3.png".into(),
                detail: "401".into(),
            }),
        });

        assert_eq!(report.total_input_tokens(), 42);
        assert_eq!(report.total_output_tokens(), 21);
    }
}
