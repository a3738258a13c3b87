//! Progress-callback trait for per-stage and per-item pipeline events.
//!
//! Inject an [`Arc<dyn PipelineProgressCallback>`] via
//! [`crate::config::PipelineConfigBuilder::progress_callback`] to receive
//! events as each stage renders pages, extracts responses, and writes CSVs.
//! The renderer fires `on_item_complete` once per page image saved.
//!
//! # Example
//!
//! ```rust
//! use edgequake_pdf2table::{PipelineConfig, PipelineProgressCallback, Stage};
//! use std::path::Path;
//! use std::sync::{Arc, atomic::{AtomicUsize, Ordering}};
//!
//! struct CountingCallback {
//!     saved: AtomicUsize,
//! }
//!
//! impl PipelineProgressCallback for CountingCallback {
//!     fn on_item_complete(&self, stage: Stage, index: usize, total: usize, path: &Path) {
//!         self.saved.fetch_add(1, Ordering::SeqCst);
//!         eprintln!("[{stage}] {index}/{total} → {}", path.display());
//!     }
//! }
//!
//! let config = PipelineConfig::builder()
//!     .progress_callback(Arc::new(CountingCallback { saved: AtomicUsize::new(0) }))
//!     .build()
//!     .unwrap();
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::sync::Arc;

/// The three pipeline stages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Stage {
    /// PDF → page images.
    Render,
    /// Page images → raw model responses.
    Extract,
    /// Raw responses → CSV files.
    Structure,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(match self {
            Stage::Render => "render",
            Stage::Extract => "extract",
            Stage::Structure => "structure",
        })
    }
}

/// Called by the pipeline as it processes each item of each stage.
///
/// All methods have default no-op implementations so callers only override
/// what they care about. Items are processed one at a time, but the trait is
/// `Send + Sync` because the render stage runs on a blocking thread.
pub trait PipelineProgressCallback: Send + Sync {
    /// Called once a stage knows how many items it will process.
    fn on_stage_start(&self, stage: Stage, total: usize) {
        let _ = (stage, total);
    }

    /// Called when an item's output file has been written.
    ///
    /// # Arguments
    /// * `index`  - 1-indexed position of the item within the stage
    /// * `total`  - number of items in the stage
    /// * `output` - path of the file just written
    fn on_item_complete(&self, stage: Stage, index: usize, total: usize, output: &Path) {
        let _ = (stage, index, total, output);
    }

    /// Called when an item is skipped because of an error.
    fn on_item_error(&self, stage: Stage, index: usize, total: usize, error: &str) {
        let _ = (stage, index, total, error);
    }

    /// Called once after every item of the stage has been attempted.
    fn on_stage_complete(&self, stage: Stage, total: usize, succeeded: usize) {
        let _ = (stage, total, succeeded);
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl PipelineProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::PipelineConfig`].
pub type ProgressCallback = Arc<dyn PipelineProgressCallback>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingCallback {
        events: Mutex<Vec<String>>,
    }

    impl PipelineProgressCallback for RecordingCallback {
        fn on_stage_start(&self, stage: Stage, total: usize) {
            self.events.lock().unwrap().push(format!("start {stage} {total}"));
        }

        fn on_item_complete(&self, stage: Stage, index: usize, _total: usize, output: &Path) {
            self.events
                .lock()
                .unwrap()
                .push(format!("done {stage} {index} {}", output.display()));
        }

        fn on_item_error(&self, stage: Stage, index: usize, _total: usize, error: &str) {
            self.events
                .lock()
                .unwrap()
                .push(format!("fail {stage} {index} {error}"));
        }

        fn on_stage_complete(&self, stage: Stage, total: usize, succeeded: usize) {
            self.events
                .lock()
                .unwrap()
                .push(format!("end {stage} {succeeded}/{total}"));
        }
    }

    #[test]
    fn noop_callback_does_not_panic() {
        let cb = NoopProgressCallback;
        cb.on_stage_start(Stage::Render, 2);
        cb.on_item_complete(Stage::Render, 1, 2, Path::new("page_1.png"));
        cb.on_item_error(Stage::Extract, 2, 2, "boom");
        cb.on_stage_complete(Stage::Structure, 2, 1);
    }

    #[test]
    fn recording_callback_receives_events_in_order() {
        let cb = RecordingCallback::default();
        cb.on_stage_start(Stage::Extract, 2);
        cb.on_item_complete(Stage::Extract, 1, 2, Path::new("response1.txt"));
        cb.on_item_error(Stage::Extract, 2, 2, "timeout");
        cb.on_stage_complete(Stage::Extract, 2, 1);

        let events = cb.events.lock().unwrap();
        assert_eq!(
            *events,
            vec![
                "start extract 2",
                "done extract 1 response1.txt",
                "fail extract 2 timeout",
                "end extract 1/2",
            ]
        );
    }

    #[test]
    fn stage_display() {
        assert_eq!(Stage::Render.to_string(), "render");
        assert_eq!(Stage::Structure.to_string(), "structure");
    }
}
