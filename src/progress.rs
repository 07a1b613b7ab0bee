//! Progress reporting for paged batch runs.

use parking_lot::Mutex;
use tracing::info;

/// Snapshot emitted after each settled page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageProgress {
    pub job: String,
    pub page_no: usize,
    pub total_pages: usize,
    pub items_processed: usize,
    pub total_count: usize,
}

pub trait ProgressSink: Send + Sync {
    fn on_page(&self, progress: &PageProgress);
}

/// Discards progress.
#[derive(Debug, Default)]
pub struct NoopProgress;

impl ProgressSink for NoopProgress {
    fn on_page(&self, _progress: &PageProgress) {}
}

/// Emits one `info` event per page.
#[derive(Debug, Default)]
pub struct TracingProgress;

impl ProgressSink for TracingProgress {
    fn on_page(&self, progress: &PageProgress) {
        info!(
            job = %progress.job,
            page = progress.page_no + 1,
            total_pages = progress.total_pages,
            processed = progress.items_processed,
            total = progress.total_count,
            "Batch progress"
        );
    }
}

/// Keeps every snapshot; used by tests and by callers that report progress afterwards.
#[derive(Debug, Default)]
pub struct RecordingProgress {
    pages: Mutex<Vec<PageProgress>>,
}

impl RecordingProgress {
    pub fn pages(&self) -> Vec<PageProgress> {
        self.pages.lock().clone()
    }
}

impl ProgressSink for RecordingProgress {
    fn on_page(&self, progress: &PageProgress) {
        self.pages.lock().push(progress.clone());
    }
}
