//! Batch Orchestrator
//!
//! Generic paged driver: counts the work, fetches it one page at a time, and applies an optional
//! whole-page action and an optional per-item action with bounded parallelism. Pages are strictly
//! sequential; page N+1 is not fetched before page N has settled.

use crate::error::ApiError;
use crate::progress::{PageProgress, ProgressSink};
use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use std::time::Instant;
use tracing::{debug, info};

#[async_trait]
pub trait PageSource<T: Send>: Send + Sync {
    async fn total_count(&self) -> Result<usize, ApiError>;

    async fn fetch_page(&self, page_no: usize, page_size: usize) -> Result<Vec<T>, ApiError>;
}

/// Runs once per page with the whole page.
#[async_trait]
pub trait PageAction<T: Send + Sync>: Send + Sync {
    async fn run_page(&self, page_no: usize, items: &[T]) -> Result<(), ApiError>;
}

/// Runs once per item; items of a page run concurrently in no particular order.
#[async_trait]
pub trait ItemAction<T: Send + Sync>: Send + Sync {
    async fn run_item(&self, item: &T) -> Result<(), ApiError>;
}

pub struct BatchActions<'a, T> {
    pub whole_page: Option<&'a dyn PageAction<T>>,
    pub per_item: Option<&'a dyn ItemAction<T>>,
}

impl<'a, T> BatchActions<'a, T> {
    pub fn whole_page(action: &'a dyn PageAction<T>) -> Self {
        Self {
            whole_page: Some(action),
            per_item: None,
        }
    }

    pub fn per_item(action: &'a dyn ItemAction<T>) -> Self {
        Self {
            whole_page: None,
            per_item: Some(action),
        }
    }
}

#[derive(Debug, Clone)]
pub struct BatchConfig {
    pub page_size: usize,
    /// Cap on per-item actions in flight within one page
    pub per_item_concurrency: usize,
    /// First page to process; earlier pages are skipped (externally managed resume)
    pub start_page: usize,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            page_size: 1000,
            per_item_concurrency: 10,
            start_page: 0,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchSummary {
    pub total_count: usize,
    pub total_pages: usize,
    pub pages_processed: usize,
    pub items_processed: usize,
}

pub struct BatchOrchestrator {
    job: String,
    config: BatchConfig,
}

impl BatchOrchestrator {
    pub fn new(job: impl Into<String>, config: BatchConfig) -> Self {
        Self {
            job: job.into(),
            config,
        }
    }

    pub fn config(&self) -> &BatchConfig {
        &self.config
    }

    pub async fn run<T: Send + Sync>(
        &self,
        source: &dyn PageSource<T>,
        actions: BatchActions<'_, T>,
        progress: &dyn ProgressSink,
    ) -> Result<BatchSummary, ApiError> {
        if self.config.page_size == 0 {
            return Err(ApiError::ConfigError(format!(
                "Batch job '{}' requires a positive page size",
                self.job
            )));
        }
        let page_size = self.config.page_size;
        let concurrency = self.config.per_item_concurrency.max(1);

        let total_count = source.total_count().await?;
        let total_pages = total_count.div_ceil(page_size);
        let mut summary = BatchSummary {
            total_count,
            total_pages,
            ..BatchSummary::default()
        };
        if total_count == 0 {
            info!(job = %self.job, "Nothing to process");
            return Ok(summary);
        }
        info!(
            job = %self.job,
            total = total_count,
            total_pages,
            page_size,
            start_page = self.config.start_page,
            "Batch started"
        );

        let mut page_no = self.config.start_page;
        while page_no.saturating_mul(page_size) < total_count {
            let fetch_started = Instant::now();
            let items = source.fetch_page(page_no, page_size).await?;
            let fetch_ms = fetch_started.elapsed().as_millis();
            if items.is_empty() {
                debug!(job = %self.job, page = page_no, "Source returned an empty page");
                page_no += 1;
                continue;
            }

            let page_started = Instant::now();
            if let Some(action) = actions.whole_page {
                action.run_page(page_no, &items).await?;
            }
            let page_action_ms = page_started.elapsed().as_millis();

            let items_started = Instant::now();
            if let Some(action) = actions.per_item {
                let mut pending = stream::iter(items.iter().map(|item| action.run_item(item)))
                    .buffer_unordered(concurrency);
                while let Some(outcome) = pending.next().await {
                    outcome?;
                }
            }
            let item_action_ms = items_started.elapsed().as_millis();

            summary.pages_processed += 1;
            summary.items_processed += items.len();
            info!(
                job = %self.job,
                page = page_no + 1,
                total_pages,
                items = items.len(),
                fetch_ms,
                page_action_ms,
                item_action_ms,
                "Batch page processed"
            );
            progress.on_page(&PageProgress {
                job: self.job.clone(),
                page_no,
                total_pages,
                items_processed: summary.items_processed,
                total_count,
            });
            page_no += 1;
        }

        Ok(summary)
    }
}
