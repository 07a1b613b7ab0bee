//! Persistence Queue
//!
//! Buffered writer for follow-up inserts and deletes. Each buffer is flushed to the store as one
//! bulk operation once it reaches its threshold; at most `max_concurrent_writes` bulk operations
//! are in flight, and producers wait for a free slot before handing off a full buffer.

use crate::error::ApiError;
use crate::model::FollowUp;
use crate::store::FollowUpStore;
use crate::types::FollowUpId;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::{Mutex as AsyncMutex, Semaphore};
use tokio::task::{JoinError, JoinSet};
use tracing::{debug, error, info};

/// Configuration for the persistence queue
#[derive(Debug, Clone)]
pub struct QueueConfig {
    /// Buffered inserts that trigger one bulk insert
    pub insert_flush_threshold: usize,
    /// Buffered deletes that trigger one bulk delete; bounded by the store's id-set clause limit
    pub delete_flush_threshold: usize,
    /// Bulk operations allowed in flight at once
    pub max_concurrent_writes: usize,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            insert_flush_threshold: 100_000,
            delete_flush_threshold: 900,
            max_concurrent_writes: 10,
        }
    }
}

/// Committed totals once the queue is idle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QueueTotals {
    pub inserted: usize,
    pub deleted: usize,
}

#[derive(Default)]
struct Buffers {
    inserts: Vec<FollowUp>,
    deletes: Vec<FollowUpId>,
}

pub struct PersistenceQueue {
    store: Arc<dyn FollowUpStore>,
    config: QueueConfig,
    buffers: Mutex<Buffers>,
    permits: Arc<Semaphore>,
    tasks: AsyncMutex<JoinSet<Result<(), ApiError>>>,
    inserted: Arc<AtomicUsize>,
    deleted: Arc<AtomicUsize>,
    flushes: AtomicUsize,
}

impl PersistenceQueue {
    pub fn new(store: Arc<dyn FollowUpStore>, config: QueueConfig) -> Self {
        let max_concurrent = config.max_concurrent_writes.max(1);
        Self {
            store,
            config,
            buffers: Mutex::new(Buffers::default()),
            permits: Arc::new(Semaphore::new(max_concurrent)),
            tasks: AsyncMutex::new(JoinSet::new()),
            inserted: Arc::new(AtomicUsize::new(0)),
            deleted: Arc::new(AtomicUsize::new(0)),
            flushes: AtomicUsize::new(0),
        }
    }

    /// Rows committed by completed insert tasks.
    pub fn inserted_count(&self) -> usize {
        self.inserted.load(Ordering::SeqCst)
    }

    /// Rows removed by completed delete tasks.
    pub fn deleted_count(&self) -> usize {
        self.deleted.load(Ordering::SeqCst)
    }

    /// Bulk operations handed to the task runner so far.
    pub fn flush_count(&self) -> usize {
        self.flushes.load(Ordering::SeqCst)
    }

    pub fn totals(&self) -> QueueTotals {
        QueueTotals {
            inserted: self.inserted_count(),
            deleted: self.deleted_count(),
        }
    }

    pub async fn enqueue_insert(&self, items: Vec<FollowUp>) -> Result<(), ApiError> {
        self.reap_finished().await?;
        if items.is_empty() {
            return Ok(());
        }
        let threshold = self.config.insert_flush_threshold.max(1);
        let full = {
            let mut buffers = self.buffers.lock();
            buffers.inserts.extend(items);
            take_full_chunks(&mut buffers.inserts, threshold)
        };
        for chunk in full {
            self.spawn_insert(chunk).await?;
        }
        Ok(())
    }

    pub async fn enqueue_delete(&self, ids: Vec<FollowUpId>) -> Result<(), ApiError> {
        self.reap_finished().await?;
        if ids.is_empty() {
            return Ok(());
        }
        let threshold = self.config.delete_flush_threshold.max(1);
        let full = {
            let mut buffers = self.buffers.lock();
            buffers.deletes.extend(ids);
            take_full_chunks(&mut buffers.deletes, threshold)
        };
        for chunk in full {
            self.spawn_delete(chunk).await?;
        }
        Ok(())
    }

    /// Flush whatever is still buffered and wait until every task has finished.
    /// Returns the first task failure, after all tasks have settled.
    pub async fn drain_remaining(&self) -> Result<QueueTotals, ApiError> {
        let (inserts, deletes) = {
            let mut buffers = self.buffers.lock();
            (
                std::mem::take(&mut buffers.inserts),
                std::mem::take(&mut buffers.deletes),
            )
        };
        let handoff = async {
            if !inserts.is_empty() {
                self.spawn_insert(inserts).await?;
            }
            if !deletes.is_empty() {
                self.spawn_delete(deletes).await?;
            }
            Ok::<(), ApiError>(())
        }
        .await;
        let settled = self.wait_idle().await;
        handoff?;
        settled?;
        let totals = self.totals();
        info!(
            inserted = totals.inserted,
            deleted = totals.deleted,
            flushes = self.flush_count(),
            "Persistence queue drained"
        );
        Ok(totals)
    }

    /// Drop anything still buffered and wait for in-flight tasks, so the committed totals are
    /// final. Task failures are logged, not returned.
    pub async fn abandon(&self) -> QueueTotals {
        let dropped = {
            let mut buffers = self.buffers.lock();
            let dropped = buffers.inserts.len() + buffers.deletes.len();
            buffers.inserts.clear();
            buffers.deletes.clear();
            dropped
        };
        if let Err(err) = self.wait_idle().await {
            error!(error = %err, "Persistence task failed while abandoning queue");
        }
        let totals = self.totals();
        info!(
            dropped,
            inserted = totals.inserted,
            deleted = totals.deleted,
            "Persistence queue abandoned"
        );
        totals
    }

    async fn spawn_insert(&self, chunk: Vec<FollowUp>) -> Result<(), ApiError> {
        let permit = Arc::clone(&self.permits)
            .acquire_owned()
            .await
            .map_err(|_| ApiError::TaskFailed("Write semaphore closed".to_string()))?;
        let store = Arc::clone(&self.store);
        let inserted = Arc::clone(&self.inserted);
        let size = chunk.len();
        self.flushes.fetch_add(1, Ordering::SeqCst);
        debug!(size, "Flushing insert buffer");
        self.tasks.lock().await.spawn(async move {
            let _permit = permit;
            let written = store.bulk_insert(chunk).await?;
            inserted.fetch_add(written, Ordering::SeqCst);
            Ok(())
        });
        Ok(())
    }

    async fn spawn_delete(&self, chunk: Vec<FollowUpId>) -> Result<(), ApiError> {
        let permit = Arc::clone(&self.permits)
            .acquire_owned()
            .await
            .map_err(|_| ApiError::TaskFailed("Write semaphore closed".to_string()))?;
        let store = Arc::clone(&self.store);
        let deleted = Arc::clone(&self.deleted);
        let size = chunk.len();
        self.flushes.fetch_add(1, Ordering::SeqCst);
        debug!(size, "Flushing delete buffer");
        self.tasks.lock().await.spawn(async move {
            let _permit = permit;
            let removed = store.bulk_delete_by_ids(&chunk).await?;
            deleted.fetch_add(removed, Ordering::SeqCst);
            Ok(())
        });
        Ok(())
    }

    /// Surface failures of tasks that already finished without waiting on running ones.
    async fn reap_finished(&self) -> Result<(), ApiError> {
        let mut tasks = self.tasks.lock().await;
        while let Some(joined) = tasks.try_join_next() {
            flatten(joined)?;
        }
        Ok(())
    }

    async fn wait_idle(&self) -> Result<(), ApiError> {
        let mut tasks = self.tasks.lock().await;
        let mut first_failure = None;
        while let Some(joined) = tasks.join_next().await {
            if let Err(err) = flatten(joined) {
                error!(error = %err, "Persistence task failed");
                first_failure.get_or_insert(err);
            }
        }
        first_failure.map_or(Ok(()), Err)
    }
}

fn flatten(joined: Result<Result<(), ApiError>, JoinError>) -> Result<(), ApiError> {
    joined.map_err(|e| ApiError::TaskFailed(format!("Persistence task panicked: {}", e)))?
}

fn take_full_chunks<T>(buffer: &mut Vec<T>, threshold: usize) -> Vec<Vec<T>> {
    let mut chunks = Vec::new();
    while buffer.len() >= threshold {
        let rest = buffer.split_off(threshold);
        chunks.push(std::mem::replace(buffer, rest));
    }
    chunks
}
