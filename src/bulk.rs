//! Bulk modification of follow-ups.
//!
//! The matching ids are captured up front so that a patch touching a filtered attribute cannot
//! shift later pages. Each record is then patched on its own so per-record update behavior runs.

use crate::batch::{BatchActions, BatchConfig, BatchOrchestrator, ItemAction, PageSource};
use crate::clock::Clock;
use crate::error::{ApiError, InvalidField};
use crate::model::{FollowUp, FollowUpFilter, FollowUpPatch};
use crate::progress::ProgressSink;
use crate::store::FollowUpStore;
use crate::types::FollowUpId;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tracing::{error, info};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BulkModifyResponse {
    pub count: usize,
}

pub struct BulkModifier {
    follow_ups: Arc<dyn FollowUpStore>,
    clock: Arc<dyn Clock>,
    config: BatchConfig,
    progress: Arc<dyn ProgressSink>,
}

impl BulkModifier {
    pub fn new(
        follow_ups: Arc<dyn FollowUpStore>,
        clock: Arc<dyn Clock>,
        config: BatchConfig,
        progress: Arc<dyn ProgressSink>,
    ) -> Self {
        Self {
            follow_ups,
            clock,
            config,
            progress,
        }
    }

    pub async fn bulk_modify_follow_ups(
        &self,
        filter: &FollowUpFilter,
        patch: &FollowUpPatch,
    ) -> Result<BulkModifyResponse, ApiError> {
        let mut invalid = Vec::new();
        if filter.outbreak_id.trim().is_empty() {
            invalid.push(InvalidField::new("outbreak_id", "must not be empty"));
        }
        if patch.is_empty() {
            invalid.push(InvalidField::new("patch", "sets no attribute"));
        }
        if !invalid.is_empty() {
            return Err(ApiError::InvalidParameters(invalid));
        }

        let ids = self.follow_ups.find_ids_matching(filter).await?;
        info!(outbreak_id = %filter.outbreak_id, matched = ids.len(), "Bulk modification started");

        let source = IdSnapshot {
            store: Arc::clone(&self.follow_ups),
            ids,
        };
        let action = ApplyPatch {
            store: Arc::clone(&self.follow_ups),
            patch,
            now: self.clock.now(),
            updated: AtomicUsize::new(0),
        };
        let orchestrator = BatchOrchestrator::new("bulk_modify_follow_ups", self.config.clone());
        let outcome = orchestrator
            .run(&source, BatchActions::per_item(&action), self.progress.as_ref())
            .await;

        let updated = action.updated.load(Ordering::SeqCst);
        match outcome {
            Ok(_) => {
                info!(updated, "Bulk modification completed");
                Ok(BulkModifyResponse { count: updated })
            }
            Err(err) => {
                error!(error = %err, updated, "Bulk modification aborted");
                Err(ApiError::BulkModifyAborted {
                    updated,
                    source: Box::new(err),
                })
            }
        }
    }
}

struct IdSnapshot {
    store: Arc<dyn FollowUpStore>,
    ids: Vec<FollowUpId>,
}

#[async_trait]
impl PageSource<FollowUp> for IdSnapshot {
    async fn total_count(&self) -> Result<usize, ApiError> {
        Ok(self.ids.len())
    }

    async fn fetch_page(&self, page_no: usize, page_size: usize) -> Result<Vec<FollowUp>, ApiError> {
        let start = page_no.saturating_mul(page_size).min(self.ids.len());
        let end = start.saturating_add(page_size).min(self.ids.len());
        Ok(self.store.find_by_ids(&self.ids[start..end]).await?)
    }
}

struct ApplyPatch<'a> {
    store: Arc<dyn FollowUpStore>,
    patch: &'a FollowUpPatch,
    now: DateTime<Utc>,
    updated: AtomicUsize,
}

#[async_trait]
impl ItemAction<FollowUp> for ApplyPatch<'_> {
    async fn run_item(&self, item: &FollowUp) -> Result<(), ApiError> {
        if self
            .store
            .update_follow_up(&item.id, self.patch, self.now)
            .await?
            .is_some()
        {
            self.updated.fetch_add(1, Ordering::SeqCst);
        }
        Ok(())
    }
}
