//! Collaborator Stores
//!
//! Narrow read/write contracts the scheduler depends on. Everything the generator reads or
//! writes goes through these traits, so a run can be pointed at any backend implementing them.

pub mod persistence;

pub use persistence::SledStore;

use crate::eligibility::EligibilityQuery;
use crate::error::StorageError;
use crate::model::{
    Contact, FollowUp, FollowUpFilter, FollowUpPatch, GenerationPeriod, Outbreak, Team,
};
use crate::types::{ContactId, FollowUpId, LocationId, OutbreakId};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;

/// Zero-based page of a stable-ordered result set.
///
/// With `after` set the page starts right after that id and `page_no` is not used for
/// positioning.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageRequest {
    pub page_no: usize,
    pub page_size: usize,
    pub after: Option<String>,
}

impl PageRequest {
    pub fn new(page_no: usize, page_size: usize) -> Self {
        Self {
            page_no,
            page_size,
            after: None,
        }
    }

    pub fn resume_after(mut self, id: impl Into<String>) -> Self {
        self.after = Some(id.into());
        self
    }

    pub fn offset(&self) -> usize {
        self.page_no.saturating_mul(self.page_size)
    }
}

#[async_trait]
pub trait ContactStore: Send + Sync {
    async fn count_eligible_contacts(&self, query: &EligibilityQuery)
        -> Result<usize, StorageError>;

    /// Contacts matching `query`, ordered by id.
    async fn find_eligible_contacts(
        &self,
        query: &EligibilityQuery,
        page: PageRequest,
    ) -> Result<Vec<Contact>, StorageError>;
}

#[async_trait]
pub trait FollowUpStore: Send + Sync {
    /// Existing visits of the given contacts dated inside `period`, each list in stored order
    /// (oldest first).
    async fn find_by_contact_ids_and_date_range(
        &self,
        contact_ids: &[ContactId],
        period: GenerationPeriod,
    ) -> Result<HashMap<ContactId, Vec<FollowUp>>, StorageError>;

    /// Returns the number of rows written.
    async fn bulk_insert(&self, follow_ups: Vec<FollowUp>) -> Result<usize, StorageError>;

    /// Returns the number of rows removed.
    async fn bulk_delete_by_ids(&self, ids: &[FollowUpId]) -> Result<usize, StorageError>;

    async fn find_ids_matching(&self, filter: &FollowUpFilter)
        -> Result<Vec<FollowUpId>, StorageError>;

    async fn find_by_ids(&self, ids: &[FollowUpId]) -> Result<Vec<FollowUp>, StorageError>;

    /// Loads, patches and writes back one record. `None` when the id no longer exists.
    async fn update_follow_up(
        &self,
        id: &FollowUpId,
        patch: &FollowUpPatch,
        now: DateTime<Utc>,
    ) -> Result<Option<FollowUp>, StorageError>;
}

#[async_trait]
pub trait TeamStore: Send + Sync {
    async fn find_all_teams(&self) -> Result<Vec<Team>, StorageError>;
}

#[async_trait]
pub trait LocationService: Send + Sync {
    /// The given locations plus every location below them in the hierarchy.
    async fn expand_to_descendants(
        &self,
        location_ids: &[LocationId],
    ) -> Result<Vec<LocationId>, StorageError>;
}

#[async_trait]
pub trait OutbreakStore: Send + Sync {
    async fn find_outbreak(&self, id: &OutbreakId) -> Result<Option<Outbreak>, StorageError>;
}
