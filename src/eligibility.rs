//! Eligibility Selector
//!
//! Decides which contacts need visits for a generation window and exposes them to the batch
//! orchestrator as a paged source.

use crate::batch::PageSource;
use crate::error::ApiError;
use crate::model::{Contact, GenerationPeriod};
use crate::store::{ContactStore, PageRequest};
use crate::types::{ContactId, OutbreakId};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EligibilityQuery {
    pub period: GenerationPeriod,
    pub outbreak_id: OutbreakId,
    pub contact_ids: Option<Vec<ContactId>>,
}

impl EligibilityQuery {
    pub fn new(period: GenerationPeriod, outbreak_id: impl Into<OutbreakId>) -> Self {
        Self {
            period,
            outbreak_id: outbreak_id.into(),
            contact_ids: None,
        }
    }

    pub fn with_contact_ids(mut self, contact_ids: Option<Vec<ContactId>>) -> Self {
        self.contact_ids = contact_ids;
        self
    }

    /// A contact is eligible when it belongs to the outbreak, is under follow-up, and its
    /// monitoring window overlaps the period.
    pub fn matches(&self, contact: &Contact) -> bool {
        if contact.outbreak_id != self.outbreak_id || !contact.is_under_follow_up() {
            return false;
        }
        if let Some(ids) = &self.contact_ids {
            if !ids.contains(&contact.id) {
                return false;
            }
        }
        contact
            .follow_up
            .as_ref()
            .is_some_and(|window| window.period().overlaps(&self.period))
    }
}

/// Eligible contacts of a query, paged straight from the contact store.
///
/// Consecutive pages resume after the last contact id returned, so the store never re-reads
/// earlier pages. Any other page number falls back to offset paging.
pub struct EligibleContacts {
    store: Arc<dyn ContactStore>,
    query: EligibilityQuery,
    cursor: Mutex<Option<(usize, ContactId)>>,
}

impl EligibleContacts {
    pub fn new(store: Arc<dyn ContactStore>, query: EligibilityQuery) -> Self {
        Self {
            store,
            query,
            cursor: Mutex::new(None),
        }
    }

    pub fn query(&self) -> &EligibilityQuery {
        &self.query
    }
}

#[async_trait]
impl PageSource<Contact> for EligibleContacts {
    async fn total_count(&self) -> Result<usize, ApiError> {
        Ok(self.store.count_eligible_contacts(&self.query).await?)
    }

    async fn fetch_page(&self, page_no: usize, page_size: usize) -> Result<Vec<Contact>, ApiError> {
        let after = self
            .cursor
            .lock()
            .as_ref()
            .filter(|(next_page, _)| *next_page == page_no)
            .map(|(_, id)| id.clone());
        let mut request = PageRequest::new(page_no, page_size);
        if let Some(id) = after {
            request = request.resume_after(id);
        }
        let contacts = self.store.find_eligible_contacts(&self.query, request).await?;
        if let Some(last) = contacts.last() {
            *self.cursor.lock() = Some((page_no + 1, last.id.clone()));
        }
        Ok(contacts)
    }
}
