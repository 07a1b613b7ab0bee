//! Bulk modification over a filtered, paged id snapshot.

use super::test_utils::*;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use visitplan::batch::BatchConfig;
use visitplan::bulk::BulkModifier;
use visitplan::clock::FixedClock;
use visitplan::error::{ApiError, StorageError};
use visitplan::model::{FollowUp, FollowUpFilter, FollowUpPatch, FollowUpStatus, GenerationPeriod};
use visitplan::progress::{NoopProgress, RecordingProgress};
use visitplan::store::{FollowUpStore, SledStore};
use visitplan::types::{ContactId, FollowUpId};

fn seeded() -> Arc<SledStore> {
    let mut data = dataset(outbreak(1), vec![contact("c1", day(1), day(10))]);
    data.follow_ups = (1..=5)
        .map(|d| visit(&format!("v{}", d), "c1", day(d), 0))
        .collect();
    seeded_store(&data)
}

fn modifier(store: Arc<dyn FollowUpStore>, page_size: usize) -> BulkModifier {
    BulkModifier::new(
        store,
        Arc::new(FixedClock::on(day(20))),
        BatchConfig {
            page_size,
            per_item_concurrency: 1,
            start_page: 0,
        },
        Arc::new(NoopProgress),
    )
}

#[tokio::test]
async fn patching_the_filtered_attribute_still_reaches_every_match() {
    let store = seeded();
    let mut filter = FollowUpFilter::for_outbreak("ob");
    filter.team_id = Some("A".to_string());
    let patch = FollowUpPatch {
        team_id: Some(Some("B".to_string())),
        ..FollowUpPatch::default()
    };

    let response = modifier(store.clone(), 2)
        .bulk_modify_follow_ups(&filter, &patch)
        .await
        .unwrap();

    assert_eq!(response.count, 5);
    let visits = all_visits(&store);
    assert!(visits.iter().all(|v| v.team_id.as_deref() == Some("B")));
    assert!(visits
        .iter()
        .all(|v| v.updated_at == FixedClock::on(day(20)).0 && v.updated_at > v.created_at));
}

#[tokio::test]
async fn period_filter_limits_updates() {
    let store = seeded();
    let mut filter = FollowUpFilter::for_outbreak("ob");
    filter.period = Some(GenerationPeriod::new(day(2), day(3)));
    let patch = FollowUpPatch {
        status: Some(FollowUpStatus::Missed),
        targeted: Some(false),
        ..FollowUpPatch::default()
    };
    let progress = Arc::new(RecordingProgress::default());
    let modifier = BulkModifier::new(
        store.clone(),
        Arc::new(FixedClock::on(day(20))),
        BatchConfig::default(),
        progress.clone(),
    );

    let response = modifier.bulk_modify_follow_ups(&filter, &patch).await.unwrap();

    assert_eq!(response.count, 2);
    assert_eq!(progress.pages().len(), 1);
    for visit in all_visits(&store) {
        let touched = visit.date == day(2) || visit.date == day(3);
        assert_eq!(visit.status == FollowUpStatus::Missed, touched);
        assert_eq!(!visit.targeted, touched);
    }
}

#[tokio::test]
async fn nothing_matching_is_a_zero_count() {
    let store = seeded();
    let mut filter = FollowUpFilter::for_outbreak("ob");
    filter.status = Some(FollowUpStatus::Declined);
    let patch = FollowUpPatch {
        status: Some(FollowUpStatus::SeenOk),
        ..FollowUpPatch::default()
    };
    let response = modifier(store, 2)
        .bulk_modify_follow_ups(&filter, &patch)
        .await
        .unwrap();
    assert_eq!(response.count, 0);
}

#[tokio::test]
async fn empty_patch_and_outbreak_are_rejected_together() {
    let err = modifier(seeded(), 2)
        .bulk_modify_follow_ups(&FollowUpFilter::for_outbreak(" "), &FollowUpPatch::default())
        .await
        .unwrap_err();
    let ApiError::InvalidParameters(fields) = err else {
        panic!("expected InvalidParameters, got {err:?}");
    };
    assert_eq!(fields.len(), 2);
}

/// Fails the update of one id; everything else goes to sled.
struct FailingUpdate {
    inner: Arc<SledStore>,
    poison: FollowUpId,
}

#[async_trait]
impl FollowUpStore for FailingUpdate {
    async fn find_by_contact_ids_and_date_range(
        &self,
        contact_ids: &[ContactId],
        period: GenerationPeriod,
    ) -> Result<HashMap<ContactId, Vec<FollowUp>>, StorageError> {
        self.inner
            .find_by_contact_ids_and_date_range(contact_ids, period)
            .await
    }

    async fn bulk_insert(&self, follow_ups: Vec<FollowUp>) -> Result<usize, StorageError> {
        self.inner.bulk_insert(follow_ups).await
    }

    async fn bulk_delete_by_ids(&self, ids: &[FollowUpId]) -> Result<usize, StorageError> {
        self.inner.bulk_delete_by_ids(ids).await
    }

    async fn find_ids_matching(
        &self,
        filter: &FollowUpFilter,
    ) -> Result<Vec<FollowUpId>, StorageError> {
        self.inner.find_ids_matching(filter).await
    }

    async fn find_by_ids(&self, ids: &[FollowUpId]) -> Result<Vec<FollowUp>, StorageError> {
        self.inner.find_by_ids(ids).await
    }

    async fn update_follow_up(
        &self,
        id: &FollowUpId,
        patch: &FollowUpPatch,
        now: DateTime<Utc>,
    ) -> Result<Option<FollowUp>, StorageError> {
        if *id == self.poison {
            return Err(StorageError::FollowUpNotFound(id.clone()));
        }
        self.inner.update_follow_up(id, patch, now).await
    }
}

#[tokio::test]
async fn failure_reports_records_already_updated() {
    let store = seeded();
    let failing = Arc::new(FailingUpdate {
        inner: store.clone(),
        poison: "v3".to_string(),
    });
    let patch = FollowUpPatch {
        status: Some(FollowUpStatus::SeenOk),
        ..FollowUpPatch::default()
    };

    let err = modifier(failing, 2)
        .bulk_modify_follow_ups(&FollowUpFilter::for_outbreak("ob"), &patch)
        .await
        .unwrap_err();

    match err {
        ApiError::BulkModifyAborted { updated, .. } => assert_eq!(updated, 2),
        other => panic!("expected BulkModifyAborted, got {other:?}"),
    }
    let seen: Vec<_> = all_visits(&store)
        .into_iter()
        .filter(|v| v.status == FollowUpStatus::SeenOk)
        .map(|v| v.id)
        .collect();
    assert_eq!(seen, vec!["v1".to_string(), "v2".to_string()]);
}
