//! Sled store behavior seen through the collaborator traits.

use super::test_utils::*;
use std::sync::Arc;
use tempfile::TempDir;
use visitplan::eligibility::EligibilityQuery;
use visitplan::model::{FollowUpFilter, GenerationPeriod, MonitoringStatus};
use visitplan::store::{ContactStore, FollowUpStore, LocationService, OutbreakStore, PageRequest, SledStore};

const DATASET: &str = r#"{
  "outbreaks": [
    { "id": "ob", "frequency_in_days": 2, "follow_ups_per_day": 1,
      "team_assignment_algorithm": "round_robin_nearest_fit" }
  ],
  "locations": [
    { "id": "country" },
    { "id": "region", "parent_id": "country" },
    { "id": "town", "parent_id": "region" },
    { "id": "elsewhere" }
  ],
  "teams": [ { "id": "T", "location_ids": ["region"] } ],
  "contacts": [
    { "id": "c1", "outbreak_id": "ob",
      "addresses": [ { "address_type": "usual_place_of_residence", "location_id": "town" } ],
      "follow_up": { "start_date": "2024-01-01", "end_date": "2024-01-14", "status": "under_follow_up" } }
  ]
}"#;

#[tokio::test]
async fn json_dataset_imports_with_defaults() {
    let store = SledStore::temporary().unwrap();
    store.import_json(DATASET).unwrap();

    let outbreak = store.find_outbreak(&"ob".to_string()).await.unwrap().unwrap();
    assert_eq!(outbreak.period_of_follow_up, 14);
    assert!(!outbreak.overwrite_existing_follow_ups);

    let expanded = store
        .expand_to_descendants(&["country".to_string()])
        .await
        .unwrap();
    assert_eq!(expanded, vec!["country", "region", "town"]);
}

#[tokio::test]
async fn malformed_dataset_is_rejected() {
    let store = SledStore::temporary().unwrap();
    assert!(store.import_json("{ \"contacts\": 3 }").is_err());
}

#[tokio::test]
async fn eligible_contacts_page_in_id_order() {
    let contacts = vec![
        contact("c3", day(1), day(5)),
        contact("c1", day(1), day(5)),
        contact("c2", day(1), day(5)),
        contact("late", day(20), day(25)),
    ];
    let mut data = dataset(outbreak(1), contacts);
    let mut done = contact("done", day(1), day(5));
    if let Some(window) = done.follow_up.as_mut() {
        window.status = MonitoringStatus::FollowUpCompleted;
    }
    data.contacts.push(done);
    let store = seeded_store(&data);

    let query = EligibilityQuery::new(GenerationPeriod::new(day(3), day(10)), "ob");
    assert_eq!(store.count_eligible_contacts(&query).await.unwrap(), 3);
    let first = store
        .find_eligible_contacts(&query, PageRequest::new(0, 2))
        .await
        .unwrap();
    let second = store
        .find_eligible_contacts(&query, PageRequest::new(1, 2))
        .await
        .unwrap();
    let ids: Vec<_> = first.iter().chain(&second).map(|c| c.id.as_str()).collect();
    assert_eq!(ids, vec!["c1", "c2", "c3"]);
}

#[tokio::test]
async fn records_survive_reopen() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("store");
    {
        let store = SledStore::open(&path).unwrap();
        store.import(&dataset(outbreak(1), vec![contact("c1", day(1), day(3))])).unwrap();
        store
            .bulk_insert(vec![visit("v1", "c1", day(2), 0)])
            .await
            .unwrap();
        store.flush().await.unwrap();
    }

    let store = SledStore::open(&path).unwrap();
    let ids = store
        .find_ids_matching(&FollowUpFilter::for_outbreak("ob"))
        .await
        .unwrap();
    assert_eq!(ids, vec!["v1".to_string()]);
    let found = store
        .find_by_contact_ids_and_date_range(&["c1".to_string()], GenerationPeriod::new(day(1), day(3)))
        .await
        .unwrap();
    assert_eq!(found["c1"].len(), 1);
}

#[tokio::test]
async fn deleting_unknown_ids_counts_only_existing_rows() {
    let mut data = dataset(outbreak(1), vec![contact("c1", day(1), day(3))]);
    data.follow_ups = vec![visit("v1", "c1", day(1), 0), visit("v2", "c1", day(2), 0)];
    let store = seeded_store(&data);

    let removed = store
        .bulk_delete_by_ids(&["v1".to_string(), "ghost".to_string()])
        .await
        .unwrap();
    assert_eq!(removed, 1);
    let left: Vec<_> = all_visits(&store).into_iter().map(|v| v.id).collect();
    assert_eq!(left, vec!["v2".to_string()]);
    assert!(visits_on(&store, "c1", day(1)).is_empty());
}

fn index_entries(store: &SledStore) -> usize {
    store
        .db()
        .open_tree("follow_ups_by_contact")
        .unwrap()
        .len()
}

#[tokio::test]
async fn reimporting_a_visit_moves_its_index_entry() {
    let mut data = dataset(outbreak(1), vec![contact("c1", day(1), day(14))]);
    data.follow_ups = vec![visit("v1", "c1", day(8), 0)];
    let store = seeded_store(&data);

    data.follow_ups = vec![visit("v1", "c1", day(9), 0)];
    store.import(&data).unwrap();

    assert_eq!(index_entries(&store), 1);
    assert!(visits_on(&store, "c1", day(8)).is_empty());
    let found = store
        .find_by_contact_ids_and_date_range(&["c1".to_string()], GenerationPeriod::new(day(8), day(9)))
        .await
        .unwrap();
    let seen: Vec<_> = found["c1"].iter().map(|v| (v.id.as_str(), v.date)).collect();
    assert_eq!(seen, vec![("v1", day(9))]);
}

#[tokio::test]
async fn replaced_visit_still_counts_once_towards_the_quota() {
    let mut data = dataset(outbreak(1), vec![contact("c1", day(1), day(14))]);
    data.follow_ups = vec![visit("v1", "c1", day(8), 0)];
    let store = seeded_store(&data);
    data.follow_ups = vec![visit("v1", "c1", day(9), 0)];
    store.import(&data).unwrap();

    let mut run = visitplan::generation::GenerateRequest::new("ob");
    run.start_date = Some("2024-01-08".to_string());
    run.end_date = Some("2024-01-09".to_string());
    let response = generator(Arc::clone(&store), day(1), small_tuning())
        .generate_followups(&run)
        .await
        .unwrap();

    assert_eq!((response.count, response.deleted), (1, 0));
    assert_eq!(visits_on(&store, "c1", day(8)).len(), 1);
    let day9 = visits_on(&store, "c1", day(9));
    assert_eq!(day9.len(), 1);
    assert_eq!(day9[0].id, "v1");
}

#[tokio::test]
async fn index_tracks_records_through_replace_and_delete() {
    let store = seeded_store(&dataset(outbreak(1), vec![contact("c1", day(1), day(14))]));
    store
        .bulk_insert(vec![visit("v1", "c1", day(2), 0), visit("v2", "c1", day(3), 0)])
        .await
        .unwrap();
    store
        .bulk_insert(vec![visit("v2", "c1", day(5), 1)])
        .await
        .unwrap();
    assert_eq!(index_entries(&store), 2);

    let removed = store
        .bulk_delete_by_ids(&["v2".to_string(), "v2".to_string()])
        .await
        .unwrap();
    assert_eq!(removed, 1);
    assert_eq!(index_entries(&store), 1);
    let left: Vec<_> = all_visits(&store).into_iter().map(|v| v.id).collect();
    assert_eq!(left, vec!["v1".to_string()]);
}

#[tokio::test]
async fn range_lookup_stays_inside_the_period() {
    let mut data = dataset(
        outbreak(1),
        vec![contact("c1", day(1), day(14)), contact("c10", day(1), day(14))],
    );
    data.follow_ups = vec![
        visit("early", "c1", day(1), 0),
        visit("first", "c1", day(4), 0),
        visit("last", "c1", day(6), 0),
        visit("late", "c1", day(7), 0),
        visit("other", "c10", day(5), 0),
    ];
    let store = seeded_store(&data);

    let found = store
        .find_by_contact_ids_and_date_range(&["c1".to_string()], GenerationPeriod::new(day(4), day(6)))
        .await
        .unwrap();
    let ids: Vec<_> = found["c1"].iter().map(|v| v.id.as_str()).collect();
    assert_eq!(ids, vec!["first", "last"]);
    assert!(!found.contains_key("c10"));
}

#[tokio::test]
async fn eligible_page_resumes_after_a_contact_id() {
    let contacts = vec![
        contact("c1", day(1), day(5)),
        contact("c2", day(1), day(5)),
        contact("c3", day(1), day(5)),
        contact("late", day(20), day(25)),
    ];
    let store = seeded_store(&dataset(outbreak(1), contacts));
    let query = EligibilityQuery::new(GenerationPeriod::new(day(3), day(10)), "ob");

    let page = store
        .find_eligible_contacts(&query, PageRequest::new(1, 5).resume_after("c1"))
        .await
        .unwrap();
    let ids: Vec<_> = page.iter().map(|c| c.id.as_str()).collect();
    assert_eq!(ids, vec!["c2", "c3"]);

    let restricted = query.with_contact_ids(Some(vec!["c3".to_string(), "c1".to_string()]));
    let page = store
        .find_eligible_contacts(&restricted, PageRequest::new(0, 5).resume_after("c1"))
        .await
        .unwrap();
    assert_eq!(page.len(), 1);
    assert_eq!(page[0].id, "c3");
}
