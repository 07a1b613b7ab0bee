//! Shared fixtures: a small outbreak with one district, two teams and dated contacts.

#![allow(dead_code)]

use chrono::{DateTime, NaiveDate};
use std::sync::Arc;
use visitplan::clock::FixedClock;
use visitplan::config::GenerationTuning;
use visitplan::generation::{FollowUpGenerator, GenerationDeps};
use visitplan::model::{
    Address, AddressType, Contact, Dataset, FollowUp, FollowUpFilter, FollowUpStatus,
    GenerationPeriod, Location, MonitoringStatus, MonitoringWindow, Outbreak, Team,
    TeamAssignmentAlgorithm,
};
use visitplan::progress::NoopProgress;
use visitplan::store::SledStore;

pub fn day(d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 1, d).unwrap()
}

pub fn outbreak(quota: i64) -> Outbreak {
    Outbreak {
        id: "ob".to_string(),
        name: "Test outbreak".to_string(),
        frequency_in_days: 1,
        follow_ups_per_day: quota,
        period_of_follow_up: 14,
        team_assignment_algorithm: TeamAssignmentAlgorithm::RoundRobinAllTeams,
        overwrite_existing_follow_ups: false,
        keep_team_assignment: false,
    }
}

pub fn contact(id: &str, start: NaiveDate, end: NaiveDate) -> Contact {
    Contact {
        id: id.to_string(),
        outbreak_id: "ob".to_string(),
        addresses: vec![Address {
            address_type: AddressType::UsualPlaceOfResidence,
            location_id: Some("village".to_string()),
            address_line: Some(format!("{} Main St", id)),
        }],
        follow_up: Some(MonitoringWindow {
            start_date: start,
            end_date: end,
            status: MonitoringStatus::UnderFollowUp,
        }),
        follow_up_team_id: None,
    }
}

/// District "district" with child "village"; teams A and B both configured on the district.
pub fn dataset(outbreak: Outbreak, contacts: Vec<Contact>) -> Dataset {
    Dataset {
        outbreaks: vec![outbreak],
        locations: vec![
            Location {
                id: "district".to_string(),
                name: "District".to_string(),
                parent_id: None,
            },
            Location {
                id: "village".to_string(),
                name: "Village".to_string(),
                parent_id: Some("district".to_string()),
            },
        ],
        teams: vec![
            Team {
                id: "A".to_string(),
                name: "Team A".to_string(),
                location_ids: vec!["district".to_string()],
            },
            Team {
                id: "B".to_string(),
                name: "Team B".to_string(),
                location_ids: vec!["district".to_string()],
            },
        ],
        contacts,
        follow_ups: Vec::new(),
    }
}

pub fn seeded_store(dataset: &Dataset) -> Arc<SledStore> {
    let store = SledStore::temporary().unwrap();
    store.import(dataset).unwrap();
    Arc::new(store)
}

pub fn small_tuning() -> GenerationTuning {
    GenerationTuning {
        contact_page_size: 2,
        generation_concurrency: 4,
        max_concurrent_writes: 2,
        insert_flush_threshold: 3,
        delete_flush_threshold: 2,
        bulk_page_size: 2,
        bulk_concurrency: 2,
    }
}

pub fn generator(store: Arc<SledStore>, today: NaiveDate, tuning: GenerationTuning) -> FollowUpGenerator {
    FollowUpGenerator::new(
        GenerationDeps::from_store(store, Arc::new(FixedClock::on(today))),
        tuning,
        Arc::new(NoopProgress),
    )
}

/// Stored visit created `secs` after a fixed instant.
pub fn visit(id: &str, contact_id: &str, date: NaiveDate, secs: i64) -> FollowUp {
    let at = DateTime::from_timestamp(1_704_000_000 + secs, 0).unwrap();
    FollowUp {
        id: id.to_string(),
        outbreak_id: "ob".to_string(),
        contact_id: contact_id.to_string(),
        date,
        team_id: Some("A".to_string()),
        status: FollowUpStatus::NotPerformed,
        targeted: true,
        index: 1,
        address: None,
        created_at: at,
        updated_at: at,
    }
}

pub fn visits_on(
    store: &SledStore,
    contact_id: &str,
    date: NaiveDate,
) -> Vec<FollowUp> {
    let mut filter = FollowUpFilter::for_outbreak("ob");
    filter.contact_ids = Some(vec![contact_id.to_string()]);
    filter.period = Some(GenerationPeriod::new(date, date));
    store.list_follow_ups(&filter).unwrap()
}

pub fn all_visits(store: &SledStore) -> Vec<FollowUp> {
    store.list_follow_ups(&FollowUpFilter::for_outbreak("ob")).unwrap()
}
