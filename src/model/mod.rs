//! Scheduling data model: contacts, visits, teams, locations and outbreak settings.

pub mod contact;
pub mod follow_up;
pub mod period;
pub mod team;

pub use contact::{Address, AddressType, Contact, MonitoringStatus, MonitoringWindow};
pub use follow_up::{FollowUp, FollowUpFilter, FollowUpPatch, FollowUpStatus};
pub use period::{days_between, parse_date, GenerationPeriod};
pub use team::{Location, Outbreak, Team, TeamAssignmentAlgorithm};

use serde::{Deserialize, Serialize};

/// Bundle of records loaded into a store in one import.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Dataset {
    #[serde(default)]
    pub outbreaks: Vec<Outbreak>,
    #[serde(default)]
    pub locations: Vec<Location>,
    #[serde(default)]
    pub teams: Vec<Team>,
    #[serde(default)]
    pub contacts: Vec<Contact>,
    #[serde(default)]
    pub follow_ups: Vec<FollowUp>,
}
