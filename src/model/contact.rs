use crate::model::period::GenerationPeriod;
use crate::types::{ContactId, LocationId, OutbreakId, TeamId};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AddressType {
    UsualPlaceOfResidence,
    PreviousUsualPlaceOfResidence,
    Other,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Address {
    pub address_type: AddressType,
    #[serde(default)]
    pub location_id: Option<LocationId>,
    #[serde(default)]
    pub address_line: Option<String>,
}

/// Monitoring status of a contact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MonitoringStatus {
    UnderFollowUp,
    FollowUpCompleted,
    LostToFollowUp,
    NotStarted,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonitoringWindow {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub status: MonitoringStatus,
}

impl MonitoringWindow {
    pub fn period(&self) -> GenerationPeriod {
        GenerationPeriod::new(self.start_date, self.end_date)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contact {
    pub id: ContactId,
    pub outbreak_id: OutbreakId,
    #[serde(default)]
    pub addresses: Vec<Address>,
    #[serde(default)]
    pub follow_up: Option<MonitoringWindow>,
    #[serde(default)]
    pub follow_up_team_id: Option<TeamId>,
}

impl Contact {
    pub fn usual_residence(&self) -> Option<&Address> {
        self.addresses
            .iter()
            .find(|a| a.address_type == AddressType::UsualPlaceOfResidence)
    }

    /// Address copied onto newly generated visits.
    pub fn current_address(&self) -> Option<&Address> {
        self.usual_residence().or_else(|| self.addresses.first())
    }

    pub fn is_under_follow_up(&self) -> bool {
        matches!(
            self.follow_up.as_ref().map(|w| w.status),
            Some(MonitoringStatus::UnderFollowUp)
        )
    }
}
