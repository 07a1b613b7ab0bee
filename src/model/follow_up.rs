use crate::model::contact::Address;
use crate::model::period::GenerationPeriod;
use crate::types::{ContactId, FollowUpId, OutbreakId, TeamId};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FollowUpStatus {
    NotPerformed,
    SeenOk,
    SeenNotOk,
    Missed,
    Declined,
}

impl std::str::FromStr for FollowUpStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "not_performed" => Ok(FollowUpStatus::NotPerformed),
            "seen_ok" => Ok(FollowUpStatus::SeenOk),
            "seen_not_ok" => Ok(FollowUpStatus::SeenNotOk),
            "missed" => Ok(FollowUpStatus::Missed),
            "declined" => Ok(FollowUpStatus::Declined),
            other => Err(format!(
                "unknown follow-up status '{}' (expected not_performed, seen_ok, seen_not_ok, missed or declined)",
                other
            )),
        }
    }
}

impl FollowUpStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            FollowUpStatus::NotPerformed => "not_performed",
            FollowUpStatus::SeenOk => "seen_ok",
            FollowUpStatus::SeenNotOk => "seen_not_ok",
            FollowUpStatus::Missed => "missed",
            FollowUpStatus::Declined => "declined",
        }
    }
}

impl std::fmt::Display for FollowUpStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One scheduled visit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FollowUp {
    pub id: FollowUpId,
    pub outbreak_id: OutbreakId,
    pub contact_id: ContactId,
    pub date: NaiveDate,
    #[serde(default)]
    pub team_id: Option<TeamId>,
    pub status: FollowUpStatus,
    #[serde(default)]
    pub targeted: bool,
    /// 1-based day offset from the contact's monitoring start.
    pub index: u32,
    #[serde(default)]
    pub address: Option<Address>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl FollowUp {
    /// Apply `patch` in place and stamp the update time. Runs once per record on every update.
    pub fn apply_patch(&mut self, patch: &FollowUpPatch, now: DateTime<Utc>) {
        if let Some(status) = patch.status {
            self.status = status;
        }
        if let Some(team_id) = &patch.team_id {
            self.team_id = team_id.clone();
        }
        if let Some(targeted) = patch.targeted {
            self.targeted = targeted;
        }
        self.updated_at = now;
    }
}

/// Attribute changes applied by bulk modification. `None` leaves a field untouched;
/// `team_id: Some(None)` clears the assignment.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FollowUpPatch {
    #[serde(default)]
    pub status: Option<FollowUpStatus>,
    #[serde(default)]
    pub team_id: Option<Option<TeamId>>,
    #[serde(default)]
    pub targeted: Option<bool>,
}

impl FollowUpPatch {
    pub fn is_empty(&self) -> bool {
        self.status.is_none() && self.team_id.is_none() && self.targeted.is_none()
    }
}

/// Selects follow-ups of one outbreak; unset criteria match everything.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FollowUpFilter {
    pub outbreak_id: OutbreakId,
    #[serde(default)]
    pub contact_ids: Option<Vec<ContactId>>,
    #[serde(default)]
    pub period: Option<GenerationPeriod>,
    #[serde(default)]
    pub team_id: Option<TeamId>,
    #[serde(default)]
    pub status: Option<FollowUpStatus>,
}

impl FollowUpFilter {
    pub fn for_outbreak(outbreak_id: impl Into<OutbreakId>) -> Self {
        Self {
            outbreak_id: outbreak_id.into(),
            ..Self::default()
        }
    }

    pub fn matches(&self, follow_up: &FollowUp) -> bool {
        follow_up.outbreak_id == self.outbreak_id
            && self
                .contact_ids
                .as_ref()
                .map_or(true, |ids| ids.contains(&follow_up.contact_id))
            && self.period.map_or(true, |p| p.contains(follow_up.date))
            && self
                .team_id
                .as_ref()
                .map_or(true, |team| follow_up.team_id.as_ref() == Some(team))
            && self.status.map_or(true, |status| follow_up.status == status)
    }
}
