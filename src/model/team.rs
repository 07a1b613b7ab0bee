use crate::types::{LocationId, OutbreakId, TeamId};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Team {
    pub id: TeamId,
    #[serde(default)]
    pub name: String,
    /// Locations the team was configured with; descendants are covered too.
    #[serde(default)]
    pub location_ids: Vec<LocationId>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Location {
    pub id: LocationId,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub parent_id: Option<LocationId>,
}

/// How eligible teams are picked for a contact's address.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TeamAssignmentAlgorithm {
    /// Every team whose covered locations include the address.
    #[default]
    RoundRobinAllTeams,
    /// Teams configured with the address location itself, falling back to all covering teams.
    RoundRobinNearestFit,
}

impl std::str::FromStr for TeamAssignmentAlgorithm {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "round_robin_all_teams" | "all" => Ok(Self::RoundRobinAllTeams),
            "round_robin_nearest_fit" | "nearest" => Ok(Self::RoundRobinNearestFit),
            other => Err(format!("unknown team assignment algorithm '{}'", other)),
        }
    }
}

/// Follow-up settings of one outbreak. Numeric settings are signed so that invalid stored
/// values reach validation instead of failing to decode.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Outbreak {
    pub id: OutbreakId,
    #[serde(default)]
    pub name: String,
    /// Spacing in days between generated visit dates.
    pub frequency_in_days: i64,
    /// Daily quota of visits per contact.
    pub follow_ups_per_day: i64,
    /// Default length in days of a generation window when no end date is requested.
    #[serde(default = "default_period_of_follow_up")]
    pub period_of_follow_up: i64,
    #[serde(default)]
    pub team_assignment_algorithm: TeamAssignmentAlgorithm,
    #[serde(default)]
    pub overwrite_existing_follow_ups: bool,
    #[serde(default)]
    pub keep_team_assignment: bool,
}

fn default_period_of_follow_up() -> i64 {
    14
}
