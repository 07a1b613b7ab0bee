//! Team/Location Index
//!
//! Resolves, once per run, the full set of locations each team covers and answers which teams
//! may visit a given contact.

use crate::error::ApiError;
use crate::model::{Address, Contact, Team, TeamAssignmentAlgorithm};
use crate::store::LocationService;
use crate::types::{LocationId, TeamId};
use std::collections::{BTreeMap, HashSet};
use tracing::{debug, info};

#[derive(Debug, Clone)]
struct TeamCoverage {
    configured: HashSet<LocationId>,
    covered: HashSet<LocationId>,
}

/// Immutable snapshot of team coverage, ordered by team id.
#[derive(Debug, Clone, Default)]
pub struct TeamIndex {
    teams: BTreeMap<TeamId, TeamCoverage>,
}

impl TeamIndex {
    /// Expand every team's configured locations through the location hierarchy.
    pub async fn build(
        teams: Vec<Team>,
        locations: &dyn LocationService,
    ) -> Result<Self, ApiError> {
        let mut index = BTreeMap::new();
        for team in teams {
            let expanded = locations
                .expand_to_descendants(&team.location_ids)
                .await
                .map_err(|e| {
                    ApiError::LocationError(format!(
                        "Failed to expand locations of team '{}': {}",
                        team.id, e
                    ))
                })?;
            let configured: HashSet<LocationId> = team.location_ids.into_iter().collect();
            let mut covered: HashSet<LocationId> = expanded.into_iter().collect();
            covered.extend(configured.iter().cloned());
            debug!(
                team_id = %team.id,
                configured = configured.len(),
                covered = covered.len(),
                "Team coverage resolved"
            );
            index.insert(team.id, TeamCoverage { configured, covered });
        }
        info!(teams = index.len(), "Team location index built");
        Ok(Self { teams: index })
    }

    /// Index from already-expanded coverage, keyed by team id.
    pub fn from_coverage<I, L>(coverage: I) -> Self
    where
        I: IntoIterator<Item = (TeamId, L)>,
        L: IntoIterator<Item = LocationId>,
    {
        let teams = coverage
            .into_iter()
            .map(|(id, locations)| {
                let covered: HashSet<LocationId> = locations.into_iter().collect();
                (
                    id,
                    TeamCoverage {
                        configured: covered.clone(),
                        covered,
                    },
                )
            })
            .collect();
        Self { teams }
    }

    pub fn len(&self) -> usize {
        self.teams.len()
    }

    pub fn is_empty(&self) -> bool {
        self.teams.is_empty()
    }

    pub fn contains_team(&self, team_id: &str) -> bool {
        self.teams.contains_key(team_id)
    }

    pub fn covered_locations(&self, team_id: &str) -> Option<&HashSet<LocationId>> {
        self.teams.get(team_id).map(|c| &c.covered)
    }

    /// Teams allowed to visit `contact`.
    ///
    /// The usual place of residence decides when any team covers it. Otherwise the first
    /// address, in stored order, covered by at least one team decides. No match yields an empty
    /// list.
    pub fn eligible_teams_for_contact(
        &self,
        contact: &Contact,
        algorithm: TeamAssignmentAlgorithm,
    ) -> Vec<TeamId> {
        if let Some(residence) = contact.usual_residence() {
            let teams = self.teams_for_address(residence, algorithm);
            if !teams.is_empty() {
                return teams;
            }
        }
        contact
            .addresses
            .iter()
            .map(|address| self.teams_for_address(address, algorithm))
            .find(|teams| !teams.is_empty())
            .unwrap_or_default()
    }

    fn teams_for_address(&self, address: &Address, algorithm: TeamAssignmentAlgorithm) -> Vec<TeamId> {
        let Some(location_id) = address.location_id.as_ref() else {
            return Vec::new();
        };
        let covering: Vec<(&TeamId, &TeamCoverage)> = self
            .teams
            .iter()
            .filter(|(_, coverage)| coverage.covered.contains(location_id))
            .collect();

        if algorithm == TeamAssignmentAlgorithm::RoundRobinNearestFit {
            let direct: Vec<TeamId> = covering
                .iter()
                .filter(|(_, coverage)| coverage.configured.contains(location_id))
                .map(|(id, _)| (*id).clone())
                .collect();
            if !direct.is_empty() {
                return direct;
            }
        }
        covering.into_iter().map(|(id, _)| id.clone()).collect()
    }
}

/// Round-robin position over one contact's eligible teams.
#[derive(Debug, Clone)]
pub struct TeamCursor<'a> {
    teams: &'a [TeamId],
    position: usize,
}

impl<'a> TeamCursor<'a> {
    pub fn new(teams: &'a [TeamId]) -> Self {
        Self { teams, position: 0 }
    }

    /// Next team in cyclic order; `None` when there are no teams.
    pub fn next_team(&mut self) -> Option<&'a TeamId> {
        if self.teams.is_empty() {
            return None;
        }
        let team = &self.teams[self.position % self.teams.len()];
        self.position += 1;
        Some(team)
    }
}
