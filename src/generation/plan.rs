//! Per-contact reconciliation plan: which visits to add and which to remove so that every
//! scheduled day of the contact's window holds its daily quota.

use crate::model::{days_between, Contact, FollowUp, FollowUpStatus, GenerationPeriod};
use crate::teams::TeamCursor;
use crate::types::{FollowUpId, TeamId};
use chrono::{DateTime, NaiveDate, Utc};
use std::collections::HashMap;
use uuid::Uuid;

/// Validated settings shared by every contact of a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlanSettings {
    pub frequency_in_days: u32,
    pub follow_ups_per_day: u32,
    pub targeted: bool,
    pub overwrite_existing: bool,
    pub keep_team_assignment: bool,
}

#[derive(Debug, Clone)]
pub struct ContactPlanInput<'a> {
    pub contact: &'a Contact,
    /// Existing visits of the contact inside the requested period, in stored order.
    pub existing: &'a [FollowUp],
    pub eligible_teams: &'a [TeamId],
    /// Team kept for every new visit when `keep_team_assignment` is set.
    pub current_team: Option<&'a TeamId>,
    pub period: GenerationPeriod,
    pub settings: &'a PlanSettings,
    pub today: NaiveDate,
    pub now: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ContactPlan {
    pub to_add: Vec<FollowUp>,
    pub to_remove: Vec<FollowUpId>,
}

impl ContactPlan {
    pub fn is_empty(&self) -> bool {
        self.to_add.is_empty() && self.to_remove.is_empty()
    }

    pub fn merge(&mut self, other: ContactPlan) {
        self.to_add.extend(other.to_add);
        self.to_remove.extend(other.to_remove);
    }
}

/// Diff desired against existing visits for one contact. Pure; no I/O.
pub fn plan_contact(input: ContactPlanInput<'_>) -> ContactPlan {
    let mut plan = ContactPlan::default();
    let contact = input.contact;
    let Some(window) = contact.follow_up.as_ref() else {
        return plan;
    };
    let Some(clipped) = input.period.clip_to(&window.period()) else {
        return plan;
    };

    let mut by_day: HashMap<NaiveDate, Vec<&FollowUp>> = HashMap::new();
    for follow_up in input.existing {
        by_day.entry(follow_up.date).or_default().push(follow_up);
    }

    let settings = input.settings;
    let quota = settings.follow_ups_per_day as usize;
    let fixed_team = input
        .current_team
        .filter(|_| settings.keep_team_assignment);
    let mut cursor = TeamCursor::new(input.eligible_teams);
    let address = contact.current_address().cloned();

    for date in clipped.days(settings.frequency_in_days) {
        let existing = by_day.get(&date).map(Vec::as_slice).unwrap_or(&[]);
        let is_future = date > input.today;

        let to_generate = if is_future && settings.overwrite_existing {
            plan.to_remove.extend(existing.iter().map(|fu| fu.id.clone()));
            quota
        } else if is_future && existing.len() > quota {
            let excess = existing.len() - quota;
            plan.to_remove
                .extend(existing.iter().take(excess).map(|fu| fu.id.clone()));
            0
        } else {
            quota.saturating_sub(existing.len())
        };

        let index = u32::try_from(days_between(window.start_date, date) + 1).unwrap_or(u32::MAX);
        for _ in 0..to_generate {
            let team_id = fixed_team.or_else(|| cursor.next_team()).cloned();
            plan.to_add.push(FollowUp {
                id: Uuid::new_v4().to_string(),
                outbreak_id: contact.outbreak_id.clone(),
                contact_id: contact.id.clone(),
                date,
                team_id,
                status: FollowUpStatus::NotPerformed,
                targeted: settings.targeted,
                index,
                address: address.clone(),
                created_at: input.now,
                updated_at: input.now,
            });
        }
    }
    plan
}
