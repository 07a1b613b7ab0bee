//! Generation request and its pre-flight validation.

use crate::error::{ApiError, InvalidField};
use crate::generation::plan::PlanSettings;
use crate::model::{parse_date, GenerationPeriod, Outbreak, TeamAssignmentAlgorithm};
use crate::types::{ContactId, OutbreakId};
use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GenerateRequest {
    pub outbreak_id: OutbreakId,
    /// Defaults to today.
    #[serde(default)]
    pub start_date: Option<String>,
    /// Defaults to the outbreak's follow-up period counted from the start date.
    #[serde(default)]
    pub end_date: Option<String>,
    /// Defaults to true.
    #[serde(default)]
    pub targeted: Option<bool>,
    /// Defaults to the outbreak setting.
    #[serde(default)]
    pub overwrite_existing: Option<bool>,
    /// Defaults to the outbreak setting.
    #[serde(default)]
    pub keep_team_assignment: Option<bool>,
    #[serde(default)]
    pub contact_ids: Option<Vec<ContactId>>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerateResponse {
    pub count: usize,
    pub deleted: usize,
    pub contacts: usize,
}

/// Everything a run needs once the request and outbreak settings have been checked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunParameters {
    pub period: GenerationPeriod,
    pub settings: PlanSettings,
    pub algorithm: TeamAssignmentAlgorithm,
}

impl GenerateRequest {
    pub fn new(outbreak_id: impl Into<OutbreakId>) -> Self {
        Self {
            outbreak_id: outbreak_id.into(),
            ..Self::default()
        }
    }

    /// Field errors visible without the outbreak: a blank outbreak id and unparseable dates.
    pub fn malformed_fields(&self) -> Vec<InvalidField> {
        let mut invalid = Vec::new();
        if self.outbreak_id.trim().is_empty() {
            invalid.push(InvalidField::new("outbreak_id", "must not be empty"));
        }
        for (field, raw) in [("start_date", &self.start_date), ("end_date", &self.end_date)] {
            if let Some(raw) = raw.as_deref() {
                if parse_date(raw).is_none() {
                    invalid.push(InvalidField::new(
                        field,
                        format!("'{}' is not a valid date", raw),
                    ));
                }
            }
        }
        invalid
    }

    /// Check the request against the outbreak settings, reporting every invalid field at once.
    pub fn validate(&self, outbreak: &Outbreak, today: NaiveDate) -> Result<RunParameters, ApiError> {
        let mut invalid = Vec::new();

        let frequency = positive_u32(outbreak.frequency_in_days, "frequency_in_days", &mut invalid);
        let quota = positive_u32(outbreak.follow_ups_per_day, "follow_ups_per_day", &mut invalid);

        let start = match self.start_date.as_deref() {
            Some(raw) => {
                let parsed = parse_date(raw);
                if parsed.is_none() {
                    invalid.push(InvalidField::new(
                        "start_date",
                        format!("'{}' is not a valid date", raw),
                    ));
                }
                parsed
            }
            None => Some(today),
        };

        let end = match self.end_date.as_deref() {
            Some(raw) => {
                let parsed = parse_date(raw);
                if parsed.is_none() {
                    invalid.push(InvalidField::new(
                        "end_date",
                        format!("'{}' is not a valid date", raw),
                    ));
                }
                parsed
            }
            None if outbreak.period_of_follow_up <= 0 => {
                invalid.push(InvalidField::new(
                    "period_of_follow_up",
                    "must be positive when no end date is given",
                ));
                None
            }
            None => start.and_then(|s| {
                s.checked_add_signed(Duration::days(outbreak.period_of_follow_up - 1))
            }),
        };

        if let (Some(start), Some(end)) = (start, end) {
            if end < start {
                invalid.push(InvalidField::new(
                    "end_date",
                    format!("{} is before start date {}", end, start),
                ));
            }
        }

        match (frequency, quota, start, end) {
            (Some(frequency_in_days), Some(follow_ups_per_day), Some(start), Some(end))
                if invalid.is_empty() =>
            {
                Ok(RunParameters {
                    period: GenerationPeriod::new(start, end),
                    settings: PlanSettings {
                        frequency_in_days,
                        follow_ups_per_day,
                        targeted: self.targeted.unwrap_or(true),
                        overwrite_existing: self
                            .overwrite_existing
                            .unwrap_or(outbreak.overwrite_existing_follow_ups),
                        keep_team_assignment: self
                            .keep_team_assignment
                            .unwrap_or(outbreak.keep_team_assignment),
                    },
                    algorithm: outbreak.team_assignment_algorithm,
                })
            }
            _ => Err(ApiError::InvalidParameters(invalid)),
        }
    }
}

fn positive_u32(value: i64, field: &str, invalid: &mut Vec<InvalidField>) -> Option<u32> {
    if value <= 0 {
        invalid.push(InvalidField::new(field, format!("must be positive, got {}", value)));
        return None;
    }
    match u32::try_from(value) {
        Ok(v) => Some(v),
        Err(_) => {
            invalid.push(InvalidField::new(field, format!("{} is too large", value)));
            None
        }
    }
}
