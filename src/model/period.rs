//! Inclusive calendar-day windows and date parsing.

use chrono::{DateTime, Duration, NaiveDate};
use serde::{Deserialize, Serialize};

/// Inclusive `[start_date, end_date]` window of calendar days.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationPeriod {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

impl GenerationPeriod {
    pub fn new(start_date: NaiveDate, end_date: NaiveDate) -> Self {
        Self {
            start_date,
            end_date,
        }
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start_date <= date && date <= self.end_date
    }

    /// Closed-interval overlap. Covers containment in either direction as well as partial
    /// overlap at either end.
    pub fn overlaps(&self, other: &GenerationPeriod) -> bool {
        self.start_date <= other.end_date && other.start_date <= self.end_date
    }

    /// Intersection of the two windows, `None` when they are disjoint.
    pub fn clip_to(&self, other: &GenerationPeriod) -> Option<GenerationPeriod> {
        let start_date = self.start_date.max(other.start_date);
        let end_date = self.end_date.min(other.end_date);
        (start_date <= end_date).then(|| GenerationPeriod::new(start_date, end_date))
    }

    /// Days from `start_date` to `end_date` inclusive, `step_days` apart.
    pub fn days(&self, step_days: u32) -> DayCursor {
        DayCursor {
            next: Some(self.start_date),
            end: self.end_date,
            step: Duration::days(i64::from(step_days.max(1))),
        }
    }
}

/// Iterator returned by [`GenerationPeriod::days`].
#[derive(Debug, Clone)]
pub struct DayCursor {
    next: Option<NaiveDate>,
    end: NaiveDate,
    step: Duration,
}

impl Iterator for DayCursor {
    type Item = NaiveDate;

    fn next(&mut self) -> Option<NaiveDate> {
        let current = self.next.filter(|day| *day <= self.end)?;
        self.next = current.checked_add_signed(self.step);
        Some(current)
    }
}

/// Whole days from `from` to `to`; negative when `to` is earlier.
pub fn days_between(from: NaiveDate, to: NaiveDate) -> i64 {
    (to - from).num_days()
}

/// Accepts `YYYY-MM-DD` or a full RFC 3339 timestamp (its UTC calendar day is used).
pub fn parse_date(value: &str) -> Option<NaiveDate> {
    let value = value.trim();
    if let Ok(date) = NaiveDate::parse_from_str(value, "%Y-%m-%d") {
        return Some(date);
    }
    DateTime::parse_from_rfc3339(value)
        .ok()
        .map(|ts| ts.naive_utc().date())
}
