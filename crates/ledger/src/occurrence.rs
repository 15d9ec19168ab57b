//! Ledger row types: one record per (asset, ISO week, ISO year).

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Compound natural key of a ledger row.
///
/// The triple is unique in every backend; it is the idempotency boundary
/// that prevents double-logging a week.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OccurrenceKey {
    pub asset_code: String,
    pub iso_year: i32,
    pub iso_week: u32,
}

impl OccurrenceKey {
    pub fn new(asset_code: impl Into<String>, iso_year: i32, iso_week: u32) -> Self {
        Self {
            asset_code: asset_code.into(),
            iso_year,
            iso_week,
        }
    }
}

impl fmt::Display for OccurrenceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}-W{:02}", self.asset_code, self.iso_year, self.iso_week)
    }
}

/// Reconciled status of one expected-or-logged maintenance week.
///
/// One closed enumeration; there are no separate realized/late/suppressed
/// flags that could disagree with each other.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OccurrenceState {
    /// Not yet due, no execution logged.
    Pending,
    /// Target date passed without an execution.
    Overdue,
    /// Executed within the target ISO week.
    CompletedOnTime,
    /// Executed, but outside the target ISO week.
    CompletedLate,
    /// Explicitly waved off for the week; never auto-reverts to
    /// pending/overdue.
    Suppressed,
}

impl OccurrenceState {
    pub fn as_str(&self) -> &'static str {
        match self {
            OccurrenceState::Pending => "pending",
            OccurrenceState::Overdue => "overdue",
            OccurrenceState::CompletedOnTime => "completed_on_time",
            OccurrenceState::CompletedLate => "completed_late",
            OccurrenceState::Suppressed => "suppressed",
        }
    }

    pub fn is_completed(&self) -> bool {
        matches!(
            self,
            OccurrenceState::CompletedOnTime | OccurrenceState::CompletedLate
        )
    }
}

impl fmt::Display for OccurrenceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OccurrenceState {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(OccurrenceState::Pending),
            "overdue" => Ok(OccurrenceState::Overdue),
            "completed_on_time" => Ok(OccurrenceState::CompletedOnTime),
            "completed_late" => Ok(OccurrenceState::CompletedLate),
            "suppressed" => Ok(OccurrenceState::Suppressed),
            other => Err(format!("unknown occurrence state '{other}'")),
        }
    }
}

/// One expected-or-logged maintenance event for one asset in one ISO week.
///
/// `plan_description`/`plan_responsible` are snapshots copied from the plan
/// when the row is created; later plan edits do not rewrite them. The plan
/// reference itself is weak: cleared when the plan is removed, without
/// deleting the row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeeklyOccurrence {
    pub id: Uuid,
    pub asset_code: String,
    pub iso_year: i32,
    pub iso_week: u32,
    /// Monday of the ISO week.
    pub target_date: NaiveDate,
    pub executed_on: Option<NaiveDate>,
    /// Free-text result/observations from the technician.
    pub result: Option<String>,
    pub suppressed: bool,
    pub state: OccurrenceState,
    pub plan_id: Option<Uuid>,
    pub plan_description: String,
    pub plan_responsible: String,
    pub created_at: DateTime<Utc>,
}

impl WeeklyOccurrence {
    pub fn key(&self) -> OccurrenceKey {
        OccurrenceKey::new(self.asset_code.clone(), self.iso_year, self.iso_week)
    }
}
