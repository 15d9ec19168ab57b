//! Read-time status derivation.
//!
//! State is a pure function of (target date, execution date, suppressed
//! flag, evaluation date); callers may re-derive as often as they like and
//! always get the same answer for the same inputs. The pending/overdue
//! boundary uses the evaluation date, so a row crosses into overdue as time
//! passes without any write.

use chrono::NaiveDate;

use wartung_schedule::calendar::date_to_week;

use crate::occurrence::{OccurrenceState, WeeklyOccurrence};

/// Derive the status of a ledger row as of `today`.
///
/// Precedence: a logged execution wins over the suppressed flag; the
/// suppressed flag wins over the pending/overdue boundary.
pub fn derive_state(occ: &WeeklyOccurrence, today: NaiveDate) -> OccurrenceState {
    match occ.executed_on {
        Some(done) => completion_state(occ.iso_year, occ.iso_week, done),
        None if occ.suppressed => OccurrenceState::Suppressed,
        None if occ.target_date >= today => OccurrenceState::Pending,
        None => OccurrenceState::Overdue,
    }
}

/// Completed state for an execution against a target ISO week: on time iff
/// the execution date falls in that same week.
pub fn completion_state(iso_year: i32, iso_week: u32, executed_on: NaiveDate) -> OccurrenceState {
    if date_to_week(executed_on) == (iso_year, iso_week) {
        OccurrenceState::CompletedOnTime
    } else {
        OccurrenceState::CompletedLate
    }
}

/// Reconcile a row in place; returns whether the state changed.
pub fn reconcile(occ: &mut WeeklyOccurrence, today: NaiveDate) -> bool {
    let next = derive_state(occ, today);
    let changed = next != occ.state;
    occ.state = next;
    changed
}
