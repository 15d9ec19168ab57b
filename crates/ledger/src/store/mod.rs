//! Ledger persistence contract and backends.

mod memory;
mod postgres;

pub use memory::MemoryLedger;
pub use postgres::PgLedger;

use async_trait::async_trait;
use chrono::NaiveDate;
use thiserror::Error;
use uuid::Uuid;

use wartung_core::EngineError;

use crate::occurrence::{OccurrenceKey, OccurrenceState, WeeklyOccurrence};

/// Errors produced by ledger store backends.
#[derive(Debug, Error)]
pub enum LedgerStoreError {
    /// Insert hit the compound-key uniqueness constraint.
    #[error("ledger row already exists: {0}")]
    Duplicate(OccurrenceKey),

    /// The backend could not be reached or returned malformed data.
    #[error("ledger store unavailable: {0}")]
    Unavailable(String),
}

impl From<LedgerStoreError> for EngineError {
    fn from(e: LedgerStoreError) -> Self {
        match e {
            LedgerStoreError::Duplicate(key) => EngineError::ConflictRetryable(key.to_string()),
            LedgerStoreError::Unavailable(msg) => EngineError::StorageUnavailable(msg),
        }
    }
}

/// Result of a plan-deactivation sweep.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PlanSweep {
    /// Future, unexecuted rows removed.
    pub deleted: u64,
    /// Remaining rows whose plan reference was cleared.
    pub detached: u64,
}

/// Persistence contract for weekly occurrences.
///
/// Every backend enforces the compound key (asset code, ISO year, ISO week)
/// as a uniqueness constraint; `insert` reports a violation as
/// [`LedgerStoreError::Duplicate`] so callers can treat the race as benign.
/// `record_execution` and `set_suppressed` are single atomic updates
/// (last-write-wins is fine, a torn write is not). The sweep operations run
/// as one transactional unit each and are safely re-runnable.
#[async_trait]
pub trait LedgerStore: Send + Sync {
    async fn fetch(&self, key: &OccurrenceKey)
        -> Result<Option<WeeklyOccurrence>, LedgerStoreError>;

    async fn insert(&self, occurrence: &WeeklyOccurrence) -> Result<(), LedgerStoreError>;

    /// Set execution date, result text, and state on the row in one write.
    ///
    /// Returns the updated row, or `None` if the key is absent.
    async fn record_execution(
        &self,
        key: &OccurrenceKey,
        executed_on: NaiveDate,
        result: &str,
        state: OccurrenceState,
    ) -> Result<Option<WeeklyOccurrence>, LedgerStoreError>;

    /// Set the suppressed flag and state on the row in one write.
    async fn set_suppressed(
        &self,
        key: &OccurrenceKey,
        state: OccurrenceState,
    ) -> Result<Option<WeeklyOccurrence>, LedgerStoreError>;

    async fn list_for_week(
        &self,
        iso_year: i32,
        iso_week: u32,
    ) -> Result<Vec<WeeklyOccurrence>, LedgerStoreError>;

    async fn list_for_asset(
        &self,
        asset_code: &str,
    ) -> Result<Vec<WeeklyOccurrence>, LedgerStoreError>;

    /// Delete the plan's unexecuted rows with target date strictly after
    /// `today`, then clear the plan reference on the remaining rows.
    async fn deactivate_plan_sweep(
        &self,
        plan_id: Uuid,
        today: NaiveDate,
    ) -> Result<PlanSweep, LedgerStoreError>;

    /// Delete the asset's unexecuted rows with target date on or after
    /// `effective`. Rows before the cutoff are preserved unchanged.
    async fn decommission_sweep(
        &self,
        asset_code: &str,
        effective: NaiveDate,
    ) -> Result<u64, LedgerStoreError>;
}
