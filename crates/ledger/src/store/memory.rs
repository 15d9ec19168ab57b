//! In-memory ledger backend.
//!
//! Mirrors the relational backend's contract, including the duplicate-key
//! report on insert, so engine behavior can be exercised without a database.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::NaiveDate;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::occurrence::{OccurrenceKey, OccurrenceState, WeeklyOccurrence};

use super::{LedgerStore, LedgerStoreError, PlanSweep};

#[derive(Default)]
pub struct MemoryLedger {
    rows: Mutex<HashMap<OccurrenceKey, WeeklyOccurrence>>,
}

impl MemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Total number of rows, across all assets and weeks.
    pub async fn len(&self) -> usize {
        self.rows.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.rows.lock().await.is_empty()
    }
}

#[async_trait]
impl LedgerStore for MemoryLedger {
    async fn fetch(
        &self,
        key: &OccurrenceKey,
    ) -> Result<Option<WeeklyOccurrence>, LedgerStoreError> {
        Ok(self.rows.lock().await.get(key).cloned())
    }

    async fn insert(&self, occurrence: &WeeklyOccurrence) -> Result<(), LedgerStoreError> {
        let mut rows = self.rows.lock().await;
        let key = occurrence.key();
        if rows.contains_key(&key) {
            return Err(LedgerStoreError::Duplicate(key));
        }
        rows.insert(key, occurrence.clone());
        Ok(())
    }

    async fn record_execution(
        &self,
        key: &OccurrenceKey,
        executed_on: NaiveDate,
        result: &str,
        state: OccurrenceState,
    ) -> Result<Option<WeeklyOccurrence>, LedgerStoreError> {
        let mut rows = self.rows.lock().await;
        Ok(rows.get_mut(key).map(|row| {
            row.executed_on = Some(executed_on);
            row.result = Some(result.to_string());
            row.state = state;
            row.clone()
        }))
    }

    async fn set_suppressed(
        &self,
        key: &OccurrenceKey,
        state: OccurrenceState,
    ) -> Result<Option<WeeklyOccurrence>, LedgerStoreError> {
        let mut rows = self.rows.lock().await;
        Ok(rows.get_mut(key).map(|row| {
            row.suppressed = true;
            row.state = state;
            row.clone()
        }))
    }

    async fn list_for_week(
        &self,
        iso_year: i32,
        iso_week: u32,
    ) -> Result<Vec<WeeklyOccurrence>, LedgerStoreError> {
        let rows = self.rows.lock().await;
        let mut out: Vec<_> = rows
            .values()
            .filter(|r| r.iso_year == iso_year && r.iso_week == iso_week)
            .cloned()
            .collect();
        out.sort_by(|a, b| a.asset_code.cmp(&b.asset_code));
        Ok(out)
    }

    async fn list_for_asset(
        &self,
        asset_code: &str,
    ) -> Result<Vec<WeeklyOccurrence>, LedgerStoreError> {
        let rows = self.rows.lock().await;
        let mut out: Vec<_> = rows
            .values()
            .filter(|r| r.asset_code == asset_code)
            .cloned()
            .collect();
        out.sort_by_key(|r| (r.iso_year, r.iso_week));
        Ok(out)
    }

    async fn deactivate_plan_sweep(
        &self,
        plan_id: Uuid,
        today: NaiveDate,
    ) -> Result<PlanSweep, LedgerStoreError> {
        // The whole sweep happens under one lock, matching the relational
        // backend's single transaction.
        let mut rows = self.rows.lock().await;
        let mut sweep = PlanSweep::default();

        rows.retain(|_, row| {
            let doomed = row.plan_id == Some(plan_id)
                && row.executed_on.is_none()
                && row.target_date > today;
            if doomed {
                sweep.deleted += 1;
            }
            !doomed
        });

        for row in rows.values_mut() {
            if row.plan_id == Some(plan_id) {
                row.plan_id = None;
                sweep.detached += 1;
            }
        }

        Ok(sweep)
    }

    async fn decommission_sweep(
        &self,
        asset_code: &str,
        effective: NaiveDate,
    ) -> Result<u64, LedgerStoreError> {
        let mut rows = self.rows.lock().await;
        let mut deleted = 0;
        rows.retain(|_, row| {
            let doomed = row.asset_code == asset_code
                && row.executed_on.is_none()
                && row.target_date >= effective;
            if doomed {
                deleted += 1;
            }
            !doomed
        });
        Ok(deleted)
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn row(asset: &str, year: i32, week: u32, target: NaiveDate) -> WeeklyOccurrence {
        WeeklyOccurrence {
            id: Uuid::new_v4(),
            asset_code: asset.to_string(),
            iso_year: year,
            iso_week: week,
            target_date: target,
            executed_on: None,
            result: None,
            suppressed: false,
            state: OccurrenceState::Pending,
            plan_id: None,
            plan_description: String::new(),
            plan_responsible: String::new(),
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn duplicate_insert_reports_duplicate() {
        let store = MemoryLedger::new();
        let occ = row("EQ-01", 2025, 10, date(2025, 3, 3));
        store.insert(&occ).await.unwrap();

        let mut second = occ.clone();
        second.id = Uuid::new_v4();
        match store.insert(&second).await {
            Err(LedgerStoreError::Duplicate(key)) => {
                assert_eq!(key, occ.key());
            }
            other => panic!("expected duplicate error, got {other:?}"),
        }
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn update_on_missing_key_is_none() {
        let store = MemoryLedger::new();
        let key = OccurrenceKey::new("EQ-01", 2025, 10);
        let updated = store
            .record_execution(&key, date(2025, 3, 5), "ok", OccurrenceState::CompletedOnTime)
            .await
            .unwrap();
        assert!(updated.is_none());
    }

    #[tokio::test]
    async fn list_for_week_is_sorted_by_asset() {
        let store = MemoryLedger::new();
        store
            .insert(&row("EQ-02", 2025, 10, date(2025, 3, 3)))
            .await
            .unwrap();
        store
            .insert(&row("EQ-01", 2025, 10, date(2025, 3, 3)))
            .await
            .unwrap();
        store
            .insert(&row("EQ-01", 2025, 11, date(2025, 3, 10)))
            .await
            .unwrap();

        let listed = store.list_for_week(2025, 10).await.unwrap();
        let codes: Vec<_> = listed.iter().map(|r| r.asset_code.as_str()).collect();
        assert_eq!(codes, ["EQ-01", "EQ-02"]);
    }
}
