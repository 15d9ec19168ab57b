//! The scheduling engine: horizon materialization, execution logging, and
//! read-time reconciliation.
//!
//! All collaborators are constructor-injected; the engine keeps no state of
//! its own beyond the handles, so any number of callers can share one
//! instance. Reads are side-effect-free: status is re-derived on every
//! read, never recomputed by a background job.

use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use tracing::{debug, info, warn};
use uuid::Uuid;

use wartung_core::{AssetRegistry, AssetState, EngineError};
use wartung_schedule::calendar::week_to_monday;
use wartung_schedule::{MaintenancePlan, PlanStore};

use crate::occurrence::{OccurrenceKey, OccurrenceState, WeeklyOccurrence};
use crate::reconciler;
use crate::store::{LedgerStore, LedgerStoreError};

pub struct MaintenanceEngine {
    ledger: Arc<dyn LedgerStore>,
    plans: Arc<dyn PlanStore>,
    assets: Arc<dyn AssetRegistry>,
}

impl MaintenanceEngine {
    pub fn new(
        ledger: Arc<dyn LedgerStore>,
        plans: Arc<dyn PlanStore>,
        assets: Arc<dyn AssetRegistry>,
    ) -> Self {
        Self {
            ledger,
            plans,
            assets,
        }
    }

    fn today() -> NaiveDate {
        Utc::now().date_naive()
    }

    /// Validate that the asset exists and may still receive a row with the
    /// given target date.
    async fn check_asset(&self, code: &str, target: NaiveDate) -> Result<(), EngineError> {
        match self.assets.asset_state(code).await? {
            None => Err(EngineError::not_found(format!("asset '{code}'"))),
            Some(AssetState::Decommissioned { since }) if target >= since.date_naive() => {
                Err(EngineError::invalid_argument(format!(
                    "asset '{code}' was decommissioned on {}",
                    since.date_naive()
                )))
            }
            Some(_) => Ok(()),
        }
    }

    // ── EnsureRow ───────────────────────────────────────────────

    /// Return the ledger row for (asset, year, week), creating it if absent.
    ///
    /// Idempotent under concurrency: losing the insert race to another
    /// caller is recovered by a single re-fetch of the winner's row.
    pub async fn ensure_row(
        &self,
        asset_code: &str,
        year: i32,
        week: u32,
        plan: Option<&MaintenancePlan>,
    ) -> Result<WeeklyOccurrence, EngineError> {
        self.ensure_row_at(asset_code, year, week, plan, Self::today())
            .await
    }

    /// [`ensure_row`](Self::ensure_row) with an explicit evaluation date,
    /// for deterministic replay and tests.
    pub async fn ensure_row_at(
        &self,
        asset_code: &str,
        year: i32,
        week: u32,
        plan: Option<&MaintenancePlan>,
        today: NaiveDate,
    ) -> Result<WeeklyOccurrence, EngineError> {
        let target = week_to_monday(year, week)?;
        self.check_asset(asset_code, target).await?;

        let key = OccurrenceKey::new(asset_code, year, week);
        if let Some(mut existing) = self.ledger.fetch(&key).await.map_err(EngineError::from)? {
            reconciler::reconcile(&mut existing, today);
            return Ok(existing);
        }

        let mut row = WeeklyOccurrence {
            id: Uuid::new_v4(),
            asset_code: asset_code.to_string(),
            iso_year: year,
            iso_week: week,
            target_date: target,
            executed_on: None,
            result: None,
            suppressed: false,
            state: OccurrenceState::Pending,
            plan_id: plan.map(|p| p.id),
            plan_description: plan.map(|p| p.description.clone()).unwrap_or_default(),
            plan_responsible: plan.map(|p| p.responsible.clone()).unwrap_or_default(),
            created_at: Utc::now(),
        };
        row.state = reconciler::derive_state(&row, today);

        match self.ledger.insert(&row).await {
            Ok(()) => {
                debug!(key = %key, state = %row.state, "created ledger row");
                Ok(row)
            }
            Err(LedgerStoreError::Duplicate(_)) => {
                // Benign race: someone else created the row first.
                warn!(key = %key, "lost insert race, re-fetching");
                match self.ledger.fetch(&key).await.map_err(EngineError::from)? {
                    Some(mut existing) => {
                        reconciler::reconcile(&mut existing, today);
                        Ok(existing)
                    }
                    None => Err(EngineError::StorageUnavailable(format!(
                        "row {key} not readable after duplicate insert"
                    ))),
                }
            }
            Err(e) => Err(e.into()),
        }
    }

    // ── RecordExecution ─────────────────────────────────────────

    /// Log a performed execution against (asset, year, week).
    ///
    /// Back-fills the row if no plan ever materialized the week. An already
    /// completed row is overwritten (last-write-wins); callers needing
    /// strict log-once semantics must check the state first.
    pub async fn record_execution(
        &self,
        asset_code: &str,
        year: i32,
        week: u32,
        executed_on: NaiveDate,
        result: &str,
    ) -> Result<WeeklyOccurrence, EngineError> {
        let row = self.ensure_row(asset_code, year, week, None).await?;
        let key = row.key();
        let state = reconciler::completion_state(year, week, executed_on);

        let updated = self
            .ledger
            .record_execution(&key, executed_on, result, state)
            .await
            .map_err(EngineError::from)?
            .ok_or_else(|| {
                EngineError::StorageUnavailable(format!(
                    "row {key} disappeared while recording execution"
                ))
            })?;

        info!(key = %key, state = %updated.state, %executed_on, "recorded execution");
        Ok(updated)
    }

    // ── Suppression ─────────────────────────────────────────────

    /// Mark a week as intentionally not due (e.g. the asset was
    /// unavailable). The row never auto-reverts to pending/overdue; only an
    /// explicitly logged execution supersedes the mark.
    pub async fn suppress_week(
        &self,
        asset_code: &str,
        year: i32,
        week: u32,
    ) -> Result<WeeklyOccurrence, EngineError> {
        let row = self.ensure_row(asset_code, year, week, None).await?;
        let key = row.key();

        let mut probe = row;
        probe.suppressed = true;
        let state = reconciler::derive_state(&probe, Self::today());

        let updated = self
            .ledger
            .set_suppressed(&key, state)
            .await
            .map_err(EngineError::from)?
            .ok_or_else(|| {
                EngineError::StorageUnavailable(format!("row {key} disappeared while suppressing"))
            })?;

        info!(key = %key, "week suppressed");
        Ok(updated)
    }

    // ── Read paths ──────────────────────────────────────────────

    /// All ledger rows for an ISO week, states re-derived as of now.
    pub async fn list_for_week(
        &self,
        year: i32,
        week: u32,
    ) -> Result<Vec<WeeklyOccurrence>, EngineError> {
        self.list_for_week_at(year, week, Self::today()).await
    }

    /// [`list_for_week`](Self::list_for_week) with an explicit evaluation
    /// date.
    pub async fn list_for_week_at(
        &self,
        year: i32,
        week: u32,
        today: NaiveDate,
    ) -> Result<Vec<WeeklyOccurrence>, EngineError> {
        week_to_monday(year, week)?;

        let mut rows = self
            .ledger
            .list_for_week(year, week)
            .await
            .map_err(EngineError::from)?;
        for row in &mut rows {
            reconciler::reconcile(row, today);
        }
        Ok(rows)
    }

    /// Full ledger history for one asset, states re-derived as of now.
    pub async fn list_for_asset(
        &self,
        asset_code: &str,
    ) -> Result<Vec<WeeklyOccurrence>, EngineError> {
        self.list_for_asset_at(asset_code, Self::today()).await
    }

    pub async fn list_for_asset_at(
        &self,
        asset_code: &str,
        today: NaiveDate,
    ) -> Result<Vec<WeeklyOccurrence>, EngineError> {
        if self.assets.asset_state(asset_code).await?.is_none() {
            return Err(EngineError::not_found(format!("asset '{asset_code}'")));
        }

        let mut rows = self
            .ledger
            .list_for_asset(asset_code)
            .await
            .map_err(EngineError::from)?;
        for row in &mut rows {
            reconciler::reconcile(row, today);
        }
        Ok(rows)
    }

    // ── Materialization ─────────────────────────────────────────

    /// Materialize a plan's ledger rows for `year`, stepping the cadence
    /// from `from_week`. Returns the number of weeks ensured.
    pub async fn materialize_year(
        &self,
        plan_id: Uuid,
        year: i32,
        from_week: u32,
    ) -> Result<usize, EngineError> {
        if !(1..=53).contains(&from_week) {
            return Err(EngineError::invalid_argument(format!(
                "starting week must be within 1..=53, got {from_week}"
            )));
        }

        let plan = self
            .plans
            .get(plan_id)
            .await?
            .ok_or_else(|| EngineError::not_found(format!("plan {plan_id}")))?;
        if !plan.active {
            return Err(EngineError::invalid_argument(format!(
                "plan {plan_id} is not active"
            )));
        }

        let weeks = plan.cadence.weeks_for_year(year, from_week);
        for &week in &weeks {
            self.ensure_row(&plan.asset_code, year, week, Some(&plan))
                .await?;
        }

        info!(
            plan = %plan_id,
            asset = %plan.asset_code,
            year,
            rows = weeks.len(),
            "materialized horizon"
        );
        Ok(weeks.len())
    }
}
