//! Lifecycle cascades: plan deactivation and asset decommissioning.
//!
//! Both cascades share one rule: unfulfilled future obligations vanish,
//! history stays. A deactivated plan additionally loses its reference on
//! surviving rows (the snapshot fields keep the historical record intact);
//! a decommissioned asset keeps its rows attached since audits read them by
//! asset code.

use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use tracing::info;
use uuid::Uuid;

use wartung_core::{AssetRegistry, EngineError};
use wartung_schedule::PlanStore;

use crate::store::{LedgerStore, PlanSweep};

pub struct LifecycleCoordinator {
    ledger: Arc<dyn LedgerStore>,
    plans: Arc<dyn PlanStore>,
    assets: Arc<dyn AssetRegistry>,
}

impl LifecycleCoordinator {
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

    /// Deactivate a plan and sweep its ledger rows.
    ///
    /// Unexecuted rows with a target date strictly in the future are
    /// deleted; every remaining row referencing the plan is detached but
    /// otherwise untouched.
    pub async fn on_plan_deactivated(&self, plan_id: Uuid) -> Result<PlanSweep, EngineError> {
        self.on_plan_deactivated_at(plan_id, Utc::now().date_naive())
            .await
    }

    /// [`on_plan_deactivated`](Self::on_plan_deactivated) with an explicit
    /// evaluation date, for deterministic replay and tests.
    pub async fn on_plan_deactivated_at(
        &self,
        plan_id: Uuid,
        today: NaiveDate,
    ) -> Result<PlanSweep, EngineError> {
        let known = self.plans.set_active(plan_id, false).await?;
        if !known {
            return Err(EngineError::not_found(format!("plan {plan_id}")));
        }

        let sweep = self
            .ledger
            .deactivate_plan_sweep(plan_id, today)
            .await
            .map_err(EngineError::from)?;

        info!(
            plan = %plan_id,
            deleted = sweep.deleted,
            detached = sweep.detached,
            "plan deactivated"
        );
        Ok(sweep)
    }

    /// Sweep the ledger after an asset is decommissioned.
    ///
    /// Deletes every unexecuted row with target date on or after
    /// `effective`; rows before the cutoff are preserved field-for-field as
    /// history. Marking the asset record itself is the registry owner's
    /// job, not the engine's. Safe to re-run: a second sweep finds nothing
    /// left to delete.
    pub async fn on_asset_decommissioned(
        &self,
        asset_code: &str,
        effective: NaiveDate,
    ) -> Result<u64, EngineError> {
        if self.assets.asset_state(asset_code).await?.is_none() {
            return Err(EngineError::not_found(format!("asset '{asset_code}'")));
        }

        let deleted = self
            .ledger
            .decommission_sweep(asset_code, effective)
            .await
            .map_err(EngineError::from)?;

        info!(asset = %asset_code, %effective, deleted, "decommission sweep complete");
        Ok(deleted)
    }
}
