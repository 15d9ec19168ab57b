//! Lifecycle cascades: future obligations vanish, history survives.

use std::sync::Arc;

use chrono::{NaiveDate, Weekday};
use uuid::Uuid;

use wartung_core::{EngineError, MemoryAssetRegistry};
use wartung_ledger::{
    LedgerStore, LifecycleCoordinator, MaintenanceEngine, MemoryLedger, OccurrenceKey,
    OccurrenceState,
};
use wartung_schedule::{Cadence, MaintenancePlan, MemoryPlanStore, PlanStore};

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

struct Harness {
    engine: MaintenanceEngine,
    coordinator: LifecycleCoordinator,
    ledger: Arc<MemoryLedger>,
    plans: Arc<MemoryPlanStore>,
}

async fn harness() -> Harness {
    let ledger = Arc::new(MemoryLedger::new());
    let plans = Arc::new(MemoryPlanStore::new());
    let assets = Arc::new(MemoryAssetRegistry::new());
    assets.register("EQ-01", "drill press").await;

    let engine = MaintenanceEngine::new(ledger.clone(), plans.clone(), assets.clone());
    let coordinator = LifecycleCoordinator::new(ledger.clone(), plans.clone(), assets.clone());
    Harness {
        engine,
        coordinator,
        ledger,
        plans,
    }
}

// -- Asset decommissioning ---------------------------------------------------

#[tokio::test]
async fn decommission_deletes_future_rows_and_preserves_history() {
    let h = harness().await;

    // Past, completed row at week 5; future, unexecuted row at week 20.
    h.engine
        .record_execution("EQ-01", 2025, 5, date(2025, 1, 29), "ok")
        .await
        .unwrap();
    h.engine
        .ensure_row_at("EQ-01", 2025, 20, None, date(2025, 3, 1))
        .await
        .unwrap();

    let week5_before = h
        .ledger
        .fetch(&OccurrenceKey::new("EQ-01", 2025, 5))
        .await
        .unwrap()
        .unwrap();

    let deleted = h
        .coordinator
        .on_asset_decommissioned("EQ-01", date(2025, 4, 1))
        .await
        .unwrap();
    assert_eq!(deleted, 1);

    // The week-20 row is gone.
    assert!(h
        .ledger
        .fetch(&OccurrenceKey::new("EQ-01", 2025, 20))
        .await
        .unwrap()
        .is_none());

    // The week-5 row is unchanged, field for field.
    let week5_after = h
        .ledger
        .fetch(&OccurrenceKey::new("EQ-01", 2025, 5))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(week5_before, week5_after);
}

#[tokio::test]
async fn decommission_cutoff_is_inclusive() {
    let h = harness().await;

    // Target date exactly on the effective date: week 14 of 2025 targets
    // Monday 2025-03-31; week 15 targets 2025-04-07.
    h.engine
        .ensure_row_at("EQ-01", 2025, 15, None, date(2025, 3, 1))
        .await
        .unwrap();

    let deleted = h
        .coordinator
        .on_asset_decommissioned("EQ-01", date(2025, 4, 7))
        .await
        .unwrap();
    assert_eq!(deleted, 1);
}

#[tokio::test]
async fn decommission_keeps_executed_rows_even_past_cutoff() {
    let h = harness().await;

    h.engine
        .record_execution("EQ-01", 2025, 20, date(2025, 5, 13), "done early")
        .await
        .unwrap();

    let deleted = h
        .coordinator
        .on_asset_decommissioned("EQ-01", date(2025, 4, 1))
        .await
        .unwrap();
    assert_eq!(deleted, 0);
    assert!(h
        .ledger
        .fetch(&OccurrenceKey::new("EQ-01", 2025, 20))
        .await
        .unwrap()
        .is_some());
}

#[tokio::test]
async fn decommission_sweep_is_rerunnable() {
    let h = harness().await;
    h.engine
        .ensure_row_at("EQ-01", 2025, 20, None, date(2025, 3, 1))
        .await
        .unwrap();

    let first = h
        .coordinator
        .on_asset_decommissioned("EQ-01", date(2025, 4, 1))
        .await
        .unwrap();
    let second = h
        .coordinator
        .on_asset_decommissioned("EQ-01", date(2025, 4, 1))
        .await
        .unwrap();

    assert_eq!(first, 1);
    assert_eq!(second, 0);
}

#[tokio::test]
async fn decommission_unknown_asset_is_not_found() {
    let h = harness().await;
    assert!(matches!(
        h.coordinator
            .on_asset_decommissioned("EQ-99", date(2025, 4, 1))
            .await,
        Err(EngineError::NotFound(_))
    ));
}

// -- Plan deactivation -------------------------------------------------------

#[tokio::test]
async fn plan_deactivation_deletes_future_and_detaches_history() {
    let h = harness().await;
    let plan = MaintenancePlan::new("EQ-01", Cadence::weekly(Weekday::Mon), "oiling", "j.doe");
    h.plans.insert(&plan).await.unwrap();
    h.engine.materialize_year(plan.id, 2025, 10).await.unwrap();

    // Week 10 got executed; weeks 11.. are still open.
    h.engine
        .record_execution("EQ-01", 2025, 10, date(2025, 3, 5), "ok")
        .await
        .unwrap();

    let sweep = h
        .coordinator
        .on_plan_deactivated_at(plan.id, date(2025, 3, 17))
        .await
        .unwrap();

    // Weeks 12..=52 (targets strictly after 2025-03-17) are deleted; the
    // executed week 10 and the already-due week 11 (target 2025-03-10) and
    // week 12 (target 2025-03-17, not strictly future) survive detached.
    assert_eq!(sweep.deleted, 40);
    assert_eq!(sweep.detached, 3);

    let week10 = h
        .ledger
        .fetch(&OccurrenceKey::new("EQ-01", 2025, 10))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(week10.plan_id, None);
    // Snapshot fields survive the detach.
    assert_eq!(week10.plan_description, "oiling");
    assert_eq!(week10.executed_on, Some(date(2025, 3, 5)));
    assert_eq!(week10.state, OccurrenceState::CompletedOnTime);

    assert!(h
        .ledger
        .fetch(&OccurrenceKey::new("EQ-01", 2025, 20))
        .await
        .unwrap()
        .is_none());

    // The plan record itself is deactivated, not deleted.
    let stored = h.plans.get(plan.id).await.unwrap().unwrap();
    assert!(!stored.active);
}

#[tokio::test]
async fn plan_deactivation_sweep_is_rerunnable() {
    let h = harness().await;
    let plan = MaintenancePlan::new("EQ-01", Cadence::weekly(Weekday::Mon), "oiling", "j.doe");
    h.plans.insert(&plan).await.unwrap();
    h.engine.materialize_year(plan.id, 2025, 10).await.unwrap();

    let first = h
        .coordinator
        .on_plan_deactivated_at(plan.id, date(2025, 3, 1))
        .await
        .unwrap();
    let second = h
        .coordinator
        .on_plan_deactivated_at(plan.id, date(2025, 3, 1))
        .await
        .unwrap();

    assert!(first.deleted > 0);
    assert_eq!(second.deleted, 0);
    assert_eq!(second.detached, 0);
}

#[tokio::test]
async fn plan_deactivation_unknown_plan_is_not_found() {
    let h = harness().await;
    assert!(matches!(
        h.coordinator.on_plan_deactivated(Uuid::new_v4()).await,
        Err(EngineError::NotFound(_))
    ));
}
