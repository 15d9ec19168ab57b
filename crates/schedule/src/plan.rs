//! Maintenance plan record and persistence contract.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use uuid::Uuid;

use wartung_core::EngineError;

use crate::cadence::Cadence;

/// A recurring maintenance assignment for a single asset.
///
/// The asset reference is a relation, not ownership: a plan can be detached
/// from its asset without deleting either side.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MaintenancePlan {
    pub id: Uuid,
    /// Code of the asset this plan services.
    pub asset_code: String,
    pub cadence: Cadence,
    /// Opaque checklist template carried along for the technician.
    pub checklist: Option<serde_json::Value>,
    pub active: bool,
    pub description: String,
    /// Party responsible for carrying the plan out.
    pub responsible: String,
    pub created_at: DateTime<Utc>,
}

impl MaintenancePlan {
    pub fn new(
        asset_code: impl Into<String>,
        cadence: Cadence,
        description: impl Into<String>,
        responsible: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            asset_code: asset_code.into(),
            cadence,
            checklist: None,
            active: true,
            description: description.into(),
            responsible: responsible.into(),
            created_at: Utc::now(),
        }
    }
}

/// Persistence contract for maintenance plans.
///
/// Plans are never hard-deleted while ledger rows may reference them;
/// deactivation via `set_active` is the terminal lifecycle step. At most one
/// active plan per asset is the caller's invariant, assumed here.
#[async_trait]
pub trait PlanStore: Send + Sync {
    async fn insert(&self, plan: &MaintenancePlan) -> Result<(), EngineError>;

    async fn get(&self, id: Uuid) -> Result<Option<MaintenancePlan>, EngineError>;

    async fn list_for_asset(&self, asset_code: &str) -> Result<Vec<MaintenancePlan>, EngineError>;

    /// Flip the active flag. Returns `false` if the plan is unknown.
    async fn set_active(&self, id: Uuid, active: bool) -> Result<bool, EngineError>;
}

/// In-memory plan store backend, used by tests.
#[derive(Default)]
pub struct MemoryPlanStore {
    plans: RwLock<HashMap<Uuid, MaintenancePlan>>,
}

impl MemoryPlanStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PlanStore for MemoryPlanStore {
    async fn insert(&self, plan: &MaintenancePlan) -> Result<(), EngineError> {
        self.plans.write().await.insert(plan.id, plan.clone());
        Ok(())
    }

    async fn get(&self, id: Uuid) -> Result<Option<MaintenancePlan>, EngineError> {
        Ok(self.plans.read().await.get(&id).cloned())
    }

    async fn list_for_asset(&self, asset_code: &str) -> Result<Vec<MaintenancePlan>, EngineError> {
        let mut plans: Vec<_> = self
            .plans
            .read()
            .await
            .values()
            .filter(|p| p.asset_code == asset_code)
            .cloned()
            .collect();
        plans.sort_by_key(|p| p.created_at);
        Ok(plans)
    }

    async fn set_active(&self, id: Uuid, active: bool) -> Result<bool, EngineError> {
        match self.plans.write().await.get_mut(&id) {
            Some(plan) => {
                plan.active = active;
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::Weekday;

    use super::*;

    #[tokio::test]
    async fn insert_get_and_deactivate() {
        let store = MemoryPlanStore::new();
        let plan = MaintenancePlan::new("EQ-01", Cadence::weekly(Weekday::Mon), "oiling", "j.doe");
        store.insert(&plan).await.unwrap();

        let loaded = store.get(plan.id).await.unwrap().unwrap();
        assert!(loaded.active);
        assert_eq!(loaded.asset_code, "EQ-01");

        assert!(store.set_active(plan.id, false).await.unwrap());
        assert!(!store.get(plan.id).await.unwrap().unwrap().active);

        assert!(!store.set_active(Uuid::new_v4(), false).await.unwrap());
    }

    #[tokio::test]
    async fn list_for_asset_filters_by_code() {
        let store = MemoryPlanStore::new();
        let a = MaintenancePlan::new("EQ-01", Cadence::weekly(Weekday::Mon), "a", "x");
        let b = MaintenancePlan::new("EQ-02", Cadence::weekly(Weekday::Tue), "b", "y");
        store.insert(&a).await.unwrap();
        store.insert(&b).await.unwrap();

        let plans = store.list_for_asset("EQ-01").await.unwrap();
        assert_eq!(plans.len(), 1);
        assert_eq!(plans[0].id, a.id);
    }
}
