//! Asset registry contract.
//!
//! The engine validates asset references through [`AssetRegistry`] and never
//! mutates registry state; registering and decommissioning assets is the
//! registry owner's job.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use crate::error::EngineError;

/// Lifecycle state of a registered asset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssetState {
    Active,
    Decommissioned { since: DateTime<Utc> },
}

impl AssetState {
    pub fn is_active(&self) -> bool {
        matches!(self, AssetState::Active)
    }
}

/// A registered asset as seen by the engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssetRecord {
    /// Unique asset code (e.g. "EQ-01").
    pub code: String,
    pub name: String,
    pub state: AssetState,
}

/// Read-only view of the asset registry.
#[async_trait]
pub trait AssetRegistry: Send + Sync {
    /// Look up the lifecycle state for an asset code.
    ///
    /// Returns `Ok(None)` for unknown codes.
    async fn asset_state(&self, code: &str) -> Result<Option<AssetState>, EngineError>;
}

/// In-memory registry backend, used by tests.
#[derive(Default)]
pub struct MemoryAssetRegistry {
    assets: RwLock<HashMap<String, AssetRecord>>,
}

impl MemoryAssetRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an active asset, replacing any previous record for the code.
    pub async fn register(&self, code: &str, name: &str) {
        let record = AssetRecord {
            code: code.to_string(),
            name: name.to_string(),
            state: AssetState::Active,
        };
        self.assets.write().await.insert(code.to_string(), record);
    }

    /// Flip an asset to decommissioned. No-op for unknown codes.
    pub async fn decommission(&self, code: &str, since: DateTime<Utc>) {
        if let Some(record) = self.assets.write().await.get_mut(code) {
            record.state = AssetState::Decommissioned { since };
        }
    }
}

#[async_trait]
impl AssetRegistry for MemoryAssetRegistry {
    async fn asset_state(&self, code: &str) -> Result<Option<AssetState>, EngineError> {
        Ok(self.assets.read().await.get(code).map(|r| r.state))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn unknown_code_is_none() {
        let registry = MemoryAssetRegistry::new();
        assert_eq!(registry.asset_state("EQ-99").await.unwrap(), None);
    }

    #[tokio::test]
    async fn register_then_decommission() {
        let registry = MemoryAssetRegistry::new();
        registry.register("EQ-01", "drill press").await;
        assert_eq!(
            registry.asset_state("EQ-01").await.unwrap(),
            Some(AssetState::Active)
        );

        let since = Utc::now();
        registry.decommission("EQ-01", since).await;
        assert_eq!(
            registry.asset_state("EQ-01").await.unwrap(),
            Some(AssetState::Decommissioned { since })
        );
    }
}
