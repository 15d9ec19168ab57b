//! Weekly maintenance ledger: one row per (asset, ISO week, ISO year),
//! read-time status reconciliation, and lifecycle sweeps.

pub mod engine;
pub mod lifecycle;
pub mod occurrence;
pub mod reconciler;
pub mod store;

pub use engine::MaintenanceEngine;
pub use lifecycle::LifecycleCoordinator;
pub use occurrence::{OccurrenceKey, OccurrenceState, WeeklyOccurrence};
pub use store::{LedgerStore, LedgerStoreError, MemoryLedger, PgLedger, PlanSweep};
