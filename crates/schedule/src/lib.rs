//! Calendar arithmetic, cadence descriptors, and maintenance plans.

pub mod cadence;
pub mod calendar;
pub mod plan;

pub use cadence::Cadence;
pub use plan::{MaintenancePlan, MemoryPlanStore, PlanStore};
