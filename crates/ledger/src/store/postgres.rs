//! Postgres-backed stores.
//!
//! [`PgLedger`] is the relational backend for the occurrence ledger and also
//! implements the plan store and asset registry contracts, so one pool
//! serves all three collaborators. The compound natural key is a database
//! `UNIQUE` constraint; a violated insert surfaces as
//! [`LedgerStoreError::Duplicate`], never as a hard failure.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::postgres::{PgPool, PgPoolOptions, PgRow};
use sqlx::Row;
use tracing::{debug, info};
use uuid::Uuid;

use wartung_core::{AssetRegistry, AssetState, EngineError};
use wartung_schedule::{Cadence, MaintenancePlan, PlanStore};

use crate::occurrence::{OccurrenceKey, OccurrenceState, WeeklyOccurrence};

use super::{LedgerStore, LedgerStoreError, PlanSweep};

const OCCURRENCE_COLUMNS: &str = "id, asset_code, iso_year, iso_week, target_date, executed_on, \
     result, suppressed, state, plan_id, plan_description, plan_responsible, created_at";

const PLAN_COLUMNS: &str =
    "id, asset_code, cadence, checklist, active, description, responsible, created_at";

const SCHEMA: &[&str] = &[
    "CREATE TABLE IF NOT EXISTS assets (
        code TEXT PRIMARY KEY,
        name TEXT NOT NULL DEFAULT '',
        decommissioned_at TIMESTAMPTZ
    )",
    "CREATE TABLE IF NOT EXISTS maintenance_plans (
        id UUID PRIMARY KEY,
        asset_code TEXT NOT NULL REFERENCES assets (code),
        cadence TEXT NOT NULL,
        checklist JSONB,
        active BOOLEAN NOT NULL DEFAULT TRUE,
        description TEXT NOT NULL DEFAULT '',
        responsible TEXT NOT NULL DEFAULT '',
        created_at TIMESTAMPTZ NOT NULL DEFAULT now()
    )",
    "CREATE TABLE IF NOT EXISTS weekly_occurrences (
        id UUID PRIMARY KEY,
        asset_code TEXT NOT NULL REFERENCES assets (code),
        iso_year INT NOT NULL,
        iso_week INT NOT NULL CHECK (iso_week BETWEEN 1 AND 53),
        target_date DATE NOT NULL,
        executed_on DATE,
        result TEXT,
        suppressed BOOLEAN NOT NULL DEFAULT FALSE,
        state TEXT NOT NULL,
        plan_id UUID REFERENCES maintenance_plans (id) ON DELETE SET NULL,
        plan_description TEXT NOT NULL DEFAULT '',
        plan_responsible TEXT NOT NULL DEFAULT '',
        created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
        CONSTRAINT weekly_occurrences_asset_week UNIQUE (asset_code, iso_year, iso_week)
    )",
    "CREATE INDEX IF NOT EXISTS weekly_occurrences_week_idx
        ON weekly_occurrences (iso_year, iso_week)",
    "CREATE INDEX IF NOT EXISTS weekly_occurrences_plan_idx
        ON weekly_occurrences (plan_id)",
];

pub struct PgLedger {
    pool: PgPool,
}

impl PgLedger {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn connect(url: &str, max_connections: u32) -> Result<Self, EngineError> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(url)
            .await
            .map_err(|e| EngineError::StorageUnavailable(e.to_string()))?;
        Ok(Self::new(pool))
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Create tables, the compound uniqueness constraint, and indexes if
    /// they do not exist. Safe to re-run.
    pub async fn init_schema(&self) -> Result<(), EngineError> {
        for statement in SCHEMA {
            sqlx::query(statement)
                .execute(&self.pool)
                .await
                .map_err(storage_err)?;
        }
        info!("ledger schema ready");
        Ok(())
    }

    // ── Asset administration ────────────────────────────────────

    /// Register an asset, updating the name if the code already exists.
    pub async fn insert_asset(&self, code: &str, name: &str) -> Result<(), EngineError> {
        sqlx::query(
            "INSERT INTO assets (code, name) VALUES ($1, $2)
             ON CONFLICT (code) DO UPDATE SET name = EXCLUDED.name",
        )
        .bind(code)
        .bind(name)
        .execute(&self.pool)
        .await
        .map_err(storage_err)?;
        Ok(())
    }

    /// Stamp an asset as decommissioned. Returns `false` for unknown codes.
    pub async fn mark_decommissioned(
        &self,
        code: &str,
        since: DateTime<Utc>,
    ) -> Result<bool, EngineError> {
        let result = sqlx::query("UPDATE assets SET decommissioned_at = $2 WHERE code = $1")
            .bind(code)
            .bind(since)
            .execute(&self.pool)
            .await
            .map_err(storage_err)?;
        Ok(result.rows_affected() > 0)
    }
}

fn unavailable(e: sqlx::Error) -> LedgerStoreError {
    LedgerStoreError::Unavailable(e.to_string())
}

fn storage_err(e: sqlx::Error) -> EngineError {
    EngineError::StorageUnavailable(e.to_string())
}

impl sqlx::FromRow<'_, PgRow> for WeeklyOccurrence {
    fn from_row(row: &PgRow) -> Result<Self, sqlx::Error> {
        let state: String = row.try_get("state")?;
        let state: OccurrenceState = state
            .parse()
            .map_err(|e: String| sqlx::Error::Decode(e.into()))?;
        Ok(Self {
            id: row.try_get("id")?,
            asset_code: row.try_get("asset_code")?,
            iso_year: row.try_get("iso_year")?,
            iso_week: row.try_get::<i32, _>("iso_week")? as u32,
            target_date: row.try_get("target_date")?,
            executed_on: row.try_get("executed_on")?,
            result: row.try_get("result")?,
            suppressed: row.try_get("suppressed")?,
            state,
            plan_id: row.try_get("plan_id")?,
            plan_description: row.try_get("plan_description")?,
            plan_responsible: row.try_get("plan_responsible")?,
            created_at: row.try_get("created_at")?,
        })
    }
}

fn plan_from_row(row: &PgRow) -> Result<MaintenancePlan, sqlx::Error> {
    let cadence: String = row.try_get("cadence")?;
    let cadence =
        Cadence::parse(&cadence).map_err(|e| sqlx::Error::Decode(e.to_string().into()))?;
    Ok(MaintenancePlan {
        id: row.try_get("id")?,
        asset_code: row.try_get("asset_code")?,
        cadence,
        checklist: row.try_get("checklist")?,
        active: row.try_get("active")?,
        description: row.try_get("description")?,
        responsible: row.try_get("responsible")?,
        created_at: row.try_get("created_at")?,
    })
}

// ── Occurrence ledger ───────────────────────────────────────────

#[async_trait]
impl LedgerStore for PgLedger {
    async fn fetch(
        &self,
        key: &OccurrenceKey,
    ) -> Result<Option<WeeklyOccurrence>, LedgerStoreError> {
        sqlx::query_as::<_, WeeklyOccurrence>(&format!(
            "SELECT {OCCURRENCE_COLUMNS} FROM weekly_occurrences
             WHERE asset_code = $1 AND iso_year = $2 AND iso_week = $3"
        ))
        .bind(&key.asset_code)
        .bind(key.iso_year)
        .bind(key.iso_week as i32)
        .fetch_optional(&self.pool)
        .await
        .map_err(unavailable)
    }

    async fn insert(&self, occurrence: &WeeklyOccurrence) -> Result<(), LedgerStoreError> {
        let result = sqlx::query(
            "INSERT INTO weekly_occurrences
                 (id, asset_code, iso_year, iso_week, target_date, executed_on,
                  result, suppressed, state, plan_id, plan_description,
                  plan_responsible, created_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)",
        )
        .bind(occurrence.id)
        .bind(&occurrence.asset_code)
        .bind(occurrence.iso_year)
        .bind(occurrence.iso_week as i32)
        .bind(occurrence.target_date)
        .bind(occurrence.executed_on)
        .bind(&occurrence.result)
        .bind(occurrence.suppressed)
        .bind(occurrence.state.as_str())
        .bind(occurrence.plan_id)
        .bind(&occurrence.plan_description)
        .bind(&occurrence.plan_responsible)
        .bind(occurrence.created_at)
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => Ok(()),
            Err(sqlx::Error::Database(db)) if db.is_unique_violation() => {
                debug!(key = %occurrence.key(), "insert hit uniqueness constraint");
                Err(LedgerStoreError::Duplicate(occurrence.key()))
            }
            Err(e) => Err(unavailable(e)),
        }
    }

    async fn record_execution(
        &self,
        key: &OccurrenceKey,
        executed_on: NaiveDate,
        result: &str,
        state: OccurrenceState,
    ) -> Result<Option<WeeklyOccurrence>, LedgerStoreError> {
        sqlx::query_as::<_, WeeklyOccurrence>(&format!(
            "UPDATE weekly_occurrences
             SET executed_on = $4, result = $5, state = $6
             WHERE asset_code = $1 AND iso_year = $2 AND iso_week = $3
             RETURNING {OCCURRENCE_COLUMNS}"
        ))
        .bind(&key.asset_code)
        .bind(key.iso_year)
        .bind(key.iso_week as i32)
        .bind(executed_on)
        .bind(result)
        .bind(state.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(unavailable)
    }

    async fn set_suppressed(
        &self,
        key: &OccurrenceKey,
        state: OccurrenceState,
    ) -> Result<Option<WeeklyOccurrence>, LedgerStoreError> {
        sqlx::query_as::<_, WeeklyOccurrence>(&format!(
            "UPDATE weekly_occurrences
             SET suppressed = TRUE, state = $4
             WHERE asset_code = $1 AND iso_year = $2 AND iso_week = $3
             RETURNING {OCCURRENCE_COLUMNS}"
        ))
        .bind(&key.asset_code)
        .bind(key.iso_year)
        .bind(key.iso_week as i32)
        .bind(state.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(unavailable)
    }

    async fn list_for_week(
        &self,
        iso_year: i32,
        iso_week: u32,
    ) -> Result<Vec<WeeklyOccurrence>, LedgerStoreError> {
        sqlx::query_as::<_, WeeklyOccurrence>(&format!(
            "SELECT {OCCURRENCE_COLUMNS} FROM weekly_occurrences
             WHERE iso_year = $1 AND iso_week = $2
             ORDER BY asset_code"
        ))
        .bind(iso_year)
        .bind(iso_week as i32)
        .fetch_all(&self.pool)
        .await
        .map_err(unavailable)
    }

    async fn list_for_asset(
        &self,
        asset_code: &str,
    ) -> Result<Vec<WeeklyOccurrence>, LedgerStoreError> {
        sqlx::query_as::<_, WeeklyOccurrence>(&format!(
            "SELECT {OCCURRENCE_COLUMNS} FROM weekly_occurrences
             WHERE asset_code = $1
             ORDER BY iso_year, iso_week"
        ))
        .bind(asset_code)
        .fetch_all(&self.pool)
        .await
        .map_err(unavailable)
    }

    async fn deactivate_plan_sweep(
        &self,
        plan_id: Uuid,
        today: NaiveDate,
    ) -> Result<PlanSweep, LedgerStoreError> {
        let mut tx = self.pool.begin().await.map_err(unavailable)?;

        let deleted = sqlx::query(
            "DELETE FROM weekly_occurrences
             WHERE plan_id = $1 AND executed_on IS NULL AND target_date > $2",
        )
        .bind(plan_id)
        .bind(today)
        .execute(&mut *tx)
        .await
        .map_err(unavailable)?
        .rows_affected();

        let detached = sqlx::query(
            "UPDATE weekly_occurrences SET plan_id = NULL WHERE plan_id = $1",
        )
        .bind(plan_id)
        .execute(&mut *tx)
        .await
        .map_err(unavailable)?
        .rows_affected();

        tx.commit().await.map_err(unavailable)?;
        Ok(PlanSweep { deleted, detached })
    }

    async fn decommission_sweep(
        &self,
        asset_code: &str,
        effective: NaiveDate,
    ) -> Result<u64, LedgerStoreError> {
        let mut tx = self.pool.begin().await.map_err(unavailable)?;

        let deleted = sqlx::query(
            "DELETE FROM weekly_occurrences
             WHERE asset_code = $1 AND executed_on IS NULL AND target_date >= $2",
        )
        .bind(asset_code)
        .bind(effective)
        .execute(&mut *tx)
        .await
        .map_err(unavailable)?
        .rows_affected();

        tx.commit().await.map_err(unavailable)?;
        Ok(deleted)
    }
}

// ── Plan store ──────────────────────────────────────────────────

#[async_trait]
impl PlanStore for PgLedger {
    async fn insert(&self, plan: &MaintenancePlan) -> Result<(), EngineError> {
        sqlx::query(
            "INSERT INTO maintenance_plans
                 (id, asset_code, cadence, checklist, active, description,
                  responsible, created_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8)",
        )
        .bind(plan.id)
        .bind(&plan.asset_code)
        .bind(plan.cadence.to_string())
        .bind(&plan.checklist)
        .bind(plan.active)
        .bind(&plan.description)
        .bind(&plan.responsible)
        .bind(plan.created_at)
        .execute(&self.pool)
        .await
        .map_err(storage_err)?;
        Ok(())
    }

    async fn get(&self, id: Uuid) -> Result<Option<MaintenancePlan>, EngineError> {
        let row = sqlx::query(&format!(
            "SELECT {PLAN_COLUMNS} FROM maintenance_plans WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(storage_err)?;
        row.map(|r| plan_from_row(&r)).transpose().map_err(storage_err)
    }

    async fn list_for_asset(&self, asset_code: &str) -> Result<Vec<MaintenancePlan>, EngineError> {
        let rows = sqlx::query(&format!(
            "SELECT {PLAN_COLUMNS} FROM maintenance_plans
             WHERE asset_code = $1
             ORDER BY created_at"
        ))
        .bind(asset_code)
        .fetch_all(&self.pool)
        .await
        .map_err(storage_err)?;
        rows.iter().map(plan_from_row).collect::<Result<Vec<_>, _>>().map_err(storage_err)
    }

    async fn set_active(&self, id: Uuid, active: bool) -> Result<bool, EngineError> {
        let result = sqlx::query("UPDATE maintenance_plans SET active = $2 WHERE id = $1")
            .bind(id)
            .bind(active)
            .execute(&self.pool)
            .await
            .map_err(storage_err)?;
        Ok(result.rows_affected() > 0)
    }
}

// ── Asset registry ──────────────────────────────────────────────

#[async_trait]
impl AssetRegistry for PgLedger {
    async fn asset_state(&self, code: &str) -> Result<Option<AssetState>, EngineError> {
        let row = sqlx::query("SELECT decommissioned_at FROM assets WHERE code = $1")
            .bind(code)
            .fetch_optional(&self.pool)
            .await
            .map_err(storage_err)?;

        match row {
            None => Ok(None),
            Some(r) => {
                let since: Option<DateTime<Utc>> =
                    r.try_get("decommissioned_at").map_err(storage_err)?;
                Ok(Some(match since {
                    Some(since) => AssetState::Decommissioned { since },
                    None => AssetState::Active,
                }))
            }
        }
    }
}
