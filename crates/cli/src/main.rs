//! wartung — operational CLI for the maintenance ledger.
//!
//! Thin wrapper over the engine against the Postgres backend: schema
//! bootstrap, asset/plan administration, execution logging, and weekly
//! reports.

use std::sync::Arc;

use anyhow::{bail, Context, Result};
use chrono::{NaiveDate, NaiveTime, TimeZone, Utc};
use clap::{Parser, Subcommand};
use uuid::Uuid;

use wartung_core::{load_dotenv, Config};
use wartung_ledger::{
    LifecycleCoordinator, MaintenanceEngine, PgLedger, WeeklyOccurrence,
};
use wartung_schedule::{Cadence, MaintenancePlan, PlanStore};

/// Preventive-maintenance ledger administration.
#[derive(Parser, Debug)]
#[command(name = "wartung", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Create tables and constraints if they do not exist.
    InitSchema,

    /// Register an asset (or update its name).
    AddAsset {
        code: String,
        #[arg(long, default_value = "")]
        name: String,
    },

    /// Create a maintenance plan for an asset.
    AddPlan {
        asset: String,
        /// Cadence descriptor, e.g. "mon" or "tue/2".
        #[arg(long, default_value = "mon")]
        cadence: String,
        #[arg(long, default_value = "")]
        description: String,
        #[arg(long, default_value = "")]
        responsible: String,
        /// Checklist template as a JSON document.
        #[arg(long)]
        checklist: Option<String>,
    },

    /// Materialize a plan's ledger rows for a year.
    Materialize {
        plan: Uuid,
        #[arg(long)]
        year: i32,
        #[arg(long, default_value_t = 1)]
        from_week: u32,
    },

    /// Log a performed execution for an asset week.
    Log {
        asset: String,
        year: i32,
        week: u32,
        /// Execution date (YYYY-MM-DD).
        #[arg(long)]
        date: NaiveDate,
        #[arg(long, default_value = "")]
        result: String,
    },

    /// Mark a week as intentionally not due.
    Suppress { asset: String, year: i32, week: u32 },

    /// Report all ledger rows for an ISO week.
    Week { year: i32, week: u32 },

    /// Report the full ledger history of an asset.
    Asset { code: String },

    /// List an asset's plans.
    Plans { asset: String },

    /// Deactivate a plan and sweep its future rows.
    DeactivatePlan { plan: Uuid },

    /// Decommission an asset and sweep its future rows.
    Decommission {
        asset: String,
        /// Effective date (YYYY-MM-DD); rows targeted on or after it are
        /// swept.
        #[arg(long)]
        effective: NaiveDate,
    },
}

fn print_rows(rows: &[WeeklyOccurrence]) {
    if rows.is_empty() {
        println!("(no ledger rows)");
        return;
    }
    for row in rows {
        let executed = row
            .executed_on
            .map(|d| d.to_string())
            .unwrap_or_else(|| "-".to_string());
        println!(
            "{:<12} {}-W{:02}  target {}  executed {:<10}  {:<17}  {}",
            row.asset_code,
            row.iso_year,
            row.iso_week,
            row.target_date,
            executed,
            row.state.to_string(),
            row.plan_description,
        );
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_target(false)
        .init();

    load_dotenv();
    let config = Config::from_env();
    config.log_summary();

    let cli = Cli::parse();

    let store = Arc::new(
        PgLedger::connect(
            &config.postgres.connection_string(),
            config.postgres.max_connections,
        )
        .await
        .context("failed to connect to PostgreSQL")?,
    );

    let engine = MaintenanceEngine::new(store.clone(), store.clone(), store.clone());
    let coordinator = LifecycleCoordinator::new(store.clone(), store.clone(), store.clone());

    match cli.command {
        Command::InitSchema => {
            store.init_schema().await.context("schema init failed")?;
            println!("schema ready");
        }

        Command::AddAsset { code, name } => {
            store
                .insert_asset(&code, &name)
                .await
                .with_context(|| format!("failed to register asset '{code}'"))?;
            println!("asset '{code}' registered");
        }

        Command::AddPlan {
            asset,
            cadence,
            description,
            responsible,
            checklist,
        } => {
            let cadence = Cadence::parse(&cadence).context("invalid cadence descriptor")?;
            let mut plan = MaintenancePlan::new(asset, cadence, description, responsible);
            plan.checklist = checklist
                .map(|raw| serde_json::from_str(&raw))
                .transpose()
                .context("invalid checklist JSON")?;
            PlanStore::insert(store.as_ref(), &plan)
                .await
                .context("failed to create plan")?;
            println!("plan {} created for '{}'", plan.id, plan.asset_code);
        }

        Command::Materialize {
            plan,
            year,
            from_week,
        } => {
            let count = engine
                .materialize_year(plan, year, from_week)
                .await
                .context("materialization failed")?;
            println!("{count} weeks ensured for plan {plan} in {year}");
        }

        Command::Log {
            asset,
            year,
            week,
            date,
            result,
        } => {
            let row = engine
                .record_execution(&asset, year, week, date, &result)
                .await
                .context("failed to record execution")?;
            println!("{} -> {}", row.key(), row.state);
        }

        Command::Suppress { asset, year, week } => {
            let row = engine
                .suppress_week(&asset, year, week)
                .await
                .context("failed to suppress week")?;
            println!("{} -> {}", row.key(), row.state);
        }

        Command::Week { year, week } => {
            let rows = engine
                .list_for_week(year, week)
                .await
                .context("failed to list week")?;
            print_rows(&rows);
        }

        Command::Asset { code } => {
            let rows = engine
                .list_for_asset(&code)
                .await
                .with_context(|| format!("failed to list asset '{code}'"))?;
            print_rows(&rows);
        }

        Command::Plans { asset } => {
            let plans = PlanStore::list_for_asset(store.as_ref(), &asset)
                .await
                .with_context(|| format!("failed to list plans for '{asset}'"))?;
            if plans.is_empty() {
                println!("(no plans)");
            }
            for plan in plans {
                let flag = if plan.active { "active" } else { "inactive" };
                println!(
                    "{}  {}  cadence {}  {}  ({})",
                    plan.id, flag, plan.cadence, plan.description, plan.responsible
                );
            }
        }

        Command::DeactivatePlan { plan } => {
            let sweep = coordinator
                .on_plan_deactivated(plan)
                .await
                .context("plan deactivation failed")?;
            println!(
                "plan {plan} deactivated: {} future rows deleted, {} rows detached",
                sweep.deleted, sweep.detached
            );
        }

        Command::Decommission { asset, effective } => {
            let since = Utc.from_utc_datetime(&effective.and_time(NaiveTime::MIN));
            let marked = store
                .mark_decommissioned(&asset, since)
                .await
                .context("failed to mark asset decommissioned")?;
            if !marked {
                bail!("unknown asset '{asset}'");
            }
            let deleted = coordinator
                .on_asset_decommissioned(&asset, effective)
                .await
                .context("decommission sweep failed")?;
            println!("asset '{asset}' decommissioned, {deleted} future rows deleted");
        }
    }

    Ok(())
}
