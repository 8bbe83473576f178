//! SurrealDB schema migrations and initialization
//!
//! This module provides initialization functions to set up all tables
//! with proper constraints and indexes.

use crate::Result;
use surrealdb::engine::any::Any;
use surrealdb::Surreal;
use tracing::{debug, info};

/// Initialize all estimate pipeline tables in SurrealDB
///
/// Safe to call multiple times (idempotent).
pub async fn init_schema(db: &Surreal<Any>) -> Result<()> {
    info!("Initializing estimate pipeline schema");

    init_pipeline_runs_table(db).await?;
    init_stage_outputs_table(db).await?;
    init_progress_table(db).await?;

    info!("Estimate pipeline schema initialization complete");
    Ok(())
}

/// Initialize `pipeline_runs` table
///
/// Schema:
/// ```text
/// TABLE pipeline_runs {
///   run_id:            STRING (unique)
///   stages:            ARRAY<STRING>
///   stage_status:      OBJECT (stage -> pending|running|retrying|completed|failed)
///   scores:            OBJECT (stage -> 0..100)
///   retries:           OBJECT (stage -> INT)
///   current_stage:     STRING?
///   completed_stages:  ARRAY<STRING>
///   progress:          INT
///   status:            STRING (running | completed | failed)
///   error:             STRING?
///   failed_stage:      STRING?
///   history:           ARRAY<OBJECT>
///   started_at:        DATETIME (indexed)
///   updated_at:        DATETIME
///   completed_at:      DATETIME?
/// }
/// ```
///
/// Transition rules and terminal immutability are enforced by
/// `PipelineRun` before every write.
async fn init_pipeline_runs_table(db: &Surreal<Any>) -> Result<()> {
    debug!("Initializing pipeline_runs table");

    let sql = r#"
        DEFINE TABLE IF NOT EXISTS pipeline_runs AS
            SCHEMALESS
            PERMISSIONS
                FOR create FULL
                FOR read FULL
                FOR update FULL
                FOR delete NONE;

        DEFINE INDEX IF NOT EXISTS idx_run_id ON TABLE pipeline_runs COLUMNS run_id UNIQUE;
        DEFINE INDEX IF NOT EXISTS idx_status ON TABLE pipeline_runs COLUMNS status;
        DEFINE INDEX IF NOT EXISTS idx_started_at ON TABLE pipeline_runs COLUMNS started_at;
    "#;

    db.query(sql).await?.check()?;
    info!("✓ pipeline_runs table initialized");
    Ok(())
}

/// Initialize `stage_outputs` table
///
/// Append-only: `(run_id, stage)` is unique and rows are never updated.
async fn init_stage_outputs_table(db: &Surreal<Any>) -> Result<()> {
    debug!("Initializing stage_outputs table");

    let sql = r#"
        DEFINE TABLE IF NOT EXISTS stage_outputs AS
            SCHEMALESS
            PERMISSIONS
                FOR create FULL
                FOR read FULL
                FOR update NONE
                FOR delete NONE;

        DEFINE INDEX IF NOT EXISTS idx_run_stage ON TABLE stage_outputs COLUMNS run_id, stage UNIQUE;
        DEFINE INDEX IF NOT EXISTS idx_output_run_id ON TABLE stage_outputs COLUMNS run_id;
    "#;

    db.query(sql).await?.check()?;
    info!("✓ stage_outputs table initialized");
    Ok(())
}

/// Initialize `estimate_progress` table (UI projection, one row per run)
async fn init_progress_table(db: &Surreal<Any>) -> Result<()> {
    debug!("Initializing estimate_progress table");

    let sql = r#"
        DEFINE TABLE IF NOT EXISTS estimate_progress AS
            SCHEMALESS
            PERMISSIONS
                FOR create FULL
                FOR read FULL
                FOR update FULL
                FOR delete FULL;
    "#;

    db.query(sql).await?.check()?;
    info!("✓ estimate_progress table initialized");
    Ok(())
}
