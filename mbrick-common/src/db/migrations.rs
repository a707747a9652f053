//! Database schema migrations
//!
//! Versioned, idempotent schema changes applied after the base tables exist.
//! Never modify an existing migration; add a new one and bump
//! `CURRENT_SCHEMA_VERSION`.

use crate::Result;
use sqlx::SqlitePool;
use tracing::info;

/// Current schema version
const CURRENT_SCHEMA_VERSION: i32 = 2;

/// Get current schema version from database (0 when nothing was applied)
pub async fn get_schema_version(pool: &SqlitePool) -> Result<i32> {
    let version: Option<i32> =
        sqlx::query_scalar("SELECT version FROM schema_version ORDER BY version DESC LIMIT 1")
            .fetch_optional(pool)
            .await?;

    Ok(version.unwrap_or(0))
}

async fn set_schema_version(pool: &SqlitePool, version: i32) -> Result<()> {
    sqlx::query("INSERT INTO schema_version (version) VALUES (?)")
        .bind(version)
        .execute(pool)
        .await?;

    Ok(())
}

/// Run all pending migrations
pub async fn run_migrations(pool: &SqlitePool) -> Result<()> {
    let current_version = get_schema_version(pool).await?;

    if current_version >= CURRENT_SCHEMA_VERSION {
        info!("Database schema is up to date (v{})", current_version);
        return Ok(());
    }

    info!(
        "Migrating database schema from v{} to v{}",
        current_version, CURRENT_SCHEMA_VERSION
    );

    if current_version < 1 {
        migrate_v1(pool).await?;
        set_schema_version(pool, 1).await?;
    }

    if current_version < 2 {
        migrate_v2(pool).await?;
        set_schema_version(pool, 2).await?;
    }

    Ok(())
}

/// v1: codes are unique among live rows only, so a soft-deleted set can be created again
async fn migrate_v1(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        "CREATE UNIQUE INDEX IF NOT EXISTS idx_sets_set_num_live ON sets(set_num) WHERE deleted_at IS NULL",
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE UNIQUE INDEX IF NOT EXISTS idx_parts_part_num_live ON parts(part_num) WHERE deleted_at IS NULL",
    )
    .execute(pool)
    .await?;

    info!("Migration v1: added live-row unique indexes on set_num and part_num");
    Ok(())
}

/// v2: lookup indexes for per-set queries
async fn migrate_v2(pool: &SqlitePool) -> Result<()> {
    for sql in [
        "CREATE INDEX IF NOT EXISTS idx_set_parts_set_id ON set_parts(set_id)",
        "CREATE INDEX IF NOT EXISTS idx_set_parts_part_id ON set_parts(part_id)",
        "CREATE INDEX IF NOT EXISTS idx_missing_parts_set_id ON missing_parts(set_id)",
        "CREATE INDEX IF NOT EXISTS idx_missing_parts_part_id ON missing_parts(part_id)",
    ] {
        sqlx::query(sql).execute(pool).await?;
    }

    info!("Migration v2: added set_id/part_id lookup indexes");
    Ok(())
}
