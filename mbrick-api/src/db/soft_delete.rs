//! Soft-delete support shared by the SQLite stores
//!
//! Rows are never erased: deleting stamps `deleted_at`, and every read filters
//! on [`LIVE`] (or [`live`] for aliased joins).

use chrono::Utc;
use mbrick_common::Result;
use sqlx::{Executor, Sqlite};

/// Predicate selecting rows that have not been deleted
pub(crate) const LIVE: &str = "deleted_at IS NULL";

/// [`LIVE`] for a table referenced through an alias
pub(crate) fn live(alias: &str) -> String {
    format!("{}.deleted_at IS NULL", alias)
}

/// Tables that support soft deletion
#[derive(Debug, Clone, Copy)]
pub(crate) enum Table {
    Sets,
    Parts,
    SetParts,
    MissingParts,
}

impl Table {
    pub(crate) fn as_str(self) -> &'static str {
        match self {
            Table::Sets => "sets",
            Table::Parts => "parts",
            Table::SetParts => "set_parts",
            Table::MissingParts => "missing_parts",
        }
    }
}

/// Soft delete one live row by id; false when no live row matched
pub(crate) async fn soft_delete<'e, E>(executor: E, table: Table, id: i64) -> Result<bool>
where
    E: Executor<'e, Database = Sqlite>,
{
    let now = Utc::now();
    let sql = format!(
        "UPDATE {} SET deleted_at = ?, updated_at = ? WHERE id = ? AND {}",
        table.as_str(),
        LIVE
    );
    let result = sqlx::query(&sql)
        .bind(now)
        .bind(now)
        .bind(id)
        .execute(executor)
        .await?;

    Ok(result.rows_affected() > 0)
}

/// Soft delete every live row whose `set_id` matches
pub(crate) async fn soft_delete_by_set<'e, E>(executor: E, table: Table, set_id: i64) -> Result<u64>
where
    E: Executor<'e, Database = Sqlite>,
{
    let now = Utc::now();
    let sql = format!(
        "UPDATE {} SET deleted_at = ?, updated_at = ? WHERE set_id = ? AND {}",
        table.as_str(),
        LIVE
    );
    let result = sqlx::query(&sql)
        .bind(now)
        .bind(now)
        .bind(set_id)
        .execute(executor)
        .await?;

    Ok(result.rows_affected())
}
