//! Set part persistence

use super::parts::{joined_part, part_select_list};
use super::soft_delete::{live, soft_delete, soft_delete_by_set, Table, LIVE};
use super::{SetPartStore, BATCH_SIZE};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use mbrick_common::models::{NewSetPart, SetPart};
use mbrick_common::{Error, Result};
use sqlx::sqlite::SqliteRow;
use sqlx::{QueryBuilder, Row, Sqlite, SqliteConnection, SqlitePool};

const SET_PART_COLUMNS: &str = "sp.id, sp.set_id, sp.part_id, sp.color_id, sp.color_name, \
                                sp.color_hex, sp.quantity, sp.is_spare, sp.created_at, \
                                sp.updated_at, sp.deleted_at";

fn set_part_from_row(row: &SqliteRow) -> Result<SetPart> {
    Ok(SetPart {
        id: row.try_get("id")?,
        set_id: row.try_get("set_id")?,
        part_id: row.try_get("part_id")?,
        color_id: row.try_get("color_id")?,
        color_name: row.try_get("color_name")?,
        color_hex: row.try_get("color_hex")?,
        quantity: row.try_get("quantity")?,
        is_spare: row.try_get("is_spare")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
        deleted_at: row.try_get("deleted_at")?,
        part: None,
    })
}

/// Insert rows `BATCH_SIZE` at a time on an open connection
async fn insert_chunks(
    conn: &mut SqliteConnection,
    set_parts: &[NewSetPart],
    now: DateTime<Utc>,
) -> Result<usize> {
    for chunk in set_parts.chunks(BATCH_SIZE) {
        let mut builder: QueryBuilder<Sqlite> = QueryBuilder::new(
            "INSERT INTO set_parts (set_id, part_id, color_id, color_name, color_hex, \
             quantity, is_spare, created_at, updated_at) ",
        );
        builder.push_values(chunk, |mut b, sp| {
            b.push_bind(sp.set_id)
                .push_bind(sp.part_id)
                .push_bind(sp.color_id)
                .push_bind(&sp.color_name)
                .push_bind(&sp.color_hex)
                .push_bind(sp.quantity)
                .push_bind(sp.is_spare)
                .push_bind(now)
                .push_bind(now);
        });
        builder.build().execute(&mut *conn).await?;
    }
    Ok(set_parts.len())
}

pub struct SqliteSetPartStore {
    pool: SqlitePool,
}

impl SqliteSetPartStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SetPartStore for SqliteSetPartStore {
    async fn create(&self, set_part: NewSetPart) -> Result<SetPart> {
        let now = Utc::now();
        let result = sqlx::query(
            r#"
            INSERT INTO set_parts (
                set_id, part_id, color_id, color_name, color_hex,
                quantity, is_spare, created_at, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(set_part.set_id)
        .bind(set_part.part_id)
        .bind(set_part.color_id)
        .bind(&set_part.color_name)
        .bind(&set_part.color_hex)
        .bind(set_part.quantity)
        .bind(set_part.is_spare)
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await?;

        Ok(SetPart {
            id: result.last_insert_rowid(),
            set_id: set_part.set_id,
            part_id: set_part.part_id,
            color_id: set_part.color_id,
            color_name: set_part.color_name,
            color_hex: set_part.color_hex,
            quantity: set_part.quantity,
            is_spare: set_part.is_spare,
            created_at: now,
            updated_at: now,
            deleted_at: None,
            part: None,
        })
    }

    async fn create_batch(&self, set_parts: Vec<NewSetPart>) -> Result<usize> {
        if set_parts.is_empty() {
            return Ok(0);
        }

        let mut tx = self.pool.begin().await?;
        let inserted = insert_chunks(&mut *tx, &set_parts, Utc::now()).await?;
        tx.commit().await?;

        tracing::debug!(rows = inserted, "Inserted set parts");
        Ok(inserted)
    }

    async fn get(&self, id: i64) -> Result<Option<SetPart>> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM set_parts sp WHERE sp.id = ? AND {}",
            SET_PART_COLUMNS,
            live("sp")
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        row.map(|row| set_part_from_row(&row)).transpose()
    }

    async fn get_by_set(&self, set_id: i64) -> Result<Vec<SetPart>> {
        let rows = sqlx::query(&format!(
            r#"
            SELECT {}, {}
            FROM set_parts sp
            LEFT JOIN parts p ON p.id = sp.part_id
            WHERE sp.set_id = ? AND {}
            ORDER BY sp.id
            "#,
            SET_PART_COLUMNS,
            part_select_list("p", "p_"),
            live("sp")
        ))
        .bind(set_id)
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| {
                let mut set_part = set_part_from_row(row)?;
                set_part.part = joined_part(row, "p_")?;
                Ok(set_part)
            })
            .collect()
    }

    async fn update(&self, set_part: &SetPart) -> Result<SetPart> {
        let now = Utc::now();
        let result = sqlx::query(&format!(
            r#"
            UPDATE set_parts SET
                part_id = ?, color_id = ?, color_name = ?, color_hex = ?,
                quantity = ?, is_spare = ?, updated_at = ?
            WHERE id = ? AND {}
            "#,
            LIVE
        ))
        .bind(set_part.part_id)
        .bind(set_part.color_id)
        .bind(&set_part.color_name)
        .bind(&set_part.color_hex)
        .bind(set_part.quantity)
        .bind(set_part.is_spare)
        .bind(now)
        .bind(set_part.id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(Error::NotFound(format!("set part {}", set_part.id)));
        }

        Ok(SetPart {
            updated_at: now,
            ..set_part.clone()
        })
    }

    async fn delete(&self, id: i64) -> Result<()> {
        if soft_delete(&self.pool, Table::SetParts, id).await? {
            Ok(())
        } else {
            Err(Error::NotFound(format!("set part {}", id)))
        }
    }

    async fn delete_by_set(&self, set_id: i64) -> Result<u64> {
        soft_delete_by_set(&self.pool, Table::SetParts, set_id).await
    }

    async fn replace_for_set(&self, set_id: i64, set_parts: Vec<NewSetPart>) -> Result<usize> {
        let mut tx = self.pool.begin().await?;

        let removed = soft_delete_by_set(&mut *tx, Table::SetParts, set_id).await?;
        let inserted = insert_chunks(&mut *tx, &set_parts, Utc::now()).await?;

        tx.commit().await?;

        tracing::debug!(set_id, removed, inserted, "Replaced set parts");
        Ok(inserted)
    }
}
