//! Missing part persistence

use super::parts::{joined_part, part_select_list};
use super::soft_delete::{live, soft_delete, Table, LIVE};
use super::MissingPartStore;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use mbrick_common::models::{MissingPart, NewMissingPart};
use mbrick_common::{Error, Result};
use sqlx::sqlite::SqliteRow;
use sqlx::{Executor, Row, Sqlite, SqlitePool};

const MISSING_PART_COLUMNS: &str = "mp.id, mp.set_id, mp.part_id, mp.color_id, mp.color_name, \
                                    mp.color_hex, mp.quantity, mp.is_missing, mp.notes, \
                                    mp.created_at, mp.updated_at, mp.deleted_at";

fn missing_part_from_row(row: &SqliteRow) -> Result<MissingPart> {
    Ok(MissingPart {
        id: row.try_get("id")?,
        set_id: row.try_get("set_id")?,
        part_id: row.try_get("part_id")?,
        color_id: row.try_get("color_id")?,
        color_name: row.try_get("color_name")?,
        color_hex: row.try_get("color_hex")?,
        quantity: row.try_get("quantity")?,
        is_missing: row.try_get("is_missing")?,
        notes: row.try_get("notes")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
        deleted_at: row.try_get("deleted_at")?,
        part: None,
    })
}

/// Live missing parts of a set with their parts attached, oldest first
///
/// Shared with the set store, which embeds these in a set response.
pub(crate) async fn load_by_set(
    pool: &SqlitePool,
    set_id: i64,
    missing_only: bool,
) -> Result<Vec<MissingPart>> {
    let flag_filter = if missing_only { "AND mp.is_missing = 1" } else { "" };
    let rows = sqlx::query(&format!(
        r#"
        SELECT {}, {}
        FROM missing_parts mp
        LEFT JOIN parts p ON p.id = mp.part_id
        WHERE mp.set_id = ? AND {} {}
        ORDER BY mp.id
        "#,
        MISSING_PART_COLUMNS,
        part_select_list("p", "p_"),
        live("mp"),
        flag_filter
    ))
    .bind(set_id)
    .fetch_all(pool)
    .await?;

    rows.iter()
        .map(|row| {
            let mut missing_part = missing_part_from_row(row)?;
            missing_part.part = joined_part(row, "p_")?;
            Ok(missing_part)
        })
        .collect()
}

async fn insert_one<'e, E>(
    executor: E,
    missing_part: NewMissingPart,
    now: DateTime<Utc>,
) -> Result<MissingPart>
where
    E: Executor<'e, Database = Sqlite>,
{
    let result = sqlx::query(
        r#"
        INSERT INTO missing_parts (
            set_id, part_id, color_id, color_name, color_hex,
            quantity, is_missing, notes, created_at, updated_at
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(missing_part.set_id)
    .bind(missing_part.part_id)
    .bind(missing_part.color_id)
    .bind(&missing_part.color_name)
    .bind(&missing_part.color_hex)
    .bind(missing_part.quantity)
    .bind(missing_part.is_missing)
    .bind(&missing_part.notes)
    .bind(now)
    .bind(now)
    .execute(executor)
    .await?;

    Ok(MissingPart {
        id: result.last_insert_rowid(),
        set_id: missing_part.set_id,
        part_id: missing_part.part_id,
        color_id: missing_part.color_id,
        color_name: missing_part.color_name,
        color_hex: missing_part.color_hex,
        quantity: missing_part.quantity,
        is_missing: missing_part.is_missing,
        notes: missing_part.notes,
        created_at: now,
        updated_at: now,
        deleted_at: None,
        part: None,
    })
}

pub struct SqliteMissingPartStore {
    pool: SqlitePool,
}

impl SqliteMissingPartStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl MissingPartStore for SqliteMissingPartStore {
    async fn create(&self, missing_part: NewMissingPart) -> Result<MissingPart> {
        insert_one(&self.pool, missing_part, Utc::now()).await
    }

    async fn create_batch(&self, missing_parts: Vec<NewMissingPart>) -> Result<Vec<MissingPart>> {
        let now = Utc::now();
        let mut tx = self.pool.begin().await?;

        let mut created = Vec::with_capacity(missing_parts.len());
        for missing_part in missing_parts {
            created.push(insert_one(&mut *tx, missing_part, now).await?);
        }

        tx.commit().await?;
        Ok(created)
    }

    async fn get(&self, id: i64) -> Result<Option<MissingPart>> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM missing_parts mp WHERE mp.id = ? AND {}",
            MISSING_PART_COLUMNS,
            live("mp")
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        row.map(|row| missing_part_from_row(&row)).transpose()
    }

    async fn get_by_set(&self, set_id: i64) -> Result<Vec<MissingPart>> {
        load_by_set(&self.pool, set_id, false).await
    }

    async fn get_missing_by_set(&self, set_id: i64) -> Result<Vec<MissingPart>> {
        load_by_set(&self.pool, set_id, true).await
    }

    async fn get_all(&self) -> Result<Vec<MissingPart>> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM missing_parts mp WHERE {} ORDER BY mp.id",
            MISSING_PART_COLUMNS,
            live("mp")
        ))
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(missing_part_from_row).collect()
    }

    async fn update(&self, missing_part: &MissingPart) -> Result<MissingPart> {
        let now = Utc::now();
        let result = sqlx::query(&format!(
            r#"
            UPDATE missing_parts SET
                color_id = ?, color_name = ?, color_hex = ?, quantity = ?,
                is_missing = ?, notes = ?, updated_at = ?
            WHERE id = ? AND {}
            "#,
            LIVE
        ))
        .bind(missing_part.color_id)
        .bind(&missing_part.color_name)
        .bind(&missing_part.color_hex)
        .bind(missing_part.quantity)
        .bind(missing_part.is_missing)
        .bind(&missing_part.notes)
        .bind(now)
        .bind(missing_part.id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(Error::NotFound(format!("missing part {}", missing_part.id)));
        }

        Ok(MissingPart {
            updated_at: now,
            ..missing_part.clone()
        })
    }

    async fn delete(&self, id: i64) -> Result<()> {
        if soft_delete(&self.pool, Table::MissingParts, id).await? {
            Ok(())
        } else {
            Err(Error::NotFound(format!("missing part {}", id)))
        }
    }

    async fn set_missing(&self, id: i64, is_missing: bool) -> Result<()> {
        let result = sqlx::query(&format!(
            "UPDATE missing_parts SET is_missing = ?, updated_at = ? WHERE id = ? AND {}",
            LIVE
        ))
        .bind(is_missing)
        .bind(Utc::now())
        .bind(id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(Error::NotFound(format!("missing part {}", id)));
        }

        tracing::debug!(id, is_missing, "Updated missing flag");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{PartStore, SetStore, SqlitePartStore, SqliteSetStore};
    use mbrick_common::db::init_memory_database;
    use mbrick_common::models::{zero_timestamp, NewPart, NewSet};

    async fn fixture() -> (SqliteMissingPartStore, SqliteSetStore, i64, i64) {
        let pool = init_memory_database().await.unwrap();
        let sets = SqliteSetStore::new(pool.clone());
        let set = sets
            .create(NewSet {
                set_num: "10497-1".to_string(),
                name: "Galaxy Explorer".to_string(),
                year: 2022,
                theme_id: 721,
                num_parts: 1254,
                set_img_url: String::new(),
                set_url: String::new(),
                last_modified: zero_timestamp(),
            })
            .await
            .unwrap();
        let part = SqlitePartStore::new(pool.clone())
            .create(NewPart {
                part_num: "3001".to_string(),
                name: "Brick 2 x 4".to_string(),
                part_cat_id: 11,
                part_img_url: String::new(),
                part_url: String::new(),
                external_ids: "{}".to_string(),
                print_of: None,
            })
            .await
            .unwrap();
        (SqliteMissingPartStore::new(pool), sets, set.id, part.id)
    }

    fn missing(set_id: i64, part_id: i64, quantity: i64) -> NewMissingPart {
        NewMissingPart {
            set_id,
            part_id,
            color_id: 1,
            color_name: "Blue".to_string(),
            color_hex: "0055BF".to_string(),
            quantity,
            is_missing: true,
            notes: String::new(),
        }
    }

    #[tokio::test]
    async fn test_create_batch_returns_ids_and_attaches_parts_on_read() {
        let (store, _, set_id, part_id) = fixture().await;

        let created = store
            .create_batch(vec![missing(set_id, part_id, 2), missing(set_id, part_id, 1)])
            .await
            .unwrap();
        assert_eq!(created.len(), 2);
        assert_ne!(created[0].id, created[1].id);

        let rows = store.get_by_set(set_id).await.unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].part.as_ref().unwrap().part_num, "3001");
        assert_eq!(rows[0].quantity, 2);
    }

    #[tokio::test]
    async fn test_create_batch_writes_nothing_on_failure() {
        let (store, _, set_id, part_id) = fixture().await;

        let result = store
            .create_batch(vec![missing(set_id, part_id, 2), missing(set_id, part_id, 0)])
            .await;

        assert!(result.is_err());
        assert!(store.get_all().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_set_missing_filters_missing_only_reads() {
        let (store, _, set_id, part_id) = fixture().await;
        let a = store.create(missing(set_id, part_id, 2)).await.unwrap();
        store.create(missing(set_id, part_id, 1)).await.unwrap();

        store.set_missing(a.id, false).await.unwrap();

        assert_eq!(store.get_by_set(set_id).await.unwrap().len(), 2);
        let still_missing = store.get_missing_by_set(set_id).await.unwrap();
        assert_eq!(still_missing.len(), 1);
        assert_ne!(still_missing[0].id, a.id);

        store.set_missing(a.id, true).await.unwrap();
        assert_eq!(store.get_missing_by_set(set_id).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_set_missing_and_delete_on_absent_row() {
        let (store, _, set_id, part_id) = fixture().await;
        let mp = store.create(missing(set_id, part_id, 2)).await.unwrap();

        store.delete(mp.id).await.unwrap();

        assert!(store.get(mp.id).await.unwrap().is_none());
        assert!(matches!(store.set_missing(mp.id, false).await, Err(Error::NotFound(_))));
        assert!(matches!(store.delete(mp.id).await, Err(Error::NotFound(_))));
        assert!(matches!(store.set_missing(9999, true).await, Err(Error::NotFound(_))));
    }

    #[tokio::test]
    async fn test_set_store_embeds_missing_parts() {
        let (store, sets, set_id, part_id) = fixture().await;
        store.create(missing(set_id, part_id, 3)).await.unwrap();

        let with_missing = sets.get_with_missing_parts(set_id).await.unwrap().unwrap();
        assert_eq!(with_missing.missing_parts.len(), 1);
        assert_eq!(with_missing.missing_parts[0].quantity, 3);
        assert!(with_missing.missing_parts[0].part.is_some());
    }

    #[tokio::test]
    async fn test_update_notes_and_quantity() {
        let (store, _, set_id, part_id) = fixture().await;
        let mut mp = store.create(missing(set_id, part_id, 2)).await.unwrap();
        mp.notes = "checked bag 4".to_string();
        mp.quantity = 1;

        store.update(&mp).await.unwrap();

        let loaded = store.get(mp.id).await.unwrap().unwrap();
        assert_eq!(loaded.notes, "checked bag 4");
        assert_eq!(loaded.quantity, 1);
    }
}
