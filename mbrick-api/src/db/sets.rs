//! Set persistence

use super::missing_parts::load_by_set;
use super::soft_delete::{soft_delete, Table, LIVE};
use super::SetStore;
use async_trait::async_trait;
use chrono::Utc;
use mbrick_common::models::{NewSet, Set, SetWithMissingParts};
use mbrick_common::{Error, Result};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};

const SET_COLUMNS: &str = "id, set_num, name, year, theme_id, num_parts, set_img_url, set_url, \
                           last_modified, created_at, updated_at, deleted_at";

fn set_from_row(row: &SqliteRow) -> Result<Set> {
    Ok(Set {
        id: row.try_get("id")?,
        set_num: row.try_get("set_num")?,
        name: row.try_get("name")?,
        year: row.try_get("year")?,
        theme_id: row.try_get("theme_id")?,
        num_parts: row.try_get("num_parts")?,
        set_img_url: row.try_get("set_img_url")?,
        set_url: row.try_get("set_url")?,
        last_modified: row.try_get("last_modified")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
        deleted_at: row.try_get("deleted_at")?,
    })
}

pub struct SqliteSetStore {
    pool: SqlitePool,
}

impl SqliteSetStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    fn select(filter: &str) -> String {
        format!(
            "SELECT {} FROM sets WHERE {} AND {} ORDER BY id",
            SET_COLUMNS, LIVE, filter
        )
    }
}

#[async_trait]
impl SetStore for SqliteSetStore {
    async fn create(&self, set: NewSet) -> Result<Set> {
        let now = Utc::now();
        let result = sqlx::query(
            r#"
            INSERT INTO sets (
                set_num, name, year, theme_id, num_parts, set_img_url, set_url,
                last_modified, created_at, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&set.set_num)
        .bind(&set.name)
        .bind(set.year)
        .bind(set.theme_id)
        .bind(set.num_parts)
        .bind(&set.set_img_url)
        .bind(&set.set_url)
        .bind(set.last_modified)
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(|e| Error::from_insert(e, format!("set with number {}", set.set_num)))?;

        Ok(Set {
            id: result.last_insert_rowid(),
            set_num: set.set_num,
            name: set.name,
            year: set.year,
            theme_id: set.theme_id,
            num_parts: set.num_parts,
            set_img_url: set.set_img_url,
            set_url: set.set_url,
            last_modified: set.last_modified,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        })
    }

    async fn get(&self, id: i64) -> Result<Option<Set>> {
        let row = sqlx::query(&Self::select("id = ?"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.map(|row| set_from_row(&row)).transpose()
    }

    async fn get_by_set_num(&self, set_num: &str) -> Result<Option<Set>> {
        let row = sqlx::query(&Self::select("set_num = ?"))
            .bind(set_num)
            .fetch_optional(&self.pool)
            .await?;
        row.map(|row| set_from_row(&row)).transpose()
    }

    async fn get_all(&self) -> Result<Vec<Set>> {
        let rows = sqlx::query(&Self::select("1 = 1"))
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(set_from_row).collect()
    }

    async fn update(&self, set: &Set) -> Result<Set> {
        let now = Utc::now();
        let result = sqlx::query(&format!(
            r#"
            UPDATE sets SET
                name = ?, year = ?, theme_id = ?, num_parts = ?, set_img_url = ?, set_url = ?,
                last_modified = ?, updated_at = ?
            WHERE id = ? AND {}
            "#,
            LIVE
        ))
        .bind(&set.name)
        .bind(set.year)
        .bind(set.theme_id)
        .bind(set.num_parts)
        .bind(&set.set_img_url)
        .bind(&set.set_url)
        .bind(set.last_modified)
        .bind(now)
        .bind(set.id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(Error::NotFound(format!("set {}", set.id)));
        }

        Ok(Set {
            updated_at: now,
            ..set.clone()
        })
    }

    async fn delete(&self, id: i64) -> Result<()> {
        if soft_delete(&self.pool, Table::Sets, id).await? {
            Ok(())
        } else {
            Err(Error::NotFound(format!("set {}", id)))
        }
    }

    async fn get_with_missing_parts(&self, id: i64) -> Result<Option<SetWithMissingParts>> {
        let Some(set) = self.get(id).await? else {
            return Ok(None);
        };
        let missing_parts = load_by_set(&self.pool, id, false).await?;
        Ok(Some(SetWithMissingParts { set, missing_parts }))
    }
}
