//! Part persistence

use super::soft_delete::{soft_delete, Table, LIVE};
use super::PartStore;
use async_trait::async_trait;
use chrono::Utc;
use mbrick_common::models::{NewPart, Part};
use mbrick_common::{Error, Result};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};

const PART_COLUMNS: [&str; 11] = [
    "id",
    "part_num",
    "name",
    "part_cat_id",
    "part_img_url",
    "part_url",
    "external_ids",
    "print_of",
    "created_at",
    "updated_at",
    "deleted_at",
];

/// Part columns of an aliased table, renamed with `prefix`
///
/// `part_select_list("p", "p_")` yields `p.id AS p_id, p.part_num AS p_part_num, ...`
pub(crate) fn part_select_list(alias: &str, prefix: &str) -> String {
    PART_COLUMNS
        .iter()
        .map(|col| format!("{alias}.{col} AS {prefix}{col}"))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Map a row to a part, reading columns named `{prefix}{column}`
pub(crate) fn part_from_row(row: &SqliteRow, prefix: &str) -> Result<Part> {
    let col = |name: &str| format!("{prefix}{name}");
    Ok(Part {
        id: row.try_get(col("id").as_str())?,
        part_num: row.try_get(col("part_num").as_str())?,
        name: row.try_get(col("name").as_str())?,
        part_cat_id: row.try_get(col("part_cat_id").as_str())?,
        part_img_url: row.try_get(col("part_img_url").as_str())?,
        part_url: row.try_get(col("part_url").as_str())?,
        external_ids: row.try_get(col("external_ids").as_str())?,
        print_of: row.try_get(col("print_of").as_str())?,
        created_at: row.try_get(col("created_at").as_str())?,
        updated_at: row.try_get(col("updated_at").as_str())?,
        deleted_at: row.try_get(col("deleted_at").as_str())?,
    })
}

/// Part attached to a joined row, if the join matched
pub(crate) fn joined_part(row: &SqliteRow, prefix: &str) -> Result<Option<Part>> {
    let id: Option<i64> = row.try_get(format!("{prefix}id").as_str())?;
    match id {
        Some(_) => Ok(Some(part_from_row(row, prefix)?)),
        None => Ok(None),
    }
}

pub struct SqlitePartStore {
    pool: SqlitePool,
}

impl SqlitePartStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    fn select(filter: &str) -> String {
        format!(
            "SELECT {} FROM parts WHERE {} AND {} ORDER BY part_num",
            PART_COLUMNS.join(", "),
            LIVE,
            filter
        )
    }
}

#[async_trait]
impl PartStore for SqlitePartStore {
    async fn create(&self, part: NewPart) -> Result<Part> {
        let now = Utc::now();
        let result = sqlx::query(
            r#"
            INSERT INTO parts (
                part_num, name, part_cat_id, part_img_url, part_url,
                external_ids, print_of, created_at, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&part.part_num)
        .bind(&part.name)
        .bind(part.part_cat_id)
        .bind(&part.part_img_url)
        .bind(&part.part_url)
        .bind(&part.external_ids)
        .bind(&part.print_of)
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(|e| Error::from_insert(e, format!("part {}", part.part_num)))?;

        Ok(Part {
            id: result.last_insert_rowid(),
            part_num: part.part_num,
            name: part.name,
            part_cat_id: part.part_cat_id,
            part_img_url: part.part_img_url,
            part_url: part.part_url,
            external_ids: part.external_ids,
            print_of: part.print_of,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        })
    }

    async fn get(&self, id: i64) -> Result<Option<Part>> {
        let row = sqlx::query(&Self::select("id = ?"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.map(|row| part_from_row(&row, "")).transpose()
    }

    async fn get_by_part_num(&self, part_num: &str) -> Result<Option<Part>> {
        let row = sqlx::query(&Self::select("part_num = ?"))
            .bind(part_num)
            .fetch_optional(&self.pool)
            .await?;
        row.map(|row| part_from_row(&row, "")).transpose()
    }

    async fn get_all(&self) -> Result<Vec<Part>> {
        let rows = sqlx::query(&Self::select("1 = 1"))
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(|row| part_from_row(row, "")).collect()
    }

    async fn update(&self, part: &Part) -> Result<Part> {
        let now = Utc::now();
        let result = sqlx::query(&format!(
            r#"
            UPDATE parts SET
                part_num = ?, name = ?, part_cat_id = ?, part_img_url = ?, part_url = ?,
                external_ids = ?, print_of = ?, updated_at = ?
            WHERE id = ? AND {}
            "#,
            LIVE
        ))
        .bind(&part.part_num)
        .bind(&part.name)
        .bind(part.part_cat_id)
        .bind(&part.part_img_url)
        .bind(&part.part_url)
        .bind(&part.external_ids)
        .bind(&part.print_of)
        .bind(now)
        .bind(part.id)
        .execute(&self.pool)
        .await
        .map_err(|e| Error::from_insert(e, format!("part {}", part.part_num)))?;

        if result.rows_affected() == 0 {
            return Err(Error::NotFound(format!("part {}", part.id)));
        }

        Ok(Part {
            updated_at: now,
            ..part.clone()
        })
    }

    async fn delete(&self, id: i64) -> Result<()> {
        if soft_delete(&self.pool, Table::Parts, id).await? {
            Ok(())
        } else {
            Err(Error::NotFound(format!("part {}", id)))
        }
    }

    async fn search(&self, query: &str) -> Result<Vec<Part>> {
        let pattern = format!("%{}%", escape_like(query));
        let rows = sqlx::query(&Self::select(
            r"(name LIKE ? ESCAPE '\' OR part_num LIKE ? ESCAPE '\')",
        ))
        .bind(&pattern)
        .bind(&pattern)
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(|row| part_from_row(row, "")).collect()
    }
}

/// Escape LIKE wildcards so user input matches literally
fn escape_like(input: &str) -> String {
    let mut escaped = String::with_capacity(input.len());
    for c in input.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}
