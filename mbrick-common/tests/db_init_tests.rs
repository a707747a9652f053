//! Database initialization tests

use mbrick_common::db::{get_schema_version, init_database};

#[tokio::test]
async fn test_database_creation_when_missing() {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("nested").join("missingbrick.db");

    let pool = init_database(&db_path).await;

    assert!(pool.is_ok(), "Database initialization failed: {:?}", pool.err());
    assert!(db_path.exists(), "Database file was not created");
}

#[tokio::test]
async fn test_database_opens_existing() {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("missingbrick.db");

    let pool1 = init_database(&db_path).await.unwrap();
    pool1.close().await;

    let pool2 = init_database(&db_path).await;
    assert!(pool2.is_ok(), "Failed to open existing database: {:?}", pool2.err());
}

#[tokio::test]
async fn test_all_tables_created() {
    let dir = tempfile::tempdir().unwrap();
    let pool = init_database(&dir.path().join("missingbrick.db")).await.unwrap();

    for table in ["sets", "parts", "set_parts", "missing_parts", "schema_version"] {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = ?)",
        )
        .bind(table)
        .fetch_one(&pool)
        .await
        .unwrap();
        assert!(exists, "table {} missing", table);
    }

    assert_eq!(get_schema_version(&pool).await.unwrap(), 2);
}

#[tokio::test]
async fn test_set_num_unique_only_among_live_rows() {
    let dir = tempfile::tempdir().unwrap();
    let pool = init_database(&dir.path().join("missingbrick.db")).await.unwrap();

    let insert = "INSERT INTO sets (set_num, name, last_modified, created_at, updated_at, deleted_at) \
                  VALUES ('75192-1', 'Falcon', 'x', 'x', 'x', ?)";

    sqlx::query(insert).bind(Some("2024-01-01T00:00:00Z")).execute(&pool).await.unwrap();
    // Soft-deleted row does not block a live one
    sqlx::query(insert).bind(None::<String>).execute(&pool).await.unwrap();
    // Second live row violates the partial unique index
    let dup = sqlx::query(insert).bind(None::<String>).execute(&pool).await;
    assert!(dup.is_err());
}

#[tokio::test]
async fn test_connection_pragmas() {
    let dir = tempfile::tempdir().unwrap();
    let pool = init_database(&dir.path().join("missingbrick.db")).await.unwrap();

    let journal: String = sqlx::query_scalar("PRAGMA journal_mode")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(journal.to_lowercase(), "wal");

    // Set part pointing at a set that does not exist
    let orphan = sqlx::query(
        "INSERT INTO set_parts (set_id, part_id, color_id, quantity, created_at, updated_at) \
         VALUES (999, 999, 0, 1, 'x', 'x')",
    )
    .execute(&pool)
    .await;
    assert!(orphan.is_err(), "foreign keys should be enforced");
}
