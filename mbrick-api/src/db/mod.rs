//! Store interfaces and their implementations
//!
//! One narrow trait per entity. `sqlite` backs the running service; `memory`
//! backs tests. Every read returns live rows only (`deleted_at` unset) and every
//! `delete` is a soft delete.

use async_trait::async_trait;
use mbrick_common::models::{
    MissingPart, NewMissingPart, NewPart, NewSet, NewSetPart, Part, Set, SetPart,
    SetWithMissingParts,
};
use mbrick_common::Result;
use std::sync::Arc;

pub mod memory;
pub mod missing_parts;
pub mod parts;
pub mod set_parts;
pub mod sets;
mod soft_delete;

pub use memory::MemoryStore;
pub use missing_parts::SqliteMissingPartStore;
pub use parts::SqlitePartStore;
pub use set_parts::SqliteSetPartStore;
pub use sets::SqliteSetStore;

/// Rows per INSERT statement for batch inserts
pub const BATCH_SIZE: usize = 100;

#[async_trait]
pub trait SetStore: Send + Sync {
    /// Insert a set; `Conflict` if a live set already has this `set_num`
    async fn create(&self, set: NewSet) -> Result<Set>;
    async fn get(&self, id: i64) -> Result<Option<Set>>;
    async fn get_by_set_num(&self, set_num: &str) -> Result<Option<Set>>;
    async fn get_all(&self) -> Result<Vec<Set>>;
    /// Persist every mutable field; `NotFound` if the set is not live
    async fn update(&self, set: &Set) -> Result<Set>;
    /// Soft delete; `NotFound` if the set is not live
    async fn delete(&self, id: i64) -> Result<()>;
    /// Set with all its live missing parts, each carrying its part
    async fn get_with_missing_parts(&self, id: i64) -> Result<Option<SetWithMissingParts>>;
}

#[async_trait]
pub trait PartStore: Send + Sync {
    /// Insert a part; `Conflict` if a live part already has this `part_num`
    async fn create(&self, part: NewPart) -> Result<Part>;
    async fn get(&self, id: i64) -> Result<Option<Part>>;
    async fn get_by_part_num(&self, part_num: &str) -> Result<Option<Part>>;
    async fn get_all(&self) -> Result<Vec<Part>>;
    async fn update(&self, part: &Part) -> Result<Part>;
    async fn delete(&self, id: i64) -> Result<()>;
    /// Substring match on name or part number
    ///
    /// Case folding covers ASCII letters only, as SQLite `LIKE` does.
    async fn search(&self, query: &str) -> Result<Vec<Part>>;
}

#[async_trait]
pub trait SetPartStore: Send + Sync {
    async fn create(&self, set_part: NewSetPart) -> Result<SetPart>;
    /// Insert all rows in one transaction, `BATCH_SIZE` rows per statement
    async fn create_batch(&self, set_parts: Vec<NewSetPart>) -> Result<usize>;
    async fn get(&self, id: i64) -> Result<Option<SetPart>>;
    /// Live set parts of a set, each carrying its part
    async fn get_by_set(&self, set_id: i64) -> Result<Vec<SetPart>>;
    async fn update(&self, set_part: &SetPart) -> Result<SetPart>;
    async fn delete(&self, id: i64) -> Result<()>;
    /// Soft delete every live set part of a set, returning how many were removed
    async fn delete_by_set(&self, set_id: i64) -> Result<u64>;
    /// Delete by set and insert the new rows in one transaction
    async fn replace_for_set(&self, set_id: i64, set_parts: Vec<NewSetPart>) -> Result<usize>;
}

#[async_trait]
pub trait MissingPartStore: Send + Sync {
    async fn create(&self, missing_part: NewMissingPart) -> Result<MissingPart>;
    /// Insert all rows in one transaction; nothing is written on failure
    async fn create_batch(&self, missing_parts: Vec<NewMissingPart>) -> Result<Vec<MissingPart>>;
    async fn get(&self, id: i64) -> Result<Option<MissingPart>>;
    /// Every live missing part of a set regardless of the missing flag
    async fn get_by_set(&self, set_id: i64) -> Result<Vec<MissingPart>>;
    /// Live missing parts of a set still flagged missing
    async fn get_missing_by_set(&self, set_id: i64) -> Result<Vec<MissingPart>>;
    async fn get_all(&self) -> Result<Vec<MissingPart>>;
    async fn update(&self, missing_part: &MissingPart) -> Result<MissingPart>;
    async fn delete(&self, id: i64) -> Result<()>;
    /// Flip the missing flag; `NotFound` if the row is not live
    async fn set_missing(&self, id: i64, is_missing: bool) -> Result<()>;
}

/// The four stores wired together
#[derive(Clone)]
pub struct Stores {
    pub sets: Arc<dyn SetStore>,
    pub parts: Arc<dyn PartStore>,
    pub set_parts: Arc<dyn SetPartStore>,
    pub missing_parts: Arc<dyn MissingPartStore>,
}

impl Stores {
    /// SQLite-backed stores sharing one pool
    pub fn sqlite(pool: sqlx::SqlitePool) -> Self {
        Self {
            sets: Arc::new(SqliteSetStore::new(pool.clone())),
            parts: Arc::new(SqlitePartStore::new(pool.clone())),
            set_parts: Arc::new(SqliteSetPartStore::new(pool.clone())),
            missing_parts: Arc::new(SqliteMissingPartStore::new(pool)),
        }
    }

    /// In-memory stores sharing one state
    pub fn memory() -> Self {
        let store = Arc::new(MemoryStore::new());
        Self {
            sets: store.clone(),
            parts: store.clone(),
            set_parts: store.clone(),
            missing_parts: store,
        }
    }
}
