//! Set part assembly from the catalog
//!
//! Turns a catalog part list into set part rows, creating any part the
//! database does not know yet. `sync` appends, `replace` swaps the set's rows
//! in one transaction. Both hold a per-set lock so two runs for the same set
//! never interleave. A lock entry lives only while some call holds or awaits it.

use super::rebrickable_client::{CatalogClient, CatalogPart};
use crate::db::{PartStore, SetPartStore};
use mbrick_common::models::{NewPart, NewSetPart, SetPart};
use mbrick_common::{Error, Result};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tracing::{debug, info};

type SetLocks = Mutex<HashMap<i64, Arc<tokio::sync::Mutex<()>>>>;

pub struct SetPartService {
    set_parts: Arc<dyn SetPartStore>,
    parts: Arc<dyn PartStore>,
    catalog: Arc<dyn CatalogClient>,
    set_locks: SetLocks,
}

/// Held per-set lock; dropping it releases the lock and prunes the map entry
struct SetLockGuard<'a> {
    locks: &'a SetLocks,
    set_id: i64,
    lock: Option<Arc<tokio::sync::Mutex<()>>>,
    guard: Option<tokio::sync::OwnedMutexGuard<()>>,
}

impl Drop for SetLockGuard<'_> {
    fn drop(&mut self) {
        let mut locks = self.locks.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        self.guard.take();
        self.lock.take();
        // Only the map's own handle left: nobody holds or waits for this set
        if locks
            .get(&self.set_id)
            .is_some_and(|lock| Arc::strong_count(lock) == 1)
        {
            locks.remove(&self.set_id);
        }
    }
}

impl SetPartService {
    pub fn new(
        set_parts: Arc<dyn SetPartStore>,
        parts: Arc<dyn PartStore>,
        catalog: Arc<dyn CatalogClient>,
    ) -> Self {
        Self {
            set_parts,
            parts,
            catalog,
            set_locks: Mutex::new(HashMap::new()),
        }
    }

    /// Fetch the catalog part list of `set_num` and insert it for `set_id`
    pub async fn sync(&self, set_id: i64, set_num: &str) -> Result<usize> {
        let _guard = self.lock_set(set_id).await;

        let rows = self.assemble(set_id, set_num).await?;
        let inserted = self.set_parts.create_batch(rows).await?;

        info!(set_id, set_num = %set_num, inserted, "Synced set parts");
        Ok(inserted)
    }

    /// Rebuild the set parts of `set_id` from the catalog
    ///
    /// The catalog list is fetched and resolved before anything is touched, so
    /// an upstream failure leaves the current rows in place.
    pub async fn replace(&self, set_id: i64, set_num: &str) -> Result<usize> {
        let _guard = self.lock_set(set_id).await;

        let rows = self.assemble(set_id, set_num).await?;
        let inserted = self.set_parts.replace_for_set(set_id, rows).await?;

        info!(set_id, set_num = %set_num, inserted, "Replaced set parts");
        Ok(inserted)
    }

    pub async fn get_set_parts(&self, set_id: i64) -> Result<Vec<SetPart>> {
        self.set_parts.get_by_set(set_id).await
    }

    pub async fn create(&self, set_part: NewSetPart) -> Result<SetPart> {
        if set_part.quantity <= 0 {
            return Err(Error::Validation(format!(
                "quantity must be positive, got {}",
                set_part.quantity
            )));
        }
        self.set_parts.create(set_part).await
    }

    pub async fn update(&self, set_part: &SetPart) -> Result<SetPart> {
        self.set_parts.update(set_part).await
    }

    pub async fn delete(&self, id: i64) -> Result<()> {
        self.set_parts.delete(id).await
    }

    async fn lock_set(&self, set_id: i64) -> SetLockGuard<'_> {
        let lock = {
            let mut locks = self
                .set_locks
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            locks.entry(set_id).or_default().clone()
        };

        // Built before awaiting so a cancelled wait still prunes the entry
        let mut held = SetLockGuard {
            locks: &self.set_locks,
            set_id,
            lock: Some(lock.clone()),
            guard: None,
        };
        held.guard = Some(lock.lock_owned().await);
        held
    }

    #[cfg(test)]
    fn tracked_locks(&self) -> usize {
        self.set_locks
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .len()
    }

    async fn assemble(&self, set_id: i64, set_num: &str) -> Result<Vec<NewSetPart>> {
        let entries = self.catalog.get_set_parts(set_num).await?;

        // part_num -> part id, so repeated parts (one per color) hit the store once
        let mut part_ids: HashMap<String, i64> = HashMap::new();
        let mut rows = Vec::with_capacity(entries.len());

        for entry in entries {
            let part_id = match part_ids.get(&entry.part.part_num) {
                Some(id) => *id,
                None => {
                    let id = self.resolve_part(&entry.part).await?;
                    part_ids.insert(entry.part.part_num.clone(), id);
                    id
                }
            };

            rows.push(NewSetPart {
                set_id,
                part_id,
                color_id: entry.color.id,
                color_name: entry.color.name,
                color_hex: entry.color.rgb,
                quantity: entry.quantity,
                is_spare: entry.is_spare,
            });
        }

        debug!(set_id, rows = rows.len(), distinct_parts = part_ids.len(), "Assembled set parts");
        Ok(rows)
    }

    /// Id of the stored part for `part`, creating it when absent
    async fn resolve_part(&self, part: &CatalogPart) -> Result<i64> {
        if let Some(existing) = self.parts.get_by_part_num(&part.part_num).await? {
            return Ok(existing.id);
        }

        match self.parts.create(new_part(part)?).await {
            Ok(created) => {
                debug!(part_num = %created.part_num, id = created.id, "Created part");
                Ok(created.id)
            }
            // Another request created it between lookup and insert
            Err(Error::Conflict(_)) => self
                .parts
                .get_by_part_num(&part.part_num)
                .await?
                .map(|p| p.id)
                .ok_or_else(|| {
                    Error::Internal(format!("part {} conflicted but is not stored", part.part_num))
                }),
            Err(e) => Err(e),
        }
    }
}

fn new_part(part: &CatalogPart) -> Result<NewPart> {
    let external_ids = if part.external_ids.is_null() {
        "{}".to_string()
    } else {
        serde_json::to_string(&part.external_ids).map_err(|e| {
            Error::Internal(format!("failed to encode external ids of {}: {}", part.part_num, e))
        })?
    };

    Ok(NewPart {
        part_num: part.part_num.clone(),
        name: part.name.clone(),
        part_cat_id: part.part_cat_id,
        part_img_url: part.part_img_url.clone().unwrap_or_default(),
        part_url: part.part_url.clone().unwrap_or_default(),
        external_ids,
        print_of: part.print_of.clone(),
    })
}
