//! Set orchestration
//!
//! Creates sets from catalog metadata, keeps them in step with the catalog and
//! serves the composite set views.

use super::rebrickable_client::{CatalogClient, CatalogSet};
use super::set_parts::SetPartService;
use crate::db::SetStore;
use mbrick_common::models::{
    parse_last_modified, NewSet, Set, SetUpdate, SetWithMissingParts, SetWithParts,
};
use mbrick_common::{Error, Result};
use std::sync::Arc;
use tracing::{info, warn};

pub struct SetService {
    sets: Arc<dyn SetStore>,
    catalog: Arc<dyn CatalogClient>,
    set_parts: Arc<SetPartService>,
}

impl SetService {
    pub fn new(
        sets: Arc<dyn SetStore>,
        catalog: Arc<dyn CatalogClient>,
        set_parts: Arc<SetPartService>,
    ) -> Self {
        Self {
            sets,
            catalog,
            set_parts,
        }
    }

    /// Create a set from the catalog and populate its part list
    ///
    /// The set is stored under the catalog's own `set_num`, so two spellings
    /// resolving to one catalog set cannot create two rows. A failed part sync
    /// is logged and does not fail the call; the set is returned without parts
    /// and can be resynced later.
    pub async fn create_with_parts(&self, set_num: &str) -> Result<Set> {
        let set_num = validate_set_num(set_num)?;
        self.ensure_absent(set_num).await?;

        let catalog_set = self.catalog.get_set(set_num).await?;
        if catalog_set.set_num != set_num {
            self.ensure_absent(&catalog_set.set_num).await?;
        }

        let set = self.sets.create(new_set(&catalog_set)).await?;
        info!(set_id = set.id, set_num = %set.set_num, requested = %set_num, "Created set");

        if let Err(e) = self.set_parts.sync(set.id, &set.set_num).await {
            warn!(set_id = set.id, set_num = %set.set_num, error = %e, "Set created but part sync failed");
        }

        Ok(set)
    }

    /// Refresh a set's metadata from the catalog, creating it when absent
    ///
    /// The local set is matched on the catalog's `set_num`. Parts are left
    /// untouched.
    pub async fn sync_from_rebrickable(&self, set_num: &str) -> Result<Set> {
        let set_num = validate_set_num(set_num)?;
        let catalog_set = self.catalog.get_set(set_num).await?;
        let fresh = new_set(&catalog_set);

        let existing = self.sets.get_by_set_num(&fresh.set_num).await?;
        match existing {
            Some(mut set) => {
                set.name = fresh.name;
                set.year = fresh.year;
                set.theme_id = fresh.theme_id;
                set.num_parts = fresh.num_parts;
                set.set_img_url = fresh.set_img_url;
                set.set_url = fresh.set_url;
                set.last_modified = fresh.last_modified;

                let updated = self.sets.update(&set).await?;
                info!(set_id = updated.id, set_num = %updated.set_num, "Refreshed set from catalog");
                Ok(updated)
            }
            None => {
                let set = self.sets.create(fresh).await?;
                info!(set_id = set.id, set_num = %set.set_num, "Created set from catalog");
                Ok(set)
            }
        }
    }

    async fn ensure_absent(&self, set_num: &str) -> Result<()> {
        if self.sets.get_by_set_num(set_num).await?.is_some() {
            return Err(Error::Conflict(format!("set with number {} already exists", set_num)));
        }
        Ok(())
    }

    pub async fn get(&self, id: i64) -> Result<Set> {
        self.sets
            .get(id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("set {}", id)))
    }

    pub async fn get_by_set_num(&self, set_num: &str) -> Result<Set> {
        self.sets
            .get_by_set_num(set_num)
            .await?
            .ok_or_else(|| Error::NotFound(format!("set with number {}", set_num)))
    }

    pub async fn get_all(&self) -> Result<Vec<Set>> {
        self.sets.get_all().await
    }

    /// Apply a partial update; the set number never changes
    pub async fn update(&self, id: i64, update: SetUpdate) -> Result<Set> {
        let mut set = self.get(id).await?;
        update.apply(&mut set);
        self.sets.update(&set).await
    }

    pub async fn delete(&self, id: i64) -> Result<()> {
        self.sets.delete(id).await?;
        info!(set_id = id, "Deleted set");
        Ok(())
    }

    pub async fn get_with_missing_parts(&self, id: i64) -> Result<SetWithMissingParts> {
        self.sets
            .get_with_missing_parts(id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("set {}", id)))
    }

    pub async fn get_with_parts(&self, id: i64) -> Result<SetWithParts> {
        let set = self.get(id).await?;
        let set_parts = self.set_parts.get_set_parts(set.id).await?;
        Ok(SetWithParts { set, set_parts })
    }

    /// Rebuild the part list of a stored set, optionally from another catalog code
    pub async fn resync_parts(&self, id: i64, set_num: Option<String>) -> Result<usize> {
        let set = self.get(id).await?;
        let code = match set_num {
            Some(code) => validate_set_num(&code)?.to_string(),
            None => set.set_num.clone(),
        };
        self.set_parts.replace(set.id, &code).await
    }
}

fn validate_set_num(set_num: &str) -> Result<&str> {
    let trimmed = set_num.trim();
    if trimmed.is_empty() {
        return Err(Error::Validation("set_num is required".to_string()));
    }
    Ok(trimmed)
}

/// Set row from catalog metadata, tolerating a malformed timestamp
fn new_set(catalog_set: &CatalogSet) -> NewSet {
    let (last_modified, parsed) = parse_last_modified(catalog_set.last_modified_dt.as_deref());
    if !parsed {
        warn!(
            set_num = %catalog_set.set_num,
            value = ?catalog_set.last_modified_dt,
            "Unparseable last_modified_dt from catalog, storing zero timestamp"
        );
    }

    NewSet {
        set_num: catalog_set.set_num.clone(),
        name: catalog_set.name.clone(),
        year: catalog_set.year,
        theme_id: catalog_set.theme_id,
        num_parts: catalog_set.num_parts,
        set_img_url: catalog_set.set_img_url.clone().unwrap_or_default(),
        set_url: catalog_set.set_url.clone().unwrap_or_default(),
        last_modified,
    }
}
