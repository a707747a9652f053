//! In-memory store
//!
//! Implements every store trait over plain vectors. Mirrors the SQLite rules
//! that callers rely on: codes are unique among live rows, deletes are soft,
//! quantities must be positive and batch writes are all-or-nothing.

use super::{MissingPartStore, PartStore, SetPartStore, SetStore};
use async_trait::async_trait;
use chrono::Utc;
use mbrick_common::models::{
    MissingPart, NewMissingPart, NewPart, NewSet, NewSetPart, Part, Set, SetPart,
    SetWithMissingParts,
};
use mbrick_common::{Error, Result};
use std::sync::{Mutex, MutexGuard};

#[derive(Default)]
struct Tables {
    sets: Vec<Set>,
    parts: Vec<Part>,
    set_parts: Vec<SetPart>,
    missing_parts: Vec<MissingPart>,
    next_id: i64,
}

impl Tables {
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }

    fn part_by_id(&self, id: i64) -> Option<Part> {
        self.parts.iter().find(|p| p.id == id).cloned()
    }

    fn insert_set_part(&mut self, sp: NewSetPart) -> SetPart {
        let now = Utc::now();
        let row = SetPart {
            id: self.next_id(),
            set_id: sp.set_id,
            part_id: sp.part_id,
            color_id: sp.color_id,
            color_name: sp.color_name,
            color_hex: sp.color_hex,
            quantity: sp.quantity,
            is_spare: sp.is_spare,
            created_at: now,
            updated_at: now,
            deleted_at: None,
            part: None,
        };
        self.set_parts.push(row.clone());
        row
    }

    fn insert_missing_part(&mut self, mp: NewMissingPart) -> MissingPart {
        let now = Utc::now();
        let row = MissingPart {
            id: self.next_id(),
            set_id: mp.set_id,
            part_id: mp.part_id,
            color_id: mp.color_id,
            color_name: mp.color_name,
            color_hex: mp.color_hex,
            quantity: mp.quantity,
            is_missing: mp.is_missing,
            notes: mp.notes,
            created_at: now,
            updated_at: now,
            deleted_at: None,
            part: None,
        };
        self.missing_parts.push(row.clone());
        row
    }

    fn missing_parts_of(&self, set_id: i64, missing_only: bool) -> Vec<MissingPart> {
        self.missing_parts
            .iter()
            .filter(|mp| mp.deleted_at.is_none() && mp.set_id == set_id)
            .filter(|mp| !missing_only || mp.is_missing)
            .map(|mp| MissingPart {
                part: self.part_by_id(mp.part_id),
                ..mp.clone()
            })
            .collect()
    }
}

fn check_quantity(quantity: i64) -> Result<()> {
    if quantity > 0 {
        Ok(())
    } else {
        Err(Error::Validation(format!("quantity must be positive, got {}", quantity)))
    }
}

/// Thread-safe in-memory implementation of all four stores
#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Tables> {
        self.tables.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl SetStore for MemoryStore {
    async fn create(&self, set: NewSet) -> Result<Set> {
        let mut tables = self.lock();
        if tables
            .sets
            .iter()
            .any(|s| s.deleted_at.is_none() && s.set_num == set.set_num)
        {
            return Err(Error::Conflict(format!("set with number {} already exists", set.set_num)));
        }

        let now = Utc::now();
        let row = Set {
            id: tables.next_id(),
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
        };
        tables.sets.push(row.clone());
        Ok(row)
    }

    async fn get(&self, id: i64) -> Result<Option<Set>> {
        Ok(self
            .lock()
            .sets
            .iter()
            .find(|s| s.deleted_at.is_none() && s.id == id)
            .cloned())
    }

    async fn get_by_set_num(&self, set_num: &str) -> Result<Option<Set>> {
        Ok(self
            .lock()
            .sets
            .iter()
            .find(|s| s.deleted_at.is_none() && s.set_num == set_num)
            .cloned())
    }

    async fn get_all(&self) -> Result<Vec<Set>> {
        Ok(self
            .lock()
            .sets
            .iter()
            .filter(|s| s.deleted_at.is_none())
            .cloned()
            .collect())
    }

    async fn update(&self, set: &Set) -> Result<Set> {
        let mut tables = self.lock();
        let row = tables
            .sets
            .iter_mut()
            .find(|s| s.deleted_at.is_none() && s.id == set.id)
            .ok_or_else(|| Error::NotFound(format!("set {}", set.id)))?;

        *row = Set {
            set_num: row.set_num.clone(),
            created_at: row.created_at,
            deleted_at: None,
            updated_at: Utc::now(),
            ..set.clone()
        };
        Ok(row.clone())
    }

    async fn delete(&self, id: i64) -> Result<()> {
        let mut tables = self.lock();
        let row = tables
            .sets
            .iter_mut()
            .find(|s| s.deleted_at.is_none() && s.id == id)
            .ok_or_else(|| Error::NotFound(format!("set {}", id)))?;
        row.deleted_at = Some(Utc::now());
        Ok(())
    }

    async fn get_with_missing_parts(&self, id: i64) -> Result<Option<SetWithMissingParts>> {
        let tables = self.lock();
        let Some(set) = tables
            .sets
            .iter()
            .find(|s| s.deleted_at.is_none() && s.id == id)
            .cloned()
        else {
            return Ok(None);
        };
        let missing_parts = tables.missing_parts_of(id, false);
        Ok(Some(SetWithMissingParts { set, missing_parts }))
    }
}

#[async_trait]
impl PartStore for MemoryStore {
    async fn create(&self, part: NewPart) -> Result<Part> {
        let mut tables = self.lock();
        if tables
            .parts
            .iter()
            .any(|p| p.deleted_at.is_none() && p.part_num == part.part_num)
        {
            return Err(Error::Conflict(format!("part {} already exists", part.part_num)));
        }

        let now = Utc::now();
        let row = Part {
            id: tables.next_id(),
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
        };
        tables.parts.push(row.clone());
        Ok(row)
    }

    async fn get(&self, id: i64) -> Result<Option<Part>> {
        Ok(self
            .lock()
            .parts
            .iter()
            .find(|p| p.deleted_at.is_none() && p.id == id)
            .cloned())
    }

    async fn get_by_part_num(&self, part_num: &str) -> Result<Option<Part>> {
        Ok(self
            .lock()
            .parts
            .iter()
            .find(|p| p.deleted_at.is_none() && p.part_num == part_num)
            .cloned())
    }

    async fn get_all(&self) -> Result<Vec<Part>> {
        let mut parts: Vec<Part> = self
            .lock()
            .parts
            .iter()
            .filter(|p| p.deleted_at.is_none())
            .cloned()
            .collect();
        parts.sort_by(|a, b| a.part_num.cmp(&b.part_num));
        Ok(parts)
    }

    async fn update(&self, part: &Part) -> Result<Part> {
        let mut tables = self.lock();
        if tables
            .parts
            .iter()
            .any(|p| p.deleted_at.is_none() && p.id != part.id && p.part_num == part.part_num)
        {
            return Err(Error::Conflict(format!("part {} already exists", part.part_num)));
        }

        let row = tables
            .parts
            .iter_mut()
            .find(|p| p.deleted_at.is_none() && p.id == part.id)
            .ok_or_else(|| Error::NotFound(format!("part {}", part.id)))?;
        *row = Part {
            created_at: row.created_at,
            deleted_at: None,
            updated_at: Utc::now(),
            ..part.clone()
        };
        Ok(row.clone())
    }

    async fn delete(&self, id: i64) -> Result<()> {
        let mut tables = self.lock();
        let row = tables
            .parts
            .iter_mut()
            .find(|p| p.deleted_at.is_none() && p.id == id)
            .ok_or_else(|| Error::NotFound(format!("part {}", id)))?;
        row.deleted_at = Some(Utc::now());
        Ok(())
    }

    async fn search(&self, query: &str) -> Result<Vec<Part>> {
        // ASCII-only folding, matching SQLite LIKE
        let needle = query.to_ascii_lowercase();
        let mut parts: Vec<Part> = self
            .lock()
            .parts
            .iter()
            .filter(|p| p.deleted_at.is_none())
            .filter(|p| {
                p.name.to_ascii_lowercase().contains(&needle)
                    || p.part_num.to_ascii_lowercase().contains(&needle)
            })
            .cloned()
            .collect();
        parts.sort_by(|a, b| a.part_num.cmp(&b.part_num));
        Ok(parts)
    }
}

#[async_trait]
impl SetPartStore for MemoryStore {
    async fn create(&self, set_part: NewSetPart) -> Result<SetPart> {
        check_quantity(set_part.quantity)?;
        Ok(self.lock().insert_set_part(set_part))
    }

    async fn create_batch(&self, set_parts: Vec<NewSetPart>) -> Result<usize> {
        for sp in &set_parts {
            check_quantity(sp.quantity)?;
        }
        let mut tables = self.lock();
        let count = set_parts.len();
        for sp in set_parts {
            tables.insert_set_part(sp);
        }
        Ok(count)
    }

    async fn get(&self, id: i64) -> Result<Option<SetPart>> {
        Ok(self
            .lock()
            .set_parts
            .iter()
            .find(|sp| sp.deleted_at.is_none() && sp.id == id)
            .cloned())
    }

    async fn get_by_set(&self, set_id: i64) -> Result<Vec<SetPart>> {
        let tables = self.lock();
        Ok(tables
            .set_parts
            .iter()
            .filter(|sp| sp.deleted_at.is_none() && sp.set_id == set_id)
            .map(|sp| SetPart {
                part: tables.part_by_id(sp.part_id),
                ..sp.clone()
            })
            .collect())
    }

    async fn update(&self, set_part: &SetPart) -> Result<SetPart> {
        check_quantity(set_part.quantity)?;
        let mut tables = self.lock();
        let row = tables
            .set_parts
            .iter_mut()
            .find(|sp| sp.deleted_at.is_none() && sp.id == set_part.id)
            .ok_or_else(|| Error::NotFound(format!("set part {}", set_part.id)))?;
        *row = SetPart {
            set_id: row.set_id,
            created_at: row.created_at,
            deleted_at: None,
            updated_at: Utc::now(),
            part: None,
            ..set_part.clone()
        };
        Ok(row.clone())
    }

    async fn delete(&self, id: i64) -> Result<()> {
        let mut tables = self.lock();
        let row = tables
            .set_parts
            .iter_mut()
            .find(|sp| sp.deleted_at.is_none() && sp.id == id)
            .ok_or_else(|| Error::NotFound(format!("set part {}", id)))?;
        row.deleted_at = Some(Utc::now());
        Ok(())
    }

    async fn delete_by_set(&self, set_id: i64) -> Result<u64> {
        let now = Utc::now();
        let mut removed = 0;
        for sp in self
            .lock()
            .set_parts
            .iter_mut()
            .filter(|sp| sp.deleted_at.is_none() && sp.set_id == set_id)
        {
            sp.deleted_at = Some(now);
            removed += 1;
        }
        Ok(removed)
    }

    async fn replace_for_set(&self, set_id: i64, set_parts: Vec<NewSetPart>) -> Result<usize> {
        for sp in &set_parts {
            check_quantity(sp.quantity)?;
        }
        let now = Utc::now();
        let mut tables = self.lock();
        for sp in tables
            .set_parts
            .iter_mut()
            .filter(|sp| sp.deleted_at.is_none() && sp.set_id == set_id)
        {
            sp.deleted_at = Some(now);
        }
        let count = set_parts.len();
        for sp in set_parts {
            tables.insert_set_part(sp);
        }
        Ok(count)
    }
}

#[async_trait]
impl MissingPartStore for MemoryStore {
    async fn create(&self, missing_part: NewMissingPart) -> Result<MissingPart> {
        check_quantity(missing_part.quantity)?;
        Ok(self.lock().insert_missing_part(missing_part))
    }

    async fn create_batch(&self, missing_parts: Vec<NewMissingPart>) -> Result<Vec<MissingPart>> {
        for mp in &missing_parts {
            check_quantity(mp.quantity)?;
        }
        let mut tables = self.lock();
        Ok(missing_parts
            .into_iter()
            .map(|mp| tables.insert_missing_part(mp))
            .collect())
    }

    async fn get(&self, id: i64) -> Result<Option<MissingPart>> {
        Ok(self
            .lock()
            .missing_parts
            .iter()
            .find(|mp| mp.deleted_at.is_none() && mp.id == id)
            .cloned())
    }

    async fn get_by_set(&self, set_id: i64) -> Result<Vec<MissingPart>> {
        Ok(self.lock().missing_parts_of(set_id, false))
    }

    async fn get_missing_by_set(&self, set_id: i64) -> Result<Vec<MissingPart>> {
        Ok(self.lock().missing_parts_of(set_id, true))
    }

    async fn get_all(&self) -> Result<Vec<MissingPart>> {
        Ok(self
            .lock()
            .missing_parts
            .iter()
            .filter(|mp| mp.deleted_at.is_none())
            .cloned()
            .collect())
    }

    async fn update(&self, missing_part: &MissingPart) -> Result<MissingPart> {
        check_quantity(missing_part.quantity)?;
        let mut tables = self.lock();
        let row = tables
            .missing_parts
            .iter_mut()
            .find(|mp| mp.deleted_at.is_none() && mp.id == missing_part.id)
            .ok_or_else(|| Error::NotFound(format!("missing part {}", missing_part.id)))?;
        *row = MissingPart {
            set_id: row.set_id,
            part_id: row.part_id,
            created_at: row.created_at,
            deleted_at: None,
            updated_at: Utc::now(),
            part: None,
            ..missing_part.clone()
        };
        Ok(row.clone())
    }

    async fn delete(&self, id: i64) -> Result<()> {
        let mut tables = self.lock();
        let row = tables
            .missing_parts
            .iter_mut()
            .find(|mp| mp.deleted_at.is_none() && mp.id == id)
            .ok_or_else(|| Error::NotFound(format!("missing part {}", id)))?;
        row.deleted_at = Some(Utc::now());
        Ok(())
    }

    async fn set_missing(&self, id: i64, is_missing: bool) -> Result<()> {
        let mut tables = self.lock();
        let row = tables
            .missing_parts
            .iter_mut()
            .find(|mp| mp.deleted_at.is_none() && mp.id == id)
            .ok_or_else(|| Error::NotFound(format!("missing part {}", id)))?;
        row.is_missing = is_missing;
        row.updated_at = Utc::now();
        Ok(())
    }
}
