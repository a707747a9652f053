//! In-memory catalog
//!
//! Serves fixed catalog data for tests and offline runs. Unknown codes behave
//! like a Rebrickable 404 and surface as `Error::Upstream`.

use super::rebrickable_client::{CatalogClient, CatalogColor, CatalogPart, CatalogSet, CatalogSetPart};
use async_trait::async_trait;
use mbrick_common::{Error, Result};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

#[derive(Default)]
struct CatalogData {
    sets: HashMap<String, CatalogSet>,
    /// Alternative code -> canonical set_num
    aliases: HashMap<String, String>,
    set_parts: HashMap<String, Vec<CatalogSetPart>>,
    parts: HashMap<String, CatalogPart>,
    failing_part_lists: HashSet<String>,
}

/// Catalog backed by maps
#[derive(Default)]
pub struct InMemoryCatalog {
    data: Mutex<CatalogData>,
    requests: AtomicUsize,
}

impl InMemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a set and its part list (replacing any previous entry)
    pub fn insert_set(&self, set: CatalogSet, parts: Vec<CatalogSetPart>) {
        let mut data = self.lock();
        for entry in &parts {
            data.parts
                .insert(entry.part.part_num.clone(), entry.part.clone());
        }
        data.set_parts.insert(set.set_num.clone(), parts);
        data.sets.insert(set.set_num.clone(), set);
    }

    /// Resolve `code` to the registered set `set_num`, as the catalog does for
    /// codes it normalizes
    pub fn alias_set(&self, code: &str, set_num: &str) {
        self.lock().aliases.insert(code.to_string(), set_num.to_string());
    }

    /// Replace the part list of an already registered set
    pub fn set_parts(&self, set_num: &str, parts: Vec<CatalogSetPart>) {
        self.lock().set_parts.insert(set_num.to_string(), parts);
    }

    /// Make part-list lookups for `set_num` fail as if the upstream returned 500
    pub fn fail_part_list(&self, set_num: &str, failing: bool) {
        let mut data = self.lock();
        if failing {
            data.failing_part_lists.insert(set_num.to_string());
        } else {
            data.failing_part_lists.remove(set_num);
        }
    }

    /// Number of catalog calls served so far
    pub fn request_count(&self) -> usize {
        self.requests.load(Ordering::SeqCst)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, CatalogData> {
        self.data.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl CatalogClient for InMemoryCatalog {
    async fn get_set(&self, set_num: &str) -> Result<CatalogSet> {
        self.requests.fetch_add(1, Ordering::SeqCst);
        let data = self.lock();
        let key = data.aliases.get(set_num).map(String::as_str).unwrap_or(set_num);
        data.sets
            .get(key)
            .cloned()
            .ok_or_else(|| Error::Upstream(format!("Rebrickable API returned status 404 for set {}", set_num)))
    }

    async fn get_set_parts(&self, set_num: &str) -> Result<Vec<CatalogSetPart>> {
        self.requests.fetch_add(1, Ordering::SeqCst);
        let data = self.lock();
        if data.failing_part_lists.contains(set_num) {
            return Err(Error::Upstream(format!(
                "Rebrickable API returned status 500 for parts of set {}",
                set_num
            )));
        }
        data.set_parts.get(set_num).cloned().ok_or_else(|| {
            Error::Upstream(format!("Rebrickable API returned status 404 for parts of set {}", set_num))
        })
    }

    async fn get_part(&self, part_num: &str) -> Result<CatalogPart> {
        self.requests.fetch_add(1, Ordering::SeqCst);
        self.lock()
            .parts
            .get(part_num)
            .cloned()
            .ok_or_else(|| Error::Upstream(format!("Rebrickable API returned status 404 for part {}", part_num)))
    }
}

/// Catalog set with the fields tests usually care about
pub fn catalog_set(set_num: &str, name: &str, num_parts: i64) -> CatalogSet {
    CatalogSet {
        set_num: set_num.to_string(),
        name: name.to_string(),
        year: 2017,
        theme_id: 171,
        num_parts,
        set_img_url: Some(format!("https://cdn.rebrickable.com/media/sets/{}.jpg", set_num)),
        set_url: Some(format!("https://rebrickable.com/sets/{}/", set_num)),
        last_modified_dt: Some("2023-08-14T09:12:45.123456Z".to_string()),
    }
}

/// Catalog set part entry
pub fn catalog_set_part(part_num: &str, color_id: i64, quantity: i64, is_spare: bool) -> CatalogSetPart {
    CatalogSetPart {
        id: 0,
        inv_part_id: 0,
        part: CatalogPart {
            part_num: part_num.to_string(),
            name: format!("Part {}", part_num),
            part_cat_id: 11,
            part_img_url: None,
            part_url: Some(format!("https://rebrickable.com/parts/{}/", part_num)),
            external_ids: serde_json::json!({ "BrickLink": [part_num] }),
            print_of: None,
        },
        color: CatalogColor {
            id: color_id,
            name: format!("Color {}", color_id),
            rgb: "C91A09".to_string(),
            is_trans: false,
        },
        quantity,
        is_spare,
        num_sets: 1,
    }
}
