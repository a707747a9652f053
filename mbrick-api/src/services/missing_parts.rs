//! Missing part assignment
//!
//! Records which set parts a user is missing and tracks whether each claim has
//! since been found.

use crate::db::{MissingPartStore, SetPartStore};
use mbrick_common::models::{MissingPart, NewMissingPart};
use mbrick_common::{Error, Result};
use serde::Deserialize;
use std::sync::Arc;
use tracing::info;

/// One entry of an assignment request
#[derive(Debug, Clone, Deserialize)]
pub struct MissingPartRequest {
    pub set_part_id: i64,
    /// Missing amount; the set part's full quantity when omitted
    #[serde(default)]
    pub quantity: Option<i64>,
}

pub struct MissingPartsService {
    set_parts: Arc<dyn SetPartStore>,
    missing_parts: Arc<dyn MissingPartStore>,
}

impl MissingPartsService {
    pub fn new(set_parts: Arc<dyn SetPartStore>, missing_parts: Arc<dyn MissingPartStore>) -> Self {
        Self {
            set_parts,
            missing_parts,
        }
    }

    /// Record missing parts against `set_id`
    ///
    /// Every request is validated before anything is written; the rows are
    /// then stored in a single transaction. Assigning the same set part twice
    /// yields two rows.
    pub async fn assign(
        &self,
        set_id: i64,
        requests: Vec<MissingPartRequest>,
    ) -> Result<Vec<MissingPart>> {
        if set_id <= 0 {
            return Err(Error::Validation(format!("invalid set id {}", set_id)));
        }
        if requests.is_empty() {
            return Err(Error::Validation("part_requests must not be empty".to_string()));
        }

        let mut rows = Vec::with_capacity(requests.len());
        for request in &requests {
            let set_part = self
                .set_parts
                .get(request.set_part_id)
                .await?
                .ok_or_else(|| Error::NotFound(format!("set part {}", request.set_part_id)))?;

            if set_part.set_id != set_id {
                return Err(Error::Validation(format!(
                    "set part {} does not belong to set {}",
                    set_part.id, set_id
                )));
            }

            let quantity = match request.quantity {
                None => set_part.quantity,
                Some(q) if q <= 0 => {
                    return Err(Error::Validation(format!(
                        "quantity must be positive, got {} for set part {}",
                        q, set_part.id
                    )))
                }
                Some(q) if q > set_part.quantity => {
                    return Err(Error::Validation(format!(
                        "quantity {} exceeds the {} available for set part {}",
                        q, set_part.quantity, set_part.id
                    )))
                }
                Some(q) => q,
            };

            rows.push(NewMissingPart {
                set_id,
                part_id: set_part.part_id,
                color_id: set_part.color_id,
                color_name: set_part.color_name,
                color_hex: set_part.color_hex,
                quantity,
                is_missing: true,
                notes: String::new(),
            });
        }

        let created = self.missing_parts.create_batch(rows).await?;
        info!(set_id, count = created.len(), "Assigned missing parts");
        Ok(created)
    }

    pub async fn get_by_set(&self, set_id: i64) -> Result<Vec<MissingPart>> {
        self.missing_parts.get_by_set(set_id).await
    }

    pub async fn get_missing_by_set(&self, set_id: i64) -> Result<Vec<MissingPart>> {
        self.missing_parts.get_missing_by_set(set_id).await
    }

    pub async fn mark_found(&self, id: i64) -> Result<()> {
        self.missing_parts.set_missing(id, false).await?;
        info!(id, "Missing part marked found");
        Ok(())
    }

    pub async fn mark_missing(&self, id: i64) -> Result<()> {
        self.missing_parts.set_missing(id, true).await?;
        info!(id, "Missing part marked missing");
        Ok(())
    }

    pub async fn delete(&self, id: i64) -> Result<()> {
        self.missing_parts.delete(id).await
    }
}
