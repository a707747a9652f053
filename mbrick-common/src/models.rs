//! Persisted entity models
//!
//! JSON field names match the REST contract consumed by the web frontend.
//! `deleted_at` is the soft-delete marker and is never serialized.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Timestamp stored when the catalog reports an unparseable `last_modified_dt`
///
/// Serializes as `0001-01-01T00:00:00Z`.
pub fn zero_timestamp() -> DateTime<Utc> {
    NaiveDate::from_ymd_opt(1, 1, 1)
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc())
        .unwrap_or(DateTime::<Utc>::MIN_UTC)
}

/// Parse a catalog RFC3339 timestamp, falling back to [`zero_timestamp`]
pub fn parse_last_modified(raw: Option<&str>) -> (DateTime<Utc>, bool) {
    match raw.map(DateTime::parse_from_rfc3339) {
        Some(Ok(dt)) => (dt.with_timezone(&Utc), true),
        _ => (zero_timestamp(), false),
    }
}

/// One physical LEGO set
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Set {
    pub id: i64,
    /// External catalog code, e.g. "75192-1"
    pub set_num: String,
    pub name: String,
    pub year: i64,
    pub theme_id: i64,
    /// Part count declared by the catalog
    pub num_parts: i64,
    pub set_img_url: String,
    pub set_url: String,
    #[serde(rename = "last_modified_dt")]
    pub last_modified: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(skip)]
    pub deleted_at: Option<DateTime<Utc>>,
}

/// Fields accepted by a partial set update
///
/// `set_num` is the identity of a set and cannot be changed.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SetUpdate {
    pub name: Option<String>,
    pub year: Option<i64>,
    pub theme_id: Option<i64>,
    pub num_parts: Option<i64>,
    pub set_img_url: Option<String>,
    pub set_url: Option<String>,
    #[serde(rename = "last_modified_dt")]
    pub last_modified: Option<DateTime<Utc>>,
}

impl SetUpdate {
    /// Apply every provided field to `set`
    pub fn apply(self, set: &mut Set) {
        if let Some(name) = self.name {
            set.name = name;
        }
        if let Some(year) = self.year {
            set.year = year;
        }
        if let Some(theme_id) = self.theme_id {
            set.theme_id = theme_id;
        }
        if let Some(num_parts) = self.num_parts {
            set.num_parts = num_parts;
        }
        if let Some(url) = self.set_img_url {
            set.set_img_url = url;
        }
        if let Some(url) = self.set_url {
            set.set_url = url;
        }
        if let Some(ts) = self.last_modified {
            set.last_modified = ts;
        }
    }
}

/// One catalog part definition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Part {
    pub id: i64,
    pub part_num: String,
    pub name: String,
    pub part_cat_id: i64,
    pub part_img_url: String,
    pub part_url: String,
    /// External id map re-encoded as a JSON document
    pub external_ids: String,
    /// Code of the part this one is a printed variant of
    pub print_of: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(skip)]
    pub deleted_at: Option<DateTime<Utc>>,
}

/// A part's presence inside one set, at one color
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SetPart {
    pub id: i64,
    pub set_id: i64,
    pub part_id: i64,
    pub color_id: i64,
    pub color_name: String,
    pub color_hex: String,
    pub quantity: i64,
    pub is_spare: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(skip)]
    pub deleted_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub part: Option<Part>,
}

/// A recorded missing-quantity claim against a set part's color
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MissingPart {
    pub id: i64,
    pub set_id: i64,
    pub part_id: i64,
    pub color_id: i64,
    pub color_name: String,
    pub color_hex: String,
    pub quantity: i64,
    pub is_missing: bool,
    pub notes: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(skip)]
    pub deleted_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub part: Option<Part>,
}

/// Set row before insertion
#[derive(Debug, Clone, PartialEq)]
pub struct NewSet {
    pub set_num: String,
    pub name: String,
    pub year: i64,
    pub theme_id: i64,
    pub num_parts: i64,
    pub set_img_url: String,
    pub set_url: String,
    pub last_modified: DateTime<Utc>,
}

/// Part row before insertion
#[derive(Debug, Clone, PartialEq)]
pub struct NewPart {
    pub part_num: String,
    pub name: String,
    pub part_cat_id: i64,
    pub part_img_url: String,
    pub part_url: String,
    pub external_ids: String,
    pub print_of: Option<String>,
}

/// Set part row before insertion
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct NewSetPart {
    pub set_id: i64,
    pub part_id: i64,
    pub color_id: i64,
    #[serde(default)]
    pub color_name: String,
    #[serde(default)]
    pub color_hex: String,
    pub quantity: i64,
    #[serde(default)]
    pub is_spare: bool,
}

/// Missing part row before insertion
#[derive(Debug, Clone, PartialEq)]
pub struct NewMissingPart {
    pub set_id: i64,
    pub part_id: i64,
    pub color_id: i64,
    pub color_name: String,
    pub color_hex: String,
    pub quantity: i64,
    pub is_missing: bool,
    pub notes: String,
}

/// Set with its missing parts attached
#[derive(Debug, Clone, Serialize)]
pub struct SetWithMissingParts {
    #[serde(flatten)]
    pub set: Set,
    pub missing_parts: Vec<MissingPart>,
}

/// Set with its set parts attached
#[derive(Debug, Clone, Serialize)]
pub struct SetWithParts {
    #[serde(flatten)]
    pub set: Set,
    pub set_parts: Vec<SetPart>,
}
