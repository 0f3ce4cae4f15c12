//! Catalog database records and API payloads
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Default sort position for new items; large so they sort last until
/// explicitly placed.
pub const ITEM_SORT_SENTINEL: i64 = 9999;

/// Item record in the database
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct ItemRow {
    pub id: i64,
    pub name: String,
    pub category: Option<String>,
    pub material: Option<String>,
    pub gemstone: Option<String>,
    pub description: Option<String>,
    pub weight: Option<f64>,
    pub price: Option<f64>,
    pub sort_order: i64,
    pub created_at: DateTime<Utc>,
}

/// Gallery image record in the database
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct ImageRow {
    pub id: i64,
    pub item_id: i64,
    pub url: String,
    /// 1-based position within the owning item's gallery
    pub sort_order: i64,
    pub uploaded_at: DateTime<Utc>,
}

/// Tag record in the database
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct TagRow {
    pub id: i64,
    pub name: String,
}

/// Item as returned from list endpoints: row plus tags and the first
/// gallery image (batched lookups, one query each per page)
#[derive(Debug, Clone, Serialize)]
pub struct ItemSummary {
    #[serde(flatten)]
    pub item: ItemRow,
    pub tags: Vec<TagRow>,
    pub thumbnail: Option<String>,
}

/// Item as returned from single-item endpoints
#[derive(Debug, Clone, Serialize)]
pub struct ItemDetail {
    #[serde(flatten)]
    pub item: ItemRow,
    pub tags: Vec<TagRow>,
    pub images: Vec<ImageRow>,
}

/// Create-item request body
///
/// Tags may contain nulls and blank strings from UI clients; they are
/// discarded during normalization.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateItem {
    pub name: String,
    pub category: Option<String>,
    pub material: Option<String>,
    pub gemstone: Option<String>,
    pub description: Option<String>,
    pub weight: Option<f64>,
    pub price: Option<f64>,
    pub sort_order: Option<i64>,
    #[serde(default)]
    pub tags: Vec<Option<String>>,
}

/// Partial-update request body; only supplied fields change. A
/// supplied tag list replaces the item's full tag set.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateItem {
    pub name: Option<String>,
    pub category: Option<String>,
    pub material: Option<String>,
    pub gemstone: Option<String>,
    pub description: Option<String>,
    pub weight: Option<f64>,
    pub price: Option<f64>,
    pub sort_order: Option<i64>,
    pub tags: Option<Vec<Option<String>>>,
}

/// Sortable item columns for list queries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemSortField {
    Name,
    Price,
    Weight,
    CreatedAt,
}

impl ItemSortField {
    pub fn column(self) -> &'static str {
        match self {
            Self::Name => "name",
            Self::Price => "price",
            Self::Weight => "weight",
            Self::CreatedAt => "created_at",
        }
    }
}

/// Sort direction for list queries
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

impl SortDirection {
    pub fn sql(self) -> &'static str {
        match self {
            Self::Asc => "ASC",
            Self::Desc => "DESC",
        }
    }
}

/// Filters, sort, and pagination for the item list
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ItemFilter {
    /// Case-insensitive substring match on name. LIKE wildcards (`%`,
    /// `_`) in the term are passed through unescaped, so they widen
    /// the match rather than matching literally.
    pub search: Option<String>,
    /// Exact material match
    pub material: Option<String>,
    /// Exact gemstone match; the literal "none" selects items without
    /// a gemstone
    pub gemstone: Option<String>,
    pub sort: Option<ItemSortField>,
    pub order: Option<SortDirection>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

/// Ordered id list for item and image reorder requests
#[derive(Debug, Clone, Deserialize)]
pub struct ReorderRequest {
    pub ids: Vec<i64>,
}

/// Batch-delete request body
#[derive(Debug, Clone, Deserialize)]
pub struct BatchDeleteRequest {
    pub ids: Vec<i64>,
}

/// Batch-delete response: the ids that were actually removed
#[derive(Debug, Clone, Serialize)]
pub struct BatchDeleteResponse {
    pub deleted: Vec<i64>,
}

/// Create/update request body for a tag
#[derive(Debug, Clone, Deserialize)]
pub struct TagPayload {
    pub name: String,
}

/// Aggregate statistics over the whole catalog
#[derive(Debug, Clone, Serialize)]
pub struct CatalogStats {
    pub total_count: i64,
    pub total_weight: f64,
    pub total_price: f64,
    pub avg_price: f64,
    pub materials: Vec<String>,
    pub gemstones: Vec<String>,
}
