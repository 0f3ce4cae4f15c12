//! Item repository: CRUD, filtered listing, batched page lookups,
//! reordering, and catalog statistics
//!
//! Queries return fully-materialized structures; tags and thumbnails
//! for a list page come from two batched queries keyed by the visible
//! item ids instead of per-item lookups.

use crate::catalog::models::{
    CatalogStats, CreateItem, ItemDetail, ItemFilter, ItemRow, ItemSummary, SortDirection,
    TagRow, UpdateItem, ITEM_SORT_SENTINEL,
};
use crate::catalog::{gallery, tags};
use crate::error::{is_unique_violation, AppError, AppResult};
use chrono::Utc;
use sqlx::{QueryBuilder, Sqlite, SqliteConnection, SqlitePool};
use std::collections::HashMap;

const ITEM_COLUMNS: &str =
    "id, name, category, material, gemstone, description, weight, price, sort_order, created_at";

fn check_non_negative(field: &str, value: Option<f64>) -> AppResult<()> {
    if let Some(v) = value {
        if v < 0.0 {
            return Err(AppError::Validation(format!(
                "{} must be non-negative",
                field
            )));
        }
    }
    Ok(())
}

/// Whether an item row exists
pub async fn item_exists(pool: &SqlitePool, item_id: i64) -> AppResult<bool> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM items WHERE id = ?1")
        .bind(item_id)
        .fetch_one(pool)
        .await?;
    Ok(count > 0)
}

/// Create an item together with its tag links in one transaction
pub async fn create_item(pool: &SqlitePool, input: CreateItem) -> AppResult<ItemDetail> {
    check_non_negative("weight", input.weight)?;
    check_non_negative("price", input.price)?;
    if input.name.is_empty() {
        return Err(AppError::Validation("Item name cannot be empty".to_string()));
    }

    let mut tx = pool.begin().await?;

    let created_at = Utc::now();
    let result = sqlx::query(
        r#"
        INSERT INTO items (name, category, material, gemstone, description, weight, price, sort_order, created_at)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
        "#,
    )
    .bind(&input.name)
    .bind(&input.category)
    .bind(&input.material)
    .bind(&input.gemstone)
    .bind(&input.description)
    .bind(input.weight)
    .bind(input.price)
    .bind(input.sort_order.unwrap_or(ITEM_SORT_SENTINEL))
    .bind(created_at)
    .execute(&mut *tx)
    .await;

    let item_id = match result {
        Ok(done) => done.last_insert_rowid(),
        Err(e) if is_unique_violation(&e) => {
            return Err(AppError::DuplicateName(input.name));
        }
        Err(e) => return Err(e.into()),
    };

    let item_tags =
        replace_tag_links(&mut tx, item_id, tags::normalize_tag_names(input.tags)).await?;

    tx.commit().await?;

    Ok(ItemDetail {
        item: ItemRow {
            id: item_id,
            name: input.name,
            category: input.category,
            material: input.material,
            gemstone: input.gemstone,
            description: input.description,
            weight: input.weight,
            price: input.price,
            sort_order: input.sort_order.unwrap_or(ITEM_SORT_SENTINEL),
            created_at,
        },
        tags: item_tags,
        images: Vec::new(),
    })
}

/// Replace an item's full tag set with the given normalized names
async fn replace_tag_links(
    tx: &mut SqliteConnection,
    item_id: i64,
    names: Vec<String>,
) -> AppResult<Vec<TagRow>> {
    sqlx::query("DELETE FROM item_tags WHERE item_id = ?1")
        .bind(item_id)
        .execute(&mut *tx)
        .await?;

    let mut linked = Vec::with_capacity(names.len());
    for name in names {
        let tag = tags::get_or_create(tx, &name).await?;
        sqlx::query("INSERT OR IGNORE INTO item_tags (item_id, tag_id) VALUES (?1, ?2)")
            .bind(item_id)
            .bind(tag.id)
            .execute(&mut *tx)
            .await?;
        linked.push(tag);
    }

    Ok(linked)
}

/// List items with optional filters, sort, and pagination
pub async fn list_items(pool: &SqlitePool, filter: &ItemFilter) -> AppResult<Vec<ItemSummary>> {
    let mut qb: QueryBuilder<Sqlite> =
        QueryBuilder::new(format!("SELECT {} FROM items WHERE 1=1", ITEM_COLUMNS));

    if let Some(search) = filter.search.as_deref().filter(|s| !s.is_empty()) {
        qb.push(" AND name LIKE ");
        qb.push_bind(format!("%{}%", search));
    }
    if let Some(material) = &filter.material {
        qb.push(" AND material = ");
        qb.push_bind(material);
    }
    if let Some(gemstone) = &filter.gemstone {
        if gemstone.eq_ignore_ascii_case("none") {
            qb.push(" AND gemstone IS NULL");
        } else {
            qb.push(" AND gemstone = ");
            qb.push_bind(gemstone);
        }
    }

    match filter.sort {
        Some(field) => {
            qb.push(" ORDER BY ");
            qb.push(field.column());
            qb.push(" ");
            qb.push(filter.order.unwrap_or_default().sql());
            qb.push(", id");
        }
        None => {
            qb.push(" ORDER BY sort_order ");
            qb.push(filter.order.unwrap_or(SortDirection::Asc).sql());
            qb.push(", id");
        }
    }

    if filter.limit.is_some() || filter.offset.is_some() {
        // SQLite needs a LIMIT clause to accept OFFSET
        qb.push(" LIMIT ");
        qb.push_bind(filter.limit.unwrap_or(-1));
        qb.push(" OFFSET ");
        qb.push_bind(filter.offset.unwrap_or(0));
    }

    let rows: Vec<ItemRow> = qb.build_query_as().fetch_all(pool).await?;

    let ids: Vec<i64> = rows.iter().map(|r| r.id).collect();
    let mut tags_by_item = tags_for_items(pool, &ids).await?;
    let mut thumbs = thumbnails_for_items(pool, &ids).await?;

    Ok(rows
        .into_iter()
        .map(|item| {
            let tags = tags_by_item.remove(&item.id).unwrap_or_default();
            let thumbnail = thumbs.remove(&item.id);
            ItemSummary {
                item,
                tags,
                thumbnail,
            }
        })
        .collect())
}

/// Tags for a set of items in one query
async fn tags_for_items(
    pool: &SqlitePool,
    item_ids: &[i64],
) -> AppResult<HashMap<i64, Vec<TagRow>>> {
    if item_ids.is_empty() {
        return Ok(HashMap::new());
    }

    let mut qb: QueryBuilder<Sqlite> = QueryBuilder::new(
        r#"
        SELECT it.item_id, t.id, t.name
        FROM item_tags it
        JOIN tags t ON t.id = it.tag_id
        WHERE it.item_id IN (
        "#,
    );
    let mut sep = qb.separated(", ");
    for id in item_ids {
        sep.push_bind(id);
    }
    qb.push(") ORDER BY t.name");

    let rows: Vec<(i64, i64, String)> = qb.build_query_as().fetch_all(pool).await?;

    let mut map: HashMap<i64, Vec<TagRow>> = HashMap::new();
    for (item_id, id, name) in rows {
        map.entry(item_id).or_default().push(TagRow { id, name });
    }
    Ok(map)
}

/// First-gallery-image URL for a set of items in one query
async fn thumbnails_for_items(
    pool: &SqlitePool,
    item_ids: &[i64],
) -> AppResult<HashMap<i64, String>> {
    if item_ids.is_empty() {
        return Ok(HashMap::new());
    }

    let mut qb: QueryBuilder<Sqlite> = QueryBuilder::new(
        r#"
        SELECT i.item_id, i.url
        FROM images i
        WHERE i.item_id IN (
        "#,
    );
    let mut sep = qb.separated(", ");
    for id in item_ids {
        sep.push_bind(id);
    }
    qb.push(
        r#") AND i.id = (
            SELECT i2.id FROM images i2
            WHERE i2.item_id = i.item_id
            ORDER BY i2.sort_order, i2.id
            LIMIT 1
        )"#,
    );

    let rows: Vec<(i64, String)> = qb.build_query_as().fetch_all(pool).await?;
    Ok(rows.into_iter().collect())
}

/// Read one item with its tags and ordered images
pub async fn get_item(pool: &SqlitePool, item_id: i64) -> AppResult<ItemDetail> {
    let item = sqlx::query_as::<_, ItemRow>(&format!(
        "SELECT {} FROM items WHERE id = ?1",
        ITEM_COLUMNS
    ))
    .bind(item_id)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| AppError::NotFound(format!("Item {} not found", item_id)))?;

    let mut tags_by_item = tags_for_items(pool, &[item_id]).await?;
    let images = gallery::list_images(pool, item_id).await?;

    Ok(ItemDetail {
        item,
        tags: tags_by_item.remove(&item_id).unwrap_or_default(),
        images,
    })
}

/// Partial update; only supplied fields change. A supplied tag list
/// replaces the item's full tag set.
pub async fn update_item(
    pool: &SqlitePool,
    item_id: i64,
    input: UpdateItem,
) -> AppResult<ItemDetail> {
    check_non_negative("weight", input.weight)?;
    check_non_negative("price", input.price)?;
    if let Some(name) = &input.name {
        if name.is_empty() {
            return Err(AppError::Validation("Item name cannot be empty".to_string()));
        }
    }

    let mut tx = pool.begin().await?;

    let exists: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM items WHERE id = ?1")
        .bind(item_id)
        .fetch_one(&mut *tx)
        .await?;
    if exists == 0 {
        return Err(AppError::NotFound(format!("Item {} not found", item_id)));
    }

    let mut qb: QueryBuilder<Sqlite> = QueryBuilder::new("UPDATE items SET ");
    let mut any = false;
    {
        let mut sep = qb.separated(", ");
        macro_rules! set_field {
            ($col:literal, $value:expr) => {
                if let Some(v) = $value {
                    sep.push(concat!($col, " = "));
                    sep.push_bind_unseparated(v);
                    any = true;
                }
            };
        }
        set_field!("name", input.name.clone());
        set_field!("category", input.category.clone());
        set_field!("material", input.material.clone());
        set_field!("gemstone", input.gemstone.clone());
        set_field!("description", input.description.clone());
        set_field!("weight", input.weight);
        set_field!("price", input.price);
        set_field!("sort_order", input.sort_order);
    }

    if any {
        qb.push(" WHERE id = ");
        qb.push_bind(item_id);

        let result = qb.build().execute(&mut *tx).await;
        match result {
            Ok(_) => {}
            Err(e) if is_unique_violation(&e) => {
                // name carries the only unique constraint, so the
                // colliding value is the supplied name
                return Err(match input.name {
                    Some(name) => AppError::DuplicateName(name),
                    None => e.into(),
                });
            }
            Err(e) => return Err(e.into()),
        }
    }

    if let Some(raw_tags) = input.tags {
        replace_tag_links(&mut tx, item_id, tags::normalize_tag_names(raw_tags)).await?;
    }

    tx.commit().await?;

    get_item(pool, item_id).await
}

/// Delete one item; image rows cascade
///
/// Returns the orphaned media URLs so the caller can unlink the
/// backing files best-effort.
pub async fn delete_item(pool: &SqlitePool, item_id: i64) -> AppResult<Vec<String>> {
    let mut tx = pool.begin().await?;

    let urls: Vec<String> = sqlx::query_scalar("SELECT url FROM images WHERE item_id = ?1")
        .bind(item_id)
        .fetch_all(&mut *tx)
        .await?;

    let done = sqlx::query("DELETE FROM items WHERE id = ?1")
        .bind(item_id)
        .execute(&mut *tx)
        .await?;

    if done.rows_affected() == 0 {
        return Err(AppError::NotFound(format!("Item {} not found", item_id)));
    }

    tx.commit().await?;
    Ok(urls)
}

/// Delete a batch of items, skipping ids that don't exist
///
/// Returns the ids actually deleted plus all orphaned media URLs.
pub async fn delete_items(
    pool: &SqlitePool,
    ids: &[i64],
) -> AppResult<(Vec<i64>, Vec<String>)> {
    if ids.is_empty() {
        return Err(AppError::Validation(
            "Batch delete requires at least one id".to_string(),
        ));
    }

    let mut tx = pool.begin().await?;

    let mut deleted = Vec::new();
    let mut urls = Vec::new();
    for &item_id in ids {
        let item_urls: Vec<String> =
            sqlx::query_scalar("SELECT url FROM images WHERE item_id = ?1")
                .bind(item_id)
                .fetch_all(&mut *tx)
                .await?;

        let done = sqlx::query("DELETE FROM items WHERE id = ?1")
            .bind(item_id)
            .execute(&mut *tx)
            .await?;

        if done.rows_affected() > 0 {
            deleted.push(item_id);
            urls.extend(item_urls);
        }
    }

    tx.commit().await?;
    Ok((deleted, urls))
}

/// Apply an explicit item order, same permissive discipline as the
/// gallery: 1-based index per id, unknown ids silently skipped, no
/// compaction on delete at the item level.
pub async fn apply_item_order(pool: &SqlitePool, ids: &[i64]) -> AppResult<()> {
    let mut tx = pool.begin().await?;

    for (idx, item_id) in ids.iter().enumerate() {
        sqlx::query("UPDATE items SET sort_order = ?1 WHERE id = ?2")
            .bind(idx as i64 + 1)
            .bind(item_id)
            .execute(&mut *tx)
            .await?;
    }

    tx.commit().await?;
    Ok(())
}

/// Aggregate statistics over the whole catalog
pub async fn collection_stats(pool: &SqlitePool) -> AppResult<CatalogStats> {
    let (total_count, total_weight, total_price): (i64, f64, f64) = sqlx::query_as(
        "SELECT COUNT(*), COALESCE(SUM(weight), 0.0), COALESCE(SUM(price), 0.0) FROM items",
    )
    .fetch_one(pool)
    .await?;

    let avg_price = if total_count > 0 {
        total_price / total_count as f64
    } else {
        0.0
    };

    let materials: Vec<String> = sqlx::query_scalar(
        "SELECT DISTINCT material FROM items WHERE material IS NOT NULL ORDER BY material",
    )
    .fetch_all(pool)
    .await?;

    let gemstones: Vec<String> = sqlx::query_scalar(
        "SELECT DISTINCT gemstone FROM items WHERE gemstone IS NOT NULL ORDER BY gemstone",
    )
    .fetch_all(pool)
    .await?;

    Ok(CatalogStats {
        total_count,
        total_weight,
        total_price,
        avg_price,
        materials,
        gemstones,
    })
}
