//! Item CRUD, listing, reordering, and stats endpoints
use crate::{
    catalog::items,
    catalog::models::{
        BatchDeleteRequest, BatchDeleteResponse, CatalogStats, CreateItem, ItemDetail,
        ItemFilter, ItemSummary, ReorderRequest, UpdateItem,
    },
    context::AppContext,
    error::AppResult,
};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{delete, get, patch},
    Json, Router,
};

pub fn routes() -> Router<AppContext> {
    Router::new()
        .route("/items", get(list_items).post(create_item))
        .route("/items/stats", get(collection_stats))
        .route("/items/batch", delete(delete_items_batch))
        .route("/items/reorder", patch(reorder_items))
        .route(
            "/items/:item_id",
            get(get_item).patch(update_item).delete(delete_item),
        )
}

/// POST /api/items
async fn create_item(
    State(ctx): State<AppContext>,
    Json(input): Json<CreateItem>,
) -> AppResult<(StatusCode, Json<ItemDetail>)> {
    let created = items::create_item(&ctx.db, input).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

/// GET /api/items
async fn list_items(
    State(ctx): State<AppContext>,
    Query(filter): Query<ItemFilter>,
) -> AppResult<Json<Vec<ItemSummary>>> {
    let listed = items::list_items(&ctx.db, &filter).await?;
    Ok(Json(listed))
}

/// GET /api/items/stats
async fn collection_stats(State(ctx): State<AppContext>) -> AppResult<Json<CatalogStats>> {
    let stats = items::collection_stats(&ctx.db).await?;
    Ok(Json(stats))
}

/// GET /api/items/{id}
async fn get_item(
    State(ctx): State<AppContext>,
    Path(item_id): Path<i64>,
) -> AppResult<Json<ItemDetail>> {
    let item = items::get_item(&ctx.db, item_id).await?;
    Ok(Json(item))
}

/// PATCH /api/items/{id}
async fn update_item(
    State(ctx): State<AppContext>,
    Path(item_id): Path<i64>,
    Json(input): Json<UpdateItem>,
) -> AppResult<Json<ItemDetail>> {
    let updated = items::update_item(&ctx.db, item_id, input).await?;
    Ok(Json(updated))
}

/// DELETE /api/items/{id}
///
/// Cascades to the item's image rows; backing files are unlinked best
/// effort after the transaction commits.
async fn delete_item(
    State(ctx): State<AppContext>,
    Path(item_id): Path<i64>,
) -> AppResult<StatusCode> {
    let orphaned = items::delete_item(&ctx.db, item_id).await?;
    for url in &orphaned {
        ctx.media.delete(url).await;
    }
    Ok(StatusCode::NO_CONTENT)
}

/// DELETE /api/items/batch
async fn delete_items_batch(
    State(ctx): State<AppContext>,
    Json(body): Json<BatchDeleteRequest>,
) -> AppResult<Json<BatchDeleteResponse>> {
    let (deleted, orphaned) = items::delete_items(&ctx.db, &body.ids).await?;
    for url in &orphaned {
        ctx.media.delete(url).await;
    }
    Ok(Json(BatchDeleteResponse { deleted }))
}

/// PATCH /api/items/reorder
async fn reorder_items(
    State(ctx): State<AppContext>,
    Json(body): Json<ReorderRequest>,
) -> AppResult<StatusCode> {
    items::apply_item_order(&ctx.db, &body.ids).await?;
    Ok(StatusCode::NO_CONTENT)
}
