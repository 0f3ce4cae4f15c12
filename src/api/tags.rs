//! Tag CRUD endpoints; names are trimmed and lower-cased on write
use crate::{
    catalog::models::{TagPayload, TagRow},
    catalog::tags,
    context::AppContext,
    error::AppResult,
};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, patch},
    Json, Router,
};

pub fn routes() -> Router<AppContext> {
    Router::new()
        .route("/tags", get(list_tags).post(create_tag))
        .route("/tags/:tag_id", patch(update_tag).delete(delete_tag))
}

/// GET /api/tags
async fn list_tags(State(ctx): State<AppContext>) -> AppResult<Json<Vec<TagRow>>> {
    let listed = tags::list(&ctx.db).await?;
    Ok(Json(listed))
}

/// POST /api/tags
async fn create_tag(
    State(ctx): State<AppContext>,
    Json(body): Json<TagPayload>,
) -> AppResult<(StatusCode, Json<TagRow>)> {
    let tag = tags::create(&ctx.db, &body.name).await?;
    Ok((StatusCode::CREATED, Json(tag)))
}

/// PATCH /api/tags/{id}
async fn update_tag(
    State(ctx): State<AppContext>,
    Path(tag_id): Path<i64>,
    Json(body): Json<TagPayload>,
) -> AppResult<Json<TagRow>> {
    let tag = tags::update(&ctx.db, tag_id, &body.name).await?;
    Ok(Json(tag))
}

/// DELETE /api/tags/{id}
async fn delete_tag(
    State(ctx): State<AppContext>,
    Path(tag_id): Path<i64>,
) -> AppResult<StatusCode> {
    tags::delete(&ctx.db, tag_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
