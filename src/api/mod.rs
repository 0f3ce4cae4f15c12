//! API routes and handlers
pub mod health;
pub mod images;
pub mod items;
pub mod tags;

use crate::context::AppContext;
use axum::Router;

/// Build API routes
pub fn routes() -> Router<AppContext> {
    Router::new()
        .merge(health::routes())
        .merge(items::routes())
        .merge(images::routes())
        .merge(tags::routes())
}
