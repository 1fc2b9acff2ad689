//! HTTP routing.

pub mod events;
pub mod orders;

use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;

use crate::AppState;

/// Builds the API router.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/orders", get(orders::list_orders).post(orders::create_order))
        .route("/api/orders/price/preview", post(orders::price_preview))
        .route("/api/orders/{id}", get(orders::get_order))
        .route("/api/orders/{id}/action", post(orders::order_action))
        .route("/api/staff/orders/events", get(events::order_events))
        .with_state(state)
}
