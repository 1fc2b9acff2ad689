//! # Order Routes
//!
//! Thin request/response layer over [`OrderService`]. Validation here is
//! shape-only; everything interesting happens in supper-core.

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::Json;
use serde::{Deserialize, Serialize};

use supper_core::money::Quantity;
use supper_core::pricing::{Adjustment, DefaultOverride, QuoteLine};
use supper_core::{DiscountLine, Order, OrderAction, OrderSource};
use supper_db::OrderDetail;

use crate::error::ApiError;
use crate::AppState;

// =============================================================================
// Request / Response Types
// =============================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct DinnerSelectionRequest {
    pub code: String,
    pub style: String,
    #[serde(default)]
    pub quantity: Option<Quantity>,
    /// Option ids in submitted order; the order is priced sequentially.
    #[serde(default)]
    pub dinner_options: Vec<String>,
    #[serde(default)]
    pub default_overrides: Vec<DefaultOverride>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ItemLineRequest {
    pub code: String,
    pub qty: Quantity,
    #[serde(default)]
    pub options: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CouponRef {
    pub code: String,
}

#[derive(Debug, Deserialize)]
pub struct CreateOrderRequest {
    pub customer_id: String,
    #[serde(default)]
    pub order_source: Option<OrderSource>,
    pub dinner: DinnerSelectionRequest,
    #[serde(default)]
    pub items: Vec<ItemLineRequest>,
    #[serde(default)]
    pub coupons: Vec<CouponRef>,

    // Delivery snapshot (opaque)
    #[serde(default)]
    pub receiver_name: Option<String>,
    #[serde(default)]
    pub receiver_phone: Option<String>,
    #[serde(default)]
    pub delivery_address: Option<String>,
    #[serde(default)]
    pub geo_lat: Option<f64>,
    #[serde(default)]
    pub geo_lng: Option<f64>,
    #[serde(default)]
    pub place_label: Option<String>,
    #[serde(default)]
    pub address_meta: Option<serde_json::Value>,

    // Payment snapshot (opaque)
    #[serde(default)]
    pub payment_token: Option<String>,
    #[serde(default)]
    pub card_last4: Option<String>,

    #[serde(default)]
    pub note: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct PricePreviewRequest {
    #[serde(default)]
    pub customer_id: Option<String>,
    #[serde(default)]
    pub order_source: Option<OrderSource>,
    pub dinner: DinnerSelectionRequest,
    #[serde(default)]
    pub items: Vec<ItemLineRequest>,
    #[serde(default)]
    pub coupons: Vec<CouponRef>,
}

#[derive(Debug, Serialize)]
pub struct PricePreviewResponse {
    pub line_items: Vec<QuoteLine>,
    pub adjustments: Vec<Adjustment>,
    pub subtotal_cents: i64,
    pub discounts: Vec<DiscountLine>,
    pub discount_cents: i64,
    pub total_cents: i64,
}

#[derive(Debug, Deserialize)]
pub struct OrderActionRequest {
    pub action: String,
    #[serde(default)]
    pub reason: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ListOrdersQuery {
    pub customer_id: Option<String>,
    pub limit: Option<i64>,
}

// =============================================================================
// Handlers
// =============================================================================

/// GET /api/orders — newest first, optionally for one customer.
pub async fn list_orders(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ListOrdersQuery>,
) -> Result<Json<Vec<Order>>, ApiError> {
    let limit = query.limit.unwrap_or(50).clamp(1, 200);
    let orders = state.db.orders().list(query.customer_id.as_deref(), limit).await?;
    Ok(Json(orders))
}

/// POST /api/orders — create an order.
pub async fn create_order(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateOrderRequest>,
) -> Result<(StatusCode, Json<OrderDetail>), ApiError> {
    let detail = state.orders.create(req).await?;
    Ok((StatusCode::CREATED, Json(detail)))
}

/// POST /api/orders/price/preview — price without persisting anything.
pub async fn price_preview(
    State(state): State<Arc<AppState>>,
    Json(req): Json<PricePreviewRequest>,
) -> Result<Json<PricePreviewResponse>, ApiError> {
    let preview = state.orders.preview(req).await?;
    Ok(Json(preview))
}

/// GET /api/orders/{id} — full order read model.
pub async fn get_order(
    State(state): State<Arc<AppState>>,
    Path(order_id): Path<String>,
) -> Result<Json<OrderDetail>, ApiError> {
    let detail = state
        .db
        .orders()
        .get_detail(&order_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Order not found: {order_id}")))?;
    Ok(Json(detail))
}

/// POST /api/orders/{id}/action — run a lifecycle action.
///
/// Unsupported action names are 400s; out-of-order transitions are 409s.
pub async fn order_action(
    State(state): State<Arc<AppState>>,
    Path(order_id): Path<String>,
    headers: HeaderMap,
    Json(req): Json<OrderActionRequest>,
) -> Result<Json<OrderDetail>, ApiError> {
    let actor_id = headers
        .get("x-staff-id")
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);

    let action = OrderAction::parse(&req.action, req.reason)?;
    let detail = state.orders.apply_action(&order_id, action, actor_id).await?;
    Ok(Json(detail))
}
