//! # Order Service
//!
//! Orchestrates an order's life: load catalog snapshots → price →
//! evaluate discounts → persist (with redemption) → publish the change
//! event, strictly after commit.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  create                                                                 │
//! │                                                                         │
//! │  catalog reads ──► price_order (pure) ──► evaluate_discounts (pure)     │
//! │                                                  │                      │
//! │                                                  ▼                      │
//! │                       OrderRepository::create ── one transaction,       │
//! │                       coupon redemption inside ──► COMMIT               │
//! │                                                  │                      │
//! │                             only after commit    ▼                      │
//! │                              EventPublisher::publish                    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::Utc;

use supper_core::money::{Money, Quantity};
use supper_core::pricing::{price_order, FreeItemSelection, PricingInput};
use supper_core::{
    evaluate_discounts, normalize_codes, DeliverySnapshot, DiscountOutcome, OrderAction,
    OrderSource, PaymentSnapshot,
};
use supper_db::{CreateOrder, Database, OrderDetail};
use supper_relay::EventPublisher;

use crate::error::ApiError;
use crate::routes::orders::{
    CouponRef, CreateOrderRequest, DinnerSelectionRequest, ItemLineRequest, PricePreviewRequest,
    PricePreviewResponse,
};

/// Order orchestration over the repositories and the publisher.
#[derive(Clone)]
pub struct OrderService {
    db: Database,
    publisher: EventPublisher,
}

impl OrderService {
    /// Creates a new OrderService.
    pub fn new(db: Database, publisher: EventPublisher) -> Self {
        OrderService { db, publisher }
    }

    /// Prices a prospective order and evaluates its discounts. Read-only.
    pub async fn preview(&self, req: PricePreviewRequest) -> Result<PricePreviewResponse, ApiError> {
        let input = self.pricing_input(&req.dinner, &req.items).await?;
        let quote = price_order(&input)?;

        let channel = req.order_source.unwrap_or_default();
        let discounts = self
            .evaluate(quote.subtotal(), req.customer_id.as_deref(), channel, &req.coupons)
            .await?;

        Ok(PricePreviewResponse {
            line_items: quote.lines,
            adjustments: quote.adjustments,
            subtotal_cents: quote.subtotal_cents,
            discounts: discounts.lines,
            discount_cents: discounts.discount_cents,
            total_cents: discounts.total_cents,
        })
    }

    /// Creates an order. Pricing and discount evaluation run exactly once,
    /// persistence and redemption share one transaction, and the change
    /// event is published only after the commit has returned.
    pub async fn create(&self, req: CreateOrderRequest) -> Result<OrderDetail, ApiError> {
        if !self.db.catalog().customer_exists(&req.customer_id).await? {
            return Err(ApiError::validation("Invalid customer_id"));
        }

        let input = self.pricing_input(&req.dinner, &req.items).await?;
        let quote = price_order(&input)?;

        let channel = req.order_source.unwrap_or_default();
        let discounts = self
            .evaluate(quote.subtotal(), Some(&req.customer_id), channel, &req.coupons)
            .await?;

        let new = CreateOrder {
            customer_id: req.customer_id,
            order_source: channel,
            delivery: DeliverySnapshot {
                receiver_name: req.receiver_name,
                receiver_phone: req.receiver_phone,
                delivery_address: req.delivery_address,
                geo_lat: req.geo_lat,
                geo_lng: req.geo_lng,
                place_label: req.place_label,
                address_meta: req.address_meta,
            },
            payment: PaymentSnapshot {
                payment_token: req.payment_token,
                card_last4: req.card_last4,
            },
            note: req.note,
        };

        let (order, event) = self
            .db
            .orders()
            .create(&self.db.promotions(), new, &quote, &discounts)
            .await?;

        // The transaction is committed; the pending effect may now fire.
        self.publisher.publish(&event).await;

        self.db
            .orders()
            .get_detail(&order.id)
            .await?
            .ok_or_else(|| ApiError::Internal("order vanished after creation".to_string()))
    }

    /// Applies a staff lifecycle action and publishes its event after the
    /// commit. Conflicts come back as 409s, untouched.
    pub async fn apply_action(
        &self,
        order_id: &str,
        action: OrderAction,
        actor_id: Option<String>,
    ) -> Result<OrderDetail, ApiError> {
        let (order, event) = self.db.orders().apply_action(order_id, &action, actor_id).await?;

        self.publisher.publish(&event).await;

        self.db
            .orders()
            .get_detail(&order.id)
            .await?
            .ok_or_else(|| ApiError::Internal("order vanished after transition".to_string()))
    }

    /// Resolves catalog snapshots for the pricing engine.
    async fn pricing_input(
        &self,
        dinner_sel: &DinnerSelectionRequest,
        items: &[ItemLineRequest],
    ) -> Result<PricingInput, ApiError> {
        let catalog = self.db.catalog();

        let dinner = catalog
            .active_dinner_by_code(&dinner_sel.code)
            .await?
            .ok_or_else(|| ApiError::validation(format!("Invalid dinner.code: {}", dinner_sel.code)))?;

        let style = catalog
            .style_by_code(&dinner_sel.style)
            .await?
            .ok_or_else(|| ApiError::validation(format!("Invalid dinner.style: {}", dinner_sel.style)))?;

        let style_allowed = catalog.style_allowed(&dinner.id, &style.id).await?;
        let fetched_dinner_options = catalog
            .dinner_options_by_ids(&dinner_sel.dinner_options)
            .await?;
        let default_items = catalog.default_items(&dinner.id).await?;

        let mut free_items = Vec::with_capacity(items.len());
        for line in items {
            let item = catalog
                .active_item_by_code(&line.code)
                .await?
                .ok_or_else(|| ApiError::validation(format!("Invalid item.code: {}", line.code)))?;
            let fetched_options = catalog.item_options_by_ids(&line.options).await?;
            free_items.push(FreeItemSelection {
                item,
                quantity: line.qty,
                requested_option_ids: line.options.clone(),
                fetched_options,
            });
        }

        Ok(PricingInput {
            dinner,
            style,
            style_allowed,
            quantity: dinner_sel.quantity.unwrap_or(Quantity::from_units(1)),
            requested_dinner_option_ids: dinner_sel.dinner_options.clone(),
            fetched_dinner_options,
            default_items,
            overrides: dinner_sel.default_overrides.clone(),
            free_items,
        })
    }

    /// Runs the read-only discount evaluation with current usage counts.
    async fn evaluate(
        &self,
        subtotal: Money,
        customer_id: Option<&str>,
        channel: OrderSource,
        coupons: &[CouponRef],
    ) -> Result<DiscountOutcome, ApiError> {
        let raw_codes: Vec<String> = coupons.iter().map(|c| c.code.clone()).collect();
        let codes = normalize_codes(&raw_codes);

        let promotions = self.db.promotions();
        let membership = match customer_id {
            Some(id) => promotions.membership_for(id).await?,
            None => None,
        };
        let pairs = promotions.coupons_with_usage(&codes, customer_id).await?;

        Ok(evaluate_discounts(
            subtotal,
            membership.as_ref(),
            &pairs,
            channel,
            Utc::now(),
        ))
    }
}
