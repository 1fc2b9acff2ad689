//! # Order Repository
//!
//! Database operations for orders: the creation transaction, guarded
//! lifecycle transitions, and the read models behind detail/list/bootstrap
//! queries.
//!
//! ## Creation Transaction
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                   SINGLE TRANSACTION                                    │
//! │                                                                         │
//! │  1. INSERT orders (totals + discount snapshot from the quote)           │
//! │  2. INSERT order_dinners / order_dinner_options (seq-ordered)           │
//! │  3. INSERT order_dinner_items / order_item_options (resolved deltas)    │
//! │  4. Redeem coupons (promotion repository, same connection:              │
//! │     row locks, re-validation, skip-on-race)                             │
//! │                                                                         │
//! │  COMMIT ← only then does the caller receive the ChangeEvent             │
//! │                                                                         │
//! │  A failure at any step rolls everything back; no event escapes, the     │
//! │  operation log shows no trace.                                          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Transitions follow the same discipline: row lock, pure transition,
//! status update + append-only log entry, commit, and only then the event.

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use thiserror::Error;
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use crate::repository::promotion::PromotionRepository;
use supper_core::lifecycle::{self, MARK_READY_EVENT};
use supper_core::money::Quantity;
use supper_core::pricing::{ChangeTag, OptionSnapshot, Quote};
use supper_core::{
    ready_from_log, ChangeEvent, CoreError, DeliverySnapshot, DiscountContext, DiscountLine,
    DiscountOutcome, DiscountType, OperationLogEntry, Order, OrderAction, OrderSource, OrderStatus,
    PaymentSnapshot,
};

// =============================================================================
// Errors
// =============================================================================

/// Failure modes of a lifecycle action: a domain conflict (surfaced as 409)
/// or a storage failure. Never coerced into one another.
#[derive(Debug, Error)]
pub enum OrderActionError {
    #[error(transparent)]
    Domain(#[from] CoreError),

    #[error(transparent)]
    Db(#[from] DbError),
}

impl From<sqlx::Error> for OrderActionError {
    fn from(err: sqlx::Error) -> Self {
        OrderActionError::Db(err.into())
    }
}

// =============================================================================
// Row & Read-Model Types
// =============================================================================

#[derive(Debug, sqlx::FromRow)]
struct OrderRow {
    id: String,
    customer_id: String,
    ordered_at: DateTime<Utc>,
    status: String,
    order_source: String,
    receiver_name: Option<String>,
    receiver_phone: Option<String>,
    delivery_address: Option<String>,
    geo_lat: Option<f64>,
    geo_lng: Option<f64>,
    place_label: Option<String>,
    address_meta: Option<serde_json::Value>,
    payment_token: Option<String>,
    card_last4: Option<String>,
    subtotal_cents: i64,
    discount_cents: i64,
    total_cents: i64,
    discounts: serde_json::Value,
    note: Option<String>,
}

const ORDER_COLUMNS: &str = r#"
    id, customer_id, ordered_at, status, order_source,
    receiver_name, receiver_phone, delivery_address,
    geo_lat, geo_lng, place_label, address_meta,
    payment_token, card_last4,
    subtotal_cents, discount_cents, total_cents, discounts, note
"#;

impl OrderRow {
    fn into_domain(self) -> DbResult<(Order, Vec<DiscountLine>)> {
        let status = OrderStatus::parse(&self.status)
            .ok_or_else(|| DbError::CorruptRow(format!("unknown order status '{}'", self.status)))?;
        let discounts: Vec<DiscountLine> = serde_json::from_value(self.discounts)
            .map_err(|e| DbError::CorruptRow(format!("discount snapshot: {e}")))?;

        Ok((
            Order {
                id: self.id,
                customer_id: self.customer_id,
                ordered_at: self.ordered_at,
                status,
                order_source: OrderSource::parse(&self.order_source),
                delivery: DeliverySnapshot {
                    receiver_name: self.receiver_name,
                    receiver_phone: self.receiver_phone,
                    delivery_address: self.delivery_address,
                    geo_lat: self.geo_lat,
                    geo_lng: self.geo_lng,
                    place_label: self.place_label,
                    address_meta: self.address_meta,
                },
                payment: PaymentSnapshot {
                    payment_token: self.payment_token,
                    card_last4: self.card_last4,
                },
                subtotal_cents: self.subtotal_cents,
                discount_cents: self.discount_cents,
                total_cents: self.total_cents,
                note: self.note,
            },
            discounts,
        ))
    }
}

#[derive(Debug, sqlx::FromRow)]
struct OperationRow {
    event: String,
    actor_id: Option<String>,
    at: DateTime<Utc>,
    note: Option<String>,
}

impl From<OperationRow> for OperationLogEntry {
    fn from(r: OperationRow) -> Self {
        OperationLogEntry {
            event: r.event,
            actor_id: r.actor_id,
            at: r.at,
            note: r.note,
        }
    }
}

/// One persisted item line of a dinner.
#[derive(Debug, Clone, serde::Serialize)]
pub struct OrderLineDetail {
    pub id: String,
    pub item_code: String,
    pub item_name: String,
    pub quantity: Quantity,
    pub unit_price_cents: i64,
    pub is_default: bool,
    pub change_tag: ChangeTag,
    pub options: Vec<OptionSnapshot>,
}

/// One persisted dinner block of an order.
#[derive(Debug, Clone, serde::Serialize)]
pub struct OrderDinnerDetail {
    pub id: String,
    pub dinner_code: String,
    pub dinner_name: String,
    pub style_code: String,
    pub style_name: String,
    pub quantity: Quantity,
    pub base_price_cents: i64,
    pub style_adjust_cents: i64,
    pub items: Vec<OrderLineDetail>,
    pub options: Vec<OptionSnapshot>,
}

/// The full order read model.
#[derive(Debug, Clone, serde::Serialize)]
pub struct OrderDetail {
    #[serde(flatten)]
    pub order: Order,
    pub discounts: Vec<DiscountLine>,
    pub dinners: Vec<OrderDinnerDetail>,
    pub operations: Vec<OperationLogEntry>,
    /// Derived by scanning the operation log; never a status of its own.
    pub ready: bool,
}

/// Bootstrap filters for the staff stream.
#[derive(Debug, Clone, Default)]
pub struct BootstrapFilter {
    pub statuses: Vec<String>,
    pub since: Option<DateTime<Utc>>,
    pub limit: i64,
}

/// One row of the staff bootstrap snapshot.
#[derive(Debug, Clone, serde::Serialize, sqlx::FromRow)]
pub struct BootstrapOrder {
    pub id: String,
    pub status: String,
    pub ordered_at: DateTime<Utc>,
    pub customer_id: String,
    pub order_source: String,
    pub subtotal_cents: i64,
    pub total_cents: i64,
    pub receiver_name: Option<String>,
    pub place_label: Option<String>,
}

/// Inputs for order creation, beyond the priced quote.
#[derive(Debug, Clone)]
pub struct CreateOrder {
    pub customer_id: String,
    pub order_source: OrderSource,
    pub delivery: DeliverySnapshot,
    pub payment: PaymentSnapshot,
    pub note: Option<String>,
}

// =============================================================================
// Repository
// =============================================================================

/// Repository for order database operations.
#[derive(Debug, Clone)]
pub struct OrderRepository {
    pool: PgPool,
}

impl OrderRepository {
    /// Creates a new OrderRepository.
    pub fn new(pool: PgPool) -> Self {
        OrderRepository { pool }
    }

    /// Creates an order in one transaction: order row, dinner block, item
    /// lines and option snapshots, then coupon redemption on the same
    /// connection. Returns the committed order and its creation event —
    /// the event exists only because the commit succeeded.
    pub async fn create(
        &self,
        promotions: &PromotionRepository,
        new: CreateOrder,
        quote: &Quote,
        discounts: &DiscountOutcome,
    ) -> DbResult<(Order, ChangeEvent)> {
        let order_id = Uuid::new_v4().to_string();
        let now = Utc::now();

        debug!(order_id = %order_id, customer_id = %new.customer_id, "Creating order");

        let discounts_json = serde_json::to_value(&discounts.lines)
            .map_err(|e| DbError::Internal(format!("discount snapshot: {e}")))?;

        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO orders (
                id, customer_id, ordered_at, status, order_source,
                receiver_name, receiver_phone, delivery_address,
                geo_lat, geo_lng, place_label, address_meta,
                payment_token, card_last4,
                subtotal_cents, discount_cents, total_cents, discounts, note
            ) VALUES (
                $1, $2, $3, $4, $5,
                $6, $7, $8,
                $9, $10, $11, $12,
                $13, $14,
                $15, $16, $17, $18, $19
            )
            "#,
        )
        .bind(&order_id)
        .bind(&new.customer_id)
        .bind(now)
        .bind(OrderStatus::Pending.as_str())
        .bind(new.order_source.as_str())
        .bind(&new.delivery.receiver_name)
        .bind(&new.delivery.receiver_phone)
        .bind(&new.delivery.delivery_address)
        .bind(new.delivery.geo_lat)
        .bind(new.delivery.geo_lng)
        .bind(&new.delivery.place_label)
        .bind(&new.delivery.address_meta)
        .bind(&new.payment.payment_token)
        .bind(&new.payment.card_last4)
        .bind(quote.subtotal_cents)
        .bind(discounts.discount_cents)
        .bind(discounts.total_cents)
        .bind(&discounts_json)
        .bind(&new.note)
        .execute(&mut *tx)
        .await?;

        // Dinner block.
        let dinner_row_id = Uuid::new_v4().to_string();
        sqlx::query(
            r#"
            INSERT INTO order_dinners (
                id, order_id, dinner_type_id, dinner_code, dinner_name,
                style_id, style_code, style_name,
                qty_hundredths, base_price_cents, style_adjust_cents
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            "#,
        )
        .bind(&dinner_row_id)
        .bind(&order_id)
        .bind(&quote.dinner.dinner_id)
        .bind(&quote.dinner.dinner_code)
        .bind(&quote.dinner.dinner_name)
        .bind(&quote.dinner.style_id)
        .bind(&quote.dinner.style_code)
        .bind(&quote.dinner.style_name)
        .bind(quote.dinner.quantity.hundredths())
        .bind(quote.dinner.base_price_cents)
        .bind(quote.dinner.style_adjust_cents)
        .execute(&mut *tx)
        .await?;

        // Dinner options, seq preserving the submitted order.
        for (seq, opt) in quote.dinner.options.iter().enumerate() {
            sqlx::query(
                r#"
                INSERT INTO order_dinner_options (
                    id, order_dinner_id, seq, option_group_name, option_name,
                    price_delta_cents, multiplier_millis
                ) VALUES ($1, $2, $3, $4, $5, $6, NULL)
                "#,
            )
            .bind(Uuid::new_v4().to_string())
            .bind(&dinner_row_id)
            .bind(seq as i64)
            .bind(&opt.group_name)
            .bind(&opt.name)
            .bind(opt.price_delta_cents)
            .execute(&mut *tx)
            .await?;
        }

        // Item lines with their (already resolved) option snapshots.
        for (seq, line) in quote.lines.iter().enumerate() {
            let line_id = Uuid::new_v4().to_string();
            sqlx::query(
                r#"
                INSERT INTO order_dinner_items (
                    id, order_dinner_id, seq, item_id, item_code, item_name,
                    qty_hundredths, unit_price_cents, is_default, change_tag
                ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
                "#,
            )
            .bind(&line_id)
            .bind(&dinner_row_id)
            .bind(seq as i64)
            .bind(&line.item_id)
            .bind(&line.item_code)
            .bind(&line.item_name)
            .bind(line.quantity.hundredths())
            .bind(line.unit_price_cents)
            .bind(line.is_default)
            .bind(line.change_tag.as_str())
            .execute(&mut *tx)
            .await?;

            for (opt_seq, snap) in line.options.iter().enumerate() {
                sqlx::query(
                    r#"
                    INSERT INTO order_item_options (
                        id, order_dinner_item_id, seq, option_group_name, option_name,
                        price_delta_cents, multiplier_millis
                    ) VALUES ($1, $2, $3, $4, $5, $6, NULL)
                    "#,
                )
                .bind(Uuid::new_v4().to_string())
                .bind(&line_id)
                .bind(opt_seq as i64)
                .bind(&snap.option_group_name)
                .bind(&snap.option_name)
                .bind(snap.price_delta_cents)
                .execute(&mut *tx)
                .await?;
            }
        }

        // Coupon redemption: same connection, after the order row exists.
        let ctx = DiscountContext {
            now,
            channel: new.order_source,
            subtotal: quote.subtotal(),
            membership_applied: discounts
                .lines
                .iter()
                .any(|l| l.kind == DiscountType::Membership),
        };
        promotions
            .redeem(&mut tx, &order_id, &new.customer_id, &ctx, &discounts.lines)
            .await?;

        tx.commit().await?;

        info!(
            order_id = %order_id,
            subtotal_cents = quote.subtotal_cents,
            total_cents = discounts.total_cents,
            "Order created"
        );

        let order = Order {
            id: order_id.clone(),
            customer_id: new.customer_id,
            ordered_at: now,
            status: OrderStatus::Pending,
            order_source: new.order_source,
            delivery: new.delivery,
            payment: new.payment,
            subtotal_cents: quote.subtotal_cents,
            discount_cents: discounts.discount_cents,
            total_cents: discounts.total_cents,
            note: new.note,
        };

        Ok((order, ChangeEvent::order_created(&order_id, now)))
    }

    /// Applies a lifecycle action inside one transaction: row lock, pure
    /// transition, status update if any, append-only log entry, commit.
    /// The returned event must only be published by the caller because the
    /// commit has already succeeded.
    pub async fn apply_action(
        &self,
        order_id: &str,
        action: &OrderAction,
        actor_id: Option<String>,
    ) -> Result<(Order, ChangeEvent), OrderActionError> {
        let mut tx = self.pool.begin().await?;

        let sql = format!("SELECT {ORDER_COLUMNS} FROM orders WHERE id = $1 FOR UPDATE");
        let row = sqlx::query_as::<_, OrderRow>(&sql)
            .bind(order_id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| DbError::not_found("Order", order_id))?;
        let (mut order, _) = row.into_domain()?;

        let was_ready: bool = sqlx::query_scalar(
            "SELECT EXISTS (SELECT 1 FROM order_operations WHERE order_id = $1 AND event = $2)",
        )
        .bind(order_id)
        .bind(MARK_READY_EVENT)
        .fetch_one(&mut *tx)
        .await?;

        let transition =
            lifecycle::apply_action(order_id, order.status, was_ready, action, actor_id, Utc::now())?;

        if transition.status_changed {
            sqlx::query("UPDATE orders SET status = $2 WHERE id = $1")
                .bind(order_id)
                .bind(transition.new_status.as_str())
                .execute(&mut *tx)
                .await?;
        }

        sqlx::query(
            r#"
            INSERT INTO order_operations (order_id, event, actor_id, at, note)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(order_id)
        .bind(&transition.log_entry.event)
        .bind(&transition.log_entry.actor_id)
        .bind(transition.log_entry.at)
        .bind(&transition.log_entry.note)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        info!(
            order_id = %order_id,
            event = %transition.log_entry.event,
            status = %transition.new_status,
            "Order transition committed"
        );

        order.status = transition.new_status;
        Ok((order, transition.event))
    }

    /// Loads the full order read model.
    pub async fn get_detail(&self, order_id: &str) -> DbResult<Option<OrderDetail>> {
        let sql = format!("SELECT {ORDER_COLUMNS} FROM orders WHERE id = $1");
        let Some(row) = sqlx::query_as::<_, OrderRow>(&sql)
            .bind(order_id)
            .fetch_optional(&self.pool)
            .await?
        else {
            return Ok(None);
        };
        let (order, discounts) = row.into_domain()?;

        let dinners = self.load_dinners(order_id).await?;
        let operations = self.operations(order_id).await?;
        let ready = ready_from_log(&operations);

        Ok(Some(OrderDetail {
            order,
            discounts,
            dinners,
            operations,
            ready,
        }))
    }

    /// Lists order headers, newest first, optionally for one customer.
    pub async fn list(&self, customer_id: Option<&str>, limit: i64) -> DbResult<Vec<Order>> {
        let sql = format!(
            r#"
            SELECT {ORDER_COLUMNS} FROM orders
            WHERE ($1::text IS NULL OR customer_id = $1)
            ORDER BY ordered_at DESC
            LIMIT $2
            "#
        );
        let rows = sqlx::query_as::<_, OrderRow>(&sql)
            .bind(customer_id)
            .bind(limit)
            .fetch_all(&self.pool)
            .await?;

        rows.into_iter()
            .map(|r| r.into_domain().map(|(order, _)| order))
            .collect()
    }

    /// The staff bootstrap snapshot: current orders, newest first, with
    /// optional status-set and since filters.
    pub async fn bootstrap(&self, filter: &BootstrapFilter) -> DbResult<Vec<BootstrapOrder>> {
        let rows = sqlx::query_as::<_, BootstrapOrder>(
            r#"
            SELECT
                id, status, ordered_at, customer_id, order_source,
                subtotal_cents, total_cents, receiver_name, place_label
            FROM orders
            WHERE (cardinality($1::text[]) = 0 OR status = ANY($1))
              AND ($2::timestamptz IS NULL OR ordered_at >= $2)
            ORDER BY ordered_at DESC
            LIMIT $3
            "#,
        )
        .bind(&filter.statuses)
        .bind(filter.since)
        .bind(filter.limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    /// The append-only operation log, in append order.
    pub async fn operations(&self, order_id: &str) -> DbResult<Vec<OperationLogEntry>> {
        let rows = sqlx::query_as::<_, OperationRow>(
            r#"
            SELECT event, actor_id, at, note
            FROM order_operations
            WHERE order_id = $1
            ORDER BY id
            "#,
        )
        .bind(order_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn load_dinners(&self, order_id: &str) -> DbResult<Vec<OrderDinnerDetail>> {
        #[derive(sqlx::FromRow)]
        struct DinnerRow {
            id: String,
            dinner_code: String,
            dinner_name: String,
            style_code: String,
            style_name: String,
            qty_hundredths: i64,
            base_price_cents: i64,
            style_adjust_cents: i64,
        }

        #[derive(sqlx::FromRow)]
        struct LineRow {
            id: String,
            item_code: String,
            item_name: String,
            qty_hundredths: i64,
            unit_price_cents: i64,
            is_default: bool,
            change_tag: String,
        }

        #[derive(sqlx::FromRow)]
        struct SnapshotRow {
            option_group_name: String,
            option_name: String,
            price_delta_cents: i64,
            multiplier_millis: Option<i64>,
        }

        let dinner_rows = sqlx::query_as::<_, DinnerRow>(
            r#"
            SELECT id, dinner_code, dinner_name, style_code, style_name,
                   qty_hundredths, base_price_cents, style_adjust_cents
            FROM order_dinners
            WHERE order_id = $1
            "#,
        )
        .bind(order_id)
        .fetch_all(&self.pool)
        .await?;

        let mut dinners = Vec::with_capacity(dinner_rows.len());
        for d in dinner_rows {
            let option_rows = sqlx::query_as::<_, SnapshotRow>(
                r#"
                SELECT option_group_name, option_name, price_delta_cents, multiplier_millis
                FROM order_dinner_options
                WHERE order_dinner_id = $1
                ORDER BY seq
                "#,
            )
            .bind(&d.id)
            .fetch_all(&self.pool)
            .await?;

            let line_rows = sqlx::query_as::<_, LineRow>(
                r#"
                SELECT id, item_code, item_name, qty_hundredths, unit_price_cents,
                       is_default, change_tag
                FROM order_dinner_items
                WHERE order_dinner_id = $1
                ORDER BY seq
                "#,
            )
            .bind(&d.id)
            .fetch_all(&self.pool)
            .await?;

            let mut items = Vec::with_capacity(line_rows.len());
            for line in line_rows {
                let snaps = sqlx::query_as::<_, SnapshotRow>(
                    r#"
                    SELECT option_group_name, option_name, price_delta_cents, multiplier_millis
                    FROM order_item_options
                    WHERE order_dinner_item_id = $1
                    ORDER BY seq
                    "#,
                )
                .bind(&line.id)
                .fetch_all(&self.pool)
                .await?;

                items.push(OrderLineDetail {
                    id: line.id,
                    item_code: line.item_code,
                    item_name: line.item_name,
                    quantity: Quantity::from_hundredths(line.qty_hundredths),
                    unit_price_cents: line.unit_price_cents,
                    is_default: line.is_default,
                    change_tag: ChangeTag::parse(&line.change_tag),
                    options: snaps
                        .into_iter()
                        .map(|s| OptionSnapshot {
                            option_group_name: s.option_group_name,
                            option_name: s.option_name,
                            price_delta_cents: s.price_delta_cents,
                            multiplier_millis: s.multiplier_millis,
                        })
                        .collect(),
                });
            }

            dinners.push(OrderDinnerDetail {
                id: d.id,
                dinner_code: d.dinner_code,
                dinner_name: d.dinner_name,
                style_code: d.style_code,
                style_name: d.style_name,
                quantity: Quantity::from_hundredths(d.qty_hundredths),
                base_price_cents: d.base_price_cents,
                style_adjust_cents: d.style_adjust_cents,
                items,
                options: option_rows
                    .into_iter()
                    .map(|s| OptionSnapshot {
                        option_group_name: s.option_group_name,
                        option_name: s.option_name,
                        price_delta_cents: s.price_delta_cents,
                        multiplier_millis: s.multiplier_millis,
                    })
                    .collect(),
            });
        }

        Ok(dinners)
    }
}
