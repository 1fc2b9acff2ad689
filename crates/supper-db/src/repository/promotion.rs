//! # Promotion Repository
//!
//! Membership and coupon reads for discount evaluation, plus the
//! transactional redemption phase.
//!
//! ## Redemption
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │          Redemption (inside the order-creation transaction)             │
//! │                                                                         │
//! │  1. Merge discount lines into one amount per coupon code                │
//! │  2. SELECT ... FOR UPDATE the coupon rows (row locks only — other       │
//! │     coupons and orders are untouched)                                   │
//! │  3. Re-run the SAME eligibility predicate with fresh redemption         │
//! │     counts (closes the evaluate → redeem race window)                   │
//! │  4. Skip — never fail — any coupon that lost the race or would          │
//! │     duplicate a (coupon, order) pair; the unique constraint is the      │
//! │     final backstop                                                      │
//! │  5. Insert one ledger row per surviving code                            │
//! │                                                                         │
//! │  A skipped coupon leaves the ledger under-reflecting the previewed      │
//! │  discount. That soft mismatch is logged, not escalated.                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use sqlx::{PgConnection, PgPool};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::error::DbResult;
use supper_core::{
    check_coupon_eligibility, Coupon, CouponChannel, CouponKind, CouponUsage, DiscountContext,
    DiscountLine, DiscountType, Membership,
};

/// Repository for promotion reads and redemption writes.
#[derive(Debug, Clone)]
pub struct PromotionRepository {
    pool: PgPool,
}

// =============================================================================
// Row Types
// =============================================================================

#[derive(Debug, sqlx::FromRow)]
struct CouponRow {
    id: String,
    code: String,
    name: String,
    label: String,
    is_active: bool,
    kind: String,
    value: i64,
    valid_from: Option<DateTime<Utc>>,
    valid_until: Option<DateTime<Utc>>,
    min_subtotal_cents: Option<i64>,
    max_discount_cents: Option<i64>,
    stackable_with_membership: bool,
    stackable_with_coupons: bool,
    channel: String,
    max_redemptions_global: Option<i64>,
    max_redemptions_per_user: Option<i64>,
}

impl From<CouponRow> for Coupon {
    fn from(r: CouponRow) -> Self {
        Coupon {
            id: r.id,
            code: r.code,
            name: r.name,
            label: r.label,
            is_active: r.is_active,
            kind: CouponKind::parse(&r.kind),
            value: r.value,
            valid_from: r.valid_from,
            valid_until: r.valid_until,
            min_subtotal_cents: r.min_subtotal_cents,
            max_discount_cents: r.max_discount_cents,
            stackable_with_membership: r.stackable_with_membership,
            stackable_with_coupons: r.stackable_with_coupons,
            channel: CouponChannel::parse(&r.channel),
            max_redemptions_global: r.max_redemptions_global,
            max_redemptions_per_user: r.max_redemptions_per_user,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct MembershipRow {
    customer_id: String,
    label: String,
    percent_off_bps: i64,
    is_active: bool,
    valid_from: Option<DateTime<Utc>>,
    valid_until: Option<DateTime<Utc>>,
}

impl From<MembershipRow> for Membership {
    fn from(r: MembershipRow) -> Self {
        Membership {
            customer_id: r.customer_id,
            label: r.label,
            percent_off_bps: r.percent_off_bps,
            is_active: r.is_active,
            valid_from: r.valid_from,
            valid_until: r.valid_until,
        }
    }
}

/// One committed redemption ledger row.
#[derive(Debug, Clone)]
pub struct RedemptionRecord {
    pub id: String,
    pub coupon_id: String,
    pub coupon_code: String,
    pub order_id: String,
    pub customer_id: String,
    pub amount_cents: i64,
    pub channel: String,
    pub redeemed_at: DateTime<Utc>,
}

const COUPON_COLUMNS: &str = r#"
    id, code, name, label, is_active, kind, value,
    valid_from, valid_until, min_subtotal_cents, max_discount_cents,
    stackable_with_membership, stackable_with_coupons, channel,
    max_redemptions_global, max_redemptions_per_user
"#;

// =============================================================================
// Repository
// =============================================================================

impl PromotionRepository {
    /// Creates a new PromotionRepository.
    pub fn new(pool: PgPool) -> Self {
        PromotionRepository { pool }
    }

    /// Gets a customer's membership, if any.
    pub async fn membership_for(&self, customer_id: &str) -> DbResult<Option<Membership>> {
        let row = sqlx::query_as::<_, MembershipRow>(
            r#"
            SELECT customer_id, label, percent_off_bps, is_active, valid_from, valid_until
            FROM memberships
            WHERE customer_id = $1
            "#,
        )
        .bind(customer_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Into::into))
    }

    /// Loads coupons for the given canonical codes, preserving the code
    /// order, each paired with its current usage counts. Codes that match
    /// no coupon are silently absent.
    pub async fn coupons_with_usage(
        &self,
        codes: &[String],
        customer_id: Option<&str>,
    ) -> DbResult<Vec<(Coupon, CouponUsage)>> {
        if codes.is_empty() {
            return Ok(Vec::new());
        }

        let sql = format!("SELECT {COUPON_COLUMNS} FROM coupons WHERE code = ANY($1)");
        let rows = sqlx::query_as::<_, CouponRow>(&sql)
            .bind(codes)
            .fetch_all(&self.pool)
            .await?;

        let mut coupons: Vec<Coupon> = rows.into_iter().map(Into::into).collect();

        let mut conn = self.pool.acquire().await?;
        let mut out = Vec::with_capacity(coupons.len());
        for code in codes {
            let Some(pos) = coupons.iter().position(|c| &c.code == code) else {
                continue;
            };
            let coupon = coupons.swap_remove(pos);
            let usage = usage_counts(&mut conn, &coupon.id, customer_id).await?;
            out.push((coupon, usage));
        }

        Ok(out)
    }

    /// Redeems the coupon discount lines of a new order. Must run on the
    /// order-creation transaction's connection, after the order row exists.
    ///
    /// Re-validates every coupon under a row lock and skips any that fail;
    /// the caller's transaction commits regardless.
    pub async fn redeem(
        &self,
        conn: &mut PgConnection,
        order_id: &str,
        customer_id: &str,
        ctx: &DiscountContext,
        lines: &[DiscountLine],
    ) -> DbResult<Vec<RedemptionRecord>> {
        // One amount per code, merging duplicate lines.
        let mut per_code: Vec<(String, i64)> = Vec::new();
        for line in lines {
            if line.kind != DiscountType::Coupon {
                continue;
            }
            let Some(code) = line.code.as_deref() else {
                continue;
            };
            let code = code.to_uppercase();
            match per_code.iter_mut().find(|(c, _)| c == &code) {
                Some((_, amount)) => *amount += line.amount_cents,
                None => per_code.push((code, line.amount_cents)),
            }
        }

        if per_code.is_empty() {
            return Ok(Vec::new());
        }

        // Exclusive row locks on exactly the coupons we touch.
        let codes: Vec<String> = per_code.iter().map(|(c, _)| c.clone()).collect();
        let sql = format!("SELECT {COUPON_COLUMNS} FROM coupons WHERE code = ANY($1) FOR UPDATE");
        let locked: Vec<Coupon> = sqlx::query_as::<_, CouponRow>(&sql)
            .bind(&codes)
            .fetch_all(&mut *conn)
            .await?
            .into_iter()
            .map(Into::into)
            .collect();

        let mut records = Vec::with_capacity(per_code.len());
        for (code, amount_cents) in per_code {
            let Some(coupon) = locked.iter().find(|c| c.code == code) else {
                warn!(code = %code, "Coupon vanished before redemption, skipping");
                continue;
            };

            // Fresh counts under the lock.
            let usage = usage_counts(&mut *conn, &coupon.id, Some(customer_id)).await?;
            if let Err(reason) = check_coupon_eligibility(coupon, usage, ctx) {
                warn!(
                    code = %code,
                    order_id = %order_id,
                    reason = %reason,
                    "Coupon failed re-validation at redemption, skipping"
                );
                continue;
            }

            let id = Uuid::new_v4().to_string();
            let result = sqlx::query(
                r#"
                INSERT INTO coupon_redemptions (
                    id, coupon_id, customer_id, order_id, amount_cents, channel, redeemed_at
                ) VALUES ($1, $2, $3, $4, $5, $6, $7)
                ON CONFLICT (coupon_id, order_id) DO NOTHING
                "#,
            )
            .bind(&id)
            .bind(&coupon.id)
            .bind(customer_id)
            .bind(order_id)
            .bind(amount_cents)
            .bind(ctx.channel.as_str())
            .bind(ctx.now)
            .execute(&mut *conn)
            .await?;

            if result.rows_affected() == 0 {
                warn!(code = %code, order_id = %order_id, "Coupon already redeemed for this order, skipping");
                continue;
            }

            debug!(code = %code, order_id = %order_id, amount_cents, "Coupon redeemed");
            records.push(RedemptionRecord {
                id,
                coupon_id: coupon.id.clone(),
                coupon_code: coupon.code.clone(),
                order_id: order_id.to_string(),
                customer_id: customer_id.to_string(),
                amount_cents,
                channel: ctx.channel.as_str().to_string(),
                redeemed_at: ctx.now,
            });
        }

        Ok(records)
    }

    /// Counts redemptions for one coupon (total, and for one customer).
    pub async fn usage_for(
        &self,
        coupon_id: &str,
        customer_id: Option<&str>,
    ) -> DbResult<CouponUsage> {
        let mut conn = self.pool.acquire().await?;
        usage_counts(&mut conn, coupon_id, customer_id).await
    }
}

/// Usage counts on an explicit connection so redemption can read them
/// under its row locks.
async fn usage_counts(
    conn: &mut PgConnection,
    coupon_id: &str,
    customer_id: Option<&str>,
) -> DbResult<CouponUsage> {
    let (global_count, user_count): (i64, i64) = sqlx::query_as(
        r#"
        SELECT
            COUNT(*),
            COUNT(*) FILTER (WHERE customer_id = $2)
        FROM coupon_redemptions
        WHERE coupon_id = $1
        "#,
    )
    .bind(coupon_id)
    .bind(customer_id)
    .fetch_one(conn)
    .await?;

    Ok(CouponUsage {
        global_count,
        user_count,
    })
}
