//! # Discount Engine — Evaluation Phase
//!
//! Side-effect-free discount computation. Given a subtotal and the
//! customer's membership/coupon rows (plus their current usage counts),
//! produces an ordered list of discount lines and a final total.
//!
//! ## Policy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  ORDER OF APPLICATION                                                   │
//! │                                                                         │
//! │  1. Membership (percent of subtotal, half-up)    ← always first         │
//! │  2. Coupons, each against the CURRENT running total:                    │
//! │     - if any eligible coupon is non-stackable-with-coupons,             │
//! │       apply only the single highest-amount one                          │
//! │     - otherwise stack every eligible coupon in input order              │
//! │                                                                         │
//! │  The running total only ever decreases and clamps at zero.              │
//! │  min-subtotal checks use the ORIGINAL subtotal, not the running total.  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The transactional redemption phase lives in the storage layer; it reuses
//! [`check_coupon_eligibility`] with fresh usage counts taken under row
//! locks, closing the evaluate→redeem race window.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::money::{BasisPoints, Money};
use crate::types::OrderSource;

// =============================================================================
// Coupons
// =============================================================================

/// How a coupon's value is interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CouponKind {
    /// `value` is basis points off the running total.
    Percent,
    /// `value` is a fixed cent amount.
    Fixed,
}

impl CouponKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            CouponKind::Percent => "percent",
            CouponKind::Fixed => "fixed",
        }
    }

    pub fn parse(s: &str) -> CouponKind {
        match s {
            "percent" => CouponKind::Percent,
            _ => CouponKind::Fixed,
        }
    }
}

/// The channel a coupon is restricted to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CouponChannel {
    #[serde(rename = "ANY")]
    Any,
    #[serde(rename = "GUI")]
    Gui,
    #[serde(rename = "VOICE")]
    Voice,
}

impl CouponChannel {
    pub fn as_str(&self) -> &'static str {
        match self {
            CouponChannel::Any => "ANY",
            CouponChannel::Gui => "GUI",
            CouponChannel::Voice => "VOICE",
        }
    }

    pub fn parse(s: &str) -> CouponChannel {
        match s {
            "GUI" => CouponChannel::Gui,
            "VOICE" => CouponChannel::Voice,
            _ => CouponChannel::Any,
        }
    }

    pub fn accepts(&self, source: OrderSource) -> bool {
        match self {
            CouponChannel::Any => true,
            CouponChannel::Gui => source == OrderSource::Gui,
            CouponChannel::Voice => source == OrderSource::Voice,
        }
    }
}

/// A coupon row. `code` is canonical upper-case.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Coupon {
    pub id: String,
    pub code: String,
    pub name: String,
    pub label: String,
    pub is_active: bool,
    pub kind: CouponKind,
    /// Basis points for percent coupons, cents for fixed ones.
    pub value: i64,
    pub valid_from: Option<DateTime<Utc>>,
    pub valid_until: Option<DateTime<Utc>>,
    /// Checked against the original subtotal, never the running total.
    pub min_subtotal_cents: Option<i64>,
    pub max_discount_cents: Option<i64>,
    pub stackable_with_membership: bool,
    pub stackable_with_coupons: bool,
    pub channel: CouponChannel,
    pub max_redemptions_global: Option<i64>,
    pub max_redemptions_per_user: Option<i64>,
}

impl Coupon {
    /// Active and inside its validity window at `now`.
    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        if !self.is_active {
            return false;
        }
        if let Some(from) = self.valid_from {
            if now < from {
                return false;
            }
        }
        if let Some(until) = self.valid_until {
            if now > until {
                return false;
            }
        }
        true
    }

    /// The coupon's amount against a base, capped by its max-discount
    /// ceiling, never negative.
    pub fn amount_against(&self, base: Money) -> Money {
        let raw = match self.kind {
            CouponKind::Percent => base.percent_of(BasisPoints::from_bps(self.value)),
            CouponKind::Fixed => Money::from_cents(self.value),
        };
        let capped = match self.max_discount_cents {
            Some(cap) => raw.min(Money::from_cents(cap)),
            None => raw,
        };
        capped.clamp_at_zero()
    }

    /// Display label: label, then name, then code.
    pub fn display_label(&self) -> &str {
        if !self.label.is_empty() {
            &self.label
        } else if !self.name.is_empty() {
            &self.name
        } else {
            &self.code
        }
    }
}

// =============================================================================
// Membership
// =============================================================================

/// A customer's membership: a percent-off with a validity window.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Membership {
    pub customer_id: String,
    pub label: String,
    pub percent_off_bps: i64,
    pub is_active: bool,
    pub valid_from: Option<DateTime<Utc>>,
    pub valid_until: Option<DateTime<Utc>>,
}

impl Membership {
    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        if !self.is_active {
            return false;
        }
        if let Some(from) = self.valid_from {
            if now < from {
                return false;
            }
        }
        if let Some(until) = self.valid_until {
            if now > until {
                return false;
            }
        }
        true
    }
}

// =============================================================================
// Eligibility
// =============================================================================

/// Redemption counts for one coupon at a point in time.
#[derive(Debug, Clone, Copy, Default)]
pub struct CouponUsage {
    pub global_count: i64,
    pub user_count: i64,
}

/// The fixed inputs an eligibility check runs against.
#[derive(Debug, Clone, Copy)]
pub struct DiscountContext {
    pub now: DateTime<Utc>,
    pub channel: OrderSource,
    /// The original order subtotal (pre-discount).
    pub subtotal: Money,
    /// Whether a membership discount is being applied to this order.
    pub membership_applied: bool,
}

/// Why a coupon was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IneligibleReason {
    Inactive,
    NotStarted,
    Expired,
    WrongChannel,
    MinSubtotal,
    Exhausted,
    UserExhausted,
    NotStackableWithMembership,
}

impl std::fmt::Display for IneligibleReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            IneligibleReason::Inactive => "inactive",
            IneligibleReason::NotStarted => "not_started",
            IneligibleReason::Expired => "expired",
            IneligibleReason::WrongChannel => "wrong_channel",
            IneligibleReason::MinSubtotal => "min_subtotal",
            IneligibleReason::Exhausted => "exhausted",
            IneligibleReason::UserExhausted => "user_exhausted",
            IneligibleReason::NotStackableWithMembership => "not_stackable_with_membership",
        };
        f.write_str(s)
    }
}

/// The single eligibility predicate shared by evaluation and redemption.
/// Evaluation runs it with counts read outside any lock; redemption runs it
/// again with fresh counts under row locks.
pub fn check_coupon_eligibility(
    coupon: &Coupon,
    usage: CouponUsage,
    ctx: &DiscountContext,
) -> Result<(), IneligibleReason> {
    if !coupon.is_active {
        return Err(IneligibleReason::Inactive);
    }
    if let Some(from) = coupon.valid_from {
        if ctx.now < from {
            return Err(IneligibleReason::NotStarted);
        }
    }
    if let Some(until) = coupon.valid_until {
        if ctx.now > until {
            return Err(IneligibleReason::Expired);
        }
    }
    if !coupon.channel.accepts(ctx.channel) {
        return Err(IneligibleReason::WrongChannel);
    }
    if let Some(min) = coupon.min_subtotal_cents {
        if ctx.subtotal.cents() < min {
            return Err(IneligibleReason::MinSubtotal);
        }
    }
    if let Some(max) = coupon.max_redemptions_global {
        if usage.global_count >= max {
            return Err(IneligibleReason::Exhausted);
        }
    }
    if let Some(max) = coupon.max_redemptions_per_user {
        if usage.user_count >= max {
            return Err(IneligibleReason::UserExhausted);
        }
    }
    if ctx.membership_applied && !coupon.stackable_with_membership {
        return Err(IneligibleReason::NotStackableWithMembership);
    }
    Ok(())
}

// =============================================================================
// Evaluation
// =============================================================================

/// Kind of a discount line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiscountType {
    Membership,
    Coupon,
}

/// One applied discount, in application order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiscountLine {
    #[serde(rename = "type")]
    pub kind: DiscountType,
    pub label: String,
    pub code: Option<String>,
    pub amount_cents: i64,
}

/// The evaluation result: ordered lines, total discount, final total.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiscountOutcome {
    pub lines: Vec<DiscountLine>,
    pub discount_cents: i64,
    pub total_cents: i64,
}

impl DiscountOutcome {
    pub fn none(subtotal: Money) -> DiscountOutcome {
        DiscountOutcome {
            lines: Vec::new(),
            discount_cents: 0,
            total_cents: subtotal.cents(),
        }
    }
}

/// Canonicalizes coupon codes: trim, upper-case, drop empties, dedupe
/// preserving first occurrence.
pub fn normalize_codes(codes: &[String]) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(codes.len());
    for code in codes {
        let canonical = code.trim().to_uppercase();
        if canonical.is_empty() || out.contains(&canonical) {
            continue;
        }
        out.push(canonical);
    }
    out
}

/// Evaluates all discounts for an order. Read-only.
///
/// `coupons` must be in normalized-input-code order, each paired with its
/// usage counts; codes that resolved to no coupon row are simply absent.
pub fn evaluate_discounts(
    subtotal: Money,
    membership: Option<&Membership>,
    coupons: &[(Coupon, CouponUsage)],
    channel: OrderSource,
    now: DateTime<Utc>,
) -> DiscountOutcome {
    let mut lines: Vec<DiscountLine> = Vec::new();
    let mut running = subtotal;

    // 1) Membership, always ahead of any coupon.
    let mut membership_applied = false;
    if let Some(m) = membership {
        if m.is_valid_at(now) {
            let amount = subtotal.percent_of(BasisPoints::from_bps(m.percent_off_bps));
            if amount.is_positive() {
                running -= amount;
                lines.push(DiscountLine {
                    kind: DiscountType::Membership,
                    label: m.label.clone(),
                    code: None,
                    amount_cents: amount.cents(),
                });
                membership_applied = true;
            }
        }
    }

    // 2) Eligible coupons, screened against the post-membership total.
    let ctx = DiscountContext {
        now,
        channel,
        subtotal,
        membership_applied,
    };
    let eligible: Vec<(&Coupon, Money)> = coupons
        .iter()
        .filter(|(c, usage)| check_coupon_eligibility(c, *usage, &ctx).is_ok())
        .filter_map(|(c, _)| {
            let amount = c.amount_against(running);
            amount.is_positive().then_some((c, amount))
        })
        .collect();

    // 3) Apply: single best coupon when stacking is disallowed, otherwise
    //    every eligible coupon in input order against the running total.
    if eligible.iter().any(|(c, _)| !c.stackable_with_coupons) {
        if let Some((best, best_amount)) = eligible.iter().max_by_key(|(_, amount)| *amount) {
            let applied = (*best_amount).min(running);
            running -= applied;
            lines.push(DiscountLine {
                kind: DiscountType::Coupon,
                label: best.display_label().to_string(),
                code: Some(best.code.clone()),
                amount_cents: applied.cents(),
            });
        }
    } else {
        for (coupon, _) in &eligible {
            let applied = coupon.amount_against(running).min(running);
            if !applied.is_positive() {
                continue;
            }
            running -= applied;
            lines.push(DiscountLine {
                kind: DiscountType::Coupon,
                label: coupon.display_label().to_string(),
                code: Some(coupon.code.clone()),
                amount_cents: applied.cents(),
            });
        }
    }

    let discount_cents: i64 = lines.iter().map(|l| l.amount_cents).sum();
    let total = (subtotal - Money::from_cents(discount_cents)).clamp_at_zero();

    DiscountOutcome {
        lines,
        discount_cents,
        total_cents: total.cents(),
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn at() -> DateTime<Utc> {
        "2026-08-01T12:00:00Z".parse().unwrap()
    }

    fn membership(bps: i64) -> Membership {
        Membership {
            customer_id: "c1".into(),
            label: "Membership".into(),
            percent_off_bps: bps,
            is_active: true,
            valid_from: None,
            valid_until: None,
        }
    }

    fn percent_coupon(code: &str, bps: i64) -> Coupon {
        Coupon {
            id: format!("coupon-{code}"),
            code: code.to_string(),
            name: code.to_string(),
            label: String::new(),
            is_active: true,
            kind: CouponKind::Percent,
            value: bps,
            valid_from: None,
            valid_until: None,
            min_subtotal_cents: None,
            max_discount_cents: None,
            stackable_with_membership: true,
            stackable_with_coupons: true,
            channel: CouponChannel::Any,
            max_redemptions_global: None,
            max_redemptions_per_user: None,
        }
    }

    fn fixed_coupon(code: &str, cents: i64) -> Coupon {
        Coupon {
            kind: CouponKind::Fixed,
            value: cents,
            ..percent_coupon(code, 0)
        }
    }

    fn eval(
        subtotal: i64,
        membership: Option<&Membership>,
        coupons: Vec<Coupon>,
    ) -> DiscountOutcome {
        let pairs: Vec<(Coupon, CouponUsage)> =
            coupons.into_iter().map(|c| (c, CouponUsage::default())).collect();
        evaluate_discounts(
            Money::from_cents(subtotal),
            membership,
            &pairs,
            OrderSource::Gui,
            at(),
        )
    }

    #[test]
    fn test_no_discounts() {
        let out = eval(100_000, None, vec![]);
        assert!(out.lines.is_empty());
        assert_eq!(out.discount_cents, 0);
        assert_eq!(out.total_cents, 100_000);
    }

    #[test]
    fn test_membership_then_capped_percent_coupon() {
        // subtotal 210,000; membership 5% -> 10,500, running 199,500;
        // WELCOME10 at 10% would be 19,950 but is capped at 5,000.
        let m = membership(500);
        let mut welcome = percent_coupon("WELCOME10", 1_000);
        welcome.max_discount_cents = Some(5_000);

        let out = eval(210_000, Some(&m), vec![welcome]);
        assert_eq!(out.lines.len(), 2);
        assert_eq!(out.lines[0].kind, DiscountType::Membership);
        assert_eq!(out.lines[0].amount_cents, 10_500);
        assert_eq!(out.lines[1].kind, DiscountType::Coupon);
        assert_eq!(out.lines[1].amount_cents, 5_000);
        assert_eq!(out.discount_cents, 15_500);
        assert_eq!(out.total_cents, 194_500);
    }

    #[test]
    fn test_membership_is_always_first_line() {
        let m = membership(1_000);
        let out = eval(100_000, Some(&m), vec![fixed_coupon("FLAT", 1_000)]);
        assert_eq!(out.lines[0].kind, DiscountType::Membership);
        assert_eq!(out.lines[1].kind, DiscountType::Coupon);
    }

    #[test]
    fn test_expired_membership_ignored() {
        let mut m = membership(1_000);
        m.valid_until = Some("2020-01-01T00:00:00Z".parse().unwrap());
        let out = eval(100_000, Some(&m), vec![]);
        assert!(out.lines.is_empty());
    }

    #[test]
    fn test_percent_coupons_stack_against_running_total() {
        // 10% then 10%: second applies to 90,000, not 100,000.
        let out = eval(
            100_000,
            None,
            vec![percent_coupon("A", 1_000), percent_coupon("B", 1_000)],
        );
        assert_eq!(out.lines[0].amount_cents, 10_000);
        assert_eq!(out.lines[1].amount_cents, 9_000);
        assert_eq!(out.total_cents, 81_000);
    }

    #[test]
    fn test_non_stackable_coupon_wins_alone() {
        let mut exclusive = fixed_coupon("BIG", 30_000);
        exclusive.stackable_with_coupons = false;
        let out = eval(
            100_000,
            None,
            vec![fixed_coupon("SMALL", 5_000), exclusive],
        );
        // Exactly one coupon line: the highest-amount eligible one.
        assert_eq!(out.lines.len(), 1);
        assert_eq!(out.lines[0].code.as_deref(), Some("BIG"));
        assert_eq!(out.lines[0].amount_cents, 30_000);
        assert_eq!(out.total_cents, 70_000);
    }

    #[test]
    fn test_min_subtotal_checks_original_subtotal() {
        // Running total after membership drops below the floor, but the
        // check is against the original subtotal, so the coupon applies.
        let m = membership(500); // 5% of 210,000 -> running 199,500
        let mut c = fixed_coupon("FLOOR", 1_000);
        c.min_subtotal_cents = Some(205_000);
        let out = eval(210_000, Some(&m), vec![c]);
        assert_eq!(out.lines.len(), 2);

        // And a genuinely small order is rejected.
        let mut c2 = fixed_coupon("FLOOR", 1_000);
        c2.min_subtotal_cents = Some(205_000);
        let out = eval(200_000, None, vec![c2]);
        assert!(out.lines.is_empty());
    }

    #[test]
    fn test_membership_stacking_flag() {
        let m = membership(500);
        let mut loner = fixed_coupon("LONER", 1_000);
        loner.stackable_with_membership = false;
        let out = eval(100_000, Some(&m), vec![loner]);
        // Membership wins; the coupon is excluded entirely.
        assert_eq!(out.lines.len(), 1);
        assert_eq!(out.lines[0].kind, DiscountType::Membership);
    }

    #[test]
    fn test_total_clamps_at_zero() {
        let out = eval(10_000, None, vec![fixed_coupon("HUGE", 50_000)]);
        // Applied amount is capped to the running total.
        assert_eq!(out.lines[0].amount_cents, 10_000);
        assert_eq!(out.discount_cents, 10_000);
        assert_eq!(out.total_cents, 0);
    }

    #[test]
    fn test_running_total_is_monotone_and_total_non_negative() {
        let coupons = vec![
            fixed_coupon("A", 7_000),
            percent_coupon("B", 5_000),
            fixed_coupon("C", 9_999),
        ];
        let out = eval(20_000, None, coupons);
        let mut running = 20_000;
        for line in &out.lines {
            assert!(line.amount_cents >= 0);
            assert!(line.amount_cents <= running);
            running -= line.amount_cents;
        }
        assert!(out.total_cents >= 0);
        assert_eq!(out.total_cents, running);
    }

    #[test]
    fn test_wrong_channel_rejected() {
        let mut c = fixed_coupon("VOICEONLY", 1_000);
        c.channel = CouponChannel::Voice;
        let usage = CouponUsage::default();
        let ctx = DiscountContext {
            now: at(),
            channel: OrderSource::Gui,
            subtotal: Money::from_cents(100_000),
            membership_applied: false,
        };
        assert_eq!(
            check_coupon_eligibility(&c, usage, &ctx),
            Err(IneligibleReason::WrongChannel)
        );
    }

    #[test]
    fn test_redemption_caps() {
        let mut c = fixed_coupon("CAPPED", 1_000);
        c.max_redemptions_global = Some(100);
        c.max_redemptions_per_user = Some(1);
        let ctx = DiscountContext {
            now: at(),
            channel: OrderSource::Gui,
            subtotal: Money::from_cents(100_000),
            membership_applied: false,
        };

        let ok = CouponUsage { global_count: 99, user_count: 0 };
        assert!(check_coupon_eligibility(&c, ok, &ctx).is_ok());

        let global_full = CouponUsage { global_count: 100, user_count: 0 };
        assert_eq!(
            check_coupon_eligibility(&c, global_full, &ctx),
            Err(IneligibleReason::Exhausted)
        );

        let user_full = CouponUsage { global_count: 0, user_count: 1 };
        assert_eq!(
            check_coupon_eligibility(&c, user_full, &ctx),
            Err(IneligibleReason::UserExhausted)
        );
    }

    #[test]
    fn test_inactive_and_window() {
        let ctx = DiscountContext {
            now: at(),
            channel: OrderSource::Gui,
            subtotal: Money::from_cents(100_000),
            membership_applied: false,
        };
        let usage = CouponUsage::default();

        let mut c = fixed_coupon("X", 1_000);
        c.is_active = false;
        assert_eq!(
            check_coupon_eligibility(&c, usage, &ctx),
            Err(IneligibleReason::Inactive)
        );

        let mut c = fixed_coupon("X", 1_000);
        c.valid_from = Some("2030-01-01T00:00:00Z".parse().unwrap());
        assert_eq!(
            check_coupon_eligibility(&c, usage, &ctx),
            Err(IneligibleReason::NotStarted)
        );

        let mut c = fixed_coupon("X", 1_000);
        c.valid_until = Some("2020-01-01T00:00:00Z".parse().unwrap());
        assert_eq!(
            check_coupon_eligibility(&c, usage, &ctx),
            Err(IneligibleReason::Expired)
        );
    }

    #[test]
    fn test_normalize_codes() {
        let codes = vec![
            " welcome10 ".to_string(),
            "WELCOME10".to_string(),
            "".to_string(),
            "  ".to_string(),
            "vip".to_string(),
        ];
        assert_eq!(normalize_codes(&codes), vec!["WELCOME10", "VIP"]);
    }

    #[test]
    fn test_coupon_amount_never_negative() {
        let c = fixed_coupon("NEG", -500);
        assert_eq!(c.amount_against(Money::from_cents(10_000)).cents(), 0);
    }
}
