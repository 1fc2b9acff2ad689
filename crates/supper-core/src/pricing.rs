//! # Pricing Engine
//!
//! Pure price computation for an order: no I/O, no side effects. Given
//! catalog snapshots and the customer's selections, produces per-line unit
//! prices, a dinner subtotal, and adjustment lines.
//!
//! ## Rounding Rules
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  WHERE ROUNDING HAPPENS (half away from zero, integer cents)            │
//! │                                                                         │
//! │  Item unit price:                                                       │
//! │    round((base + Σ addon deltas) × Π multipliers)     ← exactly once    │
//! │                                                                         │
//! │  Dinner base with multiplier style:                                     │
//! │    round(base × style factor)                                           │
//! │                                                                         │
//! │  Dinner option (multiplier mode), applied IN CALLER ORDER:              │
//! │    delta = round(running × (factor − 1)); running += delta              │
//! │    (per-step, against the current running unit — order matters)         │
//! │                                                                         │
//! │  Line / dinner subtotal:                                                │
//! │    round(unit × quantity)                                               │
//! │                                                                         │
//! │  Never: per-option rounding inside the item product, never re-rounding  │
//! │  of already-rounded values.                                             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use serde::{Deserialize, Serialize};

use crate::catalog::{
    DinnerDefaultItem, DinnerOption, DinnerType, ItemOption, MenuItem, PriceValue, ServingStyle,
};
use crate::error::ValidationError;
use crate::money::{Money, Quantity};

// =============================================================================
// Quote Types
// =============================================================================

/// Snapshot of one selected option on a line.
///
/// Exactly one of `price_delta_cents` / `multiplier_millis` is meaningful.
/// Quotes may carry the multiplier form; storage always receives the
/// resolved-delta form (see [`resolve_snapshots_for_storage`]).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OptionSnapshot {
    pub option_group_name: String,
    pub option_name: String,
    pub price_delta_cents: i64,
    pub multiplier_millis: Option<i64>,
}

/// How a line's quantity differs from the dinner's default.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeTag {
    Unchanged,
    Added,
    Removed,
    Increased,
    Decreased,
}

impl ChangeTag {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChangeTag::Unchanged => "unchanged",
            ChangeTag::Added => "added",
            ChangeTag::Removed => "removed",
            ChangeTag::Increased => "increased",
            ChangeTag::Decreased => "decreased",
        }
    }

    pub fn parse(s: &str) -> ChangeTag {
        match s {
            "added" => ChangeTag::Added,
            "removed" => ChangeTag::Removed,
            "increased" => ChangeTag::Increased,
            "decreased" => ChangeTag::Decreased,
            _ => ChangeTag::Unchanged,
        }
    }
}

/// One item line of a quote (default or freely added).
///
/// Default lines are informational: included-in-base lines cost zero, and
/// non-included ones carry the catalog unit for display only. Neither
/// contributes to `line_subtotal_cents`; only freely added quantities do.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuoteLine {
    pub item_id: String,
    pub item_code: String,
    pub item_name: String,
    pub quantity: Quantity,
    pub unit_price_cents: i64,
    pub is_default: bool,
    pub change_tag: ChangeTag,
    pub options: Vec<OptionSnapshot>,
    pub line_subtotal_cents: i64,
}

/// A dinner option with its resolved (order-dependent) delta.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppliedDinnerOption {
    pub group_name: String,
    pub name: String,
    pub price_delta_cents: i64,
}

/// Kind of adjustment line shown on a preview.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdjustmentKind {
    Style,
    DinnerOption,
    DefaultOverride,
}

/// A non-line price explanation: style, dinner option, or a default-item
/// override (which usually carries a zero value).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Adjustment {
    #[serde(rename = "type")]
    pub kind: AdjustmentKind,
    pub label: String,
    pub mode: String,
    pub value_cents: i64,
}

/// The priced dinner block of a quote.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DinnerQuote {
    pub dinner_id: String,
    pub dinner_code: String,
    pub dinner_name: String,
    pub style_id: String,
    pub style_code: String,
    pub style_name: String,
    pub quantity: Quantity,
    /// Catalog base before the style was applied.
    pub base_price_cents: i64,
    pub style_adjust_cents: i64,
    /// Final running unit after style and all dinner options.
    pub unit_price_cents: i64,
    pub options: Vec<AppliedDinnerOption>,
    pub subtotal_cents: i64,
}

/// A fully priced order, before discounts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Quote {
    pub dinner: DinnerQuote,
    pub lines: Vec<QuoteLine>,
    pub adjustments: Vec<Adjustment>,
    pub subtotal_cents: i64,
}

impl Quote {
    #[inline]
    pub fn subtotal(&self) -> Money {
        Money::from_cents(self.subtotal_cents)
    }
}

// =============================================================================
// Pricing Input
// =============================================================================

/// An override of a default item's quantity, within [0, default].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DefaultOverride {
    pub code: String,
    #[serde(rename = "qty")]
    pub quantity: Quantity,
}

/// A freely added item line with its selected option ids. `fetched_options`
/// holds whatever rows the caller could resolve for `requested_option_ids`;
/// ownership and completeness are validated here.
#[derive(Debug, Clone)]
pub struct FreeItemSelection {
    pub item: MenuItem,
    pub quantity: Quantity,
    pub requested_option_ids: Vec<String>,
    pub fetched_options: Vec<ItemOption>,
}

/// Everything the engine needs to price one order.
#[derive(Debug, Clone)]
pub struct PricingInput {
    pub dinner: DinnerType,
    pub style: ServingStyle,
    /// Whether (dinner, style) is in the allowed relation.
    pub style_allowed: bool,
    pub quantity: Quantity,
    /// Option ids exactly as submitted; order is semantically significant.
    pub requested_dinner_option_ids: Vec<String>,
    pub fetched_dinner_options: Vec<DinnerOption>,
    pub default_items: Vec<DinnerDefaultItem>,
    pub overrides: Vec<DefaultOverride>,
    pub free_items: Vec<FreeItemSelection>,
}

// =============================================================================
// Item Pricing
// =============================================================================

/// Validates that every requested option id resolves to an option owned by
/// `item`, returning the options in request order (first occurrence wins
/// for duplicated ids). Offending ids — unknown or foreign — are all
/// reported together.
pub fn resolve_item_options<'a>(
    item: &MenuItem,
    requested_ids: &[String],
    fetched: &'a [ItemOption],
) -> Result<Vec<&'a ItemOption>, ValidationError> {
    let mut resolved: Vec<&ItemOption> = Vec::with_capacity(requested_ids.len());
    let mut offending: Vec<String> = Vec::new();

    for id in requested_ids {
        match fetched.iter().find(|o| &o.id == id) {
            Some(opt) if opt.group_item_id == item.id => {
                if !resolved.iter().any(|o| &o.id == id) {
                    resolved.push(opt);
                }
            }
            _ => offending.push(id.clone()),
        }
    }

    if !offending.is_empty() {
        return Err(ValidationError::OptionsNotForItem {
            item: item.code.clone(),
            option_ids: offending,
        });
    }

    Ok(resolved)
}

/// Computes an item's unit price from its base and selected options.
///
/// Addon deltas accumulate into a single sum; multiplier factors accumulate
/// into an exact product. The final unit is
/// `round_half_up((base + Σ addons) × Π multipliers)` — one rounding, after
/// both accumulations.
pub fn item_unit_price(
    item: &MenuItem,
    options: &[&ItemOption],
) -> (Money, Vec<OptionSnapshot>) {
    let mut addons = Money::zero();
    let mut numerator: i128 = 1;
    let mut denominator: i128 = 1;
    let mut snapshots = Vec::with_capacity(options.len());

    for opt in options {
        match opt.price_value() {
            PriceValue::Addon(delta) => {
                addons += delta;
                snapshots.push(OptionSnapshot {
                    option_group_name: opt.group_name.clone(),
                    option_name: opt.name.clone(),
                    price_delta_cents: delta.cents(),
                    multiplier_millis: None,
                });
            }
            PriceValue::Multiplier(m) => {
                numerator *= m.millis() as i128;
                denominator *= 1_000;
                snapshots.push(OptionSnapshot {
                    option_group_name: opt.group_name.clone(),
                    option_name: opt.name.clone(),
                    price_delta_cents: 0,
                    multiplier_millis: Some(m.millis()),
                });
            }
        }
    }

    let unit = (item.base_price() + addons).mul_ratio(numerator, denominator);
    (unit, snapshots)
}

/// Converts multiplier snapshots to their resolved additive deltas for
/// storage: applied in order against a running unit that starts at
/// `base + Σ addons`. Persisted snapshots never carry a multiplier.
pub fn resolve_snapshots_for_storage(
    base_plus_addons: Money,
    snapshots: &[OptionSnapshot],
) -> Vec<OptionSnapshot> {
    let mut running = base_plus_addons;
    snapshots
        .iter()
        .map(|snap| match snap.multiplier_millis {
            None => snap.clone(),
            Some(millis) => {
                let delta = running.mul_ratio((millis - 1_000) as i128, 1_000);
                running += delta;
                OptionSnapshot {
                    option_group_name: snap.option_group_name.clone(),
                    option_name: snap.option_name.clone(),
                    price_delta_cents: delta.cents(),
                    multiplier_millis: None,
                }
            }
        })
        .collect()
}

// =============================================================================
// Dinner Pricing
// =============================================================================

/// Applies the serving style to the dinner base.
///
/// Returns `(new unit, adjustment)`: addon styles add their value,
/// multiplier styles scale the base with one half-up rounding and report
/// the difference.
pub fn apply_style(
    dinner: &DinnerType,
    style: &ServingStyle,
    style_allowed: bool,
) -> Result<(Money, Money), ValidationError> {
    if !style_allowed {
        return Err(ValidationError::StyleNotAllowed {
            style: style.code.clone(),
            dinner: dinner.code.clone(),
        });
    }

    let base = dinner.base_price();
    match style.price_value() {
        PriceValue::Addon(value) => Ok((base + value, value)),
        PriceValue::Multiplier(m) => {
            let new_base = base.scale(m);
            Ok((new_base, new_base - base))
        }
    }
}

/// Validates dinner option ownership and returns the options in request
/// order. Offending ids are all reported together.
pub fn resolve_dinner_options<'a>(
    dinner: &DinnerType,
    requested_ids: &[String],
    fetched: &'a [DinnerOption],
) -> Result<Vec<&'a DinnerOption>, ValidationError> {
    let mut resolved: Vec<&DinnerOption> = Vec::with_capacity(requested_ids.len());
    let mut offending: Vec<String> = Vec::new();

    for id in requested_ids {
        match fetched.iter().find(|o| &o.id == id) {
            Some(opt) if opt.group_dinner_type_id == dinner.id => {
                if !resolved.iter().any(|o| &o.id == id) {
                    resolved.push(opt);
                }
            }
            _ => offending.push(id.clone()),
        }
    }

    if !offending.is_empty() {
        return Err(ValidationError::OptionsNotForDinner {
            dinner: dinner.code.clone(),
            option_ids: offending,
        });
    }

    Ok(resolved)
}

/// Applies dinner options *sequentially, in the given order*, against a
/// running unit price.
///
/// Addon options contribute their fixed delta. A multiplier option's delta
/// is computed against the **current** running unit — not the original
/// base — then folded in before the next option is evaluated. Reordering
/// two multiplier options with different factors changes the result.
pub fn apply_dinner_options(
    style_adjusted_base: Money,
    options: &[&DinnerOption],
) -> (Money, Vec<AppliedDinnerOption>) {
    let mut running = style_adjusted_base;
    let mut applied = Vec::with_capacity(options.len());

    for opt in options {
        let delta = match opt.price_value() {
            PriceValue::Addon(delta) => delta,
            PriceValue::Multiplier(m) => running.mul_ratio(m.excess_millis() as i128, 1_000),
        };
        running += delta;
        applied.push(AppliedDinnerOption {
            group_name: opt.group_name.clone(),
            name: opt.display_name().to_string(),
            price_delta_cents: delta.cents(),
        });
    }

    (running, applied)
}

// =============================================================================
// Default Items & Overrides
// =============================================================================

/// Builds the default item lines for a dinner. Included-in-base lines cost
/// zero; others show the catalog unit. Neither kind contributes to the
/// subtotal — their cost lives in the dinner base.
fn default_lines(defaults: &[DinnerDefaultItem]) -> Vec<QuoteLine> {
    defaults
        .iter()
        .map(|d| QuoteLine {
            item_id: d.item_id.clone(),
            item_code: d.item_code.clone(),
            item_name: d.item_name.clone(),
            quantity: d.default_qty,
            unit_price_cents: if d.included_in_base {
                0
            } else {
                d.item_base_price_cents
            },
            is_default: true,
            change_tag: ChangeTag::Unchanged,
            options: Vec::new(),
            line_subtotal_cents: 0,
        })
        .collect()
}

/// Applies one default-item override. The new quantity must lie in
/// [0, original default quantity]; the change tag is derived from the
/// delta. Returns an adjustment line when the override is not a no-op.
fn apply_override(
    lines: &mut [QuoteLine],
    ov: &DefaultOverride,
) -> Result<Option<Adjustment>, ValidationError> {
    let line = lines
        .iter_mut()
        .find(|l| l.is_default && l.item_code == ov.code)
        .ok_or_else(|| ValidationError::UnknownDefaultOverride {
            code: ov.code.clone(),
        })?;

    let original = line.quantity;
    if ov.quantity > original {
        return Err(ValidationError::OverrideQuantityOutOfRange {
            code: ov.code.clone(),
            max: original.to_string(),
        });
    }

    line.quantity = ov.quantity;
    let mode = if ov.quantity.is_zero() {
        line.change_tag = ChangeTag::Removed;
        "remove"
    } else if ov.quantity < original {
        line.change_tag = ChangeTag::Decreased;
        "decrease"
    } else {
        line.change_tag = ChangeTag::Unchanged;
        return Ok(None);
    };

    Ok(Some(Adjustment {
        kind: AdjustmentKind::DefaultOverride,
        label: line.item_name.clone(),
        mode: mode.to_string(),
        // Included lines cost zero, so removing one does not move the total
        value_cents: 0,
    }))
}

/// Folds a freely added line into the line list. A line for the same item
/// merges: quantities sum, the change tag is re-derived, and option
/// snapshots concatenate. The merged line keeps the earlier unit price;
/// the caller has already counted this line's own contribution.
fn merge_free_line(lines: &mut Vec<QuoteLine>, line: QuoteLine) {
    match lines.iter_mut().find(|l| l.item_id == line.item_id) {
        Some(existing) => {
            existing.quantity = existing.quantity + line.quantity;
            existing.line_subtotal_cents += line.line_subtotal_cents;
            existing.options.extend(line.options);
            if existing.is_default && existing.change_tag == ChangeTag::Unchanged {
                existing.change_tag = ChangeTag::Added;
            }
        }
        None => lines.push(line),
    }
}

// =============================================================================
// Order Pricing
// =============================================================================

/// Prices a whole order: style, dinner options (in submitted order),
/// default lines with overrides, freely added item lines with duplicate
/// merging, and the subtotal.
pub fn price_order(input: &PricingInput) -> Result<Quote, ValidationError> {
    // Dinner unit: style first, then options in caller order.
    let (style_unit, style_adjust) = apply_style(&input.dinner, &input.style, input.style_allowed)?;
    let dinner_options = resolve_dinner_options(
        &input.dinner,
        &input.requested_dinner_option_ids,
        &input.fetched_dinner_options,
    )?;
    let (dinner_unit, applied_options) = apply_dinner_options(style_unit, &dinner_options);
    let dinner_subtotal = dinner_unit.times_quantity(input.quantity);

    let mut adjustments = Vec::with_capacity(1 + applied_options.len() + input.overrides.len());
    adjustments.push(Adjustment {
        kind: AdjustmentKind::Style,
        label: input.style.name.clone(),
        mode: "addon".to_string(),
        value_cents: style_adjust.cents(),
    });
    for applied in &applied_options {
        adjustments.push(Adjustment {
            kind: AdjustmentKind::DinnerOption,
            label: applied.name.clone(),
            mode: "addon".to_string(),
            value_cents: applied.price_delta_cents,
        });
    }

    // Default lines, then overrides against the pristine defaults.
    let mut lines = default_lines(&input.default_items);
    for ov in &input.overrides {
        if let Some(adj) = apply_override(&mut lines, ov)? {
            adjustments.push(adj);
        }
    }

    // Free item lines: each priced on its own, then merged. Multiplier
    // snapshots are resolved to additive deltas here, so everything past
    // the quote (previews included) speaks in deltas only.
    let mut items_total = Money::zero();
    for sel in &input.free_items {
        let options = resolve_item_options(&sel.item, &sel.requested_option_ids, &sel.fetched_options)?;
        let (unit, snapshots) = item_unit_price(&sel.item, &options);
        let addon_sum: i64 = snapshots
            .iter()
            .filter(|s| s.multiplier_millis.is_none())
            .map(|s| s.price_delta_cents)
            .sum();
        let snapshots = resolve_snapshots_for_storage(
            sel.item.base_price() + Money::from_cents(addon_sum),
            &snapshots,
        );
        let line_subtotal = unit.times_quantity(sel.quantity);
        items_total += line_subtotal;

        merge_free_line(
            &mut lines,
            QuoteLine {
                item_id: sel.item.id.clone(),
                item_code: sel.item.code.clone(),
                item_name: sel.item.name.clone(),
                quantity: sel.quantity,
                unit_price_cents: unit.cents(),
                is_default: false,
                change_tag: ChangeTag::Added,
                options: snapshots,
                line_subtotal_cents: line_subtotal.cents(),
            },
        );
    }

    let subtotal = dinner_subtotal + items_total;

    Ok(Quote {
        dinner: DinnerQuote {
            dinner_id: input.dinner.id.clone(),
            dinner_code: input.dinner.code.clone(),
            dinner_name: input.dinner.name.clone(),
            style_id: input.style.id.clone(),
            style_code: input.style.code.clone(),
            style_name: input.style.name.clone(),
            quantity: input.quantity,
            base_price_cents: input.dinner.base_price_cents,
            style_adjust_cents: style_adjust.cents(),
            unit_price_cents: dinner_unit.cents(),
            options: applied_options,
            subtotal_cents: dinner_subtotal.cents(),
        },
        lines,
        adjustments,
        subtotal_cents: subtotal.cents(),
    })
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::PriceMode;

    fn item(id: &str, code: &str, base: i64) -> MenuItem {
        MenuItem {
            id: id.to_string(),
            code: code.to_string(),
            name: code.to_string(),
            base_price_cents: base,
            is_active: true,
        }
    }

    fn addon_option(id: &str, item_id: &str, delta: i64) -> ItemOption {
        ItemOption {
            id: id.to_string(),
            name: id.to_string(),
            group_name: "Extras".to_string(),
            group_item_id: item_id.to_string(),
            group_price_mode: PriceMode::Addon,
            price_delta_cents: delta,
            multiplier_millis: None,
        }
    }

    fn mult_option(id: &str, item_id: &str, millis: i64) -> ItemOption {
        ItemOption {
            id: id.to_string(),
            name: id.to_string(),
            group_name: "Size".to_string(),
            group_item_id: item_id.to_string(),
            group_price_mode: PriceMode::Multiplier,
            price_delta_cents: 0,
            multiplier_millis: Some(millis),
        }
    }

    fn dinner(id: &str, code: &str, base: i64) -> DinnerType {
        DinnerType {
            id: id.to_string(),
            code: code.to_string(),
            name: code.to_string(),
            base_price_cents: base,
            is_active: true,
        }
    }

    fn addon_style(code: &str, value: i64) -> ServingStyle {
        ServingStyle {
            id: format!("style-{code}"),
            code: code.to_string(),
            name: code.to_string(),
            price_mode: PriceMode::Addon,
            value_cents: value,
            value_millis: None,
        }
    }

    fn mult_style(code: &str, millis: i64) -> ServingStyle {
        ServingStyle {
            id: format!("style-{code}"),
            code: code.to_string(),
            name: code.to_string(),
            price_mode: PriceMode::Multiplier,
            value_cents: 0,
            value_millis: Some(millis),
        }
    }

    fn dinner_mult_option(id: &str, dinner_id: &str, millis: i64) -> DinnerOption {
        DinnerOption {
            id: id.to_string(),
            name: id.to_string(),
            group_name: "Upgrades".to_string(),
            group_dinner_type_id: dinner_id.to_string(),
            group_price_mode: PriceMode::Multiplier,
            price_delta_cents: 0,
            multiplier_millis: Some(millis),
            linked_item_name: None,
        }
    }

    fn dinner_addon_option(id: &str, dinner_id: &str, delta: i64) -> DinnerOption {
        DinnerOption {
            id: id.to_string(),
            name: id.to_string(),
            group_name: "Upgrades".to_string(),
            group_dinner_type_id: dinner_id.to_string(),
            group_price_mode: PriceMode::Addon,
            price_delta_cents: delta,
            multiplier_millis: None,
            linked_item_name: None,
        }
    }

    // ----- item unit pricing -----

    #[test]
    fn test_addon_only_unit_is_exact_sum() {
        let it = item("i1", "steak", 30_000);
        let o1 = addon_option("o1", "i1", 1_000);
        let o2 = addon_option("o2", "i1", 2_500);
        let (unit, snaps) = item_unit_price(&it, &[&o1, &o2]);
        assert_eq!(unit.cents(), 33_500);
        assert_eq!(snaps.len(), 2);
        assert!(snaps.iter().all(|s| s.multiplier_millis.is_none()));
    }

    #[test]
    fn test_multiplier_only_unit_rounds_once() {
        let it = item("i1", "steak", 10_001);
        let o1 = mult_option("m1", "i1", 1_500);
        let o2 = mult_option("m2", "i1", 1_300);
        // 10,001 * 1.5 * 1.3 = 19,501.95 -> 19,502 (single rounding over the product)
        let (unit, _) = item_unit_price(&it, &[&o1, &o2]);
        assert_eq!(unit.cents(), 19_502);
    }

    #[test]
    fn test_mixed_addon_and_multiplier() {
        // base 100,000 + addon 2,000, then x1.2 -> 122,400
        let it = item("i1", "course", 100_000);
        let a = addon_option("a", "i1", 2_000);
        let m = mult_option("m", "i1", 1_200);
        let (unit, snaps) = item_unit_price(&it, &[&a, &m]);
        assert_eq!(unit.cents(), 122_400);
        assert_eq!(snaps[0].price_delta_cents, 2_000);
        assert_eq!(snaps[1].multiplier_millis, Some(1_200));
    }

    #[test]
    fn test_resolve_item_options_rejects_foreign_and_unknown() {
        let it = item("i1", "steak", 30_000);
        let mine = addon_option("o1", "i1", 100);
        let foreign = addon_option("o2", "other-item", 100);
        let err = resolve_item_options(
            &it,
            &["o1".into(), "o2".into(), "ghost".into()],
            &[mine, foreign],
        )
        .unwrap_err();
        match err {
            ValidationError::OptionsNotForItem { item, option_ids } => {
                assert_eq!(item, "steak");
                assert_eq!(option_ids, vec!["o2".to_string(), "ghost".to_string()]);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_snapshots_resolve_to_storage_deltas() {
        let snaps = vec![
            OptionSnapshot {
                option_group_name: "Extras".into(),
                option_name: "truffle".into(),
                price_delta_cents: 2_000,
                multiplier_millis: None,
            },
            OptionSnapshot {
                option_group_name: "Size".into(),
                option_name: "large".into(),
                price_delta_cents: 0,
                multiplier_millis: Some(1_200),
            },
        ];
        let resolved = resolve_snapshots_for_storage(Money::from_cents(102_000), &snaps);
        assert_eq!(resolved[0].price_delta_cents, 2_000);
        // x1.2 over 102,000 -> +20,400, multiplier dropped
        assert_eq!(resolved[1].price_delta_cents, 20_400);
        assert_eq!(resolved[1].multiplier_millis, None);
    }

    // ----- dinner pricing -----

    #[test]
    fn test_style_multiplier_then_option_multiplier() {
        // base 150,000, style x1.2 -> 180,000 (adjust +30,000);
        // option x1.1 against the running unit -> +18,000 -> 198,000
        let d = dinner("d1", "valentine", 150_000);
        let style = mult_style("grand", 1_200);
        let (unit, adjust) = apply_style(&d, &style, true).unwrap();
        assert_eq!(unit.cents(), 180_000);
        assert_eq!(adjust.cents(), 30_000);

        let opt = dinner_mult_option("do1", "d1", 1_100);
        let (running, applied) = apply_dinner_options(unit, &[&opt]);
        assert_eq!(applied[0].price_delta_cents, 18_000);
        assert_eq!(running.cents(), 198_000);
    }

    #[test]
    fn test_addon_style() {
        let d = dinner("d1", "valentine", 150_000);
        let style = addon_style("simple", 5_000);
        let (unit, adjust) = apply_style(&d, &style, true).unwrap();
        assert_eq!(unit.cents(), 155_000);
        assert_eq!(adjust.cents(), 5_000);
    }

    #[test]
    fn test_disallowed_style_is_a_validation_error() {
        let d = dinner("d1", "valentine", 150_000);
        let style = addon_style("deluxe", 0);
        let err = apply_style(&d, &style, false).unwrap_err();
        assert!(matches!(err, ValidationError::StyleNotAllowed { .. }));
    }

    #[test]
    fn test_dinner_option_order_changes_multiplier_result() {
        let d = dinner("d1", "valentine", 10_001);
        let base = Money::from_cents(10_001);
        let m15 = dinner_mult_option("m15", "d1", 1_500);
        let m13 = dinner_mult_option("m13", "d1", 1_300);

        let (forward, _) = apply_dinner_options(base, &[&m15, &m13]);
        let (reversed, _) = apply_dinner_options(base, &[&m13, &m15]);

        // x1.5 first: +5,001 -> 15,002; x1.3: +4,501 -> 19,503
        assert_eq!(forward.cents(), 19_503);
        // x1.3 first: +3,000 -> 13,001; x1.5: +6,501 -> 19,502
        assert_eq!(reversed.cents(), 19_502);
        assert_ne!(forward, reversed);
    }

    #[test]
    fn test_resolve_dinner_options_preserves_request_order() {
        let d = dinner("d1", "valentine", 0);
        let a = dinner_addon_option("a", "d1", 100);
        let b = dinner_addon_option("b", "d1", 200);
        let options = [a, b];
        let resolved =
            resolve_dinner_options(&d, &["b".into(), "a".into()], &options).unwrap();
        assert_eq!(resolved[0].id, "b");
        assert_eq!(resolved[1].id, "a");
    }

    #[test]
    fn test_resolve_dinner_options_lists_all_offenders() {
        let d = dinner("d1", "valentine", 0);
        let foreign = dinner_addon_option("x", "other-dinner", 100);
        let err =
            resolve_dinner_options(&d, &["x".into(), "missing".into()], &[foreign]).unwrap_err();
        match err {
            ValidationError::OptionsNotForDinner { option_ids, .. } => {
                assert_eq!(option_ids, vec!["x".to_string(), "missing".to_string()]);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    // ----- full order -----

    fn base_input() -> PricingInput {
        PricingInput {
            dinner: dinner("d1", "valentine", 150_000),
            style: addon_style("simple", 0),
            style_allowed: true,
            quantity: Quantity::from_units(1),
            requested_dinner_option_ids: vec![],
            fetched_dinner_options: vec![],
            default_items: vec![DinnerDefaultItem {
                item_id: "wine".into(),
                item_code: "wine".into(),
                item_name: "Wine (Bottle)".into(),
                item_base_price_cents: 50_000,
                default_qty: Quantity::from_units(1),
                included_in_base: true,
            }],
            overrides: vec![],
            free_items: vec![],
        }
    }

    #[test]
    fn test_price_order_minimal() {
        let quote = price_order(&base_input()).unwrap();
        assert_eq!(quote.subtotal_cents, 150_000);
        assert_eq!(quote.dinner.unit_price_cents, 150_000);
        // Default wine line: included in base, zero unit, no subtotal impact
        assert_eq!(quote.lines.len(), 1);
        assert_eq!(quote.lines[0].unit_price_cents, 0);
        assert_eq!(quote.lines[0].change_tag, ChangeTag::Unchanged);
    }

    #[test]
    fn test_price_order_with_free_items_and_removed_default() {
        let mut input = base_input();
        input.overrides.push(DefaultOverride {
            code: "wine".into(),
            quantity: Quantity::zero(),
        });
        input.free_items.push(FreeItemSelection {
            item: item("steak", "steak", 30_000),
            quantity: Quantity::from_units(2),
            requested_option_ids: vec![],
            fetched_options: vec![],
        });

        let quote = price_order(&input).unwrap();
        // 150,000 dinner + 60,000 steak; removing the included wine is free
        assert_eq!(quote.subtotal_cents, 210_000);

        let wine = quote.lines.iter().find(|l| l.item_code == "wine").unwrap();
        assert_eq!(wine.change_tag, ChangeTag::Removed);
        assert!(wine.quantity.is_zero());

        let steak = quote.lines.iter().find(|l| l.item_code == "steak").unwrap();
        assert_eq!(steak.change_tag, ChangeTag::Added);
        assert_eq!(steak.line_subtotal_cents, 60_000);

        assert!(quote
            .adjustments
            .iter()
            .any(|a| a.kind == AdjustmentKind::DefaultOverride && a.mode == "remove"));
    }

    #[test]
    fn test_duplicate_free_lines_merge() {
        let mut input = base_input();
        let steak = item("steak", "steak", 30_000);
        input.free_items.push(FreeItemSelection {
            item: steak.clone(),
            quantity: Quantity::from_units(1),
            requested_option_ids: vec![],
            fetched_options: vec![],
        });
        input.free_items.push(FreeItemSelection {
            item: steak,
            quantity: Quantity::from_units(2),
            requested_option_ids: vec![],
            fetched_options: vec![],
        });

        let quote = price_order(&input).unwrap();
        let steak_lines: Vec<_> =
            quote.lines.iter().filter(|l| l.item_code == "steak").collect();
        assert_eq!(steak_lines.len(), 1);
        assert_eq!(steak_lines[0].quantity, Quantity::from_units(3));
        assert_eq!(steak_lines[0].line_subtotal_cents, 90_000);
        // Both lines counted in the subtotal exactly once each
        assert_eq!(quote.subtotal_cents, 150_000 + 90_000);
    }

    #[test]
    fn test_free_line_merging_into_default_marks_added() {
        let mut input = base_input();
        input.free_items.push(FreeItemSelection {
            item: item("wine", "wine", 50_000),
            quantity: Quantity::from_units(3),
            requested_option_ids: vec![],
            fetched_options: vec![],
        });

        let quote = price_order(&input).unwrap();
        let wine = quote.lines.iter().find(|l| l.item_code == "wine").unwrap();
        assert!(wine.is_default);
        assert_eq!(wine.change_tag, ChangeTag::Added);
        assert_eq!(wine.quantity, Quantity::from_units(4));
        // The freely added bottles are priced at catalog unit
        assert_eq!(quote.subtotal_cents, 150_000 + 150_000);
    }

    #[test]
    fn test_override_out_of_range() {
        let mut input = base_input();
        input.overrides.push(DefaultOverride {
            code: "wine".into(),
            quantity: Quantity::from_units(5),
        });
        let err = price_order(&input).unwrap_err();
        assert!(matches!(
            err,
            ValidationError::OverrideQuantityOutOfRange { .. }
        ));
    }

    #[test]
    fn test_override_unknown_code() {
        let mut input = base_input();
        input.overrides.push(DefaultOverride {
            code: "caviar".into(),
            quantity: Quantity::zero(),
        });
        let err = price_order(&input).unwrap_err();
        assert!(matches!(err, ValidationError::UnknownDefaultOverride { .. }));
    }

    #[test]
    fn test_price_order_resolves_multiplier_snapshots() {
        let mut input = base_input();
        input.free_items.push(FreeItemSelection {
            item: item("course", "course", 100_000),
            quantity: Quantity::from_units(1),
            requested_option_ids: vec!["a".into(), "m".into()],
            fetched_options: vec![addon_option("a", "course", 2_000), mult_option("m", "course", 1_200)],
        });

        let quote = price_order(&input).unwrap();
        let line = quote.lines.iter().find(|l| l.item_code == "course").unwrap();
        assert_eq!(line.unit_price_cents, 122_400);
        // Quote-level snapshots never carry multipliers
        assert!(line.options.iter().all(|o| o.multiplier_millis.is_none()));
        assert_eq!(line.options[0].price_delta_cents, 2_000);
        assert_eq!(line.options[1].price_delta_cents, 20_400);
    }

    #[test]
    fn test_dinner_subtotal_scales_with_quantity() {
        let mut input = base_input();
        input.quantity = "1.50".parse().unwrap();
        let quote = price_order(&input).unwrap();
        assert_eq!(quote.subtotal_cents, 225_000);
    }
}
