//! # Catalog Snapshots
//!
//! Read-only views of catalog entities as consumed by the pricing engine.
//! The catalog itself (menus, dinners, styles, option groups) is managed by
//! an external collaborator; this core only ever sees point-in-time
//! snapshots of it.
//!
//! Option rows arrive flattened: each option carries its group's name,
//! owner id and price mode, so ownership checks and pricing need no joins
//! here.

use serde::{Deserialize, Serialize};

use crate::money::{Money, Multiplier, Quantity};

// =============================================================================
// Price Mode
// =============================================================================

/// How an option or serving style affects the price.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PriceMode {
    /// Flat additive delta in cents.
    Addon,
    /// Scales the running price by a factor.
    Multiplier,
}

impl PriceMode {
    /// Parses the catalog's storage representation, defaulting to addon
    /// for anything unrecognized (the catalog's own default).
    pub fn parse(s: &str) -> PriceMode {
        match s {
            "multiplier" => PriceMode::Multiplier,
            _ => PriceMode::Addon,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PriceMode::Addon => "addon",
            PriceMode::Multiplier => "multiplier",
        }
    }
}

/// A resolved price effect: exactly one of delta or multiplier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PriceValue {
    Addon(Money),
    Multiplier(Multiplier),
}

// =============================================================================
// Menu Items
// =============================================================================

/// An individually orderable menu item.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MenuItem {
    pub id: String,
    pub code: String,
    pub name: String,
    pub base_price_cents: i64,
    pub is_active: bool,
}

impl MenuItem {
    #[inline]
    pub fn base_price(&self) -> Money {
        Money::from_cents(self.base_price_cents)
    }
}

/// A selectable option of a menu item, flattened with its group.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ItemOption {
    pub id: String,
    pub name: String,
    pub group_name: String,
    /// Id of the menu item owning the option's group.
    pub group_item_id: String,
    pub group_price_mode: PriceMode,
    pub price_delta_cents: i64,
    pub multiplier_millis: Option<i64>,
}

impl ItemOption {
    /// The option's price effect under its group's mode. A multiplier-mode
    /// option with no stored factor is the identity.
    pub fn price_value(&self) -> PriceValue {
        match self.group_price_mode {
            PriceMode::Addon => PriceValue::Addon(Money::from_cents(self.price_delta_cents)),
            PriceMode::Multiplier => PriceValue::Multiplier(
                self.multiplier_millis
                    .map(Multiplier::from_millis)
                    .unwrap_or(Multiplier::one()),
            ),
        }
    }
}

// =============================================================================
// Dinners
// =============================================================================

/// A dinner offering (the anchor of every order).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DinnerType {
    pub id: String,
    pub code: String,
    pub name: String,
    pub base_price_cents: i64,
    pub is_active: bool,
}

impl DinnerType {
    #[inline]
    pub fn base_price(&self) -> Money {
        Money::from_cents(self.base_price_cents)
    }
}

/// A serving style (simple / grand / deluxe), priced addon or multiplier.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServingStyle {
    pub id: String,
    pub code: String,
    pub name: String,
    pub price_mode: PriceMode,
    pub value_cents: i64,
    pub value_millis: Option<i64>,
}

impl ServingStyle {
    pub fn price_value(&self) -> PriceValue {
        match self.price_mode {
            PriceMode::Addon => PriceValue::Addon(Money::from_cents(self.value_cents)),
            PriceMode::Multiplier => PriceValue::Multiplier(
                self.value_millis
                    .map(Multiplier::from_millis)
                    .unwrap_or(Multiplier::one()),
            ),
        }
    }
}

/// A dinner-level option, flattened with its group. `linked_item_name` is
/// the display name when the option wraps a concrete menu item.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DinnerOption {
    pub id: String,
    pub name: String,
    pub group_name: String,
    /// Id of the dinner type owning the option's group.
    pub group_dinner_type_id: String,
    pub group_price_mode: PriceMode,
    pub price_delta_cents: i64,
    pub multiplier_millis: Option<i64>,
    pub linked_item_name: Option<String>,
}

impl DinnerOption {
    pub fn price_value(&self) -> PriceValue {
        match self.group_price_mode {
            PriceMode::Addon => PriceValue::Addon(Money::from_cents(self.price_delta_cents)),
            PriceMode::Multiplier => PriceValue::Multiplier(
                self.multiplier_millis
                    .map(Multiplier::from_millis)
                    .unwrap_or(Multiplier::one()),
            ),
        }
    }

    /// Display name: the linked item's name wins over the option's own.
    pub fn display_name(&self) -> &str {
        self.linked_item_name.as_deref().unwrap_or(&self.name)
    }
}

/// A default item included with a dinner.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DinnerDefaultItem {
    pub item_id: String,
    pub item_code: String,
    pub item_name: String,
    pub item_base_price_cents: i64,
    pub default_qty: Quantity,
    /// Included lines cost zero; their price is part of the dinner base.
    pub included_in_base: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_price_mode_parse() {
        assert_eq!(PriceMode::parse("addon"), PriceMode::Addon);
        assert_eq!(PriceMode::parse("multiplier"), PriceMode::Multiplier);
        // Catalog default wins for anything unknown
        assert_eq!(PriceMode::parse(""), PriceMode::Addon);
        assert_eq!(PriceMode::parse("bogus"), PriceMode::Addon);
    }

    #[test]
    fn test_multiplier_option_without_factor_is_identity() {
        let opt = ItemOption {
            id: "o1".into(),
            name: "Large".into(),
            group_name: "Size".into(),
            group_item_id: "i1".into(),
            group_price_mode: PriceMode::Multiplier,
            price_delta_cents: 0,
            multiplier_millis: None,
        };
        match opt.price_value() {
            PriceValue::Multiplier(m) => assert_eq!(m.millis(), 1_000),
            _ => panic!("expected multiplier"),
        }
    }

    #[test]
    fn test_dinner_option_display_name_prefers_linked_item() {
        let mut opt = DinnerOption {
            id: "d1".into(),
            name: "Wine upgrade".into(),
            group_name: "Drinks".into(),
            group_dinner_type_id: "dt1".into(),
            group_price_mode: PriceMode::Addon,
            price_delta_cents: 500,
            multiplier_millis: None,
            linked_item_name: Some("Champagne".into()),
        };
        assert_eq!(opt.display_name(), "Champagne");
        opt.linked_item_name = None;
        assert_eq!(opt.display_name(), "Wine upgrade");
    }
}
