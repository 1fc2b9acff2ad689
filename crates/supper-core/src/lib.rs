//! # supper-core: Pure Business Logic for Supper
//!
//! This crate is the **heart** of the Supper order core. It contains all
//! business logic as pure functions with zero I/O dependencies.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Supper Architecture                             │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     ops-api (axum)                              │   │
//! │  │    order create / preview / actions / staff SSE stream          │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ supper-core (THIS CRATE) ★                      │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────┐  ┌───────────┐  ┌───────────┐  ┌───────────┐  │   │
//! │  │   │  pricing  │  │ discount  │  │ lifecycle │  │   money   │  │   │
//! │  │   │ unit/quote│  │ eval+rules│  │ FSM+log   │  │ cents/bps │  │   │
//! │  │   └───────────┘  └───────────┘  └───────────┘  └───────────┘  │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO CLOCK • PURE FUNCTIONS              │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │            supper-db (PostgreSQL) / supper-relay (events)       │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`money`] - Integer-cent money, basis points, multipliers, quantities
//! - [`catalog`] - Read-only catalog snapshot types
//! - [`pricing`] - Unit prices, dinner pricing, quote assembly
//! - [`discount`] - Membership/coupon evaluation and eligibility rules
//! - [`lifecycle`] - Status machine, operation log, change-event intents
//! - [`types`] - The order aggregate and opaque snapshots
//! - [`error`] - Domain error types
//!
//! ## Design Principles
//!
//! 1. **Pure Functions**: same input = same output; `now` is a parameter
//! 2. **No I/O**: database, network, file system access is FORBIDDEN here
//! 3. **Integer Money**: cents (i64) everywhere, half-up rounding only at
//!    documented points
//! 4. **Effects, not actions**: lifecycle transitions return what should
//!    happen; the storage layer makes it happen

// =============================================================================
// Module Declarations
// =============================================================================

pub mod catalog;
pub mod discount;
pub mod error;
pub mod lifecycle;
pub mod money;
pub mod pricing;
pub mod types;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use catalog::{
    DinnerDefaultItem, DinnerOption, DinnerType, ItemOption, MenuItem, PriceMode, PriceValue,
    ServingStyle,
};
pub use discount::{
    check_coupon_eligibility, evaluate_discounts, normalize_codes, Coupon, CouponChannel,
    CouponKind, CouponUsage, DiscountContext, DiscountLine, DiscountOutcome, DiscountType,
    IneligibleReason, Membership,
};
pub use error::{CoreError, CoreResult, ValidationError};
pub use lifecycle::{
    apply_action, ready_from_log, ChangeEvent, OperationLogEntry, OrderAction, OrderStatus,
    Transition, MARK_READY_EVENT,
};
pub use money::{BasisPoints, Money, Multiplier, Quantity};
pub use pricing::{
    item_unit_price, price_order, resolve_snapshots_for_storage, Adjustment, AdjustmentKind,
    AppliedDinnerOption, ChangeTag, DefaultOverride, DinnerQuote, FreeItemSelection,
    OptionSnapshot, PricingInput, Quote, QuoteLine,
};
pub use types::{DeliverySnapshot, Order, OrderSource, PaymentSnapshot};
