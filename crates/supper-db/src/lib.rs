//! # supper-db: Database Layer for Supper
//!
//! PostgreSQL access for the Supper order core, built on sqlx.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Supper Data Flow                                 │
//! │                                                                         │
//! │  ops-api handler (create order / apply action / bootstrap)              │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                    supper-db (THIS CRATE)                       │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐    ┌───────────────┐    ┌──────────────┐   │   │
//! │  │   │   Database    │    │ Repositories  │    │  Migrations  │   │   │
//! │  │   │   (pool.rs)   │    │ order/catalog │    │  (embedded)  │   │   │
//! │  │   │               │◄───│ promotion     │    │ 001_init.sql │   │   │
//! │  │   └───────────────┘    └───────────────┘    └──────────────┘   │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  PostgreSQL (orders, catalog, promotion, NOTIFY bus)                    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`pool`] - Connection pool creation and configuration
//! - [`migrations`] - Embedded database migrations
//! - [`error`] - Database error types
//! - [`repository`] - Repository implementations (order, catalog, promotion)
//!
//! ## Transactional Guarantees
//!
//! Order creation (pricing snapshot + persistence + coupon redemption) is
//! one transaction; lifecycle transitions lock the order row and append to
//! the operation log atomically; coupon redemption takes row locks on
//! exactly the coupon rows it touches. Change events are values returned
//! to the caller only after a successful commit.
//!
//! ## Transactional Tests
//!
//! Repository behavior that needs a live database (redemption uniqueness
//! under concurrency, rollback leaving no trace) is covered by integration
//! tests gated on `SUPPER_TEST_DATABASE_URL` in `tests/`.

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;

// =============================================================================
// Re-exports
// =============================================================================

pub use error::{DbError, DbResult};
pub use pool::{Database, DbConfig};

// Repository re-exports for convenience
pub use repository::catalog::CatalogRepository;
pub use repository::order::{
    BootstrapFilter, BootstrapOrder, CreateOrder, OrderActionError, OrderDetail,
    OrderDinnerDetail, OrderLineDetail, OrderRepository,
};
pub use repository::promotion::{PromotionRepository, RedemptionRecord};
