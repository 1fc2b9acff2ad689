//! # Supper Ops API
//!
//! HTTP server for ordering and staff operations.
//!
//! ## Surfaces
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                          Ops API Surfaces                               │
//! │                                                                         │
//! │  POST /api/orders                 create (price + discount + persist +  │
//! │                                   redeem in one transaction, then       │
//! │                                   publish)                              │
//! │  POST /api/orders/price/preview   read-only quote + discount preview    │
//! │  GET  /api/orders                 list, newest first                    │
//! │  GET  /api/orders/{id}            full read model                       │
//! │  POST /api/orders/{id}/action     accept / mark-ready / dispatch /      │
//! │                                   deliver / cancel                      │
//! │  GET  /api/staff/orders/events    SSE: bootstrap frame + live stream    │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Configuration
//! Environment variables:
//! - `HTTP_PORT` - listen port (default: 8080)
//! - `DATABASE_URL` - PostgreSQL connection string
//! - `ORDERS_NOTIFY_CHANNELS` - comma-separated NOTIFY channels
//! - `RELAY_INITIAL_BACKOFF_MS` / `RELAY_MAX_BACKOFF_MS` - reconnect bounds
//! - `EVENT_HUB_CAPACITY` - fan-out buffer per subscriber

pub mod config;
pub mod error;
pub mod routes;
pub mod services;

// Re-exports
pub use config::ApiConfig;
pub use error::ApiError;
pub use services::OrderService;

use supper_db::Database;
use supper_relay::EventHub;

/// Shared application state.
pub struct AppState {
    pub db: Database,
    pub hub: EventHub,
    pub orders: OrderService,
    pub config: ApiConfig,
}
