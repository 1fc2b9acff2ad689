//! # supper-relay: Change-Event Relay
//!
//! Real-time propagation of committed order mutations to operational
//! subscribers.
//!
//! ## Data Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  order commit ──► EventPublisher ──► pg_notify(channel, json)           │
//! │                                           │                             │
//! │                                           ▼                             │
//! │                   RelayLoop (LISTEN, normalize, backoff on failure)     │
//! │                                           │                             │
//! │                                           ▼                             │
//! │                   EventHub (bounded broadcast, drop-oldest on lag)      │
//! │                      │               │                │                 │
//! │                      ▼               ▼                ▼                 │
//! │                 subscriber      subscriber       subscriber             │
//! │               (bootstrap then live stream, per connection)              │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Delivery Guarantee
//!
//! At-most-once, best-effort — by design. There is no replay buffer
//! between a subscriber's bootstrap snapshot and its live stream, so
//! events emitted in that gap can be missed; the `diagnostic` event marks
//! session resets so consumers know when a gap is possible.

// =============================================================================
// Module Declarations
// =============================================================================

pub mod config;
pub mod envelope;
pub mod error;
pub mod hub;
pub mod publisher;
pub mod relay;

// =============================================================================
// Re-exports
// =============================================================================

pub use config::RelayConfig;
pub use envelope::{diagnostic, normalize, EventEnvelope};
pub use error::{RelayError, RelayResult};
pub use hub::EventHub;
pub use publisher::EventPublisher;
pub use relay::{RelayHandle, RelayLoop};
