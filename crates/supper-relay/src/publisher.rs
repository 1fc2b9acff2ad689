//! # Event Publisher
//!
//! The producer half of the relay: turns a committed mutation's
//! [`ChangeEvent`] into NOTIFY messages on the configured channels.
//!
//! Callers invoke [`EventPublisher::publish`] strictly AFTER their storage
//! transaction has committed — never from inside it. The repositories
//! enforce the other half of that contract by only returning a
//! `ChangeEvent` once commit has succeeded.
//!
//! Publishing is best-effort: failures are logged and swallowed, so a
//! flaky bus can never fail an already-committed order.

use std::sync::Arc;

use sqlx::PgPool;
use tracing::{debug, warn};

use crate::config::RelayConfig;
use supper_core::ChangeEvent;

/// Publishes change events to the NOTIFY channels.
#[derive(Debug, Clone)]
pub struct EventPublisher {
    pool: PgPool,
    channels: Arc<Vec<String>>,
}

impl EventPublisher {
    /// Creates a publisher for the config's channels.
    pub fn new(pool: PgPool, config: &RelayConfig) -> Self {
        EventPublisher {
            pool,
            channels: Arc::new(config.channels.clone()),
        }
    }

    /// Publishes one committed change event to every configured channel.
    /// Never fails: a publish error costs (at most) this one notification.
    pub async fn publish(&self, event: &ChangeEvent) {
        let payload = match serde_json::to_string(event) {
            Ok(payload) => payload,
            Err(e) => {
                warn!(?e, "Failed to serialize change event, dropping");
                return;
            }
        };

        for channel in self.channels.iter() {
            let result = sqlx::query("SELECT pg_notify($1, $2)")
                .bind(channel)
                .bind(&payload)
                .execute(&self.pool)
                .await;

            match result {
                Ok(_) => {
                    debug!(channel = %channel, event = %event.event, order_id = %event.order_id, "Change event published")
                }
                Err(e) => {
                    warn!(channel = %channel, ?e, "Failed to publish change event, dropping")
                }
            }
        }
    }
}
