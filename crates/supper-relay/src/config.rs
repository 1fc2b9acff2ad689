//! # Relay Configuration
//!
//! Explicit configuration for the relay: channel names, backoff bounds and
//! hub capacity are constructor inputs, never implicit globals.

use std::time::Duration;

/// Configuration for the relay loop and publisher.
#[derive(Debug, Clone)]
pub struct RelayConfig {
    /// NOTIFY channels to publish to and LISTEN on.
    pub channels: Vec<String>,

    /// Initial reconnect backoff. Default: 500ms
    pub initial_backoff: Duration,

    /// Maximum reconnect backoff. Default: 10s
    pub max_backoff: Duration,

    /// Capacity of the broadcast hub. A subscriber that falls more than
    /// this many events behind loses its oldest ones. Default: 256
    pub hub_capacity: usize,
}

impl Default for RelayConfig {
    fn default() -> Self {
        RelayConfig {
            channels: vec!["orders_events".to_string()],
            initial_backoff: Duration::from_millis(500),
            max_backoff: Duration::from_secs(10),
            hub_capacity: 256,
        }
    }
}

impl RelayConfig {
    /// Validates channel names: lowercase alphanumerics and underscores,
    /// non-empty. Returns the offending name, if any.
    pub fn invalid_channel(&self) -> Option<&str> {
        self.channels.iter().map(String::as_str).find(|ch| {
            ch.is_empty()
                || !ch
                    .chars()
                    .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = RelayConfig::default();
        assert_eq!(config.channels, vec!["orders_events"]);
        assert_eq!(config.initial_backoff, Duration::from_millis(500));
        assert_eq!(config.max_backoff, Duration::from_secs(10));
        assert!(config.invalid_channel().is_none());
    }

    #[test]
    fn test_channel_validation() {
        let mut config = RelayConfig::default();
        config.channels.push("orders-events".to_string());
        assert_eq!(config.invalid_channel(), Some("orders-events"));

        config.channels = vec![String::new()];
        assert!(config.invalid_channel().is_some());
    }
}
