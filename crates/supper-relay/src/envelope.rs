//! # Event Envelopes
//!
//! Normalization of raw NOTIFY payloads into a stable envelope. The event
//! name is derived in priority order:
//!
//! 1. an explicit `event` field in the payload
//! 2. a legacy `op` code (INSERT/UPDATE/DELETE → created/updated/deleted)
//! 3. the channel name, as a last resort
//!
//! Malformed payloads are wrapped as `{"raw": ...}` instead of terminating
//! the relay loop.

use serde_json::{json, Value};

/// A normalized event ready for fan-out.
#[derive(Debug, Clone)]
pub struct EventEnvelope {
    pub event: String,
    pub payload: Value,
}

/// Legacy operation-code mapping.
fn event_for_op(op: &str) -> Option<&'static str> {
    match op {
        "INSERT" => Some("order_created"),
        "UPDATE" => Some("order_updated"),
        "DELETE" => Some("order_deleted"),
        _ => None,
    }
}

/// Normalizes one raw notification payload.
pub fn normalize(channel: &str, payload: &str) -> EventEnvelope {
    match serde_json::from_str::<Value>(payload) {
        Ok(Value::Object(mut map)) => {
            let event = match map.get("event").and_then(Value::as_str) {
                Some(event) => event.to_string(),
                None => map
                    .get("op")
                    .and_then(Value::as_str)
                    .and_then(event_for_op)
                    .unwrap_or(channel)
                    .to_string(),
            };
            map.insert("event".to_string(), Value::String(event.clone()));
            EventEnvelope {
                event,
                payload: Value::Object(map),
            }
        }
        Ok(other) => EventEnvelope {
            event: channel.to_string(),
            payload: json!({ "event": channel, "raw": other }),
        },
        Err(_) => EventEnvelope {
            event: channel.to_string(),
            payload: json!({ "event": channel, "raw": payload }),
        },
    }
}

/// The one-shot event emitted right after a (re)connection, so subscribers
/// can detect a session reset and know they may have a gap.
pub fn diagnostic(channels: &[String], session_id: &str) -> EventEnvelope {
    EventEnvelope {
        event: "diagnostic".to_string(),
        payload: json!({
            "event": "diagnostic",
            "listening": channels,
            "session": session_id,
            "pid": std::process::id(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_explicit_event_field_wins() {
        let env = normalize(
            "orders_events",
            r#"{"event":"order_status_changed","order_id":"o1","op":"INSERT"}"#,
        );
        assert_eq!(env.event, "order_status_changed");
        assert_eq!(env.payload["order_id"], "o1");
    }

    #[test]
    fn test_legacy_op_mapping() {
        let env = normalize("orders_events", r#"{"op":"INSERT","id":123}"#);
        assert_eq!(env.event, "order_created");
        // The derived name is written back into the payload
        assert_eq!(env.payload["event"], "order_created");

        let env = normalize("orders_events", r#"{"op":"UPDATE"}"#);
        assert_eq!(env.event, "order_updated");

        let env = normalize("orders_events", r#"{"op":"DELETE"}"#);
        assert_eq!(env.event, "order_deleted");
    }

    #[test]
    fn test_unknown_op_falls_back_to_channel() {
        let env = normalize("orders_events", r#"{"op":"TRUNCATE"}"#);
        assert_eq!(env.event, "orders_events");
    }

    #[test]
    fn test_object_without_event_or_op_uses_channel() {
        let env = normalize("orders_events", r#"{"order_id":"o1"}"#);
        assert_eq!(env.event, "orders_events");
        assert_eq!(env.payload["event"], "orders_events");
    }

    #[test]
    fn test_non_object_json_wrapped_as_raw() {
        let env = normalize("orders_events", "[1,2,3]");
        assert_eq!(env.event, "orders_events");
        assert_eq!(env.payload["raw"], serde_json::json!([1, 2, 3]));
    }

    #[test]
    fn test_malformed_payload_wrapped_as_raw() {
        let env = normalize("orders_events", "{not json");
        assert_eq!(env.event, "orders_events");
        assert_eq!(env.payload["raw"], "{not json");
    }

    #[test]
    fn test_diagnostic_shape() {
        let env = diagnostic(&["orders_events".to_string()], "session-1");
        assert_eq!(env.event, "diagnostic");
        assert_eq!(env.payload["listening"][0], "orders_events");
        assert_eq!(env.payload["session"], "session-1");
    }
}
