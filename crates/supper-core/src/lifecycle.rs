//! # Order Lifecycle
//!
//! The order's finite-state machine as pure transition functions.
//!
//! ## State Machine
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │   PENDING ──accept──► PREPARING ──dispatch──► OUT_FOR_DELIVERY          │
//! │      │                   │  ▲                      │                    │
//! │      │            mark_ready │                  deliver                 │
//! │      │             (no status│change,              │                    │
//! │      │              log only)┘                     ▼                    │
//! │      │                   │                     DELIVERED (terminal)     │
//! │      └──────cancel───────┴──────cancel────────────┐                     │
//! │                                                   ▼                    │
//! │                                               CANCELED (terminal)      │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! A transition never saves itself. [`apply_action`] returns the new status
//! plus its effects — an append-only [`OperationLogEntry`] and a
//! [`ChangeEvent`] intent — and the storage layer decides whether they
//! become real. An aborted transaction therefore never leaks a notification.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult, ValidationError};

// =============================================================================
// Order Status
// =============================================================================

/// The status of an order. Written exclusively by lifecycle transitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    /// Placed, awaiting kitchen acceptance.
    Pending,
    /// Accepted; being prepared. "Ready" is an annotation inside this
    /// state, not a status of its own.
    Preparing,
    /// Handed to a courier.
    OutForDelivery,
    /// Delivered to the customer. Terminal.
    Delivered,
    /// Canceled with a reason. Terminal.
    Canceled,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Preparing => "preparing",
            OrderStatus::OutForDelivery => "out_for_delivery",
            OrderStatus::Delivered => "delivered",
            OrderStatus::Canceled => "canceled",
        }
    }

    pub fn parse(s: &str) -> Option<OrderStatus> {
        match s {
            "pending" => Some(OrderStatus::Pending),
            "preparing" => Some(OrderStatus::Preparing),
            "out_for_delivery" => Some(OrderStatus::OutForDelivery),
            "delivered" => Some(OrderStatus::Delivered),
            "canceled" => Some(OrderStatus::Canceled),
            _ => None,
        }
    }

    #[inline]
    pub fn is_terminal(&self) -> bool {
        matches!(self, OrderStatus::Delivered | OrderStatus::Canceled)
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Actions
// =============================================================================

/// A staff action against an order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OrderAction {
    Accept,
    /// Annotation only: records readiness inside PREPARING.
    MarkReady,
    Dispatch,
    Deliver,
    Cancel { reason: Option<String> },
}

impl OrderAction {
    /// Parses an action name (with its historical aliases) and an optional
    /// cancel reason.
    pub fn parse(action: &str, reason: Option<String>) -> Result<OrderAction, ValidationError> {
        match action.trim().to_ascii_lowercase().as_str() {
            "accept" => Ok(OrderAction::Accept),
            "mark-ready" | "ready" => Ok(OrderAction::MarkReady),
            "out-for-delivery" | "dispatch" | "out" => Ok(OrderAction::Dispatch),
            "deliver" | "delivered" => Ok(OrderAction::Deliver),
            "cancel" => Ok(OrderAction::Cancel { reason }),
            other => Err(ValidationError::UnsupportedAction {
                action: other.to_string(),
            }),
        }
    }

    /// The operation-log event name.
    pub fn event_name(&self) -> &'static str {
        match self {
            OrderAction::Accept => "accept",
            OrderAction::MarkReady => "mark_ready",
            OrderAction::Dispatch => "out_for_delivery",
            OrderAction::Deliver => "deliver",
            OrderAction::Cancel { .. } => "cancel",
        }
    }
}

// =============================================================================
// Operation Log
// =============================================================================

/// One entry of the order's append-only operation log. Doubles as the
/// audit trail and as the only signal for intra-state annotations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OperationLogEntry {
    pub event: String,
    pub actor_id: Option<String>,
    pub at: DateTime<Utc>,
    pub note: Option<String>,
}

/// Event name recorded by [`OrderAction::MarkReady`].
pub const MARK_READY_EVENT: &str = "mark_ready";

/// Derives the "ready" annotation by scanning the log. There is no
/// separate status value for it.
pub fn ready_from_log(entries: &[OperationLogEntry]) -> bool {
    entries.iter().any(|e| e.event == MARK_READY_EVENT)
}

// =============================================================================
// Change Events
// =============================================================================

/// The wire payload emitted for every committed order mutation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChangeEvent {
    pub event: String,
    pub order_id: String,
    pub status: OrderStatus,
    pub ready: bool,
    pub at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl ChangeEvent {
    /// Event emitted after an order row is first committed.
    pub fn order_created(order_id: &str, at: DateTime<Utc>) -> ChangeEvent {
        ChangeEvent {
            event: "order_created".to_string(),
            order_id: order_id.to_string(),
            status: OrderStatus::Pending,
            ready: false,
            at,
            reason: None,
        }
    }
}

// =============================================================================
// Transitions
// =============================================================================

/// The outcome of a lifecycle action: the (possibly unchanged) status plus
/// the effects the caller must persist and, only after commit, publish.
#[derive(Debug, Clone)]
pub struct Transition {
    pub new_status: OrderStatus,
    /// False for annotation-only actions (mark_ready).
    pub status_changed: bool,
    pub log_entry: OperationLogEntry,
    pub event: ChangeEvent,
}

/// Applies a staff action to an order's current state.
///
/// `was_ready` is whether the existing log already carries a `mark_ready`
/// entry, so the emitted event reflects the post-transition annotation.
///
/// ## Errors
/// Any action requested from a state that does not allow it is a
/// [`CoreError::InvalidTransition`] — a conflict, distinct from input
/// validation, and never coerced into a different transition.
pub fn apply_action(
    order_id: &str,
    status: OrderStatus,
    was_ready: bool,
    action: &OrderAction,
    actor_id: Option<String>,
    now: DateTime<Utc>,
) -> CoreResult<Transition> {
    let conflict = |action: &OrderAction| CoreError::InvalidTransition {
        action: action.event_name().to_string(),
        status: status.as_str().to_string(),
    };

    let (new_status, status_changed, note, ready) = match (status, action) {
        (OrderStatus::Pending, OrderAction::Accept) => {
            (OrderStatus::Preparing, true, None, was_ready)
        }
        (OrderStatus::Preparing, OrderAction::MarkReady) => {
            (OrderStatus::Preparing, false, None, true)
        }
        (OrderStatus::Preparing, OrderAction::Dispatch) => {
            (OrderStatus::OutForDelivery, true, None, was_ready)
        }
        (OrderStatus::OutForDelivery, OrderAction::Deliver) => {
            (OrderStatus::Delivered, true, None, was_ready)
        }
        (
            OrderStatus::Pending | OrderStatus::Preparing | OrderStatus::OutForDelivery,
            OrderAction::Cancel { reason },
        ) => (OrderStatus::Canceled, true, reason.clone(), was_ready),
        _ => return Err(conflict(action)),
    };

    let log_entry = OperationLogEntry {
        event: action.event_name().to_string(),
        actor_id,
        at: now,
        note: note.clone(),
    };

    let event = if status_changed {
        ChangeEvent {
            event: "order_status_changed".to_string(),
            order_id: order_id.to_string(),
            status: new_status,
            ready,
            at: now,
            reason: note,
        }
    } else {
        ChangeEvent {
            event: "order_updated".to_string(),
            order_id: order_id.to_string(),
            status: new_status,
            ready,
            at: now,
            reason: None,
        }
    };

    Ok(Transition {
        new_status,
        status_changed,
        log_entry,
        event,
    })
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

    #[test]
    fn test_accept_pending() {
        let t = apply_action(
            "o1",
            OrderStatus::Pending,
            false,
            &OrderAction::Accept,
            Some("staff-7".into()),
            at(),
        )
        .unwrap();
        assert_eq!(t.new_status, OrderStatus::Preparing);
        assert!(t.status_changed);
        assert_eq!(t.log_entry.event, "accept");
        assert_eq!(t.log_entry.actor_id.as_deref(), Some("staff-7"));
        assert_eq!(t.event.event, "order_status_changed");
        assert_eq!(t.event.status, OrderStatus::Preparing);
    }

    #[test]
    fn test_accept_twice_conflicts() {
        // First accept moves to preparing; a second accept is a conflict,
        // not a validation failure.
        let t = apply_action("o1", OrderStatus::Pending, false, &OrderAction::Accept, None, at())
            .unwrap();
        let err =
            apply_action("o1", t.new_status, false, &OrderAction::Accept, None, at()).unwrap_err();
        assert!(matches!(err, CoreError::InvalidTransition { .. }));
    }

    #[test]
    fn test_mark_ready_keeps_status() {
        let t = apply_action(
            "o1",
            OrderStatus::Preparing,
            false,
            &OrderAction::MarkReady,
            None,
            at(),
        )
        .unwrap();
        assert_eq!(t.new_status, OrderStatus::Preparing);
        assert!(!t.status_changed);
        assert_eq!(t.event.event, "order_updated");
        assert!(t.event.ready);
    }

    #[test]
    fn test_mark_ready_outside_preparing_conflicts() {
        for status in [
            OrderStatus::Pending,
            OrderStatus::OutForDelivery,
            OrderStatus::Delivered,
            OrderStatus::Canceled,
        ] {
            let err =
                apply_action("o1", status, false, &OrderAction::MarkReady, None, at()).unwrap_err();
            assert!(matches!(err, CoreError::InvalidTransition { .. }));
        }
    }

    #[test]
    fn test_full_happy_path() {
        let mut status = OrderStatus::Pending;
        for action in [OrderAction::Accept, OrderAction::Dispatch, OrderAction::Deliver] {
            status = apply_action("o1", status, false, &action, None, at())
                .unwrap()
                .new_status;
        }
        assert_eq!(status, OrderStatus::Delivered);
        assert!(status.is_terminal());
    }

    #[test]
    fn test_cancel_from_each_active_state_with_reason() {
        for status in [
            OrderStatus::Pending,
            OrderStatus::Preparing,
            OrderStatus::OutForDelivery,
        ] {
            let t = apply_action(
                "o1",
                status,
                false,
                &OrderAction::Cancel {
                    reason: Some("customer request".into()),
                },
                None,
                at(),
            )
            .unwrap();
            assert_eq!(t.new_status, OrderStatus::Canceled);
            assert_eq!(t.log_entry.note.as_deref(), Some("customer request"));
            assert_eq!(t.event.reason.as_deref(), Some("customer request"));
        }
    }

    #[test]
    fn test_terminal_states_reject_everything() {
        for status in [OrderStatus::Delivered, OrderStatus::Canceled] {
            for action in [
                OrderAction::Accept,
                OrderAction::MarkReady,
                OrderAction::Dispatch,
                OrderAction::Deliver,
                OrderAction::Cancel { reason: None },
            ] {
                assert!(apply_action("o1", status, false, &action, None, at()).is_err());
            }
        }
    }

    #[test]
    fn test_ready_carries_into_later_events() {
        // Once marked ready, a dispatch event still reports ready=true.
        let t = apply_action(
            "o1",
            OrderStatus::Preparing,
            true,
            &OrderAction::Dispatch,
            None,
            at(),
        )
        .unwrap();
        assert!(t.event.ready);
    }

    #[test]
    fn test_action_parse_aliases() {
        assert_eq!(OrderAction::parse("accept", None).unwrap(), OrderAction::Accept);
        assert_eq!(OrderAction::parse("ready", None).unwrap(), OrderAction::MarkReady);
        assert_eq!(OrderAction::parse("mark-ready", None).unwrap(), OrderAction::MarkReady);
        assert_eq!(OrderAction::parse("dispatch", None).unwrap(), OrderAction::Dispatch);
        assert_eq!(OrderAction::parse("out", None).unwrap(), OrderAction::Dispatch);
        assert_eq!(
            OrderAction::parse("out-for-delivery", None).unwrap(),
            OrderAction::Dispatch
        );
        assert_eq!(OrderAction::parse("delivered", None).unwrap(), OrderAction::Deliver);
        assert!(matches!(
            OrderAction::parse("cancel", Some("late".into())).unwrap(),
            OrderAction::Cancel { reason: Some(_) }
        ));
        assert!(OrderAction::parse("refund", None).is_err());
    }

    #[test]
    fn test_ready_from_log() {
        let entry = |event: &str| OperationLogEntry {
            event: event.to_string(),
            actor_id: None,
            at: at(),
            note: None,
        };
        assert!(!ready_from_log(&[entry("accept")]));
        assert!(ready_from_log(&[entry("accept"), entry("mark_ready")]));
    }

    #[test]
    fn test_status_parse_roundtrip() {
        for status in [
            OrderStatus::Pending,
            OrderStatus::Preparing,
            OrderStatus::OutForDelivery,
            OrderStatus::Delivered,
            OrderStatus::Canceled,
        ] {
            assert_eq!(OrderStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(OrderStatus::parse("draft"), None);
    }
}
