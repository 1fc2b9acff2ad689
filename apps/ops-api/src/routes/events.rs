//! # Staff Event Stream
//!
//! The SSE endpoint: every connection first receives a synchronous
//! `bootstrap` frame (a snapshot array of current orders), then the live
//! stream of relayed envelopes for the life of the connection.
//!
//! Framing is two-line text frames — `event: <name>` then `data: <json>`,
//! each frame terminated by a blank line — which is exactly what axum's
//! SSE responder emits.
//!
//! There is no replay buffer bridging the snapshot and the live stream:
//! events committed in that gap can be missed. That at-most-once guarantee
//! is deliberate; the relay's `diagnostic` events mark the session resets
//! where gaps are possible.

use std::convert::Infallible;
use std::sync::Arc;

use axum::extract::{Query, State};
use axum::response::sse::{Event, KeepAlive, Sse};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use tokio_stream::wrappers::errors::BroadcastStreamRecvError;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::{Stream, StreamExt};
use tracing::{debug, warn};

use supper_db::BootstrapFilter;

use crate::error::ApiError;
use crate::AppState;

/// Query parameters for the stream.
///
/// - `status`: comma-separated status filter (e.g. `pending,preparing`)
/// - `since`: RFC3339 lower bound for the bootstrap snapshot
/// - `limit`: bootstrap cap, clamped to 1..=100, default 20
#[derive(Debug, Deserialize)]
pub struct EventStreamQuery {
    pub status: Option<String>,
    pub since: Option<String>,
    pub limit: Option<i64>,
}

/// GET /api/staff/orders/events
pub async fn order_events(
    State(state): State<Arc<AppState>>,
    Query(query): Query<EventStreamQuery>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, ApiError> {
    let statuses: Vec<String> = query
        .status
        .as_deref()
        .unwrap_or("")
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect();

    let since: Option<DateTime<Utc>> = query
        .since
        .as_deref()
        .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
        .map(|dt| dt.with_timezone(&Utc));

    let filter = BootstrapFilter {
        statuses,
        since,
        limit: query.limit.unwrap_or(20).clamp(1, 100),
    };

    // Subscribe BEFORE the snapshot query so the gap stays as small as the
    // design allows; anything still emitted in between is lost by design.
    let receiver = state.hub.subscribe();

    let snapshot = state.db.orders().bootstrap(&filter).await?;
    debug!(orders = snapshot.len(), "Bootstrap snapshot built");
    let payload = serde_json::to_string(&snapshot)
        .map_err(|e| ApiError::Internal(format!("bootstrap snapshot: {e}")))?;
    let bootstrap = Event::default().event("bootstrap").data(payload);

    let live = BroadcastStream::new(receiver).filter_map(|received| match received {
        Ok(envelope) => Some(Ok::<_, Infallible>(
            Event::default()
                .event(envelope.event)
                .data(envelope.payload.to_string()),
        )),
        Err(BroadcastStreamRecvError::Lagged(missed)) => {
            // Slow subscriber: it alone loses its oldest events.
            warn!(missed, "Subscriber lagged, dropping oldest events");
            None
        }
    });

    let stream = tokio_stream::once(Ok(bootstrap)).chain(live);

    Ok(Sse::new(stream).keep_alive(KeepAlive::default()))
}
