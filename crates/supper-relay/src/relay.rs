//! # Relay Loop
//!
//! The long-lived task that bridges committed order mutations to live
//! subscribers.
//!
//! ## Session Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                     Relay Connection States                             │
//! │                                                                         │
//! │  ┌────────────┐   connect + LISTEN  ┌────────────┐                      │
//! │  │Disconnected│ ──────────────────► │  Listening │ ──┐                  │
//! │  └────────────┘                     └────────────┘   │ drain + fan out  │
//! │        ▲                                  │          │                  │
//! │        │                      transport error        ▼                  │
//! │        │                                  │     EventHub                │
//! │  ┌────────────┐    timer expired          │                             │
//! │  │  Backoff   │ ◄─────────────────────────┘                             │
//! │  └────────────┘                                                         │
//! │                                                                         │
//! │  BACKOFF: exponential, 500ms initial, 10s cap, reset on connect.        │
//! │  Every (re)connection emits one `diagnostic` event so subscribers       │
//! │  can detect the reset and know they may have a gap.                     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::sync::Arc;

use backoff::backoff::Backoff;
use backoff::ExponentialBackoff;
use sqlx::postgres::PgListener;
use sqlx::PgPool;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::RelayConfig;
use crate::envelope;
use crate::error::{RelayError, RelayResult};
use crate::hub::EventHub;

/// The relay loop. Spawn [`RelayLoop::run`] as a background task.
pub struct RelayLoop {
    pool: PgPool,
    config: Arc<RelayConfig>,
    hub: EventHub,
    shutdown_rx: mpsc::Receiver<()>,
}

/// Handle for controlling the relay loop.
#[derive(Clone)]
pub struct RelayHandle {
    shutdown_tx: mpsc::Sender<()>,
}

impl RelayHandle {
    /// Triggers graceful shutdown.
    pub async fn shutdown(&self) {
        let _ = self.shutdown_tx.send(()).await;
    }
}

impl RelayLoop {
    /// Creates a new relay loop and returns a handle.
    pub fn new(pool: PgPool, config: Arc<RelayConfig>, hub: EventHub) -> (Self, RelayHandle) {
        let (shutdown_tx, shutdown_rx) = mpsc::channel(1);

        let relay = RelayLoop {
            pool,
            config,
            hub,
            shutdown_rx,
        };

        (relay, RelayHandle { shutdown_tx })
    }

    /// Runs the relay loop until shutdown. Each transport failure tears the
    /// session down and reconnects with exponential backoff; request
    /// handling never sees any of it.
    pub async fn run(mut self) {
        info!(channels = ?self.config.channels, "Relay loop starting");

        if let Some(bad) = self.config.invalid_channel() {
            warn!(channel = %bad, "Refusing to listen on invalid channel name");
            return;
        }

        let mut backoff = ExponentialBackoff {
            initial_interval: self.config.initial_backoff,
            max_interval: self.config.max_backoff,
            max_elapsed_time: None,
            ..ExponentialBackoff::default()
        };

        loop {
            match self.session(&mut backoff).await {
                Ok(()) => break, // shutdown requested
                Err(e) => warn!(error = %e, "Relay session ended, reconnecting"),
            }

            let delay = backoff.next_backoff().unwrap_or(self.config.max_backoff);
            debug!(?delay, "Relay backing off before reconnect");
            tokio::select! {
                _ = self.shutdown_rx.recv() => break,
                _ = tokio::time::sleep(delay) => {}
            }
        }

        info!("Relay loop stopped");
    }

    /// One LISTEN session: connect, subscribe to every channel, emit the
    /// diagnostic event, then drain notifications until the transport dies
    /// or shutdown is requested. Ok(()) means shutdown.
    async fn session(&mut self, backoff: &mut ExponentialBackoff) -> RelayResult<()> {
        let mut listener = PgListener::connect_with(&self.pool).await?;
        let channels: Vec<&str> = self.config.channels.iter().map(String::as_str).collect();
        listener.listen_all(channels).await?;

        // Connected: reset the backoff and tell subscribers about the new
        // session (they may have a gap behind them).
        backoff.reset();
        let session_id = Uuid::new_v4().to_string();
        info!(session = %session_id, channels = ?self.config.channels, "Relay listening");
        self.hub
            .publish(envelope::diagnostic(&self.config.channels, &session_id));

        loop {
            tokio::select! {
                _ = self.shutdown_rx.recv() => {
                    info!("Relay shutdown requested");
                    return Ok(());
                }

                received = listener.try_recv() => match received {
                    Ok(Some(notification)) => {
                        let env = envelope::normalize(notification.channel(), notification.payload());
                        debug!(event = %env.event, channel = %notification.channel(), "Relay received");
                        self.hub.publish(env);
                    }
                    // The driver reports a lost connection as None; rebuild
                    // the session so re-LISTEN and the diagnostic event
                    // happen on our terms.
                    Ok(None) => return Err(RelayError::ConnectionLost),
                    Err(e) => return Err(e.into()),
                },
            }
        }
    }
}
