//! Relay connection lifecycle.
//!
//! One `ConnectionManager` owns the socket for the process lifetime. Its
//! state machine is mutated nowhere else:
//!
//! ```text
//! Disconnected -connect ok-> Authenticated -close/error/timeout-> Disconnected
//!                                                  |
//!            Degraded  <-- repeated connect failures
//! ```
//!
//! Reconnection is unbounded: this is a long-running service, every
//! failure is logged and retried after the configured delay. Heartbeat is
//! the transport's own ping/pong; a missed pong closes the session.

use std::time::Duration;

use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::{mpsc, watch};
use tokio_tungstenite::tungstenite::{Bytes, Message};
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use vigil_protocol::{classify, Event};

/// Consecutive connect failures before the state reads `Degraded`.
const DEGRADED_AFTER: u64 = 3;

/// Outbound writer channel depth. Sends beyond this backpressure the
/// rate-limited senders, never the frame pump.
const WRITER_QUEUE: usize = 64;

/// Where the session is in its lifecycle.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConnectionState {
    /// No session; waiting to (re)connect.
    Disconnected,
    /// Handshake in flight.
    Connecting,
    /// Session up, frames flowing.
    Authenticated,
    /// Still retrying, but several consecutive attempts have failed.
    Degraded,
}

/// Connection-level failure.
#[derive(Debug, thiserror::Error)]
pub enum ConnectionError {
    /// WebSocket handshake or transport failure.
    #[error("transport error: {0}")]
    Transport(#[from] tokio_tungstenite::tungstenite::Error),
}

/// Relay endpoint and timing configuration.
#[derive(Clone, Debug)]
pub struct RelayConfig {
    /// WebSocket endpoint, without the token (`ws://host:port`).
    pub url: String,
    /// Access token; appended percent-encoded when non-empty.
    pub access_token: String,
    /// Transport ping interval.
    pub heartbeat_interval: Duration,
    /// How long to wait for a pong before closing the session.
    pub heartbeat_timeout: Duration,
    /// Delay between reconnect attempts.
    pub reconnect_delay: Duration,
}

impl RelayConfig {
    /// Derive from the relay settings section.
    pub fn from_settings(settings: &vigil_settings::RelaySettings) -> Self {
        Self {
            url: format!("ws://{}:{}", settings.host, settings.port),
            access_token: settings.access_token.clone(),
            heartbeat_interval: Duration::from_secs(settings.heartbeat_interval_secs),
            heartbeat_timeout: Duration::from_secs(settings.heartbeat_timeout_secs),
            reconnect_delay: Duration::from_secs(settings.reconnect_delay_secs),
        }
    }

    fn endpoint(&self) -> String {
        if self.access_token.is_empty() {
            return self.url.clone();
        }
        let token = percent_encoding::utf8_percent_encode(
            &self.access_token,
            percent_encoding::NON_ALPHANUMERIC,
        );
        format!("{}/?access_token={token}", self.url)
    }
}

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

enum PumpExit {
    /// Socket closed or errored; reconnect.
    SessionLost,
    /// Shutdown was requested; leave the run loop.
    Shutdown,
}

/// Owns the relay session and its state machine.
pub struct ConnectionManager {
    config: RelayConfig,
    state: watch::Sender<ConnectionState>,
    outbound_rx: mpsc::Receiver<String>,
    attempts: u64,
}

impl ConnectionManager {
    /// Build a manager. Returns the writer-channel sender (for the
    /// outbound path) and a state watch (for observers and tests).
    pub fn new(
        config: RelayConfig,
    ) -> (Self, mpsc::Sender<String>, watch::Receiver<ConnectionState>) {
        let (outbound_tx, outbound_rx) = mpsc::channel(WRITER_QUEUE);
        let (state, state_rx) = watch::channel(ConnectionState::Disconnected);
        (
            Self {
                config,
                state,
                outbound_rx,
                attempts: 0,
            },
            outbound_tx,
            state_rx,
        )
    }

    fn set_state(&self, next: ConnectionState) {
        if *self.state.borrow() != next {
            tracing::debug!(state = ?next, "connection state");
        }
        let _ = self.state.send(next);
    }

    async fn connect(&self) -> Result<WsStream, ConnectionError> {
        let (stream, _) = connect_async(self.config.endpoint()).await?;
        Ok(stream)
    }

    /// Run until shutdown. Each decoded frame is classified and handed to
    /// `on_event`, which must not block materially — long work belongs in
    /// tasks the coordinator spawns.
    pub async fn run(
        mut self,
        mut on_event: impl FnMut(Event),
        mut shutdown: watch::Receiver<bool>,
    ) {
        loop {
            if *shutdown.borrow() {
                break;
            }
            self.set_state(ConnectionState::Connecting);
            self.attempts += 1;
            match self.connect().await {
                Ok(stream) => {
                    tracing::info!(url = %self.config.url, "connected to relay");
                    metrics::counter!("vigil_relay_connects_total").increment(1);
                    self.attempts = 0;
                    self.set_state(ConnectionState::Authenticated);
                    match self.pump(stream, &mut on_event, &mut shutdown).await {
                        PumpExit::Shutdown => break,
                        PumpExit::SessionLost => {
                            self.set_state(ConnectionState::Disconnected);
                        }
                    }
                }
                Err(error) => {
                    tracing::warn!(url = %self.config.url, attempt = self.attempts, error = %error,
                        "relay connect failed");
                    metrics::counter!("vigil_relay_connect_failures_total").increment(1);
                    self.set_state(if self.attempts >= DEGRADED_AFTER {
                        ConnectionState::Degraded
                    } else {
                        ConnectionState::Disconnected
                    });
                }
            }
            tokio::select! {
                () = tokio::time::sleep(self.config.reconnect_delay) => {}
                _ = shutdown.changed() => break,
            }
        }
        self.set_state(ConnectionState::Disconnected);
        tracing::info!("connection manager stopped");
    }

    async fn pump(
        &mut self,
        stream: WsStream,
        on_event: &mut impl FnMut(Event),
        shutdown: &mut watch::Receiver<bool>,
    ) -> PumpExit {
        let (mut sink, mut source) = stream.split();
        let mut ping = tokio::time::interval_at(
            tokio::time::Instant::now() + self.config.heartbeat_interval,
            self.config.heartbeat_interval,
        );
        let mut pong_deadline: Option<tokio::time::Instant> = None;

        loop {
            let pong_timeout = async move {
                match pong_deadline {
                    Some(deadline) => tokio::time::sleep_until(deadline).await,
                    None => std::future::pending().await,
                }
            };
            tokio::select! {
                frame = source.next() => match frame {
                    Some(Ok(Message::Text(text))) => {
                        match serde_json::from_str::<serde_json::Value>(text.as_str()) {
                            Ok(value) => on_event(classify(&value)),
                            Err(error) => {
                                metrics::counter!("vigil_frames_dropped_total").increment(1);
                                tracing::warn!(error = %error, "dropping malformed frame");
                            }
                        }
                    }
                    Some(Ok(Message::Ping(payload))) => {
                        if sink.send(Message::Pong(payload)).await.is_err() {
                            return PumpExit::SessionLost;
                        }
                    }
                    Some(Ok(Message::Pong(_))) => pong_deadline = None,
                    Some(Ok(Message::Close(_))) | None => {
                        tracing::warn!("relay closed the session");
                        return PumpExit::SessionLost;
                    }
                    Some(Ok(_)) => {} // binary and raw frames are not part of the protocol
                    Some(Err(error)) => {
                        tracing::warn!(error = %error, "socket error");
                        return PumpExit::SessionLost;
                    }
                },
                outgoing = self.outbound_rx.recv() => match outgoing {
                    Some(frame) => {
                        if sink.send(Message::Text(frame.into())).await.is_err() {
                            return PumpExit::SessionLost;
                        }
                    }
                    // All senders dropped; nothing will ever be sent again.
                    None => return PumpExit::Shutdown,
                },
                _ = ping.tick() => {
                    if sink.send(Message::Ping(Bytes::new())).await.is_err() {
                        return PumpExit::SessionLost;
                    }
                    if pong_deadline.is_none() {
                        pong_deadline =
                            Some(tokio::time::Instant::now() + self.config.heartbeat_timeout);
                    }
                }
                () = pong_timeout => {
                    tracing::warn!(timeout = ?self.config.heartbeat_timeout,
                        "heartbeat timed out, closing session");
                    metrics::counter!("vigil_heartbeat_timeouts_total").increment(1);
                    let _ = sink.send(Message::Close(None)).await;
                    return PumpExit::SessionLost;
                }
                _ = shutdown.changed() => {
                    let _ = sink.send(Message::Close(None)).await;
                    return PumpExit::Shutdown;
                }
            }
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
