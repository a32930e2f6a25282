//! Rate-limited outbound send path.
//!
//! Every reply funnels through here: wait for a rate-limiter slot, build
//! the relay call frame, hand it to the connection's writer channel. The
//! channel send is the only coupling to the connection; if the session is
//! gone the frame is dropped with an error the caller can log.

use std::sync::Arc;

use tokio::sync::mpsc;
use vigil_assets::RateLimiter;
use vigil_protocol::OutboundApi;

/// Sending failed because the connection writer is gone.
#[derive(Debug, thiserror::Error)]
#[error("connection writer closed")]
pub struct SendClosed;

/// Shared handle for sending messages to the relay.
#[derive(Clone)]
pub struct OutboundSender {
    api: Arc<OutboundApi>,
    limiter: Arc<RateLimiter>,
    tx: mpsc::Sender<String>,
}

impl OutboundSender {
    /// Wrap the connection's writer channel.
    pub fn new(limiter: Arc<RateLimiter>, tx: mpsc::Sender<String>) -> Self {
        Self {
            api: Arc::new(OutboundApi::new()),
            limiter,
            tx,
        }
    }

    /// Send plain text to a group. Suspends until the rate limiter admits
    /// the call.
    pub async fn send_group_text(
        &self,
        group_id: i64,
        text: impl Into<String> + Send,
    ) -> Result<(), SendClosed> {
        self.limiter.acquire().await;
        let frame = self.api.send_group_msg(group_id, text.into());
        self.tx.send(frame).await.map_err(|_| SendClosed)
    }

    /// Send plain text to a user directly.
    pub async fn send_private_text(
        &self,
        user_id: i64,
        text: impl Into<String> + Send,
    ) -> Result<(), SendClosed> {
        self.limiter.acquire().await;
        let frame = self.api.send_private_msg(user_id, text.into());
        self.tx.send(frame).await.map_err(|_| SendClosed)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
