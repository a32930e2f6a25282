//! Outbound API calls — `{action, params, echo}` frames sent to the relay.
//!
//! `echo` is a locally generated, monotonically incrementing, process-unique
//! token. Nothing in the core correlates responses yet; the token exists so
//! that relay-side logs and a future response path can.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use serde_json::{json, Value};

use crate::segment::MessageSegment;

/// An outgoing message body: plain text or pre-built segments.
#[derive(Debug, Clone, PartialEq)]
pub enum OutgoingMessage {
    /// Plain text, wrapped into a single text segment on the wire.
    Text(String),
    /// Explicit segment list.
    Segments(Vec<MessageSegment>),
}

impl OutgoingMessage {
    fn into_wire(self) -> Value {
        let segments = match self {
            Self::Text(text) => vec![MessageSegment::text(text)],
            Self::Segments(segments) => segments,
        };
        Value::Array(segments.iter().map(MessageSegment::to_value).collect())
    }
}

impl From<String> for OutgoingMessage {
    fn from(text: String) -> Self {
        Self::Text(text)
    }
}

impl From<&str> for OutgoingMessage {
    fn from(text: &str) -> Self {
        Self::Text(text.to_string())
    }
}

impl From<Vec<MessageSegment>> for OutgoingMessage {
    fn from(segments: Vec<MessageSegment>) -> Self {
        Self::Segments(segments)
    }
}

/// Builder for outbound API call frames.
pub struct OutboundApi {
    echo_counter: AtomicU64,
}

impl OutboundApi {
    /// New builder with the echo counter at zero.
    pub fn new() -> Self {
        Self {
            echo_counter: AtomicU64::new(0),
        }
    }

    /// Build a `send_group_msg` call, JSON-encoded.
    pub fn send_group_msg(&self, group_id: i64, message: impl Into<OutgoingMessage>) -> String {
        self.build("send_group_msg", json!({
            "group_id": group_id,
            "message": message.into().into_wire(),
        }))
    }

    /// Build a `send_private_msg` call, JSON-encoded.
    pub fn send_private_msg(&self, user_id: i64, message: impl Into<OutgoingMessage>) -> String {
        self.build("send_private_msg", json!({
            "user_id": user_id,
            "message": message.into().into_wire(),
        }))
    }

    fn build(&self, action: &str, params: Value) -> String {
        let frame = json!({
            "action": action,
            "params": params,
            "echo": self.next_echo(),
        });
        frame.to_string()
    }

    fn next_echo(&self) -> String {
        let n = self.echo_counter.fetch_add(1, Ordering::Relaxed) + 1;
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0);
        format!("echo_{n}_{now}")
    }
}

impl Default for OutboundApi {
    fn default() -> Self {
        Self::new()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
