//! Frame classification — raw relay JSON to the typed [`Event`] taxonomy.
//!
//! [`classify`] is a pure total function: it keys off `post_type` and then
//! the matching second-level discriminator (`message_type`, `notice_type`,
//! `meta_event_type`). Anything unrecognized classifies to
//! [`Event::Unknown`] — forward compatibility with relay additions is a
//! requirement, not an error.

use serde_json::Value;

use crate::segment::{self, ImageRef, MessageSegment};

/// Sender details attached to a message frame.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Sender {
    /// Account-level nickname.
    pub nickname: Option<String>,
    /// Per-group display name, preferred over the nickname.
    pub card: Option<String>,
}

impl Sender {
    fn from_value(value: &Value) -> Self {
        let get = |key: &str| {
            value
                .get(key)
                .and_then(Value::as_str)
                .filter(|s| !s.is_empty())
                .map(ToOwned::to_owned)
        };
        Self {
            nickname: get("nickname"),
            card: get("card"),
        }
    }

    /// Best available display name, falling back to the numeric id.
    pub fn display_name(&self, user_id: i64) -> String {
        self.card
            .clone()
            .or_else(|| self.nickname.clone())
            .unwrap_or_else(|| user_id.to_string())
    }
}

/// A message observed in a group.
#[derive(Debug, Clone, PartialEq)]
pub struct GroupMessage {
    /// Relay-assigned, globally unique message id.
    pub message_id: i64,
    /// Group the message was posted in.
    pub group_id: i64,
    /// Author.
    pub user_id: i64,
    /// Decoded segments, in wire order.
    pub segments: Vec<MessageSegment>,
    /// The relay's own flat-text rendering of the message.
    pub raw_message: String,
    /// Unix timestamp (seconds) assigned by the relay.
    pub time: i64,
    /// Sender display details.
    pub sender: Sender,
}

impl GroupMessage {
    /// Concatenated text content, trimmed.
    pub fn plain_text(&self) -> String {
        segment::plain_text(&self.segments)
    }

    /// All image references carried by this message.
    pub fn images(&self) -> Vec<ImageRef> {
        segment::images(&self.segments)
    }
}

/// A direct message to the bot account.
#[derive(Debug, Clone, PartialEq)]
pub struct PrivateMessage {
    /// Relay-assigned message id.
    pub message_id: i64,
    /// Author.
    pub user_id: i64,
    /// Decoded segments.
    pub segments: Vec<MessageSegment>,
    /// Unix timestamp (seconds).
    pub time: i64,
}

/// Metadata of an uploaded group file.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FileMeta {
    /// Relay file identifier.
    pub id: String,
    /// Original file name.
    pub name: String,
    /// Size in bytes.
    pub size: i64,
    /// Relay-internal bus id, when present.
    pub busid: Option<i64>,
}

/// A file was uploaded to a group.
#[derive(Debug, Clone, PartialEq)]
pub struct FileUploadNotice {
    /// Group the file was uploaded to.
    pub group_id: i64,
    /// Uploader.
    pub user_id: i64,
    /// File metadata.
    pub file: FileMeta,
    /// Unix timestamp (seconds).
    pub time: i64,
}

/// A group message was recalled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecallNotice {
    /// Group the recall happened in.
    pub group_id: i64,
    /// Author of the recalled message.
    pub user_id: i64,
    /// Who performed the recall (author or an admin).
    pub operator_id: i64,
    /// Id of the recalled message, when present.
    pub message_id: Option<i64>,
    /// Unix timestamp (seconds).
    pub time: i64,
}

/// A member joined or left a group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemberChange {
    /// Affected group.
    pub group_id: i64,
    /// Affected member.
    pub user_id: i64,
    /// True for a join, false for a leave.
    pub joined: bool,
    /// Unix timestamp (seconds).
    pub time: i64,
}

/// Typed classification of one inbound frame.
///
/// Ephemeral: an `Event` lives for the duration of one dispatch.
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    /// A group chat message.
    Group(GroupMessage),
    /// A direct message.
    Private(PrivateMessage),
    /// A group file upload notice.
    FileUpload(FileUploadNotice),
    /// A group message recall notice.
    Recall(RecallNotice),
    /// A group membership change notice.
    MemberChange(MemberChange),
    /// Transport heartbeat meta event.
    Heartbeat {
        /// Unix timestamp (seconds).
        time: i64,
    },
    /// Connection lifecycle meta event.
    Lifecycle {
        /// `connect`, `enable`, `disable`, ...
        sub_type: String,
        /// The bot's own account id as reported by the relay.
        self_id: i64,
    },
    /// Any frame this build does not recognize.
    Unknown {
        /// The raw frame, kept for diagnostics.
        raw: Value,
    },
}

/// Classify one decoded frame. Pure, never fails, never blocks.
pub fn classify(frame: &Value) -> Event {
    match frame.get("post_type").and_then(Value::as_str) {
        Some("message") => classify_message(frame),
        Some("notice") => classify_notice(frame),
        Some("meta_event") => classify_meta(frame),
        _ => unknown(frame),
    }
}

fn classify_message(frame: &Value) -> Event {
    let segments = MessageSegment::from_array(frame.get("message").unwrap_or(&Value::Null));
    match frame.get("message_type").and_then(Value::as_str) {
        Some("group") => Event::Group(GroupMessage {
            message_id: int_field(frame, "message_id"),
            group_id: int_field(frame, "group_id"),
            user_id: int_field(frame, "user_id"),
            segments,
            raw_message: frame
                .get("raw_message")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string(),
            time: int_field(frame, "time"),
            sender: frame.get("sender").map(Sender::from_value).unwrap_or_default(),
        }),
        Some("private") => Event::Private(PrivateMessage {
            message_id: int_field(frame, "message_id"),
            user_id: int_field(frame, "user_id"),
            segments,
            time: int_field(frame, "time"),
        }),
        _ => unknown(frame),
    }
}

fn classify_notice(frame: &Value) -> Event {
    match frame.get("notice_type").and_then(Value::as_str) {
        Some("group_recall") => Event::Recall(RecallNotice {
            group_id: int_field(frame, "group_id"),
            user_id: int_field(frame, "user_id"),
            operator_id: int_field(frame, "operator_id"),
            message_id: frame.get("message_id").and_then(Value::as_i64),
            time: int_field(frame, "time"),
        }),
        Some("group_upload") => {
            let file = frame.get("file").cloned().unwrap_or(Value::Null);
            Event::FileUpload(FileUploadNotice {
                group_id: int_field(frame, "group_id"),
                user_id: int_field(frame, "user_id"),
                file: FileMeta {
                    id: file
                        .get("id")
                        .and_then(Value::as_str)
                        .unwrap_or_default()
                        .to_string(),
                    name: file
                        .get("name")
                        .and_then(Value::as_str)
                        .unwrap_or("unknown")
                        .to_string(),
                    size: file.get("size").and_then(Value::as_i64).unwrap_or(0),
                    busid: file.get("busid").and_then(Value::as_i64),
                },
                time: int_field(frame, "time"),
            })
        }
        Some(change @ ("group_increase" | "group_decrease")) => {
            Event::MemberChange(MemberChange {
                group_id: int_field(frame, "group_id"),
                user_id: int_field(frame, "user_id"),
                joined: change == "group_increase",
                time: int_field(frame, "time"),
            })
        }
        _ => unknown(frame),
    }
}

fn classify_meta(frame: &Value) -> Event {
    match frame.get("meta_event_type").and_then(Value::as_str) {
        Some("heartbeat") => Event::Heartbeat {
            time: int_field(frame, "time"),
        },
        Some("lifecycle") => Event::Lifecycle {
            sub_type: frame
                .get("sub_type")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string(),
            self_id: int_field(frame, "self_id"),
        },
        _ => unknown(frame),
    }
}

fn unknown(frame: &Value) -> Event {
    Event::Unknown { raw: frame.clone() }
}

fn int_field(frame: &Value, key: &str) -> i64 {
    frame.get(key).and_then(Value::as_i64).unwrap_or(0)
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
