//! Message segments — the tagged pieces a chat message is made of.
//!
//! The wire shape is `{"type": "...", "data": {...}}`. Decoding inspects the
//! discriminator first and only then reads the type-specific fields, so an
//! unrecognized segment kind lands in [`MessageSegment::Other`] instead of
//! failing the whole message.

use serde_json::{json, Map, Value};

/// Target of an `at` (mention) segment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AtTarget {
    /// A single user id.
    User(i64),
    /// The whole group (`"qq": "all"` on the wire).
    All,
}

/// One segment of a chat message.
#[derive(Debug, Clone, PartialEq)]
pub enum MessageSegment {
    /// Plain text.
    Text {
        /// The text content.
        text: String,
    },
    /// An image attachment.
    Image {
        /// Relay-assigned file reference.
        file: String,
        /// Download URL, when the relay supplies one.
        url: Option<String>,
    },
    /// A mention.
    At {
        /// Who is mentioned.
        target: AtTarget,
    },
    /// A built-in emoticon.
    Face {
        /// Emoticon id.
        id: String,
    },
    /// A reply reference to an earlier message.
    Reply {
        /// Referenced message id.
        message_id: String,
    },
    /// Any segment kind this build does not know about.
    Other {
        /// The wire discriminator.
        kind: String,
        /// The raw `data` object.
        data: Value,
    },
}

/// Image reference extracted from a message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageRef {
    /// Relay-assigned file reference.
    pub file: String,
    /// Download URL.
    pub url: Option<String>,
}

/// Storage classification of a whole message by its segment kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageKind {
    /// Only text segments.
    Text,
    /// Only image segments.
    Image,
    /// Anything else.
    Mixed,
}

impl MessageKind {
    /// Column value used by the message table.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Image => "image",
            Self::Mixed => "mixed",
        }
    }

    /// Classify a message by the set of distinct segment kinds it contains.
    pub fn of(segments: &[MessageSegment]) -> Self {
        let mut saw_text = false;
        let mut saw_image = false;
        let mut saw_other = false;
        for seg in segments {
            match seg {
                MessageSegment::Text { .. } => saw_text = true,
                MessageSegment::Image { .. } => saw_image = true,
                _ => saw_other = true,
            }
        }
        match (saw_text, saw_image, saw_other) {
            (true, false, false) => Self::Text,
            (false, true, false) => Self::Image,
            _ => Self::Mixed,
        }
    }
}

impl MessageSegment {
    /// A plain text segment.
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text { text: text.into() }
    }

    /// An image segment referencing a relay file id, optionally with a URL.
    pub fn image(file: impl Into<String>, url: Option<String>) -> Self {
        Self::Image {
            file: file.into(),
            url,
        }
    }

    /// An inline base64 image (`base64://...` file reference).
    pub fn image_base64(b64: &str) -> Self {
        Self::Image {
            file: format!("base64://{b64}"),
            url: None,
        }
    }

    /// Mention a single user.
    pub fn at(user_id: i64) -> Self {
        Self::At {
            target: AtTarget::User(user_id),
        }
    }

    /// Mention the whole group.
    pub fn at_all() -> Self {
        Self::At {
            target: AtTarget::All,
        }
    }

    /// A built-in emoticon segment.
    pub fn face(id: i64) -> Self {
        Self::Face { id: id.to_string() }
    }

    /// A reply reference.
    pub fn reply(message_id: i64) -> Self {
        Self::Reply {
            message_id: message_id.to_string(),
        }
    }

    /// Decode one wire segment. Total: unknown kinds become [`Self::Other`].
    pub fn from_value(value: &Value) -> Self {
        let kind = value.get("type").and_then(Value::as_str).unwrap_or("");
        let data = value.get("data").cloned().unwrap_or(Value::Null);
        match kind {
            "text" => Self::Text {
                text: str_field(&data, "text"),
            },
            "image" => Self::Image {
                file: str_field(&data, "file"),
                url: data
                    .get("url")
                    .and_then(Value::as_str)
                    .filter(|u| !u.is_empty())
                    .map(ToOwned::to_owned),
            },
            "at" => {
                let qq = str_field(&data, "qq");
                let target = if qq == "all" {
                    AtTarget::All
                } else {
                    AtTarget::User(qq.parse().unwrap_or(0))
                };
                Self::At { target }
            }
            "face" => Self::Face {
                id: str_field(&data, "id"),
            },
            "reply" => Self::Reply {
                message_id: str_field(&data, "id"),
            },
            other => Self::Other {
                kind: other.to_string(),
                data,
            },
        }
    }

    /// Decode a whole message array. Non-object entries are skipped.
    pub fn from_array(value: &Value) -> Vec<Self> {
        value
            .as_array()
            .map(|segs| segs.iter().filter(|v| v.is_object()).map(Self::from_value).collect())
            .unwrap_or_default()
    }

    /// Encode to the wire shape.
    pub fn to_value(&self) -> Value {
        match self {
            Self::Text { text } => json!({"type": "text", "data": {"text": text}}),
            Self::Image { file, url } => {
                let mut data = Map::new();
                let _ = data.insert("file".into(), Value::String(file.clone()));
                if let Some(url) = url {
                    let _ = data.insert("url".into(), Value::String(url.clone()));
                }
                json!({"type": "image", "data": Value::Object(data)})
            }
            Self::At { target } => {
                let qq = match target {
                    AtTarget::User(id) => id.to_string(),
                    AtTarget::All => "all".to_string(),
                };
                json!({"type": "at", "data": {"qq": qq}})
            }
            Self::Face { id } => json!({"type": "face", "data": {"id": id}}),
            Self::Reply { message_id } => json!({"type": "reply", "data": {"id": message_id}}),
            Self::Other { kind, data } => json!({"type": kind, "data": data}),
        }
    }
}

/// Concatenated text content of a message, trimmed.
pub fn plain_text(segments: &[MessageSegment]) -> String {
    let mut out = String::new();
    for seg in segments {
        if let MessageSegment::Text { text } = seg {
            out.push_str(text);
        }
    }
    out.trim().to_string()
}

/// All image references in a message, in order.
pub fn images(segments: &[MessageSegment]) -> Vec<ImageRef> {
    segments
        .iter()
        .filter_map(|seg| match seg {
            MessageSegment::Image { file, url } => Some(ImageRef {
                file: file.clone(),
                url: url.clone(),
            }),
            _ => None,
        })
        .collect()
}

fn str_field(data: &Value, key: &str) -> String {
    match data.get(key) {
        Some(Value::String(s)) => s.clone(),
        // Some relay builds send numeric ids unquoted.
        Some(Value::Number(n)) => n.to_string(),
        _ => String::new(),
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
