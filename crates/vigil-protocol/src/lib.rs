//! # vigil-protocol
//!
//! Types and pure functions for the relay's JSON wire protocol.
//!
//! - **Segments**: [`segment::MessageSegment`] — the tagged pieces a chat
//!   message is made of, decoded by discriminator with an `Other` catch-all
//! - **Events**: [`event::Event`] — the typed classification of one inbound
//!   frame, produced by [`event::classify`]
//! - **Outbound**: [`outbound::OutboundApi`] — `{action, params, echo}`
//!   call builder with a process-unique echo counter
//!
//! Everything here is side-effect free; decoding never fails, it degrades to
//! the catch-all variants instead so that relay protocol additions do not
//! break ingestion.

pub mod event;
pub mod outbound;
pub mod segment;

pub use event::{
    classify, Event, FileMeta, FileUploadNotice, GroupMessage, MemberChange, PrivateMessage,
    RecallNotice, Sender,
};
pub use outbound::{OutboundApi, OutgoingMessage};
pub use segment::{plain_text, AtTarget, ImageRef, MessageKind, MessageSegment};
