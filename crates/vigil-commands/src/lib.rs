//! # vigil-commands
//!
//! The command front-end: a [`Command`] trait for handlers, a
//! [`CommandRegistry`] that resolves prefixed message text to a handler,
//! and the context/reply types that flow between the ingestion loop and
//! handlers.
//!
//! Resolution is case-insensitive on the command word and supports
//! aliases, so `/STAT`, `/stat` and a localized alias all reach the same
//! handler.

pub mod registry;
pub mod types;

pub use registry::CommandRegistry;
pub use types::{Command, CommandContext, CommandError, CommandInfo, Reply};
