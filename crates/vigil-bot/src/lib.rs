//! # vigil-bot
//!
//! The bot process: connects to the chat relay, classifies the event
//! stream, archives what it sees and answers stats commands.
//!
//! - [`connection`] — WebSocket session lifecycle, heartbeat, frame pump,
//!   reconnect
//! - [`coordinator`] — per-event fan-out: persistence, asset fetches,
//!   command dispatch
//! - [`outbound`] — rate-limited send path back to the relay
//! - [`handlers`] — built-in stats commands

pub mod connection;
pub mod coordinator;
pub mod handlers;
pub mod outbound;
