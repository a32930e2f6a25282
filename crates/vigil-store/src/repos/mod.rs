//! Stateless per-table repositories.
//!
//! Each repository is a unit struct with associated functions taking a
//! `&Connection`; the caller owns the connection checkout, so a handler
//! can run several queries on one connection without re-entering the pool.

pub mod asset;
pub mod message;
pub mod recall;
pub mod user;

pub use asset::{AssetRepo, FileRecord, ImageRecord, ImageStatus};
pub use message::{MessageRepo, NewMessage, RankEntry};
pub use recall::RecallRepo;
pub use user::UserRepo;
