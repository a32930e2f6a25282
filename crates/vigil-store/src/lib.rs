//! # vigil-store
//!
//! SQLite persistence for the Vigil bot.
//!
//! Layout follows one writer path / many readers: every write is a single
//! statement, connections run in WAL mode with a busy timeout, and the
//! repositories are stateless — each method takes a `&Connection` borrowed
//! from the pool.
//!
//! - [`pool`] — r2d2 connection pool with per-connection pragmas
//! - [`migrations`] — `PRAGMA user_version` keyed schema migrations
//! - [`repos`] — stateless per-table repositories
//! - [`store::ArchiveStore`] — the facade handed to the coordinator and to
//!   command handlers
//! - [`time::ReportClock`] — configurable-timezone day/period boundaries

pub mod errors;
pub mod migrations;
pub mod pool;
pub mod repos;
pub mod store;
pub mod time;

pub use errors::{Result, StoreError};
pub use migrations::run_migrations;
pub use pool::{new_file, new_in_memory, ConnectionConfig, ConnectionPool};
pub use repos::{FileRecord, ImageRecord, ImageStatus, NewMessage, RankEntry};
pub use store::{ArchiveStore, GroupOverview};
pub use time::ReportClock;
