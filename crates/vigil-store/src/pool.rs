//! SQLite connection pooling.
//!
//! Every connection the pool hands out has WAL journaling, a busy timeout
//! and foreign keys enabled before first use. WAL is what lets the archive
//! take writes from the ingestion path while command handlers read.

use std::path::Path;

use r2d2_sqlite::SqliteConnectionManager;
use rand::Rng;
use rusqlite::Connection;

use crate::errors::Result;

/// Pool of SQLite connections shared across the bot.
pub type ConnectionPool = r2d2::Pool<SqliteConnectionManager>;

/// Per-connection tuning applied by the pool's init hook.
#[derive(Clone, Copy, Debug)]
pub struct ConnectionConfig {
    /// How long a connection waits on a locked database before erroring.
    pub busy_timeout_ms: u32,
    /// Maximum pooled connections.
    pub max_connections: u32,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            busy_timeout_ms: 5_000,
            max_connections: 8,
        }
    }
}

fn init_pragmas(conn: &Connection, busy_timeout_ms: u32) -> rusqlite::Result<()> {
    conn.execute_batch(&format!(
        "PRAGMA journal_mode = WAL;
         PRAGMA synchronous = NORMAL;
         PRAGMA busy_timeout = {busy_timeout_ms};
         PRAGMA foreign_keys = ON;"
    ))
}

/// Open (creating if needed) a file-backed pool at `path`.
///
/// Parent directories are created first; SQLite will not create them.
pub fn new_file(path: &Path, config: ConnectionConfig) -> Result<ConnectionPool> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    let busy_timeout_ms = config.busy_timeout_ms;
    let manager = SqliteConnectionManager::file(path)
        .with_init(move |conn| init_pragmas(conn, busy_timeout_ms));
    let pool = r2d2::Pool::builder()
        .max_size(config.max_connections)
        .build(manager)?;
    tracing::info!(path = %path.display(), "opened archive database");
    Ok(pool)
}

/// Open a pool backed by a fresh in-memory database.
///
/// Uses a uniquely named shared-cache URI so every pooled connection sees
/// the same database. Intended for tests.
pub fn new_in_memory() -> Result<ConnectionPool> {
    let name: u64 = rand::rng().random();
    let uri = format!("file:vigilmem{name:016x}?mode=memory&cache=shared");
    let manager =
        SqliteConnectionManager::file(uri).with_init(move |conn| init_pragmas(conn, 5_000));
    let pool = r2d2::Pool::builder().max_size(4).build(manager)?;
    Ok(pool)
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
