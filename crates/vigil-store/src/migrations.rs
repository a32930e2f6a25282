//! Schema migrations keyed off `PRAGMA user_version`.
//!
//! Each migration runs inside its own transaction and bumps the version at
//! the end, so a crash mid-migration leaves the database on the previous
//! version and the migration re-runs cleanly on next start.

use rusqlite::Connection;

use crate::errors::Result;

/// Current schema version. Bump when appending to [`MIGRATIONS`].
pub const SCHEMA_VERSION: i64 = 1;

const MIGRATIONS: &[&str] = &[
    // v1: initial schema
    "CREATE TABLE messages (
        id          INTEGER PRIMARY KEY AUTOINCREMENT,
        message_id  INTEGER NOT NULL UNIQUE,
        group_id    INTEGER NOT NULL,
        user_id     INTEGER NOT NULL,
        kind        TEXT    NOT NULL,
        content     TEXT    NOT NULL,
        created_at  INTEGER NOT NULL
    );
    CREATE INDEX idx_messages_group_time ON messages (group_id, created_at);
    CREATE INDEX idx_messages_user_time  ON messages (user_id, created_at);

    CREATE TABLE assets_images (
        file_id       TEXT PRIMARY KEY,
        url           TEXT NOT NULL,
        local_path    TEXT,
        content_hash  TEXT NOT NULL,
        size_bytes    INTEGER,
        status        INTEGER NOT NULL DEFAULT 0,
        first_seen_at INTEGER NOT NULL
    );
    CREATE INDEX idx_images_hash ON assets_images (content_hash);

    CREATE TABLE assets_files (
        file_id     TEXT PRIMARY KEY,
        group_id    INTEGER NOT NULL,
        uploader_id INTEGER NOT NULL,
        file_name   TEXT NOT NULL,
        size_bytes  INTEGER NOT NULL,
        busid       INTEGER,
        uploaded_at INTEGER NOT NULL
    );

    CREATE TABLE user_info (
        user_id      INTEGER PRIMARY KEY,
        display_name TEXT NOT NULL,
        updated_at   INTEGER NOT NULL
    );

    CREATE TABLE recall_stats (
        id          INTEGER PRIMARY KEY AUTOINCREMENT,
        group_id    INTEGER NOT NULL,
        user_id     INTEGER NOT NULL,
        operator_id INTEGER NOT NULL,
        message_id  INTEGER,
        recalled_at INTEGER NOT NULL
    );
    CREATE INDEX idx_recalls_group_time ON recall_stats (group_id, recalled_at);",
];

/// Bring the database at `conn` up to [`SCHEMA_VERSION`].
pub fn run_migrations(conn: &mut Connection) -> Result<()> {
    let mut version: i64 = conn.query_row("PRAGMA user_version", [], |row| row.get(0))?;
    while (version as usize) < MIGRATIONS.len() {
        let target = version + 1;
        let tx = conn.transaction()?;
        tx.execute_batch(MIGRATIONS[version as usize])?;
        // PRAGMA does not support parameter binding
        tx.execute_batch(&format!("PRAGMA user_version = {target}"))?;
        tx.commit()?;
        tracing::info!(from = version, to = target, "applied schema migration");
        version = target;
    }
    Ok(())
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
