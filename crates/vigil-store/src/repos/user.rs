//! The `user_info` table: display-name cache for report rendering.

use std::collections::HashMap;

use rusqlite::{params, Connection};

use crate::errors::Result;

/// Repository over the `user_info` table.
pub struct UserRepo;

impl UserRepo {
    /// Record the latest known display name for a user.
    pub fn upsert(
        conn: &Connection,
        user_id: i64,
        display_name: &str,
        updated_at: i64,
    ) -> Result<()> {
        let _ = conn.execute(
            "INSERT INTO user_info (user_id, display_name, updated_at)
             VALUES (?1, ?2, ?3)
             ON CONFLICT (user_id) DO UPDATE SET
                 display_name = excluded.display_name,
                 updated_at = excluded.updated_at",
            params![user_id, display_name, updated_at],
        )?;
        Ok(())
    }

    /// Display names for a batch of users. Users with no cached name are
    /// absent from the map; callers fall back to the numeric id.
    pub fn names(conn: &Connection, user_ids: &[i64]) -> Result<HashMap<i64, String>> {
        let mut out = HashMap::with_capacity(user_ids.len());
        let mut stmt =
            conn.prepare("SELECT display_name FROM user_info WHERE user_id = ?1")?;
        for &user_id in user_ids {
            let mut rows = stmt.query_map(params![user_id], |row| row.get::<_, String>(0))?;
            if let Some(name) = rows.next() {
                let _ = out.insert(user_id, name?);
            }
        }
        Ok(out)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
