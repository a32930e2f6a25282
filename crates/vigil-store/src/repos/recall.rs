//! The `recall_stats` table: one row per observed message recall.

use rusqlite::{params, Connection};

use crate::errors::Result;
use crate::repos::message::RankEntry;

/// Repository over the `recall_stats` table.
pub struct RecallRepo;

impl RecallRepo {
    /// Record a recall event.
    pub fn insert(
        conn: &Connection,
        group_id: i64,
        user_id: i64,
        operator_id: i64,
        message_id: Option<i64>,
        recalled_at: i64,
    ) -> Result<()> {
        let _ = conn.execute(
            "INSERT INTO recall_stats (group_id, user_id, operator_id, message_id, recalled_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![group_id, user_id, operator_id, message_id, recalled_at],
        )?;
        Ok(())
    }

    /// Users whose messages were recalled most often at or after `since`,
    /// highest first. Counts the message author, not the operator.
    pub fn ranking(
        conn: &Connection,
        group_id: i64,
        since: i64,
        limit: u32,
    ) -> Result<Vec<RankEntry>> {
        let mut stmt = conn.prepare(
            "SELECT user_id, count(*) AS n FROM recall_stats
             WHERE group_id = ?1 AND recalled_at >= ?2
             GROUP BY user_id
             ORDER BY n DESC, user_id ASC
             LIMIT ?3",
        )?;
        let rows = stmt.query_map(params![group_id, since, limit], |row| {
            Ok(RankEntry {
                user_id: row.get(0)?,
                count: row.get(1)?,
            })
        })?;
        Ok(rows.collect::<rusqlite::Result<_>>()?)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::migrations::run_migrations;

    fn open() -> Connection {
        let mut conn = Connection::open_in_memory().unwrap();
        run_migrations(&mut conn).unwrap();
        conn
    }

    #[test]
    fn ranking_counts_authors() {
        let conn = open();
        // User 10 self-recalls twice, an admin recalls one of user 20's.
        RecallRepo::insert(&conn, 42, 10, 10, Some(1), 100).unwrap();
        RecallRepo::insert(&conn, 42, 10, 10, Some(2), 110).unwrap();
        RecallRepo::insert(&conn, 42, 20, 99, None, 120).unwrap();

        let ranking = RecallRepo::ranking(&conn, 42, 0, 10).unwrap();
        assert_eq!(
            ranking,
            vec![
                RankEntry { user_id: 10, count: 2 },
                RankEntry { user_id: 20, count: 1 },
            ]
        );
    }

    #[test]
    fn ranking_respects_window() {
        let conn = open();
        RecallRepo::insert(&conn, 42, 10, 10, None, 100).unwrap();
        RecallRepo::insert(&conn, 42, 10, 10, None, 500).unwrap();
        let ranking = RecallRepo::ranking(&conn, 42, 300, 10).unwrap();
        assert_eq!(ranking, vec![RankEntry { user_id: 10, count: 1 }]);
    }
}
