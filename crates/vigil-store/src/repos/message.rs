//! The `messages` table: one row per archived group message.

use rusqlite::{params, Connection};
use vigil_protocol::MessageKind;

use crate::errors::Result;

/// A message about to be archived.
#[derive(Clone, Debug)]
pub struct NewMessage {
    /// Relay-assigned message id. Unique per deployment; duplicates are
    /// dropped on insert.
    pub message_id: i64,
    /// Group the message was posted in.
    pub group_id: i64,
    /// Sender.
    pub user_id: i64,
    /// Coarse content classification.
    pub kind: MessageKind,
    /// Raw segment array, serialized as JSON.
    pub content: String,
    /// Unix send time in seconds.
    pub created_at: i64,
}

/// One row of a per-user activity ranking.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RankEntry {
    /// Ranked user.
    pub user_id: i64,
    /// Row count over the queried window.
    pub count: i64,
}

/// Repository over the `messages` table.
pub struct MessageRepo;

impl MessageRepo {
    /// Insert a message, ignoring it if the `message_id` was already
    /// archived. Returns whether a row was written.
    pub fn insert_if_absent(conn: &Connection, msg: &NewMessage) -> Result<bool> {
        let changed = conn.execute(
            "INSERT OR IGNORE INTO messages
                 (message_id, group_id, user_id, kind, content, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                msg.message_id,
                msg.group_id,
                msg.user_id,
                msg.kind.as_str(),
                msg.content,
                msg.created_at,
            ],
        )?;
        Ok(changed > 0)
    }

    /// All-time message count for a group.
    pub fn count_all(conn: &Connection, group_id: i64) -> Result<i64> {
        let count = conn.query_row(
            "SELECT count(*) FROM messages WHERE group_id = ?1",
            params![group_id],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    /// Message count for a group at or after `since`.
    pub fn count_since(conn: &Connection, group_id: i64, since: i64) -> Result<i64> {
        let count = conn.query_row(
            "SELECT count(*) FROM messages WHERE group_id = ?1 AND created_at >= ?2",
            params![group_id, since],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    /// Distinct senders seen in a group, all time.
    pub fn distinct_users(conn: &Connection, group_id: i64) -> Result<i64> {
        let count = conn.query_row(
            "SELECT count(DISTINCT user_id) FROM messages WHERE group_id = ?1",
            params![group_id],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    /// Top senders by message count at or after `since`, busiest first.
    /// Ties break on user id so the ordering is stable.
    pub fn user_ranking(
        conn: &Connection,
        group_id: i64,
        since: i64,
        limit: u32,
    ) -> Result<Vec<RankEntry>> {
        let mut stmt = conn.prepare(
            "SELECT user_id, count(*) AS n FROM messages
             WHERE group_id = ?1 AND created_at >= ?2
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

    /// Send timestamps for a group at or after `since`, for hour-of-day
    /// bucketing by the caller (the bucket boundary is timezone-dependent,
    /// which SQLite cannot evaluate).
    pub fn timestamps_since(conn: &Connection, group_id: i64, since: i64) -> Result<Vec<i64>> {
        let mut stmt = conn.prepare(
            "SELECT created_at FROM messages WHERE group_id = ?1 AND created_at >= ?2",
        )?;
        let rows = stmt.query_map(params![group_id, since], |row| row.get(0))?;
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

    fn msg(message_id: i64, user_id: i64, created_at: i64) -> NewMessage {
        NewMessage {
            message_id,
            group_id: 42,
            user_id,
            kind: MessageKind::Text,
            content: "[]".to_string(),
            created_at,
        }
    }

    #[test]
    fn insert_is_idempotent() {
        let conn = open();
        assert!(MessageRepo::insert_if_absent(&conn, &msg(1, 10, 100)).unwrap());
        assert!(!MessageRepo::insert_if_absent(&conn, &msg(1, 10, 100)).unwrap());
        assert_eq!(MessageRepo::count_all(&conn, 42).unwrap(), 1);
    }

    #[test]
    fn counts_are_scoped_to_group_and_window() {
        let conn = open();
        MessageRepo::insert_if_absent(&conn, &msg(1, 10, 100)).unwrap();
        MessageRepo::insert_if_absent(&conn, &msg(2, 10, 200)).unwrap();
        let mut other = msg(3, 10, 150);
        other.group_id = 99;
        MessageRepo::insert_if_absent(&conn, &other).unwrap();

        assert_eq!(MessageRepo::count_all(&conn, 42).unwrap(), 2);
        assert_eq!(MessageRepo::count_since(&conn, 42, 150).unwrap(), 1);
        assert_eq!(MessageRepo::count_since(&conn, 42, 500).unwrap(), 0);
    }

    #[test]
    fn ranking_orders_by_count_then_user() {
        let conn = open();
        MessageRepo::insert_if_absent(&conn, &msg(1, 20, 100)).unwrap();
        MessageRepo::insert_if_absent(&conn, &msg(2, 20, 110)).unwrap();
        MessageRepo::insert_if_absent(&conn, &msg(3, 10, 120)).unwrap();
        MessageRepo::insert_if_absent(&conn, &msg(4, 30, 130)).unwrap();

        let ranking = MessageRepo::user_ranking(&conn, 42, 0, 10).unwrap();
        assert_eq!(
            ranking,
            vec![
                RankEntry { user_id: 20, count: 2 },
                RankEntry { user_id: 10, count: 1 },
                RankEntry { user_id: 30, count: 1 },
            ]
        );
    }

    #[test]
    fn ranking_respects_limit_and_window() {
        let conn = open();
        for i in 0..5 {
            MessageRepo::insert_if_absent(&conn, &msg(i, i, 100 + i)).unwrap();
        }
        let ranking = MessageRepo::user_ranking(&conn, 42, 102, 2).unwrap();
        assert_eq!(ranking.len(), 2);
        assert!(ranking.iter().all(|r| r.count == 1));
    }

    #[test]
    fn distinct_users_counts_senders_once() {
        let conn = open();
        MessageRepo::insert_if_absent(&conn, &msg(1, 10, 100)).unwrap();
        MessageRepo::insert_if_absent(&conn, &msg(2, 10, 110)).unwrap();
        MessageRepo::insert_if_absent(&conn, &msg(3, 20, 120)).unwrap();
        assert_eq!(MessageRepo::distinct_users(&conn, 42).unwrap(), 2);
    }

    #[test]
    fn timestamps_for_histogram() {
        let conn = open();
        MessageRepo::insert_if_absent(&conn, &msg(1, 10, 100)).unwrap();
        MessageRepo::insert_if_absent(&conn, &msg(2, 10, 300)).unwrap();
        let mut ts = MessageRepo::timestamps_since(&conn, 42, 200).unwrap();
        ts.sort_unstable();
        assert_eq!(ts, vec![300]);
    }
}
