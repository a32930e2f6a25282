//! `ArchiveStore`: the facade the rest of the bot talks to.
//!
//! Wraps the pool and the report clock; each method checks out one
//! connection, runs the repository calls it needs, and returns plain data.

use std::collections::HashMap;

use crate::errors::Result;
use crate::pool::ConnectionPool;
use crate::repos::{
    AssetRepo, FileRecord, ImageRecord, MessageRepo, NewMessage, RankEntry, RecallRepo, UserRepo,
};
use crate::time::ReportClock;

/// All-time and today's headline numbers for one group.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct GroupOverview {
    /// Messages archived for the group, all time.
    pub total_messages: i64,
    /// Messages archived since local midnight.
    pub today_messages: i64,
    /// Distinct senders seen, all time.
    pub distinct_users: i64,
    /// Images fetched into the content store, across all groups.
    pub stored_images: i64,
}

/// Handle on the archive database.
#[derive(Clone)]
pub struct ArchiveStore {
    pool: ConnectionPool,
    clock: ReportClock,
}

impl ArchiveStore {
    /// Wrap an already-migrated pool.
    pub fn new(pool: ConnectionPool, clock: ReportClock) -> Self {
        Self { pool, clock }
    }

    /// The report clock this store renders day boundaries with.
    pub fn clock(&self) -> ReportClock {
        self.clock
    }

    /// The underlying pool, for callers that need raw read access.
    pub fn pool(&self) -> &ConnectionPool {
        &self.pool
    }

    /// Archive a message. Returns whether it was new.
    pub fn record_message(&self, msg: &NewMessage) -> Result<bool> {
        let conn = self.pool.get()?;
        MessageRepo::insert_if_absent(&conn, msg)
    }

    /// Refresh the display-name cache for a user.
    pub fn record_user(&self, user_id: i64, display_name: &str, now: i64) -> Result<()> {
        let conn = self.pool.get()?;
        UserRepo::upsert(&conn, user_id, display_name, now)
    }

    /// Write or overwrite an image record.
    pub fn record_image(&self, record: &ImageRecord) -> Result<()> {
        let conn = self.pool.get()?;
        AssetRepo::upsert_image(&conn, record)
    }

    /// Stored-image path for a content digest, if the bytes are already on
    /// disk.
    pub fn image_path_by_hash(&self, content_hash: &str) -> Result<Option<String>> {
        let conn = self.pool.get()?;
        AssetRepo::path_by_hash(&conn, content_hash)
    }

    /// Record a group file upload.
    pub fn record_file(&self, record: &FileRecord) -> Result<()> {
        let conn = self.pool.get()?;
        AssetRepo::insert_file(&conn, record)
    }

    /// Record a message recall.
    pub fn record_recall(
        &self,
        group_id: i64,
        user_id: i64,
        operator_id: i64,
        message_id: Option<i64>,
        recalled_at: i64,
    ) -> Result<()> {
        let conn = self.pool.get()?;
        RecallRepo::insert(&conn, group_id, user_id, operator_id, message_id, recalled_at)
    }

    /// Headline numbers for the `/info` report.
    pub fn group_overview(&self, group_id: i64) -> Result<GroupOverview> {
        let conn = self.pool.get()?;
        let day_start = self.clock.day_start(self.clock.now());
        Ok(GroupOverview {
            total_messages: MessageRepo::count_all(&conn, group_id)?,
            today_messages: MessageRepo::count_since(&conn, group_id, day_start)?,
            distinct_users: MessageRepo::distinct_users(&conn, group_id)?,
            stored_images: AssetRepo::image_count(&conn)?,
        })
    }

    /// Today's most active senders.
    pub fn today_ranking(&self, group_id: i64, limit: u32) -> Result<Vec<RankEntry>> {
        let conn = self.pool.get()?;
        let day_start = self.clock.day_start(self.clock.now());
        MessageRepo::user_ranking(&conn, group_id, day_start, limit)
    }

    /// Messages-per-hour histogram for today, bucketed in the report
    /// timezone.
    pub fn hourly_activity(&self, group_id: i64) -> Result<[i64; 24]> {
        let conn = self.pool.get()?;
        let day_start = self.clock.day_start(self.clock.now());
        let mut buckets = [0i64; 24];
        for ts in MessageRepo::timestamps_since(&conn, group_id, day_start)? {
            buckets[self.clock.hour_of(ts) as usize % 24] += 1;
        }
        Ok(buckets)
    }

    /// Most-recalled authors over an `days`-day window ending today.
    pub fn recall_ranking(&self, group_id: i64, days: u32, limit: u32) -> Result<Vec<RankEntry>> {
        let conn = self.pool.get()?;
        let since = self.clock.window_start(self.clock.now(), days);
        RecallRepo::ranking(&conn, group_id, since, limit)
    }

    /// Cached display names for a batch of users.
    pub fn display_names(&self, user_ids: &[i64]) -> Result<HashMap<i64, String>> {
        let conn = self.pool.get()?;
        UserRepo::names(&conn, user_ids)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::migrations::run_migrations;
    use crate::pool::new_in_memory;
    use vigil_protocol::MessageKind;

    fn store() -> ArchiveStore {
        let pool = new_in_memory().unwrap();
        {
            let mut conn = pool.get().unwrap();
            run_migrations(&mut conn).unwrap();
        }
        ArchiveStore::new(pool, ReportClock::from_setting(Some("UTC")))
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
    fn record_message_reports_novelty() {
        let store = store();
        assert!(store.record_message(&msg(1, 10, 100)).unwrap());
        assert!(!store.record_message(&msg(1, 10, 100)).unwrap());
    }

    #[test]
    fn overview_reflects_writes() {
        let store = store();
        let now = store.clock().now();
        store.record_message(&msg(1, 10, now)).unwrap();
        store.record_message(&msg(2, 20, now)).unwrap();
        store.record_message(&msg(3, 10, 100)).unwrap(); // long ago

        let overview = store.group_overview(42).unwrap();
        assert_eq!(overview.total_messages, 3);
        assert_eq!(overview.today_messages, 2);
        assert_eq!(overview.distinct_users, 2);
        assert_eq!(overview.stored_images, 0);
    }

    #[test]
    fn today_ranking_excludes_older_days() {
        let store = store();
        let now = store.clock().now();
        store.record_message(&msg(1, 10, now)).unwrap();
        store.record_message(&msg(2, 20, 100)).unwrap();
        let ranking = store.today_ranking(42, 10).unwrap();
        assert_eq!(ranking, vec![RankEntry { user_id: 10, count: 1 }]);
    }

    #[test]
    fn hourly_activity_buckets_today() {
        let store = store();
        let now = store.clock().now();
        store.record_message(&msg(1, 10, now)).unwrap();
        store.record_message(&msg(2, 10, now)).unwrap();
        let buckets = store.hourly_activity(42).unwrap();
        assert_eq!(buckets.iter().sum::<i64>(), 2);
        assert_eq!(buckets[store.clock().hour_of(now) as usize], 2);
    }

    #[test]
    fn image_dedup_lookup_via_facade() {
        let store = store();
        store
            .record_image(&ImageRecord {
                file_id: "f1".to_string(),
                url: "https://img.example/f1".to_string(),
                local_path: Some("ab/abcd.jpg".to_string()),
                content_hash: "abcd".to_string(),
                size_bytes: Some(10),
                status: crate::repos::ImageStatus::Stored,
                first_seen_at: 100,
            })
            .unwrap();
        assert_eq!(
            store.image_path_by_hash("abcd").unwrap().as_deref(),
            Some("ab/abcd.jpg")
        );
        assert!(store.image_path_by_hash("ffff").unwrap().is_none());
    }

    #[test]
    fn recall_ranking_and_names() {
        let store = store();
        let now = store.clock().now();
        store.record_recall(42, 10, 99, Some(5), now).unwrap();
        store.record_user(10, "alice", now).unwrap();

        let ranking = store.recall_ranking(42, 7, 10).unwrap();
        assert_eq!(ranking, vec![RankEntry { user_id: 10, count: 1 }]);
        let names = store.display_names(&[10, 11]).unwrap();
        assert_eq!(names.get(&10).map(String::as_str), Some("alice"));
    }
}
