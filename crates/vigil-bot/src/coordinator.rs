//! Per-event fan-out.
//!
//! `on_event` runs on the frame-pump path, so it never awaits: everything
//! that touches storage or the network is spawned as a supervised
//! background task. A task failure is logged and counted at the task
//! boundary; it cannot take down the pump.

use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

use vigil_assets::{content_store, AssetFetcher};
use vigil_commands::{CommandContext, CommandRegistry, Reply};
use vigil_protocol::{Event, GroupMessage, ImageRef};
use vigil_store::{ArchiveStore, FileRecord, ImageRecord, ImageStatus, NewMessage};

use crate::outbound::OutboundSender;

/// How much of a failing command's error is shown to the group.
const NOTICE_LIMIT: usize = 120;

/// Spawn a background task whose failure is logged, never propagated.
fn spawn_supervised<F>(task: &'static str, fut: F)
where
    F: std::future::Future<Output = anyhow::Result<()>> + Send + 'static,
{
    drop(tokio::spawn(async move {
        if let Err(error) = fut.await {
            metrics::counter!("vigil_task_failures_total", "task" => task).increment(1);
            tracing::error!(task, error = format!("{error:#}"), "background task failed");
        }
    }));
}

/// The file reference QQ-style relays hand out is usually the content
/// digest plus an extension; when it parses as 32 hex chars we can check
/// the archive before downloading at all.
fn digest_hint(file: &str) -> Option<String> {
    let stem = file.split('.').next().unwrap_or("");
    if stem.len() == 32 && stem.chars().all(|c| c.is_ascii_hexdigit()) {
        Some(stem.to_lowercase())
    } else {
        None
    }
}

/// Orchestrates persistence, asset fetches and command dispatch.
pub struct IngestionCoordinator {
    store: ArchiveStore,
    fetcher: Arc<AssetFetcher>,
    registry: Arc<CommandRegistry>,
    outbound: OutboundSender,
    /// Monitored groups; empty means all.
    groups: Vec<i64>,
    prefix: String,
    /// Our own account id, captured from the lifecycle connect event.
    self_id: AtomicI64,
}

impl IngestionCoordinator {
    /// Wire up the coordinator. All collaborators are owned handles; the
    /// coordinator itself holds no locks.
    pub fn new(
        store: ArchiveStore,
        fetcher: Arc<AssetFetcher>,
        registry: Arc<CommandRegistry>,
        outbound: OutboundSender,
        groups: Vec<i64>,
        prefix: String,
    ) -> Self {
        Self {
            store,
            fetcher,
            registry,
            outbound,
            groups,
            prefix,
            self_id: AtomicI64::new(0),
        }
    }

    /// Self account id reported by the relay, `None` until seen.
    pub fn self_id(&self) -> Option<i64> {
        match self.self_id.load(Ordering::Relaxed) {
            0 => None,
            id => Some(id),
        }
    }

    fn monitored(&self, group_id: i64) -> bool {
        self.groups.is_empty() || self.groups.contains(&group_id)
    }

    /// Dispatch one classified event. Never blocks.
    pub fn on_event(&self, event: Event) {
        match event {
            Event::Group(msg) => self.on_group_message(msg),
            Event::Private(msg) => {
                tracing::debug!(user_id = msg.user_id, "ignoring private message");
            }
            Event::FileUpload(notice) => {
                if !self.monitored(notice.group_id) {
                    return;
                }
                let store = self.store.clone();
                spawn_supervised("record-file", async move {
                    store.record_file(&FileRecord {
                        file_id: notice.file.id,
                        group_id: notice.group_id,
                        uploader_id: notice.user_id,
                        file_name: notice.file.name,
                        size_bytes: notice.file.size,
                        busid: notice.file.busid,
                        uploaded_at: notice.time,
                    })?;
                    Ok(())
                });
            }
            Event::Recall(notice) => {
                if !self.monitored(notice.group_id) {
                    return;
                }
                let store = self.store.clone();
                spawn_supervised("record-recall", async move {
                    store.record_recall(
                        notice.group_id,
                        notice.user_id,
                        notice.operator_id,
                        notice.message_id,
                        notice.time,
                    )?;
                    Ok(())
                });
            }
            Event::MemberChange(change) => {
                if self.monitored(change.group_id) {
                    tracing::info!(
                        group_id = change.group_id,
                        user_id = change.user_id,
                        joined = change.joined,
                        "group membership changed"
                    );
                }
            }
            Event::Lifecycle { sub_type, self_id } => {
                if sub_type == "connect" {
                    self.self_id.store(self_id, Ordering::Relaxed);
                    tracing::info!(self_id, "relay session established");
                }
            }
            Event::Heartbeat { time } => {
                tracing::trace!(time, "relay heartbeat");
            }
            Event::Unknown { raw } => {
                metrics::counter!("vigil_unknown_events_total").increment(1);
                tracing::debug!(frame = %raw, "unclassified frame");
            }
        }
    }

    fn on_group_message(&self, msg: GroupMessage) {
        if !self.monitored(msg.group_id) {
            return;
        }

        let display_name = msg.sender.display_name(msg.user_id);
        let record = NewMessage {
            message_id: msg.message_id,
            group_id: msg.group_id,
            user_id: msg.user_id,
            kind: vigil_protocol::MessageKind::of(&msg.segments),
            content: serde_json::Value::Array(
                msg.segments.iter().map(vigil_protocol::MessageSegment::to_value).collect(),
            )
            .to_string(),
            created_at: msg.time,
        };
        let store = self.store.clone();
        spawn_supervised("archive-message", async move {
            let new = store.record_message(&record)?;
            if !new {
                tracing::debug!(message_id = record.message_id, "duplicate message dropped");
            }
            store.record_user(record.user_id, &display_name, record.created_at)?;
            Ok(())
        });

        for image in msg.images() {
            self.schedule_fetch(image, msg.time);
        }

        let text = msg.plain_text();
        if text.trim_start().starts_with(&self.prefix) {
            self.dispatch_command(&text, &msg);
        }
    }

    fn schedule_fetch(&self, image: ImageRef, seen_at: i64) {
        let Some(url) = image.url else {
            tracing::debug!(file = %image.file, "image without url, skipping");
            return;
        };
        let store = self.store.clone();
        let fetcher = Arc::clone(&self.fetcher);
        spawn_supervised("fetch-image", async move {
            let hint = digest_hint(&image.file);
            // The row starts Pending and is upgraded once the bytes are on
            // disk. Dedup lookups require Stored plus a path, so a Pending
            // row never blocks a later retry.
            store.record_image(&ImageRecord {
                file_id: image.file.clone(),
                url: url.clone(),
                local_path: None,
                content_hash: hint.clone().unwrap_or_default(),
                size_bytes: None,
                status: ImageStatus::Pending,
                first_seen_at: seen_at,
            })?;

            // Dedup short-circuit: a relay hint naming a digest we already
            // hold means no download at all.
            if let Some(hint) = hint {
                if let Some(path) = store.image_path_by_hash(&hint)? {
                    store.record_image(&ImageRecord {
                        file_id: image.file,
                        url,
                        local_path: Some(path),
                        content_hash: hint,
                        size_bytes: None,
                        status: ImageStatus::Stored,
                        first_seen_at: seen_at,
                    })?;
                    return Ok(());
                }
            }

            let extension = content_store::guess_extension(&image.file);
            match fetcher.fetch(&url, extension).await {
                Ok(fetched) => {
                    store.record_image(&ImageRecord {
                        file_id: image.file,
                        url,
                        local_path: Some(fetched.relative_path),
                        content_hash: fetched.digest,
                        size_bytes: Some(fetched.size as i64),
                        status: ImageStatus::Stored,
                        first_seen_at: seen_at,
                    })?;
                }
                Err(error) => {
                    // The row stays Pending; a later message with the same
                    // content retries independently.
                    tracing::error!(file = %image.file, error = %error, "image fetch failed");
                }
            }
            Ok(())
        });
    }

    fn dispatch_command(&self, text: &str, msg: &GroupMessage) {
        let Some((command, args)) = self.registry.resolve(text, &self.prefix) else {
            // Unknown commands are ignored: ordinary chat text may start
            // with the prefix by accident.
            return;
        };
        let ctx = CommandContext {
            group_id: msg.group_id,
            user_id: msg.user_id,
            message_id: msg.message_id,
            args,
            segments: msg.segments.clone(),
        };
        let name = command.info().name;
        let outbound = self.outbound.clone();
        let group_id = msg.group_id;
        spawn_supervised("run-command", async move {
            match command.run(ctx).await {
                Ok(Reply::Text(reply)) => {
                    outbound.send_group_text(group_id, reply).await?;
                }
                Ok(Reply::Silent) => {}
                Err(error) => {
                    tracing::error!(command = name, error = %error, "command failed");
                    let notice: String = format!("Command failed: {error}")
                        .chars()
                        .take(NOTICE_LIMIT)
                        .collect();
                    outbound.send_group_text(group_id, notice).await?;
                }
            }
            Ok(())
        });
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use async_trait::async_trait;
    use tokio::sync::mpsc;
    use vigil_assets::{ContentStore, FetcherConfig, PassThrough, RateLimiter};
    use vigil_commands::{Command, CommandError, CommandInfo};
    use vigil_protocol::classify;
    use vigil_store::{new_in_memory, run_migrations, ReportClock};

    struct StatCommand;

    #[async_trait]
    impl Command for StatCommand {
        fn info(&self) -> &CommandInfo {
            static INFO: CommandInfo = CommandInfo {
                name: "stat",
                aliases: &[],
                description: "test stat",
                usage: "/stat",
                category: "stats",
                admin_only: false,
            };
            &INFO
        }

        async fn run(&self, ctx: CommandContext) -> Result<Reply, CommandError> {
            Ok(Reply::Text(format!("args=[{}]", ctx.args)))
        }
    }

    struct FailingCommand;

    #[async_trait]
    impl Command for FailingCommand {
        fn info(&self) -> &CommandInfo {
            static INFO: CommandInfo = CommandInfo {
                name: "boom",
                aliases: &[],
                description: "always fails",
                usage: "/boom",
                category: "stats",
                admin_only: false,
            };
            &INFO
        }

        async fn run(&self, _ctx: CommandContext) -> Result<Reply, CommandError> {
            Err(CommandError::Failed(anyhow::anyhow!("db is on fire")))
        }
    }

    fn coordinator(
        groups: Vec<i64>,
    ) -> (IngestionCoordinator, ArchiveStore, mpsc::Receiver<String>) {
        coordinator_with(groups, FetcherConfig::default())
    }

    fn coordinator_with(
        groups: Vec<i64>,
        fetcher_config: FetcherConfig,
    ) -> (IngestionCoordinator, ArchiveStore, mpsc::Receiver<String>) {
        let pool = new_in_memory().unwrap();
        {
            let mut conn = pool.get().unwrap();
            run_migrations(&mut conn).unwrap();
        }
        let store = ArchiveStore::new(pool, ReportClock::from_setting(Some("UTC")));

        let dir = tempfile::tempdir().unwrap();
        let fetcher = Arc::new(
            AssetFetcher::new(
                fetcher_config,
                ContentStore::open(dir.path()).unwrap(),
                Arc::new(PassThrough),
            )
            .unwrap(),
        );

        let mut registry = CommandRegistry::new();
        registry.register(Arc::new(StatCommand));
        registry.register(Arc::new(FailingCommand));

        let (tx, rx) = mpsc::channel(16);
        let outbound = OutboundSender::new(
            Arc::new(RateLimiter::new(100, Duration::from_secs(1))),
            tx,
        );
        let coordinator = IngestionCoordinator::new(
            store.clone(),
            fetcher,
            Arc::new(registry),
            outbound,
            groups,
            "/".to_string(),
        );
        (coordinator, store, rx)
    }

    async fn wait_until(mut cond: impl FnMut() -> bool) {
        for _ in 0..200 {
            if cond() {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("condition not reached within 2s");
    }

    fn example_frame() -> serde_json::Value {
        serde_json::json!({
            "post_type": "message",
            "message_type": "group",
            "group_id": 1,
            "user_id": 2,
            "message_id": 100,
            "message": [{"type": "text", "data": {"text": "/stat"}}],
            "time": 1_700_000_000i64
        })
    }

    #[tokio::test]
    async fn example_frame_archives_and_dispatches() {
        let (coordinator, store, mut rx) = coordinator(vec![1]);
        coordinator.on_event(classify(&example_frame()));

        wait_until(|| store.group_overview(1).unwrap().total_messages == 1).await;
        let frame = rx.recv().await.unwrap();
        let value: serde_json::Value = serde_json::from_str(&frame).unwrap();
        assert_eq!(value["action"], "send_group_msg");
        assert_eq!(value["params"]["group_id"], 1);
        // The handler saw empty args.
        assert!(value["params"]["message"].to_string().contains("args=[]"));
    }

    #[tokio::test]
    async fn duplicate_delivery_is_idempotent() {
        let (coordinator, store, _rx) = coordinator(vec![1]);
        coordinator.on_event(classify(&example_frame()));
        coordinator.on_event(classify(&example_frame()));
        wait_until(|| store.group_overview(1).unwrap().total_messages == 1).await;
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(store.group_overview(1).unwrap().total_messages, 1);
    }

    #[tokio::test]
    async fn unmonitored_group_is_ignored() {
        let (coordinator, store, mut rx) = coordinator(vec![99]);
        coordinator.on_event(classify(&example_frame()));
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(store.group_overview(1).unwrap().total_messages, 0);
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn empty_allow_list_means_all_groups() {
        let (coordinator, store, _rx) = coordinator(Vec::new());
        coordinator.on_event(classify(&example_frame()));
        wait_until(|| store.group_overview(1).unwrap().total_messages == 1).await;
    }

    #[tokio::test]
    async fn handler_failure_is_reported_not_propagated() {
        let (coordinator, _store, mut rx) = coordinator(vec![1]);
        let mut frame = example_frame();
        frame["message"] = serde_json::json!([{"type": "text", "data": {"text": "/boom"}}]);
        coordinator.on_event(classify(&frame));

        let reply = rx.recv().await.unwrap();
        let value: serde_json::Value = serde_json::from_str(&reply).unwrap();
        let text = value["params"]["message"].to_string();
        assert!(text.contains("Command failed"));
        assert!(text.contains("db is on fire"));
    }

    #[tokio::test]
    async fn unknown_command_is_silent() {
        let (coordinator, store, mut rx) = coordinator(vec![1]);
        let mut frame = example_frame();
        frame["message"] = serde_json::json!([{"type": "text", "data": {"text": "/nope"}}]);
        coordinator.on_event(classify(&frame));
        wait_until(|| store.group_overview(1).unwrap().total_messages == 1).await;
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn recall_and_file_upload_are_recorded() {
        let (coordinator, store, _rx) = coordinator(vec![1]);
        coordinator.on_event(classify(&serde_json::json!({
            "post_type": "notice",
            "notice_type": "group_recall",
            "group_id": 1,
            "user_id": 2,
            "operator_id": 3,
            "message_id": 100,
            "time": 1_700_000_000i64
        })));
        coordinator.on_event(classify(&serde_json::json!({
            "post_type": "notice",
            "notice_type": "group_upload",
            "group_id": 1,
            "user_id": 2,
            "file": {"id": "file-1", "name": "notes.pdf", "size": 2048, "busid": 102},
            "time": 1_700_000_000i64
        })));

        wait_until(|| !store.recall_ranking(1, 3650, 10).unwrap().is_empty()).await;
        wait_until(|| {
            let conn = store.pool().get().unwrap();
            let files: i64 = conn
                .query_row("SELECT count(*) FROM assets_files", [], |row| row.get(0))
                .unwrap();
            files == 1
        })
        .await;
    }

    #[tokio::test]
    async fn failed_fetch_leaves_the_image_row_pending() {
        let (coordinator, store, _rx) = coordinator_with(
            vec![1],
            FetcherConfig {
                max_attempts: 1,
                base_delay: Duration::from_millis(10),
                connect_timeout: Duration::from_secs(1),
                total_timeout: Duration::from_secs(1),
                ..FetcherConfig::default()
            },
        );
        let mut frame = example_frame();
        // Port 9 (discard) refuses the connection immediately.
        frame["message"] = serde_json::json!([{
            "type": "image",
            "data": {
                "file": "abcdef0123456789abcdef0123456789.jpg",
                "url": "http://127.0.0.1:9/img"
            }
        }]);
        coordinator.on_event(classify(&frame));

        wait_until(|| {
            let conn = store.pool().get().unwrap();
            conn.query_row("SELECT count(*) FROM assets_images", [], |row| row.get(0))
                .map(|n: i64| n == 1)
                .unwrap()
        })
        .await;
        tokio::time::sleep(Duration::from_millis(100)).await;

        let conn = store.pool().get().unwrap();
        let (status, path): (i64, Option<String>) = conn
            .query_row(
                "SELECT status, local_path FROM assets_images",
                [],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .unwrap();
        assert_eq!(status, 0);
        assert_eq!(path, None);
        // A Pending row never satisfies the dedup lookup.
        assert!(store
            .image_path_by_hash("abcdef0123456789abcdef0123456789")
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn lifecycle_connect_captures_self_id() {
        let (coordinator, _store, _rx) = coordinator(vec![1]);
        assert_eq!(coordinator.self_id(), None);
        coordinator.on_event(classify(&serde_json::json!({
            "post_type": "meta_event",
            "meta_event_type": "lifecycle",
            "sub_type": "connect",
            "self_id": 12345,
            "time": 1_700_000_000i64
        })));
        assert_eq!(coordinator.self_id(), Some(12345));
    }

    #[test]
    fn digest_hints() {
        assert_eq!(
            digest_hint("ABCDEF0123456789ABCDEF0123456789.jpg").as_deref(),
            Some("abcdef0123456789abcdef0123456789")
        );
        assert_eq!(digest_hint("photo.jpg"), None);
        assert_eq!(digest_hint("zzzzzz0123456789abcdef0123456789.jpg"), None);
    }
}
