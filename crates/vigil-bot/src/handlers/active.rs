//! `/active` — today's hour-by-hour activity histogram.

use async_trait::async_trait;
use vigil_commands::{Command, CommandContext, CommandError, CommandInfo, Reply};
use vigil_store::ArchiveStore;

static INFO: CommandInfo = CommandInfo {
    name: "active",
    aliases: &["活跃"],
    description: "today's hourly activity",
    usage: "/active",
    category: "stats",
    admin_only: false,
};

const BAR_WIDTH: u64 = 20;

/// Hourly activity report.
pub struct ActiveCommand {
    store: ArchiveStore,
}

impl ActiveCommand {
    /// Read-only handle on the archive.
    pub fn new(store: ArchiveStore) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Command for ActiveCommand {
    fn info(&self) -> &CommandInfo {
        &INFO
    }

    async fn run(&self, ctx: CommandContext) -> Result<Reply, CommandError> {
        let buckets = self
            .store
            .hourly_activity(ctx.group_id)
            .map_err(anyhow::Error::from)?;
        let max = buckets.iter().copied().max().unwrap_or(0);
        if max == 0 {
            return Ok(Reply::Text("No messages today.".to_string()));
        }

        let mut out = String::from("Today's activity by hour:\n");
        for (hour, &count) in buckets.iter().enumerate() {
            if count == 0 {
                continue;
            }
            // Bucket counts are non-negative, so the bar math runs in u64.
            let width = (count as u64 * BAR_WIDTH).div_ceil(max as u64).max(1);
            out.push_str(&format!(
                "{hour:02}:00 {} {count}\n",
                "#".repeat(width as usize)
            ));
        }
        Ok(Reply::Text(out.trim_end().to_string()))
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handlers::test_support;
    use vigil_protocol::MessageKind;
    use vigil_store::NewMessage;

    #[tokio::test]
    async fn histogram_lists_only_active_hours() {
        let store = test_support::store();
        let now = store.clock().now();
        for message_id in 1..=3 {
            store
                .record_message(&NewMessage {
                    message_id,
                    group_id: 42,
                    user_id: 10,
                    kind: MessageKind::Text,
                    content: "[]".to_string(),
                    created_at: now,
                })
                .unwrap();
        }

        let reply = ActiveCommand::new(store.clone())
            .run(test_support::ctx(42, ""))
            .await
            .unwrap();
        let Reply::Text(text) = reply else {
            panic!("expected text");
        };
        let hour = store.clock().hour_of(now);
        assert!(text.contains(&format!("{hour:02}:00")));
        assert!(text.contains(" 3"));
        // Exactly one histogram line plus the header.
        assert_eq!(text.lines().count(), 2);
    }

    #[tokio::test]
    async fn bar_width_rounds_up_for_small_counts() {
        let store = test_support::store();
        let day_start = store.clock().day_start(store.clock().now());
        // One message in the 01:00 bucket, three in the 02:00 bucket.
        let mut message_id = 0;
        for (hour, count) in [(1i64, 1), (2, 3)] {
            for _ in 0..count {
                message_id += 1;
                store
                    .record_message(&NewMessage {
                        message_id,
                        group_id: 42,
                        user_id: 10,
                        kind: MessageKind::Text,
                        content: "[]".to_string(),
                        created_at: day_start + hour * 3600 + 5,
                    })
                    .unwrap();
            }
        }

        let reply = ActiveCommand::new(store)
            .run(test_support::ctx(42, ""))
            .await
            .unwrap();
        let Reply::Text(text) = reply else {
            panic!("expected text");
        };
        let bar_len = |prefix: &str| {
            text.lines()
                .find(|line| line.starts_with(prefix))
                .unwrap_or_else(|| panic!("missing line for {prefix}"))
                .chars()
                .filter(|&c| c == '#')
                .count()
        };
        // ceil(1 * 20 / 3) = 7; the busiest hour fills the full bar.
        assert_eq!(bar_len("01:00"), 7);
        assert_eq!(bar_len("02:00"), 20);
    }

    #[tokio::test]
    async fn quiet_day_has_a_friendly_reply() {
        let reply = ActiveCommand::new(test_support::store())
            .run(test_support::ctx(42, ""))
            .await
            .unwrap();
        assert_eq!(reply, Reply::Text("No messages today.".to_string()));
    }
}
