//! `/info` — headline numbers for the group.

use async_trait::async_trait;
use vigil_commands::{Command, CommandContext, CommandError, CommandInfo, Reply};
use vigil_store::ArchiveStore;

static INFO: CommandInfo = CommandInfo {
    name: "info",
    aliases: &["stat", "统计"],
    description: "group archive overview",
    usage: "/info",
    category: "stats",
    admin_only: false,
};

/// Group overview report.
pub struct InfoCommand {
    store: ArchiveStore,
}

impl InfoCommand {
    /// Read-only handle on the archive.
    pub fn new(store: ArchiveStore) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Command for InfoCommand {
    fn info(&self) -> &CommandInfo {
        &INFO
    }

    async fn run(&self, ctx: CommandContext) -> Result<Reply, CommandError> {
        let overview = self
            .store
            .group_overview(ctx.group_id)
            .map_err(anyhow::Error::from)?;
        Ok(Reply::Text(format!(
            "Group {} overview\n\
             Messages archived: {}\n\
             Messages today: {}\n\
             Speakers seen: {}\n\
             Images stored: {}",
            ctx.group_id,
            overview.total_messages,
            overview.today_messages,
            overview.distinct_users,
            overview.stored_images,
        )))
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
    async fn renders_overview() {
        let store = test_support::store();
        let now = store.clock().now();
        store
            .record_message(&NewMessage {
                message_id: 1,
                group_id: 42,
                user_id: 10,
                kind: MessageKind::Text,
                content: "[]".to_string(),
                created_at: now,
            })
            .unwrap();

        let reply = InfoCommand::new(store)
            .run(test_support::ctx(42, ""))
            .await
            .unwrap();
        let Reply::Text(text) = reply else {
            panic!("expected text");
        };
        assert!(text.contains("Group 42"));
        assert!(text.contains("Messages archived: 1"));
        assert!(text.contains("Messages today: 1"));
    }
}
