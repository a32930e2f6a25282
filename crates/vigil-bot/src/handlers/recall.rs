//! `/recall` — who gets their messages recalled the most.

use async_trait::async_trait;
use vigil_commands::{Command, CommandContext, CommandError, CommandInfo, Reply};
use vigil_store::ArchiveStore;

use crate::handlers::render_ranking;

static INFO: CommandInfo = CommandInfo {
    name: "recall",
    aliases: &["撤回"],
    description: "7-day recall ranking",
    usage: "/recall",
    category: "stats",
    admin_only: false,
};

const WINDOW_DAYS: u32 = 7;
const LIMIT: u32 = 10;

/// Recall ranking report.
pub struct RecallCommand {
    store: ArchiveStore,
}

impl RecallCommand {
    /// Read-only handle on the archive.
    pub fn new(store: ArchiveStore) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Command for RecallCommand {
    fn info(&self) -> &CommandInfo {
        &INFO
    }

    async fn run(&self, ctx: CommandContext) -> Result<Reply, CommandError> {
        let ranking = self
            .store
            .recall_ranking(ctx.group_id, WINDOW_DAYS, LIMIT)
            .map_err(anyhow::Error::from)?;
        if ranking.is_empty() {
            return Ok(Reply::Text(format!(
                "No recalls in the last {WINDOW_DAYS} days."
            )));
        }
        let body =
            render_ranking(&self.store, &ranking, "recalls").map_err(anyhow::Error::from)?;
        Ok(Reply::Text(format!(
            "Most recalled (last {WINDOW_DAYS} days):\n{body}"
        )))
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
