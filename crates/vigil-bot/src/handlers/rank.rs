//! `/rank` — today's most active speakers.

use async_trait::async_trait;
use vigil_commands::{Command, CommandContext, CommandError, CommandInfo, Reply};
use vigil_store::ArchiveStore;

use crate::handlers::render_ranking;

static INFO: CommandInfo = CommandInfo {
    name: "rank",
    aliases: &["排行"],
    description: "today's speaker ranking (optional count, default 10)",
    usage: "/rank [count]",
    category: "stats",
    admin_only: false,
};

const DEFAULT_LIMIT: u32 = 10;
const MAX_LIMIT: u32 = 50;

/// Today's speaker ranking.
pub struct RankCommand {
    store: ArchiveStore,
}

impl RankCommand {
    /// Read-only handle on the archive.
    pub fn new(store: ArchiveStore) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Command for RankCommand {
    fn info(&self) -> &CommandInfo {
        &INFO
    }

    async fn run(&self, ctx: CommandContext) -> Result<Reply, CommandError> {
        let limit = match ctx.args.split_whitespace().next() {
            None => DEFAULT_LIMIT,
            Some(word) => match word.parse::<u32>() {
                Ok(n) if (1..=MAX_LIMIT).contains(&n) => n,
                _ => {
                    return Err(CommandError::Usage(format!(
                        "count must be 1..={MAX_LIMIT} — usage: {}",
                        INFO.usage
                    )))
                }
            },
        };

        let ranking = self
            .store
            .today_ranking(ctx.group_id, limit)
            .map_err(anyhow::Error::from)?;
        if ranking.is_empty() {
            return Ok(Reply::Text("No messages today.".to_string()));
        }
        let body =
            render_ranking(&self.store, &ranking, "messages").map_err(anyhow::Error::from)?;
        Ok(Reply::Text(format!("Today's top speakers:\n{body}")))
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
