//! `/help` — the pre-rendered command listing.

use std::sync::OnceLock;

use async_trait::async_trait;
use vigil_commands::{Command, CommandContext, CommandError, CommandInfo, Reply};

static INFO: CommandInfo = CommandInfo {
    name: "help",
    aliases: &["帮助"],
    description: "list available commands",
    usage: "/help",
    category: "general",
    admin_only: false,
};

/// Replies with the registry's help text, rendered once at startup after
/// all commands are registered.
pub struct HelpCommand {
    text: OnceLock<String>,
}

impl HelpCommand {
    /// Empty help; text is frozen by [`set_text`](Self::set_text).
    pub fn new() -> Self {
        Self {
            text: OnceLock::new(),
        }
    }

    /// Freeze the rendered help text. Later calls are ignored.
    pub fn set_text(&self, text: String) {
        let _ = self.text.set(text);
    }
}

impl Default for HelpCommand {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Command for HelpCommand {
    fn info(&self) -> &CommandInfo {
        &INFO
    }

    async fn run(&self, _ctx: CommandContext) -> Result<Reply, CommandError> {
        let text = self
            .text
            .get()
            .cloned()
            .unwrap_or_else(|| "No commands registered.".to_string());
        Ok(Reply::Text(text))
    }
}
