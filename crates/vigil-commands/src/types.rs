//! Command trait and the types that cross the handler boundary.

use async_trait::async_trait;
use vigil_protocol::MessageSegment;

/// Static description of a command, used for resolution and `/help`.
#[derive(Clone, Debug)]
pub struct CommandInfo {
    /// Primary name, matched case-insensitively after the prefix.
    pub name: &'static str,
    /// Alternate names resolving to the same handler.
    pub aliases: &'static [&'static str],
    /// One-line description shown by `/help`.
    pub description: &'static str,
    /// Usage line shown on argument errors.
    pub usage: &'static str,
    /// Help section the command is listed under.
    pub category: &'static str,
    /// Whether only group admins may run it. Enforced by the caller,
    /// which knows the sender's role.
    pub admin_only: bool,
}

/// What a triggering message looked like, from the handler's view.
#[derive(Clone, Debug)]
pub struct CommandContext {
    /// Group the command was issued in.
    pub group_id: i64,
    /// Issuing user.
    pub user_id: i64,
    /// Relay id of the triggering message.
    pub message_id: i64,
    /// Everything after the command word, untrimmed of interior space.
    pub args: String,
    /// Full segment list of the triggering message.
    pub segments: Vec<MessageSegment>,
}

/// What a handler sends back to the group.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Reply {
    /// Plain text sent to the originating group.
    Text(String),
    /// Handled, nothing to say.
    Silent,
}

/// A handler failure.
#[derive(Debug, thiserror::Error)]
pub enum CommandError {
    /// The arguments did not parse; the usage line is reported back.
    #[error("bad arguments: {0}")]
    Usage(String),
    /// The handler itself failed (storage, formatting, ...).
    #[error(transparent)]
    Failed(#[from] anyhow::Error),
}

/// A group chat command.
#[async_trait]
pub trait Command: Send + Sync {
    /// Static metadata for resolution and help.
    fn info(&self) -> &CommandInfo;

    /// Execute against the triggering message.
    async fn run(&self, ctx: CommandContext) -> Result<Reply, CommandError>;
}
