//! Built-in stats commands.
//!
//! Every handler reads through [`ArchiveStore`]'s query interface and
//! replies with plain text; the coordinator takes care of sending the
//! reply through the rate-limited outbound path.

mod active;
mod help;
mod info;
mod rank;
mod recall;

use std::sync::Arc;

use vigil_commands::CommandRegistry;
use vigil_store::ArchiveStore;

pub use active::ActiveCommand;
pub use help::HelpCommand;
pub use info::InfoCommand;
pub use rank::RankCommand;
pub use recall::RecallCommand;

/// Register the built-in handlers and pre-render the help text.
pub fn build_registry(store: &ArchiveStore, prefix: &str) -> CommandRegistry {
    let mut registry = CommandRegistry::new();
    let help = Arc::new(HelpCommand::new());
    registry.register(Arc::clone(&help) as Arc<dyn vigil_commands::Command>);
    registry.register(Arc::new(InfoCommand::new(store.clone())));
    registry.register(Arc::new(RankCommand::new(store.clone())));
    registry.register(Arc::new(ActiveCommand::new(store.clone())));
    registry.register(Arc::new(RecallCommand::new(store.clone())));
    // The registry is complete; the help text can now be frozen.
    help.set_text(registry.help_text(prefix));
    registry
}

/// Render a `user_id -> count` ranking as numbered lines, preferring
/// cached display names.
fn render_ranking(
    store: &ArchiveStore,
    entries: &[vigil_store::RankEntry],
    unit: &str,
) -> Result<String, vigil_store::StoreError> {
    let ids: Vec<i64> = entries.iter().map(|e| e.user_id).collect();
    let names = store.display_names(&ids)?;
    let mut out = String::new();
    for (position, entry) in entries.iter().enumerate() {
        let name = names
            .get(&entry.user_id)
            .cloned()
            .unwrap_or_else(|| entry.user_id.to_string());
        out.push_str(&format!(
            "{}. {name} — {} {unit}\n",
            position + 1,
            entry.count
        ));
    }
    Ok(out.trim_end().to_string())
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
pub(crate) mod test_support {
    use vigil_store::{new_in_memory, run_migrations, ArchiveStore, ReportClock};

    pub fn store() -> ArchiveStore {
        let pool = new_in_memory().unwrap();
        {
            let mut conn = pool.get().unwrap();
            run_migrations(&mut conn).unwrap();
        }
        ArchiveStore::new(pool, ReportClock::from_setting(Some("UTC")))
    }

    pub fn ctx(group_id: i64, args: &str) -> vigil_commands::CommandContext {
        vigil_commands::CommandContext {
            group_id,
            user_id: 10,
            message_id: 1,
            args: args.to_string(),
            segments: Vec::new(),
        }
    }
}
