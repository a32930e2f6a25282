//! Command registration and resolution.

use std::collections::HashMap;
use std::sync::Arc;

use crate::types::{Command, CommandInfo};

/// Maps command words (and aliases) to handlers.
#[derive(Default)]
pub struct CommandRegistry {
    by_name: HashMap<String, Arc<dyn Command>>,
    by_alias: HashMap<String, Arc<dyn Command>>,
}

impl CommandRegistry {
    /// Empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler under its primary name and all aliases,
    /// lowercased. Re-registering a name replaces the previous handler
    /// with a warning.
    pub fn register(&mut self, command: Arc<dyn Command>) {
        let info = command.info();
        let name = info.name.to_lowercase();
        if self
            .by_name
            .insert(name.clone(), Arc::clone(&command))
            .is_some()
        {
            tracing::warn!(command = %name, "command re-registered, replacing");
        }
        for alias in info.aliases {
            let alias = alias.to_lowercase();
            if self
                .by_alias
                .insert(alias.clone(), Arc::clone(&command))
                .is_some()
            {
                tracing::warn!(alias = %alias, "alias re-registered, replacing");
            }
        }
    }

    /// Resolve a message's plain text against `prefix`.
    ///
    /// Returns the handler and the argument remainder (leading whitespace
    /// stripped), or `None` when the text is not a command or names an
    /// unknown one. The command word is the text up to the first
    /// whitespace, matched case-insensitively.
    pub fn resolve(&self, text: &str, prefix: &str) -> Option<(Arc<dyn Command>, String)> {
        let text = text.trim_start();
        let rest = text.strip_prefix(prefix)?;
        let mut parts = rest.splitn(2, char::is_whitespace);
        let word = parts.next()?.to_lowercase();
        if word.is_empty() {
            return None;
        }
        let args = parts.next().unwrap_or("").trim_start().to_string();
        let command = self
            .by_name
            .get(&word)
            .or_else(|| self.by_alias.get(&word))?;
        Some((Arc::clone(command), args))
    }

    /// Registered handlers, sorted by category then primary name. Each
    /// handler appears once regardless of alias count.
    pub fn commands(&self) -> Vec<&CommandInfo> {
        let mut infos: Vec<&CommandInfo> = self.by_name.values().map(|c| c.info()).collect();
        infos.sort_by_key(|info| (info.category, info.name));
        infos
    }

    /// Render the `/help` text: category headers with one line per
    /// command, deterministic order.
    pub fn help_text(&self, prefix: &str) -> String {
        let mut out = String::new();
        let mut current_category = "";
        for info in self.commands() {
            if info.category != current_category {
                if !out.is_empty() {
                    out.push('\n');
                }
                out.push_str(&format!("[{}]\n", info.category));
                current_category = info.category;
            }
            out.push_str(&format!("{prefix}{} — {}\n", info.name, info.description));
        }
        out.trim_end().to_string()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
