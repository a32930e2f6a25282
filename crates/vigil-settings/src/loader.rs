//! Settings loading: defaults → JSON file deep-merge → env overrides.

use std::path::Path;

use serde_json::Value;

use crate::errors::Result;
use crate::types::VigilSettings;

/// Deep-merge `overlay` onto `base`.
///
/// Objects merge recursively; any other value type in the overlay replaces
/// the base value wholesale (arrays included — the group allow-list is
/// replaced, not appended to).
pub fn deep_merge(base: Value, overlay: Value) -> Value {
    match (base, overlay) {
        (Value::Object(mut base), Value::Object(overlay)) => {
            for (key, value) in overlay {
                let merged = match base.remove(&key) {
                    Some(existing) => deep_merge(existing, value),
                    None => value,
                };
                let _ = base.insert(key, merged);
            }
            Value::Object(base)
        }
        (_, overlay) => overlay,
    }
}

/// Load settings from a JSON file, merged over defaults, with `VIGIL_*`
/// env overrides applied last. A missing file is not an error — defaults
/// plus env apply.
pub fn load_settings(path: &Path) -> Result<VigilSettings> {
    if path.exists() {
        load_settings_from_path(path)
    } else {
        tracing::debug!(?path, "no config file, using defaults");
        let mut settings = apply_env_overrides(VigilSettings::default());
        settings.validate();
        Ok(settings)
    }
}

/// Load settings from a specific file path. The file must exist and parse.
pub fn load_settings_from_path(path: &Path) -> Result<VigilSettings> {
    let raw = std::fs::read_to_string(path)?;
    let file_value: Value = serde_json::from_str(&raw)?;
    let defaults = serde_json::to_value(VigilSettings::default())?;
    let merged = deep_merge(defaults, file_value);
    let settings: VigilSettings = serde_json::from_value(merged)?;
    let mut settings = apply_env_overrides(settings);
    settings.validate();
    Ok(settings)
}

/// Apply `VIGIL_*` environment variable overrides.
fn apply_env_overrides(mut settings: VigilSettings) -> VigilSettings {
    if let Ok(host) = std::env::var("VIGIL_RELAY_HOST") {
        settings.relay.host = host;
    }
    if let Ok(port) = std::env::var("VIGIL_RELAY_PORT") {
        match port.parse() {
            Ok(port) => settings.relay.port = port,
            Err(_) => tracing::warn!(value = %port, "VIGIL_RELAY_PORT is not a port, ignored"),
        }
    }
    if let Ok(token) = std::env::var("VIGIL_ACCESS_TOKEN") {
        settings.relay.access_token = token;
    }
    if let Ok(db_path) = std::env::var("VIGIL_DB_PATH") {
        settings.storage.db_path = db_path;
    }
    if let Ok(image_dir) = std::env::var("VIGIL_IMAGE_DIR") {
        settings.storage.image_dir = image_dir;
    }
    if let Ok(level) = std::env::var("VIGIL_LOG_LEVEL") {
        settings.logging.level = level;
    }
    settings
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
