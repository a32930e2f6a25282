//! Settings type definitions.
//!
//! All types use `#[serde(rename_all = "camelCase", default)]` so a partial
//! JSON config file works — missing fields get their compiled default.

use serde::{Deserialize, Serialize};

/// Root settings type for the Vigil bot.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct VigilSettings {
    /// Settings schema version.
    pub version: String,
    /// Relay connection settings.
    pub relay: RelaySettings,
    /// Monitored group allow-list. Empty means all groups.
    pub groups: Vec<i64>,
    /// Attachment download settings.
    pub downloads: DownloadSettings,
    /// Outbound send rate limiting.
    pub outbound: OutboundSettings,
    /// Command front-end settings.
    pub commands: CommandSettings,
    /// Storage paths.
    pub storage: StorageSettings,
    /// Logging configuration.
    pub logging: LoggingSettings,
    /// IANA timezone for report day boundaries. Unset means host-local.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub report_timezone: Option<String>,
}

impl Default for VigilSettings {
    fn default() -> Self {
        Self {
            version: "0.1.0".to_string(),
            relay: RelaySettings::default(),
            groups: Vec::new(),
            downloads: DownloadSettings::default(),
            outbound: OutboundSettings::default(),
            commands: CommandSettings::default(),
            storage: StorageSettings::default(),
            logging: LoggingSettings::default(),
            report_timezone: None,
        }
    }
}

impl VigilSettings {
    /// Correct invalid values in place, warning instead of rejecting.
    pub fn validate(&mut self) {
        fn floor_u32(val: &mut u32, min: u32, name: &str) {
            if *val < min {
                tracing::warn!("{name} = {val} below minimum {min}, corrected");
                *val = min;
            }
        }
        floor_u32(&mut self.downloads.concurrency, 1, "downloads.concurrency");
        floor_u32(&mut self.downloads.max_attempts, 1, "downloads.maxAttempts");
        floor_u32(&mut self.outbound.max_calls, 1, "outbound.maxCalls");
        if self.outbound.period_secs == 0 {
            tracing::warn!("outbound.periodSecs = 0, corrected to 1");
            self.outbound.period_secs = 1;
        }
        if self.relay.heartbeat_timeout_secs == 0 {
            tracing::warn!("relay.heartbeatTimeoutSecs = 0, corrected to 1");
            self.relay.heartbeat_timeout_secs = 1;
        }
        if self.commands.prefix.is_empty() {
            tracing::warn!("commands.prefix empty, corrected to \"/\"");
            self.commands.prefix = "/".to_string();
        }
    }

    /// The relay WebSocket endpoint, without the access token.
    pub fn relay_url(&self) -> String {
        format!("ws://{}:{}", self.relay.host, self.relay.port)
    }
}

/// Relay connection settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RelaySettings {
    /// Relay host.
    pub host: String,
    /// Relay WebSocket port.
    pub port: u16,
    /// Access token, appended percent-encoded as a query parameter.
    pub access_token: String,
    /// Transport ping interval in seconds.
    pub heartbeat_interval_secs: u64,
    /// How long to wait for a pong before declaring the session dead.
    pub heartbeat_timeout_secs: u64,
    /// Delay before a reconnect attempt after losing the session.
    pub reconnect_delay_secs: u64,
}

impl Default for RelaySettings {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 3001,
            access_token: String::new(),
            heartbeat_interval_secs: 20,
            heartbeat_timeout_secs: 20,
            reconnect_delay_secs: 5,
        }
    }
}

/// Attachment download settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DownloadSettings {
    /// Maximum simultaneous in-flight downloads.
    pub concurrency: u32,
    /// Attempts per download before reporting failure.
    pub max_attempts: u32,
    /// Base retry delay; attempt N waits `N * baseDelayMs`.
    pub base_delay_ms: u64,
    /// HTTP connect timeout.
    pub connect_timeout_secs: u64,
    /// HTTP total request timeout.
    pub total_timeout_secs: u64,
}

impl Default for DownloadSettings {
    fn default() -> Self {
        Self {
            concurrency: 5,
            max_attempts: 3,
            base_delay_ms: 2000,
            connect_timeout_secs: 10,
            total_timeout_secs: 30,
        }
    }
}

/// Sliding-window rate limit for outbound sends.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct OutboundSettings {
    /// Maximum sends within any sliding window of `periodSecs`.
    pub max_calls: u32,
    /// Window length in seconds.
    pub period_secs: u64,
}

impl Default for OutboundSettings {
    fn default() -> Self {
        Self {
            max_calls: 5,
            period_secs: 10,
        }
    }
}

/// Command front-end settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CommandSettings {
    /// Text prefix that marks a message as a command.
    pub prefix: String,
}

impl Default for CommandSettings {
    fn default() -> Self {
        Self {
            prefix: "/".to_string(),
        }
    }
}

/// Storage paths.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StorageSettings {
    /// SQLite database file.
    pub db_path: String,
    /// Root directory of the content-addressed image store.
    pub image_dir: String,
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            db_path: "data/db/chat_log.sqlite".to_string(),
            image_dir: "data/images".to_string(),
        }
    }
}

/// Logging configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LoggingSettings {
    /// Tracing filter directive (e.g. `info`, `vigil=debug`).
    pub level: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
