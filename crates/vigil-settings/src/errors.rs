//! Settings error types.

/// Errors raised while loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    /// The config file could not be read.
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    /// The config file is not valid JSON.
    #[error("failed to parse config file: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Convenience result alias for this crate.
pub type Result<T> = std::result::Result<T, SettingsError>;
