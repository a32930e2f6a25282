//! Fetch error types.

/// Why an asset download failed.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    /// Transport-level failure (connect, TLS, timeout, body read).
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The origin answered with a non-success status.
    #[error("unexpected status {0}")]
    Status(u16),

    /// Writing the fetched bytes to the content store failed.
    #[error("store write failed: {0}")]
    Io(#[from] std::io::Error),

    /// The fetcher is shutting down and no longer admits downloads.
    #[error("fetcher closed")]
    Closed,
}

impl FetchError {
    /// Whether another attempt could plausibly succeed. Transport errors
    /// and origin errors are retried; local disk errors are not.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Request(_) | Self::Status(_))
    }
}
