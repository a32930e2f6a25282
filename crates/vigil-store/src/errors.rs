//! Store error types.

/// Errors raised by the storage layer.
///
/// All of these are recoverable at the call site: a failed write is logged
/// and that one record abandoned; the ingestion loop keeps running.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// A SQLite statement failed.
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// The pool could not hand out a connection.
    #[error("connection pool error: {0}")]
    Pool(#[from] r2d2::Error),

    /// Filesystem preparation (e.g. the database directory) failed.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience result alias for this crate.
pub type Result<T> = std::result::Result<T, StoreError>;
