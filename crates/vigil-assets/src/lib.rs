//! # vigil-assets
//!
//! Attachment handling for the Vigil bot:
//!
//! - [`content_store::ContentStore`] — digest-named, shard-directoried
//!   on-disk image store
//! - [`fetcher::AssetFetcher`] — HTTP downloads with bounded concurrency
//!   and linear-backoff retries
//! - [`rate_limit::RateLimiter`] — sliding-window throttle for outbound
//!   relay calls
//! - [`recompress`] — optional size-reduction hook applied before bytes
//!   hit the store

pub mod content_store;
pub mod errors;
pub mod fetcher;
pub mod rate_limit;
pub mod recompress;

pub use content_store::{content_digest, guess_extension, ContentStore};
pub use errors::FetchError;
pub use fetcher::{AssetFetcher, Fetched, FetcherConfig};
pub use rate_limit::RateLimiter;
pub use recompress::{PassThrough, Recompressor};
