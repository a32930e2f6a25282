//! Optional size reduction before bytes hit the content store.
//!
//! The fetcher consults a [`Recompressor`] after each successful download.
//! The default implementation keeps bytes untouched; a deployment can plug
//! in a real image codec without the fetcher caring. Whatever the
//! implementation returns, the fetcher never stores a result larger than
//! the original.

/// A hook that may produce a smaller encoding of the same image.
pub trait Recompressor: Send + Sync {
    /// Return a smaller encoding of `bytes`, or `None` to keep the
    /// original. `extension` is the normalized store extension.
    fn recompress(&self, bytes: &[u8], extension: &str) -> Option<Vec<u8>>;
}

/// Stores every image exactly as fetched.
#[derive(Clone, Copy, Debug, Default)]
pub struct PassThrough;

impl Recompressor for PassThrough {
    fn recompress(&self, _bytes: &[u8], _extension: &str) -> Option<Vec<u8>> {
        None
    }
}
