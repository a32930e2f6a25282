//! HTTP asset downloads.
//!
//! A semaphore caps in-flight downloads; each download retries transport
//! and origin failures with linear backoff (attempt N sleeps
//! `N * base_delay`), then gives up with the last error. Successful bytes
//! go through the recompression hook and into the content store.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Semaphore;

use crate::content_store::{content_digest, ContentStore};
use crate::errors::FetchError;
use crate::recompress::Recompressor;

/// Fetcher tuning, usually derived from the download settings.
#[derive(Clone, Copy, Debug)]
pub struct FetcherConfig {
    /// Maximum simultaneous in-flight downloads.
    pub concurrency: u32,
    /// Attempts per download.
    pub max_attempts: u32,
    /// Base retry delay; attempt N sleeps `N * base_delay`.
    pub base_delay: Duration,
    /// HTTP connect timeout.
    pub connect_timeout: Duration,
    /// HTTP total request timeout.
    pub total_timeout: Duration,
}

impl Default for FetcherConfig {
    fn default() -> Self {
        Self {
            concurrency: 5,
            max_attempts: 3,
            base_delay: Duration::from_secs(2),
            connect_timeout: Duration::from_secs(10),
            total_timeout: Duration::from_secs(30),
        }
    }
}

/// A successfully stored asset.
#[derive(Clone, Debug)]
pub struct Fetched {
    /// Store path relative to the store root, as persisted.
    pub relative_path: String,
    /// 32-hex-char content digest of the stored bytes.
    pub digest: String,
    /// Stored size in bytes.
    pub size: u64,
    /// Whether the bytes were already in the store.
    pub deduplicated: bool,
}

/// Downloads assets into a [`ContentStore`].
pub struct AssetFetcher {
    client: reqwest::Client,
    permits: Arc<Semaphore>,
    store: ContentStore,
    recompressor: Arc<dyn Recompressor>,
    max_attempts: u32,
    base_delay: Duration,
}

impl AssetFetcher {
    /// Build a fetcher. Fails only if the HTTP client cannot be
    /// constructed.
    pub fn new(
        config: FetcherConfig,
        store: ContentStore,
        recompressor: Arc<dyn Recompressor>,
    ) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .connect_timeout(config.connect_timeout)
            .timeout(config.total_timeout)
            .build()?;
        Ok(Self {
            client,
            permits: Arc::new(Semaphore::new(config.concurrency.max(1) as usize)),
            store,
            recompressor,
            max_attempts: config.max_attempts.max(1),
            base_delay: config.base_delay,
        })
    }

    /// The store this fetcher writes into.
    pub fn store(&self) -> &ContentStore {
        &self.store
    }

    /// Download `url` and store it under its content digest, with
    /// `extension` as the file suffix.
    ///
    /// Holds one concurrency permit for the whole attempt sequence, so
    /// retries of a slow origin cannot multiply in-flight requests.
    pub async fn fetch(&self, url: &str, extension: &str) -> Result<Fetched, FetchError> {
        let _permit = self
            .permits
            .acquire()
            .await
            .map_err(|_| FetchError::Closed)?;

        let mut last_err = FetchError::Closed;
        for attempt in 1..=self.max_attempts {
            metrics::counter!("vigil_fetch_attempts_total").increment(1);
            match self.try_fetch(url, extension).await {
                Ok(fetched) => {
                    metrics::counter!("vigil_fetch_success_total").increment(1);
                    return Ok(fetched);
                }
                Err(err) if err.is_retryable() && attempt < self.max_attempts => {
                    let delay = self.base_delay * attempt;
                    tracing::warn!(url, attempt, error = %err, delay_ms = delay.as_millis() as u64,
                        "fetch attempt failed, retrying");
                    tokio::time::sleep(delay).await;
                    last_err = err;
                }
                Err(err) => {
                    metrics::counter!("vigil_fetch_failure_total").increment(1);
                    tracing::warn!(url, attempt, error = %err, "fetch failed");
                    return Err(err);
                }
            }
        }
        metrics::counter!("vigil_fetch_failure_total").increment(1);
        Err(last_err)
    }

    async fn try_fetch(&self, url: &str, extension: &str) -> Result<Fetched, FetchError> {
        let response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status(status.as_u16()));
        }
        let body = response.bytes().await?;

        let bytes: &[u8] = &body;
        let recompressed = self.recompressor.recompress(bytes, extension);
        // Never store a "compressed" result that grew.
        let stored: &[u8] = match &recompressed {
            Some(smaller) if smaller.len() < bytes.len() => smaller,
            _ => bytes,
        };

        let digest = content_digest(stored);
        let (_, wrote) = self.store.put(&digest, extension, stored).await?;
        if !wrote {
            metrics::counter!("vigil_fetch_dedup_total").increment(1);
        }
        Ok(Fetched {
            relative_path: self.store.relative_path(&digest, extension),
            digest,
            size: stored.len() as u64,
            deduplicated: !wrote,
        })
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recompress::PassThrough;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn fetcher(store: ContentStore, config: FetcherConfig) -> AssetFetcher {
        AssetFetcher::new(config, store, Arc::new(PassThrough)).unwrap()
    }

    fn fast_config() -> FetcherConfig {
        FetcherConfig {
            base_delay: Duration::from_millis(10),
            ..FetcherConfig::default()
        }
    }

    #[tokio::test]
    async fn fetch_stores_by_digest() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/img"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"picture".to_vec()))
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let fetcher = fetcher(ContentStore::open(dir.path()).unwrap(), fast_config());

        let fetched = fetcher
            .fetch(&format!("{}/img", server.uri()), "jpg")
            .await
            .unwrap();
        assert_eq!(fetched.digest, content_digest(b"picture"));
        assert_eq!(fetched.size, 7);
        assert!(!fetched.deduplicated);
        let on_disk = tokio::fs::read(dir.path().join(&fetched.relative_path))
            .await
            .unwrap();
        assert_eq!(on_disk, b"picture");
    }

    #[tokio::test]
    async fn identical_bytes_deduplicate() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"same".to_vec()))
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let fetcher = fetcher(ContentStore::open(dir.path()).unwrap(), fast_config());

        let first = fetcher
            .fetch(&format!("{}/a", server.uri()), "jpg")
            .await
            .unwrap();
        let second = fetcher
            .fetch(&format!("{}/b", server.uri()), "jpg")
            .await
            .unwrap();
        assert!(!first.deduplicated);
        assert!(second.deduplicated);
        assert_eq!(first.relative_path, second.relative_path);
    }

    #[tokio::test]
    async fn server_errors_are_retried() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(500))
            .up_to_n_times(2)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"ok".to_vec()))
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let fetcher = fetcher(ContentStore::open(dir.path()).unwrap(), fast_config());

        let fetched = fetcher.fetch(&server.uri(), "jpg").await.unwrap();
        assert_eq!(fetched.size, 2);
    }

    #[tokio::test]
    async fn gives_up_after_max_attempts() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let fetcher = fetcher(
            ContentStore::open(dir.path()).unwrap(),
            FetcherConfig {
                max_attempts: 2,
                base_delay: Duration::from_millis(5),
                ..FetcherConfig::default()
            },
        );

        let err = fetcher.fetch(&server.uri(), "jpg").await.unwrap_err();
        assert!(matches!(err, FetchError::Status(404)));
        assert_eq!(server.received_requests().await.unwrap().len(), 2);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn in_flight_downloads_are_bounded() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_bytes(b"slow".to_vec())
                    .set_delay(Duration::from_millis(100)),
            )
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let fetcher = Arc::new(fetcher(
            ContentStore::open(dir.path()).unwrap(),
            FetcherConfig {
                concurrency: 2,
                ..fast_config()
            },
        ));

        let started = std::time::Instant::now();
        let mut tasks = Vec::new();
        for i in 0..4 {
            let fetcher = Arc::clone(&fetcher);
            let url = format!("{}/{i}", server.uri());
            tasks.push(tokio::spawn(async move { fetcher.fetch(&url, "jpg").await }));
        }
        for task in tasks {
            task.await.unwrap().unwrap();
        }
        // Four 100 ms downloads at concurrency 2 need at least two waves.
        assert!(started.elapsed() >= Duration::from_millis(200));
    }

    #[tokio::test]
    async fn recompression_never_grows_the_stored_file() {
        struct Bloater;
        impl Recompressor for Bloater {
            fn recompress(&self, bytes: &[u8], _extension: &str) -> Option<Vec<u8>> {
                let mut grown = bytes.to_vec();
                grown.extend_from_slice(b"padding");
                Some(grown)
            }
        }

        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"original".to_vec()))
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let fetcher = AssetFetcher::new(
            fast_config(),
            ContentStore::open(dir.path()).unwrap(),
            Arc::new(Bloater),
        )
        .unwrap();

        let fetched = fetcher.fetch(&server.uri(), "jpg").await.unwrap();
        assert_eq!(fetched.size, 8);
        assert_eq!(fetched.digest, content_digest(b"original"));
    }

    #[tokio::test]
    async fn shrinking_recompression_is_used() {
        struct Truncate;
        impl Recompressor for Truncate {
            fn recompress(&self, bytes: &[u8], _extension: &str) -> Option<Vec<u8>> {
                Some(bytes[..bytes.len() / 2].to_vec())
            }
        }

        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"12345678".to_vec()))
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let fetcher = AssetFetcher::new(
            fast_config(),
            ContentStore::open(dir.path()).unwrap(),
            Arc::new(Truncate),
        )
        .unwrap();

        let fetched = fetcher.fetch(&server.uri(), "jpg").await.unwrap();
        assert_eq!(fetched.size, 4);
        assert_eq!(fetched.digest, content_digest(b"1234"));
    }
}
