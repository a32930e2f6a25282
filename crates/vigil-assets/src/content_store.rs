//! On-disk content-addressed image store.
//!
//! Files are named by a 32-hex-character digest of their bytes and placed
//! in a shard directory named by the digest's first two characters, so a
//! shard never collects more than 1/256th of the corpus:
//!
//! ```text
//! <root>/ab/abcdef0123456789abcdef0123456789.jpg
//! ```
//!
//! Two fetches of identical bytes land on the same path; the second write
//! is skipped.

use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};

/// Extensions we keep as-is; anything else is normalized to `jpg`.
const KNOWN_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "gif", "webp", "bmp"];

/// 32-hex-character content digest (truncated SHA-256).
pub fn content_digest(bytes: &[u8]) -> String {
    use std::fmt::Write;
    let hash = Sha256::digest(bytes);
    let mut out = String::with_capacity(32);
    for byte in &hash[..16] {
        let _ = write!(out, "{byte:02x}");
    }
    out
}

/// File extension for a stored image, from the relay-reported file name.
pub fn guess_extension(file_name: &str) -> &'static str {
    let ext = file_name.rsplit('.').next().unwrap_or("").to_lowercase();
    KNOWN_EXTENSIONS
        .iter()
        .find(|&&known| known == ext)
        .copied()
        .unwrap_or("jpg")
}

/// Digest-sharded image directory.
#[derive(Clone, Debug)]
pub struct ContentStore {
    root: PathBuf,
}

impl ContentStore {
    /// Open a store rooted at `root`, creating the directory if needed.
    pub fn open(root: impl Into<PathBuf>) -> std::io::Result<Self> {
        let root = root.into();
        std::fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    /// Root directory of the store.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Absolute path a digest stores to.
    pub fn path_for(&self, digest: &str, extension: &str) -> PathBuf {
        let shard = digest.get(..2).unwrap_or("00");
        self.root.join(shard).join(format!("{digest}.{extension}"))
    }

    /// Path relative to the store root, as recorded in the database.
    pub fn relative_path(&self, digest: &str, extension: &str) -> String {
        let shard = digest.get(..2).unwrap_or("00");
        format!("{shard}/{digest}.{extension}")
    }

    /// Whether any file for this digest exists, regardless of extension.
    pub async fn contains(&self, digest: &str) -> bool {
        let shard = self.root.join(digest.get(..2).unwrap_or("00"));
        let prefix = format!("{digest}.");
        let Ok(mut entries) = tokio::fs::read_dir(shard).await else {
            return false;
        };
        while let Ok(Some(entry)) = entries.next_entry().await {
            if entry.file_name().to_string_lossy().starts_with(&prefix) {
                return true;
            }
        }
        false
    }

    /// Write `bytes` under `digest`. Returns the final path and whether a
    /// write actually happened (`false` when the digest was already stored).
    pub async fn put(
        &self,
        digest: &str,
        extension: &str,
        bytes: &[u8],
    ) -> std::io::Result<(PathBuf, bool)> {
        let path = self.path_for(digest, extension);
        if self.contains(digest).await {
            return Ok((path, false));
        }
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        // Write-then-rename so a crash never leaves a half-written file
        // under a digest name.
        let tmp = path.with_extension(format!("{extension}.tmp"));
        tokio::fs::write(&tmp, bytes).await?;
        tokio::fs::rename(&tmp, &path).await?;
        Ok((path, true))
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
