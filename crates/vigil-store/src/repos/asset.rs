//! The `assets_images` and `assets_files` tables.

use rusqlite::{params, Connection};

use crate::errors::Result;

/// Fetch state recorded against an image row. A failed fetch leaves the
/// row `Pending`, so a later sighting of the same content retries.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ImageStatus {
    /// Seen in a message; bytes not on disk yet.
    Pending,
    /// Fetched and written to the content store.
    Stored,
}

impl ImageStatus {
    fn as_i64(self) -> i64 {
        match self {
            Self::Pending => 0,
            Self::Stored => 1,
        }
    }
}

/// An image attachment record.
#[derive(Clone, Debug)]
pub struct ImageRecord {
    /// Relay file identifier, unique per image occurrence.
    pub file_id: String,
    /// Source URL the image was (or would be) fetched from.
    pub url: String,
    /// Path inside the content store, once fetched.
    pub local_path: Option<String>,
    /// 32-hex-char content digest.
    pub content_hash: String,
    /// Stored size in bytes, once fetched.
    pub size_bytes: Option<i64>,
    /// Fetch outcome.
    pub status: ImageStatus,
    /// Unix time the image was first seen.
    pub first_seen_at: i64,
}

/// A group file-upload record.
#[derive(Clone, Debug)]
pub struct FileRecord {
    /// Relay file identifier.
    pub file_id: String,
    /// Group the file was uploaded to.
    pub group_id: i64,
    /// Uploading user.
    pub uploader_id: i64,
    /// Original file name.
    pub file_name: String,
    /// File size in bytes as reported by the relay.
    pub size_bytes: i64,
    /// Relay storage bus id, when present.
    pub busid: Option<i64>,
    /// Unix upload time.
    pub uploaded_at: i64,
}

/// Repository over the asset tables.
pub struct AssetRepo;

impl AssetRepo {
    /// Write or overwrite an image record keyed by `file_id`.
    pub fn upsert_image(conn: &Connection, record: &ImageRecord) -> Result<()> {
        let _ = conn.execute(
            "INSERT OR REPLACE INTO assets_images
                 (file_id, url, local_path, content_hash, size_bytes, status, first_seen_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                record.file_id,
                record.url,
                record.local_path,
                record.content_hash,
                record.size_bytes,
                record.status.as_i64(),
                record.first_seen_at,
            ],
        )?;
        Ok(())
    }

    /// Local path of an already-stored image with this content digest, if
    /// any. Lets the fetch path skip downloads of bytes it already holds.
    pub fn path_by_hash(conn: &Connection, content_hash: &str) -> Result<Option<String>> {
        let mut stmt = conn.prepare(
            "SELECT local_path FROM assets_images
             WHERE content_hash = ?1 AND status = 1 AND local_path IS NOT NULL
             LIMIT 1",
        )?;
        let mut rows = stmt.query_map(params![content_hash], |row| row.get(0))?;
        match rows.next() {
            Some(path) => Ok(Some(path?)),
            None => Ok(None),
        }
    }

    /// Count of stored images.
    pub fn image_count(conn: &Connection) -> Result<i64> {
        let count = conn.query_row(
            "SELECT count(*) FROM assets_images WHERE status = 1",
            [],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    /// Record a group file upload. Re-announcements of the same `file_id`
    /// are ignored.
    pub fn insert_file(conn: &Connection, record: &FileRecord) -> Result<()> {
        let _ = conn.execute(
            "INSERT OR IGNORE INTO assets_files
                 (file_id, group_id, uploader_id, file_name, size_bytes, busid, uploaded_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                record.file_id,
                record.group_id,
                record.uploader_id,
                record.file_name,
                record.size_bytes,
                record.busid,
                record.uploaded_at,
            ],
        )?;
        Ok(())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
