//! Filesystem snapshot store
//!
//! Layout under the base directory, one directory per key:
//!
//! ```text
//! <base>/<escaped key>/snapshot.json   text, markup, base64 PNG, saved_at
//! <base>/<escaped key>/last_diff.png   latest visual difference image
//! ```
//!
//! Files are written to a temporary sibling and renamed into place.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::store::SnapshotStore;
use super::types::{ResourceSnapshot, StoreError, StoreResult};
use super::utils::{escape_key, read_optional, write_atomic};

/// Snapshot document name inside a key directory
pub const SNAPSHOT_FILE: &str = "snapshot.json";

/// Difference image name inside a key directory
pub const DIFF_IMAGE_FILE: &str = "last_diff.png";

/// On-disk form of a snapshot
#[derive(Debug, Serialize, Deserialize)]
struct StoredSnapshot {
    text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    markup: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    image: Option<String>,
    saved_at: DateTime<Utc>,
}

/// Snapshot store rooted at a directory
#[derive(Debug, Clone)]
pub struct FsSnapshotStore {
    base_dir: PathBuf,
}

impl FsSnapshotStore {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// Directory holding the files for `key`
    pub fn key_dir(&self, key: &str) -> PathBuf {
        self.base_dir.join(escape_key(key))
    }

    async fn ensure_key_dir(&self, key: &str) -> StoreResult<PathBuf> {
        let dir = self.key_dir(key);
        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(|e| StoreError::io(&dir, e))?;
        Ok(dir)
    }
}

#[async_trait]
impl SnapshotStore for FsSnapshotStore {
    async fn get(&self, key: &str) -> StoreResult<Option<ResourceSnapshot>> {
        let path = self.key_dir(key).join(SNAPSHOT_FILE);
        let Some(bytes) = read_optional(&path).await? else {
            return Ok(None);
        };

        let stored: StoredSnapshot =
            serde_json::from_slice(&bytes).map_err(|e| StoreError::Corrupt {
                key: key.to_string(),
                reason: e.to_string(),
            })?;

        let image = stored
            .image
            .map(|encoded| STANDARD.decode(encoded))
            .transpose()
            .map_err(|e| StoreError::Corrupt {
                key: key.to_string(),
                reason: format!("invalid base64 image: {}", e),
            })?;

        Ok(Some(ResourceSnapshot {
            text: stored.text,
            markup: stored.markup,
            image,
            saved_at: stored.saved_at,
        }))
    }

    async fn put(&self, key: &str, snapshot: &ResourceSnapshot) -> StoreResult<()> {
        let dir = self.ensure_key_dir(key).await?;
        let stored = StoredSnapshot {
            text: snapshot.text.clone(),
            markup: snapshot.markup.clone(),
            image: snapshot.image.as_ref().map(|png| STANDARD.encode(png)),
            saved_at: snapshot.saved_at,
        };
        let json = serde_json::to_vec_pretty(&stored)?;
        let path = dir.join(SNAPSHOT_FILE);
        write_atomic(&path, &json).await?;
        debug!(key, path = %path.display(), bytes = json.len(), "Snapshot written");
        Ok(())
    }

    async fn put_diff_image(&self, key: &str, png: &[u8]) -> StoreResult<()> {
        let dir = self.ensure_key_dir(key).await?;
        write_atomic(&dir.join(DIFF_IMAGE_FILE), png).await
    }

    async fn get_diff_image(&self, key: &str) -> StoreResult<Option<Vec<u8>>> {
        read_optional(&self.key_dir(key).join(DIFF_IMAGE_FILE)).await
    }
}
