//! In-memory snapshot store
//!
//! Backed by a `HashMap` behind a `Mutex`; contents live as long as the
//! store. Used by tests and by embedders that keep state elsewhere.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;

use super::store::SnapshotStore;
use super::types::{ResourceSnapshot, StoreError, StoreResult};

#[derive(Debug, Default)]
struct Entries {
    snapshots: HashMap<String, ResourceSnapshot>,
    diff_images: HashMap<String, Vec<u8>>,
}

/// Snapshot store held entirely in memory
#[derive(Debug, Default)]
pub struct MemorySnapshotStore {
    entries: Mutex<Entries>,
}

impl MemorySnapshotStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of keys with a stored snapshot
    pub fn len(&self) -> usize {
        self.lock().map(|e| e.snapshots.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> StoreResult<MutexGuard<'_, Entries>> {
        self.entries
            .lock()
            .map_err(|_| StoreError::Unavailable("memory store lock poisoned".to_string()))
    }
}

#[async_trait]
impl SnapshotStore for MemorySnapshotStore {
    async fn get(&self, key: &str) -> StoreResult<Option<ResourceSnapshot>> {
        Ok(self.lock()?.snapshots.get(key).cloned())
    }

    async fn put(&self, key: &str, snapshot: &ResourceSnapshot) -> StoreResult<()> {
        self.lock()?
            .snapshots
            .insert(key.to_string(), snapshot.clone());
        Ok(())
    }

    async fn put_diff_image(&self, key: &str, png: &[u8]) -> StoreResult<()> {
        self.lock()?
            .diff_images
            .insert(key.to_string(), png.to_vec());
        Ok(())
    }

    async fn get_diff_image(&self, key: &str) -> StoreResult<Option<Vec<u8>>> {
        Ok(self.lock()?.diff_images.get(key).cloned())
    }
}
