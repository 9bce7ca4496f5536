//! Snapshot store contract.

use async_trait::async_trait;

use super::types::{ResourceSnapshot, StoreResult};

/// Persistence for the last-known state of each resource key.
///
/// Implementations must make each `put` atomic: a reader sees either the
/// previous snapshot or the new one, never a mix. Concurrent runs against
/// one key are not coordinated; callers keep a single writer per key.
#[async_trait]
pub trait SnapshotStore: Send + Sync {
    /// Load the snapshot for `key`, or `None` on the first run
    async fn get(&self, key: &str) -> StoreResult<Option<ResourceSnapshot>>;

    /// Replace the snapshot for `key`
    async fn put(&self, key: &str, snapshot: &ResourceSnapshot) -> StoreResult<()>;

    /// Store the latest visual difference image (PNG) for `key`
    async fn put_diff_image(&self, key: &str, png: &[u8]) -> StoreResult<()>;

    /// Load the latest visual difference image for `key`
    async fn get_diff_image(&self, key: &str) -> StoreResult<Option<Vec<u8>>>;
}
