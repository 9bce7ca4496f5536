pub mod fs;
pub mod memory;
pub mod store;
pub mod types;
pub mod utils;

pub use fs::FsSnapshotStore;
pub use memory::MemorySnapshotStore;
pub use store::SnapshotStore;
pub use types::{ResourceSnapshot, StoreError, StoreResult};
