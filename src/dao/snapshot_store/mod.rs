/// JSON-file backend.
pub mod fs;

use futures::future::BoxFuture;

use crate::dao::{models::SnapshotEntity, storage::StorageResult};

/// Abstraction over the durable point holding the recovery snapshot.
///
/// The live event stream is the source of truth while clients are connected;
/// the store only has to survive process restarts, so every operation replaces
/// or returns the whole record.
pub trait SnapshotStore: Send + Sync {
    /// Last persisted snapshot, or the documented empty default when none exists.
    fn load(&self) -> BoxFuture<'static, StorageResult<SnapshotEntity>>;
    /// Overwrite the entire record, creating any missing storage location.
    fn save(&self, snapshot: SnapshotEntity) -> BoxFuture<'static, StorageResult<()>>;
    /// Reset the record to the empty default rather than deleting it.
    fn clear(&self) -> BoxFuture<'static, StorageResult<()>>;
    /// Probe whether the storage location is usable.
    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>>;
}
