// ── Snapshot store ──
//
// Last snapshot per viewer. One key per viewer, last write wins, and a
// single-key overwrite is atomic: readers see either the old or the new
// snapshot, never a mix.

mod file;
mod memory;

use async_trait::async_trait;

use crate::error::CoreError;
use crate::model::{ViewerId, ViewerSnapshot};

pub use file::FileStore;
pub use memory::MemoryStore;

/// Persistence of the previous snapshot generation.
///
/// Errors mean the store is unavailable, which aborts the viewer's cycle.
#[async_trait]
pub trait SnapshotStore: Send + Sync {
    async fn get(&self, viewer: &ViewerId) -> Result<Option<ViewerSnapshot>, CoreError>;

    async fn put(&self, viewer: &ViewerId, snapshot: &ViewerSnapshot) -> Result<(), CoreError>;
}
