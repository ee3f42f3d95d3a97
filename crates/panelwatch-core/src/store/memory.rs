use async_trait::async_trait;
use dashmap::DashMap;

use super::SnapshotStore;
use crate::error::CoreError;
use crate::model::{ViewerId, ViewerSnapshot};

/// In-process store. Contents are lost on restart, so the first cycle
/// after a restart is a baseline again.
#[derive(Debug, Default)]
pub struct MemoryStore {
    snapshots: DashMap<ViewerId, ViewerSnapshot>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }
}

#[async_trait]
impl SnapshotStore for MemoryStore {
    async fn get(&self, viewer: &ViewerId) -> Result<Option<ViewerSnapshot>, CoreError> {
        Ok(self.snapshots.get(viewer).map(|entry| entry.value().clone()))
    }

    async fn put(&self, viewer: &ViewerId, snapshot: &ViewerSnapshot) -> Result<(), CoreError> {
        self.snapshots.insert(viewer.clone(), snapshot.clone());
        Ok(())
    }
}
