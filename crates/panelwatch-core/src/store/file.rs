// ── JSON file store ──
//
// One `<viewer>.json` file per viewer under a directory. Writes go to a
// uniquely named temp file in the same directory and are renamed over the
// target, so a crash mid-write leaves the previous generation intact.

use std::fmt::Write as _;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::debug;

use super::SnapshotStore;
use crate::error::CoreError;
use crate::model::{ViewerId, ViewerSnapshot};

/// Directory-backed [`SnapshotStore`].
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    /// The directory is created lazily on first write.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// File holding `viewer`'s snapshot.
    pub fn path_for(&self, viewer: &ViewerId) -> PathBuf {
        self.dir.join(format!("{}.json", file_stem(viewer)))
    }
}

#[async_trait]
impl SnapshotStore for FileStore {
    async fn get(&self, viewer: &ViewerId) -> Result<Option<ViewerSnapshot>, CoreError> {
        let path = self.path_for(viewer);
        let text = match tokio::fs::read_to_string(&path).await {
            Ok(text) => text,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(CoreError::store(format_args!(
                    "cannot read {}: {e}",
                    path.display()
                )));
            }
        };

        serde_json::from_str(&text).map(Some).map_err(|e| {
            CoreError::store(format_args!("corrupt snapshot {}: {e}", path.display()))
        })
    }

    async fn put(&self, viewer: &ViewerId, snapshot: &ViewerSnapshot) -> Result<(), CoreError> {
        tokio::fs::create_dir_all(&self.dir).await.map_err(|e| {
            CoreError::store(format_args!("cannot create {}: {e}", self.dir.display()))
        })?;

        let body = serde_json::to_vec_pretty(snapshot)
            .map_err(|e| CoreError::Internal(format!("snapshot serialization: {e}")))?;

        let target = self.path_for(viewer);
        let tmp = self
            .dir
            .join(format!(".{}.{}.tmp", file_stem(viewer), uuid::Uuid::new_v4()));

        if let Err(e) = tokio::fs::write(&tmp, &body).await {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(CoreError::store(format_args!(
                "cannot write {}: {e}",
                tmp.display()
            )));
        }
        if let Err(e) = tokio::fs::rename(&tmp, &target).await {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(CoreError::store(format_args!(
                "cannot replace {}: {e}",
                target.display()
            )));
        }

        debug!(%viewer, path = %target.display(), "snapshot written");
        Ok(())
    }
}

/// Injective, filesystem-safe encoding of a viewer id. Anything outside
/// `[A-Za-z0-9.@-]` becomes `_xx` (hex byte).
fn file_stem(viewer: &ViewerId) -> String {
    let raw = viewer.as_str();
    let mut out = String::with_capacity(raw.len());
    for byte in raw.bytes() {
        if byte.is_ascii_alphanumeric() || matches!(byte, b'.' | b'@' | b'-') {
            out.push(char::from(byte));
        } else {
            let _ = write!(out, "_{byte:02x}");
        }
    }
    if out.is_empty() || out.starts_with('.') {
        out.insert(0, '_');
    }
    out
}
