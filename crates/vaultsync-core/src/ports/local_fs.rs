//! ## Local Filesystem / Scoped-View Port
//!
//! Directly modeled on the donor workspace's
//! `lnxdrive-core::ports::local_filesystem::ILocalFileSystem`: same
//! `anyhow::Result` boundary, same `watch`-returns-a-handle shape. Dropped
//! from the donor: `compute_hash` (quickXorHash is OneDrive-specific; the
//! content-compare cache in `vaultsync-diff` hashes bodies itself) and the
//! lock-detection bit on `FileSystemState` (no OneDrive Files-on-Demand
//! concept here).

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::domain::diff::EntryStat;
use crate::domain::events::ChangeNotificationKind;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalChangeEvent {
    pub path: PathBuf,
    pub kind: ChangeNotificationKind,
}

/// RAII handle for an attached watch; dropping it (or calling `stop`)
/// tears down the underlying OS watch. Mirrors the donor's `WatchHandle`.
pub struct WatchHandle {
    stop_fn: Option<Box<dyn FnOnce() + Send>>,
}

impl WatchHandle {
    pub fn new(stop_fn: impl FnOnce() + Send + 'static) -> Self {
        Self {
            stop_fn: Some(Box::new(stop_fn)),
        }
    }

    pub fn stop(mut self) {
        if let Some(stop_fn) = self.stop_fn.take() {
            stop_fn();
        }
    }
}

impl Drop for WatchHandle {
    fn drop(&mut self) {
        if let Some(stop_fn) = self.stop_fn.take() {
            stop_fn();
        }
    }
}

impl std::fmt::Debug for WatchHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WatchHandle")
            .field("active", &self.stop_fn.is_some())
            .finish()
    }
}

/// Port trait for the scoped local directory view. One implementation is
/// provided by
/// `vaultsync-sync::local_fs::LocalFilesystemAdapter`; it is zero-sized
/// and rooted per call, the same way the donor's `LocalFileSystemAdapter`
/// is stateless and takes absolute paths on every call.
#[async_trait]
pub trait LocalFilesystemPort: Send + Sync {
    async fn stat(&self, path: &Path) -> anyhow::Result<Option<EntryStat>>;

    async fn read_file(&self, path: &Path) -> anyhow::Result<Vec<u8>>;

    /// Writes atomically: write to a sibling temp file, then rename over
    /// the destination, as the donor's `filesystem.rs` does.
    async fn write_file(&self, path: &Path, data: &[u8]) -> anyhow::Result<()>;

    async fn delete_file(&self, path: &Path) -> anyhow::Result<()>;

    async fn create_directory(&self, path: &Path) -> anyhow::Result<()>;

    /// Removes an empty directory. The diff engine only ever emits a
    /// directory removal after every descendant has already been removed
    /// (shallow=false) or as a single collapsed change (shallow=true, where
    /// the caller is expected to remove recursively).
    async fn remove_directory(&self, path: &Path) -> anyhow::Result<()>;

    async fn readdir(&self, path: &Path) -> anyhow::Result<Vec<String>>;

    async fn read_manifest(&self, root: &Path) -> anyhow::Result<serde_json::Value>;

    async fn write_manifest(&self, root: &Path, manifest: &serde_json::Value)
        -> anyhow::Result<()>;

    /// Recursive watch rooted at `path`; events arrive on the returned
    /// channel until the `WatchHandle` is dropped.
    async fn watch(
        &self,
        path: &Path,
    ) -> anyhow::Result<(WatchHandle, mpsc::Receiver<LocalChangeEvent>)>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;

    #[test]
    fn watch_handle_runs_stop_fn_on_drop() {
        let stopped = Arc::new(AtomicBool::new(false));
        let flag = stopped.clone();
        {
            let _handle = WatchHandle::new(move || flag.store(true, Ordering::SeqCst));
        }
        assert!(stopped.load(Ordering::SeqCst));
    }

    #[test]
    fn watch_handle_runs_stop_fn_exactly_once_on_explicit_stop() {
        let calls = Arc::new(std::sync::atomic::AtomicUsize::new(0));
        let counter = calls.clone();
        let handle = WatchHandle::new(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        handle.stop();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
