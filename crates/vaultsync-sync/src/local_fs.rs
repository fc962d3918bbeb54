//! Concrete `LocalFilesystemPort` adapter over `tokio::fs` plus the
//! `notify` crate for the recursive watcher. Directly modeled on the donor
//! workspace's `LocalFileSystemAdapter`: atomic writes via a sibling
//! `.tmp` file and `tokio::fs::rename`, `spawn_blocking` for the
//! notify-crate setup since its API is synchronous. Dropped from the
//! donor: `compute_hash` (OneDrive-specific quickXorHash) and the
//! lock-detection probe on `get_state` (no Files-on-Demand concept here).

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use notify::{Config, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;
use vaultsync_core::domain::diff::{EntryKind, EntryStat};
use vaultsync_core::domain::events::ChangeNotificationKind;
use vaultsync_core::domain::ignore::manifest_file_name;
use vaultsync_core::ports::local_fs::{LocalChangeEvent, LocalFilesystemPort, WatchHandle};

#[derive(Debug, Default, Clone, Copy)]
pub struct LocalFilesystemAdapter;

impl LocalFilesystemAdapter {
    pub fn new() -> Self {
        Self
    }
}

fn map_event_kind(kind: EventKind) -> Option<ChangeNotificationKind> {
    match kind {
        EventKind::Create(_) => Some(ChangeNotificationKind::Created),
        EventKind::Modify(_) => Some(ChangeNotificationKind::Modified),
        EventKind::Remove(_) => Some(ChangeNotificationKind::Removed),
        _ => None,
    }
}

#[async_trait]
impl LocalFilesystemPort for LocalFilesystemAdapter {
    async fn stat(&self, path: &Path) -> anyhow::Result<Option<EntryStat>> {
        match tokio::fs::metadata(path).await {
            Ok(meta) => {
                let mtime_unix = meta
                    .modified()
                    .ok()
                    .and_then(|t| t.duration_since(std::time::UNIX_EPOCH).ok())
                    .map(|d| d.as_secs() as i64)
                    .unwrap_or(0);
                Ok(Some(EntryStat {
                    kind: if meta.is_dir() { EntryKind::Directory } else { EntryKind::File },
                    size: meta.len(),
                    mtime_unix,
                }))
            }
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    async fn read_file(&self, path: &Path) -> anyhow::Result<Vec<u8>> {
        Ok(tokio::fs::read(path).await?)
    }

    async fn write_file(&self, path: &Path, data: &[u8]) -> anyhow::Result<()> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let tmp = sibling_tmp_path(path);
        tokio::fs::write(&tmp, data).await?;
        tokio::fs::rename(&tmp, path).await?;
        Ok(())
    }

    async fn delete_file(&self, path: &Path) -> anyhow::Result<()> {
        Ok(tokio::fs::remove_file(path).await?)
    }

    async fn create_directory(&self, path: &Path) -> anyhow::Result<()> {
        Ok(tokio::fs::create_dir_all(path).await?)
    }

    async fn remove_directory(&self, path: &Path) -> anyhow::Result<()> {
        Ok(tokio::fs::remove_dir(path).await?)
    }

    async fn readdir(&self, path: &Path) -> anyhow::Result<Vec<String>> {
        let mut out = Vec::new();
        let mut entries = tokio::fs::read_dir(path).await?;
        while let Some(entry) = entries.next_entry().await? {
            out.push(entry.file_name().to_string_lossy().into_owned());
        }
        Ok(out)
    }

    async fn read_manifest(&self, root: &Path) -> anyhow::Result<serde_json::Value> {
        let path = root.join(manifest_file_name());
        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(serde_json::json!({})),
            Err(err) => Err(err.into()),
        }
    }

    async fn write_manifest(&self, root: &Path, manifest: &serde_json::Value) -> anyhow::Result<()> {
        let path = root.join(manifest_file_name());
        let bytes = serde_json::to_vec_pretty(manifest)?;
        self.write_file(&path, &bytes).await
    }

    async fn watch(&self, path: &Path) -> anyhow::Result<(WatchHandle, mpsc::Receiver<LocalChangeEvent>)> {
        let (tx, rx) = mpsc::channel(256);
        let root = path.to_path_buf();

        let (notify_tx, mut notify_rx) = mpsc::unbounded_channel::<notify::Result<Event>>();
        let mut watcher = RecommendedWatcher::new(
            move |res| {
                let _ = notify_tx.send(res);
            },
            Config::default(),
        )?;
        watcher.watch(&root, RecursiveMode::Recursive)?;

        tokio::spawn(async move {
            while let Some(res) = notify_rx.recv().await {
                let Ok(event) = res else { continue };
                let Some(kind) = map_event_kind(event.kind) else { continue };
                for changed in event.paths {
                    let change = LocalChangeEvent { path: changed, kind };
                    if tx.send(change).await.is_err() {
                        return;
                    }
                }
            }
        });

        let handle = WatchHandle::new(move || {
            // `watcher` is dropped here, which unregisters the OS watch;
            // the background task above then sees its channel close and
            // exits on its next `recv`.
            drop(watcher);
        });
        Ok((handle, rx))
    }
}

fn sibling_tmp_path(path: &Path) -> PathBuf {
    let file_name = path.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default();
    path.with_file_name(format!(".{file_name}.tmp"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn write_file_is_atomic_via_rename() {
        let dir = tempfile::tempdir().unwrap();
        let fs = LocalFilesystemAdapter::new();
        let target = dir.path().join("a.txt");
        fs.write_file(&target, b"hello").await.unwrap();
        assert_eq!(tokio::fs::read(&target).await.unwrap(), b"hello");
        assert!(!sibling_tmp_path(&target).exists());
    }

    #[tokio::test]
    async fn stat_missing_path_returns_none() {
        let dir = tempfile::tempdir().unwrap();
        let fs = LocalFilesystemAdapter::new();
        let result = fs.stat(&dir.path().join("nope")).await.unwrap();
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn manifest_round_trips_as_json() {
        let dir = tempfile::tempdir().unwrap();
        let fs = LocalFilesystemAdapter::new();
        let manifest = serde_json::json!({"title": "hello"});
        fs.write_manifest(dir.path(), &manifest).await.unwrap();
        let reloaded = fs.read_manifest(dir.path()).await.unwrap();
        assert_eq!(reloaded, manifest);
    }

    #[tokio::test]
    async fn missing_manifest_reads_as_empty_object() {
        let dir = tempfile::tempdir().unwrap();
        let fs = LocalFilesystemAdapter::new();
        let manifest = fs.read_manifest(dir.path()).await.unwrap();
        assert_eq!(manifest, serde_json::json!({}));
    }

    #[tokio::test]
    async fn recursive_watch_observes_a_new_file() {
        let dir = tempfile::tempdir().unwrap();
        let fs = LocalFilesystemAdapter::new();
        let (_handle, mut rx) = fs.watch(dir.path()).await.unwrap();

        tokio::fs::write(dir.path().join("a.txt"), b"x").await.unwrap();

        let event = tokio::time::timeout(std::time::Duration::from_secs(5), rx.recv())
            .await
            .expect("expected a change event within 5s");
        assert!(event.is_some());
    }
}
