//! A directory-backed `ArchivePort`, for running the engine end to end
//! without a real content-addressed archive store attached -- the archive
//! implementation itself is an external collaborator out of scope for the
//! core. Structurally mirrors
//! `local_fs::LocalFilesystemAdapter` -- `tokio::fs` plus a `notify` watch
//! -- with paths keyed relative to an archive root instead of absolute, and
//! a `version` counter bumped on every mutating call so callers can observe
//! archive-side activity without diffing.
//!
//! `vaultsync-cli` and `vaultsync-daemon` use this when pointed at a plain
//! directory via `--archive-dir`; a deployment with a real archive backend
//! would substitute its own `ArchivePort` implementation instead.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use notify::{Config, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;
use vaultsync_core::domain::archive_key::ArchiveKey;
use vaultsync_core::domain::diff::{EntryKind, EntryStat};
use vaultsync_core::domain::events::ChangeNotificationKind;
use vaultsync_core::domain::ignore::manifest_file_name;
use vaultsync_core::ports::archive::{ArchiveChangeEvent, ArchivePort};

fn map_event_kind(kind: EventKind) -> Option<ChangeNotificationKind> {
    match kind {
        EventKind::Create(_) => Some(ChangeNotificationKind::Created),
        EventKind::Modify(_) => Some(ChangeNotificationKind::Modified),
        EventKind::Remove(_) => Some(ChangeNotificationKind::Removed),
        _ => None,
    }
}

/// An append-only archive backed directly by a directory tree. `key` is
/// derived once at construction from the root path so the same directory
/// always resolves to the same `ArchiveKey` across process restarts.
pub struct LocalDirectoryArchive {
    key: ArchiveKey,
    root: PathBuf,
    writable: bool,
    version: AtomicU64,
}

impl LocalDirectoryArchive {
    pub fn new(root: PathBuf, writable: bool) -> Self {
        let key = ArchiveKey::new(derive_key(&root));
        Self {
            key,
            root,
            writable,
            version: AtomicU64::new(0),
        }
    }

    fn abs(&self, rel: &str) -> PathBuf {
        if rel.is_empty() {
            self.root.clone()
        } else {
            self.root.join(rel)
        }
    }

    fn bump_version(&self) {
        self.version.fetch_add(1, Ordering::SeqCst);
    }
}

fn derive_key(root: &Path) -> [u8; 32] {
    use sha2::{Digest, Sha256};
    let mut hasher = Sha256::new();
    hasher.update(root.to_string_lossy().as_bytes());
    hasher.finalize().into()
}

#[async_trait]
impl ArchivePort for LocalDirectoryArchive {
    fn key(&self) -> ArchiveKey {
        self.key
    }

    fn writable(&self) -> bool {
        self.writable
    }

    fn readable(&self) -> bool {
        true
    }

    fn version(&self) -> u64 {
        self.version.load(Ordering::SeqCst)
    }

    async fn stat(&self, path: &str) -> anyhow::Result<Option<EntryStat>> {
        match tokio::fs::metadata(self.abs(path)).await {
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

    async fn read_file(&self, path: &str) -> anyhow::Result<Vec<u8>> {
        Ok(tokio::fs::read(self.abs(path)).await?)
    }

    async fn write_file(&self, path: &str, data: &[u8]) -> anyhow::Result<()> {
        let target = self.abs(path);
        if let Some(parent) = target.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&target, data).await?;
        self.bump_version();
        Ok(())
    }

    async fn unlink(&self, path: &str) -> anyhow::Result<()> {
        tokio::fs::remove_file(self.abs(path)).await?;
        self.bump_version();
        Ok(())
    }

    async fn mkdir(&self, path: &str) -> anyhow::Result<()> {
        tokio::fs::create_dir_all(self.abs(path)).await?;
        self.bump_version();
        Ok(())
    }

    async fn readdir(&self, path: &str) -> anyhow::Result<Vec<String>> {
        let mut out = Vec::new();
        let mut entries = tokio::fs::read_dir(self.abs(path)).await?;
        while let Some(entry) = entries.next_entry().await? {
            out.push(entry.file_name().to_string_lossy().into_owned());
        }
        Ok(out)
    }

    async fn read_manifest(&self) -> anyhow::Result<serde_json::Value> {
        let path = self.abs(manifest_file_name());
        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(serde_json::json!({})),
            Err(err) => Err(err.into()),
        }
    }

    async fn write_manifest(&self, manifest: &serde_json::Value) -> anyhow::Result<()> {
        let bytes = serde_json::to_vec_pretty(manifest)?;
        self.write_file(manifest_file_name(), &bytes).await
    }

    async fn watch(&self) -> anyhow::Result<mpsc::Receiver<ArchiveChangeEvent>> {
        let (tx, rx) = mpsc::channel(256);
        let root = self.root.clone();

        let (notify_tx, mut notify_rx) = mpsc::unbounded_channel::<notify::Result<Event>>();
        let mut watcher = RecommendedWatcher::new(
            move |res| {
                let _ = notify_tx.send(res);
            },
            Config::default(),
        )?;
        watcher.watch(&root, RecursiveMode::Recursive)?;

        tokio::spawn(async move {
            // Keep the watcher alive for the lifetime of this task; it is
            // dropped (and the OS watch torn down) when the channel closes.
            let _watcher = watcher;
            while let Some(res) = notify_rx.recv().await {
                let Ok(event) = res else { continue };
                let Some(kind) = map_event_kind(event.kind) else { continue };
                for changed in &event.paths {
                    let Ok(rel) = changed.strip_prefix(&root) else { continue };
                    let change = ArchiveChangeEvent {
                        path: rel.to_string_lossy().into_owned(),
                        kind,
                    };
                    if tx.send(change).await.is_err() {
                        return;
                    }
                }
            }
        });

        Ok(rx)
    }

    async fn size(&self, path: &str) -> anyhow::Result<u64> {
        Ok(tokio::fs::metadata(self.abs(path)).await.map(|m| m.len()).unwrap_or(0))
    }
}
