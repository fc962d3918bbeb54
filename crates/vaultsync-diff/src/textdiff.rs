//! ## Line-Level Textual Diff
//!
//! Built on `similar::TextDiff` the same way the donor pack's `differ.rs`
//! (`64andrewwalker-calvin::domain::services::differ`) renders a
//! `similar::ChangeTag` stream into typed diff lines; generalized here to
//! read both sides from a [`DiffSource`] pair instead of two in-memory
//! strings, and gated by binary/size guards before any diff is computed.

use similar::{ChangeTag, TextDiff};
use vaultsync_core::config::SyncTuning;
use vaultsync_core::domain::errors::SyncError;

use crate::source::DiffSource;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineTag {
    Delete,
    Insert,
    Equal,
}

impl From<ChangeTag> for LineTag {
    fn from(tag: ChangeTag) -> Self {
        match tag {
            ChangeTag::Delete => LineTag::Delete,
            ChangeTag::Insert => LineTag::Insert,
            ChangeTag::Equal => LineTag::Equal,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Hunk {
    pub tag: LineTag,
    pub old_line: Option<usize>,
    pub new_line: Option<usize>,
    pub content: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileDiff {
    pub hunks: Vec<Hunk>,
}

impl FileDiff {
    pub fn has_changes(&self) -> bool {
        self.hunks.iter().any(|h| h.tag != LineTag::Equal)
    }
}

fn is_binary_extension(path: &str, tuning: &SyncTuning) -> bool {
    let ext = std::path::Path::new(path)
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);
    match ext {
        Some(ext) => tuning
            .binary_extensions
            .iter()
            .any(|known| known.eq_ignore_ascii_case(&ext)),
        None => false,
    }
}

/// Sniffs a byte body for binary content: a NUL byte anywhere in the first
/// 8 KiB is treated as definitive, the same heuristic git and most text
/// editors use to decide "binary" without needing a full mime database.
fn is_binary_content(data: &[u8]) -> bool {
    let probe_len = data.len().min(8192);
    data[..probe_len].contains(&0)
}

/// Returns a line-level diff between `path` as seen on `left` and on
/// `right`. Rejects binary files by extension or by content sniff, and
/// files whose size exceeds `tuning.max_diff_file_bytes`.
pub async fn diff_file(
    left: &dyn DiffSource,
    right: &dyn DiffSource,
    path: &str,
    tuning: &SyncTuning,
) -> Result<FileDiff, SyncError> {
    let path = normalize_path(path);

    if is_binary_extension(&path, tuning) {
        return Err(SyncError::InvalidEncoding { path });
    }

    for source in [left, right] {
        if let Some(stat) = source
            .stat(&path)
            .await
            .map_err(SyncError::adapter)?
        {
            if stat.is_file() && stat.size > tuning.max_diff_file_bytes {
                return Err(SyncError::SourceTooLarge {
                    path: path.clone(),
                    size: stat.size,
                });
            }
        }
    }

    let left_bytes = left.read(&path).await.map_err(SyncError::adapter)?;
    let right_bytes = right.read(&path).await.map_err(SyncError::adapter)?;

    if is_binary_content(&left_bytes) || is_binary_content(&right_bytes) {
        return Err(SyncError::InvalidEncoding { path });
    }

    let left_text = std::str::from_utf8(&left_bytes)
        .map_err(|_| SyncError::InvalidEncoding { path: path.clone() })?;
    let right_text = std::str::from_utf8(&right_bytes)
        .map_err(|_| SyncError::InvalidEncoding { path: path.clone() })?;

    let text_diff = TextDiff::from_lines(left_text, right_text);
    let hunks = text_diff
        .iter_all_changes()
        .map(|change| Hunk {
            tag: LineTag::from(change.tag()),
            old_line: change.old_index().map(|i| i + 1),
            new_line: change.new_index().map(|i| i + 1),
            content: change.value().to_string(),
        })
        .collect();

    Ok(FileDiff { hunks })
}

fn normalize_path(path: &str) -> String {
    path.trim_start_matches('/').trim_end_matches('/').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::LocalView;
    use async_trait::async_trait;
    use std::sync::Arc;
    use tokio::sync::mpsc;
    use vaultsync_core::domain::diff::{EntryKind, EntryStat, Side};
    use vaultsync_core::ports::local_fs::{LocalFilesystemPort, WatchHandle};

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

    fn views(dir: &std::path::Path) -> (LocalView, LocalView) {
        let fs = Arc::new(TempFs);
        (
            LocalView::new(fs.clone(), dir.to_path_buf(), Side::Left),
            LocalView::new(fs, dir.to_path_buf(), Side::Right),
        )
    }

    #[tokio::test]
    async fn produces_a_one_line_change() {
        let dir = tempfile::tempdir().unwrap();
        tokio::fs::write(dir.path().join("a.txt"), "hello\nworld\n")
            .await
            .unwrap();
        tokio::fs::write(dir.path().join("b.txt"), "hello\nthere\n")
            .await
            .unwrap();
        let (left, right) = views(dir.path());

        let left_view = RenamedView { inner: &left, rename_to: "a.txt" };
        let right_view = RenamedView { inner: &right, rename_to: "b.txt" };
        let tuning = SyncTuning::default();
        let diff = diff_file(&left_view, &right_view, "a.txt", &tuning)
            .await
            .unwrap();
        assert!(diff.has_changes());
    }

    #[tokio::test]
    async fn rejects_binary_extension() {
        let dir = tempfile::tempdir().unwrap();
        tokio::fs::write(dir.path().join("a.png"), b"whatever")
            .await
            .unwrap();
        let (left, right) = views(dir.path());
        let tuning = SyncTuning::default();
        let err = diff_file(&left, &right, "a.png", &tuning).await.unwrap_err();
        assert!(matches!(err, SyncError::InvalidEncoding { .. }));
    }

    #[tokio::test]
    async fn rejects_binary_content_by_sniff() {
        let dir = tempfile::tempdir().unwrap();
        tokio::fs::write(dir.path().join("a.dat"), [0u8, 1, 2, 0, 4])
            .await
            .unwrap();
        let (left, right) = views(dir.path());
        let tuning = SyncTuning::default();
        let err = diff_file(&left, &right, "a.dat", &tuning).await.unwrap_err();
        assert!(matches!(err, SyncError::InvalidEncoding { .. }));
    }

    #[tokio::test]
    async fn rejects_oversized_file() {
        let dir = tempfile::tempdir().unwrap();
        let big = vec![b'x'; 101 * 1024];
        tokio::fs::write(dir.path().join("a.txt"), &big)
            .await
            .unwrap();
        let (left, right) = views(dir.path());
        let mut tuning = SyncTuning::default();
        tuning.max_diff_file_bytes = 100 * 1024;
        let err = diff_file(&left, &right, "a.txt", &tuning).await.unwrap_err();
        assert!(matches!(err, SyncError::SourceTooLarge { .. }));
    }

    /// Reads `rename_to` under `inner`'s root regardless of the path the
    /// diff call passes, so a single temp directory can stage both
    /// comparison sides as distinct files.
    struct RenamedView<'a> {
        inner: &'a LocalView,
        rename_to: &'a str,
    }

    #[async_trait]
    impl DiffSource for RenamedView<'_> {
        fn side(&self) -> Side {
            self.inner.side()
        }
        async fn stat(&self, _rel: &str) -> anyhow::Result<Option<EntryStat>> {
            self.inner.stat(self.rename_to).await
        }
        async fn read(&self, _rel: &str) -> anyhow::Result<Vec<u8>> {
            self.inner.read(self.rename_to).await
        }
        async fn readdir(&self, rel: &str) -> anyhow::Result<Vec<String>> {
            self.inner.readdir(rel).await
        }
        async fn write(&self, _rel: &str, data: &[u8]) -> anyhow::Result<()> {
            self.inner.write(self.rename_to, data).await
        }
        async fn mkdir(&self, rel: &str) -> anyhow::Result<()> {
            self.inner.mkdir(rel).await
        }
        async fn remove(&self, _rel: &str, kind: EntryKind) -> anyhow::Result<()> {
            self.inner.remove(self.rename_to, kind).await
        }
    }
}
