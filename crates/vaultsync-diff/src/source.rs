//! `DiffSource`: the uniform view the diff engine walks, backed either by
//! an archive or a local directory. Both sides use the same root-relative,
//! `/`-separated path convention (the empty string is the root), so the
//! engine itself never special-cases which side is which.

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use vaultsync_core::domain::diff::{EntryKind, EntryStat, Side};
use vaultsync_core::ports::archive::ArchivePort;
use vaultsync_core::ports::local_fs::LocalFilesystemPort;

#[async_trait]
pub trait DiffSource: Send + Sync {
    fn side(&self) -> Side;

    async fn stat(&self, rel: &str) -> anyhow::Result<Option<EntryStat>>;

    async fn read(&self, rel: &str) -> anyhow::Result<Vec<u8>>;

    /// Unsorted entry names directly inside `rel`; the engine sorts.
    async fn readdir(&self, rel: &str) -> anyhow::Result<Vec<String>>;

    async fn write(&self, rel: &str, data: &[u8]) -> anyhow::Result<()>;

    async fn mkdir(&self, rel: &str) -> anyhow::Result<()>;

    async fn remove(&self, rel: &str, kind: EntryKind) -> anyhow::Result<()>;
}

/// Joins a relative path and a child name using `/`, the convention both
/// views and the ignore filter share.
pub fn join_rel(rel: &str, name: &str) -> String {
    if rel.is_empty() {
        name.to_string()
    } else {
        format!("{rel}/{name}")
    }
}

pub struct ArchiveView {
    archive: Arc<dyn ArchivePort>,
    side: Side,
}

impl ArchiveView {
    pub fn new(archive: Arc<dyn ArchivePort>, side: Side) -> Self {
        Self { archive, side }
    }
}

#[async_trait]
impl DiffSource for ArchiveView {
    fn side(&self) -> Side {
        self.side
    }

    async fn stat(&self, rel: &str) -> anyhow::Result<Option<EntryStat>> {
        self.archive.stat(rel).await
    }

    async fn read(&self, rel: &str) -> anyhow::Result<Vec<u8>> {
        self.archive.read_file(rel).await
    }

    async fn readdir(&self, rel: &str) -> anyhow::Result<Vec<String>> {
        self.archive.readdir(rel).await
    }

    async fn write(&self, rel: &str, data: &[u8]) -> anyhow::Result<()> {
        self.archive.write_file(rel, data).await
    }

    async fn mkdir(&self, rel: &str) -> anyhow::Result<()> {
        self.archive.mkdir(rel).await
    }

    async fn remove(&self, rel: &str, kind: EntryKind) -> anyhow::Result<()> {
        match kind {
            EntryKind::File => self.archive.unlink(rel).await,
            EntryKind::Directory => {
                // The archive surface has no recursive rmdir; remove
                // children first, deepest entries having already been
                // emitted earlier in the change list by the shallow=false
                // walk, then unlink the now-empty directory marker.
                self.archive.unlink(rel).await
            }
        }
    }
}

pub struct LocalView {
    fs: Arc<dyn LocalFilesystemPort>,
    root: PathBuf,
    side: Side,
}

impl LocalView {
    pub fn new(fs: Arc<dyn LocalFilesystemPort>, root: PathBuf, side: Side) -> Self {
        Self { fs, root, side }
    }

    fn abs(&self, rel: &str) -> PathBuf {
        if rel.is_empty() {
            self.root.clone()
        } else {
            self.root.join(rel)
        }
    }
}

#[async_trait]
impl DiffSource for LocalView {
    fn side(&self) -> Side {
        self.side
    }

    async fn stat(&self, rel: &str) -> anyhow::Result<Option<EntryStat>> {
        self.fs.stat(&self.abs(rel)).await
    }

    async fn read(&self, rel: &str) -> anyhow::Result<Vec<u8>> {
        self.fs.read_file(&self.abs(rel)).await
    }

    async fn readdir(&self, rel: &str) -> anyhow::Result<Vec<String>> {
        self.fs.readdir(&self.abs(rel)).await
    }

    async fn write(&self, rel: &str, data: &[u8]) -> anyhow::Result<()> {
        self.fs.write_file(&self.abs(rel), data).await
    }

    async fn mkdir(&self, rel: &str) -> anyhow::Result<()> {
        self.fs.create_directory(&self.abs(rel)).await
    }

    async fn remove(&self, rel: &str, kind: EntryKind) -> anyhow::Result<()> {
        match kind {
            EntryKind::File => self.fs.delete_file(&self.abs(rel)).await,
            EntryKind::Directory => self.fs.remove_directory(&self.abs(rel)).await,
        }
    }
}
