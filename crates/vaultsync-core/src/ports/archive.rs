//! ## Archive Handle Port
//!
//! Generalized from the donor workspace's `ICloudProvider`: no OAuth,
//! delta tokens, or upload sessions, since this archive is a local,
//! content-addressed, append-only filesystem rather than a remote OneDrive
//! share. The surface is instead exactly the read/write/stat/readdir/watch
//! contract an archive handle offers as an external collaborator.

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::domain::archive_key::ArchiveKey;
use crate::domain::diff::EntryStat;
use crate::domain::events::ChangeNotificationKind;

/// One entry of the archive's change-notification stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveChangeEvent {
    pub path: String,
    pub kind: ChangeNotificationKind,
}

/// Port trait for the append-only content-addressed archive.
/// Implementations are owned by the storage layer; the sync engine holds
/// only a non-owning `Arc<dyn ArchivePort>` for the archive's lifetime.
#[async_trait]
pub trait ArchivePort: Send + Sync {
    fn key(&self) -> ArchiveKey;

    /// Whether this process holds the signing key for the archive
    /// (glossary: "Writable archive").
    fn writable(&self) -> bool;

    fn readable(&self) -> bool;

    /// Monotonic counter, bumped on every mutation; exposed for callers
    /// that want to detect archive-side activity without diffing.
    fn version(&self) -> u64;

    async fn stat(&self, path: &str) -> anyhow::Result<Option<EntryStat>>;

    async fn read_file(&self, path: &str) -> anyhow::Result<Vec<u8>>;

    async fn write_file(&self, path: &str, data: &[u8]) -> anyhow::Result<()>;

    async fn unlink(&self, path: &str) -> anyhow::Result<()>;

    async fn mkdir(&self, path: &str) -> anyhow::Result<()>;

    /// Entry names directly inside `path` (not full paths), unordered;
    /// callers sort before use since the diff engine requires lexicographic
    /// walk order.
    async fn readdir(&self, path: &str) -> anyhow::Result<Vec<String>>;

    async fn read_manifest(&self) -> anyhow::Result<serde_json::Value>;

    async fn write_manifest(&self, manifest: &serde_json::Value) -> anyhow::Result<()>;

    /// A change-notification stream; the receiver end of an
    /// implementation-owned channel. Dropping the receiver unsubscribes.
    async fn watch(&self) -> anyhow::Result<mpsc::Receiver<ArchiveChangeEvent>>;

    async fn size(&self, path: &str) -> anyhow::Result<u64>;
}
