//! ## Per-Archive Shared State
//!
//! Settings, queue, cache, and watcher handles are exclusively owned by the
//! archive handle they annotate. `ArchiveRuntime` bundles exactly that set
//! so the coordinator, the watcher lifecycle, and the diff APIs all operate
//! on one shared instance per archive instead of threading five separate
//! handles.

use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;
use vaultsync_core::domain::archive_key::ArchiveKey;
use vaultsync_core::domain::ignore::IgnoreRuleset;
use vaultsync_core::domain::settings::SyncSettings;
use vaultsync_core::ports::archive::ArchivePort;
use vaultsync_core::ports::local_fs::{LocalFilesystemPort, WatchHandle};
use vaultsync_diff::ContentCompareCache;

use crate::queue::SyncQueue;

/// Request parameters shared by both sync directions and by the
/// diff-listing preview.
#[derive(Debug, Clone, Default)]
pub struct SyncOpts {
    /// Overrides the archive's configured `settings.path` for this call.
    pub path: Option<PathBuf>,
    /// When present, diffing uses the whitelist filter instead of the
    /// ignore ruleset.
    pub paths: Option<Vec<String>>,
    /// Post-filter retaining only `add` changes.
    pub add_only: bool,
}

/// Holds the two watch handles a fully-configured archive attaches: the
/// recursive root watcher and the narrower `.datignore` watcher. Dropping
/// either handle tears down the corresponding OS watch.
#[derive(Default)]
pub struct WatchHandles {
    pub root: Option<WatchHandle>,
    pub ignore_file: Option<WatchHandle>,
}

/// Everything the sync engine owns for one archive, for the archive's
/// lifetime. `generation` is the monotone call counter that lets a
/// `configure_watcher` invocation detect that a newer invocation has
/// superseded it after a suspension point.
pub struct ArchiveRuntime {
    pub archive: Arc<dyn ArchivePort>,
    pub local_fs: Arc<dyn LocalFilesystemPort>,
    pub settings: RwLock<Option<SyncSettings>>,
    pub ignore: RwLock<Arc<IgnoreRuleset>>,
    pub cache: ContentCompareCache,
    pub queue: SyncQueue,
    pub watch_handles: tokio::sync::Mutex<WatchHandles>,
    /// Cancels the currently pending debounce timer task, if any; teardown
    /// cancels it before dropping the queue.
    pub debounce_cancel: tokio::sync::Mutex<Option<CancellationToken>>,
    generation: AtomicU64,
}

impl ArchiveRuntime {
    pub fn new(archive: Arc<dyn ArchivePort>, local_fs: Arc<dyn LocalFilesystemPort>) -> Self {
        Self {
            archive,
            local_fs,
            settings: RwLock::new(None),
            ignore: RwLock::new(Arc::new(IgnoreRuleset::empty())),
            cache: ContentCompareCache::new(),
            queue: SyncQueue::new(),
            watch_handles: tokio::sync::Mutex::new(WatchHandles::default()),
            debounce_cancel: tokio::sync::Mutex::new(None),
            generation: AtomicU64::new(0),
        }
    }

    pub fn key(&self) -> ArchiveKey {
        self.archive.key()
    }

    /// Bumps and returns the new generation, invalidating any in-flight
    /// `configure_watcher` call that captured an earlier value.
    pub fn next_generation(&self) -> u64 {
        self.generation.fetch_add(1, Ordering::SeqCst) + 1
    }

    pub fn current_generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }

    /// Resolves the local root for a call: `opts.path` if supplied, else
    /// the archive's configured `settings.path`. `None` means the
    /// operation has nothing to do and the caller should log and return
    /// silently rather than raise.
    pub async fn resolve_path(&self, opts: &SyncOpts) -> Option<PathBuf> {
        if let Some(path) = &opts.path {
            return Some(path.clone());
        }
        self.settings.read().await.as_ref().map(|s| s.path.clone())
    }
}
