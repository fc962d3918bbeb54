//! ## Sync Coordinator
//!
//! `sync_archive_to_folder`, `sync_folder_to_archive`, and the
//! diff-listing / diff-file preview operations, all under the per-archive
//! lock. Grounded on the donor workspace's `lnxdrive-sync::engine::
//! SyncEngine`: same acquire-lock / diff / apply / emit-event shape,
//! generalized from a remote-delta feed to the two-view
//! `vaultsync_diff::diff`/`apply` pair since this engine has no server-side
//! delta token to consume.

use std::path::Path;
use std::sync::Arc;

use tracing::{info, warn};
use vaultsync_core::domain::diff::{Change, Side};
use vaultsync_core::domain::errors::SyncError;
use vaultsync_core::domain::ignore::PathFilter;
use vaultsync_diff::{diff, diff_file, DiffOptions, FileDiff};
use vaultsync_core::config::SyncTuning;

use crate::events::{EventBus, SyncDirection, SyncEvent};
use crate::lock::LockRegistry;
use crate::runtime::{ArchiveRuntime, SyncOpts};
use vaultsync_diff::source::{ArchiveView, LocalView};

/// The sync coordinator for one archive. Stateless beyond the shared
/// handles it's constructed with; all per-archive mutable state lives in
/// the `ArchiveRuntime` it's given.
pub struct SyncCoordinator {
    runtime: Arc<ArchiveRuntime>,
    locks: LockRegistry,
    events: EventBus,
    tuning: SyncTuning,
}

impl SyncCoordinator {
    pub fn new(runtime: Arc<ArchiveRuntime>, locks: LockRegistry, events: EventBus, tuning: SyncTuning) -> Self {
        Self {
            runtime,
            locks,
            events,
            tuning,
        }
    }

    /// `syncArchiveToFolder(archive, opts)`.
    pub async fn sync_archive_to_folder(&self, opts: SyncOpts) -> Result<(), SyncError> {
        self.sync(false, opts).await
    }

    /// `syncFolderToArchive(archive, opts)`. Precondition: the archive is
    /// writable.
    pub async fn sync_folder_to_archive(&self, opts: SyncOpts) -> Result<(), SyncError> {
        if !self.runtime.archive.writable() {
            return Err(SyncError::ArchiveNotWritable);
        }
        self.sync(true, opts).await
    }

    /// `sync(archive, toArchive, opts)`: the internal common path.
    async fn sync(&self, to_archive: bool, opts: SyncOpts) -> Result<(), SyncError> {
        let Some(path) = self.runtime.resolve_path(&opts).await else {
            // "absence fails the operation silently (logged, not raised)".
            info!(archive = %self.runtime.key(), "sync skipped: no local path configured");
            return Ok(());
        };

        let key = self.runtime.key();
        let guard = self.locks.acquire(&key).await;
        guard.enter_sync();
        let result = self.sync_locked(to_archive, &path, &opts).await;
        guard.exit_sync();

        match &result {
            Ok(()) => {
                let direction = if to_archive { SyncDirection::Archive } else { SyncDirection::Folder };
                self.events.emit(SyncEvent::Sync { archive: key, direction });
            }
            Err(SyncError::CycleError { .. }) => {
                self.events.emit(SyncEvent::Error {
                    archive: key,
                    message: result.as_ref().unwrap_err().to_string(),
                });
            }
            Err(err) => {
                // "Failure to apply is caught, logged, and swallowed -- the
                // lock still releases." Everything but a cycle error is
                // logged only; the caller already gets it back as a
                // `Result`, the debouncer-driven path just never calls
                // `.unwrap()` on it.
                warn!(archive = %key, error = %err, "sync failed");
            }
        }
        result
    }

    async fn sync_locked(&self, to_archive: bool, path: &Path, opts: &SyncOpts) -> Result<(), SyncError> {
        let (local_side, archive_side) = if to_archive { (Side::Left, Side::Right) } else { (Side::Right, Side::Left) };
        let local = LocalView::new(self.runtime.local_fs.clone(), path.to_path_buf(), local_side);
        let archive = ArchiveView::new(self.runtime.archive.clone(), archive_side);

        let filter = self.build_filter(opts).await;
        let diff_opts = DiffOptions {
            // A sync must apply at file granularity, not collapse a
            // differing directory into one change, so unlike the default
            // preview-oriented `DiffOptions`, this path always descends.
            shallow: false,
            compare_content: true,
            filter,
            add_only: opts.add_only,
            cache: Some(&self.runtime.cache),
        };

        let changes: Vec<Change> = if to_archive {
            diff(&local, &archive, &diff_opts).await?
        } else {
            diff(&archive, &local, &diff_opts).await?
        };

        if to_archive {
            vaultsync_diff::apply(&local, &archive, &changes).await
        } else {
            vaultsync_diff::apply(&archive, &local, &changes).await
        }
    }

    async fn build_filter(&self, opts: &SyncOpts) -> PathFilter {
        if let Some(paths) = &opts.paths {
            return PathFilter::Whitelist(Arc::new(paths.clone()));
        }
        let ignore = self.runtime.ignore.read().await.clone();
        if ignore.is_empty() {
            PathFilter::None
        } else {
            PathFilter::Ignore(ignore)
        }
    }

    /// Returns the change list without applying it. Acquires the
    /// per-archive lock to see a consistent snapshot, but does not touch
    /// the active-sync count -- it isn't a sync.
    pub async fn diff_listing(&self, to_archive: bool, opts: SyncOpts) -> Result<Vec<Change>, SyncError> {
        let path = self
            .runtime
            .resolve_path(&opts)
            .await
            .ok_or_else(|| SyncError::NotFound { path: String::new() })?;

        let key = self.runtime.key();
        let _guard = self.locks.acquire(&key).await;

        let (local_side, archive_side) = if to_archive { (Side::Left, Side::Right) } else { (Side::Right, Side::Left) };
        let local = LocalView::new(self.runtime.local_fs.clone(), path, local_side);
        let archive = ArchiveView::new(self.runtime.archive.clone(), archive_side);
        let filter = self.build_filter(&opts).await;
        let diff_opts = DiffOptions {
            shallow: true,
            compare_content: true,
            filter,
            add_only: opts.add_only,
            cache: Some(&self.runtime.cache),
        };

        if to_archive {
            diff(&local, &archive, &diff_opts).await
        } else {
            diff(&archive, &local, &diff_opts).await
        }
    }

    /// Line-level diff between the local and archive copies of `path`.
    pub async fn diff_file(&self, path: &str, opts: SyncOpts) -> Result<FileDiff, SyncError> {
        let local_root = self
            .runtime
            .resolve_path(&opts)
            .await
            .ok_or_else(|| SyncError::NotFound { path: path.to_string() })?;

        let key = self.runtime.key();
        let _guard = self.locks.acquire(&key).await;

        let local = LocalView::new(self.runtime.local_fs.clone(), local_root, Side::Left);
        let archive = ArchiveView::new(self.runtime.archive.clone(), Side::Right);
        diff_file(&local, &archive, path, &self.tuning).await
    }
}
