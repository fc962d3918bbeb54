//! ## Watcher Lifecycle
//!
//! Attaches/detaches the recursive local watcher and the `.datignore`
//! watcher, and drives the debounce timer. Grounded on the donor
//! workspace's `lnxdrive-sync::watcher` (`FileWatcher`/
//! `DebouncedChangeQueue`) for the notify-crate wiring and debounce shape,
//! generalized from its `HashMap<PathBuf, (event, Instant)>` polling queue
//! to the explicit `SyncQueue` state machine in `queue.rs` plus one
//! `tokio::spawn` timer per debounce window, since this engine's debounce
//! is per-archive rather than per-path.

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use vaultsync_core::domain::events::ChangeNotificationKind;
use vaultsync_core::domain::ignore::{ignore_file_name, IgnoreRuleset};
use vaultsync_core::domain::settings::SyncSettings;

use crate::coordinator::SyncCoordinator;
use crate::events::EventBus;
use crate::merge::initial_merge;
use crate::queue::{NotifyOutcome, QueueDirection};
use crate::runtime::{ArchiveRuntime, SyncOpts};

/// Owns the watcher lifecycle for one archive. `configure_watcher` is the
/// re-entrant entry point; every other method here is a private helper it
/// calls in sequence.
pub struct WatcherSupervisor {
    runtime: Arc<ArchiveRuntime>,
    coordinator: Arc<SyncCoordinator>,
    events: EventBus,
    debounce: Duration,
}

impl WatcherSupervisor {
    pub fn new(
        runtime: Arc<ArchiveRuntime>,
        coordinator: Arc<SyncCoordinator>,
        events: EventBus,
        debounce: Duration,
    ) -> Self {
        Self {
            runtime,
            coordinator,
            events,
            debounce,
        }
    }

    /// Reconfigures the watcher based on current settings. Re-entrant:
    /// each invocation captures the generation at entry and checks it
    /// again after every suspension point, aborting silently if a newer
    /// call has since run.
    pub async fn configure_watcher(self: &Arc<Self>) {
        let generation = self.runtime.next_generation();

        self.teardown().await;
        if self.superseded(generation) {
            return;
        }

        let settings = self.runtime.settings.read().await.clone();
        let Some(settings) = settings else {
            debug!(archive = %self.runtime.key(), "no settings configured, watcher left torn down");
            return;
        };

        self.setup(generation, settings).await;
    }

    fn superseded(&self, generation: u64) -> bool {
        self.runtime.current_generation() != generation
    }

    /// Stop the previous watchers, cancel a pending debounce timer, and
    /// drop the queue's in-flight state.
    async fn teardown(&self) {
        let mut handles = self.runtime.watch_handles.lock().await;
        handles.root = None;
        handles.ignore_file = None;
        drop(handles);

        if let Some(cancel) = self.runtime.debounce_cancel.lock().await.take() {
            cancel.cancel();
        }
        self.runtime.queue.finish();
    }

    async fn setup(self: &Arc<Self>, generation: u64, settings: SyncSettings) {
        if settings.is_using_internal {
            if let Err(err) = self.runtime.local_fs.create_directory(&settings.path).await {
                warn!(path = %settings.path.display(), error = %err, "failed to create internal sync directory");
            }
        }

        let stat = match self.runtime.local_fs.stat(&settings.path).await {
            Ok(stat) => stat,
            Err(err) => {
                warn!(path = %settings.path.display(), error = %err, "failed to stat local root");
                None
            }
        };

        // Recreate the content-compare cache regardless of whether the path
        // exists, matching "still recreate the content-compare cache" in
        // the setup steps even on the missing-path early-out.
        self.runtime.cache.clear();

        if stat.is_none() {
            info!(path = %settings.path.display(), "local root missing; watchers not installed");
            return;
        }
        if self.superseded(generation) {
            return;
        }

        self.load_ignore_ruleset(&settings).await;
        if self.superseded(generation) {
            return;
        }
        self.attach_ignore_watcher(generation, &settings).await;
        if self.superseded(generation) {
            return;
        }

        if !settings.auto_publish {
            // Preview mode: one-shot add-only archive->folder sync, then done.
            let result = self
                .coordinator
                .sync_archive_to_folder(SyncOpts {
                    path: Some(settings.path.clone()),
                    add_only: true,
                    ..Default::default()
                })
                .await;
            if let Err(err) = result {
                warn!(archive = %self.runtime.key(), error = %err, "preview sync failed");
            }
            return;
        }

        if let Err(err) = initial_merge(
            &self.coordinator,
            &self.runtime.archive,
            &self.runtime.local_fs,
            &self.events,
            &settings.path,
        )
        .await
        {
            warn!(archive = %self.runtime.key(), error = %err, "initial merge failed");
        }
        if self.superseded(generation) {
            return;
        }

        self.attach_root_watcher(generation, &settings).await;
    }

    async fn load_ignore_ruleset(&self, settings: &SyncSettings) {
        let ignore_path = settings.path.join(ignore_file_name());
        let ruleset = match self.runtime.local_fs.read_file(&ignore_path).await {
            Ok(bytes) => {
                let text = String::from_utf8_lossy(&bytes);
                IgnoreRuleset::parse(&text)
            }
            Err(_) => IgnoreRuleset::empty(),
        };
        *self.runtime.ignore.write().await = Arc::new(ruleset);
    }

    async fn attach_ignore_watcher(self: &Arc<Self>, generation: u64, settings: &SyncSettings) {
        let ignore_path = settings.path.join(ignore_file_name());
        let watch = self.runtime.local_fs.watch(&ignore_path).await;
        let Ok((handle, mut rx)) = watch else {
            warn!(path = %ignore_path.display(), "failed to attach .datignore watcher");
            return;
        };

        self.runtime.watch_handles.lock().await.ignore_file = Some(handle);

        let this = Arc::clone(self);
        let settings = settings.clone();
        tokio::spawn(async move {
            while let Some(_event) = rx.recv().await {
                if this.superseded(generation) {
                    return;
                }
                this.load_ignore_ruleset(&settings).await;
            }
        });
    }

    async fn attach_root_watcher(self: &Arc<Self>, generation: u64, settings: &SyncSettings) {
        let watch = self.runtime.local_fs.watch(&settings.path).await;
        let Ok((handle, mut rx)) = watch else {
            warn!(path = %settings.path.display(), "failed to attach recursive root watcher");
            return;
        };

        self.runtime.watch_handles.lock().await.root = Some(handle);

        let this = Arc::clone(self);
        tokio::spawn(async move {
            while let Some(_event) = rx.recv().await {
                if this.superseded(generation) {
                    return;
                }
                this.on_notify(QueueDirection::ToArchive).await;
            }
        });
    }

    /// Feeds a single notification into the debounce state machine, arming
    /// or resetting the 500 ms timer as the state it was in dictates.
    pub async fn on_notify(self: &Arc<Self>, direction: QueueDirection) {
        match self.runtime.queue.notify(direction) {
            NotifyOutcome::Dropped => {}
            NotifyOutcome::ResetTimer => {
                if let Some(cancel) = self.runtime.debounce_cancel.lock().await.take() {
                    cancel.cancel();
                }
                self.arm_timer().await;
            }
            NotifyOutcome::StartTimer => {
                self.arm_timer().await;
            }
        }
    }

    async fn arm_timer(self: &Arc<Self>) {
        let cancel = CancellationToken::new();
        *self.runtime.debounce_cancel.lock().await = Some(cancel.clone());

        let this = Arc::clone(self);
        let debounce = self.debounce;
        tokio::spawn(async move {
            tokio::select! {
                _ = cancel.cancelled() => {}
                _ = tokio::time::sleep(debounce) => {
                    this.fire().await;
                }
            }
        });
    }

    async fn fire(self: &Arc<Self>) {
        *self.runtime.debounce_cancel.lock().await = None;

        let Some(pending) = self.runtime.queue.fire() else {
            return;
        };

        // Re-stat the local root before launching; if it's gone, tear the
        // watcher down and abort the launch.
        let path = self.runtime.settings.read().await.as_ref().map(|s| s.path.clone());
        let Some(path) = path else {
            self.runtime.queue.finish();
            return;
        };
        match self.runtime.local_fs.stat(&path).await {
            Ok(Some(_)) => {}
            _ => {
                warn!(path = %path.display(), "local root missing at debounce fire; tearing down watcher");
                self.teardown().await;
                self.configure_watcher().await;
                return;
            }
        }

        let to_archive = matches!(pending.resolve(), QueueDirection::ToArchive);
        let opts = SyncOpts {
            path: Some(path),
            ..Default::default()
        };
        let result = if to_archive {
            self.coordinator.sync_folder_to_archive(opts).await
        } else {
            self.coordinator.sync_archive_to_folder(opts).await
        };
        if let Err(err) = result {
            debug!(archive = %self.runtime.key(), error = %err, "debounced sync ended with an error");
        }
        self.runtime.queue.finish();
    }

    /// Feeds an archive-side notification: the archive's change stream
    /// feeds the queue with a folder-bound direction when auto-publish is
    /// on, or in preview mode triggers a narrow archive-to-folder sync
    /// directly, bypassing the queue entirely.
    pub async fn on_archive_change(self: &Arc<Self>, _kind: ChangeNotificationKind, changed_path: String) {
        let settings = self.runtime.settings.read().await.clone();
        let Some(settings) = settings else { return };

        if settings.auto_publish {
            self.on_notify(QueueDirection::ToFolder).await;
            return;
        }

        let result = self
            .coordinator
            .sync_archive_to_folder(SyncOpts {
                path: Some(settings.path),
                paths: Some(vec![changed_path]),
                add_only: false,
            })
            .await;
        if let Err(err) = result {
            warn!(archive = %self.runtime.key(), error = %err, "preview-mode direct sync failed");
        }
    }
}
