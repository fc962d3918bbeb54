//! ## Debounce State Machine
//!
//! A pure state machine over `{empty, pending, syncing}`, deliberately
//! free of any timer or async runtime dependency so its transitions can be
//! exercised with plain `#[test]`s. The actual 500 ms timer lives one layer
//! up, in `watcher::ArchiveWatch`, which owns the `tokio::spawn` + `sleep`
//! + cancellation plumbing and calls `fire`/`finish` at the right moments.

use std::sync::Mutex;

/// Which direction a single notification is for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueueDirection {
    ToArchive,
    ToFolder,
}

#[derive(Debug, Default, Clone, Copy)]
struct QueueState {
    to_archive: bool,
    to_folder: bool,
    syncing: bool,
}

/// What a caller should do after `notify` returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotifyOutcome {
    /// The queue was empty; arm a fresh debounce timer.
    StartTimer,
    /// The queue was already pending; reset the existing timer.
    ResetTimer,
    /// A sync is in flight; the notification is recorded nowhere and has
    /// no effect on the eventual sync.
    Dropped,
}

/// Snapshot of the directions pending at the instant the debounce timer
/// fired, taken under the queue's lock and with the live flags reset to
/// `false` before the lock is released, so the coordinator never re-reads
/// the live queue fields after the suspension point its own call
/// introduces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PendingDirections {
    pub to_archive: bool,
    pub to_folder: bool,
}

impl PendingDirections {
    /// Local wins when both directions raced into the same debounce window:
    /// run folder->archive only.
    pub fn resolve(self) -> QueueDirection {
        if self.to_archive {
            QueueDirection::ToArchive
        } else {
            QueueDirection::ToFolder
        }
    }
}

/// The queue object itself: one instance per archive, for the archive's
/// lifetime.
#[derive(Default)]
pub struct SyncQueue {
    state: Mutex<QueueState>,
}

impl SyncQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a single directional notification against the queue.
    pub fn notify(&self, direction: QueueDirection) -> NotifyOutcome {
        let mut state = self.state.lock().unwrap();
        if state.syncing {
            return NotifyOutcome::Dropped;
        }
        let was_pending = state.to_archive || state.to_folder;
        match direction {
            QueueDirection::ToArchive => state.to_archive = true,
            QueueDirection::ToFolder => state.to_folder = true,
        }
        if was_pending {
            NotifyOutcome::ResetTimer
        } else {
            NotifyOutcome::StartTimer
        }
    }

    /// Fires the debounce timer: snapshots and clears the pending flags,
    /// marks the queue syncing, and returns the snapshot. Returns `None` if
    /// nothing is pending (the timer fired after a racing `finish` already
    /// cleared the queue) so the caller does not launch a sync for nothing.
    pub fn fire(&self) -> Option<PendingDirections> {
        let mut state = self.state.lock().unwrap();
        if !state.to_archive && !state.to_folder {
            return None;
        }
        let pending = PendingDirections {
            to_archive: state.to_archive,
            to_folder: state.to_folder,
        };
        state.to_archive = false;
        state.to_folder = false;
        state.syncing = true;
        Some(pending)
    }

    /// Marks the sync as finished, replacing the queue's state with a
    /// fresh one so the next notification starts a clean debounce cycle.
    pub fn finish(&self) {
        let mut state = self.state.lock().unwrap();
        *state = QueueState::default();
    }

    pub fn is_syncing(&self) -> bool {
        self.state.lock().unwrap().syncing
    }
}
