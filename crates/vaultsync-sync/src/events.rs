//! ## Event Bus
//!
//! A `tokio::sync::broadcast` channel so a CLI, a daemon status reporter,
//! and a test can each subscribe independently: the event emitter fires
//! exactly once per successful sync without forcing a single consumer.
//! Grounded on the donor workspace's `lnxdrive-telemetry` event-fanout
//! shape, generalized from metrics counters to the sync/merge/error topics
//! this engine emits.

use tokio::sync::broadcast;
use vaultsync_core::domain::archive_key::ArchiveKey;

/// Direction label attached to `sync`/`sync:<keyHex>` events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncDirection {
    Archive,
    Folder,
}

impl SyncDirection {
    pub fn as_str(self) -> &'static str {
        match self {
            SyncDirection::Archive => "archive",
            SyncDirection::Folder => "folder",
        }
    }
}

/// Events emitted on the core's event bus.
#[derive(Debug, Clone)]
pub enum SyncEvent {
    /// A completed sync, with the direction it ran in; subscribers filter
    /// by `archive` themselves rather than by topic string, since a typed
    /// enum makes that cheaper than per-topic channels.
    Sync {
        archive: ArchiveKey,
        direction: SyncDirection,
    },
    /// A completed initial merge.
    Merge { archive: ArchiveKey },
    /// Emitted only on cycle-detection failures.
    Error { archive: ArchiveKey, message: String },
}

const EVENT_BUS_CAPACITY: usize = 256;

/// Thin wrapper around a broadcast sender; `subscribe()` hands out
/// independent receivers, and a send with no subscribers is not an error
/// (mirrors `broadcast::Sender::send`'s own semantics).
#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<SyncEvent>,
}

impl EventBus {
    pub fn new() -> Self {
        let (tx, _rx) = broadcast::channel(EVENT_BUS_CAPACITY);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SyncEvent> {
        self.tx.subscribe()
    }

    pub fn emit(&self, event: SyncEvent) {
        // Ignore the `SendError<T>` carrying back the event when there are
        // no subscribers; that's an expected, not exceptional, state.
        let _ = self.tx.send(event);
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}
