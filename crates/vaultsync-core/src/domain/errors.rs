//! Caller-facing error kinds for the sync engine.
//!
//! Named after the semantic error kinds of the error-handling design, not
//! after implementation type names, following the same `thiserror` +
//! inline `Display` test convention as the donor workspace's `DomainError`.

use thiserror::Error;

#[derive(Debug, Error, Clone)]
pub enum SyncError {
    #[error("path not found: {path}")]
    NotFound { path: String },

    #[error("path is not a directory: {path}")]
    NotAFolder { path: String },

    #[error("path is protected and cannot be written: {path}")]
    ProtectedFileNotWritable { path: String },

    #[error("archive is not writable")]
    ArchiveNotWritable,

    #[error("content is not valid UTF-8 text: {path}")]
    InvalidEncoding { path: String },

    #[error("file exceeds the textual diff size limit: {path} ({size} bytes)")]
    SourceTooLarge { path: String, size: u64 },

    #[error("symlink cycle detected at {path}")]
    CycleError { path: String },

    #[error("invalid archive key: {reason}")]
    InvalidArchiveKey { reason: String },

    #[error("invalid path: {reason}")]
    InvalidPath { reason: String },

    /// An adapter (filesystem, archive implementation) failed; the message
    /// is the adapter error's rendered context, not a typed variant, matching
    /// the donor's `anyhow::Result` port boundary.
    #[error("adapter error: {0}")]
    Adapter(String),
}

impl SyncError {
    pub fn adapter(err: anyhow::Error) -> Self {
        Self::Adapter(format!("{err:#}"))
    }
}
