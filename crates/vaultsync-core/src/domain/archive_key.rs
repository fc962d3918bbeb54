//! Archive identity.
//!
//! Mirrors the validation-at-construction style of the donor workspace's
//! `UniqueId`/`SyncPath` newtypes (`Display`/`FromStr`/`From<inner>`, a
//! `DomainError`-shaped failure on malformed input) but wraps a raw 32-byte
//! key instead of a `Uuid`, per the "stable 32-byte key" data model.

use std::fmt;
use std::str::FromStr;

use crate::domain::errors::SyncError;

/// Stable 32-byte identifier for an archive.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct ArchiveKey([u8; 32]);

impl ArchiveKey {
    pub fn new(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    pub fn from_hex(hex: &str) -> Result<Self, SyncError> {
        if hex.len() != 64 {
            return Err(SyncError::InvalidArchiveKey {
                reason: format!("expected 64 hex characters, got {}", hex.len()),
            });
        }
        let mut bytes = [0u8; 32];
        for (i, byte) in bytes.iter_mut().enumerate() {
            let slice = &hex[i * 2..i * 2 + 2];
            *byte = u8::from_str_radix(slice, 16).map_err(|_| SyncError::InvalidArchiveKey {
                reason: format!("non-hex digit pair `{slice}`"),
            })?;
        }
        Ok(Self(bytes))
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Lowercase hex rendering, used for the `"sync:<hex>"` lock name and
    /// the `sync:<keyHex>`/`merge:<keyHex>` event topics.
    pub fn to_hex(&self) -> String {
        let mut out = String::with_capacity(64);
        for byte in &self.0 {
            out.push_str(&format!("{byte:02x}"));
        }
        out
    }

    pub fn lock_name(&self) -> String {
        format!("sync:{}", self.to_hex())
    }
}

impl fmt::Display for ArchiveKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl fmt::Debug for ArchiveKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ArchiveKey({})", self.to_hex())
    }
}

impl FromStr for ArchiveKey {
    type Err = SyncError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_hex(s)
    }
}

impl From<[u8; 32]> for ArchiveKey {
    fn from(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }
}
