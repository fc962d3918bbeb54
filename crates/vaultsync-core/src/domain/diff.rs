//! Shared data types produced by the diff engine and consumed by the sync
//! coordinator, CLI, and tests. Kept in `core` (rather than the `diff`
//! crate) because the coordinator and CLI need them without depending on
//! the diff algorithm itself.

use serde::{Deserialize, Serialize};

/// Which side of a two-view comparison an entry or cached fingerprint
/// belongs to. Part of the content-compare cache key `(path, size, mtime, side)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Side {
    Left,
    Right,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntryKind {
    File,
    Directory,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChangeKind {
    Add,
    Modify,
    Remove,
}

/// A single entry in the ordered change list `diff(left, right, opts)`
/// produces. `path` is slash-separated and relative to the roots of both
/// views being compared.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Change {
    pub kind: ChangeKind,
    pub path: String,
    pub entry: EntryKind,
}

impl Change {
    pub fn add(path: impl Into<String>, entry: EntryKind) -> Self {
        Self {
            kind: ChangeKind::Add,
            path: path.into(),
            entry,
        }
    }

    pub fn modify(path: impl Into<String>, entry: EntryKind) -> Self {
        Self {
            kind: ChangeKind::Modify,
            path: path.into(),
            entry,
        }
    }

    pub fn remove(path: impl Into<String>, entry: EntryKind) -> Self {
        Self {
            kind: ChangeKind::Remove,
            path: path.into(),
            entry,
        }
    }
}

/// Stat information used to decide presence/type/content-equality during a
/// diff walk. `mtime_unix` is whole seconds, matching the coarse mtime
/// granularity most filesystems and archive backends actually expose.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntryStat {
    pub kind: EntryKind,
    pub size: u64,
    pub mtime_unix: i64,
}

impl EntryStat {
    pub fn is_dir(&self) -> bool {
        matches!(self.kind, EntryKind::Directory)
    }

    pub fn is_file(&self) -> bool {
        matches!(self.kind, EntryKind::File)
    }

    /// Two stats are equal enough to skip a content read when `compareContent`
    /// is false, or to decide whether to consult the content-compare cache
    /// at all when it is true.
    pub fn matches(&self, other: &EntryStat) -> bool {
        self.kind == other.kind && self.size == other.size && self.mtime_unix == other.mtime_unix
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stats_match_on_kind_size_mtime() {
        let a = EntryStat {
            kind: EntryKind::File,
            size: 10,
            mtime_unix: 100,
        };
        let b = a;
        assert!(a.matches(&b));
    }

    #[test]
    fn stats_differ_on_size() {
        let a = EntryStat {
            kind: EntryKind::File,
            size: 10,
            mtime_unix: 100,
        };
        let b = EntryStat {
            size: 11,
            ..a
        };
        assert!(!a.matches(&b));
    }

    #[test]
    fn change_constructors_set_kind() {
        let c = Change::add("a.txt", EntryKind::File);
        assert_eq!(c.kind, ChangeKind::Add);
        assert_eq!(c.path, "a.txt");
    }
}
