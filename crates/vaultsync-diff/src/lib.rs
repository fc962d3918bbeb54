//! The diff algorithm and the on-demand diff APIs built on top of it:
//! `diff`/`apply`, the content-compare cache, and a line-level textual
//! diff with binary/size guards.

pub mod cache;
pub mod engine;
pub mod source;
pub mod textdiff;

pub use cache::ContentCompareCache;
pub use engine::{apply, diff, DiffOptions};
pub use source::{ArchiveView, DiffSource, LocalView};
pub use textdiff::{diff_file, FileDiff, Hunk};
