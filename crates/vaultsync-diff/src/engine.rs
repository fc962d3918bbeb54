//! ## Tree Diff Algorithm
//!
//! Walks two [`DiffSource`] views in lexicographic order and produces the
//! ordered change list the sync coordinator applies. Grounded on the donor
//! workspace's delta-processing loop in `lnxdrive-sync::engine` (same
//! presence/type/stat comparison shape) generalized from a
//! remote-delta-token feed to a direct two-view walk, since this engine
//! has no server-side delta API to consume.

use std::collections::BTreeSet;

use tracing::{debug, warn};
use vaultsync_core::domain::diff::{Change, EntryKind, EntryStat};
use vaultsync_core::domain::errors::SyncError;
use vaultsync_core::domain::ignore::PathFilter;

use crate::cache::ContentCompareCache;
use crate::source::{join_rel, DiffSource};

/// Descent depth at which the walk gives up and reports a cycle. The
/// `DiffSource` ports have no symlink concept of their own, so a real
/// symlink loop on an adapter backed by the real filesystem would otherwise
/// show up here as unbounded recursion; this guard turns that into a
/// `CycleError` instead of a stack overflow.
const MAX_WALK_DEPTH: usize = 512;

#[derive(Debug)]
struct CycleDetected(String);

impl std::fmt::Display for CycleDetected {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "symlink cycle suspected at {}", self.0)
    }
}

impl std::error::Error for CycleDetected {}

/// Options controlling a single `diff` call.
#[derive(Clone)]
pub struct DiffOptions<'a> {
    /// When a directory differs, emit one directory-level change instead of
    /// descending into it. Default `true`.
    pub shallow: bool,
    /// When stats match, still read bodies (or cached fingerprints) before
    /// declaring equality. Default `true`.
    pub compare_content: bool,
    /// Excludes matching paths from the diff entirely, both sides.
    pub filter: PathFilter,
    /// Post-filter retaining only `add` changes.
    pub add_only: bool,
    /// Shared content-compare cache; `None` disables caching and reads
    /// bodies directly, used by one-shot callers that never attach a watcher.
    pub cache: Option<&'a ContentCompareCache>,
}

impl Default for DiffOptions<'_> {
    fn default() -> Self {
        Self {
            shallow: true,
            compare_content: true,
            filter: PathFilter::None,
            add_only: false,
            cache: None,
        }
    }
}

/// Walks `left` and `right`, producing changes that, applied left-to-right
/// onto `right`, reproduce `left`'s content. A single I/O failure aborts
/// the whole diff; partial diffs are never returned.
pub async fn diff(
    left: &dyn DiffSource,
    right: &dyn DiffSource,
    opts: &DiffOptions<'_>,
) -> Result<Vec<Change>, SyncError> {
    let mut out = Vec::new();
    if let Err(err) = walk(left, right, "", 0, opts, &mut out).await {
        return Err(match err.downcast_ref::<CycleDetected>() {
            Some(cycle) => SyncError::CycleError {
                path: cycle.0.clone(),
            },
            None => SyncError::adapter(err),
        });
    }
    if opts.add_only {
        out.retain(|c| matches!(c.kind, vaultsync_core::domain::diff::ChangeKind::Add));
    }
    debug!(changes = out.len(), "diff complete");
    Ok(out)
}

/// Applies a previously computed change list onto `right` by copying
/// bodies/directories from `left`. Applied in order: the diff walk emits
/// parent directories before their children and deepest removals
/// last-in-shallow or depth-first-for-removals, so a straight
/// left-to-right application never references a not-yet-created parent or
/// a not-yet-removed child.
pub async fn apply(
    left: &dyn DiffSource,
    right: &dyn DiffSource,
    changes: &[Change],
) -> Result<(), SyncError> {
    for change in changes {
        apply_one(left, right, change).await.map_err(SyncError::adapter)?;
    }
    Ok(())
}

async fn apply_one(left: &dyn DiffSource, right: &dyn DiffSource, change: &Change) -> anyhow::Result<()> {
    use vaultsync_core::domain::diff::ChangeKind;
    match change.kind {
        ChangeKind::Add | ChangeKind::Modify => match change.entry {
            EntryKind::Directory => right.mkdir(&change.path).await,
            EntryKind::File => {
                let data = left.read(&change.path).await?;
                right.write(&change.path, &data).await
            }
        },
        ChangeKind::Remove => right.remove(&change.path, change.entry).await,
    }
}

async fn walk(
    left: &dyn DiffSource,
    right: &dyn DiffSource,
    rel: &str,
    depth: usize,
    opts: &DiffOptions<'_>,
    out: &mut Vec<Change>,
) -> anyhow::Result<()> {
    if depth > MAX_WALK_DEPTH {
        return Err(CycleDetected(rel.to_string()).into());
    }

    let left_names = list_children(left, rel, opts).await?;
    let right_names = list_children(right, rel, opts).await?;

    let mut names: BTreeSet<String> = BTreeSet::new();
    names.extend(left_names);
    names.extend(right_names);

    for name in names {
        let child = join_rel(rel, &name);
        if opts.filter.is_excluded(&child) {
            continue;
        }
        diff_entry(left, right, &child, depth + 1, opts, out).await?;
    }
    Ok(())
}

async fn list_children(
    source: &dyn DiffSource,
    rel: &str,
    opts: &DiffOptions<'_>,
) -> anyhow::Result<Vec<String>> {
    match source.stat(rel).await? {
        Some(stat) if stat.is_dir() => {
            let mut names = source.readdir(rel).await?;
            names.retain(|name| !opts.filter.is_excluded(&join_rel(rel, name)));
            Ok(names)
        }
        _ => Ok(Vec::new()),
    }
}

async fn diff_entry(
    left: &dyn DiffSource,
    right: &dyn DiffSource,
    path: &str,
    depth: usize,
    opts: &DiffOptions<'_>,
    out: &mut Vec<Change>,
) -> anyhow::Result<()> {
    let left_stat = left.stat(path).await?;
    let right_stat = right.stat(path).await?;

    match (left_stat, right_stat) {
        (None, None) => {}
        (Some(l), None) => emit_one_sided(left, path, l, depth, ChangeSide::Add, opts, out).await?,
        (None, Some(r)) => emit_one_sided(right, path, r, depth, ChangeSide::Remove, opts, out).await?,
        (Some(l), Some(r)) => diff_present_both(left, right, path, l, r, depth, opts, out).await?,
    }
    Ok(())
}

enum ChangeSide {
    Add,
    Remove,
}

/// A path present on only one side: a directory is emitted as a single
/// change when shallow, otherwise its children are enumerated. Files are
/// always a single change regardless of `shallow`.
async fn emit_one_sided(
    source: &dyn DiffSource,
    path: &str,
    stat: EntryStat,
    depth: usize,
    side: ChangeSide,
    opts: &DiffOptions<'_>,
    out: &mut Vec<Change>,
) -> anyhow::Result<()> {
    if depth > MAX_WALK_DEPTH {
        return Err(CycleDetected(path.to_string()).into());
    }

    let push = |out: &mut Vec<Change>, path: String, kind: EntryKind| match side {
        ChangeSide::Add => out.push(Change::add(path, kind)),
        ChangeSide::Remove => out.push(Change::remove(path, kind)),
    };

    if stat.is_file() || opts.shallow {
        push(out, path.to_string(), stat.kind);
        return Ok(());
    }

    // shallow=false: enumerate descendants depth-first so each gets its own
    // change, deepest-first for removals (so a directory's children are
    // already gone before the directory entry itself is removed) and
    // shallowest-first for additions (so a directory exists before its
    // children are created inside it).
    let mut names = source.readdir(path).await?;
    names.sort();
    match side {
        ChangeSide::Add => {
            push(out, path.to_string(), stat.kind);
            for name in names {
                let child = join_rel(path, &name);
                if opts.filter.is_excluded(&child) {
                    continue;
                }
                if let Some(child_stat) = source.stat(&child).await? {
                    Box::pin(emit_one_sided(
                        source,
                        &child,
                        child_stat,
                        depth + 1,
                        ChangeSide::Add,
                        opts,
                        out,
                    ))
                    .await?;
                }
            }
        }
        ChangeSide::Remove => {
            for name in names {
                let child = join_rel(path, &name);
                if opts.filter.is_excluded(&child) {
                    continue;
                }
                if let Some(child_stat) = source.stat(&child).await? {
                    Box::pin(emit_one_sided(
                        source,
                        &child,
                        child_stat,
                        depth + 1,
                        ChangeSide::Remove,
                        opts,
                        out,
                    ))
                    .await?;
                }
            }
            push(out, path.to_string(), stat.kind);
        }
    }
    Ok(())
}

async fn diff_present_both(
    left: &dyn DiffSource,
    right: &dyn DiffSource,
    path: &str,
    left_stat: EntryStat,
    right_stat: EntryStat,
    depth: usize,
    opts: &DiffOptions<'_>,
    out: &mut Vec<Change>,
) -> anyhow::Result<()> {
    if left_stat.kind != right_stat.kind {
        out.push(Change::modify(path.to_string(), left_stat.kind));
        return Ok(());
    }

    if left_stat.is_dir() {
        return diff_directory(left, right, path, depth, opts, out).await;
    }

    let stats_match = left_stat.matches(&right_stat);
    if !opts.compare_content {
        // Equal stats imply equal content; mismatched stats imply modified,
        // with no content read either way.
        if !stats_match {
            out.push(Change::modify(path.to_string(), EntryKind::File));
        }
        return Ok(());
    }

    // `compareContent` is on: always verify bodies through the cache,
    // whether or not stats matched, so a stat-level false positive (same
    // size/mtime, touched content) and a stat-level false negative (mtime
    // bumped, content unchanged) both resolve on actual content equality.
    let equal = match opts.cache {
        Some(cache) => {
            cache
                .contents_equal(left, &left_stat, right, &right_stat, path)
                .await?
        }
        None => left.read(path).await? == right.read(path).await?,
    };
    if !equal {
        out.push(Change::modify(path.to_string(), EntryKind::File));
    }
    Ok(())
}

async fn diff_directory(
    left: &dyn DiffSource,
    right: &dyn DiffSource,
    path: &str,
    depth: usize,
    opts: &DiffOptions<'_>,
    out: &mut Vec<Change>,
) -> anyhow::Result<()> {
    if depth > MAX_WALK_DEPTH {
        return Err(CycleDetected(path.to_string()).into());
    }

    if opts.shallow {
        // A shallow diff only needs to know *that* the directory differs,
        // not how; descend just far enough to confirm a difference by
        // stat, without reading any file bodies, then collapse to one
        // directory-level change. A name-set comparison alone would miss a
        // file changed in place two levels down whose parent directories'
        // child lists are unchanged.
        if directory_differs(left, right, path, depth, opts).await? {
            out.push(Change::modify(path.to_string(), EntryKind::Directory));
        }
        return Ok(());
    }

    let before = out.len();
    Box::pin(walk(left, right, path, depth + 1, opts, out)).await?;
    if out.len() == before {
        debug!(path, "directory unchanged after descending");
    } else {
        warn!(path, "shallow=false directory diff descended; no directory-level change emitted");
    }
    Ok(())
}

/// Recursively checks whether `path` differs between `left` and `right`
/// by stat alone, without reading any file bodies, stopping as soon as a
/// difference is confirmed. Used by the shallow directory diff so it
/// collapses correctly on a change nested below the top level instead of
/// only noticing a changed child name.
async fn directory_differs(
    left: &dyn DiffSource,
    right: &dyn DiffSource,
    path: &str,
    depth: usize,
    opts: &DiffOptions<'_>,
) -> anyhow::Result<bool> {
    if depth > MAX_WALK_DEPTH {
        return Err(CycleDetected(path.to_string()).into());
    }

    let left_names: BTreeSet<String> = list_children(left, path, opts).await?.into_iter().collect();
    let right_names: BTreeSet<String> = list_children(right, path, opts).await?.into_iter().collect();
    if left_names != right_names {
        return Ok(true);
    }

    for name in left_names {
        let child = join_rel(path, &name);
        let left_stat = left.stat(&child).await?;
        let right_stat = right.stat(&child).await?;
        match (left_stat, right_stat) {
            (None, None) => {}
            (Some(_), None) | (None, Some(_)) => return Ok(true),
            (Some(l), Some(r)) => {
                if l.kind != r.kind {
                    return Ok(true);
                }
                if l.is_dir() {
                    if Box::pin(directory_differs(left, right, &child, depth + 1, opts)).await? {
                        return Ok(true);
                    }
                } else if !l.matches(&r) {
                    return Ok(true);
                }
            }
        }
    }
    Ok(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::collections::BTreeMap;
    use std::sync::Mutex;
    use vaultsync_core::domain::diff::{ChangeKind, Side};

    /// An in-memory tree keyed by root-relative path; directories are
    /// `None` entries, files carry their body. Good enough to exercise the
    /// walk without touching a real filesystem.
    #[derive(Default)]
    struct MemTree {
        side: Side,
        // path -> (is_dir, body, mtime)
        entries: Mutex<BTreeMap<String, (bool, Vec<u8>, i64)>>,
    }

    impl MemTree {
        fn new(side: Side) -> Self {
            Self {
                side,
                entries: Mutex::new(BTreeMap::new()),
            }
        }

        fn with_dir(self, path: &str) -> Self {
            self.entries
                .lock()
                .unwrap()
                .insert(path.to_string(), (true, Vec::new(), 0));
            self
        }

        fn with_file(self, path: &str, body: &str, mtime: i64) -> Self {
            self.entries
                .lock()
                .unwrap()
                .insert(path.to_string(), (false, body.as_bytes().to_vec(), mtime));
            self
        }
    }

    #[async_trait]
    impl DiffSource for MemTree {
        fn side(&self) -> Side {
            self.side
        }

        async fn stat(&self, rel: &str) -> anyhow::Result<Option<EntryStat>> {
            Ok(self.entries.lock().unwrap().get(rel).map(|(is_dir, body, mtime)| EntryStat {
                kind: if *is_dir { EntryKind::Directory } else { EntryKind::File },
                size: body.len() as u64,
                mtime_unix: *mtime,
            }))
        }

        async fn read(&self, rel: &str) -> anyhow::Result<Vec<u8>> {
            Ok(self
                .entries
                .lock()
                .unwrap()
                .get(rel)
                .map(|(_, body, _)| body.clone())
                .unwrap_or_default())
        }

        async fn readdir(&self, rel: &str) -> anyhow::Result<Vec<String>> {
            let prefix = if rel.is_empty() { String::new() } else { format!("{rel}/") };
            let entries = self.entries.lock().unwrap();
            let mut names = Vec::new();
            for key in entries.keys() {
                if let Some(child) = key.strip_prefix(&prefix) {
                    if !child.is_empty() && !child.contains('/') {
                        names.push(child.to_string());
                    }
                }
            }
            Ok(names)
        }

        async fn write(&self, rel: &str, data: &[u8]) -> anyhow::Result<()> {
            self.entries
                .lock()
                .unwrap()
                .insert(rel.to_string(), (false, data.to_vec(), 0));
            Ok(())
        }

        async fn mkdir(&self, rel: &str) -> anyhow::Result<()> {
            self.entries
                .lock()
                .unwrap()
                .insert(rel.to_string(), (true, Vec::new(), 0));
            Ok(())
        }

        async fn remove(&self, rel: &str, _kind: EntryKind) -> anyhow::Result<()> {
            self.entries.lock().unwrap().remove(rel);
            Ok(())
        }
    }

    fn opts() -> DiffOptions<'static> {
        DiffOptions::default()
    }

    #[tokio::test]
    async fn diff_is_deterministic_across_runs() {
        let left = MemTree::new(Side::Left).with_file("a.txt", "1", 1);
        let right = MemTree::new(Side::Right);
        let first = diff(&left, &right, &opts()).await.unwrap();
        let second = diff(&left, &right, &opts()).await.unwrap();
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn add_only_file_on_left_is_an_add() {
        let left = MemTree::new(Side::Left).with_file("a.txt", "1", 1);
        let right = MemTree::new(Side::Right);
        let changes = diff(&left, &right, &opts()).await.unwrap();
        assert_eq!(changes, vec![Change::add("a.txt", EntryKind::File)]);
    }

    #[tokio::test]
    async fn modified_file_is_detected_via_content_compare() {
        let left = MemTree::new(Side::Left).with_file("a.txt", "x", 1);
        let right = MemTree::new(Side::Right).with_file("a.txt", "y", 1);
        let changes = diff(&left, &right, &opts()).await.unwrap();
        assert_eq!(changes, vec![Change::modify("a.txt", EntryKind::File)]);
    }

    #[tokio::test]
    async fn identical_stats_and_content_produce_no_changes() {
        let left = MemTree::new(Side::Left).with_file("a.txt", "same", 1);
        let right = MemTree::new(Side::Right).with_file("a.txt", "same", 1);
        let changes = diff(&left, &right, &opts()).await.unwrap();
        assert!(changes.is_empty());
    }

    #[tokio::test]
    async fn without_compare_content_matching_stats_short_circuit_even_if_bodies_differ() {
        let left = MemTree::new(Side::Left).with_file("a.txt", "x", 1);
        let right = MemTree::new(Side::Right).with_file("a.txt", "y", 1);
        let mut o = opts();
        o.compare_content = false;
        let changes = diff(&left, &right, &o).await.unwrap();
        assert!(changes.is_empty());
    }

    #[tokio::test]
    async fn shallow_directory_diff_emits_single_change() {
        let left = MemTree::new(Side::Left)
            .with_dir("docs")
            .with_file("docs/a.txt", "1", 1)
            .with_file("docs/b.txt", "2", 1);
        let right = MemTree::new(Side::Right).with_dir("docs");
        let changes = diff(&left, &right, &opts()).await.unwrap();
        assert_eq!(changes, vec![Change::modify("docs", EntryKind::Directory)]);
    }

    #[tokio::test]
    async fn shallow_directory_diff_detects_a_nested_content_change_with_unchanged_names() {
        let left = MemTree::new(Side::Left)
            .with_dir("docs")
            .with_file("docs/a.txt", "v2", 2);
        let right = MemTree::new(Side::Right)
            .with_dir("docs")
            .with_file("docs/a.txt", "v1", 1);
        let changes = diff(&left, &right, &opts()).await.unwrap();
        assert_eq!(changes, vec![Change::modify("docs", EntryKind::Directory)]);
    }

    #[tokio::test]
    async fn shallow_directory_diff_with_identical_nested_content_emits_nothing() {
        let left = MemTree::new(Side::Left)
            .with_dir("docs")
            .with_file("docs/a.txt", "same", 1);
        let right = MemTree::new(Side::Right)
            .with_dir("docs")
            .with_file("docs/a.txt", "same", 1);
        let changes = diff(&left, &right, &opts()).await.unwrap();
        assert!(changes.is_empty());
    }

    #[tokio::test]
    async fn non_shallow_directory_diff_descends() {
        let left = MemTree::new(Side::Left)
            .with_dir("docs")
            .with_file("docs/a.txt", "1", 1)
            .with_file("docs/b.txt", "2", 1);
        let right = MemTree::new(Side::Right).with_dir("docs");
        let mut o = opts();
        o.shallow = false;
        let changes = diff(&left, &right, &o).await.unwrap();
        assert_eq!(
            changes,
            vec![
                Change::add("docs/a.txt", EntryKind::File),
                Change::add("docs/b.txt", EntryKind::File),
            ]
        );
    }

    #[tokio::test]
    async fn ignore_ruleset_excludes_whole_subtree() {
        use vaultsync_core::domain::ignore::IgnoreRuleset;
        use std::sync::Arc;

        let left = MemTree::new(Side::Left)
            .with_file("a.txt", "1", 1)
            .with_dir("node_modules")
            .with_file("node_modules/x", "_", 1);
        let right = MemTree::new(Side::Right);
        let ruleset = IgnoreRuleset::parse("node_modules\n");
        let mut o = opts();
        o.filter = PathFilter::Ignore(Arc::new(ruleset));
        let changes = diff(&left, &right, &o).await.unwrap();
        assert_eq!(changes, vec![Change::add("a.txt", EntryKind::File)]);
    }

    #[tokio::test]
    async fn add_only_retains_adds_and_drops_modify_and_remove() {
        let left = MemTree::new(Side::Left)
            .with_file("new.txt", "n", 1)
            .with_file("changed.txt", "x", 1);
        let right = MemTree::new(Side::Right)
            .with_file("changed.txt", "y", 1)
            .with_file("gone.txt", "g", 1);
        let mut o = opts();
        o.add_only = true;
        let changes = diff(&left, &right, &o).await.unwrap();
        assert_eq!(changes, vec![Change::add("new.txt", EntryKind::File)]);
        assert!(!changes.iter().any(|c| matches!(c.kind, ChangeKind::Modify | ChangeKind::Remove)));
    }

    #[tokio::test]
    async fn uses_shared_cache_when_provided() {
        let left = MemTree::new(Side::Left).with_file("a.txt", "same", 9);
        let right = MemTree::new(Side::Right).with_file("a.txt", "same", 9);
        let cache = ContentCompareCache::new();
        let mut o = opts();
        o.cache = Some(&cache);
        let changes = diff(&left, &right, &o).await.unwrap();
        assert!(changes.is_empty());
        assert!(cache.len() > 0);
    }

    #[tokio::test]
    async fn apply_copies_adds_and_modifies_then_a_second_diff_is_empty() {
        let left = MemTree::new(Side::Left)
            .with_file("a.txt", "1", 1)
            .with_file("b.txt", "2", 1);
        let right = MemTree::new(Side::Right).with_file("b.txt", "stale", 1);

        let changes = diff(&left, &right, &opts()).await.unwrap();
        apply(&left, &right, &changes).await.unwrap();

        let after = diff(&left, &right, &opts()).await.unwrap();
        assert!(after.is_empty(), "idempotent: re-diffing after apply finds nothing");
    }

    #[tokio::test]
    async fn apply_removes_files_absent_on_left() {
        let left = MemTree::new(Side::Left);
        let right = MemTree::new(Side::Right).with_file("gone.txt", "x", 1);

        let changes = diff(&left, &right, &opts()).await.unwrap();
        assert_eq!(changes, vec![Change::remove("gone.txt", EntryKind::File)]);
        apply(&left, &right, &changes).await.unwrap();
        assert!(right.stat("gone.txt").await.unwrap().is_none());
    }

    /// A directory that reports itself as its own single child forever,
    /// standing in for a symlink loop on a real filesystem adapter.
    struct InfiniteTree {
        side: Side,
    }

    #[async_trait]
    impl DiffSource for InfiniteTree {
        fn side(&self) -> Side {
            self.side
        }

        async fn stat(&self, _rel: &str) -> anyhow::Result<Option<EntryStat>> {
            Ok(Some(EntryStat {
                kind: EntryKind::Directory,
                size: 0,
                mtime_unix: 0,
            }))
        }

        async fn read(&self, _rel: &str) -> anyhow::Result<Vec<u8>> {
            Ok(Vec::new())
        }

        async fn readdir(&self, _rel: &str) -> anyhow::Result<Vec<String>> {
            Ok(vec!["loop".to_string()])
        }

        async fn write(&self, _rel: &str, _data: &[u8]) -> anyhow::Result<()> {
            Ok(())
        }

        async fn mkdir(&self, _rel: &str) -> anyhow::Result<()> {
            Ok(())
        }

        async fn remove(&self, _rel: &str, _kind: EntryKind) -> anyhow::Result<()> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn runaway_recursion_surfaces_as_cycle_error_not_a_stack_overflow() {
        let left = InfiniteTree { side: Side::Left };
        let right = MemTree::new(Side::Right);
        let mut o = opts();
        o.shallow = false;
        let err = diff(&left, &right, &o).await.unwrap_err();
        assert!(matches!(err, SyncError::CycleError { .. }));
    }
}
