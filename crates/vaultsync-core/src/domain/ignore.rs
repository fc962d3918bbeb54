//! ## Ignore-Rule Filter
//!
//! A gitignore-style ruleset plus the whitelist variant derived from
//! `opts.paths`. Pattern matching is grounded on the
//! donor workspace's `lnxdrive-conflict::policy::PolicyEngine`, which
//! evaluates `glob::Pattern` rules against relative paths; here the match
//! is "does any rule match any ancestor prefix of this path" rather than
//! first-match-wins resolution strategy selection.

use std::sync::Arc;

use crate::domain::archive_key::ArchiveKey;

/// An ordered set of glob patterns loaded from `.datignore`. Patterns are
/// matched against a path and against every ancestor prefix of that path,
/// so a bare `node_modules` rule excludes the whole subtree.
#[derive(Debug, Default)]
pub struct IgnoreRuleset {
    patterns: Vec<glob::Pattern>,
}

impl IgnoreRuleset {
    pub fn empty() -> Self {
        Self {
            patterns: Vec::new(),
        }
    }

    /// Parses line-oriented ignore-file text: blank lines and `#` comments
    /// are skipped, and a leading `/` is stripped since this crate's paths
    /// are always root-relative without one.
    pub fn parse(text: &str) -> Self {
        let patterns = text
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty() && !line.starts_with('#'))
            .map(|line| line.trim_start_matches('/'))
            .filter_map(|line| glob::Pattern::new(line).ok())
            .collect();
        Self { patterns }
    }

    /// True if `path` or any ancestor prefix of `path` matches a rule.
    pub fn is_ignored(&self, path: &str) -> bool {
        let mut prefix = String::new();
        for part in path.split('/').filter(|s| !s.is_empty()) {
            if prefix.is_empty() {
                prefix.push_str(part);
            } else {
                prefix.push('/');
                prefix.push_str(part);
            }
            if self.patterns.iter().any(|p| p.matches(&prefix)) {
                return true;
            }
        }
        false
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }
}

/// Derived from either the archive's ignore ruleset or an explicit
/// whitelist (`opts.paths`); `diff`'s `filter(path) -> bool` contract is
/// `is_excluded`, not `is_included`, so the whitelist variant inverts its
/// own inclusion predicate internally.
#[derive(Clone)]
pub enum PathFilter {
    None,
    Ignore(Arc<IgnoreRuleset>),
    Whitelist(Arc<Vec<String>>),
}

impl PathFilter {
    pub fn is_excluded(&self, path: &str) -> bool {
        match self {
            PathFilter::None => false,
            PathFilter::Ignore(ruleset) => ruleset.is_ignored(path),
            PathFilter::Whitelist(entries) => !whitelist_includes(path, entries),
        }
    }
}

/// A path is included iff it equals a whitelist entry, lies strictly
/// inside an entry that ends in `/`, or is a proper ancestor of an entry
/// (so a diff walk can descend through it to reach the entry).
fn whitelist_includes(path: &str, entries: &[String]) -> bool {
    entries.iter().any(|entry| {
        if path == entry {
            return true;
        }
        if let Some(dir) = entry.strip_suffix('/') {
            if path.starts_with(dir) && path[dir.len()..].starts_with('/') {
                return true;
            }
        }
        entry.starts_with(&format!("{path}/"))
    })
}

pub fn ignore_file_name() -> &'static str {
    ".datignore"
}

pub fn manifest_file_name() -> &'static str {
    "dat.json"
}

/// Event topic helper, `sync:<keyHex>` / `merge:<keyHex>`.
pub fn keyed_topic(prefix: &str, key: &ArchiveKey) -> String {
    format!("{prefix}:{}", key.to_hex())
}
