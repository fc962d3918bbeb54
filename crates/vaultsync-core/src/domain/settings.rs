//! Per-archive sync settings.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// `{ path, autoPublish, isUsingInternal } | none`. `None` at the call site
/// is represented as `Option<SyncSettings>`, not as a variant here, so the
/// "no local mirror" case is a plain `Option::None` the borrow checker
/// forces every caller to handle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncSettings {
    pub path: PathBuf,
    pub auto_publish: bool,
    pub is_using_internal: bool,
}

impl SyncSettings {
    pub fn user_chosen(path: PathBuf, auto_publish: bool) -> Self {
        Self {
            path,
            auto_publish,
            is_using_internal: false,
        }
    }

    /// Preview mode: a system-managed staging folder; `autoPublish` is
    /// always false for an internally-allocated path (glossary: "Preview mode").
    pub fn preview(path: PathBuf) -> Self {
        Self {
            path,
            auto_publish: false,
            is_using_internal: true,
        }
    }
}
