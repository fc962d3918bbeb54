//! Engine configuration, loaded from YAML the same way the donor
//! workspace's `lnxdrive-core::config::Config` composes typed sub-structs
//! and deserializes them with `serde_yaml`. Scoped to exactly the sync
//! tunables and disallowed-path list this engine has a counterpart for:
//! no OAuth, FUSE, or rate-limiting sections.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::domain::errors::SyncError;

const DEFAULT_DEBOUNCE_MS: u64 = 500;
const DEFAULT_MAX_DIFF_FILE_BYTES: u64 = 100 * 1024;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncTuning {
    /// The debounce window: starts at the first notification and resets
    /// on each subsequent one.
    pub debounce_ms: u64,
    /// Size guard for the line-level diff-file preview: 100 KiB by default.
    pub max_diff_file_bytes: u64,
    /// Filename-extension half of the mime sniffer contract
    /// (`isFileNameBinary`); content sniffing is done unconditionally in
    /// code and is not configurable.
    pub binary_extensions: Vec<String>,
}

impl Default for SyncTuning {
    fn default() -> Self {
        Self {
            debounce_ms: DEFAULT_DEBOUNCE_MS,
            max_diff_file_bytes: DEFAULT_MAX_DIFF_FILE_BYTES,
            binary_extensions: default_binary_extensions(),
        }
    }
}

impl SyncTuning {
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }
}

fn default_binary_extensions() -> Vec<String> {
    [
        "png", "jpg", "jpeg", "gif", "bmp", "ico", "webp", "zip", "tar", "gz", "bz2", "xz", "7z",
        "exe", "dll", "so", "dylib", "pdf", "mp3", "mp4", "mov", "avi", "mkv", "wav", "flac",
        "sqlite", "db", "woff", "woff2", "ttf", "otf",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

/// Process-wide paths that must never be chosen as a local sync root.
/// Initialized once at startup; read-only thereafter.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DisallowedPaths {
    pub paths: Vec<PathBuf>,
}

impl DisallowedPaths {
    pub fn contains(&self, path: &std::path::Path) -> bool {
        self.paths.iter().any(|p| p == path)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub sync: SyncTuning,
    pub disallowed_paths: DisallowedPaths,
}

impl Config {
    pub fn from_yaml(text: &str) -> Result<Self, SyncError> {
        serde_yaml::from_str(text).map_err(|err| SyncError::InvalidPath {
            reason: format!("malformed config: {err}"),
        })
    }

    pub fn to_yaml(&self) -> Result<String, SyncError> {
        serde_yaml::to_string(self).map_err(|err| SyncError::InvalidPath {
            reason: format!("could not serialize config: {err}"),
        })
    }

    /// Load configuration from a YAML file at `path`.
    pub fn load(path: &std::path::Path) -> Result<Self, SyncError> {
        let text = std::fs::read_to_string(path).map_err(|err| SyncError::InvalidPath {
            reason: format!("could not read {}: {err}", path.display()),
        })?;
        Self::from_yaml(&text)
    }

    /// Try to load from `path`; fall back to [`Config::default`] on any error.
    pub fn load_or_default(path: &std::path::Path) -> Self {
        Self::load(path).unwrap_or_default()
    }

    /// Platform-appropriate default path for the configuration file,
    /// typically `$XDG_CONFIG_HOME/vaultsync/config.yaml` on Linux.
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("~/.config"))
            .join("vaultsync")
            .join("config.yaml")
    }
}
