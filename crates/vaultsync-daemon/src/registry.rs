//! The daemon's own archive registry: a small YAML list of folder/archive
//! pairs to attach at startup. The core persists no state of its own --
//! this file is purely how this particular binary decides what to attach,
//! the same way the donor workspace's daemon would read its accounts
//! table before building a `SyncEngine` per account.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArchivePairConfig {
    pub folder: PathBuf,
    pub archive_dir: PathBuf,
    #[serde(default)]
    pub writable: bool,
    #[serde(default = "default_auto_publish")]
    pub auto_publish: bool,
}

fn default_auto_publish() -> bool {
    true
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Registry {
    #[serde(default)]
    pub archives: Vec<ArchivePairConfig>,
}

impl Registry {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Ok(serde_yaml::from_str(&text)?)
    }

    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("~/.config"))
            .join("vaultsync")
            .join("archives.yaml")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_a_minimal_pair() {
        let yaml = "archives:\n  - folder: /home/user/vault\n    archive_dir: /srv/archive\n    writable: true\n";
        let registry: Registry = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(registry.archives.len(), 1);
        assert!(registry.archives[0].writable);
        assert!(registry.archives[0].auto_publish);
    }

    #[test]
    fn missing_file_is_an_error_not_a_default() {
        let result = Registry::load(Path::new("/nonexistent/vaultsync-archives.yaml"));
        assert!(result.is_err());
    }
}
