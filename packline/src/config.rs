use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::WorkConfig;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_log_path")]
    pub log_path: PathBuf,

    #[serde(default)]
    pub work: WorkConfig,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            log_path: default_log_path(),
            work: WorkConfig::default(),
        }
    }
}

fn default_log_path() -> PathBuf {
    PathBuf::from("log.txt")
}

impl Config {
    pub fn load(path: impl AsRef<Path>) -> eyre::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }
}
