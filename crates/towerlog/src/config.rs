//! Data root resolution and the optional `config.json` inside it

use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::error::ConfigError;
use crate::report::MIN_MATCHED_FIELDS;

pub const ROOT_ENV: &str = "TOWERLOG_ROOT";
pub const CONFIG_FILE: &str = "config.json";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
  /// Recognised fields a paste needs before it counts as a report
  #[serde(default = "default_min_matched_fields")]
  pub min_matched_fields: usize,
  /// `tracing` filter directive used when `RUST_LOG` is unset
  #[serde(default = "default_log_filter")]
  pub log_filter: String,
}

fn default_min_matched_fields() -> usize {
  MIN_MATCHED_FIELDS
}
fn default_log_filter() -> String {
  "warn".to_string()
}

impl Default for Config {
  fn default() -> Self {
    Self { min_matched_fields: default_min_matched_fields(), log_filter: default_log_filter() }
  }
}

impl Config {
  pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&content)?)
  }

  /// `<root>/config.json` when present, defaults otherwise
  pub fn load(root: &Path) -> Result<Self, ConfigError> {
    let path = root.join(CONFIG_FILE);
    if !path.exists() {
      debug!(path = %path.display(), "No config file, using defaults");
      return Ok(Self::default());
    }
    Self::load_from_file(path)
  }
}

/// `$TOWERLOG_ROOT`, else `~/.towerlog`
pub fn get_data_root() -> Result<PathBuf, ConfigError> {
  if let Ok(dir) = env::var(ROOT_ENV) {
    if !dir.is_empty() {
      return Ok(PathBuf::from(dir));
    }
  }

  let home = dirs::home_dir().ok_or(ConfigError::NoHomeDirectory)?;
  Ok(home.join(".towerlog"))
}

#[cfg(test)]
mod tests {
  use super::*;
  use tempfile::TempDir;

  #[test]
  fn test_missing_file_gives_defaults() {
    let temp = TempDir::new().unwrap();
    let config = Config::load(temp.path()).unwrap();
    assert_eq!(config, Config::default());
    assert_eq!(config.min_matched_fields, 3);
    assert_eq!(config.log_filter, "warn");
  }

  #[test]
  fn test_partial_file_keeps_other_defaults() {
    let temp = TempDir::new().unwrap();
    std::fs::write(temp.path().join(CONFIG_FILE), r#"{"min_matched_fields": 5}"#).unwrap();

    let config = Config::load(temp.path()).unwrap();
    assert_eq!(config.min_matched_fields, 5);
    assert_eq!(config.log_filter, "warn");
  }

  #[test]
  fn test_invalid_file_is_an_error() {
    let temp = TempDir::new().unwrap();
    std::fs::write(temp.path().join(CONFIG_FILE), "not json").unwrap();
    assert!(matches!(Config::load(temp.path()), Err(ConfigError::Parse(_))));
  }
}
