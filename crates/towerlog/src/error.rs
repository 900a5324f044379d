use thiserror::Error;

/// Why a block of text did not produce a run record
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ReportError {
  #[error("Text does not look like a battle report (missing \"Battle\" or \"Wave\")")]
  NotAReport,

  #[error("Only {matched} field(s) recognised, at least {required} are needed")]
  TooFewFields { matched: usize, required: usize },
}

#[derive(Error, Debug)]
pub enum StoreError {
  #[error("Storage backend failed: {0}")]
  Io(#[from] std::io::Error),

  #[error("Could not serialize records: {0}")]
  Serialize(#[from] serde_json::Error),

  #[error("Malformed import payload: {message}")]
  MalformedImport { message: String },

  #[error("Unsupported export version {version} (expected {expected})")]
  UnsupportedVersion { version: u64, expected: u64 },

  #[error("Run has no battleDate and cannot be stored")]
  MissingBattleDate,

  #[error("No run with battleDate '{battle_date}'")]
  RunNotFound { battle_date: String },

  #[error("Another run already uses battleDate '{battle_date}'")]
  BattleDateConflict { battle_date: String },

  #[error("Invalid milestone: {message}")]
  InvalidMilestone { message: String },
}

impl StoreError {
  pub fn malformed_import(message: impl Into<String>) -> Self {
    Self::MalformedImport { message: message.into() }
  }

  pub fn run_not_found(battle_date: impl Into<String>) -> Self {
    Self::RunNotFound { battle_date: battle_date.into() }
  }

  pub fn battle_date_conflict(battle_date: impl Into<String>) -> Self {
    Self::BattleDateConflict { battle_date: battle_date.into() }
  }

  pub fn invalid_milestone(message: impl Into<String>) -> Self {
    Self::InvalidMilestone { message: message.into() }
  }
}

#[derive(Error, Debug)]
pub enum ConfigError {
  #[error("Could not find home directory")]
  NoHomeDirectory,

  #[error("Could not read config file: {0}")]
  Io(#[from] std::io::Error),

  #[error("Invalid config file: {0}")]
  Parse(#[from] serde_json::Error),
}

pub type StoreResult<T> = std::result::Result<T, StoreError>;
