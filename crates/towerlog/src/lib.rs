//! Towerlog - battle report tracker for The Tower
//!
//! Turns pasted end-of-run battle reports into structured run records,
//! keeps them (and timed lab milestones) in a local key-value store, and
//! renders the numbers back in the game's abbreviated notation.

pub mod backend;
pub mod catalog;
pub mod commands;
pub mod config;
pub mod duration;
pub mod error;
pub mod extract;
pub mod milestone;
pub mod numeric;
pub mod record;
pub mod report;
pub mod store;

pub use backend::{FileStore, KeyValueStore, MemoryStore};
pub use error::{ConfigError, ReportError, StoreError, StoreResult};
pub use milestone::{Countdown, EnteredTime, Milestone, MilestoneKind, NewMilestone};
pub use record::{FieldValue, RunRecord};
pub use report::{parse_report, try_parse_report, ReportParser};
pub use store::{ImportSummary, RecordStore, SaveOutcome};
