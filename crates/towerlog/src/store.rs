//! Run and milestone collections over a [`KeyValueStore`]
//!
//! Runs are keyed by `battleDate`, milestones by their generated id. Every
//! mutation is a full read-modify-write of one collection and assumes a single
//! writer.

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashSet;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::backend::KeyValueStore;
use crate::catalog::recency_key;
use crate::error::{StoreError, StoreResult};
use crate::milestone::{Milestone, NewMilestone};
use crate::record::RunRecord;

pub const RUNS_KEY: &str = "tower-stats-history";
pub const MILESTONES_KEY: &str = "tower-stats-milestones";
/// Shared by every key this store owns
pub const KEY_PREFIX: &str = "tower-stats-";
pub const EXPORT_VERSION: u64 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SaveOutcome {
  /// An existing run with the same `battleDate` was overwritten in place
  pub was_duplicate: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ImportSummary {
  pub runs_added: usize,
  pub runs_skipped: usize,
  pub milestones_added: usize,
  pub milestones_skipped: usize,
}

/// The export file layout
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportDocument {
  pub version: u64,
  pub runs: Vec<RunRecord>,
  pub milestones: Vec<Milestone>,
}

pub struct RecordStore<B: KeyValueStore> {
  backend: B,
  clock: fn() -> DateTime<Utc>,
}

impl<B: KeyValueStore> RecordStore<B> {
  pub fn new(backend: B) -> Self {
    Self { backend, clock: Utc::now }
  }

  /// Replace the time source used for `savedAt` stamps
  pub fn with_clock(mut self, clock: fn() -> DateTime<Utc>) -> Self {
    self.clock = clock;
    self
  }

  pub fn backend(&self) -> &B {
    &self.backend
  }

  pub fn into_backend(self) -> B {
    self.backend
  }

  fn now(&self) -> DateTime<Utc> {
    (self.clock)()
  }

  /// Unreadable or corrupted data reads as an empty collection
  fn read_collection<T: DeserializeOwned>(&self, key: &str) -> Vec<T> {
    let raw = match self.backend.get(key) {
      Ok(Some(raw)) => raw,
      Ok(None) => return Vec::new(),
      Err(e) => {
        warn!(key, error = %e, "Store unavailable, reading as empty");
        return Vec::new();
      }
    };

    serde_json::from_str(&raw).unwrap_or_else(|e| {
      warn!(key, error = %e, "Stored collection is corrupted, reading as empty");
      Vec::new()
    })
  }

  fn write_collection<T: Serialize>(&mut self, key: &str, items: &[T]) -> StoreResult<()> {
    let raw = serde_json::to_string(items)?;
    self.backend.set(key, &raw)?;
    Ok(())
  }

  // --- runs -----------------------------------------------------------------

  /// Most recently written first; not sorted by `battleDate`
  pub fn runs(&self) -> Vec<RunRecord> {
    self.read_collection(RUNS_KEY)
  }

  pub fn find_run(&self, battle_date: &str) -> Option<RunRecord> {
    self.runs().into_iter().find(|run| run.battle_date() == Some(battle_date))
  }

  /// Insert a run, or overwrite the one with the same `battleDate` in place
  ///
  /// A blank `battleDate` is treated as missing. If the stored collection
  /// cannot be read it is taken as empty and this write replaces it.
  pub fn save_run(&mut self, mut record: RunRecord) -> StoreResult<SaveOutcome> {
    let battle_date = record.battle_date().ok_or(StoreError::MissingBattleDate)?.to_string();
    record.saved_at = Some(self.now());

    let mut runs = self.runs();
    let was_duplicate = match runs.iter_mut().find(|run| run.battle_date() == Some(battle_date.as_str())) {
      Some(existing) => {
        *existing = record;
        true
      }
      None => {
        runs.insert(0, record);
        false
      }
    };

    self.write_collection(RUNS_KEY, &runs)?;
    info!(battle_date = %battle_date, was_duplicate, total = runs.len(), "Saved run");
    Ok(SaveOutcome { was_duplicate })
  }

  /// Returns whether a run was removed
  pub fn delete_run(&mut self, battle_date: &str) -> StoreResult<bool> {
    let mut runs = self.runs();
    let before = runs.len();
    runs.retain(|run| run.battle_date() != Some(battle_date));
    if runs.len() == before {
      debug!(battle_date, "No run to delete");
      return Ok(false);
    }

    self.write_collection(RUNS_KEY, &runs)?;
    info!(battle_date, "Deleted run");
    Ok(true)
  }

  /// Replace the run found under `original_battle_date` with `body`
  ///
  /// The body may carry a different `battleDate`; it must not be one another
  /// run already uses.
  pub fn update_run(&mut self, original_battle_date: &str, mut body: RunRecord) -> StoreResult<()> {
    let mut runs = self.runs();
    let index = runs
      .iter()
      .position(|run| run.battle_date() == Some(original_battle_date))
      .ok_or_else(|| StoreError::run_not_found(original_battle_date))?;

    let new_battle_date = body.battle_date().ok_or(StoreError::MissingBattleDate)?.to_string();
    let collides = runs
      .iter()
      .enumerate()
      .any(|(position, run)| position != index && run.battle_date() == Some(new_battle_date.as_str()));
    if collides {
      return Err(StoreError::battle_date_conflict(new_battle_date));
    }

    body.saved_at = Some(self.now());
    runs[index] = body;
    self.write_collection(RUNS_KEY, &runs)?;
    info!(from = original_battle_date, to = %new_battle_date, "Updated run");
    Ok(())
  }

  pub fn clear_runs(&mut self) -> StoreResult<()> {
    self.backend.remove(RUNS_KEY)?;
    info!("Cleared all runs");
    Ok(())
  }

  // --- milestones -----------------------------------------------------------

  /// Most recently saved first
  pub fn milestones(&self) -> Vec<Milestone> {
    self.read_collection(MILESTONES_KEY)
  }

  /// Always inserts, under a freshly generated id
  pub fn save_milestone(&mut self, draft: NewMilestone) -> StoreResult<Milestone> {
    draft.validate()?;

    let milestone = draft.into_milestone(Uuid::new_v4().to_string(), self.now());
    let mut milestones = self.milestones();
    milestones.insert(0, milestone.clone());
    self.write_collection(MILESTONES_KEY, &milestones)?;

    info!(id = %milestone.id, name = %milestone.name, "Saved milestone");
    Ok(milestone)
  }

  /// Returns whether a milestone was removed
  pub fn delete_milestone(&mut self, id: &str) -> StoreResult<bool> {
    let mut milestones = self.milestones();
    let before = milestones.len();
    milestones.retain(|milestone| milestone.id != id);
    if milestones.len() == before {
      return Ok(false);
    }

    self.write_collection(MILESTONES_KEY, &milestones)?;
    info!(id, "Deleted milestone");
    Ok(true)
  }

  pub fn clear_milestones(&mut self) -> StoreResult<()> {
    self.backend.remove(MILESTONES_KEY)?;
    info!("Cleared all milestones");
    Ok(())
  }

  /// Drop both collections
  pub fn clear_all(&mut self) -> StoreResult<usize> {
    let removed = self.backend.remove_prefix(KEY_PREFIX)?;
    info!(removed, "Cleared store");
    Ok(removed)
  }

  // --- export / import ------------------------------------------------------

  pub fn export_all(&self) -> StoreResult<String> {
    let document =
      ExportDocument { version: EXPORT_VERSION, runs: self.runs(), milestones: self.milestones() };
    Ok(serde_json::to_string_pretty(&document)?)
  }

  /// Merge an export (or a legacy bare array of runs) into the store
  ///
  /// Entries whose key is missing or already stored are skipped; existing
  /// data always wins. The payload is fully parsed before anything is
  /// written, and a failed milestone write puts the previous runs back.
  /// Merged runs are ordered newest battle first.
  ///
  /// An unreadable stored collection is taken as empty and replaced.
  pub fn import_all(&mut self, text: &str) -> StoreResult<ImportSummary> {
    let payload = ImportPayload::parse(text)?;
    let mut summary = ImportSummary::default();

    let previous_runs = self.runs();
    let mut runs = previous_runs.clone();
    let mut known_dates: HashSet<String> =
      runs.iter().filter_map(|run| run.battle_date().map(str::to_string)).collect();
    for run in payload.runs {
      let accepted = match run.battle_date() {
        Some(battle_date) => known_dates.insert(battle_date.to_string()),
        None => false,
      };
      if accepted {
        runs.push(run);
        summary.runs_added += 1;
      } else {
        debug!(battle_date = run.battle_date().unwrap_or_default(), "Skipping imported run");
        summary.runs_skipped += 1;
      }
    }

    let mut milestones = self.milestones();
    let mut known_ids: HashSet<String> = milestones.iter().map(|milestone| milestone.id.clone()).collect();
    summary.milestones_skipped = payload.milestones_without_id;
    for milestone in payload.milestones {
      if known_ids.insert(milestone.id.clone()) {
        milestones.push(milestone);
        summary.milestones_added += 1;
      } else {
        debug!(id = %milestone.id, "Skipping imported milestone");
        summary.milestones_skipped += 1;
      }
    }

    if summary.runs_added > 0 {
      runs.sort_by_cached_key(|run| recency_key(run.battle_date()));
      self.write_collection(RUNS_KEY, &runs)?;
    }
    if summary.milestones_added > 0 {
      milestones.sort_by(|a, b| b.saved_at.cmp(&a.saved_at));
      if let Err(e) = self.write_collection(MILESTONES_KEY, &milestones) {
        if summary.runs_added > 0 {
          self.restore_runs(&previous_runs);
        }
        return Err(e);
      }
    }

    if summary.runs_skipped > 0 || summary.milestones_skipped > 0 {
      warn!(
        runs_skipped = summary.runs_skipped,
        milestones_skipped = summary.milestones_skipped,
        "Some imported entries were already stored or had no key"
      );
    }
    info!(
      runs_added = summary.runs_added,
      milestones_added = summary.milestones_added,
      "Import finished"
    );
    Ok(summary)
  }

  fn restore_runs(&mut self, previous: &[RunRecord]) {
    let restored = if previous.is_empty() {
      self.backend.remove(RUNS_KEY).map_err(StoreError::from)
    } else {
      self.write_collection(RUNS_KEY, previous)
    };
    match restored {
      Ok(()) => warn!("Milestone import failed, previous runs restored"),
      Err(e) => warn!(error = %e, "Milestone import failed and previous runs could not be restored"),
    }
  }
}

/// A validated import, ready to merge
struct ImportPayload {
  runs: Vec<RunRecord>,
  milestones: Vec<Milestone>,
  milestones_without_id: usize,
}

impl ImportPayload {
  fn parse(text: &str) -> StoreResult<Self> {
    let payload: Value = serde_json::from_str(text)
      .map_err(|e| StoreError::malformed_import(format!("not valid JSON: {e}")))?;

    let (runs, milestones) = match payload {
      Value::Array(runs) => (runs, Vec::new()),
      Value::Object(mut object) => {
        check_version(object.get("version"))?;
        let runs = take_array(&mut object, "runs")?;
        let milestones = take_array(&mut object, "milestones")?;
        if runs.is_none() && milestones.is_none() {
          return Err(StoreError::malformed_import("object has neither \"runs\" nor \"milestones\""));
        }
        (runs.unwrap_or_default(), milestones.unwrap_or_default())
      }
      _ => return Err(StoreError::malformed_import("expected an array of runs or an export object")),
    };

    let runs = runs
      .into_iter()
      .enumerate()
      .map(|(index, value)| {
        serde_json::from_value::<RunRecord>(value)
          .map_err(|e| StoreError::malformed_import(format!("run #{index}: {e}")))
      })
      .collect::<StoreResult<Vec<_>>>()?;

    let mut milestones_without_id = 0;
    let mut parsed_milestones = Vec::new();
    for (index, value) in milestones.into_iter().enumerate() {
      if !has_id(&value) {
        milestones_without_id += 1;
        continue;
      }
      let milestone = serde_json::from_value::<Milestone>(value)
        .map_err(|e| StoreError::malformed_import(format!("milestone #{index}: {e}")))?;
      parsed_milestones.push(milestone);
    }

    Ok(Self { runs, milestones: parsed_milestones, milestones_without_id })
  }
}

fn check_version(version: Option<&Value>) -> StoreResult<()> {
  let Some(version) = version else {
    return Ok(());
  };

  let version = version
    .as_u64()
    .ok_or_else(|| StoreError::malformed_import("\"version\" must be a non-negative integer"))?;
  if version > EXPORT_VERSION {
    return Err(StoreError::UnsupportedVersion { version, expected: EXPORT_VERSION });
  }
  Ok(())
}

fn take_array(object: &mut serde_json::Map<String, Value>, field: &str) -> StoreResult<Option<Vec<Value>>> {
  match object.remove(field) {
    None | Some(Value::Null) => Ok(None),
    Some(Value::Array(items)) => Ok(Some(items)),
    Some(_) => Err(StoreError::malformed_import(format!("\"{field}\" must be an array"))),
  }
}

fn has_id(value: &Value) -> bool {
  matches!(value.get("id"), Some(Value::String(id)) if !id.is_empty())
}
