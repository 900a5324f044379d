use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub const BATTLE_DATE: &str = "battleDate";
pub const ID: &str = "id";
pub const GAME_TIME_RAW: &str = "gameTimeRaw";
pub const REAL_TIME_RAW: &str = "realTimeRaw";
pub const GAME_TIME_SECONDS: &str = "gameTimeSeconds";
pub const REAL_TIME_SECONDS: &str = "realTimeSeconds";

/// A single stat value. `Null` keeps explicit nulls from older exports
/// round-tripping; readers treat it the same as a missing key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
  Number(f64),
  Text(String),
  Null,
}

impl FieldValue {
  pub fn as_number(&self) -> Option<f64> {
    match self {
      FieldValue::Number(value) => Some(*value),
      _ => None,
    }
  }

  pub fn as_text(&self) -> Option<&str> {
    match self {
      FieldValue::Text(value) => Some(value),
      _ => None,
    }
  }
}

impl From<Option<f64>> for FieldValue {
  fn from(value: Option<f64>) -> Self {
    value.map(FieldValue::Number).unwrap_or(FieldValue::Null)
  }
}

/// One completed game session
///
/// `battle_date` is the natural key every store operation deduplicates on.
/// `id` is a display label only and is never used for lookups.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunRecord {
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub battle_date: Option<String>,

  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub id: Option<String>,

  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub saved_at: Option<DateTime<Utc>>,

  #[serde(flatten)]
  pub fields: BTreeMap<String, FieldValue>,
}

impl RunRecord {
  pub fn new() -> Self {
    Self::default()
  }

  /// The dedup key, if the record has one; blank dates count as absent
  pub fn battle_date(&self) -> Option<&str> {
    self.battle_date.as_deref().filter(|date| !date.trim().is_empty())
  }

  /// Store a value under its report field name. `battleDate` and `id` land in
  /// their dedicated slots.
  pub fn insert(&mut self, key: &str, value: FieldValue) {
    match key {
      BATTLE_DATE => self.battle_date = value.as_text().map(str::to_string),
      ID => self.id = value.as_text().map(str::to_string),
      _ => {
        self.fields.insert(key.to_string(), value);
      }
    }
  }

  pub fn set_number(&mut self, key: &str, value: f64) {
    self.insert(key, FieldValue::Number(value));
  }

  pub fn set_text(&mut self, key: &str, value: impl Into<String>) {
    self.insert(key, FieldValue::Text(value.into()));
  }

  pub fn number(&self, key: &str) -> Option<f64> {
    self.fields.get(key).and_then(FieldValue::as_number)
  }

  pub fn text(&self, key: &str) -> Option<&str> {
    match key {
      BATTLE_DATE => self.battle_date(),
      ID => self.id.as_deref(),
      _ => self.fields.get(key).and_then(FieldValue::as_text),
    }
  }

  /// True when the key is absent or holds an explicit null
  pub fn is_missing(&self, key: &str) -> bool {
    match key {
      BATTLE_DATE => self.battle_date().is_none(),
      ID => self.id.is_none(),
      _ => matches!(self.fields.get(key), None | Some(FieldValue::Null)),
    }
  }

  pub fn tier(&self) -> Option<f64> {
    self.number("tier")
  }

  pub fn wave(&self) -> Option<f64> {
    self.number("wave")
  }

  pub fn killed_by(&self) -> Option<&str> {
    self.text("killedBy")
  }

  pub fn game_time_seconds(&self) -> Option<u64> {
    self.number(GAME_TIME_SECONDS).map(|seconds| seconds as u64)
  }

  pub fn real_time_seconds(&self) -> Option<u64> {
    self.number(REAL_TIME_SECONDS).map(|seconds| seconds as u64)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use serde_json::json;

  #[test]
  fn test_identity_fields_are_kept_apart_from_stats() {
    let mut run = RunRecord::new();
    run.set_text(BATTLE_DATE, "2024-01-01 10:00");
    run.set_text(ID, "label");
    run.set_number("wave", 1200.0);

    assert_eq!(run.battle_date(), Some("2024-01-01 10:00"));
    assert_eq!(run.id.as_deref(), Some("label"));
    assert!(!run.fields.contains_key(BATTLE_DATE));
    assert_eq!(run.wave(), Some(1200.0));
  }

  #[test]
  fn test_serializes_as_flat_camel_case_object() {
    let mut run = RunRecord::new();
    run.set_text(BATTLE_DATE, "Jan 01, 2024 10:00");
    run.set_number("coinsEarned", 2.46e9);
    run.set_text("killedBy", "Boss");

    let value = serde_json::to_value(&run).unwrap();
    assert_eq!(
      value,
      json!({"battleDate": "Jan 01, 2024 10:00", "coinsEarned": 2.46e9, "killedBy": "Boss"})
    );
  }

  #[test]
  fn test_blank_battle_date_is_missing() {
    let mut run = RunRecord::new();
    run.battle_date = Some("   ".to_string());

    assert_eq!(run.battle_date(), None);
    assert!(run.is_missing(BATTLE_DATE));
  }

  #[test]
  fn test_legacy_nulls_read_as_missing() {
    let run: RunRecord = serde_json::from_value(json!({
      "battleDate": "2024-01-01",
      "savedAt": "2024-01-02T03:04:05.000Z",
      "gameTimeSeconds": null,
      "tier": 7
    }))
    .unwrap();

    assert!(run.is_missing(GAME_TIME_SECONDS));
    assert!(run.is_missing("notThere"));
    assert_eq!(run.game_time_seconds(), None);
    assert_eq!(run.tier(), Some(7.0));
    assert!(run.saved_at.is_some());
  }
}
