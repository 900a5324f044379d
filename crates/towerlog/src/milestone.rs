use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{StoreError, StoreResult};

/// Game speed multipliers the lab can run at
pub const SPEED_MULTIPLIERS: [f64; 9] = [1.0, 1.5, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MilestoneKind {
  LabResearch,
}

/// Time as typed in by the user, before the speed multiplier
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnteredTime {
  #[serde(default)]
  pub days: u32,
  #[serde(default)]
  pub hours: u32,
  #[serde(default)]
  pub minutes: u32,
}

impl EnteredTime {
  pub fn new(days: u32, hours: u32, minutes: u32) -> Self {
    Self { days, hours, minutes }
  }

  pub fn total_minutes(&self) -> u64 {
    u64::from(self.days) * 24 * 60 + u64::from(self.hours) * 60 + u64::from(self.minutes)
  }

  pub fn is_zero(&self) -> bool {
    self.total_minutes() == 0
  }
}

/// A milestone before the store has given it an id
#[derive(Debug, Clone, PartialEq)]
pub struct NewMilestone {
  pub kind: MilestoneKind,
  pub category: String,
  pub name: String,
  pub entered_time: EnteredTime,
  pub multiplier: f64,
}

impl NewMilestone {
  pub fn lab_research(
    category: impl Into<String>,
    name: impl Into<String>,
    entered_time: EnteredTime,
    multiplier: f64,
  ) -> Self {
    Self {
      kind: MilestoneKind::LabResearch,
      category: category.into(),
      name: name.into(),
      entered_time,
      multiplier,
    }
  }

  pub fn validate(&self) -> StoreResult<()> {
    if self.name.trim().is_empty() {
      return Err(StoreError::invalid_milestone("name is required"));
    }
    if self.entered_time.is_zero() {
      return Err(StoreError::invalid_milestone("entered time must be greater than zero"));
    }
    if !self.multiplier.is_finite() || self.multiplier <= 0.0 {
      return Err(StoreError::invalid_milestone(format!(
        "speed multiplier must be positive, got {}",
        self.multiplier
      )));
    }
    Ok(())
  }

  /// `now` plus the entered time scaled down by the speed multiplier
  pub fn completion_at(&self, now: DateTime<Utc>) -> DateTime<Utc> {
    let entered_ms = self.entered_time.total_minutes() as f64 * 60_000.0;
    let adjusted_ms = (entered_ms / self.multiplier).trunc() as i64;
    now + Duration::milliseconds(adjusted_ms)
  }

  pub fn into_milestone(self, id: String, now: DateTime<Utc>) -> Milestone {
    let completion_timestamp = self.completion_at(now);
    Milestone {
      id,
      kind: self.kind,
      category: self.category,
      name: self.name,
      entered_time: self.entered_time,
      multiplier: self.multiplier,
      completion_timestamp,
      saved_at: now,
    }
  }
}

/// A stored, timed task
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Milestone {
  pub id: String,
  #[serde(rename = "type")]
  pub kind: MilestoneKind,
  pub category: String,
  pub name: String,
  pub entered_time: EnteredTime,
  pub multiplier: f64,
  pub completion_timestamp: DateTime<Utc>,
  pub saved_at: DateTime<Utc>,
}

impl Milestone {
  pub fn countdown(&self, now: DateTime<Utc>) -> Countdown {
    let remaining = self.completion_timestamp - now;
    if remaining <= Duration::zero() {
      return Countdown::Completed;
    }

    let total_minutes = remaining.num_minutes();
    Countdown::Remaining {
      days: total_minutes / (24 * 60),
      hours: (total_minutes % (24 * 60)) / 60,
      minutes: total_minutes % 60,
    }
  }

  pub fn is_complete(&self, now: DateTime<Utc>) -> bool {
    matches!(self.countdown(now), Countdown::Completed)
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Countdown {
  Remaining { days: i64, hours: i64, minutes: i64 },
  Completed,
}

impl fmt::Display for Countdown {
  /// `2d 3h 15m`; zero days and hours are dropped, minutes always shown
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Countdown::Completed => write!(f, "Completed"),
      Countdown::Remaining { days, hours, minutes } => {
        if *days > 0 {
          write!(f, "{days}d ")?;
        }
        if *hours > 0 {
          write!(f, "{hours}h ")?;
        }
        write!(f, "{minutes}m")
      }
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use chrono::TimeZone;

  fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 3, 1, 12, 0, 0).unwrap()
  }

  #[test]
  fn test_completion_is_scaled_by_multiplier() {
    let draft = NewMilestone::lab_research("Attack", "Damage", EnteredTime::new(1, 2, 0), 2.0);
    assert_eq!(draft.completion_at(now()), now() + Duration::hours(13));

    let draft = NewMilestone::lab_research("Utility", "Coins", EnteredTime::new(0, 0, 10), 1.5);
    assert_eq!(draft.completion_at(now()), now() + Duration::milliseconds(400_000));
  }

  #[test]
  fn test_validation() {
    let valid = NewMilestone::lab_research("Attack", "Damage", EnteredTime::new(0, 1, 0), 1.0);
    assert!(valid.validate().is_ok());

    let zero_time = NewMilestone { entered_time: EnteredTime::default(), ..valid.clone() };
    assert!(zero_time.validate().is_err());

    let zero_speed = NewMilestone { multiplier: 0.0, ..valid.clone() };
    assert!(zero_speed.validate().is_err());

    let unnamed = NewMilestone { name: "  ".to_string(), ..valid };
    assert!(unnamed.validate().is_err());
  }

  #[test]
  fn test_countdown_text() {
    let milestone = NewMilestone::lab_research("Attack", "Damage", EnteredTime::new(2, 3, 15), 1.0)
      .into_milestone("id-1".to_string(), now());

    assert_eq!(milestone.countdown(now()).to_string(), "2d 3h 15m");
    assert_eq!(milestone.countdown(now() + Duration::days(2)).to_string(), "3h 15m");
    assert_eq!(milestone.countdown(now() + Duration::minutes(2 * 24 * 60 + 3 * 60)).to_string(), "15m");
    assert_eq!(milestone.countdown(now() + Duration::days(3)), Countdown::Completed);
    assert!(milestone.is_complete(milestone.completion_timestamp));
  }

  #[test]
  fn test_serialized_shape() {
    let milestone = NewMilestone::lab_research("Attack", "Damage", EnteredTime::new(0, 1, 0), 1.0)
      .into_milestone("abc".to_string(), now());
    let value = serde_json::to_value(&milestone).unwrap();

    assert_eq!(value["type"], "lab_research");
    assert_eq!(value["enteredTime"]["hours"], 1);
    assert_eq!(value["completionTimestamp"], "2025-03-01T13:00:00Z");
    assert_eq!(value["savedAt"], "2025-03-01T12:00:00Z");
  }
}
