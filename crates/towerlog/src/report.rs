//! Battle report parsing: extraction, validity gate and derived fields
//!
//! The parser only builds records. Saving is left to the caller so a parsed
//! report can be previewed first.

use chrono::{DateTime, Utc};
use tracing::{debug, info};

use crate::duration;
use crate::error::ReportError;
use crate::extract;
use crate::record::{RunRecord, GAME_TIME_RAW, GAME_TIME_SECONDS, REAL_TIME_RAW, REAL_TIME_SECONDS};

/// Fewer recognised fields than this and the text is not treated as a report
pub const MIN_MATCHED_FIELDS: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReportParser {
  min_matched_fields: usize,
}

impl Default for ReportParser {
  fn default() -> Self {
    Self { min_matched_fields: MIN_MATCHED_FIELDS }
  }
}

impl ReportParser {
  pub fn new(min_matched_fields: usize) -> Self {
    Self { min_matched_fields }
  }

  pub fn min_matched_fields(&self) -> usize {
    self.min_matched_fields
  }

  pub fn parse(&self, text: &str) -> Result<RunRecord, ReportError> {
    self.parse_at(text, Utc::now())
  }

  /// Parse with an explicit creation time for the display id
  pub fn parse_at(&self, text: &str, created: DateTime<Utc>) -> Result<RunRecord, ReportError> {
    let extraction = extract::extract(text)?;
    if extraction.matched < self.min_matched_fields {
      debug!(matched = extraction.matched, required = self.min_matched_fields, "Rejecting report");
      return Err(ReportError::TooFewFields {
        matched: extraction.matched,
        required: self.min_matched_fields,
      });
    }

    let mut record = extraction.record;
    derive_seconds(&mut record, GAME_TIME_RAW, GAME_TIME_SECONDS);
    derive_seconds(&mut record, REAL_TIME_RAW, REAL_TIME_SECONDS);
    record.id = Some(display_id(&record, created));

    info!(
      battle_date = record.battle_date().unwrap_or_default(),
      matched = extraction.matched,
      "Parsed battle report"
    );
    Ok(record)
  }
}

fn derive_seconds(record: &mut RunRecord, raw_key: &str, seconds_key: &str) {
  if let Some(seconds) = record.text(raw_key).and_then(duration::decode) {
    record.set_number(seconds_key, seconds as f64);
  }
}

/// `{battleDate}_{tier}_{wave}_{millis}`, empty parts for missing or zero values
fn display_id(record: &RunRecord, created: DateTime<Utc>) -> String {
  let part = |value: Option<f64>| match value {
    Some(value) if value != 0.0 => value.to_string(),
    _ => String::new(),
  };

  format!(
    "{}_{}_{}_{}",
    record.battle_date().unwrap_or_default(),
    part(record.tier()),
    part(record.wave()),
    created.timestamp_millis()
  )
}

/// Parse with the default threshold, keeping the failure reason
pub fn try_parse_report(text: &str) -> Result<RunRecord, ReportError> {
  ReportParser::default().parse(text)
}

/// Parse with the default threshold; `None` means nothing to preview or save
pub fn parse_report(text: &str) -> Option<RunRecord> {
  try_parse_report(text).ok()
}
