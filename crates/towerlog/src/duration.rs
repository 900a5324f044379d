//! Compound durations such as `22h 42m 35s`

use once_cell::sync::Lazy;
use regex::Regex;

use crate::numeric::PLACEHOLDER;

static HOURS: Lazy<Regex> = Lazy::new(|| Regex::new(r"(\d+)h").expect("hours pattern is valid"));
static MINUTES: Lazy<Regex> = Lazy::new(|| Regex::new(r"(\d+)m").expect("minutes pattern is valid"));
static SECONDS: Lazy<Regex> = Lazy::new(|| Regex::new(r"(\d+)s").expect("seconds pattern is valid"));

fn component(pattern: &Regex, text: &str) -> u64 {
  pattern
    .captures(text)
    .and_then(|caps| caps.get(1))
    .and_then(|m| m.as_str().parse::<u64>().ok())
    .unwrap_or(0)
}

/// Total seconds in a duration string
///
/// Each component is optional and may appear anywhere. Returns `None` when no
/// component is present or they add up to zero.
pub fn decode(text: &str) -> Option<u64> {
  let hours = component(&HOURS, text);
  let minutes = component(&MINUTES, text);
  let seconds = component(&SECONDS, text);

  let total = hours.saturating_mul(3600).saturating_add(minutes.saturating_mul(60)).saturating_add(seconds);
  (total > 0).then_some(total)
}

/// Always renders all three components, e.g. `0h 5m 0s`
pub fn encode(total_seconds: u64) -> String {
  let hours = total_seconds / 3600;
  let minutes = (total_seconds % 3600) / 60;
  let seconds = total_seconds % 60;
  format!("{hours}h {minutes}m {seconds}s")
}

pub fn encode_optional(total_seconds: Option<u64>) -> String {
  total_seconds.map(encode).unwrap_or_else(|| PLACEHOLDER.to_string())
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_decode_full_duration() {
    assert_eq!(decode("22h 42m 35s"), Some(22 * 3600 + 42 * 60 + 35));
    assert_eq!(decode("1h 2m 3s"), Some(3723));
    assert_eq!(decode("0h 59m 0s"), Some(3540));
  }

  #[test]
  fn test_decode_partial_and_unordered_components() {
    assert_eq!(decode("5m"), Some(300));
    assert_eq!(decode("10s 1h"), Some(3610));
    assert_eq!(decode("2h30m"), Some(9000));
  }

  #[test]
  fn test_decode_no_value() {
    assert_eq!(decode(""), None);
    assert_eq!(decode("soon"), None);
    assert_eq!(decode("0h 0m 0s"), None);
  }

  #[test]
  fn test_encode_emits_every_component() {
    assert_eq!(encode(0), "0h 0m 0s");
    assert_eq!(encode(59), "0h 0m 59s");
    assert_eq!(encode(3723), "1h 2m 3s");
    assert_eq!(encode(90_000), "25h 0m 0s");
    assert_eq!(encode_optional(None), PLACEHOLDER);
  }

  #[test]
  fn test_round_trip_for_positive_durations() {
    for seconds in (1..20_000).step_by(7).chain([86_399, 86_400, 1_000_000]) {
      assert_eq!(decode(&encode(seconds)), Some(seconds), "round trip failed for {seconds}");
    }
  }
}
