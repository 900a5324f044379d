//! Abbreviated number notation used by battle reports
//!
//! The game prints large values with a magnitude suffix: one letter up to
//! `D` (10^33), then two lowercase letters counting upward from `aa` (10^36)
//! in steps of 10^3. Suffix case is significant (`q` is 10^15, `Q` is 10^18).

use once_cell::sync::Lazy;
use regex::Regex;

/// Rendered in place of a missing value
pub const PLACEHOLDER: &str = "—";

/// Exponent of the first two-letter suffix (`aa`)
const TWO_LETTER_BASE: i32 = 36;

/// Largest exponent whose threshold still fits in an `f64`
const MAX_EXPONENT: i32 = 306;

/// Single-letter suffixes in ascending order of magnitude
const SINGLE_LETTER_SUFFIXES: [(char, i32); 11] = [
  ('K', 3),
  ('M', 6),
  ('B', 9),
  ('T', 12),
  ('q', 15),
  ('Q', 18),
  ('s', 21),
  ('S', 24),
  ('O', 27),
  ('N', 30),
  ('D', 33),
];

static LEADING_MANTISSA: Lazy<Regex> =
  Lazy::new(|| Regex::new(r"^[+-]?(?:\d+(?:\.\d*)?|\.\d+)").expect("mantissa pattern is valid"));

#[derive(Debug, Clone)]
struct Tier {
  suffix: String,
  threshold: f64,
}

/// Display tiers, largest first
static FORMAT_TIERS: Lazy<Vec<Tier>> = Lazy::new(|| {
  let highest_two_letter = (MAX_EXPONENT - TWO_LETTER_BASE) / 3;
  let two_letter = (0..=highest_two_letter).rev().map(|index| {
    let exponent = TWO_LETTER_BASE + index * 3;
    Tier { suffix: two_letter_suffix(index), threshold: power_of_ten(exponent) }
  });
  let single_letter = SINGLE_LETTER_SUFFIXES
    .iter()
    .rev()
    .map(|(suffix, exponent)| Tier { suffix: suffix.to_string(), threshold: power_of_ten(*exponent) });

  two_letter.chain(single_letter).collect()
});

/// Exponent for a single-letter suffix, `None` if the letter is not one
pub fn single_letter_exponent(suffix: char) -> Option<i32> {
  SINGLE_LETTER_SUFFIXES.iter().find(|(letter, _)| *letter == suffix).map(|(_, exponent)| *exponent)
}

/// Exponent for a two-letter suffix: `aa` is 36, each later code adds 3
pub fn two_letter_exponent(suffix: &str) -> Option<i32> {
  let bytes = suffix.as_bytes();
  if bytes.len() != 2 || !bytes.iter().all(u8::is_ascii_lowercase) {
    return None;
  }

  let first = i32::from(bytes[0] - b'a');
  let second = i32::from(bytes[1] - b'a');
  Some(TWO_LETTER_BASE + (first * 26 + second) * 3)
}

fn two_letter_suffix(index: i32) -> String {
  let first = (b'a' + (index / 26) as u8) as char;
  let second = (b'a' + (index % 26) as u8) as char;
  format!("{first}{second}")
}

fn power_of_ten(exponent: i32) -> f64 {
  format!("1e{exponent}").parse().unwrap_or(f64::INFINITY)
}

/// Split off the last `count` characters
fn split_suffix(text: &str, count: usize) -> Option<(&str, &str)> {
  let (index, _) = text.char_indices().rev().nth(count - 1)?;
  Some(text.split_at(index))
}

fn leading_mantissa(text: &str) -> Option<&str> {
  LEADING_MANTISSA.find(text).map(|m| m.as_str())
}

/// Build the value from its decimal text so the result is the closest `f64`
/// to the exact product
fn scale(mantissa: &str, exponent: i32) -> Option<f64> {
  format!("{mantissa}e{exponent}").parse::<f64>().ok().filter(|value| value.is_finite())
}

/// Decode report notation such as `2.46B`, `$978.55M`, `3.50aa` or `1,234`
///
/// Returns `None` when there is no parsable leading number.
pub fn decode(text: &str) -> Option<f64> {
  let cleaned: String = text.chars().filter(|c| *c != '$' && *c != ',').collect();
  let cleaned = cleaned.trim();
  if cleaned.is_empty() {
    return None;
  }

  // Two-letter codes are only tried when both trailing characters are lowercase,
  // otherwise a single-letter suffix in the last position would be misread
  if cleaned.chars().count() >= 3 {
    if let Some((head, suffix)) = split_suffix(cleaned, 2) {
      if let (Some(exponent), Some(mantissa)) = (two_letter_exponent(suffix), leading_mantissa(head)) {
        return scale(mantissa, exponent);
      }
    }
  }

  if let Some((head, suffix)) = split_suffix(cleaned, 1) {
    let exponent = suffix.chars().next().and_then(single_letter_exponent);
    if let (Some(exponent), Some(mantissa)) = (exponent, leading_mantissa(head)) {
      return scale(mantissa, exponent);
    }
  }

  leading_mantissa(cleaned).and_then(|mantissa| scale(mantissa, 0))
}

/// Render a value the way the game does: two decimals plus the largest suffix
/// that fits, plain below one thousand
pub fn encode(value: f64) -> String {
  if !value.is_finite() {
    return PLACEHOLDER.to_string();
  }
  if value == 0.0 {
    return "0".to_string();
  }

  let magnitude = value.abs();
  if let Some(tier) = FORMAT_TIERS.iter().find(|tier| magnitude >= tier.threshold) {
    return format!("{:.2}{}", value / tier.threshold, tier.suffix);
  }

  if value.fract() == 0.0 {
    format!("{value}")
  } else {
    format!("{value:.2}")
  }
}

/// [`encode`], with the placeholder for a missing value
pub fn encode_optional(value: Option<f64>) -> String {
  value.map(encode).unwrap_or_else(|| PLACEHOLDER.to_string())
}
