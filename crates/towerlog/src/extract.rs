//! Field extraction from pasted battle reports
//!
//! Reports are `Label Value` pairs in no fixed order. Each field has a rule
//! that finds its label and captures the value right after it. Several labels
//! overlap ("Land Mine Damage" / "Inner Land Mine Damage", "Reroll Shards" /
//! "Reroll Shards Earned"), and the engine does not track which text another
//! rule already used, so every rule must be specific enough on its own. Where
//! a pattern alone cannot tell two labels apart, the rule carries an explicit
//! exclusion that rejects the candidate match.

use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use tracing::{debug, trace};

use crate::error::ReportError;
use crate::numeric;
use crate::record::{FieldValue, RunRecord};

/// Digits with an optional magnitude suffix, e.g. `2.46B` or `3.50aa`
const NUMBER: &str = r"([\d.]+(?:[a-z]{2}|[KMBTqQsSOND])?)";

/// Same as [`NUMBER`] with an optional leading `$`
const CASH: &str = r"\$?([\d.]+(?:[a-z]{2}|[KMBTqQsSOND])?)";

static WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("whitespace pattern is valid"));

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
  /// Trimmed and stored verbatim
  Text,
  /// Decoded through the numeric codec
  Numeric,
}

/// One named extraction rule
#[derive(Debug)]
pub struct FieldRule {
  pub field: &'static str,
  pub kind: ValueKind,
  pattern: Regex,
  not_preceded_by: Option<&'static str>,
  not_followed_by: Option<Regex>,
}

impl FieldRule {
  fn new(field: &'static str, kind: ValueKind, pattern: &str) -> Self {
    let pattern = Regex::new(pattern)
      .unwrap_or_else(|e| panic!("extraction pattern for {field} is invalid: {e}"));
    Self { field, kind, pattern, not_preceded_by: None, not_followed_by: None }
  }

  fn text(field: &'static str, pattern: &str) -> Self {
    Self::new(field, ValueKind::Text, pattern)
  }

  fn numeric(field: &'static str, pattern: &str) -> Self {
    Self::new(field, ValueKind::Numeric, pattern)
  }

  /// `Label <number>`
  fn number(field: &'static str, label: &str) -> Self {
    Self::numeric(field, &format!(r"{label}\s+{NUMBER}"))
  }

  /// `Label $<number>`
  fn cash(field: &'static str, label: &str) -> Self {
    Self::numeric(field, &format!(r"{label}\s+{CASH}"))
  }

  /// `Label <digits>`
  fn integer(field: &'static str, label: &str) -> Self {
    Self::numeric(field, &format!(r"{label}\s+(\d+)"))
  }

  /// Reject candidates whose label directly follows `literal`
  fn unless_preceded_by(mut self, literal: &'static str) -> Self {
    self.not_preceded_by = Some(literal);
    self
  }

  /// Reject candidates whose remaining text starts with `pattern`
  fn unless_followed_by(mut self, pattern: &str) -> Self {
    let anchored = format!("^(?:{pattern})");
    self.not_followed_by = Some(
      Regex::new(&anchored)
        .unwrap_or_else(|e| panic!("exclusion pattern for {} is invalid: {e}", self.field)),
    );
    self
  }

  fn accepts(&self, text: &str, caps: &Captures<'_>) -> bool {
    let Some(whole) = caps.get(0) else {
      return false;
    };

    if let Some(literal) = self.not_preceded_by {
      if text[..whole.start()].ends_with(literal) {
        return false;
      }
    }

    if let Some(pattern) = &self.not_followed_by {
      if pattern.is_match(&text[whole.end()..]) {
        return false;
      }
    }

    true
  }

  /// The captured value of the first candidate that passes every exclusion
  pub fn capture<'t>(&self, text: &'t str) -> Option<&'t str> {
    self
      .pattern
      .captures_iter(text)
      .find(|caps| self.accepts(text, caps))
      .and_then(|caps| caps.get(1))
      .map(|m| m.as_str())
  }

  fn value_of(&self, captured: &str) -> FieldValue {
    match self.kind {
      ValueKind::Text => FieldValue::Text(captured.trim().to_string()),
      ValueKind::Numeric => numeric::decode(captured).into(),
    }
  }
}

/// Every rule in evaluation order. Order is part of the contract.
static FIELD_RULES: Lazy<Vec<FieldRule>> = Lazy::new(|| {
  vec![
    // Meta
    FieldRule::text("battleDate", r"Battle Date\s+(.+?)\s+Game Time"),
    FieldRule::text("gameTimeRaw", r"Game Time\s+(\d+h\s*\d+m\s*\d+s)"),
    FieldRule::text("realTimeRaw", r"Real Time\s+(\d+h\s*\d+m\s*\d+s)"),
    FieldRule::integer("tier", "Tier"),
    FieldRule::integer("wave", "Wave"),
    FieldRule::text("killedBy", r"Killed By\s+(\S+)"),
    // Coins, cash, gems
    FieldRule::number("coinsEarned", "Coins earned"),
    FieldRule::number("coinsPerHour", "Coins per hour"),
    FieldRule::cash("cashEarned", "Cash earned"),
    FieldRule::cash("interestEarned", "Interest earned"),
    FieldRule::integer("gemBlocksTapped", "Gem Blocks Tapped"),
    // Cells and shards
    FieldRule::number("cellsEarned", "Cells Earned"),
    FieldRule::number("rerollShardsEarned", "Reroll Shards Earned"),
    // Combat
    FieldRule::number("damageDealt", "(?:Combat )?Damage dealt"),
    FieldRule::number("damageTaken", "Damage Taken").unless_followed_by(r"\s*W"),
    FieldRule::number("damageTakenWall", "Damage Taken Wall"),
    FieldRule::number("damageTakenWhileBerserked", "Damage Taken While Berserked"),
    FieldRule::numeric("damageGainFromBerserk", r"Damage Gain From Berserk\s+x?([\d.]+)"),
    FieldRule::integer("deathDefy", "Death Defy"),
    FieldRule::number("lifesteal", "Lifesteal"),
    // Projectiles
    FieldRule::number("projectilesDamage", "Projectiles Damage"),
    FieldRule::number("projectilesCount", "Projectiles Count"),
    // Skills and abilities
    FieldRule::number("thornDamage", "Thorn damage"),
    FieldRule::number("orbDamage", "Orb Damage"),
    FieldRule::number("enemiesHitByOrbs", "Enemies Hit by Orbs"),
    FieldRule::number("landMineDamage", "Land Mine Damage").unless_preceded_by("Inner "),
    FieldRule::number("landMinesSpawned", "Land Mines Spawned"),
    FieldRule::number("rendArmorDamage", "Rend Armor Damage"),
    FieldRule::number("deathRayDamage", "Death Ray Damage"),
    FieldRule::number("smartMissileDamage", "Smart Missile Damage"),
    FieldRule::number("innerLandMineDamage", "Inner Land Mine Damage"),
    FieldRule::number("chainLightningDamage", "Chain Lightning Damage"),
    FieldRule::number("deathWaveDamage", "Death Wave Damage"),
    FieldRule::integer("taggedByDeathwave", "Tagged by Deathwave"),
    FieldRule::number("swampDamage", "Swamp Damage"),
    FieldRule::number("blackHoleDamage", "Black Hole Damage"),
    FieldRule::number("electronsDamage", "Electrons Damage"),
    // Utility
    FieldRule::integer("wavesSkipped", "Waves Skipped"),
    FieldRule::integer("recoveryPackages", "Recovery Packages"),
    FieldRule::integer("freeAttackUpgrade", "Free Attack Upgrade"),
    FieldRule::integer("freeDefenseUpgrade", "Free Defense Upgrade"),
    FieldRule::integer("freeUtilityUpgrade", "Free Utility Upgrade"),
    FieldRule::number("hpFromDeathWave", "HP From Death Wave"),
    FieldRule::number("coinsFromDeathWave", "Coins From Death Wave"),
    FieldRule::cash("cashFromGoldenTower", "Cash From Golden Tower"),
    FieldRule::number("coinsFromGoldenTower", "Coins From Golden Tower"),
    FieldRule::number("coinsFromBlackHole", "Coins From Black Hole"),
    FieldRule::number("coinsFromSpotlight", "Coins From Spotlight"),
    FieldRule::number("coinsFromOrb", "Coins From Orb"),
    FieldRule::number("coinsFromCoinUpgrade", "Coins from Coin Upgrade"),
    FieldRule::number("coinsFromCoinBonuses", "Coins from Coin Bonuses"),
    // Enemies destroyed
    FieldRule::integer("totalEnemies", "Total Enemies"),
    FieldRule::integer("basicEnemies", "Basic"),
    FieldRule::integer("fastEnemies", "Fast"),
    FieldRule::integer("tankEnemies", "Tank"),
    FieldRule::integer("rangedEnemies", "Ranged"),
    FieldRule::integer("bossEnemies", "Boss"),
    FieldRule::integer("protectorEnemies", "Protector"),
    FieldRule::integer("totalElites", "Total Elites"),
    FieldRule::integer("vampires", "Vampires"),
    FieldRule::integer("rays", "Rays"),
    FieldRule::integer("scatters", "Scatters"),
    FieldRule::integer("saboteur", "Saboteur"),
    FieldRule::integer("commander", "Commander"),
    FieldRule::integer("overcharge", "Overcharge"),
    FieldRule::integer("destroyedByOrbs", "Destroyed By Orbs"),
    FieldRule::integer("destroyedByThorns", "Destroyed by Thorns"),
    FieldRule::integer("destroyedByDeathRay", "Destroyed by Death Ray"),
    FieldRule::integer("destroyedByLandMine", "Destroyed by Land Mine"),
    FieldRule::integer("destroyedInSpotlight", "Destroyed in Spotlight"),
    // Bots
    FieldRule::number("flameBotDamage", "Flame Bot Damage"),
    FieldRule::integer("thunderBotStuns", "Thunder Bot Stuns"),
    FieldRule::number("goldenBotCoins", "Golden Bot Coins Earned"),
    FieldRule::integer("destroyedInGoldenBot", "Destroyed in Golden Bot"),
    FieldRule::number("guardianDamage", "Guardian Damage"),
    FieldRule::integer("summonedEnemies", "Summoned enemies"),
    FieldRule::number("guardianCoinsStolen", "Guardian coins stolen"),
    FieldRule::number("coinsFetched", "Coins Fetched"),
    // Rewards
    FieldRule::integer("gems", r"(?:^|\s)Gems"),
    FieldRule::integer("medals", "Medals"),
    FieldRule::integer("rerollShards", r"(?:^|\s)Reroll Shards").unless_followed_by(r"\s*Earned"),
    FieldRule::integer("cannonShards", "Cannon Shards"),
    FieldRule::integer("armorShards", "Armor Shards"),
    FieldRule::integer("generatorShards", "Generator Shards"),
    FieldRule::integer("coreShards", "Core Shards"),
    FieldRule::integer("commonModules", "Common Modules"),
    FieldRule::integer("rareModules", "Rare Modules"),
  ]
});

/// The extraction table in evaluation order
pub fn field_rules() -> &'static [FieldRule] {
  &FIELD_RULES
}

/// Collapse every whitespace run, newlines included, to a single space
pub fn normalize(text: &str) -> String {
  WHITESPACE.replace_all(text, " ").trim().to_string()
}

/// Cheap sanity gate, not validation
pub fn looks_like_report(normalized: &str) -> bool {
  normalized.contains("Battle") && normalized.contains("Wave")
}

/// Fields pulled out of one report
#[derive(Debug, Clone, PartialEq)]
pub struct Extraction {
  pub record: RunRecord,
  /// How many rules found their label
  pub matched: usize,
}

/// Run every rule against the normalized text
///
/// Fields whose label is absent are left out of the record entirely.
pub fn extract(text: &str) -> Result<Extraction, ReportError> {
  let normalized = normalize(text);
  if !looks_like_report(&normalized) {
    return Err(ReportError::NotAReport);
  }

  let mut record = RunRecord::new();
  let mut matched = 0;

  for rule in field_rules() {
    match rule.capture(&normalized) {
      Some(captured) => {
        matched += 1;
        debug!(field = rule.field, value = captured, "Matched report field");
        record.insert(rule.field, rule.value_of(captured));
      }
      None => trace!(field = rule.field, "Report field not present"),
    }
  }

  Ok(Extraction { record, matched })
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::collections::HashSet;

  fn extract_ok(text: &str) -> Extraction {
    extract(text).expect("text should pass the report gate")
  }

  #[test]
  fn test_rule_table_has_unique_fields_in_fixed_order() {
    let rules = field_rules();
    let fields: HashSet<_> = rules.iter().map(|rule| rule.field).collect();

    assert_eq!(rules.len(), 87);
    assert_eq!(fields.len(), rules.len());
    assert_eq!(rules[0].field, "battleDate");
    assert_eq!(rules[86].field, "rareModules");

    let position = |field: &str| rules.iter().position(|rule| rule.field == field).unwrap();
    assert!(position("landMineDamage") < position("innerLandMineDamage"));
    assert!(position("rerollShardsEarned") < position("rerollShards"));
  }

  #[test]
  fn test_normalize_collapses_whitespace() {
    assert_eq!(normalize("  Battle Report\n\n  Wave\t 12  "), "Battle Report Wave 12");
  }

  #[test]
  fn test_gate_requires_battle_and_wave() {
    assert_eq!(extract("Tier 5 Coins earned 1K").unwrap_err(), ReportError::NotAReport);
    assert_eq!(extract("Battle Report Tier 5").unwrap_err(), ReportError::NotAReport);
    assert!(extract("Battle Wave").is_ok());
  }

  #[test]
  fn test_land_mine_labels_do_not_cross_contaminate() {
    let extraction = extract_ok("Battle Report Wave 10 Land Mine Damage 500 Inner Land Mine Damage 200");
    assert_eq!(extraction.record.number("landMineDamage"), Some(500.0));
    assert_eq!(extraction.record.number("innerLandMineDamage"), Some(200.0));

    let reversed = extract_ok("Battle Report Wave 10 Inner Land Mine Damage 200 Land Mine Damage 500");
    assert_eq!(reversed.record.number("landMineDamage"), Some(500.0));
    assert_eq!(reversed.record.number("innerLandMineDamage"), Some(200.0));
  }

  #[test]
  fn test_inner_land_mine_alone_does_not_fill_land_mine() {
    let extraction = extract_ok("Battle Report Wave 10 Inner Land Mine Damage 200");
    assert!(extraction.record.is_missing("landMineDamage"));
    assert_eq!(extraction.record.number("innerLandMineDamage"), Some(200.0));
  }

  #[test]
  fn test_reroll_shards_labels_are_distinguished() {
    let extraction = extract_ok("Battle Report Wave 10 Reroll Shards Earned 1.5K Reroll Shards 45");
    assert_eq!(extraction.record.number("rerollShardsEarned"), Some(1500.0));
    assert_eq!(extraction.record.number("rerollShards"), Some(45.0));

    let earned_only = extract_ok("Battle Report Wave 10 Reroll Shards Earned 300");
    assert!(earned_only.record.is_missing("rerollShards"));
  }

  #[test]
  fn test_damage_taken_variants() {
    let extraction = extract_ok(
      "Battle Report Wave 10 Damage Taken 1.2M Damage Taken Wall 300K Damage Taken While Berserked 4.5K",
    );
    assert_eq!(extraction.record.number("damageTaken"), Some(1_200_000.0));
    assert_eq!(extraction.record.number("damageTakenWall"), Some(300_000.0));
    assert_eq!(extraction.record.number("damageTakenWhileBerserked"), Some(4500.0));
  }

  #[test]
  fn test_gems_requires_word_start() {
    let extraction = extract_ok("Battle Report Wave 10 Gem Blocks Tapped 3 Gems 12");
    assert_eq!(extraction.record.number("gemBlocksTapped"), Some(3.0));
    assert_eq!(extraction.record.number("gems"), Some(12.0));
  }

  #[test]
  fn test_cash_and_combat_prefixes() {
    let extraction = extract_ok(
      "Battle Report Wave 10 Cash earned $978.55M Combat Damage dealt 3.50aa Damage Gain From Berserk x8.25",
    );
    assert_eq!(extraction.record.number("cashEarned"), Some(978_550_000.0));
    let damage = extraction.record.number("damageDealt").unwrap();
    assert!((damage - 3.5e36).abs() <= 3.5e24);
    assert_eq!(extraction.record.number("damageGainFromBerserk"), Some(8.25));
  }

  #[test]
  fn test_text_fields_are_stored_verbatim() {
    let extraction = extract_ok(
      "Battle Report Battle Date Jan 14, 2025 21:05 Game Time 22h 42m 35s Real Time 5h 1m 2s Tier 11 Wave 4501 Killed By Scatter",
    );
    let record = extraction.record;
    assert_eq!(record.battle_date(), Some("Jan 14, 2025 21:05"));
    assert_eq!(record.text("gameTimeRaw"), Some("22h 42m 35s"));
    assert_eq!(record.text("realTimeRaw"), Some("5h 1m 2s"));
    assert_eq!(record.killed_by(), Some("Scatter"));
    assert_eq!(record.tier(), Some(11.0));
    assert_eq!(record.wave(), Some(4501.0));
    assert_eq!(extraction.matched, 6);
  }

  #[test]
  fn test_unparsable_number_counts_as_matched_with_null() {
    let extraction = extract_ok("Battle Report Wave 10 Lifesteal ...");
    assert_eq!(extraction.matched, 2);
    assert!(extraction.record.fields.contains_key("lifesteal"));
    assert!(extraction.record.is_missing("lifesteal"));
  }
}
