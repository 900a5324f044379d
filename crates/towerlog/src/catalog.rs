//! Labelled, sectioned view of the numeric run fields

use chrono::{NaiveDate, NaiveDateTime};
use std::cmp::Reverse;

use crate::duration;
use crate::numeric::{self, PLACEHOLDER};
use crate::record::RunRecord;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetricFormat {
  /// `2.46B`, via the numeric codec
  Abbreviated,
  /// `1,234,567`
  Integer,
  /// `1h 2m 3s`, from whole seconds
  Duration,
  /// The value as-is
  Plain,
  /// `x1.5`
  Multiplier,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Metric {
  pub key: &'static str,
  pub label: &'static str,
  pub format: MetricFormat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Section {
  pub name: &'static str,
  pub metrics: &'static [Metric],
}

const fn metric(key: &'static str, label: &'static str, format: MetricFormat) -> Metric {
  Metric { key, label, format }
}

use MetricFormat::{Abbreviated as Abbr, Duration as Dur, Integer as Int, Multiplier as Mult, Plain};

pub static SECTIONS: &[Section] = &[
  Section {
    name: "Overview",
    metrics: &[
      metric("wave", "Wave", Int),
      metric("tier", "Tier", Plain),
      metric("realTimeSeconds", "Real Time", Dur),
      metric("gameTimeSeconds", "Game Time", Dur),
    ],
  },
  Section {
    name: "Economy",
    metrics: &[
      metric("coinsEarned", "Coins Earned", Abbr),
      metric("coinsPerHour", "Coins/Hour", Abbr),
      metric("cashEarned", "Cash Earned", Abbr),
      metric("interestEarned", "Interest Earned", Abbr),
      metric("cellsEarned", "Cells Earned", Abbr),
      metric("rerollShardsEarned", "Reroll Shards Earned", Abbr),
      metric("gemBlocksTapped", "Gem Blocks Tapped", Int),
    ],
  },
  Section {
    name: "Combat",
    metrics: &[
      metric("damageDealt", "Damage Dealt", Abbr),
      metric("damageTaken", "Damage Taken", Abbr),
      metric("damageTakenWall", "Damage Taken Wall", Abbr),
      metric("damageTakenWhileBerserked", "Dmg While Berserked", Abbr),
      metric("damageGainFromBerserk", "Berserk Multiplier", Mult),
      metric("deathDefy", "Death Defy", Int),
      metric("lifesteal", "Lifesteal", Abbr),
      metric("projectilesDamage", "Projectiles Dmg", Abbr),
      metric("projectilesCount", "Projectiles Count", Abbr),
      metric("thornDamage", "Thorn Damage", Abbr),
      metric("orbDamage", "Orb Damage", Abbr),
      metric("enemiesHitByOrbs", "Enemies Hit by Orbs", Abbr),
      metric("landMineDamage", "Land Mine Dmg", Abbr),
      metric("landMinesSpawned", "Land Mines Spawned", Int),
      metric("rendArmorDamage", "Rend Armor Dmg", Abbr),
      metric("deathRayDamage", "Death Ray Dmg", Abbr),
      metric("smartMissileDamage", "Smart Missile Dmg", Abbr),
      metric("innerLandMineDamage", "Inner Land Mine Dmg", Abbr),
      metric("chainLightningDamage", "Chain Lightning Dmg", Abbr),
      metric("deathWaveDamage", "Death Wave Dmg", Abbr),
      metric("taggedByDeathwave", "Tagged by Deathwave", Int),
      metric("swampDamage", "Swamp Damage", Abbr),
      metric("blackHoleDamage", "Black Hole Dmg", Abbr),
      metric("electronsDamage", "Electrons Dmg", Abbr),
    ],
  },
  Section {
    name: "Utility",
    metrics: &[
      metric("wavesSkipped", "Waves Skipped", Int),
      metric("recoveryPackages", "Recovery Packages", Int),
      metric("freeAttackUpgrade", "Free Attack Upgrades", Int),
      metric("freeDefenseUpgrade", "Free Defense Upgrades", Int),
      metric("freeUtilityUpgrade", "Free Utility Upgrades", Int),
      metric("hpFromDeathWave", "HP From Death Wave", Abbr),
      metric("coinsFromDeathWave", "Coins From Death Wave", Abbr),
      metric("cashFromGoldenTower", "Cash From Golden Tower", Abbr),
      metric("coinsFromGoldenTower", "Coins From Golden Tower", Abbr),
      metric("coinsFromBlackHole", "Coins From Black Hole", Abbr),
      metric("coinsFromSpotlight", "Coins From Spotlight", Abbr),
      metric("coinsFromOrb", "Coins From Orb", Abbr),
      metric("coinsFromCoinUpgrade", "Coins From Upgrade", Abbr),
      metric("coinsFromCoinBonuses", "Coins From Bonuses", Abbr),
    ],
  },
  Section {
    name: "Enemies",
    metrics: &[
      metric("totalEnemies", "Total Enemies", Int),
      metric("basicEnemies", "Basic", Int),
      metric("fastEnemies", "Fast", Int),
      metric("tankEnemies", "Tank", Int),
      metric("rangedEnemies", "Ranged", Int),
      metric("bossEnemies", "Boss", Int),
      metric("protectorEnemies", "Protector", Int),
      metric("totalElites", "Total Elites", Int),
      metric("vampires", "Vampires", Int),
      metric("rays", "Rays", Int),
      metric("scatters", "Scatters", Int),
      metric("saboteur", "Saboteur", Int),
      metric("commander", "Commander", Int),
      metric("overcharge", "Overcharge", Int),
      metric("destroyedByOrbs", "Destroyed by Orbs", Int),
      metric("destroyedByThorns", "Destroyed by Thorns", Int),
      metric("destroyedByDeathRay", "Destroyed by Death Ray", Int),
      metric("destroyedByLandMine", "Destroyed by Land Mine", Int),
      metric("destroyedInSpotlight", "Destroyed in Spotlight", Int),
    ],
  },
  Section {
    name: "Bots",
    metrics: &[
      metric("flameBotDamage", "Flame Bot Dmg", Abbr),
      metric("thunderBotStuns", "Thunder Bot Stuns", Int),
      metric("goldenBotCoins", "Golden Bot Coins", Abbr),
      metric("destroyedInGoldenBot", "Destroyed in Golden Bot", Int),
      metric("guardianDamage", "Guardian Dmg", Abbr),
      metric("summonedEnemies", "Summoned Enemies", Int),
      metric("guardianCoinsStolen", "Guardian Coins Stolen", Abbr),
      metric("coinsFetched", "Coins Fetched", Abbr),
    ],
  },
  Section {
    name: "Rewards",
    metrics: &[
      metric("gems", "Gems", Int),
      metric("medals", "Medals", Int),
      metric("rerollShards", "Reroll Shards", Int),
      metric("cannonShards", "Cannon Shards", Int),
      metric("armorShards", "Armor Shards", Int),
      metric("generatorShards", "Generator Shards", Int),
      metric("coreShards", "Core Shards", Int),
      metric("commonModules", "Common Modules", Int),
      metric("rareModules", "Rare Modules", Int),
    ],
  },
];

pub fn sections() -> &'static [Section] {
  SECTIONS
}

pub fn metrics() -> impl Iterator<Item = &'static Metric> {
  SECTIONS.iter().flat_map(|section| section.metrics.iter())
}

pub fn find_metric(key: &str) -> Option<&'static Metric> {
  metrics().find(|metric| metric.key == key)
}

impl MetricFormat {
  pub fn render(self, value: Option<f64>) -> String {
    let Some(value) = value.filter(|value| value.is_finite()) else {
      return PLACEHOLDER.to_string();
    };

    match self {
      MetricFormat::Abbreviated => numeric::encode(value),
      MetricFormat::Integer => group_thousands(value),
      MetricFormat::Duration if value >= 0.0 => duration::encode(value as u64),
      MetricFormat::Duration => PLACEHOLDER.to_string(),
      MetricFormat::Plain => value.to_string(),
      MetricFormat::Multiplier => format!("x{value}"),
    }
  }
}

/// Render one metric of a run; unknown keys render abbreviated
pub fn format_metric(record: &RunRecord, key: &str) -> String {
  let format = find_metric(key).map_or(MetricFormat::Abbreviated, |metric| metric.format);
  format.render(record.number(key))
}

/// At most three fraction digits, trailing zeros dropped
fn group_thousands(value: f64) -> String {
  let rounded = format!("{:.3}", value.abs());
  let (whole, fraction) = rounded.split_once('.').unwrap_or((rounded.as_str(), ""));
  let fraction = fraction.trim_end_matches('0');

  let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
  for (position, digit) in whole.chars().enumerate() {
    if position > 0 && (whole.len() - position) % 3 == 0 {
      grouped.push(',');
    }
    grouped.push(digit);
  }

  let sign = if value < 0.0 && (whole != "0" || !fraction.is_empty()) { "-" } else { "" };
  if fraction.is_empty() {
    format!("{sign}{grouped}")
  } else {
    format!("{sign}{grouped}.{fraction}")
  }
}

const DATE_TIME_FORMATS: &[&str] = &[
  "%Y-%m-%d %H:%M:%S",
  "%Y-%m-%d %H:%M",
  "%Y-%m-%dT%H:%M:%S",
  "%b %d, %Y %H:%M:%S",
  "%b %d, %Y %H:%M",
  "%m/%d/%Y %H:%M:%S",
  "%m/%d/%Y %H:%M",
];

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%b %d, %Y", "%m/%d/%Y"];

/// Recognised timestamps sort before anything left as text
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub(crate) enum ChronoKey {
  Parsed(NaiveDateTime),
  Text(String),
}

pub(crate) fn chrono_key(battle_date: &str) -> ChronoKey {
  let trimmed = battle_date.trim();
  let parsed = DATE_TIME_FORMATS
    .iter()
    .find_map(|format| NaiveDateTime::parse_from_str(trimmed, format).ok())
    .or_else(|| {
      DATE_FORMATS
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(trimmed, format).ok())
        .and_then(|date| date.and_hms_opt(0, 0, 0))
    });

  match parsed {
    Some(instant) => ChronoKey::Parsed(instant),
    None => ChronoKey::Text(trimmed.to_string()),
  }
}

/// Newest recognised timestamp first, then unrecognised dates, then undated
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub(crate) enum RecencyKey {
  Parsed(Reverse<NaiveDateTime>),
  Text(Reverse<String>),
  Undated,
}

pub(crate) fn recency_key(battle_date: Option<&str>) -> RecencyKey {
  match battle_date.map(chrono_key) {
    Some(ChronoKey::Parsed(instant)) => RecencyKey::Parsed(Reverse(instant)),
    Some(ChronoKey::Text(text)) => RecencyKey::Text(Reverse(text)),
    None => RecencyKey::Undated,
  }
}

/// One point of a metric over time
#[derive(Debug, Clone, PartialEq)]
pub struct SeriesPoint<'a> {
  pub battle_date: &'a str,
  pub value: Option<f64>,
}

/// Runs with a `battleDate`, oldest first, paired with their value for `key`
pub fn series<'a>(runs: &'a [RunRecord], key: &str) -> Vec<SeriesPoint<'a>> {
  let mut dated: Vec<(ChronoKey, SeriesPoint<'a>)> = runs
    .iter()
    .filter_map(|run| {
      let battle_date = run.battle_date()?;
      Some((chrono_key(battle_date), SeriesPoint { battle_date, value: run.number(key) }))
    })
    .collect();

  dated.sort_by(|a, b| a.0.cmp(&b.0));
  dated.into_iter().map(|(_, point)| point).collect()
}
