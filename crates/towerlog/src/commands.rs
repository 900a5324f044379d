use anyhow::{anyhow, bail, Context, Result};
use chrono::Utc;
use colored::*;
use std::fs;
use std::io::{self, Read, Write};
use std::path::Path;

use crate::backend::KeyValueStore;
use crate::catalog::{self, MetricFormat};
use crate::duration;
use crate::milestone::{Countdown, EnteredTime, NewMilestone, SPEED_MULTIPLIERS};
use crate::numeric::{self, PLACEHOLDER};
use crate::record::RunRecord;
use crate::report::ReportParser;
use crate::store::RecordStore;

/// File contents, or all of stdin when no file is given
pub fn read_input(file: Option<&Path>) -> Result<String> {
  match file {
    Some(path) => fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display())),
    None => {
      let mut text = String::new();
      io::stdin().read_to_string(&mut text).context("failed to read stdin")?;
      Ok(text)
    }
  }
}

fn confirm(prompt: &str) -> Result<bool> {
  print!("{prompt} [y/N] ");
  io::stdout().flush()?;
  let mut input = String::new();
  io::stdin().read_line(&mut input)?;
  Ok(matches!(input.trim().to_lowercase().as_str(), "y" | "yes"))
}

fn or_placeholder(value: Option<&str>) -> &str {
  value.unwrap_or(PLACEHOLDER)
}

fn print_run_summary(run: &RunRecord) {
  println!(
    "{} {}  tier {}  wave {}  killed by {}",
    "Battle".bold(),
    or_placeholder(run.battle_date()).cyan(),
    MetricFormat::Plain.render(run.tier()).yellow(),
    MetricFormat::Integer.render(run.wave()).yellow(),
    or_placeholder(run.killed_by())
  );
  println!(
    "  game time {}  real time {}",
    duration::encode_optional(run.game_time_seconds()),
    duration::encode_optional(run.real_time_seconds())
  );
}

/// Every catalogued metric the run has, grouped by section
fn print_run_details(run: &RunRecord) {
  print_run_summary(run);
  for section in catalog::sections() {
    let present: Vec<_> = section.metrics.iter().filter(|metric| !run.is_missing(metric.key)).collect();
    if present.is_empty() {
      continue;
    }

    println!();
    println!("{}", section.name.bold());
    for metric in present {
      println!("  {:<26} {}", metric.label, catalog::format_metric(run, metric.key));
    }
  }
}

/// Parse a report and show what would be saved
pub fn preview_report(parser: &ReportParser, text: &str) -> Result<()> {
  match parser.parse(text) {
    Ok(run) => print_run_details(&run),
    Err(e) => println!("{} {}", "!".yellow(), e),
  }
  Ok(())
}

/// Parse a report and save it
pub fn add_run<B: KeyValueStore>(store: &mut RecordStore<B>, parser: &ReportParser, text: &str) -> Result<()> {
  let run = match parser.parse(text) {
    Ok(run) => run,
    Err(e) => {
      println!("{} {}", "!".yellow(), e);
      return Ok(());
    }
  };

  let battle_date = run.battle_date().unwrap_or_default().to_string();
  let outcome = store.save_run(run)?;
  if outcome.was_duplicate {
    println!("{} Updated existing run {}", "✓".green(), battle_date.cyan());
  } else {
    println!("{} Saved run {}", "✓".green(), battle_date.cyan());
  }
  Ok(())
}

pub fn list_runs<B: KeyValueStore>(store: &RecordStore<B>) -> Result<()> {
  let runs = store.runs();
  if runs.is_empty() {
    println!("No runs saved");
    return Ok(());
  }

  println!(
    "{:<24} {:>5} {:>7} {:>10} {:>10} {:>12}  {}",
    "Battle Date", "Tier", "Wave", "Coins", "Cells", "Game Time", "Killed By"
  );
  for run in &runs {
    println!(
      "{:<24} {:>5} {:>7} {:>10} {:>10} {:>12}  {}",
      or_placeholder(run.battle_date()).cyan(),
      MetricFormat::Plain.render(run.tier()),
      MetricFormat::Integer.render(run.wave()),
      numeric::encode_optional(run.number("coinsEarned")),
      numeric::encode_optional(run.number("cellsEarned")),
      duration::encode_optional(run.game_time_seconds()),
      or_placeholder(run.killed_by())
    );
  }
  println!("{} runs", runs.len());
  Ok(())
}

pub fn show_run<B: KeyValueStore>(store: &RecordStore<B>, battle_date: &str) -> Result<()> {
  let run = store.find_run(battle_date).ok_or_else(|| anyhow!("no run with battle date {battle_date}"))?;
  print_run_details(&run);
  Ok(())
}

/// Replace a stored run with a JSON body
pub fn edit_run<B: KeyValueStore>(store: &mut RecordStore<B>, battle_date: &str, body: &str) -> Result<()> {
  let run: RunRecord = serde_json::from_str(body).context("run body is not a valid JSON object")?;
  let new_battle_date = run.battle_date().unwrap_or_default().to_string();
  store.update_run(battle_date, run)?;

  if new_battle_date == battle_date {
    println!("{} Updated run {}", "✓".green(), battle_date.cyan());
  } else {
    println!("{} Updated run {} (now {})", "✓".green(), battle_date.cyan(), new_battle_date.cyan());
  }
  Ok(())
}

pub fn delete_run<B: KeyValueStore>(store: &mut RecordStore<B>, battle_date: &str) -> Result<()> {
  if store.delete_run(battle_date)? {
    println!("{} Deleted run {}", "✓".green(), battle_date.cyan());
  } else {
    println!("No run with battle date {}", battle_date.yellow());
  }
  Ok(())
}

pub fn clear_runs<B: KeyValueStore>(store: &mut RecordStore<B>, all: bool, force: bool) -> Result<()> {
  let prompt = if all { "Delete every run and milestone?" } else { "Delete every run?" };
  if !force && !confirm(prompt)? {
    println!("Clear cancelled");
    return Ok(());
  }

  if all {
    store.clear_all()?;
    println!("{} Cleared all runs and milestones", "✓".green());
  } else {
    store.clear_runs()?;
    println!("{} Cleared all runs", "✓".green());
  }
  Ok(())
}

/// One metric across runs, oldest first
pub fn show_trend<B: KeyValueStore>(store: &RecordStore<B>, key: &str) -> Result<()> {
  let metric = catalog::find_metric(key);
  let format = metric.map_or(MetricFormat::Abbreviated, |metric| metric.format);
  let runs = store.runs();
  let points = catalog::series(&runs, key);

  if metric.is_none() && points.iter().all(|point| point.value.is_none()) {
    bail!("unknown metric {key}");
  }
  if points.is_empty() {
    println!("No runs saved");
    return Ok(());
  }

  println!("{}", metric.map_or(key, |metric| metric.label).bold());
  for point in &points {
    println!("  {:<24} {}", point.battle_date.cyan(), format.render(point.value));
  }
  Ok(())
}

pub struct MilestoneInput<'a> {
  pub category: &'a str,
  pub name: &'a str,
  pub days: u32,
  pub hours: u32,
  pub minutes: u32,
  pub speed: f64,
}

pub fn add_milestone<B: KeyValueStore>(store: &mut RecordStore<B>, input: MilestoneInput<'_>) -> Result<()> {
  if !SPEED_MULTIPLIERS.contains(&input.speed) {
    bail!("speed must be one of {:?}", SPEED_MULTIPLIERS);
  }

  let draft = NewMilestone::lab_research(
    input.category,
    input.name,
    EnteredTime::new(input.days, input.hours, input.minutes),
    input.speed,
  );
  let milestone = store.save_milestone(draft)?;
  println!(
    "{} Saved milestone {} ({}), done in {}",
    "✓".green(),
    milestone.name.yellow(),
    milestone.id,
    milestone.countdown(Utc::now())
  );
  Ok(())
}

pub fn list_milestones<B: KeyValueStore>(store: &RecordStore<B>) -> Result<()> {
  let milestones = store.milestones();
  if milestones.is_empty() {
    println!("No milestones saved");
    return Ok(());
  }

  let now = Utc::now();
  for milestone in &milestones {
    let countdown = match milestone.countdown(now) {
      Countdown::Completed => "Completed".green(),
      remaining => remaining.to_string().yellow(),
    };
    println!(
      "{} {} {}  {}x speed  {}  {}",
      milestone.category.cyan(),
      "/".dimmed(),
      milestone.name,
      milestone.multiplier,
      countdown,
      milestone.id.dimmed()
    );
  }
  Ok(())
}

pub fn delete_milestone<B: KeyValueStore>(store: &mut RecordStore<B>, id: &str) -> Result<()> {
  if store.delete_milestone(id)? {
    println!("{} Deleted milestone {}", "✓".green(), id);
  } else {
    println!("No milestone with id {}", id.yellow());
  }
  Ok(())
}

pub fn clear_milestones<B: KeyValueStore>(store: &mut RecordStore<B>, force: bool) -> Result<()> {
  if !force && !confirm("Delete every milestone?")? {
    println!("Clear cancelled");
    return Ok(());
  }
  store.clear_milestones()?;
  println!("{} Cleared all milestones", "✓".green());
  Ok(())
}

/// Write the export to a file, or to stdout
pub fn export<B: KeyValueStore>(store: &RecordStore<B>, file: Option<&Path>) -> Result<()> {
  let document = store.export_all()?;
  match file {
    Some(path) => {
      fs::write(path, document).with_context(|| format!("failed to write {}", path.display()))?;
      println!("{} Exported to {}", "✓".green(), path.display().to_string().cyan());
    }
    None => println!("{document}"),
  }
  Ok(())
}

pub fn import<B: KeyValueStore>(store: &mut RecordStore<B>, text: &str) -> Result<()> {
  let summary = store.import_all(text).context("import failed")?;
  println!(
    "{} Imported {} runs and {} milestones",
    "✓".green(),
    summary.runs_added,
    summary.milestones_added
  );
  if summary.runs_skipped > 0 || summary.milestones_skipped > 0 {
    println!(
      "{} Skipped {} runs and {} milestones already stored or missing a key",
      "!".yellow(),
      summary.runs_skipped,
      summary.milestones_skipped
    );
  }
  Ok(())
}
