use assert_fs::prelude::*;

use predicates::prelude::*;
use predicates::str::contains;
use serial_test::serial;
use assert_cmd::Command;

const REPORT: &str = "Battle Report
Battle Date\tJan 15, 2025 21:00
Game Time\t1h 2m 3s
Real Time\t0h 59m 0s
Tier\t5
Wave\t1200
Killed By\tBoss
Coins earned\t2.46B
Cells Earned\t1.2K
Gems\t4
";

/// Helper to create a Command for the `towerlog` binary with a temporary data root.
fn towerlog_cmd(root: &assert_fs::TempDir) -> Command {
  let mut cmd = Command::cargo_bin("towerlog").expect("binary exists");
  cmd.env("TOWERLOG_ROOT", root.path());
  cmd.env_remove("RUST_LOG");
  cmd.env("NO_COLOR", "1");
  cmd
}

fn write_report(root: &assert_fs::TempDir, name: &str, text: &str) -> std::path::PathBuf {
  let file = root.child(name);
  file.write_str(text).unwrap();
  file.path().to_path_buf()
}

#[test]
#[serial]
fn test_parse_previews_without_saving() {
  let temp = assert_fs::TempDir::new().unwrap();
  let report = write_report(&temp, "report.txt", REPORT);

  towerlog_cmd(&temp)
    .arg("parse")
    .arg(&report)
    .assert()
    .success()
    .stdout(contains("Jan 15, 2025 21:00").and(contains("2.46B")).and(contains("1h 2m 3s")));

  towerlog_cmd(&temp).arg("list").assert().success().stdout(contains("No runs saved"));

  temp.close().unwrap();
}

#[test]
#[serial]
fn test_parse_reads_stdin() {
  let temp = assert_fs::TempDir::new().unwrap();

  towerlog_cmd(&temp)
    .arg("parse")
    .write_stdin(REPORT)
    .assert()
    .success()
    .stdout(contains("Coins Earned"));

  towerlog_cmd(&temp)
    .arg("parse")
    .write_stdin("just some chat message")
    .assert()
    .success()
    .stdout(contains("does not look like a battle report"));

  temp.close().unwrap();
}

#[test]
#[serial]
fn test_add_list_show_delete() {
  let temp = assert_fs::TempDir::new().unwrap();
  let report = write_report(&temp, "report.txt", REPORT);

  towerlog_cmd(&temp).arg("add").arg(&report).assert().success().stdout(contains("Saved run"));

  // Same battle date again overwrites
  towerlog_cmd(&temp)
    .arg("add")
    .arg(&report)
    .assert()
    .success()
    .stdout(contains("Updated existing run"));

  towerlog_cmd(&temp)
    .arg("list")
    .assert()
    .success()
    .stdout(contains("Jan 15, 2025 21:00").and(contains("1 runs")));

  towerlog_cmd(&temp)
    .args(["show", "Jan 15, 2025 21:00"])
    .assert()
    .success()
    .stdout(contains("Economy").and(contains("Cells Earned")).and(contains("1.20K")));

  towerlog_cmd(&temp).args(["show", "nope"]).assert().failure();

  towerlog_cmd(&temp)
    .args(["delete", "Jan 15, 2025 21:00"])
    .assert()
    .success()
    .stdout(contains("Deleted run"));

  towerlog_cmd(&temp).arg("list").assert().success().stdout(contains("No runs saved"));

  temp.close().unwrap();
}

#[test]
#[serial]
fn test_runs_live_under_the_data_root() {
  let temp = assert_fs::TempDir::new().unwrap();
  let report = write_report(&temp, "report.txt", REPORT);

  towerlog_cmd(&temp).arg("add").arg(&report).assert().success();

  temp.child("tower-stats-history.json").assert(predicate::path::exists());
  temp.child("tower-stats-history.json").assert(contains("\"battleDate\":\"Jan 15, 2025 21:00\""));

  temp.close().unwrap();
}

#[test]
#[serial]
fn test_edit_rejects_taken_battle_date() {
  let temp = assert_fs::TempDir::new().unwrap();
  let first = write_report(&temp, "first.txt", REPORT);
  let second = write_report(&temp, "second.txt", &REPORT.replace("Jan 15, 2025 21:00", "Jan 16, 2025 09:30"));
  towerlog_cmd(&temp).arg("add").arg(&first).assert().success();
  towerlog_cmd(&temp).arg("add").arg(&second).assert().success();

  let body = temp.child("body.json");
  body.write_str(r#"{"battleDate": "Jan 16, 2025 09:30", "wave": 1}"#).unwrap();
  towerlog_cmd(&temp)
    .args(["edit", "Jan 15, 2025 21:00"])
    .arg(body.path())
    .assert()
    .failure()
    .stderr(contains("already uses battleDate"));

  body.write_str(r#"{"battleDate": "Jan 15, 2025 21:00", "wave": 1300}"#).unwrap();
  towerlog_cmd(&temp)
    .args(["edit", "Jan 15, 2025 21:00"])
    .arg(body.path())
    .assert()
    .success()
    .stdout(contains("Updated run"));

  towerlog_cmd(&temp)
    .args(["trend", "wave"])
    .assert()
    .success()
    .stdout(contains("1,300").and(contains("1,200")));

  temp.close().unwrap();
}

#[test]
#[serial]
fn test_trend_rejects_unknown_fields() {
  let temp = assert_fs::TempDir::new().unwrap();

  towerlog_cmd(&temp).args(["trend", "notAField"]).assert().failure().stderr(contains("unknown metric"));

  temp.close().unwrap();
}

#[test]
#[serial]
fn test_export_clear_import() {
  let temp = assert_fs::TempDir::new().unwrap();
  let report = write_report(&temp, "report.txt", REPORT);
  let export = temp.child("backup.json");

  towerlog_cmd(&temp).arg("add").arg(&report).assert().success();
  towerlog_cmd(&temp)
    .args(["milestone", "add", "Damage", "--category", "Attack", "--hours", "2", "--speed", "1.5"])
    .assert()
    .success()
    .stdout(contains("Saved milestone"));

  towerlog_cmd(&temp).arg("export").arg(export.path()).assert().success();
  export.assert(contains("\"version\": 1"));

  towerlog_cmd(&temp).args(["clear", "--all", "--force"]).assert().success();
  towerlog_cmd(&temp).arg("list").assert().success().stdout(contains("No runs saved"));

  towerlog_cmd(&temp)
    .arg("import")
    .arg(export.path())
    .assert()
    .success()
    .stdout(contains("Imported 1 runs and 1 milestones"));

  // Everything is already there the second time
  towerlog_cmd(&temp)
    .arg("import")
    .arg(export.path())
    .assert()
    .success()
    .stdout(contains("Imported 0 runs and 0 milestones").and(contains("Skipped 1 runs and 1 milestones")));

  towerlog_cmd(&temp)
    .args(["milestone", "list"])
    .assert()
    .success()
    .stdout(contains("Attack").and(contains("Damage")).and(contains("1.5x speed")));

  temp.close().unwrap();
}

#[test]
#[serial]
fn test_malformed_import_fails() {
  let temp = assert_fs::TempDir::new().unwrap();
  let bad = temp.child("bad.json");
  bad.write_str("{\"runs\": 12}").unwrap();

  towerlog_cmd(&temp)
    .arg("import")
    .arg(bad.path())
    .assert()
    .failure()
    .stderr(contains("Malformed import payload"));

  temp.close().unwrap();
}

#[test]
#[serial]
fn test_milestone_rejects_unknown_speed() {
  let temp = assert_fs::TempDir::new().unwrap();

  towerlog_cmd(&temp)
    .args(["milestone", "add", "Damage", "--hours", "1", "--speed", "2.5"])
    .assert()
    .failure()
    .stderr(contains("speed must be one of"));

  towerlog_cmd(&temp).args(["milestone", "list"]).assert().success().stdout(contains("No milestones saved"));

  temp.close().unwrap();
}

#[test]
#[serial]
fn test_config_raises_threshold() {
  let temp = assert_fs::TempDir::new().unwrap();
  temp.child("config.json").write_str(r#"{"min_matched_fields": 50}"#).unwrap();

  towerlog_cmd(&temp)
    .arg("parse")
    .write_stdin(REPORT)
    .assert()
    .success()
    .stdout(contains("at least 50 are needed"));

  temp.close().unwrap();
}
