// Integration tests for the perfdigest binary
#![allow(deprecated)] // suppress assert_cmd::Command::cargo_bin deprecation in tests

use predicates::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

const RANGE: &str = "01/03/2012-07/03/2012";

fn fixture(name: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name)
}

/// Offline run against the fixture mailbox, with a private copy of the cache
fn perfdigest(workdir: &TempDir) -> assert_cmd::Command {
    let cache = workdir.path().join("cache.json");
    if !cache.exists() {
        fs::copy(fixture("pushlog-cache.json"), &cache).unwrap();
    }

    let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("perfdigest");
    cmd.arg(fixture("notifications.mbox"))
        .arg(RANGE)
        .arg("--config")
        .arg(fixture("perfdigest.toml"))
        .arg("--cache")
        .arg(&cache)
        .arg("--offline");
    cmd
}

#[test]
fn test_html_reports_written() {
    let workdir = TempDir::new().unwrap();
    let out = workdir.path().join("reports");

    perfdigest(&workdir)
        .arg("--output-dir")
        .arg(&out)
        .assert()
        .success()
        .stdout(predicate::str::contains("Ts, Paint: 3 ranges, 3 emails"))
        .stdout(predicate::str::contains("Dromaeo (DOM): 1 ranges, 1 emails"));

    let html = fs::read_to_string(out.join("ts-paint.html")).unwrap();
    assert!(html.contains("Summary of changes for Ts, Paint over 01/03/2012-07/03/2012"));
    assert!(html.contains("<th>Linux</th><th>Win7-PGO</th>"));
    assert!(html.contains(r#"<td class="regression" rowspan="2">+5.2</td>"#));
    assert!(html.contains(r#"<td class="improvement" rowspan="2">-3</td>"#));
    assert!(html.contains("fromchange=0123456789ab&amp;tochange=1123456789ab"));

    assert!(out.join("dromaeo-dom.html").exists());
}

#[test]
fn test_text_format() {
    let workdir = TempDir::new().unwrap();

    perfdigest(&workdir)
        .arg("--format")
        .arg("text")
        .arg("--test")
        .arg("Ts, Paint")
        .assert()
        .success()
        .stdout(predicate::str::contains("Ts, Paint: 3 ranges, 3 emails"))
        .stdout(predicate::str::contains("Linux: +5.2 Win7-PGO: -3"))
        .stdout(predicate::str::contains("skipped Linux"))
        .stdout(predicate::str::contains("Dromaeo").not());
}

#[test]
fn test_json_format() {
    let workdir = TempDir::new().unwrap();

    let output = perfdigest(&workdir)
        .arg("--format")
        .arg("json")
        .output()
        .unwrap();
    assert!(output.status.success());

    let value: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(value["format"], "perfdigest-json-v1");
    assert_eq!(value["date_range"], RANGE);
    assert_eq!(value["tests"][0]["test"], "Ts, Paint");
    assert_eq!(value["tests"][0]["ranges_produced"], 3);
    assert_eq!(value["tests"][0]["skipped"][0]["platform"], "Linux");
    assert_eq!(value["tests"][1]["intervals"][0]["deltas"]["XP"]["sign"], "+");
}

#[test]
fn test_unresolved_range_is_logged() {
    let workdir = TempDir::new().unwrap();

    perfdigest(&workdir)
        .arg("--format")
        .arg("text")
        .assert()
        .success()
        .stderr(predicate::str::contains("skipping Linux notification"));
}

#[test]
fn test_no_report_for_empty_test() {
    let workdir = TempDir::new().unwrap();
    let out = workdir.path().join("reports");

    perfdigest(&workdir)
        .arg("--output-dir")
        .arg(&out)
        .arg("--test")
        .arg("V8")
        .assert()
        .success()
        .stdout(predicate::str::contains("V8: 0 ranges, 0 emails"));

    assert!(!out.join("v8.html").exists());
}

#[test]
fn test_reject_policy_accepted() {
    let workdir = TempDir::new().unwrap();

    perfdigest(&workdir)
        .arg("--format")
        .arg("text")
        .arg("--conflict-policy")
        .arg("reject")
        .assert()
        .success()
        .stdout(predicate::str::contains("Ts, Paint: 3 ranges, 3 emails"));
}

#[test]
fn test_bad_date_range() {
    let workdir = TempDir::new().unwrap();

    let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("perfdigest");
    cmd.arg(fixture("notifications.mbox"))
        .arg("March 2012")
        .arg("--cache")
        .arg(workdir.path().join("cache.json"))
        .arg("--offline")
        .assert()
        .failure()
        .stderr(predicate::str::contains("date range"));
}

#[test]
fn test_missing_mailbox() {
    let workdir = TempDir::new().unwrap();

    let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("perfdigest");
    cmd.arg(workdir.path().join("missing.mbox"))
        .arg(RANGE)
        .arg("--offline")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to read"));
}

#[test]
fn test_invalid_config_rejected() {
    let workdir = TempDir::new().unwrap();
    let config = workdir.path().join("bad.toml");
    fs::write(&config, "platforms = []\n").unwrap();

    let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("perfdigest");
    cmd.arg(fixture("notifications.mbox"))
        .arg(RANGE)
        .arg("--config")
        .arg(&config)
        .arg("--offline")
        .assert()
        .failure()
        .stderr(predicate::str::contains("platforms must not be empty"));
}
