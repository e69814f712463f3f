//! CLI contract tests for `bm`.
//!
//! Runs the binary against snapshot fixtures in a temp dir and checks:
//! - search text and JSON output
//! - resolve prints the frame/type/link tree
//! - browse walks a session from stdin
//! - actionable errors for missing or broken inputs

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

// =============================================================================
// Fixtures
// =============================================================================

const CATALOG: &str = r#"{
  "vehicles": [
    {"brand": "KIA", "model": "RIO", "years": "2017-2020", "mount": "hook", "driver": 600, "passenger": 400},
    {"brand": "KIA", "model": "CEED", "years": "2012-2018", "mount": "hook", "driver": 650, "passenger": 400},
    {"brand": "VOLKSWAGEN", "model": "POLO", "years": "2010-2020", "mount": "hook", "driver": 600, "passenger": 400}
  ],
  "frames": [
    {"mount": "hook", "frame": "F1", "sizes": [600, 400]}
  ],
  "blade_types": [
    {"frame": "F1", "blade_type": "FRAMELESS", "description": "All-season"}
  ],
  "links": [
    {"frame": "F1", "blade_type": "FRAMELESS", "mount": "hook", "fit": {"kit": [600, 400]},
     "ozon": "https://ozon.example/kit", "wildberries": "https://wb.example/kit"},
    {"frame": "F1", "blade_type": "FRAMELESS", "mount": "hook", "fit": {"single": 400},
     "wildberries": "https://wb.example/400"}
  ]
}"#;

const SYNONYMS: &str = r#"{"VOLKSWAGEN": ["VW"]}"#;

fn setup() -> TempDir {
    let dir = TempDir::new().expect("create temp dir");
    std::fs::write(dir.path().join("catalog.json"), CATALOG).expect("write catalog");
    std::fs::write(dir.path().join("synonyms.json"), SYNONYMS).expect("write synonyms");
    dir
}

fn bm(dir: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("bm").expect("bm binary should be built");
    cmd.env_remove("RUST_LOG")
        .env_remove("BM_CONFIG")
        .arg("--catalog")
        .arg(dir.path().join("catalog.json"))
        .arg("--synonyms")
        .arg(dir.path().join("synonyms.json"))
        .arg("--log-level")
        .arg("error");
    cmd
}

// =============================================================================
// search
// =============================================================================

#[test]
fn search_prints_exact_match() {
    let dir = setup();
    bm(&dir)
        .args(["search", "kia", "rio"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Matches:"))
        .stdout(predicate::str::contains("KIA RIO (2017-2020)"));
}

#[test]
fn search_brand_alias_lists_rows() {
    let dir = setup();
    bm(&dir)
        .args(["search", "vw"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Brand listing:"))
        .stdout(predicate::str::contains("VOLKSWAGEN POLO"));
}

#[test]
fn search_typo_reports_similar() {
    let dir = setup();
    bm(&dir)
        .args(["search", "kio", "rio"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Similar:"))
        .stdout(predicate::str::contains("Matches:").not());
}

#[test]
fn search_json_is_parseable() {
    let dir = setup();
    let output = bm(&dir)
        .args(["search", "--json", "kia"])
        .output()
        .expect("run bm");
    assert!(output.status.success());
    let value: serde_json::Value = serde_json::from_slice(&output.stdout).expect("valid JSON");
    assert_eq!(value["kind"], "brand_listing");
    assert_eq!(value["matches"].as_array().map(Vec::len), Some(2));
}

// =============================================================================
// resolve
// =============================================================================

#[test]
fn resolve_prints_tree() {
    let dir = setup();
    bm(&dir)
        .args(["resolve", "--brand", "KIA", "--model", "RIO", "--years", "2017-2020"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Frame F1"))
        .stdout(predicate::str::contains("Type FRAMELESS (All-season)"))
        .stdout(predicate::str::contains("https://ozon.example/kit"))
        .stdout(predicate::str::contains("https://wb.example/400"));
}

#[test]
fn resolve_reports_no_parts_without_failing() {
    let dir = setup();
    bm(&dir)
        .args(["resolve", "--brand", "KIA", "--model", "CEED", "--years", "2012-2018"])
        .assert()
        .success()
        .stdout(predicate::str::contains("no compatible parts"));
}

#[test]
fn resolve_unknown_vehicle_fails() {
    let dir = setup();
    bm(&dir)
        .args(["resolve", "--brand", "KIA", "--model", "K5", "--years", "2020-"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("not in the catalog"));
}

// =============================================================================
// browse
// =============================================================================

#[test]
fn browse_walks_to_kit_links() {
    let dir = setup();
    // "kia rio" goes straight to frames: [1] F1, [2] favorites, [3] new search.
    // F1 auto-selects FRAMELESS: [1] kit, [2] single, ...
    bm(&dir)
        .arg("browse")
        .write_stdin("kia rio\n1\n1\n/quit\n")
        .assert()
        .success()
        .stdout(predicate::str::contains("Choose a frame:"))
        .stdout(predicate::str::contains("Kit (driver + passenger)"))
        .stdout(predicate::str::contains("ozon: https://ozon.example/kit"));
}

#[test]
fn browse_brand_command_and_favorites() {
    let dir = setup();
    bm(&dir)
        .arg("browse")
        .write_stdin("/brand\nvw\n1\n2\n/favorites\n")
        .assert()
        .success()
        .stdout(predicate::str::contains("Choose a model:"))
        .stdout(predicate::str::contains("Added to favorites."))
        .stdout(predicate::str::contains("Favorites (page 1 of 1):"));
}

#[test]
fn browse_feedback_and_cancel() {
    let dir = setup();
    bm(&dir)
        .arg("browse")
        .write_stdin("/feedback\nplease add lada\n/brand\n/cancel\n/cancel\n")
        .assert()
        .success()
        .stdout(predicate::str::contains("Thank you!"))
        .stdout(predicate::str::contains("Brand search cancelled."))
        .stdout(predicate::str::contains("Nothing to cancel."));
}

#[test]
fn browse_stats_counts_messages() {
    let dir = setup();
    bm(&dir)
        .arg("browse")
        .write_stdin("kia\n/help\n/stats\n")
        .assert()
        .success()
        .stdout(predicate::str::contains("Messages: 3"))
        .stdout(predicate::str::contains("Users: 1"));
}

#[test]
fn browse_frames_list_sizes_per_line() {
    let dir = setup();
    bm(&dir)
        .arg("browse")
        .write_stdin("kia rio\n")
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "Driver side: 600 mm\nPassenger side: 400 mm\nChoose a frame:",
        ));
}

// =============================================================================
// failures
// =============================================================================

#[test]
fn missing_catalog_is_actionable() {
    let mut cmd = Command::cargo_bin("bm").expect("bm binary should be built");
    cmd.env_remove("BM_CATALOG")
        .args(["--log-level", "error", "search", "kia"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("--catalog"));
}

#[test]
fn broken_catalog_names_the_file() {
    let dir = setup();
    std::fs::write(dir.path().join("catalog.json"), "{ not json").expect("write");
    bm(&dir)
        .args(["search", "kia"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("catalog.json"));
}

#[test]
fn invalid_config_is_rejected() {
    let dir = setup();
    let config = dir.path().join("bm.toml");
    std::fs::write(&config, "[search]\naccept_threshold = 2.0\n").expect("write config");
    bm(&dir)
        .arg("--config")
        .arg(&config)
        .args(["search", "kia"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("accept_threshold"));
}
