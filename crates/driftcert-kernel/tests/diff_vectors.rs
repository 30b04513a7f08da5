//! Integration tests: diff the fixture trees and compare to expected deltas.
//!
//! Each fixture in tests/fixtures/ has:
//! - golden/ and candidate/: the two materialized trees
//! - expect.json: structural sets, the located deltas, unparseable files

use driftcert_kernel::{Snapshot, default_detectors, detect_drift};
use serde_json::{Value, json};
use std::path::PathBuf;

fn fixtures_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures")
}

fn run_fixture(name: &str) {
    let dir = fixtures_dir().join(name);

    let golden = Snapshot::from_dir(dir.join("golden"))
        .unwrap_or_else(|e| panic!("failed to load golden tree for {name}: {e}"));
    let candidate = Snapshot::from_dir(dir.join("candidate"))
        .unwrap_or_else(|e| panic!("failed to load candidate tree for {name}: {e}"));

    let expect_path = dir.join("expect.json");
    let expect_str = std::fs::read_to_string(&expect_path)
        .unwrap_or_else(|e| panic!("failed to read {}: {e}", expect_path.display()));
    let expected: Value = serde_json::from_str(&expect_str)
        .unwrap_or_else(|e| panic!("failed to parse {}: {e}", expect_path.display()));

    let report = detect_drift(&golden, &candidate, &default_detectors());
    let deltas: Vec<Value> = report
        .deltas
        .iter()
        .map(|d| {
            json!({
                "id": d.id,
                "category": d.category,
                "change_type": d.change_type,
                "old_value": d.old_value,
                "new_value": d.new_value,
                "line_hint": d.line_hint,
                "detection_sources": d.detection_sources,
            })
        })
        .collect();
    let got = json!({
        "structural": report.structural,
        "deltas": deltas,
        "unparseable": report.unparseable,
    });

    assert_eq!(
        got,
        expected,
        "\n\nFixture: {name}\n\nGot:\n{}\n\nExpected:\n{}\n",
        serde_json::to_string_pretty(&got).unwrap(),
        serde_json::to_string_pretty(&expected).unwrap(),
    );
}

#[test]
fn spring_profile_password() {
    run_fixture("spring_profile_password");
}

#[test]
fn maven_manifest() {
    run_fixture("maven_manifest");
}

#[test]
fn renames_and_hunks() {
    run_fixture("renames_and_hunks");
}

#[test]
fn identical_trees_have_no_drift() {
    let dir = fixtures_dir().join("maven_manifest/golden");
    let golden = Snapshot::from_dir(&dir).unwrap();
    let candidate = Snapshot::from_dir(&dir).unwrap();
    let report = detect_drift(&golden, &candidate, &default_detectors());
    assert!(report.structural.is_empty());
    assert!(report.deltas.is_empty());
}
