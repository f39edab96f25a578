//! Conformance tests that run YAML fixtures against lanes
//!
//! Run with: cargo test -p lanes-test --test conformance --features lanes-test/fixtures
//!
//! Note: This test file requires the `fixtures` feature to be enabled.

#![cfg(feature = "fixtures")]

use lanes_test::fixture::Fixture;
use std::fs;
use std::path::{Path, PathBuf};

/// The fixtures directory of this crate
fn fixtures_dir() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("fixtures")
}

/// Load and run every fixture in one YAML file
fn run_fixture_file(name: &str) {
    let path = fixtures_dir().join(name);
    let yaml = fs::read_to_string(&path)
        .unwrap_or_else(|e| panic!("Failed to read {}: {e}", path.display()));

    // Parse potentially multiple fixtures (separated by ---)
    let fixtures = Fixture::from_yaml_multi(&yaml).unwrap_or_else(|e| {
        panic!("Failed to parse {}: {}", path.display(), e);
    });
    assert!(!fixtures.is_empty(), "{} holds no fixtures", path.display());

    for fixture in fixtures {
        println!("  Running: {}", fixture.name);
        fixture.run_and_assert();
    }
}

#[test]
fn test_routing() {
    run_fixture_file("01_routing.yaml");
}

#[test]
fn test_multicast() {
    run_fixture_file("02_multicast.yaml");
}

#[test]
fn test_validation() {
    run_fixture_file("03_validation.yaml");
}

#[test]
fn test_expressions() {
    run_fixture_file("04_expressions.yaml");
}

#[test]
fn test_every_fixture_file_is_covered() {
    let mut files: Vec<String> = fs::read_dir(fixtures_dir())
        .expect("read fixtures dir")
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.file_name().to_string_lossy().into_owned())
        .filter(|name| name.ends_with(".yaml") || name.ends_with(".yml"))
        .collect();
    files.sort();
    assert_eq!(
        files,
        vec![
            "01_routing.yaml",
            "02_multicast.yaml",
            "03_validation.yaml",
            "04_expressions.yaml"
        ]
    );
}
