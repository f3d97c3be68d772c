// Shared test helpers for integration tests
#![allow(dead_code)]

use stack_matrix::core::manifest::ReleaseManifest;
use std::path::PathBuf;

/// The CI variables that steer `generate`; removed so the host CI cannot leak into tests.
pub const CI_VARS: &[&str] = &[
    "TARGET_BRANCH",
    "GITHUB_PR_TARGET_BRANCH",
    "MANUAL_TARGET_BRANCH",
    "BUILDKITE_SOURCE",
    "BUILDKITE_BRANCH",
    "ELASTIC_STACK_VERSION",
    "E2E_PROJECT_TYPE",
];

pub fn fixture_path(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name)
}

/// A manifest with a legacy 7.x line, two 8.x lines, a future 8.x line and `main`.
pub fn sample_manifest() -> ReleaseManifest {
    let document = std::fs::read_to_string(fixture_path("logstash_versions.yml"))
        .expect("Failed to read manifest fixture");
    ReleaseManifest::parse(&document).expect("Failed to parse manifest fixture")
}
