//! # CLI Integration Tests / CLI 集成测试
//!
//! Runs the `stack-matrix` binary against manifest fixtures and checks the
//! emitted pipeline and the failure modes.
//!
//! 针对清单夹具运行 `stack-matrix` 二进制文件，检查输出的流水线及失败情况。

mod common;

use assert_cmd::prelude::*;
use predicates::prelude::*;
use std::process::Command;
use tempfile::tempdir;

/// A `stack-matrix` command with every CI variable cleared and English messages.
fn stack_matrix() -> Command {
    let mut cmd = Command::cargo_bin("stack-matrix").unwrap();
    for var in common::CI_VARS {
        cmd.env_remove(var);
    }
    cmd.env_remove("RUST_LOG").arg("--lang").arg("en");
    cmd
}

fn generate(pipeline: &str) -> Command {
    let mut cmd = stack_matrix();
    cmd.arg("generate")
        .arg("--pipeline")
        .arg(pipeline)
        .arg("--manifest-file")
        .arg(common::fixture_path("logstash_versions.yml"));
    cmd
}

/// A pull request against 8.15 gets unit and integration steps for the
/// released and the snapshot 8.15 versions.
///
/// 针对 8.15 的拉取请求会为已发布和快照的 8.15 版本生成单元和集成测试步骤。
#[test]
fn test_pull_request_pipeline() {
    generate("pull-request")
        .env("GITHUB_PR_TARGET_BRANCH", "8.15")
        .assert()
        .success()
        .stdout(predicate::str::starts_with("# yaml-language-server: $schema="))
        .stdout(predicate::str::contains("group: 8.15 branch steps"))
        .stdout(predicate::str::contains("key: pr-and-build-steps"))
        .stdout(predicate::str::contains("Unit test for 8.15.2, snapshot: false"))
        .stdout(predicate::str::contains("Integration test for 8.15.3-SNAPSHOT, snapshot: true"))
        .stdout(predicate::str::contains("machineType: n1-standard-4"));
}

/// The pull-request pipeline reads `GITHUB_PR_TARGET_BRANCH`, not `TARGET_BRANCH`.
/// 拉取请求流水线读取 `GITHUB_PR_TARGET_BRANCH`，而不是 `TARGET_BRANCH`。
#[test]
fn test_pull_request_ignores_target_branch() {
    generate("pull-request")
        .env("TARGET_BRANCH", "8.15")
        .assert()
        .failure()
        .stderr(predicate::str::contains("GITHUB_PR_TARGET_BRANCH"));
}

#[test]
fn test_manual_target_branch_override() {
    generate("build")
        .env("TARGET_BRANCH", "8.15")
        .env("MANUAL_TARGET_BRANCH", "main")
        .assert()
        .success()
        .stdout(predicate::str::contains("group: main branch steps"))
        .stdout(predicate::str::contains("Unit test for 9.0.0-SNAPSHOT, snapshot: true"))
        .stdout(predicate::str::contains("8.15.2").not());
}

/// Scheduled e2e runs get one step per non-legacy snapshot, each pinned to its branch.
/// 定时的 e2e 运行为每个非旧版快照生成一个步骤，每个步骤固定到其分支。
#[test]
fn test_scheduled_e2e_pipeline() {
    generate("e2e")
        .env("BUILDKITE_SOURCE", "schedule")
        .assert()
        .success()
        .stdout(predicate::str::contains("group: scheduled branch E2E steps"))
        .stdout(predicate::str::contains("key: e2e-steps"))
        .stdout(predicate::str::contains("E2E tests for 8.16.0-SNAPSHOT, snapshot: true"))
        .stdout(predicate::str::contains("TARGET_BRANCH: 8.x"))
        .stdout(predicate::str::contains("diskSizeGb: 120"))
        .stdout(predicate::str::contains("7.17.25-SNAPSHOT").not());
}

#[test]
fn test_unknown_track_emits_empty_group() {
    generate("build")
        .arg("--target-branch")
        .arg("6.8")
        .assert()
        .success()
        .stdout(predicate::str::contains("group: 6.8 branch steps"))
        .stdout(predicate::str::contains("steps: []"));
}

#[test]
fn test_missing_main_snapshot_fails() {
    stack_matrix()
        .arg("generate")
        .arg("--pipeline")
        .arg("build")
        .arg("--manifest-file")
        .arg(common::fixture_path("releases_without_main.json"))
        .arg("--target-branch")
        .arg("main")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Error:"))
        .stderr(predicate::str::contains("`main`"));
}

#[test]
fn test_missing_target_branch_fails() {
    generate("build")
        .assert()
        .failure()
        .stderr(predicate::str::contains("no target branch given"));
}

#[test]
fn test_unknown_pipeline_is_rejected() {
    generate("nightly").assert().failure();
}

#[test]
fn test_manifest_sources_conflict() {
    generate("build")
        .arg("--manifest-url")
        .arg("http://localhost:1/versions.yml")
        .arg("--target-branch")
        .arg("8.15")
        .assert()
        .failure();
}

#[test]
fn test_config_file_is_loaded() {
    let dir = tempdir().unwrap();
    let config = dir.path().join("StackMatrix.toml");
    std::fs::write(&config, "[retry]\nmax_retries = 0\n").unwrap();

    generate("build")
        .arg("--config")
        .arg(&config)
        .arg("--target-branch")
        .arg("8.14")
        .assert()
        .success()
        .stdout(predicate::str::contains("Unit test for 8.14.3, snapshot: false"));
}

#[test]
fn test_e2e_requires_stack_version() {
    stack_matrix()
        .arg("e2e")
        .assert()
        .failure()
        .stderr(predicate::str::contains("ELASTIC_STACK_VERSION"));
}

#[test]
fn test_e2e_rejects_unknown_project_type() {
    stack_matrix()
        .arg("e2e")
        .env("ELASTIC_STACK_VERSION", "8.15.2")
        .env("E2E_PROJECT_TYPE", "cloud")
        .assert()
        .failure()
        .stderr(predicate::str::contains("on_prems, serverless"));
}

#[test]
fn test_help_lists_subcommands() {
    stack_matrix()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("generate"))
        .stdout(predicate::str::contains("e2e"));
}
