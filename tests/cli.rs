// ABOUTME: Integration tests for the hoist CLI commands.
// ABOUTME: Validates --help output, flag conflicts, and config resolution errors.

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;

fn hoist_cmd() -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("hoist"));
    cmd.env_remove("HOIST_API_TOKEN").env_remove("RUST_LOG");
    cmd
}

#[test]
fn help_shows_commands() {
    hoist_cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("deploy"))
        .stdout(predicate::str::contains("config"));
}

#[test]
fn deploy_help_lists_build_flags() {
    hoist_cmd()
        .args(["deploy", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--nix"))
        .stdout(predicate::str::contains("--build-only"))
        .stdout(predicate::str::contains("--detach"))
        .stdout(predicate::str::contains("--build-arg"))
        .stdout(predicate::str::contains("--strict-sync"))
        .stdout(predicate::str::contains("WORKING_DIRECTORY"));
}

#[test]
fn nix_and_image_conflict() {
    hoist_cmd()
        .args(["deploy", "--nix", "--image", "nginx:1.27"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("cannot be used with"));
}

#[test]
fn deploy_requires_api_token() {
    let temp_dir = tempfile::tempdir().unwrap();

    hoist_cmd()
        .current_dir(temp_dir.path())
        .args(["deploy", "--app", "web"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("HOIST_API_TOKEN"));
}

#[test]
fn deploy_without_app_name_fails() {
    let temp_dir = tempfile::tempdir().unwrap();

    hoist_cmd()
        .current_dir(temp_dir.path())
        .env("HOIST_API_TOKEN", "test-token")
        .arg("deploy")
        .assert()
        .failure()
        .stderr(predicate::str::contains("no app name"));
}

#[test]
fn config_prints_local_definition_with_env_overrides() {
    let temp_dir = tempfile::tempdir().unwrap();
    fs::write(
        temp_dir.path().join("hoist.yml"),
        "app: web\nenv:\n  LOG_LEVEL: info\n",
    )
    .unwrap();

    hoist_cmd()
        .current_dir(temp_dir.path())
        .env("HOIST_API_TOKEN", "test-token")
        .args(["config", "--env", "LOG_LEVEL=debug"])
        .assert()
        .success()
        .stdout(predicate::str::contains("app: web"))
        .stdout(predicate::str::contains("LOG_LEVEL: debug"));
}

#[test]
fn malformed_env_flag_is_rejected() {
    let temp_dir = tempfile::tempdir().unwrap();
    fs::write(temp_dir.path().join("hoist.yml"), "app: web\n").unwrap();

    hoist_cmd()
        .current_dir(temp_dir.path())
        .env("HOIST_API_TOKEN", "test-token")
        .args(["config", "--env", "LOG_LEVEL"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("NAME=VALUE"));
}
