//! Integration tests for the `smartcocoon` CLI binary.
//!
//! Argument parsing, help output, completions and error handling run
//! without any service; the listing tests talk to a wiremock server.
#![allow(clippy::unwrap_used)]

use std::path::Path;

use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use serde_json::{Value, json};
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

// ── Helpers ─────────────────────────────────────────────────────────

/// Build a [`Command`] for the `smartcocoon` binary with env isolation.
///
/// Clears all `SMARTCOCOON_*` env vars and points config directories at
/// `home` so tests never touch the user's real configuration.
fn smartcocoon_cmd_in(home: &Path) -> assert_cmd::Command {
    let mut cmd = cargo_bin_cmd!("smartcocoon");
    cmd.env("HOME", home)
        .env("XDG_CONFIG_HOME", home)
        .env("XDG_DATA_HOME", home)
        .env_remove("SMARTCOCOON_PROFILE")
        .env_remove("SMARTCOCOON_OUTPUT")
        .env_remove("SMARTCOCOON_PASSWORD")
        .env_remove("RUST_LOG");
    cmd
}

fn smartcocoon_cmd() -> assert_cmd::Command {
    smartcocoon_cmd_in(Path::new("/tmp/smartcocoon-cli-test-nonexistent"))
}

/// Concatenate stdout + stderr from a command output for flexible matching.
fn combined_output(output: &std::process::Output) -> String {
    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);
    format!("{stdout}{stderr}")
}

/// Write a config with a logged-in profile pointing at `server`.
fn write_config(home: &Path, server: &MockServer) {
    let dir = home.join("smartcocoon");
    std::fs::create_dir_all(&dir).unwrap();
    let toml = format!(
        r#"default_profile = "default"

[profiles.default]
email = "user@example.com"
access_token = "token-0"
client = "client-1"
uid = "user@example.com"
base_url = "{}/api"
"#,
        server.uri()
    );
    std::fs::write(dir.join("config.toml"), toml).unwrap();
}

fn ok(body: Value) -> ResponseTemplate {
    ResponseTemplate::new(200)
        .insert_header("access-token", "token-1")
        .insert_header("client", "client-1")
        .insert_header("uid", "user@example.com")
        .set_body_json(body)
}

async fn mount_hierarchy(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/api/client_systems"))
        .respond_with(ok(json!({
            "client_systems": [{ "id": 1, "name": "Home", "location": { "city": "Austin" } }]
        })))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/rooms"))
        .and(query_param("filter[thermostat][client_system_id]", "1"))
        .respond_with(ok(json!({
            "rooms": [{
                "id": 10,
                "name": "Office",
                "fans": [{ "id": 100, "fan_id": "SC-100", "mode": "eco", "power": 5000, "connected": true }]
            }]
        })))
        .mount(server)
        .await;
}

/// Run the binary off the async runtime so wiremock keeps serving.
async fn run(mut cmd: assert_cmd::Command) -> std::process::Output {
    tokio::task::spawn_blocking(move || cmd.output().unwrap())
        .await
        .unwrap()
}

// ── Basic invocation ────────────────────────────────────────────────

#[test]
fn test_no_args_shows_help() {
    let output = smartcocoon_cmd().output().unwrap();
    assert_eq!(output.status.code(), Some(2), "Expected exit code 2");
    let text = combined_output(&output);
    assert!(text.contains("Usage"), "Expected 'Usage' in output:\n{text}");
}

#[test]
fn test_help_flag() {
    smartcocoon_cmd().arg("--help").assert().success().stdout(
        predicate::str::contains("SmartCocoon")
            .and(predicate::str::contains("systems"))
            .and(predicate::str::contains("fans"))
            .and(predicate::str::contains("watch")),
    );
}

#[test]
fn test_version_flag() {
    smartcocoon_cmd()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("smartcocoon"));
}

#[test]
fn test_fans_help_lists_actions() {
    smartcocoon_cmd().args(["fans", "--help"]).assert().success().stdout(
        predicate::str::contains("list")
            .and(predicate::str::contains("show"))
            .and(predicate::str::contains("set"))
            .and(predicate::str::contains("eco")),
    );
}

// ── Shell completions ───────────────────────────────────────────────

#[test]
fn test_completions_bash() {
    smartcocoon_cmd()
        .args(["completions", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::is_empty().not());
}

#[test]
fn test_completions_zsh() {
    smartcocoon_cmd()
        .args(["completions", "zsh"])
        .assert()
        .success()
        .stdout(predicate::str::contains("smartcocoon"));
}

// ── Argument errors ─────────────────────────────────────────────────

#[test]
fn test_invalid_subcommand() {
    let output = smartcocoon_cmd().arg("bogus").output().unwrap();
    assert_eq!(output.status.code(), Some(2));
}

#[test]
fn test_invalid_output_format() {
    let output = smartcocoon_cmd()
        .args(["-o", "yaml", "systems", "list"])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(2));
}

#[test]
fn test_fan_on_power_out_of_range() {
    let output = smartcocoon_cmd()
        .args(["fans", "on", "SC-1", "--power", "150"])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(2));
}

// ── Config ──────────────────────────────────────────────────────────

#[test]
fn test_missing_profile_is_not_found() {
    let output = smartcocoon_cmd().args(["fans", "list"]).output().unwrap();
    assert_eq!(output.status.code(), Some(4));
    let text = combined_output(&output);
    assert!(text.contains("profile"), "Expected profile error:\n{text}");
}

#[test]
fn test_config_show_without_file() {
    smartcocoon_cmd()
        .args(["config", "show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("default_profile"));
}

#[test]
fn test_config_path() {
    smartcocoon_cmd()
        .args(["config", "path"])
        .assert()
        .success()
        .stdout(predicate::str::contains("config.toml"));
}

#[test]
fn test_config_show_redacts_token() {
    let home = tempfile::tempdir().unwrap();
    let dir = home.path().join("smartcocoon");
    std::fs::create_dir_all(&dir).unwrap();
    std::fs::write(
        dir.join("config.toml"),
        "[profiles.default]\nemail = \"user@example.com\"\naccess_token = \"secret-token\"\n",
    )
    .unwrap();

    smartcocoon_cmd_in(home.path())
        .args(["config", "show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("<redacted>").and(predicate::str::contains("secret-token").not()));
}

// ── Against a mock service ──────────────────────────────────────────

#[tokio::test(flavor = "multi_thread")]
async fn test_systems_list_json() {
    let server = MockServer::start().await;
    mount_hierarchy(&server).await;
    let home = tempfile::tempdir().unwrap();
    write_config(home.path(), &server);

    let mut cmd = smartcocoon_cmd_in(home.path());
    cmd.args(["-o", "json", "systems", "list"]);
    let output = run(cmd).await;

    assert!(output.status.success(), "{}", combined_output(&output));
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Home"), "Expected system name:\n{stdout}");

    // Rotated tokens are written back.
    let saved = std::fs::read_to_string(home.path().join("smartcocoon/config.toml")).unwrap();
    assert!(saved.contains("token-1"), "Expected rotated token:\n{saved}");
}

#[tokio::test(flavor = "multi_thread")]
async fn test_fans_show_unknown_fan() {
    let server = MockServer::start().await;
    mount_hierarchy(&server).await;
    let home = tempfile::tempdir().unwrap();
    write_config(home.path(), &server);

    let mut cmd = smartcocoon_cmd_in(home.path());
    cmd.args(["fans", "show", "SC-999"]);
    let output = run(cmd).await;

    assert_eq!(output.status.code(), Some(4), "{}", combined_output(&output));

    // The failed lookup still writes back the token rotated by the listing.
    let saved = std::fs::read_to_string(home.path().join("smartcocoon/config.toml")).unwrap();
    assert!(saved.contains("token-1"), "Expected rotated token:\n{saved}");
    assert!(!saved.contains("token-0"), "Stale token kept:\n{saved}");
}

#[tokio::test(flavor = "multi_thread")]
async fn test_fans_eco_sends_mode() {
    let server = MockServer::start().await;
    mount_hierarchy(&server).await;
    Mock::given(method("PUT"))
        .and(path("/api/fans/100"))
        .respond_with(ok(json!({ "id": 100, "mode": "eco" })))
        .expect(1)
        .mount(&server)
        .await;
    let home = tempfile::tempdir().unwrap();
    write_config(home.path(), &server);

    let mut cmd = smartcocoon_cmd_in(home.path());
    cmd.args(["fans", "eco", "SC-100"]);
    let output = run(cmd).await;

    assert!(output.status.success(), "{}", combined_output(&output));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_watch_single_refresh_exits_cleanly() {
    let server = MockServer::start().await;
    mount_hierarchy(&server).await;
    let home = tempfile::tempdir().unwrap();
    write_config(home.path(), &server);

    let mut cmd = smartcocoon_cmd_in(home.path());
    cmd.args(["watch", "--count", "1"]);
    let output = run(cmd).await;

    assert!(output.status.success(), "{}", combined_output(&output));
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("(ok)"), "Expected a fresh snapshot:\n{stdout}");
    assert!(
        !combined_output(&output).contains("ended abnormally"),
        "Refresh task did not stop cleanly"
    );
}
