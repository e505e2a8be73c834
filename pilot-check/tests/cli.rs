//! CLI integration tests for pilot-check

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

const DEPLOYMENT_VARS: &[&str] = &[
    "POSTPILOT_CONFIG",
    "NOTION_API_KEY",
    "NOTION_DATABASE_ID",
    "LINE_CHANNEL_ACCESS_TOKEN",
    "LINE_USER_ID",
    "FACEBOOK_ACCESS_TOKEN",
    "FACEBOOK_PAGE_ID",
    "INSTAGRAM_ACCESS_TOKEN",
    "INSTAGRAM_USER_ID",
    "THREADS_ACCESS_TOKEN",
    "THREADS_USER_ID",
    "LOG_LEVEL",
    "LOG_FILE",
];

const SECRET_CONFIG: &str = r#"
[source]
api_key = "secret_notion_value"
database_id = "0123456789abcdef"
base_url = "http://127.0.0.1:9/v1"

[notifier]
channel_access_token = "line_token_value"
recipient_id = "U0"
base_url = "http://127.0.0.1:9/v2/bot"

[facebook]
access_token = "fb_token_value"
page_id = "page1"
base_url = "http://127.0.0.1:9"

[publishing]
request_timeout_secs = 2
"#;

fn setup(config_body: &str) -> (TempDir, PathBuf) {
    let temp_dir = TempDir::new().unwrap();
    let config_path = temp_dir.path().join("config.toml");
    fs::write(&config_path, config_body).unwrap();
    (temp_dir, config_path)
}

fn cmd(config_path: &PathBuf) -> Command {
    let mut cmd = Command::cargo_bin("pilot-check").unwrap();
    for var in DEPLOYMENT_VARS {
        cmd.env_remove(var);
    }
    cmd.arg("--config").arg(config_path);
    cmd
}

#[test]
fn test_help_flag_output() {
    Command::cargo_bin("pilot-check")
        .unwrap()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("--probe"))
        .stdout(predicate::str::contains("--format"));
}

#[test]
fn test_text_summary_never_prints_secrets() {
    let (_dir, path) = setup(SECRET_CONFIG);

    cmd(&path)
        .assert()
        .success()
        .stdout(predicate::str::contains("Configuration valid: yes"))
        .stdout(predicate::str::contains("database 01234567..."))
        .stdout(predicate::str::contains("Facebook configured: yes"))
        .stdout(predicate::str::contains("Threads configured:  no"))
        .stdout(predicate::str::contains("secret_notion_value").not())
        .stdout(predicate::str::contains("line_token_value").not())
        .stdout(predicate::str::contains("fb_token_value").not());
}

#[test]
fn test_json_summary() {
    let (_dir, path) = setup(SECRET_CONFIG);

    let output = cmd(&path).args(["--format", "json"]).output().unwrap();
    assert!(output.status.success());

    let report: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(report["config"]["config_valid"], true);
    assert_eq!(report["config"]["source_database_id"], "01234567...");
    assert_eq!(report["config"]["instagram_configured"], false);
    assert!(report.get("services").is_none());
}

#[test]
fn test_incomplete_config_is_reported_not_fatal() {
    let (_dir, path) = setup("");

    cmd(&path)
        .assert()
        .success()
        .stdout(predicate::str::contains("Configuration valid: no"));
}

#[test]
fn test_probe_failures_exit_1() {
    let (_dir, path) = setup(SECRET_CONFIG);

    let output = cmd(&path)
        .args(["--probe", "--format", "json"])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(1));

    let report: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let services = report["services"].as_array().unwrap();
    let names: Vec<&str> = services
        .iter()
        .map(|s| s["service"].as_str().unwrap())
        .collect();
    assert_eq!(names, vec!["source", "Facebook", "notifier"]);
    assert!(services.iter().all(|s| s["ok"] == false));
}

#[test]
fn test_malformed_config_exit_code_2() {
    let (_dir, path) = setup("[notifier\n");

    cmd(&path).assert().code(2);
}
