#![allow(clippy::unwrap_used, clippy::expect_used)]

//! CLI smoke tests for the innsyn-server binary
//!
//! These run the compiled binary and check configuration loading, the
//! `check` subcommand, `--print-config` and that `run` starts up.

use std::process::{Command, Stdio};
use std::time::Duration;
use tempfile::TempDir;
use tokio::time::timeout;

fn run_innsyn_server(args: &[&str]) -> std::process::Output {
    Command::new(env!("CARGO_BIN_EXE_innsyn-server"))
        .args(args)
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output()
        .expect("Failed to execute innsyn-server")
}

/// `Err("elapsed")` means the process was still running at the deadline.
async fn run_innsyn_server_with_timeout(
    args: &[&str],
    timeout_duration: Duration,
) -> Result<std::process::Output, Box<dyn std::error::Error>> {
    let mut cmd = tokio::process::Command::new(env!("CARGO_BIN_EXE_innsyn-server"));
    cmd.args(args)
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    let child = cmd.spawn()?;
    match timeout(timeout_duration, child.wait_with_output()).await {
        Ok(result) => result.map_err(Into::into),
        Err(_elapsed) => Err("elapsed".into()),
    }
}

fn write_config(dir: &TempDir, content: &str) -> String {
    let path = dir.path().join("innsyn.yaml");
    std::fs::write(&path, content).expect("Failed to write config file");
    path.to_str().unwrap().to_owned()
}

/// Drops the human-readable first line and parses the rest as YAML.
fn yaml_after_first_line(stdout: &str) -> serde_json::Value {
    let yaml = stdout.split_once('\n').map_or("", |(_, rest)| rest);
    serde_saphyr::from_str(yaml).expect("Output should be valid YAML")
}

#[test]
fn test_cli_help_command() {
    let output = run_innsyn_server(&["--help"]);

    assert!(output.status.success(), "Help command should succeed");
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("innsyn-server"), "Should contain binary name");
    assert!(stdout.contains("Usage:"), "Should contain usage information");
    assert!(stdout.contains("run"), "Should contain 'run' subcommand");
    assert!(stdout.contains("check"), "Should contain 'check' subcommand");
    assert!(stdout.contains("--config"), "Should mention config option");
}

#[test]
fn test_cli_version_command() {
    let output = run_innsyn_server(&["--version"]);

    assert!(output.status.success(), "Version command should succeed");
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("innsyn-server"));
    assert!(stdout.chars().any(|c| c.is_ascii_digit()));
}

#[test]
fn test_cli_invalid_command() {
    let output = run_innsyn_server(&["invalid-command"]);

    assert!(!output.status.success(), "Invalid command should fail");
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("error"), "Should report the bad subcommand: {stderr}");
}

#[test]
fn test_cli_config_validation_missing_file() {
    let output = run_innsyn_server(&["--config", "/nonexistent/innsyn.yaml", "check"]);

    assert!(!output.status.success(), "Should fail when config file doesn't exist");
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("does not exist"), "Should indicate config file not found: {stderr}");
}

#[test]
fn test_cli_config_validation_invalid_yaml() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let config_path = write_config(&temp_dir, "invalid: yaml: content: [unclosed");

    let output = run_innsyn_server(&["--config", &config_path, "check"]);

    assert!(!output.status.success(), "Should fail with invalid YAML");
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("invalid configuration"), "Should mention the configuration: {stderr}");
}

#[test]
fn test_cli_unknown_key_is_rejected() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let config_path = write_config(&temp_dir, "innsyn:\n  fiks:\n    integrasjonid: feilstavet\n");

    let output = run_innsyn_server(&["--config", &config_path, "check"]);

    assert!(!output.status.success(), "Unknown keys should be rejected");
}

#[test]
fn test_cli_check_valid_config() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let config_path = write_config(
        &temp_dir,
        r#"
server:
  port: 8181
logging:
  level: error
innsyn:
  fiks:
    base_url: "https://fiks.test"
    integrasjonpassord: "topphemmelig"
  unleash:
    environment: "dev"
"#,
    );

    let output = run_innsyn_server(&["--config", &config_path, "check"]);

    if !output.status.success() {
        eprintln!("STDERR: {}", String::from_utf8_lossy(&output.stderr));
    }
    assert!(output.status.success(), "Should succeed with valid config");

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.starts_with("Configuration is valid"));
    assert!(!stdout.contains("topphemmelig"), "Secrets must not be printed");
    let yaml = yaml_after_first_line(&stdout);
    assert_eq!(yaml["server"]["port"], 8181);
    assert_eq!(yaml["innsyn"]["fiks"]["base_url"], "https://fiks.test");
    assert_eq!(yaml["innsyn"]["fiks"]["integrasjonpassord"], "[REDACTED]");
}

#[test]
fn test_cli_check_requires_xsrf_secret_in_prod() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let config_path = write_config(&temp_dir, "logging:\n  level: error\ninnsyn:\n  is_prod: true\n");

    let output = run_innsyn_server(&["--config", &config_path, "check"]);

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("xsrf.secret"), "{stderr}");
}

#[test]
fn test_cli_print_config_with_port_override() {
    let output = run_innsyn_server(&["--print-config", "--port", "9393"]);

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.starts_with("Effective configuration:"));
    let yaml = yaml_after_first_line(&stdout);
    assert_eq!(yaml["server"]["port"], 9393);
    assert_eq!(yaml["database"]["url"], "sqlite::memory:");
}

#[test]
fn test_cli_env_overrides_file() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let config_path = write_config(&temp_dir, "server:\n  port: 8181\n");

    let output = Command::new(env!("CARGO_BIN_EXE_innsyn-server"))
        .args(["--config", &config_path, "--print-config"])
        .env("APP__SERVER__PORT", "8282")
        .output()
        .expect("Failed to execute innsyn-server");

    assert!(output.status.success());
    let yaml = yaml_after_first_line(&String::from_utf8_lossy(&output.stdout));
    assert_eq!(yaml["server"]["port"], 8282);
}

#[test]
fn test_cli_verbose_flag() {
    let output = run_innsyn_server(&["-vv", "--help"]);

    assert!(output.status.success(), "Verbose help should succeed");
    assert!(String::from_utf8_lossy(&output.stdout).contains("Usage:"));
}

#[tokio::test]
async fn test_cli_run_starts_and_keeps_running() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let config_path = write_config(
        &temp_dir,
        r#"
server:
  bind_addr: "127.0.0.1"
  port: 0
logging:
  level: error
database:
  url: "sqlite::memory:"
"#,
    );

    let result = run_innsyn_server_with_timeout(&["--config", &config_path, "run"], Duration::from_secs(3)).await;

    match result {
        Err(e) => assert_eq!(e.to_string(), "elapsed", "Server should still be running"),
        Ok(output) => panic!(
            "Server exited early: {}",
            String::from_utf8_lossy(&output.stderr)
        ),
    }
}

#[test]
fn test_cli_run_with_bad_database_url_fails() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let config_path = write_config(
        &temp_dir,
        "server:\n  bind_addr: \"127.0.0.1\"\n  port: 0\ndatabase:\n  url: \"mysql2://nowhere\"\n",
    );

    let output = run_innsyn_server(&["--config", &config_path, "run"]);

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("database"), "{stderr}");
}
