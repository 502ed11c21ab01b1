//! Binary integration tests for CLI commands
//!
//! These tests run the actual moa binary against a mock service.

#![expect(clippy::unwrap_used, reason = "integration test assertions")]

use std::process::Command;

use moa_console::config::Config;
use tempfile::TempDir;

fn moa_bin(config_dir: &TempDir) -> Command {
    let config_path = config_dir.path().join("config.json");
    Config::default().save_to(&config_path).unwrap();
    let mut command = Command::new(env!("CARGO_BIN_EXE_moa"));
    command.env("DEBUG", "0").arg("--config").arg(config_path);
    command
}

#[test]
fn test_cli_help() {
    let dir = TempDir::new().unwrap();
    let output = moa_bin(&dir).arg("--help").output().unwrap();
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("ask"));
    assert!(stdout.contains("models"));
}

#[test]
fn test_cli_version() {
    let dir = TempDir::new().unwrap();
    let output = moa_bin(&dir).arg("--version").output().unwrap();
    assert!(output.status.success());
}

#[test]
fn test_cli_models_groups_by_provider() {
    let mut server = mockito::Server::new();
    let mock = server
        .mock("GET", "/models")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"["OpenAI gpt-4","Anthropic claude-3","OpenAI gpt-3.5-turbo"]"#)
        .create();

    let dir = TempDir::new().unwrap();
    let output = moa_bin(&dir)
        .args(["--server", &server.url(), "models"])
        .output()
        .unwrap();

    mock.assert();
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert_eq!(
        stdout,
        "OpenAI\n  gpt-4\n  gpt-3.5-turbo\nAnthropic\n  claude-3\n"
    );
}

#[test]
fn test_cli_ask_prints_every_answer() {
    let mut server = mockito::Server::new();
    let catalog = server
        .mock("GET", "/models")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"["OpenAI gpt-4","Anthropic claude-3"]"#)
        .create();
    let generate = server
        .mock("POST", "/moa")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            r#"{"proposals":{"OpenAI gpt-4":"**4**","Anthropic claude-3":"four"},"aggregatedResponse":"The answer is 4"}"#,
        )
        .create();

    let dir = TempDir::new().unwrap();
    let output = moa_bin(&dir)
        .args(["--server", &server.url(), "ask", "2+2", "--all"])
        .output()
        .unwrap();

    catalog.assert();
    generate.assert();
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("== OpenAI gpt-4 ==\n4\n"));
    assert!(stdout.contains("== Anthropic claude-3 ==\nfour\n"));
    assert!(stdout.contains("== Aggregate ==\nThe answer is 4\n"));
}

#[test]
fn test_cli_ask_server_error_fails() {
    let mut server = mockito::Server::new();
    let _catalog = server
        .mock("GET", "/models")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"["OpenAI gpt-4"]"#)
        .create();
    let _generate = server.mock("POST", "/moa").with_status(500).create();

    let dir = TempDir::new().unwrap();
    let output = moa_bin(&dir)
        .args(["--server", &server.url(), "ask", "2+2", "--model", "OpenAI gpt-4"])
        .output()
        .unwrap();

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("An error occurred while generating the response."));
}

#[test]
fn test_cli_ask_unknown_model_fails() {
    let mut server = mockito::Server::new();
    let _catalog = server
        .mock("GET", "/models")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"["OpenAI gpt-4"]"#)
        .create();

    let dir = TempDir::new().unwrap();
    let output = moa_bin(&dir)
        .args(["--server", &server.url(), "ask", "hi", "--model", "Mistral large"])
        .output()
        .unwrap();

    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("Unknown model"));
}

#[test]
fn test_cli_init_refuses_to_overwrite() {
    let dir = TempDir::new().unwrap();
    let output = moa_bin(&dir).arg("init").output().unwrap();

    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("--force"));
}

#[test]
fn test_cli_init_force_writes_effective_config() {
    let dir = TempDir::new().unwrap();
    let output = moa_bin(&dir)
        .args(["--server", "http://localhost:9000", "init", "--force"])
        .output()
        .unwrap();

    assert!(output.status.success());
    let written = Config::load_from(&dir.path().join("config.json")).unwrap();
    assert_eq!(written.server_url, "http://localhost:9000");
}

#[test]
fn test_cli_init_creates_missing_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("nested").join("moa.json");
    let output = Command::new(env!("CARGO_BIN_EXE_moa"))
        .env("DEBUG", "0")
        .arg("--config")
        .arg(&path)
        .arg("init")
        .output()
        .unwrap();

    assert!(output.status.success());
    assert_eq!(Config::load_from(&path).unwrap(), Config::default());
}
