//! Integration tests for top-level CLI behavior.

use std::path::Path;
use std::process::Command;

const CASSETTE: &str = "\
version: 1
interactions:
- request:
    uri: https://api.example.com/v1/x?api_key=abc
    method: POST
    body:
      string: '{\"a\":1}'
    headers:
      Authorization:
      - Bearer secret
  response:
    status:
      code: 200
      message: OK
    headers:
      Content-Type:
      - application/json
    body:
      string: '{\"ok\":true}'
";

fn run_tapedeck(args: &[&str]) -> std::process::Output {
    let bin = env!("CARGO_BIN_EXE_tapedeck");
    Command::new(bin)
        .args(args)
        .env_remove("TAPEDECK_RECORD_MODE")
        .env_remove("TAPEDECK_DISABLE")
        .env_remove("TAPEDECK_CASSETTE_DIR")
        .output()
        .expect("failed to run tapedeck binary")
}

fn library(dir: &Path) {
    std::fs::create_dir_all(dir.join("suite")).unwrap();
    std::fs::write(dir.join("suite/demo.yaml"), CASSETTE).unwrap();
}

#[test]
fn list_shows_cassettes_with_counts() {
    let dir = tempfile::tempdir().unwrap();
    library(dir.path());
    let output = run_tapedeck(&["list", "--dir", dir.path().to_str().unwrap()]);
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(output.status.success());
    assert!(stdout.contains("suite/demo"));
    assert!(stdout.contains("1 cassette(s) total."));
}

#[test]
fn list_reads_directory_from_config_file() {
    let dir = tempfile::tempdir().unwrap();
    library(&dir.path().join("tapes"));
    let config = dir.path().join("vcr.yaml");
    std::fs::write(
        &config,
        format!("cassette_library_dir: {}\n", dir.path().join("tapes").display()),
    )
    .unwrap();

    let output = run_tapedeck(&["--config", config.to_str().unwrap(), "list"]);
    assert!(output.status.success());
    assert!(String::from_utf8_lossy(&output.stdout).contains("suite/demo"));
}

#[test]
fn show_prints_interaction_table() {
    let dir = tempfile::tempdir().unwrap();
    library(dir.path());
    let file = dir.path().join("suite/demo.yaml");
    let output = run_tapedeck(&["show", file.to_str().unwrap()]);
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(output.status.success());
    assert!(stdout.contains("METHOD"));
    assert!(stdout.contains("POST"));
    assert!(stdout.contains("https://api.example.com/v1/x"));
}

#[test]
fn show_missing_cassette_fails() {
    let dir = tempfile::tempdir().unwrap();
    let file = dir.path().join("absent.yaml");
    let output = run_tapedeck(&["show", file.to_str().unwrap()]);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("not found"));
}

#[test]
fn check_flags_leaks_then_scrub_fixes_them() {
    let dir = tempfile::tempdir().unwrap();
    library(dir.path());
    let dir_arg = dir.path().to_str().unwrap();

    let output = run_tapedeck(&["check", "--dir", dir_arg]);
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(!output.status.success());
    assert!(stdout.contains("request header Authorization"));
    assert!(stdout.contains("query parameter api_key"));

    let file = dir.path().join("suite/demo.yaml");
    let output = run_tapedeck(&["scrub", file.to_str().unwrap()]);
    assert!(output.status.success());
    assert!(String::from_utf8_lossy(&output.stdout).contains("scrubbed 1 of 1"));

    let yaml = std::fs::read_to_string(&file).unwrap();
    assert!(!yaml.contains("Bearer secret"));
    assert!(!yaml.contains("api_key"));

    let output = run_tapedeck(&["check", "--dir", dir_arg]);
    assert!(output.status.success());
    assert!(String::from_utf8_lossy(&output.stdout).contains("no problems found"));
}

#[test]
fn check_audits_files_with_bracketed_names() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("test_chat[gpt-4].yaml"), CASSETTE).unwrap();
    let dir_arg = dir.path().to_str().unwrap();

    let output = run_tapedeck(&["check", "--dir", dir_arg]);
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(!output.status.success());
    assert!(stdout.contains("LEAK  test_chat[gpt-4]"));

    let output = run_tapedeck(&["list", "--dir", dir_arg]);
    assert!(String::from_utf8_lossy(&output.stdout).contains("test_chat[gpt-4]"));
}

#[test]
fn unknown_subcommand_fails() {
    let output = run_tapedeck(&["rewind"]);
    assert!(!output.status.success());
    assert!(!output.stderr.is_empty());
}

#[test]
fn help_lists_subcommands() {
    let output = run_tapedeck(&["--help"]);
    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);
    let text = format!("{stdout}{stderr}");
    for command in ["list", "show", "check", "scrub"] {
        assert!(text.contains(command), "missing {command}");
    }
}
