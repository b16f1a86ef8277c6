//! CLI smoke tests: verify commands that work without an API key.
//!
//! These tests run the compiled binary with HOME pointed at a temporary
//! directory and verify exit codes and output. No network access required.

use std::path::Path;
use std::process::Command;

/// Helper: run turnstile with given args and extra env, returning
/// (exit_code, stdout, stderr).
fn run_cli_env(home: &Path, args: &[&str], env: &[(&str, &str)]) -> (i32, String, String) {
    let bin = env!("CARGO_BIN_EXE_turnstile");
    let mut cmd = Command::new(bin);
    cmd.args(args)
        .env("HOME", home)
        .env("RUST_LOG", "error")
        .env_remove("TOGETHER_API_KEY")
        .env_remove("TURNSTILE_PROVIDER_API_KEY")
        .env_remove("TURNSTILE_HISTORY_BACKEND")
        .env_remove("TURNSTILE_HISTORY_PATH");
    for (key, value) in env {
        cmd.env(key, value);
    }
    let output = cmd.output().expect("failed to execute turnstile binary");
    let code = output.status.code().unwrap_or(-1);
    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    (code, stdout, stderr)
}

fn run_cli(home: &Path, args: &[&str]) -> (i32, String, String) {
    run_cli_env(home, args, &[])
}

// ============================================================================
// Help & Version
// ============================================================================

#[test]
fn cli_no_args_shows_help() {
    let home = tempfile::tempdir().unwrap();
    let (code, stdout, _stderr) = run_cli(home.path(), &[]);
    assert_eq!(code, 0);
    assert!(stdout.contains("Usage:"));
    assert!(stdout.contains("turnstile"));
}

#[test]
fn cli_help_lists_commands() {
    let home = tempfile::tempdir().unwrap();
    let (code, stdout, _stderr) = run_cli(home.path(), &["--help"]);
    assert_eq!(code, 0);
    for command in ["chat", "history", "tools", "config", "version"] {
        assert!(stdout.contains(command), "missing {}", command);
    }
}

#[test]
fn cli_version_command() {
    let home = tempfile::tempdir().unwrap();
    let (code, stdout, _stderr) = run_cli(home.path(), &["version"]);
    assert_eq!(code, 0);
    assert!(stdout.contains("turnstile"));
    assert!(stdout.contains(env!("CARGO_PKG_VERSION")));
}

// ============================================================================
// Tools
// ============================================================================

#[test]
fn cli_tools_lists_builtins() {
    let home = tempfile::tempdir().unwrap();
    let (code, stdout, _stderr) = run_cli(home.path(), &["tools"]);
    assert_eq!(code, 0);
    assert!(stdout.contains("echo"));
    assert!(stdout.contains("current_time"));
}

#[test]
fn cli_tools_schema() {
    let home = tempfile::tempdir().unwrap();
    let (code, stdout, _stderr) = run_cli(home.path(), &["tools", "--schema"]);
    assert_eq!(code, 0);
    assert!(stdout.contains("\"properties\""));
}

// ============================================================================
// Config
// ============================================================================

#[test]
fn cli_config_redacts_api_key() {
    let home = tempfile::tempdir().unwrap();
    let (code, stdout, _stderr) = run_cli_env(
        home.path(),
        &["config"],
        &[("TURNSTILE_PROVIDER_API_KEY", "sk-secret-value-wxyz")],
    );
    assert_eq!(code, 0);
    assert!(!stdout.contains("sk-secret-value"));
    assert!(stdout.contains("****wxyz"));
    assert!(stdout.contains("api.together.xyz"));
}

#[test]
fn cli_config_check_without_file() {
    let home = tempfile::tempdir().unwrap();
    let (code, stdout, _stderr) = run_cli(home.path(), &["config", "--check"]);
    assert_eq!(code, 0);
    assert!(stdout.contains("No config file found"));
}

#[test]
fn cli_config_check_suggests_typo_fix() {
    let home = tempfile::tempdir().unwrap();
    let path = home.path().join("custom.json");
    std::fs::write(&path, r#"{"provider": {"modle": "x"}}"#).unwrap();

    let (code, stdout, _stderr) = run_cli(
        home.path(),
        &["config", "--check", "--config", path.to_str().unwrap()],
    );
    assert_eq!(code, 0);
    assert!(stdout.contains("did you mean 'model'?"));
    assert!(stdout.contains("error(s)"));
}

#[test]
fn cli_config_check_reports_invalid_values() {
    let home = tempfile::tempdir().unwrap();
    let path = home.path().join("custom.json");
    std::fs::write(&path, r#"{"bus": {"buffer_size": 0}}"#).unwrap();

    let (code, stdout, _stderr) = run_cli(
        home.path(),
        &["config", "--check", "--config", path.to_str().unwrap()],
    );
    assert_eq!(code, 0);
    assert!(stdout.contains("[ERROR]"));
}

// ============================================================================
// History
// ============================================================================

#[test]
fn cli_history_list_empty() {
    let home = tempfile::tempdir().unwrap();
    let (code, stdout, _stderr) = run_cli(home.path(), &["history", "list"]);
    assert_eq!(code, 0);
    assert!(stdout.contains("No stored conversations."));
}

#[test]
fn cli_history_show_and_clear_stored_conversation() {
    let home = tempfile::tempdir().unwrap();
    let store = home.path().join("conversations");
    std::fs::create_dir_all(&store).unwrap();
    std::fs::write(
        store.join("alice.json"),
        r#"{
            "user_id": "alice",
            "turns": [
                {"role": "user", "content": "hi"},
                {"role": "assistant", "content": "hello there"}
            ],
            "created_at": "2024-01-01T00:00:00Z",
            "updated_at": "2024-01-01T00:00:00Z"
        }"#,
    )
    .unwrap();
    let env = [("TURNSTILE_HISTORY_PATH", store.to_str().unwrap())];

    let (code, stdout, _stderr) = run_cli_env(home.path(), &["history", "list"], &env);
    assert_eq!(code, 0);
    assert!(stdout.contains("alice"));
    assert!(stdout.contains("2 turn(s)"));

    let (code, stdout, _stderr) = run_cli_env(home.path(), &["history", "show", "alice"], &env);
    assert_eq!(code, 0);
    assert!(stdout.contains("user: hi"));
    assert!(stdout.contains("assistant: hello there"));

    let (code, _stdout, _stderr) = run_cli_env(home.path(), &["history", "clear", "alice"], &env);
    assert_eq!(code, 0);

    let (code, stdout, _stderr) = run_cli_env(home.path(), &["history", "show", "alice"], &env);
    assert_eq!(code, 0);
    assert!(stdout.contains("No conversation stored"));
}

// ============================================================================
// Chat
// ============================================================================

#[test]
fn cli_chat_without_api_key_fails() {
    let home = tempfile::tempdir().unwrap();
    let (code, _stdout, stderr) = run_cli(home.path(), &["chat", "--user", "u1"]);
    assert_ne!(code, 0);
    assert!(stderr.contains("API key"));
}
