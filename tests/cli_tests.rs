use assert_cmd::Command;
use predicates::prelude::*;
use std::path::PathBuf;
use tempfile::TempDir;

fn botflow(home: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("botflow").unwrap();
    cmd.env("XDG_CONFIG_HOME", home.path())
        .env("XDG_DATA_HOME", home.path())
        .env_remove("BOTFLOW_DELAY_MS")
        .env_remove("BOTFLOW_DEBUG")
        .env_remove("RUST_LOG");
    cmd
}

fn write(dir: &TempDir, name: &str, contents: &str) -> PathBuf {
    let path = dir.path().join(name);
    std::fs::write(&path, contents).unwrap();
    path
}

const GREETING: &str = r#"{
  "variables": [{"name": "vName", "value": "World"}],
  "commands": [
    {"command": "set_variable", "input": "Hello {vName}", "output": "{vGreeting}"},
    {"command": "show_message", "message": "{vGreeting}"}
  ]
}"#;

#[test]
fn test_help() {
    let home = TempDir::new().unwrap();
    botflow(&home)
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("run"))
        .stdout(predicate::str::contains("validate"));
}

#[test]
fn test_run_prints_progress() {
    let home = TempDir::new().unwrap();
    let script = write(&home, "greet.json", GREETING);
    botflow(&home)
        .args(["run", "--delay", "0"])
        .arg(&script)
        .assert()
        .success()
        .stdout(predicate::str::contains("Bot Engine Started"))
        .stdout(predicate::str::contains("Message: Hello World"))
        .stdout(predicate::str::contains("Successfully Completed Script"));
}

#[test]
fn test_run_with_var_override() {
    let home = TempDir::new().unwrap();
    let script = write(&home, "greet.json", GREETING);
    botflow(&home)
        .args(["run", "--delay", "0", "--var", "vName=Rust"])
        .arg(&script)
        .assert()
        .success()
        .stdout(predicate::str::contains("Message: Hello Rust"));
}

#[test]
fn test_run_yaml_script() {
    let home = TempDir::new().unwrap();
    let script = write(
        &home,
        "sum.yaml",
        "commands:\n  - command: show_message\n    message: \"{vA}+3\"\n",
    );
    botflow(&home)
        .args(["run", "--delay", "0", "--var", "vA=4"])
        .arg(&script)
        .assert()
        .success()
        .stdout(predicate::str::contains("Message: 7"));
}

#[test]
fn test_failing_script_exits_with_one() {
    let home = TempDir::new().unwrap();
    let script = write(
        &home,
        "fail.json",
        r#"{"commands": [{"command": "throw_exception", "message": "kaboom"}]}"#,
    );
    botflow(&home)
        .args(["run", "--delay", "0"])
        .arg(&script)
        .assert()
        .code(1)
        .stderr(predicate::str::contains("kaboom"));
}

#[test]
fn test_continue_on_error_flag() {
    let home = TempDir::new().unwrap();
    let script = write(
        &home,
        "fail.json",
        r#"{"commands": [
            {"command": "throw_exception", "message": "kaboom"},
            {"command": "show_message", "message": "still here"}
        ]}"#,
    );
    botflow(&home)
        .args(["run", "--delay", "0", "--continue-on-error"])
        .arg(&script)
        .assert()
        .success()
        .stdout(predicate::str::contains("Message: still here"));
}

#[test]
fn test_run_missing_script() {
    let home = TempDir::new().unwrap();
    botflow(&home)
        .args(["run", "--delay", "0"])
        .arg(home.path().join("missing.json"))
        .assert()
        .failure();
}

#[test]
fn test_invalid_var_argument() {
    let home = TempDir::new().unwrap();
    let script = write(&home, "greet.json", GREETING);
    botflow(&home)
        .args(["run", "--var", "no-equals-sign"])
        .arg(&script)
        .assert()
        .failure()
        .stderr(predicate::str::contains("NAME=VALUE"));
}

#[test]
fn test_validate() {
    let home = TempDir::new().unwrap();
    let script = write(&home, "greet.json", GREETING);
    botflow(&home)
        .arg("validate")
        .arg(&script)
        .assert()
        .success()
        .stdout(predicate::str::contains("is valid: 2 commands, 1 variables"));
}

#[test]
fn test_validate_rejects_unknown_command() {
    let home = TempDir::new().unwrap();
    let script = write(
        &home,
        "bad.json",
        r#"{"commands": [{"command": "launch_rockets"}]}"#,
    );
    botflow(&home)
        .arg("validate")
        .arg(&script)
        .assert()
        .failure()
        .stderr(predicate::str::contains("launch_rockets"));
}

#[test]
fn test_commands_lists_registry() {
    let home = TempDir::new().unwrap();
    botflow(&home)
        .arg("commands")
        .assert()
        .success()
        .stdout(predicate::str::contains("set_variable"))
        .stdout(predicate::str::contains("stopwatch"));
}
