//! Integration tests for the BotScript CLI
//!
//! These tests invoke the actual botscript-cli binary and verify:
//! - Exit codes (0 = success, 1 = invalid program, 2 = I/O or config error)
//! - stdout/stderr output
//! - JSON output format

use std::path::PathBuf;
use std::process::Command;

// ── Helpers ───────────────────────────────────────────────

fn bot_bin() -> PathBuf {
    PathBuf::from(env!("CARGO_BIN_EXE_botscript-cli"))
}

fn fixture_valid(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join(format!("../../tests/fixtures/valid/{}", name))
}

fn fixture_invalid(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join(format!("../../tests/fixtures/invalid/{}", name))
}

fn run_bot(args: &[&str]) -> std::process::Output {
    Command::new(bot_bin())
        .args(args)
        .current_dir(env!("CARGO_MANIFEST_DIR"))
        .env_remove("RUST_LOG")
        .output()
        .expect("failed to execute botscript-cli")
}

fn stdout(output: &std::process::Output) -> String {
    String::from_utf8_lossy(&output.stdout).to_string()
}

fn temp_file(name: &str, contents: &str) -> PathBuf {
    let path = std::env::temp_dir().join(format!("botscript_{}_{}", std::process::id(), name));
    std::fs::write(&path, contents).expect("write temp");
    path
}

// ── Version ───────────────────────────────────────────────

#[test]
fn test_version_command() {
    let output = run_bot(&["version"]);
    assert!(output.status.success(), "version should exit 0");
    let stdout = stdout(&output);
    assert!(stdout.contains("botscript"));
    assert!(stdout.contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn test_version_flag() {
    let output = run_bot(&["--version"]);
    assert!(output.status.success());
    assert!(stdout(&output).contains(env!("CARGO_PKG_VERSION")));
}

// ── Check ─────────────────────────────────────────────────

#[test]
fn test_check_valid_program() {
    let output = run_bot(&["check", fixture_valid("patrol.bot").to_str().unwrap()]);
    assert!(output.status.success(), "valid program should exit 0");
    assert!(stdout(&output).contains("valid"));
}

#[test]
fn test_check_invalid_program() {
    let output = run_bot(&["check", fixture_invalid("unclosed.bot").to_str().unwrap()]);
    assert_eq!(output.status.code(), Some(1), "invalid program should exit 1");
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("unexpected end of file"), "stderr: {}", stderr);
}

#[test]
fn test_check_nonexistent_file() {
    let output = run_bot(&["check", "nonexistent.bot"]);
    assert_eq!(output.status.code(), Some(2), "missing file should exit 2");
}

#[test]
fn test_check_json_output() {
    let output = run_bot(&[
        "check",
        "--json",
        fixture_valid("patrol.bot").to_str().unwrap(),
    ]);
    assert!(output.status.success());
    let json: serde_json::Value =
        serde_json::from_str(&stdout(&output)).expect("should be valid JSON");
    assert_eq!(json["valid"], true);
    assert_eq!(json["errors"], 0);
    assert_eq!(json["warnings"], 0);
}

#[test]
fn test_check_json_invalid() {
    let output = run_bot(&[
        "check",
        "--json",
        fixture_invalid("condition-root.bot").to_str().unwrap(),
    ]);
    assert_eq!(output.status.code(), Some(1));
    let json: serde_json::Value =
        serde_json::from_str(&stdout(&output)).expect("should be valid JSON");
    assert_eq!(json["valid"], false);
    assert_eq!(json["diagnostics"][0]["kind"], "syntax");
}

#[test]
fn test_check_reports_warnings_but_succeeds() {
    let output = run_bot(&[
        "check",
        "--json",
        fixture_valid("empty-seq.bot").to_str().unwrap(),
    ]);
    assert!(output.status.success());
    let json: serde_json::Value = serde_json::from_str(&stdout(&output)).unwrap();
    assert_eq!(json["warnings"], 1);
    assert_eq!(json["diagnostics"][0]["kind"], "empty_sequence");
    assert_eq!(json["diagnostics"][0]["severity"], "warning");
}

#[test]
fn test_check_quiet_valid() {
    let output = run_bot(&[
        "--quiet",
        "check",
        fixture_valid("patrol.bot").to_str().unwrap(),
    ]);
    assert!(output.status.success());
    assert!(stdout(&output).is_empty(), "quiet mode should produce no stdout");
}

// ── Fmt ───────────────────────────────────────────────────

#[test]
fn test_fmt_canonical() {
    let output = run_bot(&["fmt", fixture_valid("forager.bot").to_str().unwrap()]);
    assert!(output.status.success());
    assert_eq!(
        stdout(&output),
        "(seq (while (not (wall)) (seq (move) (if (at-item) (pickup-and-use) (turn counterclockwise)))) (turn clockwise))\n"
    );
}

#[test]
fn test_fmt_idempotent() {
    let first = run_bot(&["fmt", fixture_valid("nested-conditions.bot").to_str().unwrap()]);
    assert!(first.status.success());
    let canonical = stdout(&first);

    let temp = temp_file("idempotent.bot", &canonical);
    let second = run_bot(&["fmt", temp.to_str().unwrap()]);
    assert!(second.status.success());
    assert_eq!(canonical, stdout(&second), "fmt must be idempotent");
    let _ = std::fs::remove_file(&temp);
}

#[test]
fn test_fmt_pretty() {
    let output = run_bot(&[
        "fmt",
        "--pretty",
        fixture_valid("patrol.bot").to_str().unwrap(),
    ]);
    assert!(output.status.success());
    let expected = "\
(while (energy-at-least 100)
  (if (can-hit-robot)
    (shoot)
    (if (wall)
      (turn clockwise)
      (move))))
";
    assert_eq!(stdout(&output), expected);
}

#[test]
fn test_fmt_invalid_program() {
    let output = run_bot(&["fmt", fixture_invalid("bad-rotation.bot").to_str().unwrap()]);
    assert_eq!(output.status.code(), Some(1));
}

// ── Tokens ────────────────────────────────────────────────

#[test]
fn test_tokens_lists_positions() {
    let output = run_bot(&["tokens", fixture_valid("single-move.bot").to_str().unwrap()]);
    assert!(output.status.success());
    let lines: Vec<String> = stdout(&output).lines().map(str::to_string).collect();
    assert_eq!(lines, vec!["1:1\t'(move'", "1:6\t')'", "2:1\tend of file"]);
}

// ── Hash ──────────────────────────────────────────────────

#[test]
fn test_hash_is_hex_sha256() {
    let output = run_bot(&["hash", fixture_valid("patrol.bot").to_str().unwrap()]);
    assert!(output.status.success());
    let hash = stdout(&output).trim().to_string();
    assert_eq!(hash.len(), 64);
    assert!(hash.chars().all(|c| c.is_ascii_hexdigit()));
}

#[test]
fn test_hash_ignores_layout() {
    let pretty = run_bot(&["hash", fixture_valid("patrol.bot").to_str().unwrap()]);
    let temp = temp_file(
        "flat.bot",
        "(WHILE (energy-at-least 100) (if (can-hit-robot) (shoot) (if (wall) (turn clockwise) (move))))",
    );
    let flat = run_bot(&["hash", temp.to_str().unwrap()]);
    assert_eq!(stdout(&pretty), stdout(&flat));
    let _ = std::fs::remove_file(&temp);
}

// ── Run ───────────────────────────────────────────────────

#[test]
fn test_run_prints_trace() {
    let output = run_bot(&[
        "run",
        "--ticks",
        "3",
        fixture_valid("single-move.bot").to_str().unwrap(),
    ]);
    assert!(output.status.success());
    let stdout = stdout(&output);
    assert!(stdout.contains("tick    0: (move)"), "stdout: {}", stdout);
    assert!(stdout.contains("tick    2: (move)"), "stdout: {}", stdout);
    assert!(stdout.contains("3 ticks, 3 actions"));
}

#[test]
fn test_run_json_with_config() {
    let config = temp_file(
        "config.json",
        r#"{"max_ticks": 20, "agent": {"wall_after_moves": 2}}"#,
    );
    let output = run_bot(&[
        "run",
        "--json",
        "--config",
        config.to_str().unwrap(),
        fixture_valid("forager.bot").to_str().unwrap(),
    ]);
    assert!(output.status.success());
    let json: serde_json::Value = serde_json::from_str(&stdout(&output)).unwrap();
    let actions: Vec<serde_json::Value> = json["report"]["trace"]["records"]
        .as_array()
        .unwrap()
        .iter()
        .map(|record| record["action"].clone())
        .filter(|action| !action.is_null())
        .collect();
    // move, turn, move, turn, then the wall stops the loop and the final turn runs
    assert_eq!(actions.len(), 5);
    assert_eq!(actions[0], "move");
    assert_eq!(actions[4]["turn"], "clockwise");
    assert_eq!(json["report"]["stop"], "idle");
    let _ = std::fs::remove_file(&config);
}

#[test]
fn test_run_tick_override() {
    let output = run_bot(&[
        "run",
        "--json",
        "--ticks",
        "3",
        fixture_valid("patrol.bot").to_str().unwrap(),
    ]);
    assert!(output.status.success());
    let json: serde_json::Value = serde_json::from_str(&stdout(&output)).unwrap();
    assert_eq!(json["report"]["ticks"], 3);
    assert_eq!(json["report"]["stop"], "tick_limit");
}

#[test]
fn test_run_bad_config() {
    let config = temp_file("bad-config.json", r#"{"max_tick": 1}"#);
    let output = run_bot(&[
        "run",
        "--config",
        config.to_str().unwrap(),
        fixture_valid("single-move.bot").to_str().unwrap(),
    ]);
    assert_eq!(output.status.code(), Some(2));
    let _ = std::fs::remove_file(&config);
}

// ── All fixtures ──────────────────────────────────────────

#[test]
fn test_all_valid_fixtures_check() {
    let valid_dir = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../../tests/fixtures/valid");

    for entry in std::fs::read_dir(&valid_dir).expect("read dir") {
        let path = entry.expect("entry").path();
        if path.extension().is_some_and(|e| e == "bot") {
            let output = run_bot(&["check", path.to_str().unwrap()]);
            assert!(
                output.status.success(),
                "fixture {:?} should check",
                path.file_name()
            );
        }
    }
}

#[test]
fn test_all_invalid_fixtures_fail() {
    let invalid_dir =
        PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../../tests/fixtures/invalid");

    for entry in std::fs::read_dir(&invalid_dir).expect("read dir") {
        let path = entry.expect("entry").path();
        if path.extension().is_some_and(|e| e == "bot") {
            let output = run_bot(&["check", path.to_str().unwrap()]);
            assert_eq!(
                output.status.code(),
                Some(1),
                "fixture {:?} should fail the check",
                path.file_name()
            );
        }
    }
}

// ── Determinism: CLI output ───────────────────────────────

#[test]
fn test_cli_run_determinism_20_iterations() {
    let path = fixture_valid("patrol.bot").to_str().unwrap().to_string();
    let first = stdout(&run_bot(&["run", "--json", &path]));

    for i in 0..20 {
        let output = stdout(&run_bot(&["run", "--json", &path]));
        assert_eq!(first, output, "run --json determinism failure at iteration {}", i);
    }
}
