//! E2E tests for the parsely binary
//!
//! Run the real binary with `--once` so each invocation performs the cold
//! run and exits: no watcher, no timing games.

use std::fs;
use std::path::Path;
use std::process::Command;

use tempfile::tempdir;

const GRAMMAR: &str = r#"{
    "start": "greeting",
    "rules": [
        {"name": "greeting", "symbols": [{"literal": "hello"}]},
        {"name": "greeting", "symbols": [{"literal": "bye"}]}
    ]
}"#;

fn setup(dir: &Path) {
    fs::write(dir.join("grammar.json"), GRAMMAR).unwrap();
    fs::write(
        dir.join("greetings.test"),
        "-- says hello\nhello\n-- says bye\nbye\n-- gibberish\nxyz\n",
    )
    .unwrap();
}

fn parsely() -> Command {
    Command::new(env!("CARGO_BIN_EXE_parsely"))
}

#[test]
fn once_runs_the_corpus_and_exits() {
    let temp = tempdir().unwrap();
    setup(temp.path());

    let output = parsely()
        .arg("--once")
        .arg("--raw-output")
        .arg("-t")
        .arg(format!("{}/*.test", temp.path().display()))
        .arg("-g")
        .arg(temp.path().join("grammar.json"))
        .output()
        .expect("binary should run");

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Running: says hello"));
    assert!(stdout.contains("Running: says bye"));
    assert!(stdout.contains(r#"[["hello"]]"#));
    // the failing case is reported and does not fail the process
    assert!(stdout.contains("Running: gibberish"));
    assert!(stdout.contains("Parse failed"));
}

#[test]
fn json_mode_emits_one_event_per_line() {
    let temp = tempdir().unwrap();
    setup(temp.path());

    let output = parsely()
        .arg("--once")
        .arg("--json")
        .arg("-t")
        .arg(format!("{}/*.test", temp.path().display()))
        .arg("-g")
        .arg(temp.path().join("grammar.json"))
        .output()
        .expect("binary should run");

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    let mut saw_case_result = false;
    for line in stdout.lines().filter(|l| !l.trim().is_empty()) {
        let event: serde_json::Value =
            serde_json::from_str(line).unwrap_or_else(|e| panic!("bad line {line:?}: {e}"));
        if event["event"] == "case_result" {
            saw_case_result = true;
            assert!(event["results"].is_array());
        }
    }
    assert!(saw_case_result);
}

#[test]
fn custom_delimiter_pattern() {
    let temp = tempdir().unwrap();
    fs::write(temp.path().join("grammar.json"), GRAMMAR).unwrap();
    fs::write(temp.path().join("alt.test"), "== first\nhello\n").unwrap();

    let output = parsely()
        .arg("--once")
        .arg("-t")
        .arg(format!("{}/*.test", temp.path().display()))
        .arg("-g")
        .arg(temp.path().join("grammar.json"))
        .arg("-p")
        .arg(r"(?m)^== (.*)\n")
        .output()
        .expect("binary should run");

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Running: first"));
}

#[test]
fn missing_grammar_is_a_configuration_error() {
    let temp = tempdir().unwrap();
    setup(temp.path());

    let output = parsely()
        .arg("--once")
        .arg("-t")
        .arg(format!("{}/*.test", temp.path().display()))
        .output()
        .expect("binary should run");

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("must provide a compiled grammar file or a raw grammar file"));
}

#[test]
fn broken_grammar_reports_but_exits_cleanly() {
    let temp = tempdir().unwrap();
    setup(temp.path());
    fs::write(temp.path().join("grammar.json"), "{ nope").unwrap();

    let output = parsely()
        .arg("--once")
        .arg("-t")
        .arg(format!("{}/*.test", temp.path().display()))
        .arg("-g")
        .arg(temp.path().join("grammar.json"))
        .output()
        .expect("binary should run");

    // recoverable: reported on stderr, process still exits zero
    assert!(output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Grammar error"));
}
