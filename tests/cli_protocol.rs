//! CLI Protocol Tests
//!
//! `folio run` answers every request line with exactly one JSON line on
//! stdout. Logs go to stderr and never interleave with responses.

use std::io::Write;
use std::process::{Command, Stdio};

use serde_json::Value;

fn folio() -> Command {
    Command::new(env!("CARGO_BIN_EXE_folio"))
}

// =============================================================================
// STDOUT CARRIES RESPONSES ONLY
// =============================================================================

#[test]
fn test_run_stdout_holds_only_responses() {
    let dir = tempfile::tempdir().unwrap();
    let config = dir.path().join("folio.json");

    let init = folio().arg("init").arg("--config").arg(&config).output().expect("run folio init");
    assert!(init.status.success(), "init failed: {}", String::from_utf8_lossy(&init.stderr));
    assert!(init.stdout.is_empty());

    let requests = [
        r#"{"op":"create_chapter","owner_id":"u1","chapter_number":1,"title":"Intro"}"#,
        r#"{"op":"list_chapters","owner_id":"u1"}"#,
        r#"{"op":"delete","version_id":"missing"}"#,
        r#"{"op":"no_such_op"}"#,
        r#"{"op":"metrics"}"#,
    ];

    let mut child = folio()
        .arg("run")
        .arg("--config")
        .arg(&config)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .expect("spawn folio run");
    {
        let mut stdin = child.stdin.take().expect("stdin");
        for request in &requests {
            writeln!(stdin, "{}", request).unwrap();
        }
    }
    let output = child.wait_with_output().expect("wait for folio run");
    assert!(output.status.success(), "run failed: {}", String::from_utf8_lossy(&output.stderr));

    let stdout = String::from_utf8(output.stdout).unwrap();
    let responses: Vec<Value> = stdout
        .lines()
        .map(|line| serde_json::from_str(line).expect("stdout line is JSON"))
        .collect();

    assert_eq!(responses.len(), requests.len());
    assert!(responses.iter().all(|r| r.get("status").is_some() && r.get("event").is_none()));

    assert_eq!(responses[0]["status"], "ok");
    assert_eq!(responses[1]["data"][0]["title"], "Intro");
    assert_eq!(responses[2]["code"], "FOLIO_NOT_FOUND");
    assert_eq!(responses[3]["code"], "FOLIO_CLI_INVALID_REQUEST");
    assert_eq!(responses[4]["data"]["chapters_created"], 1);

    // Lifecycle events are still logged, on stderr
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("\"event\":\"CHAPTER_CREATED\""));
}

#[test]
fn test_init_refuses_existing_config() {
    let dir = tempfile::tempdir().unwrap();
    let config = dir.path().join("folio.json");
    std::fs::write(&config, "{}").unwrap();

    let output = folio().arg("init").arg("--config").arg(&config).output().expect("run folio init");
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("FOLIO_CLI_ALREADY_INITIALIZED"));
    assert_eq!(std::fs::read_to_string(&config).unwrap(), "{}");
}
