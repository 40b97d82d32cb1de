// Copyright (c) The stress-tester Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::fixtures::*;
use camino::Utf8Path;
use color_eyre::eyre::{Result, bail, ensure};
use pretty_assertions::assert_eq;
use serde_json::json;
use std::{
    sync::Arc,
    thread,
    time::{Duration, Instant},
};
use stress_runner::{
    config::RunConfiguration,
    invoker::SPAWN_FAILED_EXIT_STATUS,
    protocol::{DiagnosedError, ResponseRecord},
    unit::{Outcome, RunUnit, build_arguments},
};
use test_case::test_case;

fn diagnosed(kind: &str, message: &str) -> DiagnosedError {
    DiagnosedError {
        kind: kind.to_owned(),
        message: message.to_owned(),
        details: serde_json::Map::new(),
    }
}

#[test]
fn pass_with_empty_output() {
    let unit = RunUnit::new(FIXTURES.config("pass-empty"));
    assert_eq!(unit.execute(), &Outcome::Passed { responses: vec![] });
}

#[test]
fn pass_with_responses() {
    let unit = RunUnit::new(FIXTURES.config("pass-responses"));
    assert_eq!(
        unit.execute(),
        &Outcome::Passed {
            responses: vec![
                ResponseRecord(json!({"request": "CursorInfo", "offset": 1})),
                ResponseRecord(json!({"request": "CursorInfo", "offset": 2})),
            ]
        }
    );
}

#[test]
fn pass_with_detected_error() {
    let unit = RunUnit::new(FIXTURES.config("pass-with-detected"));
    assert_eq!(unit.execute(), &Outcome::Passed { responses: vec![] });
}

#[test]
fn fail_with_single_error() {
    let unit = RunUnit::new(FIXTURES.config("fail-single-error"));
    assert_eq!(
        unit.execute(),
        &Outcome::Failed {
            error: diagnosed("crashed", "errX"),
            responses: vec![],
        }
    );
}

#[test]
fn fail_keeps_evidence_in_order() {
    let unit = RunUnit::new(FIXTURES.config("fail-after-responses"));

    let mut error = diagnosed("failed", "err");
    error.details.insert("offset".to_owned(), json!(40));
    assert_eq!(
        unit.execute(),
        &Outcome::Failed {
            error,
            responses: vec![
                ResponseRecord(json!("resp1")),
                ResponseRecord(json!("resp2")),
            ],
        }
    );
}

#[test_case("malformed", 1 ; "malformed line")]
#[test_case("two-errors", 0 ; "two errors with success status")]
#[test_case("fail-without-error", 2 ; "nonzero status without error")]
fn errored_carries_status_and_arguments(tool: &str, exit_status: i32) {
    let config = FIXTURES.config(tool);
    let arguments = build_arguments(&config);
    let unit = RunUnit::new(config);

    assert_eq!(
        unit.execute(),
        &Outcome::Errored {
            exit_status,
            arguments,
        }
    );
}

#[test]
fn spawn_failure_is_errored() {
    let unit = RunUnit::new(config_for(Utf8Path::new("/nonexistent/stress-tool")));
    match unit.execute() {
        Outcome::Errored {
            exit_status,
            arguments,
        } => {
            assert_eq!(*exit_status, SPAWN_FAILED_EXIT_STATUS);
            assert_eq!(arguments.as_slice(), unit.arguments());
        }
        other => panic!("expected errored outcome, got {other:?}"),
    }
}

// Executables given by bare name are looked up in PATH. `true` and `false` ignore the arguments
// they're passed.
#[test]
fn bare_executable_name_is_found_in_path() {
    let unit = RunUnit::new(config_for(Utf8Path::new("true")));
    assert_eq!(unit.execute(), &Outcome::Passed { responses: vec![] });

    let config = config_for(Utf8Path::new("false"));
    let arguments = build_arguments(&config);
    let unit = RunUnit::new(config);
    assert_eq!(
        unit.execute(),
        &Outcome::Errored {
            exit_status: 1,
            arguments,
        }
    );
}

#[test]
fn arguments_reach_the_tool_in_order() {
    let mut config = FIXTURES.config("echo-args");
    config.limit = Some(5);
    config.requests = ["CodeComplete".parse().unwrap()].into_iter().collect();
    config.type_list_items = vec!["Hashable".to_owned()];
    config.report_responses = true;
    config.tool_args = vec!["-module-name".to_owned(), "has space".to_owned()];

    let unit = RunUnit::new(config);
    let expected: Vec<_> = unit
        .arguments()
        .iter()
        .map(|arg| ResponseRecord(json!(arg)))
        .collect();
    assert_eq!(unit.execute(), &Outcome::Passed { responses: expected });
}

#[test]
fn execute_runs_at_most_once() -> Result<()> {
    let unit = RunUnit::new(FIXTURES.config("count-invocations"));
    let first = unit.execute().clone();
    let second = unit.execute().clone();
    assert_eq!(first, Outcome::Passed { responses: vec![] });
    assert_eq!(first, second);

    let invocations =
        std::fs::read_to_string(FIXTURES.tool_dir("count-invocations").join("invocations"))?;
    assert_eq!(invocations.lines().count(), 1, "tool ran exactly once");
    Ok(())
}

#[test]
fn cancel_before_execute_never_spawns() {
    let unit = RunUnit::new(config_for(Utf8Path::new("/nonexistent/stress-tool")));
    unit.cancel();
    // A spawn attempt would have produced an errored outcome.
    assert_eq!(unit.execute(), &Outcome::Cancelled);
}

#[test]
fn cancel_while_running_terminates_tool() -> Result<()> {
    let pid_file = FIXTURES.tool_dir("hang").join("hang.pid");
    let unit = Arc::new(RunUnit::new(FIXTURES.config("hang")));
    let start = Instant::now();

    let worker = {
        let unit = unit.clone();
        thread::spawn(move || unit.execute().clone())
    };

    let pid: i32 = loop {
        if let Ok(contents) = std::fs::read_to_string(&pid_file) {
            break contents.trim().parse()?;
        }
        if start.elapsed() > Duration::from_secs(10) {
            bail!("fixture tool never started");
        }
        thread::sleep(Duration::from_millis(10));
    };
    ensure!(process_exists(pid), "tool is running before cancellation");

    unit.cancel();
    unit.cancel();

    let outcome = match worker.join() {
        Ok(outcome) => outcome,
        Err(_) => bail!("worker thread panicked"),
    };
    assert_eq!(outcome, Outcome::Cancelled);
    assert_eq!(unit.outcome(), &Outcome::Cancelled);
    ensure!(
        start.elapsed() < Duration::from_secs(30),
        "cancellation did not interrupt the tool"
    );
    ensure!(!process_exists(pid), "tool process {pid} is still running");

    // Cancelling after completion changes nothing.
    unit.cancel();
    assert_eq!(unit.outcome(), &Outcome::Cancelled);
    Ok(())
}

#[test]
fn config_file_drives_a_run() -> Result<()> {
    let dir = camino_tempfile::tempdir()?;
    let config_path = dir.path().join("stress.toml");
    let executable = FIXTURES.tool_dir("pass-responses").join("stress-tool");
    std::fs::write(
        &config_path,
        format!(
            "executable = {executable:?}\n\
             file = \"Sources/main.swift\"\n\
             rewrite-mode = \"concurrent\"\n\
             page = \"2/2\"\n\
             tool-name = \"swiftc\"\n"
        ),
    )?;

    let config = RunConfiguration::from_path(&config_path)?;
    let unit = RunUnit::new(config);
    assert_eq!(unit.summary().to_string(), "rewrite concurrent 2/2");
    assert!(unit.execute().is_success());
    Ok(())
}

fn process_exists(pid: i32) -> bool {
    // Signal 0 checks for existence without delivering anything.
    unsafe { libc::kill(pid, 0) == 0 }
}
