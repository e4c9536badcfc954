// Copyright (c) The suite-monitor Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::fixtures::*;
use color_eyre::eyre::{Result, bail, ensure};
use indoc::indoc;
use pretty_assertions::assert_eq;
use std::{num::NonZeroUsize, time::Duration};
use suite_monitor_metadata::{SuiteExecutionStatus, SuiteId};
use suite_monitor_runner::{
    api::HttpApi,
    config::MonitorConfig,
    errors::{ApiError, MonitorError},
    monitor::{MonitorOutcome, MonitorRunnerBuilder, Termination},
    reporter::{MonitorEvent, SummaryRenderer},
    results::TestOutcome,
};

fn run_against(
    base_url: &str,
    max_attempts: usize,
) -> (Result<MonitorOutcome, MonitorError>, Vec<String>) {
    let config = MonitorConfig::default_config();
    let profile = config
        .profile(MonitorConfig::DEFAULT_PROFILE)
        .expect("default profile exists");
    let api = HttpApi::new(base_url, &profile);

    let mut builder = MonitorRunnerBuilder::default();
    builder
        .set_max_attempts(NonZeroUsize::new(max_attempts).expect("max attempts is non-zero"))
        .set_wait_interval(Duration::from_millis(1));
    let runner = builder.build(&profile).expect("runtime is created");

    let mut finished = Vec::new();
    let result = runner.execute(&api, &SuiteId::new("suite-1"), |event| {
        if let MonitorEvent::TestFinished { test, outcome } = event {
            finished.push(format!(
                "{} {}",
                test.test_name,
                match outcome {
                    TestOutcome::Passed => "passed",
                    TestOutcome::Failed => "failed",
                }
            ));
        }
        Ok(())
    });
    (result, finished)
}

#[test]
fn test_two_polls_with_failure() -> Result<()> {
    let server = FixtureServer::start(
        FixtureResponse::json(200, r#"{ "id": "e1", "status": "running" }"#),
        vec![
            FixtureResponse::json(
                200,
                r#"{
                    "testSuiteExecution": { "status": "running" },
                    "testExecutions": [
                        { "id": "t1", "testName": "login", "status": "passed" },
                        { "id": "t2", "status": "pending" }
                    ]
                }"#,
            ),
            FixtureResponse::json(
                200,
                r#"{
                    "testSuiteExecution": { "status": "completed" },
                    "testExecutions": [
                        { "id": "t1", "testName": "login", "status": "passed" },
                        { "id": "t2", "testName": "signup", "status": "failed" }
                    ]
                }"#,
            ),
        ],
    )?;

    // A trailing slash on the base URL must not produce a double slash.
    let base_url = format!("{}/", server.base_url());
    let (result, finished) = run_against(&base_url, 30);
    let outcome = result?;

    assert_eq!(
        server.requests(),
        [
            "POST /test-suite-executions/suite-1/execute",
            "GET /test-suite-executions/e1/test-executions",
            "GET /test-suite-executions/e1/test-executions",
        ]
    );
    assert_eq!(finished, ["login passed", "signup failed"]);
    assert_eq!(outcome.execution_id.as_str(), "e1");
    assert_eq!(outcome.attempts, 2);
    assert_eq!(
        outcome.termination,
        Termination::SuiteFinished {
            status: SuiteExecutionStatus::Completed,
        }
    );
    ensure!(!outcome.is_success(), "a failed test fails the run");

    let summary = SummaryRenderer::new(20).render(&outcome.report);
    assert_eq!(
        summary,
        indoc! {"
            Total Tests: 2 | Passed: 1 | Failed: 1

            | Test                 | Status  |
            |----------------------|---------|
            | login                | PASSED  |
            | signup               | FAILED  |"
        }
    );

    Ok(())
}

#[test]
fn test_trigger_not_found() -> Result<()> {
    let server = FixtureServer::start(
        FixtureResponse::json(404, r#"{"message": "not found"}"#),
        // Never served: the monitor must not poll after a failed trigger.
        vec![FixtureResponse::json(
            200,
            r#"{ "testSuiteExecution": { "status": "completed" } }"#,
        )],
    )?;

    let (result, _) = run_against(server.base_url(), 30);
    let Err(MonitorError::Trigger(error)) = result else {
        bail!("expected a trigger error, found {result:?}");
    };

    let message = error.err.to_string();
    ensure!(message.contains("404"), "message contains the status: {message}");
    ensure!(
        message.contains(r#"{"message":"not found"}"#),
        "message contains the body: {message}"
    );
    assert_eq!(
        server.requests(),
        ["POST /test-suite-executions/suite-1/execute"],
        "no poll is issued"
    );

    Ok(())
}

#[test]
fn test_malformed_poll_response() -> Result<()> {
    let server = FixtureServer::start(
        FixtureResponse::json(200, r#"{ "id": 7, "status": "pending" }"#),
        vec![FixtureResponse::json(200, r#"{ "testExecutions": [] }"#)],
    )?;

    let (result, _) = run_against(server.base_url(), 30);
    let Err(MonitorError::Poll {
        execution_id,
        attempt,
        partial,
        err,
        ..
    }) = result
    else {
        bail!("expected a poll error, found {result:?}");
    };

    assert_eq!(execution_id.as_str(), "7", "numeric ids are accepted");
    assert_eq!(attempt, 1);
    ensure!(partial.is_none(), "no partial report after the first poll");
    ensure!(
        matches!(err, ApiError::Deserialize { .. }),
        "expected a deserialize error, found {err:?}"
    );

    Ok(())
}

#[test]
fn test_times_out() -> Result<()> {
    let running = r#"{
        "testSuiteExecution": { "status": "running" },
        "testExecutions": [
            { "id": "t1", "testName": "login", "status": "passed" },
            { "id": "t2", "testName": "signup", "status": "running" }
        ]
    }"#;
    let server = FixtureServer::start(
        FixtureResponse::json(200, r#"{ "id": "e1", "status": "running" }"#),
        vec![FixtureResponse::json(200, running); 3],
    )?;

    let (result, finished) = run_against(server.base_url(), 3);
    let outcome = result?;

    ensure!(outcome.is_timed_out(), "outcome: {outcome:?}");
    assert_eq!(outcome.attempts, 3);
    assert_eq!(server.requests().len(), 4, "one trigger and three polls");
    assert_eq!(finished, ["login passed"], "each test is reported once");
    assert_eq!(outcome.report.total(), 1);

    Ok(())
}

#[test]
fn test_trigger_without_status_and_null_suite_status() -> Result<()> {
    let server = FixtureServer::start(
        FixtureResponse::json(200, r#"{ "id": "e1" }"#),
        vec![
            FixtureResponse::json(
                200,
                r#"{
                    "testSuiteExecution": { "status": null },
                    "testExecutions": [{ "id": "t1", "status": "pending" }]
                }"#,
            ),
            FixtureResponse::json(
                200,
                r#"{
                    "testSuiteExecution": { "status": "completed" },
                    "testExecutions": [
                        { "id": "t1", "testName": "login", "status": "passed" }
                    ]
                }"#,
            ),
        ],
    )?;

    let (result, finished) = run_against(server.base_url(), 30);
    let outcome = result?;

    assert_eq!(outcome.attempts, 2, "a null suite status keeps polling");
    assert_eq!(finished, ["login passed"]);
    ensure!(outcome.is_success(), "outcome: {outcome:?}");

    Ok(())
}

#[test]
fn test_unknown_route_is_not_found() -> Result<()> {
    let server = FixtureServer::start(FixtureResponse::json(200, r#"{ "id": "e1" }"#), vec![])?;

    let (result, _) = run_against(&format!("{}/v2", server.base_url()), 30);
    let Err(MonitorError::Trigger(error)) = result else {
        bail!("expected a trigger error, found {result:?}");
    };

    let message = error.err.to_string();
    ensure!(message.contains("404"), "message contains the status: {message}");
    assert_eq!(
        server.requests(),
        ["POST /v2/test-suite-executions/suite-1/execute"]
    );

    Ok(())
}
