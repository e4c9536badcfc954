// Copyright (c) The suite-monitor Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::{
    ExpectedError,
    output::{OutputContext, OutputOpts, OutputWriter},
    platform::{CommandLineInputs, GitHubActionsInputs, InputResolver, Platform},
};
use camino::{Utf8Path, Utf8PathBuf};
use clap::{Args, Parser};
use std::{io::Write, num::NonZeroUsize};
use suite_monitor_metadata::{MonitorExitCode, SuiteId};
use suite_monitor_runner::{
    api::{ExecutionApi, HttpApi},
    config::MonitorConfig,
    errors::WriteEventError,
    monitor::{MonitorOutcome, MonitorRunner, MonitorRunnerBuilder, Termination},
    reporter::{MonitorReporterBuilder, SummaryRenderer},
};
use tracing::{debug, warn};

/// Trigger a remote test suite execution and monitor it until it finishes.
///
/// The exit code is 0 if the suite completed and every test passed.
#[derive(Debug, Parser)]
#[command(version, styles = crate::output::clap_styles::style())]
pub struct SuiteMonitorApp {
    #[command(flatten)]
    inputs: InputOpts,

    #[command(flatten)]
    config_opts: ConfigOpts,

    #[command(flatten)]
    monitor_opts: MonitorOpts,

    #[command(flatten)]
    output: OutputOpts,
}

impl SuiteMonitorApp {
    /// Initializes the output context.
    pub fn init_output(&self) -> OutputContext {
        self.output.init()
    }

    /// Executes the app.
    pub fn exec(
        self,
        output: OutputContext,
        output_writer: &mut OutputWriter,
    ) -> Result<i32, ExpectedError> {
        let platform = Platform::detect();
        debug!("detected platform: {platform:?}");
        self.exec_on(platform, output, output_writer)
    }

    /// Executes the app on `platform`, announcing a failure the way the platform expects.
    fn exec_on(
        self,
        platform: Platform,
        output: OutputContext,
        output_writer: &mut OutputWriter,
    ) -> Result<i32, ExpectedError> {
        let result = self.exec_impl(platform, output, output_writer);
        if let Err(error) = &result
            && let Err(err) = platform
                .write_failure_annotation(&error.failure_message(), output_writer.stdout_writer())
        {
            warn!("failed to write failure annotation: {err}");
        }
        result
    }

    fn exec_impl(
        self,
        platform: Platform,
        output: OutputContext,
        output_writer: &mut OutputWriter,
    ) -> Result<i32, ExpectedError> {
        let current_dir = current_dir()?;
        let config = self.config_opts.make_config(&current_dir)?;
        let profile = config.profile(self.config_opts.profile_name())?;

        let resolver = self.inputs.into_resolver(platform, GitHubActionsInputs::from_env);
        let inputs = resolver
            .resolve(&profile)
            .map_err(|err| ExpectedError::missing_input(err, resolver.describe()))?;
        debug!(
            "resolved inputs from {}: suite `{}`, base URL `{}`",
            resolver.describe(),
            inputs.suite_id,
            inputs.api_base_url,
        );

        let api = HttpApi::new(&inputs.api_base_url, &profile);
        let runner = self.monitor_opts.to_builder().build(&profile)?;
        let renderer = SummaryRenderer::new(profile.name_column_width());

        run_monitor(
            &runner,
            &api,
            &inputs.suite_id,
            &renderer,
            output,
            output_writer,
        )
    }
}

#[derive(Debug, Args)]
#[command(next_help_heading = "Input options")]
struct InputOpts {
    /// ID of the test suite to trigger
    #[arg(long, alias = "test_suite_id", value_name = "ID")]
    test_suite_id: Option<String>,

    /// Base URL of the test execution service [default: from the profile]
    #[arg(long, alias = "api_base_url", value_name = "URL")]
    api_base_url: Option<String>,
}

impl InputOpts {
    /// Picks the input source for `platform`. Under GitHub Actions, command-line inputs are
    /// ignored in favor of the action's inputs, read by `action_inputs`.
    fn into_resolver(
        self,
        platform: Platform,
        action_inputs: impl FnOnce() -> GitHubActionsInputs,
    ) -> Box<dyn InputResolver> {
        match platform {
            Platform::GitHubActions => {
                if self.test_suite_id.is_some() || self.api_base_url.is_some() {
                    warn!("running under GitHub Actions: ignoring command-line inputs");
                }
                Box::new(action_inputs())
            }
            Platform::Local => Box::new(CommandLineInputs {
                test_suite_id: self.test_suite_id,
                api_base_url: self.api_base_url,
            }),
        }
    }
}

#[derive(Debug, Args)]
#[command(next_help_heading = "Config options")]
struct ConfigOpts {
    /// Config file [default: .config/suite-monitor.toml in the current directory]
    #[arg(long, value_name = "PATH")]
    config_file: Option<Utf8PathBuf>,

    /// Profile to use
    #[arg(long, short = 'P', env = "SUITE_MONITOR_PROFILE", value_name = "PROFILE")]
    profile: Option<String>,
}

impl ConfigOpts {
    /// Creates a suite-monitor config with the given options.
    fn make_config(&self, current_dir: &Utf8Path) -> Result<MonitorConfig, ExpectedError> {
        Ok(MonitorConfig::from_sources(
            current_dir,
            self.config_file.as_deref(),
        )?)
    }

    fn profile_name(&self) -> &str {
        self.profile
            .as_deref()
            .unwrap_or(MonitorConfig::DEFAULT_PROFILE)
    }
}

#[derive(Debug, Args)]
#[command(next_help_heading = "Monitor options")]
struct MonitorOpts {
    /// Maximum number of status checks [default: from the profile]
    #[arg(long, env = "SUITE_MONITOR_MAX_ATTEMPTS", value_name = "N")]
    max_attempts: Option<NonZeroUsize>,

    /// Time to wait between status checks, e.g. 10s [default: from the profile]
    #[arg(long, env = "SUITE_MONITOR_WAIT_INTERVAL", value_name = "DURATION")]
    wait_interval: Option<humantime::Duration>,
}

impl MonitorOpts {
    fn to_builder(&self) -> MonitorRunnerBuilder {
        let mut builder = MonitorRunnerBuilder::default();
        if let Some(max_attempts) = self.max_attempts {
            builder.set_max_attempts(max_attempts);
        }
        if let Some(wait_interval) = self.wait_interval {
            builder.set_wait_interval(wait_interval.into());
        }
        builder
    }
}

fn current_dir() -> Result<Utf8PathBuf, ExpectedError> {
    let current_dir =
        std::env::current_dir().map_err(|err| ExpectedError::CurrentDirFailed { err })?;
    Utf8PathBuf::try_from(current_dir).map_err(|err| ExpectedError::CurrentDirInvalidUtf8 { err })
}

/// Runs the monitor, reporting progress to stderr, and turns the outcome into an exit code.
fn run_monitor<A: ExecutionApi>(
    runner: &MonitorRunner,
    api: &A,
    suite_id: &SuiteId,
    renderer: &SummaryRenderer,
    output: OutputContext,
    output_writer: &mut OutputWriter,
) -> Result<i32, ExpectedError> {
    let mut reporter = MonitorReporterBuilder::default()
        .set_verbose(output.verbose)
        .build();
    if output.color.should_colorize(supports_color::Stream::Stderr) {
        reporter.colorize();
    }

    let result = {
        let mut writer = output_writer.stderr_writer();
        runner.execute(api, suite_id, |event| {
            reporter.report_event(event, &mut writer)?;
            writer.flush().map_err(WriteEventError::Io)
        })
    };
    let outcome = result.map_err(|err| ExpectedError::monitor_error(err, renderer))?;

    finish_run(outcome, renderer, output_writer)
}

fn finish_run(
    outcome: MonitorOutcome,
    renderer: &SummaryRenderer,
    output_writer: &mut OutputWriter,
) -> Result<i32, ExpectedError> {
    let summary = renderer.render(&outcome.report);

    if outcome.is_success() {
        let mut writer = output_writer.stdout_writer();
        writeln!(writer, "{summary}")
            .and_then(|()| writer.flush())
            .map_err(|err| ExpectedError::WriteOutput { err })?;
        return Ok(MonitorExitCode::OK);
    }

    match outcome.termination {
        Termination::TimedOut { last_status } => Err(ExpectedError::MonitorTimedOut {
            attempts: outcome.attempts,
            last_status,
            summary,
        }),
        Termination::SuiteFinished { status } => Err(ExpectedError::SuiteFailed {
            status,
            success_status: outcome.success_status,
            failed: outcome.report.failed.len(),
            summary,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::Color;
    use camino_tempfile::tempdir;
    use clap::CommandFactory;
    use indoc::indoc;
    use pretty_assertions::assert_eq;
    use std::time::Duration;
    use suite_monitor_metadata::{
        ExecutionId, ExecutionSnapshot, SuiteExecution, SuiteExecutionState,
        SuiteExecutionStatus, TestExecution, TestExecutionStatus,
    };
    use suite_monitor_runner::errors::ApiError;
    use test_case::test_case;

    /// Triggers `e1` and reports the same snapshot on every poll.
    struct FixedApi {
        snapshot: ExecutionSnapshot,
    }

    impl FixedApi {
        fn new(status: SuiteExecutionStatus, tests: &[(&str, TestExecutionStatus)]) -> Self {
            let test_executions = tests
                .iter()
                .map(|(name, status)| TestExecution {
                    id: (*name).into(),
                    test_name: (*name).to_owned(),
                    status: status.clone(),
                })
                .collect();
            Self {
                snapshot: ExecutionSnapshot {
                    test_suite_execution: SuiteExecutionState {
                        status: Some(status),
                    },
                    test_executions,
                },
            }
        }
    }

    impl ExecutionApi for FixedApi {
        async fn trigger(&self, _suite_id: &SuiteId) -> Result<SuiteExecution, ApiError> {
            Ok(SuiteExecution {
                id: ExecutionId::new("e1"),
                status: Some(SuiteExecutionStatus::Running),
            })
        }

        async fn poll(&self, _execution_id: &ExecutionId) -> Result<ExecutionSnapshot, ApiError> {
            Ok(self.snapshot.clone())
        }
    }

    fn run_fixed(
        api: &FixedApi,
        max_attempts: usize,
    ) -> (Result<i32, ExpectedError>, String, String) {
        let config = MonitorConfig::default_config();
        let profile = config
            .profile(MonitorConfig::DEFAULT_PROFILE)
            .expect("default profile exists");
        let mut builder = MonitorRunnerBuilder::default();
        builder
            .set_max_attempts(NonZeroUsize::new(max_attempts).expect("non-zero"))
            .set_wait_interval(Duration::from_millis(1));
        let runner = builder.build(&profile).expect("runner is built");

        let output = OutputContext {
            verbose: false,
            color: Color::Never,
        };
        let mut output_writer = OutputWriter::Test {
            stdout: Vec::new(),
            stderr: Vec::new(),
        };
        let result = run_monitor(
            &runner,
            api,
            &SuiteId::new("suite-1"),
            &SummaryRenderer::new(10),
            output,
            &mut output_writer,
        );

        let OutputWriter::Test { stdout, stderr } = output_writer else {
            unreachable!("output writer is a test writer")
        };
        (
            result,
            String::from_utf8(stdout).expect("stdout is UTF-8"),
            String::from_utf8(stderr).expect("stderr is UTF-8"),
        )
    }

    #[test]
    fn verify_app() {
        SuiteMonitorApp::command().debug_assert();
    }

    #[test_case(&["suite-monitor", "--test-suite-id", "s1"] ; "kebab case")]
    #[test_case(&["suite-monitor", "--test_suite_id", "s1"] ; "underscore alias")]
    #[test_case(
        &["suite-monitor", "--test_suite_id=s1", "--api_base_url=http://x"]
        ; "underscore aliases with values"
    )]
    fn parse_inputs(args: &[&str]) {
        let app = SuiteMonitorApp::try_parse_from(args).expect("arguments parse");
        assert_eq!(app.inputs.test_suite_id.as_deref(), Some("s1"));
    }

    #[test]
    fn parse_monitor_opts() {
        let app = SuiteMonitorApp::try_parse_from([
            "suite-monitor",
            "--max-attempts",
            "5",
            "--wait-interval",
            "1m 30s",
            "-P",
            "ci",
        ])
        .expect("arguments parse");
        assert_eq!(app.monitor_opts.max_attempts, NonZeroUsize::new(5));
        assert_eq!(
            app.monitor_opts.wait_interval.map(Duration::from),
            Some(Duration::from_secs(90))
        );
        assert_eq!(app.config_opts.profile_name(), "ci");
    }

    #[test_case(&["suite-monitor", "--max-attempts", "0"] ; "zero max attempts")]
    #[test_case(&["suite-monitor", "--wait-interval", "soon"] ; "invalid duration")]
    #[test_case(&["suite-monitor", "--color", "sometimes"] ; "invalid color")]
    fn parse_invalid(args: &[&str]) {
        SuiteMonitorApp::try_parse_from(args).expect_err("arguments are rejected");
    }

    #[test]
    fn config_file_profile_is_used() {
        let dir = tempdir().expect("temp dir is created");
        let config_file = dir.path().join("monitor.toml");
        std::fs::write(
            &config_file,
            indoc! {r#"
                [profile.ci]
                max-attempts = 3
            "#},
        )
        .expect("config file is written");

        let config_opts = ConfigOpts {
            config_file: Some(config_file),
            profile: Some("ci".to_owned()),
        };
        let config = config_opts
            .make_config(dir.path())
            .expect("config is valid");
        let profile = config
            .profile(config_opts.profile_name())
            .expect("profile exists");
        assert_eq!(profile.max_attempts().get(), 3);
    }

    #[test]
    fn unknown_profile_is_a_setup_error() {
        let config = MonitorConfig::default_config();
        let error: ExpectedError = config
            .profile("nightly")
            .expect_err("profile does not exist")
            .into();
        assert_eq!(error.process_exit_code(), MonitorExitCode::SETUP_ERROR);
    }

    #[test]
    fn successful_run_prints_summary() {
        let api = FixedApi::new(
            SuiteExecutionStatus::Completed,
            &[("login", TestExecutionStatus::Passed)],
        );
        let (result, stdout, stderr) = run_fixed(&api, 3);

        assert_eq!(result.expect("run succeeds"), MonitorExitCode::OK);
        assert_eq!(
            stdout,
            indoc! {"
                Total Tests: 1 | Passed: 1 | Failed: 0

                | Test       | Status  |
                |------------|---------|
                | login      | PASSED  |
            "}
        );
        let lines: Vec<_> = stderr.lines().map(str::trim_start).collect();
        assert!(
            lines[0].starts_with("Triggered test suite suite-1 at "),
            "first line reports the trigger: {stderr}"
        );
        assert!(
            lines[0].ends_with(" (execution e1, status: running)"),
            "first line reports the execution: {stderr}"
        );
        assert_eq!(lines[1], "PASSED login");
        assert!(
            lines[2].starts_with("Finished ["),
            "last line reports the suite status: {stderr}"
        );
        assert_eq!(lines.len(), 3);
    }

    #[test]
    fn failed_test_fails_run() {
        let api = FixedApi::new(
            SuiteExecutionStatus::Completed,
            &[
                ("login", TestExecutionStatus::Passed),
                ("signup", TestExecutionStatus::Failed),
            ],
        );
        let (result, stdout, _) = run_fixed(&api, 3);

        let error = result.expect_err("a failed test fails the run");
        assert_eq!(error.process_exit_code(), MonitorExitCode::SUITE_FAILED);
        assert!(stdout.is_empty(), "summary is not printed to stdout on failure");
        let ExpectedError::SuiteFailed { failed, summary, .. } = &error else {
            panic!("expected SuiteFailed, found {error:?}");
        };
        assert_eq!(*failed, 1);
        assert!(summary.contains("| signup     | FAILED  |"), "summary: {summary}");
    }

    #[test]
    fn non_success_status_fails_run() {
        let api = FixedApi::new(
            SuiteExecutionStatus::Canceled,
            &[("login", TestExecutionStatus::Passed)],
        );
        let (result, _, _) = run_fixed(&api, 3);

        let error = result.expect_err("a canceled suite fails the run");
        assert_eq!(error.process_exit_code(), MonitorExitCode::SUITE_FAILED);
        assert_eq!(
            error.failure_message().lines().next(),
            Some("test suite finished with status `canceled`, expected `completed`")
        );
    }

    #[test]
    fn never_terminal_times_out() {
        let api = FixedApi::new(
            SuiteExecutionStatus::Running,
            &[("login", TestExecutionStatus::Running)],
        );
        let (result, _, stderr) = run_fixed(&api, 2);

        let error = result.expect_err("the run times out");
        assert_eq!(error.process_exit_code(), MonitorExitCode::MONITOR_TIMED_OUT);
        assert!(
            error
                .failure_message()
                .starts_with("test suite did not finish within 2 attempts"),
            "message: {}",
            error.failure_message()
        );
        assert!(stderr.contains("Timed out"), "stderr: {stderr}");
    }

    fn action_inputs() -> GitHubActionsInputs {
        GitHubActionsInputs::from_vars(|name| match name {
            "INPUT_TEST_SUITE_ID" => Some("from-action".to_owned()),
            _ => None,
        })
    }

    #[test]
    fn local_resolver_uses_command_line() {
        let app = SuiteMonitorApp::try_parse_from(["suite-monitor", "--test-suite-id", "from-cli"])
            .expect("arguments parse");
        let resolver = app
            .inputs
            .into_resolver(Platform::Local, || unreachable!("action inputs are not read"));

        assert_eq!(resolver.describe(), "command-line flags");
        assert_eq!(resolver.test_suite_id(), Some("from-cli"));
    }

    #[test_case(&["suite-monitor"] ; "no flags")]
    #[test_case(
        &["suite-monitor", "--test-suite-id", "from-cli", "--api-base-url", "http://cli"]
        ; "flags are ignored"
    )]
    fn github_actions_resolver_uses_action_inputs(args: &[&str]) {
        let app = SuiteMonitorApp::try_parse_from(args).expect("arguments parse");
        let resolver = app
            .inputs
            .into_resolver(Platform::GitHubActions, action_inputs);

        assert_eq!(resolver.describe(), "action inputs");
        assert_eq!(resolver.test_suite_id(), Some("from-action"));
        assert_eq!(resolver.api_base_url(), None);
    }

    /// Runs the app with a config file that does not exist, so it fails before any request.
    fn exec_with_missing_config(platform: Platform) -> (ExpectedError, String) {
        let dir = tempdir().expect("temp dir is created");
        let config_file = dir.path().join("missing.toml");
        let app = SuiteMonitorApp::try_parse_from([
            "suite-monitor",
            "--test-suite-id",
            "s1",
            "--config-file",
            config_file.as_str(),
        ])
        .expect("arguments parse");
        let output = OutputContext {
            verbose: false,
            color: Color::Never,
        };
        let mut output_writer = OutputWriter::Test {
            stdout: Vec::new(),
            stderr: Vec::new(),
        };

        let error = app
            .exec_on(platform, output, &mut output_writer)
            .expect_err("a missing config file fails the run");

        let OutputWriter::Test { stdout, .. } = output_writer else {
            unreachable!("output writer is a test writer")
        };
        (error, String::from_utf8(stdout).expect("stdout is UTF-8"))
    }

    #[test]
    fn failure_is_annotated_under_github_actions() {
        let (error, stdout) = exec_with_missing_config(Platform::GitHubActions);

        assert_eq!(error.process_exit_code(), MonitorExitCode::SETUP_ERROR);
        assert!(
            stdout.starts_with(
                "::error::config parse error%0A  caused by: failed to parse suite-monitor config"
            ),
            "stdout: {stdout}"
        );
        assert_eq!(stdout.lines().count(), 1, "the annotation is a single line");
        assert!(stdout.ends_with('\n'));
    }

    #[test]
    fn failure_is_not_annotated_locally() {
        let (error, stdout) = exec_with_missing_config(Platform::Local);

        assert_eq!(error.process_exit_code(), MonitorExitCode::SETUP_ERROR);
        assert_eq!(stdout, "");
    }
}
