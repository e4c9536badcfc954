// Copyright (c) The suite-monitor Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::output::{NO_HEADING_TARGET, StderrStyles};
use camino::FromPathBufError;
use owo_colors::OwoColorize;
use std::error::Error;
use suite_monitor_metadata::{ExecutionId, MonitorExitCode, SuiteExecutionStatus};
use suite_monitor_runner::{
    errors::{
        ApiError, ConfigParseError, DisplayErrorChain, MissingInputError, MonitorError,
        MonitorRunnerBuildError, ProfileNotFound, TriggerError, WriteEventError,
    },
    helpers::plural,
    reporter::SummaryRenderer,
};
use swrite::{SWrite, swrite};
use thiserror::Error;
use tracing::error;

/// A failed run, or an error that prevented the run from starting.
#[derive(Debug, Error)]
#[doc(hidden)]
pub enum ExpectedError {
    #[error("could not determine the current directory")]
    CurrentDirFailed {
        #[source]
        err: std::io::Error,
    },
    #[error("current directory is not valid UTF-8")]
    CurrentDirInvalidUtf8 {
        #[source]
        err: FromPathBufError,
    },
    #[error("{} was not provided in {source_description}", .err.name)]
    MissingInput {
        err: MissingInputError,
        source_description: &'static str,
    },
    #[error("config parse error")]
    ConfigParseError {
        #[from]
        err: ConfigParseError,
    },
    #[error("profile not found")]
    ProfileNotFound {
        #[from]
        err: ProfileNotFound,
    },
    #[error("failed to build monitor runner")]
    MonitorRunnerBuild {
        #[from]
        err: MonitorRunnerBuildError,
    },
    #[error(transparent)]
    TriggerFailed {
        err: TriggerError,
    },
    #[error(
        "failed to check execution `{execution_id}` status \
         (attempt {attempt} of {max_attempts})"
    )]
    PollFailed {
        execution_id: ExecutionId,
        attempt: usize,
        max_attempts: usize,
        partial_summary: Option<String>,
        #[source]
        err: ApiError,
    },
    #[error("test suite did not finish within {attempts} {}", plural::attempts_str(*.attempts))]
    MonitorTimedOut {
        attempts: usize,
        last_status: Option<SuiteExecutionStatus>,
        summary: String,
    },
    #[error("test suite failed")]
    SuiteFailed {
        status: SuiteExecutionStatus,
        success_status: SuiteExecutionStatus,
        failed: usize,
        summary: String,
    },
    #[error("error writing monitor events")]
    WriteEventError {
        #[from]
        err: WriteEventError,
    },
    #[error("error writing output")]
    WriteOutput {
        #[source]
        err: std::io::Error,
    },
}

impl ExpectedError {
    pub(crate) fn missing_input(err: MissingInputError, source_description: &'static str) -> Self {
        Self::MissingInput {
            err,
            source_description,
        }
    }

    pub(crate) fn monitor_error(err: MonitorError, renderer: &SummaryRenderer) -> Self {
        match err {
            MonitorError::Trigger(err) => Self::TriggerFailed { err },
            MonitorError::Poll {
                execution_id,
                attempt,
                max_attempts,
                partial,
                err,
            } => Self::PollFailed {
                execution_id,
                attempt,
                max_attempts,
                partial_summary: partial.map(|report| renderer.render(&report)),
                err,
            },
            MonitorError::WriteEvent(err) => Self::WriteEventError { err },
        }
    }

    /// Returns the exit code for the process.
    pub fn process_exit_code(&self) -> i32 {
        match self {
            Self::CurrentDirFailed { .. }
            | Self::CurrentDirInvalidUtf8 { .. }
            | Self::MissingInput { .. }
            | Self::ConfigParseError { .. }
            | Self::ProfileNotFound { .. }
            | Self::MonitorRunnerBuild { .. } => MonitorExitCode::SETUP_ERROR,
            Self::TriggerFailed { .. } => MonitorExitCode::TRIGGER_FAILED,
            Self::PollFailed { .. } => MonitorExitCode::POLL_FAILED,
            Self::MonitorTimedOut { .. } => MonitorExitCode::MONITOR_TIMED_OUT,
            Self::SuiteFailed { .. } => MonitorExitCode::SUITE_FAILED,
            Self::WriteEventError { .. } | Self::WriteOutput { .. } => {
                MonitorExitCode::WRITE_OUTPUT_ERROR
            }
        }
    }

    /// Returns the results table rendered for this error, if any.
    pub fn summary(&self) -> Option<&str> {
        match self {
            Self::PollFailed {
                partial_summary, ..
            } => partial_summary.as_deref(),
            Self::MonitorTimedOut { summary, .. } | Self::SuiteFailed { summary, .. } => {
                Some(summary)
            }
            _ => None,
        }
    }

    /// Returns a plain-text description of the failure, suitable for CI annotations.
    pub fn failure_message(&self) -> String {
        let mut message = match self {
            Self::SuiteFailed {
                status,
                success_status,
                failed,
                ..
            } => suite_failed_message(status, success_status, *failed),
            _ => DisplayErrorChain::new(self).to_string(),
        };
        if let Some(summary) = self.summary() {
            swrite!(message, "\n\n{summary}");
        }
        message
    }

    /// Displays this error to stderr.
    pub fn display_to_stderr(&self, styles: &StderrStyles) {
        let mut next_error = match self {
            Self::CurrentDirFailed { err } => {
                error!("could not determine the current directory");
                Some(err as &dyn Error)
            }
            Self::CurrentDirInvalidUtf8 { err } => {
                error!("current directory is not valid UTF-8");
                Some(err as &dyn Error)
            }
            Self::MissingInput {
                err,
                source_description,
            } => {
                error!(
                    "{} is required (not found in {source_description})",
                    err.name.style(styles.bold)
                );
                None
            }
            Self::ConfigParseError { err } => {
                error!(
                    "failed to parse suite-monitor config at `{}`",
                    err.config_file().style(styles.bold)
                );
                Some(err.kind() as &dyn Error)
            }
            Self::ProfileNotFound { err } => {
                error!("{err}");
                err.source()
            }
            Self::MonitorRunnerBuild { err } => {
                error!("failed to build monitor runner");
                Some(err as &dyn Error)
            }
            Self::TriggerFailed { err } => {
                error!(
                    "failed to trigger test suite `{}`",
                    err.suite_id.style(styles.bold)
                );
                Some(&err.err as &dyn Error)
            }
            Self::PollFailed {
                execution_id,
                attempt,
                max_attempts,
                partial_summary,
                err,
            } => {
                error!(
                    "failed to check execution `{}` status (attempt {attempt} of {max_attempts})",
                    execution_id.style(styles.bold)
                );
                if let Some(summary) = partial_summary {
                    error!(target: NO_HEADING_TARGET, "\nResults before the failure:\n{summary}");
                }
                Some(err as &dyn Error)
            }
            Self::MonitorTimedOut {
                attempts,
                last_status,
                summary,
            } => {
                let mut message = format!(
                    "test suite did not finish within {} {}",
                    attempts.style(styles.bold),
                    plural::attempts_str(*attempts),
                );
                if let Some(status) = last_status {
                    swrite!(message, " (last status: {})", status.style(styles.warning_text));
                }
                error!("{message}");
                error!(target: NO_HEADING_TARGET, "{summary}");
                None
            }
            Self::SuiteFailed {
                status,
                success_status,
                failed,
                summary,
            } => {
                error!("{}", suite_failed_message(status, success_status, *failed));
                error!(target: NO_HEADING_TARGET, "{summary}");
                None
            }
            Self::WriteEventError { err } => {
                error!("failed to write monitor event");
                Some(err as &dyn Error)
            }
            Self::WriteOutput { err } => {
                error!("failed to write output");
                Some(err as &dyn Error)
            }
        };

        while let Some(err) = next_error {
            error!(target: NO_HEADING_TARGET, "\nCaused by:\n  {err}");
            next_error = err.source();
        }
    }
}

fn suite_failed_message(
    status: &SuiteExecutionStatus,
    success_status: &SuiteExecutionStatus,
    failed: usize,
) -> String {
    if failed > 0 {
        format!(
            "test suite finished with status `{status}`: {failed} {} failed",
            plural::tests_str(failed)
        )
    } else {
        format!("test suite finished with status `{status}`, expected `{success_status}`")
    }
}
