// Copyright (c) The suite-monitor Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The execution monitor: triggers a suite and polls it until it finishes or runs out of
//! attempts.
//!
//! The main structure in this module is [`MonitorRunner`].

use crate::{
    api::ExecutionApi,
    config::MonitorProfile,
    errors::{MonitorError, MonitorRunnerBuildError, WriteEventError},
    helpers::plural,
    reporter::MonitorEvent,
    results::{ExecutionReport, ResultCollector},
    stopwatch::stopwatch,
    trigger::trigger_execution,
};
use std::{collections::HashSet, num::NonZeroUsize, time::Duration};
use suite_monitor_metadata::{ExecutionId, SuiteExecutionStatus, SuiteId, TestExecutionStatus};
use tokio::runtime::Runtime;
use tracing::debug;

/// The settings that drive a monitoring session.
#[derive(Clone, Debug)]
pub struct MonitorSettings {
    max_attempts: NonZeroUsize,
    wait_interval: Duration,
    success_status: SuiteExecutionStatus,
    terminal_suite_statuses: HashSet<SuiteExecutionStatus>,
    terminal_test_statuses: HashSet<TestExecutionStatus>,
}

impl MonitorSettings {
    /// Reads settings from a profile.
    pub fn from_profile(profile: &MonitorProfile<'_>) -> Self {
        Self {
            max_attempts: profile.max_attempts(),
            wait_interval: profile.wait_interval(),
            success_status: profile.success_status().clone(),
            terminal_suite_statuses: profile.terminal_suite_statuses().iter().cloned().collect(),
            terminal_test_statuses: profile.terminal_test_statuses().iter().cloned().collect(),
        }
    }

    /// Returns the maximum number of polls.
    pub fn max_attempts(&self) -> NonZeroUsize {
        self.max_attempts
    }

    /// Returns the time waited between polls.
    pub fn wait_interval(&self) -> Duration {
        self.wait_interval
    }
}

/// Monitor runner options.
#[derive(Debug, Default)]
pub struct MonitorRunnerBuilder {
    max_attempts: Option<NonZeroUsize>,
    wait_interval: Option<Duration>,
}

impl MonitorRunnerBuilder {
    /// Sets the maximum number of polls, overriding the profile.
    pub fn set_max_attempts(&mut self, max_attempts: NonZeroUsize) -> &mut Self {
        self.max_attempts = Some(max_attempts);
        self
    }

    /// Sets the time to wait between polls, overriding the profile.
    pub fn set_wait_interval(&mut self, wait_interval: Duration) -> &mut Self {
        self.wait_interval = Some(wait_interval);
        self
    }

    /// Creates a new monitor runner.
    pub fn build(
        self,
        profile: &MonitorProfile<'_>,
    ) -> Result<MonitorRunner, MonitorRunnerBuildError> {
        let mut settings = MonitorSettings::from_profile(profile);
        if let Some(max_attempts) = self.max_attempts {
            settings.max_attempts = max_attempts;
        }
        if let Some(wait_interval) = self.wait_interval {
            settings.wait_interval = wait_interval;
        }

        // Requests and waits happen one after the other, so a single thread is enough.
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(MonitorRunnerBuildError::TokioRuntimeCreate)?;

        Ok(MonitorRunner { settings, runtime })
    }
}

/// Context for monitoring a suite execution.
///
/// Created using [`MonitorRunnerBuilder::build`].
#[derive(Debug)]
pub struct MonitorRunner {
    settings: MonitorSettings,
    runtime: Runtime,
}

impl MonitorRunner {
    /// Returns the settings this runner uses.
    pub fn settings(&self) -> &MonitorSettings {
        &self.settings
    }

    /// Triggers `suite_id` and monitors the resulting execution until it finishes or the attempt
    /// budget is exhausted.
    ///
    /// The callback is called with each monitoring event. If it returns an error, monitoring stops
    /// and the error is returned.
    pub fn execute<A, F>(
        &self,
        api: &A,
        suite_id: &SuiteId,
        callback: F,
    ) -> Result<MonitorOutcome, MonitorError>
    where
        A: ExecutionApi,
        F: FnMut(MonitorEvent<'_>) -> Result<(), WriteEventError>,
    {
        self.runtime
            .block_on(run_session(&self.settings, api, suite_id, callback))
    }
}

/// How monitoring ended.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Termination {
    /// The suite execution reached a terminal status.
    SuiteFinished {
        /// The terminal status.
        status: SuiteExecutionStatus,
    },

    /// The attempt budget was exhausted first.
    TimedOut {
        /// The status seen on the last poll, if the service reported one.
        last_status: Option<SuiteExecutionStatus>,
    },
}

/// The result of a monitoring session that ran to completion or timed out.
#[derive(Clone, Debug)]
pub struct MonitorOutcome {
    /// The execution that was monitored.
    pub execution_id: ExecutionId,

    /// How monitoring ended.
    pub termination: Termination,

    /// The number of polls issued.
    pub attempts: usize,

    /// The configured maximum number of polls.
    pub max_attempts: usize,

    /// All test results recorded during the session.
    pub report: ExecutionReport,

    /// The suite status that counts as success.
    pub success_status: SuiteExecutionStatus,

    /// The time the session took.
    pub elapsed: Duration,
}

impl MonitorOutcome {
    /// Returns true if the suite finished with the success status and no test failed.
    pub fn is_success(&self) -> bool {
        match &self.termination {
            Termination::SuiteFinished { status } => {
                status == &self.success_status && self.report.all_passed()
            }
            Termination::TimedOut { .. } => false,
        }
    }

    /// Returns true if the attempt budget was exhausted.
    pub fn is_timed_out(&self) -> bool {
        matches!(self.termination, Termination::TimedOut { .. })
    }
}

pub(crate) async fn run_session<A, F>(
    settings: &MonitorSettings,
    api: &A,
    suite_id: &SuiteId,
    mut callback: F,
) -> Result<MonitorOutcome, MonitorError>
where
    A: ExecutionApi,
    F: FnMut(MonitorEvent<'_>) -> Result<(), WriteEventError>,
{
    let stopwatch = stopwatch();

    let execution = trigger_execution(api, suite_id).await?;
    debug!(
        "triggered suite {suite_id} at {}: execution {} is {}",
        stopwatch.start_time().to_rfc3339(),
        execution.id,
        execution.status.as_ref().map_or("unknown", |status| status.as_str()),
    );
    callback(MonitorEvent::ExecutionTriggered {
        suite_id,
        execution: &execution,
        start_time: stopwatch.start_time(),
    })?;

    let execution_id = execution.id;
    let max_attempts = settings.max_attempts.get();
    let mut collector = ResultCollector::new();

    // Attempts are numbered from 1. The loop body always runs at least once.
    let mut attempt = 1;
    let termination = loop {
        callback(MonitorEvent::PollStarted {
            execution_id: &execution_id,
            attempt,
            max_attempts,
        })?;

        let snapshot = match api.poll(&execution_id).await {
            Ok(snapshot) => snapshot,
            Err(err) => {
                let partial = (attempt > 1).then(|| Box::new(collector.into_report()));
                return Err(MonitorError::Poll {
                    execution_id,
                    attempt,
                    max_attempts,
                    partial,
                    err,
                });
            }
        };

        for test in &snapshot.test_executions {
            if let Some(outcome) = collector.record(test, &settings.terminal_test_statuses) {
                debug!("test {} ({}) finished: {}", test.test_name, test.id, test.status);
                callback(MonitorEvent::TestFinished { test, outcome })?;
            }
        }

        let status = snapshot.test_suite_execution.status;
        debug!(
            "attempt {attempt}/{max_attempts}: suite is {}, {} {} recorded",
            status.as_ref().map_or("unknown", |status| status.as_str()),
            collector.seen_count(),
            plural::tests_str(collector.seen_count()),
        );

        // A missing status is never terminal.
        if let Some(status) = status.as_ref()
            && settings.terminal_suite_statuses.contains(status)
        {
            let successful =
                status == &settings.success_status && collector.report().all_passed();
            callback(MonitorEvent::SuiteFinished {
                status,
                attempt,
                elapsed: stopwatch.snapshot().duration,
                successful,
            })?;
            break Termination::SuiteFinished {
                status: status.clone(),
            };
        }

        if attempt == max_attempts {
            callback(MonitorEvent::MonitorTimedOut {
                attempts: attempt,
                last_status: status.as_ref(),
                elapsed: stopwatch.snapshot().duration,
            })?;
            break Termination::TimedOut {
                last_status: status,
            };
        }

        tokio::time::sleep(settings.wait_interval).await;
        attempt += 1;
    };

    Ok(MonitorOutcome {
        execution_id,
        termination,
        attempts: attempt,
        max_attempts,
        report: collector.into_report(),
        success_status: settings.success_status.clone(),
        elapsed: stopwatch.snapshot().duration,
    })
}
