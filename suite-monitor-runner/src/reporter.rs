// Copyright (c) The suite-monitor Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Prints out monitoring progress and renders the final summary.
//!
//! The main structures in this module are [`MonitorReporter`], which writes out
//! [`MonitorEvent`]s as they happen, and [`SummaryRenderer`], which renders the final pass/fail
//! table.

use crate::{
    errors::WriteEventError,
    helpers::{Cell, plural},
    results::{ExecutionReport, TestOutcome},
};
use chrono::{DateTime, Local};
use owo_colors::{OwoColorize, Style};
use std::{
    io::{self, Write},
    time::Duration,
};
use suite_monitor_metadata::{
    ExecutionId, SuiteExecution, SuiteExecutionStatus, SuiteId, TestExecution,
};
use swrite::{SWrite, swrite, swriteln};

/// A monitoring event.
///
/// Events are produced by a [`MonitorRunner`](crate::monitor::MonitorRunner) and consumed by a
/// [`MonitorReporter`].
#[derive(Clone, Debug)]
pub enum MonitorEvent<'a> {
    /// The suite execution was started.
    ExecutionTriggered {
        /// The suite that was triggered.
        suite_id: &'a SuiteId,

        /// The execution returned by the service.
        execution: &'a SuiteExecution,

        /// The local time at which the suite was triggered.
        start_time: DateTime<Local>,
    },

    /// A poll is about to be issued.
    PollStarted {
        /// The execution being polled.
        execution_id: &'a ExecutionId,

        /// The attempt number, starting from 1.
        attempt: usize,

        /// The configured maximum number of attempts.
        max_attempts: usize,
    },

    /// A test was observed in a terminal status for the first time.
    TestFinished {
        /// The test, as reported by the poll that first saw it terminal.
        test: &'a TestExecution,

        /// How the test is counted.
        outcome: TestOutcome,
    },

    /// The suite execution reached a terminal status.
    SuiteFinished {
        /// The terminal status.
        status: &'a SuiteExecutionStatus,

        /// The attempt on which the terminal status was observed.
        attempt: usize,

        /// The time elapsed since the suite was triggered.
        elapsed: Duration,

        /// Whether the run as a whole succeeded.
        successful: bool,
    },

    /// The attempt budget was exhausted before the suite reached a terminal status.
    MonitorTimedOut {
        /// The number of polls issued.
        attempts: usize,

        /// The last status observed, if any poll succeeded.
        last_status: Option<&'a SuiteExecutionStatus>,

        /// The time elapsed since the suite was triggered.
        elapsed: Duration,
    },
}

/// Monitor reporter builder.
#[derive(Debug, Default)]
pub struct MonitorReporterBuilder {
    verbose: bool,
}

impl MonitorReporterBuilder {
    /// Sets whether every poll is reported.
    pub fn set_verbose(&mut self, verbose: bool) -> &mut Self {
        self.verbose = verbose;
        self
    }

    /// Creates a new monitor reporter.
    pub fn build(&self) -> MonitorReporter {
        MonitorReporter {
            verbose: self.verbose,
            styles: Box::default(),
        }
    }
}

/// Functionality to report monitoring progress to stderr.
#[derive(Debug)]
pub struct MonitorReporter {
    verbose: bool,
    styles: Box<Styles>,
}

impl MonitorReporter {
    /// Colorizes output.
    pub fn colorize(&mut self) {
        self.styles.colorize();
    }

    /// Report a monitor event.
    pub fn report_event(
        &mut self,
        event: MonitorEvent<'_>,
        writer: impl Write,
    ) -> Result<(), WriteEventError> {
        self.write_event_impl(&event, writer)
            .map_err(WriteEventError::Io)
    }

    // ---
    // Helper methods
    // ---

    fn write_event_impl(&self, event: &MonitorEvent<'_>, mut writer: impl Write) -> io::Result<()> {
        match event {
            MonitorEvent::ExecutionTriggered {
                suite_id,
                execution,
                start_time,
            } => {
                write!(writer, "{:>12} ", "Triggered".style(self.styles.pass))?;
                writeln!(
                    writer,
                    "test suite {} at {} (execution {}, status: {})",
                    suite_id.style(self.styles.count),
                    start_time.format("%Y-%m-%d %H:%M:%S"),
                    execution.id.style(self.styles.count),
                    execution
                        .status
                        .as_ref()
                        .map_or("unknown", |status| status.as_str()),
                )?;
            }
            MonitorEvent::PollStarted {
                execution_id,
                attempt,
                max_attempts,
            } => {
                if self.verbose {
                    write!(writer, "{:>12} ", "Checking".style(self.styles.pending))?;
                    writeln!(
                        writer,
                        "execution {} status: attempt {} of {}",
                        execution_id.style(self.styles.count),
                        attempt.style(self.styles.count),
                        max_attempts.style(self.styles.count),
                    )?;
                }
            }
            MonitorEvent::TestFinished { test, outcome } => {
                let style = match outcome {
                    TestOutcome::Passed => self.styles.pass,
                    TestOutcome::Failed => self.styles.fail,
                };
                let status = test.status.as_str().to_uppercase();
                write!(writer, "{:>12} ", status.style(style))?;
                writeln!(writer, "{}", test.test_name.style(self.styles.test_name))?;
            }
            MonitorEvent::SuiteFinished {
                status,
                attempt,
                elapsed,
                successful,
            } => {
                let style = if *successful {
                    self.styles.pass
                } else {
                    self.styles.fail
                };
                write!(writer, "{:>12} ", "Finished".style(style))?;
                self.write_duration(*elapsed, &mut writer)?;
                writeln!(
                    writer,
                    "test suite {} after {} {}",
                    status.as_str().to_uppercase().style(style),
                    attempt.style(self.styles.count),
                    plural::attempts_str(*attempt),
                )?;
            }
            MonitorEvent::MonitorTimedOut {
                attempts,
                last_status,
                elapsed,
            } => {
                write!(writer, "{:>12} ", "Timed out".style(self.styles.fail))?;
                self.write_duration(*elapsed, &mut writer)?;
                write!(
                    writer,
                    "test suite did not finish within {} {}",
                    attempts.style(self.styles.count),
                    plural::attempts_str(*attempts),
                )?;
                if let Some(status) = last_status {
                    write!(writer, " (last status: {})", status)?;
                }
                writeln!(writer)?;
            }
        }

        Ok(())
    }

    fn write_duration(&self, duration: Duration, mut writer: impl Write) -> io::Result<()> {
        // * > means right-align.
        // * 8 is the number of characters to pad to.
        // * .3 means print three digits after the decimal point.
        write!(writer, "[{:>8.3?}s] ", duration.as_secs_f64())
    }
}

/// Renders the final pass/fail summary for an [`ExecutionReport`].
///
/// The output is plain text: it is written to stdout on success and used as the failure message
/// otherwise.
#[derive(Clone, Debug)]
pub struct SummaryRenderer {
    name_column_width: usize,
}

impl SummaryRenderer {
    /// The width of the status column.
    const STATUS_WIDTH: usize = 7;

    /// Creates a new renderer with the given name column width.
    pub fn new(name_column_width: usize) -> Self {
        Self { name_column_width }
    }

    /// Renders the counts line followed by a table of every recorded test.
    pub fn render(&self, report: &ExecutionReport) -> String {
        let mut out = String::new();
        swriteln!(
            out,
            "Total Tests: {} | Passed: {} | Failed: {}\n",
            report.total(),
            report.passed.len(),
            report.failed.len(),
        );

        let width = self.name_column_width;
        swrite!(
            out,
            "| {} | {:<status$} |",
            Cell::new("Test", width),
            "Status",
            status = Self::STATUS_WIDTH,
        );
        swrite!(
            out,
            "\n|{}|{}|",
            "-".repeat(width + 2),
            "-".repeat(Self::STATUS_WIDTH + 2),
        );

        for test in report.iter() {
            swrite!(
                out,
                "\n| {} | {:<status$} |",
                Cell::new(&test.name, width),
                test.status.as_str().to_uppercase(),
                status = Self::STATUS_WIDTH,
            );
        }

        out
    }
}

#[derive(Debug, Default)]
struct Styles {
    count: Style,
    pass: Style,
    fail: Style,
    pending: Style,
    test_name: Style,
}

impl Styles {
    fn colorize(&mut self) {
        self.count = Style::new().bold();
        self.pass = Style::new().green().bold();
        self.fail = Style::new().red().bold();
        self.pending = Style::new().cyan().bold();
        self.test_name = Style::new().blue().bold();
    }
}
