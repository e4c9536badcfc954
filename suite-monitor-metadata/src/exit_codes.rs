// Copyright (c) The suite-monitor Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

/// Documented exit codes for `suite-monitor` failures.
///
/// `suite-monitor` runs may fail for a variety of reasons. This structure documents the exit codes
/// that may occur in case of expected failures.
///
/// Unknown/unexpected failures will always result in exit code 1.
pub enum MonitorExitCode {}

impl MonitorExitCode {
    /// The suite completed successfully and no tests failed.
    pub const OK: i32 = 0;

    /// A user issue happened while setting up the run: a required input was missing, or the
    /// configuration could not be read.
    pub const SETUP_ERROR: i32 = 96;

    /// The request to start the suite execution failed.
    pub const TRIGGER_FAILED: i32 = 97;

    /// A status poll failed after the execution was started.
    pub const POLL_FAILED: i32 = 98;

    /// The suite did not reach a terminal status within the configured number of attempts.
    pub const MONITOR_TIMED_OUT: i32 = 99;

    /// The suite reached a terminal status, but one or more tests failed or the terminal status was
    /// not the successful one.
    pub const SUITE_FAILED: i32 = 100;

    /// Writing data to stdout or stderr produced an error.
    pub const WRITE_OUTPUT_ERROR: i32 = 110;
}
