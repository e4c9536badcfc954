// Copyright (c) The suite-monitor Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Trigger a remote test suite execution, monitor it until it finishes, and report the results.
//!
//! `suite-monitor` is meant to run as a CI step: the exit code reflects whether the suite passed.
//! See [`MonitorExitCode`](suite_monitor_metadata::MonitorExitCode) for the list of exit codes.

#![warn(missing_docs)]

mod dispatch;
mod errors;
mod output;
mod platform;

#[doc(hidden)]
pub use dispatch::*;
#[doc(hidden)]
pub use errors::*;
#[doc(hidden)]
pub use output::OutputWriter;
