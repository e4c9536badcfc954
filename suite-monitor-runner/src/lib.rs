// Copyright (c) The suite-monitor Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

#![warn(missing_docs)]

//! Core functionality for suite-monitor: triggering a remote test suite execution, polling it until
//! it finishes, and reporting the results.
//!
//! The basic flow is:
//!
//! 1. Load a [`MonitorConfig`](config::MonitorConfig) and pick a profile.
//! 2. Resolve [`RunInputs`](trigger::RunInputs) and create an [`HttpApi`](api::HttpApi).
//! 3. Build a [`MonitorRunner`](monitor::MonitorRunner) and call
//!    [`execute`](monitor::MonitorRunner::execute), passing events to a
//!    [`MonitorReporter`](reporter::MonitorReporter).
//! 4. Render the [`ExecutionReport`](results::ExecutionReport) with a
//!    [`SummaryRenderer`](reporter::SummaryRenderer).

pub mod api;
pub mod config;
pub mod errors;
pub mod helpers;
pub mod monitor;
pub mod reporter;
pub mod results;
mod stopwatch;
pub mod trigger;
