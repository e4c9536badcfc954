// Copyright (c) The suite-monitor Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Runs the monitor against a local HTTP server.

mod basic;
mod fixtures;
