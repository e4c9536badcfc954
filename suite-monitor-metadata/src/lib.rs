// Copyright (c) The suite-monitor Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

#![warn(missing_docs)]

//! Structured access to the remote test-suite execution API that
//! [suite-monitor](https://crates.io/crates/suite-monitor) drives.
//!
//! The types in this crate mirror the JSON documents returned by the service. They are owned by
//! the remote side: suite-monitor only ever reads them.

mod execution;
mod exit_codes;

pub use execution::*;
pub use exit_codes::*;
