// Copyright (c) The suite-monitor Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The platform suite-monitor runs on: where run inputs come from, and how failures are
//! announced.

use std::io::{self, Write};
use suite_monitor_runner::{config::MonitorProfile, errors::MissingInputError, trigger::RunInputs};

/// The platform suite-monitor is running on, detected once at startup.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub(crate) enum Platform {
    /// A GitHub Actions job.
    GitHubActions,

    /// Anything else: a terminal, or a CI system without special support.
    Local,
}

impl Platform {
    pub(crate) fn detect() -> Self {
        Self::from_github_actions_var(std::env::var("GITHUB_ACTIONS").ok().as_deref())
    }

    fn from_github_actions_var(value: Option<&str>) -> Self {
        if value == Some("true") {
            Self::GitHubActions
        } else {
            Self::Local
        }
    }

    /// Writes a failure annotation for the platform, if it supports one.
    pub(crate) fn write_failure_annotation(
        self,
        message: &str,
        mut writer: impl Write,
    ) -> io::Result<()> {
        match self {
            Self::GitHubActions => {
                writeln!(writer, "::error::{}", escape_workflow_data(message))?;
                writer.flush()
            }
            Self::Local => Ok(()),
        }
    }
}

/// Escapes a message for use as the data of a GitHub Actions workflow command.
fn escape_workflow_data(message: &str) -> String {
    message
        .replace('%', "%25")
        .replace('\r', "%0D")
        .replace('\n', "%0A")
}

/// A source of raw run inputs.
pub(crate) trait InputResolver {
    /// A description of where inputs come from, used in error hints.
    fn describe(&self) -> &'static str;

    /// Returns the raw suite ID, if one was provided.
    fn test_suite_id(&self) -> Option<&str>;

    /// Returns the raw base URL, if one was provided.
    fn api_base_url(&self) -> Option<&str>;

    /// Resolves inputs, falling back to `profile` where allowed.
    fn resolve(&self, profile: &MonitorProfile<'_>) -> Result<RunInputs, MissingInputError> {
        RunInputs::resolve(self.test_suite_id(), self.api_base_url(), profile)
    }
}

/// Inputs declared by a GitHub Action, passed in as `INPUT_*` environment variables.
#[derive(Clone, Debug, Default)]
pub(crate) struct GitHubActionsInputs {
    test_suite_id: Option<String>,
    api_base_url: Option<String>,
}

impl GitHubActionsInputs {
    const TEST_SUITE_ID_VAR: &'static str = "INPUT_TEST_SUITE_ID";
    const API_BASE_URL_VAR: &'static str = "INPUT_API_BASE_URL";

    pub(crate) fn from_env() -> Self {
        Self::from_vars(|name| std::env::var(name).ok())
    }

    pub(crate) fn from_vars(mut var: impl FnMut(&str) -> Option<String>) -> Self {
        Self {
            test_suite_id: var(Self::TEST_SUITE_ID_VAR),
            api_base_url: var(Self::API_BASE_URL_VAR),
        }
    }
}

impl InputResolver for GitHubActionsInputs {
    fn describe(&self) -> &'static str {
        "action inputs"
    }

    fn test_suite_id(&self) -> Option<&str> {
        self.test_suite_id.as_deref()
    }

    fn api_base_url(&self) -> Option<&str> {
        self.api_base_url.as_deref()
    }
}

/// Inputs passed in as command-line flags.
#[derive(Clone, Debug, Default)]
pub(crate) struct CommandLineInputs {
    pub(crate) test_suite_id: Option<String>,
    pub(crate) api_base_url: Option<String>,
}

impl InputResolver for CommandLineInputs {
    fn describe(&self) -> &'static str {
        "command-line flags"
    }

    fn test_suite_id(&self) -> Option<&str> {
        self.test_suite_id.as_deref()
    }

    fn api_base_url(&self) -> Option<&str> {
        self.api_base_url.as_deref()
    }
}
