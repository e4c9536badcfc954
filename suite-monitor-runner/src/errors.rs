// Copyright (c) The suite-monitor Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Errors produced by suite-monitor.

use crate::{api::HttpMethod, results::ExecutionReport};
use camino::Utf8PathBuf;
use config::ConfigError;
use itertools::Itertools;
use std::{error::Error, fmt};
use suite_monitor_metadata::{ExecutionId, SuiteExecutionStatus, SuiteId};
use thiserror::Error;

/// An error that occurred while parsing the config.
#[derive(Debug, Error)]
#[error("failed to parse suite-monitor config at `{config_file}`")]
#[non_exhaustive]
pub struct ConfigParseError {
    config_file: Utf8PathBuf,
    #[source]
    kind: ConfigParseErrorKind,
}

impl ConfigParseError {
    pub(crate) fn new(config_file: impl Into<Utf8PathBuf>, kind: ConfigParseErrorKind) -> Self {
        Self {
            config_file: config_file.into(),
            kind,
        }
    }

    /// Returns the config file for this error.
    pub fn config_file(&self) -> &Utf8PathBuf {
        &self.config_file
    }

    /// Returns the kind of error this is.
    pub fn kind(&self) -> &ConfigParseErrorKind {
        &self.kind
    }
}

/// The kind of error that occurred while parsing a config.
///
/// Returned by [`ConfigParseError::kind`].
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ConfigParseErrorKind {
    /// An error occurred while building the config.
    #[error(transparent)]
    BuildError(Box<ConfigError>),

    /// An error occurred while deserializing the config.
    #[error(transparent)]
    DeserializeError(Box<serde_path_to_error::Error<ConfigError>>),

    /// A path template did not contain its required placeholder.
    #[error("in profile `{profile_name}`, {err}")]
    InvalidPathTemplate {
        /// The profile the template was defined in.
        profile_name: String,

        /// The underlying error.
        err: PathTemplateError,
    },

    /// The success status was not part of the terminal suite statuses, so a run could never
    /// succeed.
    #[error(
        "in profile `{profile_name}`, success-status `{success_status}` is not one of the \
         terminal suite statuses ({})",
        terminal_statuses.iter().join(", ")
    )]
    SuccessStatusNotTerminal {
        /// The profile the status was defined in.
        profile_name: String,

        /// The configured success status.
        success_status: SuiteExecutionStatus,

        /// The configured terminal suite statuses.
        terminal_statuses: Vec<SuiteExecutionStatus>,
    },
}

/// An error which indicates that a profile was requested but not known to suite-monitor.
#[derive(Clone, Debug, Error)]
#[error("profile `{profile}` not found (known profiles: {})", .all_profiles.join(", "))]
pub struct ProfileNotFound {
    profile: String,
    all_profiles: Vec<String>,
}

impl ProfileNotFound {
    pub(crate) fn new(
        profile: impl Into<String>,
        all_profiles: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        let mut all_profiles: Vec<_> = all_profiles.into_iter().map(|s| s.into()).collect();
        all_profiles.sort_unstable();
        Self {
            profile: profile.into(),
            all_profiles,
        }
    }
}

/// A path template is missing the placeholder it must contain.
#[derive(Clone, Debug, Eq, Error, PartialEq)]
#[error("{key} `{template}` must contain the placeholder `{{{placeholder}}}`")]
pub struct PathTemplateError {
    /// The config key the template was read from.
    pub key: &'static str,

    /// The template as written.
    pub template: String,

    /// The placeholder that was expected.
    pub placeholder: &'static str,
}

/// A required run input was not provided.
#[derive(Clone, Debug, Error)]
#[error("missing required input: {name} is required")]
pub struct MissingInputError {
    /// The name of the input, as the invoking platform spells it.
    pub name: &'static str,
}

/// An error that occurred while talking to the remote API.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ApiError {
    /// The service returned a non-success status code.
    #[error("API request failed: {status} - {body} ({method} {url})")]
    Status {
        /// The request method.
        method: HttpMethod,

        /// The request URL.
        url: String,

        /// The HTTP status code.
        status: u16,

        /// The response body, with JSON bodies re-serialized compactly.
        body: String,
    },

    /// The request could not be sent, or the response could not be read.
    #[error("error sending {method} request to `{url}`")]
    Transport {
        /// The request method.
        method: HttpMethod,

        /// The request URL.
        url: String,

        /// The underlying error.
        #[source]
        err: Box<ureq::Error>,
    },

    /// The response body was not the expected JSON document.
    #[error("error deserializing response to {method} `{url}`")]
    Deserialize {
        /// The request method.
        method: HttpMethod,

        /// The request URL.
        url: String,

        /// The underlying error.
        #[source]
        err: serde_json::Error,
    },

    /// The blocking task running the request panicked or was cancelled.
    #[error("HTTP request task for {method} `{url}` did not complete")]
    TaskJoin {
        /// The request method.
        method: HttpMethod,

        /// The request URL.
        url: String,

        /// The underlying error.
        #[source]
        err: tokio::task::JoinError,
    },
}

/// An error that occurred while starting a suite execution.
#[derive(Debug, Error)]
#[error("failed to trigger test suite `{suite_id}`")]
pub struct TriggerError {
    /// The suite that was being triggered.
    pub suite_id: SuiteId,

    /// The underlying error.
    #[source]
    pub err: ApiError,
}

/// An error that ended monitoring before a suite-level outcome was known.
#[derive(Debug, Error)]
pub enum MonitorError {
    /// The suite execution could not be started.
    #[error(transparent)]
    Trigger(#[from] TriggerError),

    /// A poll failed after the execution was started.
    #[error(
        "failed to poll suite execution `{execution_id}` \
         (attempt {attempt} of {max_attempts})"
    )]
    Poll {
        /// The execution being monitored.
        execution_id: ExecutionId,

        /// The attempt that failed, starting from 1.
        attempt: usize,

        /// The configured maximum number of attempts.
        max_attempts: usize,

        /// Results accumulated by earlier polls. This is `None` if no poll succeeded.
        partial: Option<Box<ExecutionReport>>,

        /// The underlying error.
        #[source]
        err: ApiError,
    },

    /// A monitor event could not be written out.
    #[error("error writing monitor event")]
    WriteEvent(#[from] WriteEventError),
}

/// An error that occurred while building a [`MonitorRunner`](crate::monitor::MonitorRunner).
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum MonitorRunnerBuildError {
    /// An error occurred while creating the Tokio runtime.
    #[error("error creating Tokio runtime")]
    TokioRuntimeCreate(#[source] std::io::Error),
}

/// An error that occurs while writing an event.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum WriteEventError {
    /// An error occurred while writing the event to the provided output.
    #[error("error writing to output")]
    Io(#[source] std::io::Error),
}

/// Displays an error along with the chain of errors that caused it, on one line each.
pub struct DisplayErrorChain<E>(E);

impl<E: Error> DisplayErrorChain<E> {
    /// Creates a new `DisplayErrorChain`.
    pub fn new(error: E) -> Self {
        Self(error)
    }
}

impl<E: Error> fmt::Display for DisplayErrorChain<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)?;

        let mut next_error = self.0.source();
        while let Some(err) = next_error {
            write!(f, "\n  caused by: {err}")?;
            next_error = err.source();
        }

        Ok(())
    }
}
