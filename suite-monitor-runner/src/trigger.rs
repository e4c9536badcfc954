// Copyright (c) The suite-monitor Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Starting a suite execution.

use crate::{
    api::ExecutionApi,
    config::MonitorProfile,
    errors::{MissingInputError, TriggerError},
};
use suite_monitor_metadata::{SuiteExecution, SuiteId};
use tracing::debug;

/// The resolved inputs for a run.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct RunInputs {
    /// The suite to trigger.
    pub suite_id: SuiteId,

    /// The base URL of the test execution service.
    pub api_base_url: String,
}

impl RunInputs {
    /// The name of the suite ID input.
    pub const TEST_SUITE_ID: &'static str = "test_suite_id";

    /// The name of the base URL input.
    pub const API_BASE_URL: &'static str = "api_base_url";

    /// Resolves run inputs from raw values, falling back to `profile` for the base URL.
    ///
    /// Values are trimmed, and empty values are treated as missing.
    pub fn resolve(
        suite_id: Option<&str>,
        api_base_url: Option<&str>,
        profile: &MonitorProfile<'_>,
    ) -> Result<Self, MissingInputError> {
        let suite_id = non_empty(suite_id).ok_or(MissingInputError {
            name: Self::TEST_SUITE_ID,
        })?;
        let api_base_url = non_empty(api_base_url)
            .or_else(|| profile.api_base_url())
            .ok_or(MissingInputError {
                name: Self::API_BASE_URL,
            })?;

        Ok(Self {
            suite_id: SuiteId::new(suite_id),
            api_base_url: api_base_url.to_owned(),
        })
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|value| !value.is_empty())
}

/// Starts one execution of `suite_id`. The request is never retried.
pub async fn trigger_execution<A: ExecutionApi>(
    api: &A,
    suite_id: &SuiteId,
) -> Result<SuiteExecution, TriggerError> {
    debug!("triggering test suite {suite_id}");
    api.trigger(suite_id).await.map_err(|err| TriggerError {
        suite_id: suite_id.clone(),
        err,
    })
}
