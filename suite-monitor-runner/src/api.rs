// Copyright (c) The suite-monitor Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Access to the remote test execution service.
//!
//! The monitor talks to the service through the [`ExecutionApi`] trait. [`HttpApi`] is the real
//! implementation, backed by a blocking `ureq` agent.

use crate::{
    config::MonitorProfile,
    errors::{ApiError, PathTemplateError},
};
use serde::de::DeserializeOwned;
use std::{fmt, future::Future, time::Duration};
use suite_monitor_metadata::{ExecutionId, ExecutionSnapshot, SuiteExecution, SuiteId};
use tracing::debug;

/// The operations the monitor needs from the test execution service.
pub trait ExecutionApi {
    /// Starts an execution of the given suite.
    fn trigger(
        &self,
        suite_id: &SuiteId,
    ) -> impl Future<Output = Result<SuiteExecution, ApiError>>;

    /// Reads the current state of an execution, along with all of its test executions.
    fn poll(
        &self,
        execution_id: &ExecutionId,
    ) -> impl Future<Output = Result<ExecutionSnapshot, ApiError>>;
}

/// An HTTP method used against the service.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum HttpMethod {
    /// `GET`.
    Get,

    /// `POST`.
    Post,
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Get => write!(f, "GET"),
            Self::Post => write!(f, "POST"),
        }
    }
}

/// A request path containing a single `{placeholder}`.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct PathTemplate {
    key: &'static str,
    template: String,
    placeholder: &'static str,
}

impl PathTemplate {
    /// Creates a new template. `key` is the config key the template was read from.
    pub fn new(key: &'static str, template: impl Into<String>, placeholder: &'static str) -> Self {
        Self {
            key,
            template: template.into(),
            placeholder,
        }
    }

    /// Returns the template as written.
    pub fn as_str(&self) -> &str {
        &self.template
    }

    /// Returns an error if the placeholder is missing from the template.
    pub fn check(&self) -> Result<(), PathTemplateError> {
        if self.template.contains(&self.pattern()) {
            Ok(())
        } else {
            Err(PathTemplateError {
                key: self.key,
                template: self.template.clone(),
                placeholder: self.placeholder,
            })
        }
    }

    /// Substitutes `value` for every occurrence of the placeholder.
    pub fn render(&self, value: &str) -> String {
        self.template.replace(&self.pattern(), value)
    }

    fn pattern(&self) -> String {
        format!("{{{}}}", self.placeholder)
    }
}

/// The HTTP implementation of [`ExecutionApi`].
///
/// Requests are made with a blocking agent on Tokio's blocking thread pool. Non-2xx responses are
/// turned into [`ApiError::Status`].
#[derive(Clone)]
pub struct HttpApi {
    agent: ureq::Agent,
    base_url: String,
    trigger_path: PathTemplate,
    poll_path: PathTemplate,
}

impl HttpApi {
    /// Creates a new client for the service at `base_url`, with paths and timeouts taken from
    /// `profile`.
    pub fn new(base_url: &str, profile: &MonitorProfile<'_>) -> Self {
        Self::with_paths(
            base_url,
            profile.trigger_path(),
            profile.poll_path(),
            profile.request_timeout(),
        )
    }

    /// Creates a new client with explicit path templates.
    pub fn with_paths(
        base_url: &str,
        trigger_path: PathTemplate,
        poll_path: PathTemplate,
        request_timeout: Duration,
    ) -> Self {
        let config = ureq::Agent::config_builder()
            .http_status_as_error(false)
            .timeout_global(Some(request_timeout))
            .build();
        Self {
            agent: ureq::Agent::new_with_config(config),
            base_url: base_url.trim_end_matches('/').to_owned(),
            trigger_path,
            poll_path,
        }
    }

    /// Returns the base URL, without a trailing slash.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, template: &PathTemplate, value: &str) -> String {
        format!("{}{}", self.base_url, template.render(value))
    }

    async fn request<T>(&self, method: HttpMethod, url: String) -> Result<T, ApiError>
    where
        T: DeserializeOwned + Send + 'static,
    {
        debug!("{method} {url}");
        let agent = self.agent.clone();
        let task_url = url.clone();
        tokio::task::spawn_blocking(move || blocking_request(&agent, method, task_url))
            .await
            .map_err(|err| ApiError::TaskJoin { method, url, err })?
    }
}

impl fmt::Debug for HttpApi {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpApi")
            .field("base_url", &self.base_url)
            .field("trigger_path", &self.trigger_path.as_str())
            .field("poll_path", &self.poll_path.as_str())
            .finish_non_exhaustive()
    }
}

impl ExecutionApi for HttpApi {
    async fn trigger(&self, suite_id: &SuiteId) -> Result<SuiteExecution, ApiError> {
        let url = self.url(&self.trigger_path, suite_id.as_str());
        self.request(HttpMethod::Post, url).await
    }

    async fn poll(&self, execution_id: &ExecutionId) -> Result<ExecutionSnapshot, ApiError> {
        let url = self.url(&self.poll_path, execution_id.as_str());
        self.request(HttpMethod::Get, url).await
    }
}

fn blocking_request<T: DeserializeOwned>(
    agent: &ureq::Agent,
    method: HttpMethod,
    url: String,
) -> Result<T, ApiError> {
    let transport_err = |err: ureq::Error, url: &str| ApiError::Transport {
        method,
        url: url.to_owned(),
        err: Box::new(err),
    };

    let result = match method {
        HttpMethod::Get => agent
            .get(&url)
            .header("Accept", "application/json")
            .call(),
        HttpMethod::Post => agent
            .post(&url)
            .header("Accept", "application/json")
            .send_empty(),
    };
    let mut response = result.map_err(|err| transport_err(err, &url))?;

    let status = response.status();
    let body = response
        .body_mut()
        .read_to_string()
        .map_err(|err| transport_err(err, &url))?;
    debug!("{method} {url} -> {}", status.as_u16());

    if !status.is_success() {
        return Err(ApiError::Status {
            method,
            url,
            status: status.as_u16(),
            body: compact_body(&body),
        });
    }

    serde_json::from_str(&body).map_err(|err| ApiError::Deserialize { method, url, err })
}

// JSON error bodies are re-serialized onto a single line so they fit into one error message.
fn compact_body(body: &str) -> String {
    match serde_json::from_str::<serde_json::Value>(body) {
        Ok(value) => value.to_string(),
        Err(_) => body.trim().to_owned(),
    }
}
