// Copyright (c) The suite-monitor Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use axum::{
    Router,
    extract::State,
    http::{Method, StatusCode, Uri, header},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use color_eyre::eyre::{Result, WrapErr};
use std::{
    collections::VecDeque,
    sync::{Arc, Mutex},
};
use tokio::{net::TcpListener, runtime::Runtime};

/// A canned HTTP response.
#[derive(Clone, Debug)]
pub(crate) struct FixtureResponse {
    pub(crate) status: u16,
    pub(crate) body: String,
}

impl FixtureResponse {
    pub(crate) fn json(status: u16, body: &str) -> Self {
        Self {
            status,
            body: body.to_owned(),
        }
    }
}

impl IntoResponse for FixtureResponse {
    fn into_response(self) -> Response {
        let status =
            StatusCode::from_u16(self.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (status, [(header::CONTENT_TYPE, "application/json")], self.body).into_response()
    }
}

#[derive(Debug)]
struct FixtureState {
    trigger: Mutex<VecDeque<FixtureResponse>>,
    polls: Mutex<VecDeque<FixtureResponse>>,
    requests: Mutex<Vec<String>>,
}

impl FixtureState {
    /// Records the request, then answers with the next scripted response from `queue`.
    fn respond(
        &self,
        method: Method,
        uri: Uri,
        queue: &Mutex<VecDeque<FixtureResponse>>,
    ) -> Response {
        self.record(&method, &uri);
        match queue.lock().expect("queue lock is not poisoned").pop_front() {
            Some(response) => response.into_response(),
            None => (StatusCode::INTERNAL_SERVER_ERROR, "fixture script exhausted").into_response(),
        }
    }

    fn record(&self, method: &Method, uri: &Uri) {
        self.requests
            .lock()
            .expect("requests lock is not poisoned")
            .push(format!("{method} {uri}"));
    }
}

async fn trigger(State(state): State<Arc<FixtureState>>, method: Method, uri: Uri) -> Response {
    state.respond(method, uri, &state.trigger)
}

async fn poll(State(state): State<Arc<FixtureState>>, method: Method, uri: Uri) -> Response {
    state.respond(method, uri, &state.polls)
}

async fn unrouted(
    State(state): State<Arc<FixtureState>>,
    method: Method,
    uri: Uri,
) -> Response {
    state.record(&method, &uri);
    (StatusCode::NOT_FOUND, "no such route").into_response()
}

/// A local execution service that answers the trigger and poll routes from a script, and records
/// every request it receives.
///
/// The server runs on its own runtime, which lives as long as the fixture.
pub(crate) struct FixtureServer {
    base_url: String,
    state: Arc<FixtureState>,
    _runtime: Runtime,
}

impl FixtureServer {
    /// Starts a server that answers the trigger route with `trigger_response` and the poll route
    /// with `polls`, in order.
    pub(crate) fn start(
        trigger_response: FixtureResponse,
        polls: Vec<FixtureResponse>,
    ) -> Result<Self> {
        let state = Arc::new(FixtureState {
            trigger: Mutex::new(VecDeque::from([trigger_response])),
            polls: Mutex::new(polls.into()),
            requests: Mutex::default(),
        });
        let app = Router::new()
            .route("/test-suite-executions/{suite_id}/execute", post(trigger))
            .route("/test-suite-executions/{execution_id}/test-executions", get(poll))
            .fallback(unrouted)
            .with_state(state.clone());

        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(1)
            .enable_all()
            .build()
            .wrap_err("creating fixture runtime")?;
        let listener = runtime
            .block_on(TcpListener::bind("127.0.0.1:0"))
            .wrap_err("binding fixture server")?;
        let addr = listener.local_addr()?;
        runtime.spawn(async move { axum::serve(listener, app).await });

        Ok(Self {
            base_url: format!("http://{addr}"),
            state,
            _runtime: runtime,
        })
    }

    pub(crate) fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Returns the requests received so far, e.g. `GET /path`.
    pub(crate) fn requests(&self) -> Vec<String> {
        self.state
            .requests
            .lock()
            .expect("requests lock is not poisoned")
            .clone()
    }
}
