//! Scripted transport for testing
//!
//! Responses are registered per route (method + URL fragment). Each route
//! holds a queue of responses; the last one is sticky, so a status poll that
//! should report `IN_PROGRESS` forever needs a single entry. Every request is
//! recorded for later assertions.

use async_trait::async_trait;
use serde_json::Value;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use super::{ApiRequest, HttpMethod, JsonTransport};
use crate::error::{PlatformError, Result};

/// A request as seen by the mock, without secrets.
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: HttpMethod,
    pub url: String,
    pub query: Vec<(String, String)>,
    pub body: Option<Value>,
    pub headers: Vec<(String, String)>,
    pub had_access_token: bool,
    pub had_bearer: bool,
}

impl RecordedRequest {
    pub fn query_value(&self, key: &str) -> Option<&str> {
        self.query
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

struct Route {
    method: HttpMethod,
    fragment: String,
    responses: VecDeque<std::result::Result<Value, PlatformError>>,
}

#[derive(Clone, Default)]
pub struct ScriptedTransport {
    routes: Arc<Mutex<Vec<Route>>>,
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a successful JSON response for requests whose URL ends with
    /// `fragment` (query string excluded).
    pub fn respond(&self, method: HttpMethod, fragment: &str, body: Value) -> &Self {
        self.push(method, fragment, Ok(body))
    }

    /// Queue an HTTP error response.
    pub fn fail(&self, method: HttpMethod, fragment: &str, status: u16, body: &str) -> &Self {
        self.push(
            method,
            fragment,
            Err(PlatformError::Api {
                status,
                body: body.to_string(),
            }),
        )
    }

    /// Queue a connection failure.
    pub fn fail_network(&self, method: HttpMethod, fragment: &str) -> &Self {
        self.push(
            method,
            fragment,
            Err(PlatformError::Network("connection refused".to_string())),
        )
    }

    fn push(
        &self,
        method: HttpMethod,
        fragment: &str,
        response: std::result::Result<Value, PlatformError>,
    ) -> &Self {
        let mut routes = self.routes.lock().unwrap();
        match routes
            .iter_mut()
            .find(|r| r.method == method && r.fragment == fragment)
        {
            Some(route) => route.responses.push_back(response),
            None => routes.push(Route {
                method,
                fragment: fragment.to_string(),
                responses: VecDeque::from([response]),
            }),
        }
        self
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().unwrap().clone()
    }

    /// Requests whose URL ends with `fragment`.
    pub fn requests_to(&self, method: HttpMethod, fragment: &str) -> Vec<RecordedRequest> {
        self.requests()
            .into_iter()
            .filter(|r| r.method == method && r.url.ends_with(fragment))
            .collect()
    }
}

#[async_trait]
impl JsonTransport for ScriptedTransport {
    async fn send(&self, request: ApiRequest) -> Result<Value> {
        self.requests.lock().unwrap().push(RecordedRequest {
            method: request.method,
            url: request.url.clone(),
            query: request.query.clone(),
            body: request.body.clone(),
            headers: request.headers.clone(),
            had_access_token: request.access_token.is_some(),
            had_bearer: request.bearer.is_some(),
        });

        let mut routes = self.routes.lock().unwrap();
        // Longest fragment wins so "/media_publish" is not shadowed by "/media"
        let route = routes
            .iter_mut()
            .filter(|r| r.method == request.method && request.url.ends_with(&r.fragment))
            .max_by_key(|r| r.fragment.len());

        let response = match route {
            Some(route) if route.responses.len() > 1 => route.responses.pop_front(),
            Some(route) => route.responses.front().cloned(),
            None => None,
        };

        match response {
            Some(Ok(value)) => Ok(value),
            Some(Err(e)) => Err(e.into()),
            None => Err(PlatformError::Api {
                status: 404,
                body: format!("no scripted response for {} {}", request.method, request.url),
            }
            .into()),
        }
    }
}
