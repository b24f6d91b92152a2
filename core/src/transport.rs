//! Blocking execution of `HttpRequest` values.
//!
//! The clients only ever build and parse plain data; a `Transport` is the one
//! place a request touches the network. Tests substitute scripted transports.

use tracing::trace;

use crate::error::{Error, Result};
use crate::http::{HttpMethod, HttpRequest, HttpResponse};

/// Executes one request and returns the response as data.
///
/// Implementations must return non-2xx responses as `Ok`; only failures that
/// produce no response at all become `Err`.
pub trait Transport {
    fn execute(&self, request: &HttpRequest) -> Result<HttpResponse>;
}

impl<T: Transport + ?Sized> Transport for &T {
    fn execute(&self, request: &HttpRequest) -> Result<HttpResponse> {
        (**self).execute(request)
    }
}

/// `Transport` backed by a `ureq` agent.
///
/// Disables ureq's automatic status-code-as-error behavior so 4xx/5xx
/// responses are returned as data and interpreted by the clients. No timeout
/// is configured beyond ureq's defaults.
#[derive(Debug, Clone)]
pub struct UreqTransport {
    agent: ureq::Agent,
}

impl UreqTransport {
    pub fn new() -> Self {
        let agent = ureq::Agent::config_builder()
            .http_status_as_error(false)
            .build()
            .new_agent();
        Self { agent }
    }
}

impl Default for UreqTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl Transport for UreqTransport {
    fn execute(&self, req: &HttpRequest) -> Result<HttpResponse> {
        trace!(method = ?req.method, path = %req.path, "executing request");
        let agent = &self.agent;
        let body = req.body.as_deref().map(str::as_bytes);

        let result = match (req.method, body) {
            (HttpMethod::Get, _) => decorate(agent.get(&req.path), req).call(),
            (HttpMethod::Head, _) => decorate(agent.head(&req.path), req).call(),
            (HttpMethod::Delete, _) => decorate(agent.delete(&req.path), req).call(),
            (HttpMethod::Post, Some(body)) => decorate(agent.post(&req.path), req).send(body),
            (HttpMethod::Post, None) => decorate(agent.post(&req.path), req).send_empty(),
            (HttpMethod::Put, Some(body)) => decorate(agent.put(&req.path), req).send(body),
            (HttpMethod::Put, None) => decorate(agent.put(&req.path), req).send_empty(),
            (HttpMethod::Patch, Some(body)) => decorate(agent.patch(&req.path), req).send(body),
            (HttpMethod::Patch, None) => decorate(agent.patch(&req.path), req).send_empty(),
        };
        let mut response = result.map_err(|e| Error::Transport(e.to_string()))?;

        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.as_str().to_string(), v.to_string()))
            })
            .collect();
        let body = if req.method == HttpMethod::Head {
            String::new()
        } else {
            response
                .body_mut()
                .read_to_string()
                .map_err(|e| Error::Transport(e.to_string()))?
        };

        Ok(HttpResponse {
            status,
            headers,
            body,
        })
    }
}

fn decorate<B>(mut builder: ureq::RequestBuilder<B>, req: &HttpRequest) -> ureq::RequestBuilder<B> {
    for (name, value) in &req.query {
        builder = builder.query(name, value);
    }
    for (name, value) in &req.headers {
        builder = builder.header(name.as_str(), value.as_str());
    }
    builder
}
