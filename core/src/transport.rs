//! Executes `HttpRequest` values against the network.
//!
//! # Design
//! `Transport` is the single I/O seam of the crate. `UreqTransport` is the
//! production implementation; tests can swap in a canned transport without
//! a server. Status codes never become `Err` here: 4xx/5xx are returned as
//! data so the normalizer can interpret them.

use tracing::debug;

use crate::error::ApiError;
use crate::http::{HttpMethod, HttpRequest, HttpResponse};

pub trait Transport {
    /// Perform exactly one round-trip and read the body in full.
    fn execute(&self, request: &HttpRequest) -> Result<HttpResponse, ApiError>;
}

impl<T: Transport + ?Sized> Transport for &T {
    fn execute(&self, request: &HttpRequest) -> Result<HttpResponse, ApiError> {
        (**self).execute(request)
    }
}

/// Blocking transport backed by a `ureq::Agent`. No timeout, no retry.
#[derive(Clone)]
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
    fn execute(&self, request: &HttpRequest) -> Result<HttpResponse, ApiError> {
        debug!(method = %request.method, url = %request.url, "sending request");

        let result = match request.method {
            HttpMethod::Get => {
                let mut builder = self.agent.get(&request.url);
                for (name, value) in &request.headers {
                    builder = builder.header(name, value);
                }
                builder.call()
            }
            HttpMethod::Delete => {
                let mut builder = self.agent.delete(&request.url);
                for (name, value) in &request.headers {
                    builder = builder.header(name, value);
                }
                builder.call()
            }
            HttpMethod::Post | HttpMethod::Put => {
                let mut builder = if request.method == HttpMethod::Post {
                    self.agent.post(&request.url)
                } else {
                    self.agent.put(&request.url)
                };
                for (name, value) in &request.headers {
                    builder = builder.header(name, value);
                }
                match &request.body {
                    Some(body) => builder.send(body.as_bytes()),
                    None => builder.send_empty(),
                }
            }
        };
        let mut response = result.map_err(|e| ApiError::Transport(e.to_string()))?;

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
        // ureq caps bodies at 10 MiB by default; a fetch-style client reads any size.
        let body = response
            .body_mut()
            .with_config()
            .limit(u64::MAX)
            .read_to_string()
            .map_err(|e| ApiError::Transport(e.to_string()))?;

        debug!(status, "received response");
        Ok(HttpResponse {
            status,
            headers,
            body,
        })
    }
}
