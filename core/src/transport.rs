//! Executes `HttpRequest` values against the network.
//!
//! # Design
//! `Transport` is the only place I/O happens. It returns every HTTP status
//! as data so `MeicanClient` keeps sole ownership of status interpretation;
//! only failures that produce no response at all (connect, DNS, timeout)
//! become `ApiError::Transport`, with the underlying error kept as source.
//! The timeout is taken from each request, never from the client.

use std::future::Future;

use reqwest::header::{HeaderName, HeaderValue};
use tracing::debug;

use crate::error::ApiError;
use crate::http::{HttpMethod, HttpRequest, HttpResponse};

pub trait Transport: Send + Sync {
    fn execute(&self, request: HttpRequest) -> impl Future<Output = Result<HttpResponse, ApiError>> + Send;
}

/// `reqwest`-backed transport sharing one connection pool.
#[derive(Debug, Clone, Default)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

impl Transport for ReqwestTransport {
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse, ApiError> {
        debug!(method = request.method.as_str(), url = %request.url, "dispatching request");

        let method = match request.method {
            HttpMethod::Get => reqwest::Method::GET,
            HttpMethod::Post => reqwest::Method::POST,
            HttpMethod::Delete => reqwest::Method::DELETE,
        };
        let mut builder = self
            .client
            .request(method, &request.url)
            .timeout(request.timeout);
        for (name, value) in &request.headers {
            let name = HeaderName::from_bytes(name.as_bytes()).map_err(|e| ApiError::Transport(Box::new(e)))?;
            let value = HeaderValue::from_str(value).map_err(|e| ApiError::Transport(Box::new(e)))?;
            builder = builder.header(name, value);
        }
        if let Some(body) = request.body {
            builder = builder.body(body);
        }

        let response = builder.send().await.map_err(|e| ApiError::Transport(Box::new(e)))?;
        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .filter_map(|(k, v)| v.to_str().ok().map(|v| (k.to_string(), v.to_string())))
            .collect();
        let body = response.text().await.map_err(|e| ApiError::Transport(Box::new(e)))?;

        Ok(HttpResponse { status, headers, body })
    }
}
