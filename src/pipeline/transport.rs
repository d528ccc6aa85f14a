//! HTTP transport: the only stage with network I/O.
//!
//! The pipeline talks to the rendering service through the [`Transport`]
//! trait so the response interpreter can be exercised against scripted
//! responses. [`HttpTransport`] is the production implementation on top of
//! `reqwest`.
//!
//! No timeout is set here: the service's eventual answer (or a connection
//! failure) is the only termination signal.

use crate::config::RequestMethod;
use crate::pipeline::request::WireRequest;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use std::future::Future;
use thiserror::Error;
use tracing::debug;

/// The parts of an HTTP response the interpreter looks at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawResponse {
    pub status: u16,
    /// Raw `Content-Type` header, if present.
    pub content_type: Option<String>,
    pub body: Vec<u8>,
}

impl RawResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// The request never produced a response.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{message}")]
pub struct TransportError {
    pub message: String,
    pub timed_out: bool,
}

impl TransportError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            timed_out: false,
        }
    }
}

/// Sends one [`WireRequest`] and returns the raw response.
pub trait Transport: Send + Sync {
    fn execute(
        &self,
        request: WireRequest,
    ) -> impl Future<Output = Result<RawResponse, TransportError>> + Send;
}

/// `reqwest`-backed transport.
#[derive(Debug, Clone, Default)]
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use a pre-configured client (proxies, custom TLS roots, …).
    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

impl Transport for HttpTransport {
    async fn execute(&self, request: WireRequest) -> Result<RawResponse, TransportError> {
        let WireRequest {
            method,
            url,
            bearer_token,
            body,
        } = request;
        debug!("{:?} {}", method, redact_query(&url));

        let mut builder = match method {
            RequestMethod::Post => self.client.post(url),
            RequestMethod::Get => self.client.get(url),
        };
        if let Some(token) = bearer_token {
            builder = builder.header(AUTHORIZATION, format!("Bearer {token}"));
        }
        if let Some(body) = body {
            builder = builder.header(CONTENT_TYPE, "application/json").body(body);
        }

        let response = builder.send().await.map_err(to_transport_error)?;
        let status = response.status().as_u16();
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let body = response.bytes().await.map_err(to_transport_error)?.to_vec();

        debug!(
            "HTTP {} ({}), {} bytes",
            status,
            content_type.as_deref().unwrap_or("no content-type"),
            body.len()
        );
        Ok(RawResponse {
            status,
            content_type,
            body,
        })
    }
}

fn to_transport_error(e: reqwest::Error) -> TransportError {
    TransportError {
        timed_out: e.is_timeout(),
        message: e.to_string(),
    }
}

/// The GET query carries the whole document; keep it out of the logs.
fn redact_query(url: &reqwest::Url) -> String {
    let mut shown = url.clone();
    if shown.query().is_some() {
        shown.set_query(Some("…"));
    }
    shown.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn success_range() {
        let mut r = RawResponse {
            status: 200,
            content_type: None,
            body: vec![],
        };
        assert!(r.is_success());
        r.status = 299;
        assert!(r.is_success());
        r.status = 302;
        assert!(!r.is_success());
        r.status = 500;
        assert!(!r.is_success());
    }

    #[test]
    fn query_is_redacted_in_logs() {
        let url = reqwest::Url::parse("https://example.com/hook?content=secret+text").unwrap();
        let shown = redact_query(&url);
        assert!(!shown.contains("secret"));
        assert!(shown.starts_with("https://example.com/hook?"));
    }

    #[tokio::test]
    async fn unreachable_host_is_transport_error() {
        // Port 9 on localhost ("discard") is closed on any sane test machine.
        let url = reqwest::Url::parse("http://127.0.0.1:9/hook").unwrap();
        let result = HttpTransport::new()
            .execute(WireRequest::get(url, None))
            .await;
        assert!(result.is_err());
    }
}
