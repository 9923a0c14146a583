//! Network transport.
//!
//! # Responsibilities
//! - Send one attempt of a request and collect the response
//! - Turn every non-2xx response, connection failure and timeout into a
//!   `RawFailure`, so nothing downstream inspects transport errors directly
//!
//! # Design Decisions
//! - Transport is a trait so the retry pipeline and health monitor can be
//!   driven by in-process fakes
//! - Timeouts are per attempt; the retry policy owns the overall bound
//! - `http` and `https` base URLs share one pooled client; TLS is rustls
//!   with the webpki root set

use std::time::{Duration, Instant};

use async_trait::async_trait;
use http::header::{HeaderValue, USER_AGENT};
use http_body_util::{BodyExt, Full};
use hyper::body::Bytes;
use hyper_rustls::{HttpsConnector, HttpsConnectorBuilder};
use hyper_util::{
    client::legacy::{connect::HttpConnector, Client},
    rt::TokioExecutor,
};
use tokio::time;

use crate::config::TimeoutConfig;
use crate::failure::{HttpFailure, NetworkCause, NetworkFailure, Payload, RawFailure};
use crate::http::request::{RequestDescriptor, X_REQUEST_ID};
use crate::http::response::Response;

/// Sends a single attempt of a request.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: &RequestDescriptor) -> Result<Response, RawFailure>;
}

/// Hyper-based HTTP/1.1 + HTTP/2 transport.
#[derive(Clone)]
pub struct HyperTransport {
    client: Client<HttpsConnector<HttpConnector>, Full<Bytes>>,
    request_timeout: Duration,
    user_agent: HeaderValue,
}

impl HyperTransport {
    pub fn new(timeouts: &TimeoutConfig, user_agent: &str) -> Self {
        let mut connector = HttpConnector::new();
        connector.set_connect_timeout(Some(Duration::from_millis(timeouts.connect_ms)));
        connector.enforce_http(false);

        let connector = HttpsConnectorBuilder::new()
            .with_webpki_roots()
            .https_or_http()
            .enable_http1()
            .enable_http2()
            .wrap_connector(connector);

        let client = Client::builder(TokioExecutor::new()).build(connector);
        let user_agent = HeaderValue::from_str(user_agent)
            .unwrap_or_else(|_| HeaderValue::from_static("backend-guard"));

        Self {
            client,
            request_timeout: Duration::from_millis(timeouts.request_ms),
            user_agent,
        }
    }

    fn build_request(
        &self,
        request: &RequestDescriptor,
    ) -> Result<http::Request<Full<Bytes>>, http::Error> {
        let mut builder = http::Request::builder()
            .method(request.method.clone())
            .uri(request.url.as_str());

        if let Some(headers) = builder.headers_mut() {
            for (name, value) in request.headers.iter() {
                headers.append(name.clone(), value.clone());
            }
            if !headers.contains_key(USER_AGENT) {
                headers.insert(USER_AGENT, self.user_agent.clone());
            }
            if let Ok(id) = HeaderValue::from_str(&request.request_id.to_string()) {
                headers.insert(X_REQUEST_ID, id);
            }
        }

        builder.body(Full::new(request.body.clone().unwrap_or_default()))
    }

    async fn exchange(&self, request: &RequestDescriptor) -> Result<Response, RawFailure> {
        let url = request.url.to_string();
        let start = Instant::now();

        let http_request = self.build_request(request).map_err(|e| {
            RawFailure::from(
                NetworkFailure::new(NetworkCause::Other, format!("Invalid request: {}", e))
                    .with_url(url.clone()),
            )
        })?;

        let response = match time::timeout(self.request_timeout, self.client.request(http_request)).await {
            Ok(Ok(response)) => response,
            Ok(Err(e)) => {
                let cause = if e.is_connect() {
                    NetworkCause::Connect
                } else {
                    NetworkCause::Other
                };
                return Err(NetworkFailure::new(cause, format!("Network connection failed: {}", e))
                    .with_url(url)
                    .into());
            }
            Err(_) => {
                return Err(NetworkFailure::new(
                    NetworkCause::Timeout,
                    format!("Request timeout after {:?}", self.request_timeout),
                )
                .with_url(url)
                .into());
            }
        };

        let (parts, body) = response.into_parts();
        let body = body
            .collect()
            .await
            .map(|collected| collected.to_bytes())
            .map_err(|e| {
                RawFailure::from(
                    NetworkFailure::new(NetworkCause::Other, format!("Network error reading body: {}", e))
                        .with_url(url.clone()),
                )
            })?;

        if !parts.status.is_success() {
            let failure = HttpFailure {
                status: parts.status.as_u16(),
                status_text: parts.status.canonical_reason().unwrap_or_default().to_string(),
                url,
                method: request.method.clone(),
                message: None,
                body: parse_body(&body),
            };
            return Err(failure.into());
        }

        Ok(Response {
            status: parts.status,
            headers: parts.headers,
            body,
            elapsed: start.elapsed(),
        })
    }
}

#[async_trait]
impl Transport for HyperTransport {
    async fn send(&self, request: &RequestDescriptor) -> Result<Response, RawFailure> {
        tracing::debug!(
            request_id = %request.request_id,
            method = %request.method,
            url = %request.url,
            "Sending request"
        );
        self.exchange(request).await
    }
}

impl std::fmt::Debug for HyperTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HyperTransport")
            .field("request_timeout", &self.request_timeout)
            .field("user_agent", &self.user_agent)
            .finish()
    }
}

/// Error bodies are kept as JSON when they parse, as text otherwise.
fn parse_body(body: &Bytes) -> Option<Payload> {
    if body.is_empty() {
        return None;
    }
    match serde_json::from_slice::<serde_json::Value>(body) {
        Ok(value) => Some(Payload::from(value)),
        Err(_) => Some(Payload::Text(String::from_utf8_lossy(body).into_owned())),
    }
}
