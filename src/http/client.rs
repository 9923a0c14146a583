//! The guarded HTTP client.
//!
//! # Responsibilities
//! - Run every request through the retry policy
//! - Report terminal failures with their request details
//! - Hand the terminal error back to the caller unchanged

use std::sync::Arc;

use chrono::Utc;
use http::header::{HeaderMap, AUTHORIZATION, COOKIE, PROXY_AUTHORIZATION};
use url::Url;

use crate::failure::RawFailure;
use crate::http::request::RequestDescriptor;
use crate::http::response::Response;
use crate::http::transport::Transport;
use crate::observability::metrics;
use crate::reporting::{ErrorReporter, RequestContext};
use crate::resilience::{is_network_error, GuardError, RetryPolicy};

/// Context name attached to failures reported by the client.
pub const HTTP_CLIENT_CONTEXT: &str = "http_client";

const REDACTED: &str = "[redacted]";

/// Retrying, reporting HTTP client for the backend API.
#[derive(Clone)]
pub struct GuardedClient {
    transport: Arc<dyn Transport>,
    retry: Arc<RetryPolicy>,
    reporter: Arc<ErrorReporter>,
    base_url: Url,
}

impl GuardedClient {
    pub fn new(
        transport: Arc<dyn Transport>,
        retry: Arc<RetryPolicy>,
        reporter: Arc<ErrorReporter>,
        base_url: Url,
    ) -> Self {
        Self {
            transport,
            retry,
            reporter,
            base_url,
        }
    }

    /// Absolute URL for a path on the backend API.
    pub fn url(&self, path: &str) -> Result<Url, url::ParseError> {
        let base = self.base_url.as_str().trim_end_matches('/');
        let path = path.trim_start_matches('/');
        Url::parse(&format!("{}/{}", base, path))
    }

    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.retry
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Send with retries. Terminal failures are reported, then returned.
    pub async fn send(&self, request: RequestDescriptor) -> Result<Response, GuardError> {
        metrics::record_request(request.method.as_str());

        let transport = &self.transport;
        let result = self
            .retry
            .execute(&request, || transport.send(&request))
            .await;

        if let Err(err) = &result {
            let failure = err.failure();
            let context = RequestContext {
                request_id: request.request_id,
                method: request.method.to_string(),
                url: request.url.to_string(),
                headers: redacted_headers(&request.headers),
                timestamp: Utc::now(),
                is_network_error: is_network_error(failure),
            };
            log_diagnostics(failure, &request);
            self.reporter
                .process_request_failure(failure.clone(), HTTP_CLIENT_CONTEXT, context);
        }

        result
    }
}

impl std::fmt::Debug for GuardedClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GuardedClient")
            .field("base_url", &self.base_url.as_str())
            .field("retry", &self.retry.config())
            .finish()
    }
}

fn redacted_headers(headers: &HeaderMap) -> Vec<(String, String)> {
    headers
        .iter()
        .map(|(name, value)| {
            let value = if name == AUTHORIZATION || name == PROXY_AUTHORIZATION || name == COOKIE {
                REDACTED.to_string()
            } else {
                String::from_utf8_lossy(value.as_bytes()).into_owned()
            };
            (name.as_str().to_string(), value)
        })
        .collect()
}

fn log_diagnostics(failure: &RawFailure, request: &RequestDescriptor) {
    let url = request.url.as_str();
    match failure.status() {
        Some(401) => tracing::warn!(url = %url, "Unauthorized: credentials missing or expired"),
        Some(403) => tracing::warn!(url = %url, "Forbidden: insufficient permissions"),
        Some(404) => tracing::warn!(url = %url, "Resource not found"),
        Some(500) => tracing::error!(url = %url, "Internal server error"),
        Some(0) => tracing::error!(url = %url, "Network error: backend unreachable"),
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ApiConfig, ReporterConfig, RetryConfig};
    use crate::failure::{ErrorKind, HttpFailure, Severity};
    use async_trait::async_trait;
    use http::header::HeaderValue;
    use http::StatusCode;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FixedStatus {
        status: u16,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl Transport for FixedStatus {
        async fn send(&self, request: &RequestDescriptor) -> Result<Response, RawFailure> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.status == 200 {
                return Ok(Response::new(StatusCode::OK, "{}"));
            }
            Err(HttpFailure::new(self.status, "", request.method.clone(), request.url.as_str()).into())
        }
    }

    fn client(status: u16) -> (GuardedClient, Arc<FixedStatus>, Arc<ErrorReporter>) {
        let transport = Arc::new(FixedStatus {
            status,
            calls: AtomicUsize::new(0),
        });
        let reporter = Arc::new(ErrorReporter::new(&ReporterConfig::default(), &ApiConfig::default()));
        let retry = Arc::new(RetryPolicy::new(RetryConfig::default()));
        let client = GuardedClient::new(
            transport.clone(),
            retry,
            reporter.clone(),
            Url::parse("http://localhost:8787/").unwrap(),
        );
        (client, transport, reporter)
    }

    #[test]
    fn test_url_joins_base() {
        let (client, _, _) = client(200);
        assert_eq!(
            client.url("/api/reports").unwrap().as_str(),
            "http://localhost:8787/api/reports"
        );
    }

    #[tokio::test]
    async fn test_success_reports_nothing() {
        let (client, transport, reporter) = client(200);
        let url = client.url("/api/reports").unwrap();
        let response = client.send(RequestDescriptor::get(url)).await.unwrap();

        assert_eq!(response.status, StatusCode::OK);
        assert_eq!(transport.calls.load(Ordering::SeqCst), 1);
        assert!(reporter.queued_errors().is_empty());
    }

    #[tokio::test]
    async fn test_not_found_is_reported_with_request() {
        let (client, transport, reporter) = client(404);
        let url = client.url("/api/reports/7").unwrap();
        let request = RequestDescriptor::get(url)
            .header(AUTHORIZATION, HeaderValue::from_static("Bearer secret"));
        let request_id = request.request_id;

        let err = client.send(request).await.unwrap_err();
        assert!(!err.is_exhausted());
        assert_eq!(err.failure().status(), Some(404));
        assert_eq!(transport.calls.load(Ordering::SeqCst), 1);

        let queued = reporter.queued_errors();
        assert_eq!(queued.len(), 1);
        assert_eq!(queued[0].context.as_deref(), Some(HTTP_CLIENT_CONTEXT));
        assert_eq!(queued[0].severity, Severity::Medium);

        let ctx = queued[0].request.as_ref().unwrap();
        assert_eq!(ctx.request_id, request_id);
        assert_eq!(ctx.method, "GET");
        assert!(!ctx.is_network_error);
        assert_eq!(ctx.headers, vec![("authorization".to_string(), REDACTED.to_string())]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_exhaustion_is_reported_once() {
        let (client, transport, reporter) = client(503);
        let url = client.url("/api/reports").unwrap();

        let err = client.send(RequestDescriptor::get(url)).await.unwrap_err();
        assert!(err.is_exhausted());
        assert_eq!(transport.calls.load(Ordering::SeqCst), 3);

        let queued = reporter.queued_errors();
        assert_eq!(queued.len(), 1);
        assert_eq!(queued[0].kind, ErrorKind::Http);
        assert_eq!(queued[0].severity, Severity::High);
        assert!(queued[0].request.as_ref().unwrap().is_network_error);
    }
}
