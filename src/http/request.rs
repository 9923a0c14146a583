//! Outbound request descriptors.
//!
//! # Responsibilities
//! - Describe one logical request (method, url, headers, body)
//! - Carry a request ID that stays stable across retries
//! - Mark non-idempotent writes as safe to retry

use http::header::{HeaderMap, HeaderName, HeaderValue, CONTENT_TYPE};
use http::Method;
use hyper::body::Bytes;
use serde::Serialize;
use url::Url;
use uuid::Uuid;

/// Opt-in header marking a POST/PUT/PATCH as safe to retry.
pub const X_RETRY_SAFE: &str = "x-retry-safe";

/// Request correlation header.
pub const X_REQUEST_ID: &str = "x-request-id";

/// One logical outbound request.
#[derive(Debug, Clone)]
pub struct RequestDescriptor {
    pub method: Method,
    pub url: Url,
    pub headers: HeaderMap,
    pub body: Option<Bytes>,
    pub request_id: Uuid,
}

impl RequestDescriptor {
    pub fn new(method: Method, url: Url) -> Self {
        Self {
            method,
            url,
            headers: HeaderMap::new(),
            body: None,
            request_id: Uuid::new_v4(),
        }
    }

    pub fn get(url: Url) -> Self {
        Self::new(Method::GET, url)
    }

    pub fn head(url: Url) -> Self {
        Self::new(Method::HEAD, url)
    }

    pub fn delete(url: Url) -> Self {
        Self::new(Method::DELETE, url)
    }

    pub fn post(url: Url) -> Self {
        Self::new(Method::POST, url)
    }

    pub fn put(url: Url) -> Self {
        Self::new(Method::PUT, url)
    }

    pub fn patch(url: Url) -> Self {
        Self::new(Method::PATCH, url)
    }

    pub fn header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    pub fn body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = Some(body.into());
        self
    }

    /// Serialize `value` as the JSON body.
    pub fn json<T: Serialize>(mut self, value: &T) -> Result<Self, serde_json::Error> {
        let bytes = serde_json::to_vec(value)?;
        self.headers
            .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        self.body = Some(Bytes::from(bytes));
        Ok(self)
    }

    /// Opt this request into retries even though it may not be idempotent.
    pub fn retry_safe(mut self) -> Self {
        self.headers
            .insert(HeaderName::from_static(X_RETRY_SAFE), HeaderValue::from_static("true"));
        self
    }

    pub fn has_retry_safe_header(&self) -> bool {
        self.headers.contains_key(X_RETRY_SAFE)
    }
}
