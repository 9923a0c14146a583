//! Failure values produced at the transport boundary.

use http::Method;
use thiserror::Error;

use crate::failure::payload::Payload;

/// Every failure the guard can observe, as a closed set of shapes.
#[derive(Debug, Clone, Error)]
pub enum RawFailure {
    /// A response was received with a non-2xx status.
    #[error(transparent)]
    Http(HttpFailure),

    /// No response was received.
    #[error(transparent)]
    Network(NetworkFailure),

    /// Uncaught fault in application logic.
    #[error(transparent)]
    Runtime(RuntimeFault),

    /// A failure wrapped by a surrounding error boundary.
    #[error("{}", .message.as_deref().unwrap_or("wrapped error"))]
    Wrapped {
        message: Option<String>,
        original: Box<RawFailure>,
    },

    /// A bare textual report.
    #[error("{0}")]
    Message(String),

    /// Anything that matches no known shape.
    #[error("opaque error payload")]
    Opaque(Payload),
}

/// A non-2xx HTTP response.
#[derive(Debug, Clone, Error)]
#[error("Http failure response for {url}: {status} {status_text}")]
pub struct HttpFailure {
    pub status: u16,
    pub status_text: String,
    pub url: String,
    pub method: Method,
    /// Transport-level message, if the transport produced one.
    pub message: Option<String>,
    /// Response body, parsed as JSON when possible.
    pub body: Option<Payload>,
}

/// Why no response arrived.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NetworkCause {
    Connect,
    Timeout,
    Other,
}

/// A connection-level failure.
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct NetworkFailure {
    pub cause: NetworkCause,
    pub message: String,
    pub url: Option<String>,
}

/// Category of an application runtime fault.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuntimeKind {
    /// Property access on a missing value.
    NullDereference,
    /// Use of a symbol that was never defined.
    UndefinedReference,
    /// Any other type mismatch.
    Type,
    Other,
}

/// An application runtime fault.
#[derive(Debug, Clone, Error)]
#[error("{name}: {message}")]
pub struct RuntimeFault {
    pub kind: RuntimeKind,
    pub name: String,
    pub message: String,
    pub stack: Option<String>,
}

impl HttpFailure {
    pub fn new(status: u16, status_text: impl Into<String>, method: Method, url: impl Into<String>) -> Self {
        Self {
            status,
            status_text: status_text.into(),
            url: url.into(),
            method,
            message: None,
            body: None,
        }
    }

    pub fn with_body(mut self, body: Payload) -> Self {
        self.body = Some(body);
        self
    }
}

impl NetworkFailure {
    pub fn new(cause: NetworkCause, message: impl Into<String>) -> Self {
        Self {
            cause,
            message: message.into(),
            url: None,
        }
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }
}

impl RuntimeFault {
    /// Build a fault from an error name and message, inferring its kind.
    pub fn new(name: impl Into<String>, message: impl Into<String>) -> Self {
        let name = name.into();
        let message = message.into();
        let kind = match name.as_str() {
            "ReferenceError" => RuntimeKind::UndefinedReference,
            "TypeError" if message.contains("Cannot read propert") => RuntimeKind::NullDereference,
            "TypeError" => RuntimeKind::Type,
            _ => RuntimeKind::Other,
        };
        Self {
            kind,
            name,
            message,
            stack: None,
        }
    }

    pub fn null_dereference(message: impl Into<String>) -> Self {
        Self {
            kind: RuntimeKind::NullDereference,
            ..Self::new("TypeError", message)
        }
    }

    pub fn undefined_reference(message: impl Into<String>) -> Self {
        Self::new("ReferenceError", message)
    }

    pub fn with_stack(mut self, stack: impl Into<String>) -> Self {
        self.stack = Some(stack.into());
        self
    }
}

impl RawFailure {
    /// Wrap a failure as a framework boundary would.
    pub fn wrapped(original: RawFailure, message: Option<String>) -> Self {
        RawFailure::Wrapped {
            message,
            original: Box::new(original),
        }
    }

    /// Numeric status; 0 when no response was received.
    pub fn status(&self) -> Option<u16> {
        match self {
            RawFailure::Http(h) => Some(h.status),
            RawFailure::Network(_) => Some(0),
            RawFailure::Wrapped { original, .. } => original.status(),
            RawFailure::Opaque(p) => p
                .get("status")
                .and_then(|s| s.as_number())
                .filter(|n| *n >= 0.0 && *n <= f64::from(u16::MAX))
                .map(|n| n as u16),
            RawFailure::Runtime(_) | RawFailure::Message(_) => None,
        }
    }

    /// Stack trace, when the failure carries one.
    pub fn stack(&self) -> Option<String> {
        match self {
            RawFailure::Runtime(r) => r.stack.clone(),
            RawFailure::Wrapped { original, .. } => original.stack(),
            RawFailure::Opaque(p) => p.text_field("stack"),
            _ => None,
        }
    }

    /// Request URL, when the failure came from an HTTP exchange.
    pub fn url(&self) -> Option<&str> {
        match self {
            RawFailure::Http(h) => Some(&h.url),
            RawFailure::Network(n) => n.url.as_deref(),
            RawFailure::Wrapped { original, .. } => original.url(),
            _ => None,
        }
    }
}

impl From<HttpFailure> for RawFailure {
    fn from(f: HttpFailure) -> Self {
        RawFailure::Http(f)
    }
}

impl From<NetworkFailure> for RawFailure {
    fn from(f: NetworkFailure) -> Self {
        RawFailure::Network(f)
    }
}

impl From<RuntimeFault> for RawFailure {
    fn from(f: RuntimeFault) -> Self {
        RawFailure::Runtime(f)
    }
}

impl From<Payload> for RawFailure {
    fn from(p: Payload) -> Self {
        RawFailure::Opaque(p)
    }
}
