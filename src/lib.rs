//! Backend Guard: a resilience layer for calls to a backend API.
//!
//! Retries transient failures, watches backend health, and funnels every
//! terminal failure into a bounded, classified error queue.

pub mod admin;
pub mod config;
pub mod failure;
pub mod health;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod reporting;
pub mod resilience;

pub use config::schema::GuardConfig;
pub use failure::{ErrorKind, RawFailure, Severity};
pub use health::{HealthMonitor, HealthStatus};
pub use http::{GuardedClient, RequestDescriptor, Response};
pub use lifecycle::{GuardContext, Shutdown};
pub use reporting::{ClassifiedError, ErrorReporter};
pub use resilience::{GuardError, RetryPolicy};
