//! HTTP client subsystem.
//!
//! # Data Flow
//! ```text
//! Caller
//!     → request.rs (RequestDescriptor, request ID, retry opt-in)
//!     → client.rs (GuardedClient: retries, reporting)
//!     → transport.rs (one attempt over hyper, failures as RawFailure)
//!     → response.rs (collected 2xx response)
//!     → Caller
//! ```

pub mod client;
pub mod request;
pub mod response;
pub mod transport;

pub use client::{GuardedClient, HTTP_CLIENT_CONTEXT};
pub use request::{RequestDescriptor, X_REQUEST_ID, X_RETRY_SAFE};
pub use response::Response;
pub use transport::{HyperTransport, Transport};
