//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Request to backend:
//!     → retries.rs (attempt, wait fixed delay, attempt again)
//!     → On failure: classifier.rs (retryable? how severe? network-class?)
//!     → Terminal failure handed back to the guarded client
//! ```
//!
//! # Design Decisions
//! - Classification is pure and shared with the error reporter
//! - Retries only for idempotent requests unless explicitly opted in
//! - Exhaustion is a distinct error from a single permanent failure

pub mod classifier;
pub mod retries;

pub use classifier::{classify_severity, is_network_error, is_retryable};
pub use retries::{GuardError, RetryPolicy};
