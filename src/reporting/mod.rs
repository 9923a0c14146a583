//! Error reporting subsystem.
//!
//! # Data Flow
//! ```text
//! RawFailure (+ context, + request details)
//!     → reporter.rs (classify, log, count)
//!     → queue.rs (bounded FIFO, oldest evicted first)
//!     → escalation.rs (notify, recover, recheck backend health)
//! ```
//!
//! # Design Decisions
//! - Reporting never fails the caller
//! - Side effects are isolated from one another
//! - Queue contents are exposed only as snapshots

pub mod classified;
pub mod escalation;
pub mod queue;
pub mod reporter;

pub use classified::{ClassifiedError, ErrorStats, KindCounts, RequestContext, SeverityCounts};
pub use escalation::{
    error_page_location, run_recovery_chain, EscalationError, HealthTrigger, LoggingNavigator,
    LoggingNotifier, Navigator, Notifier, Recovery,
};
pub use queue::ErrorQueue;
pub use reporter::ErrorReporter;
