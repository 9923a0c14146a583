//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (context.rs):
//!     Validated config → transport → health monitor → reporter → retry → client
//!     → start background monitoring
//!
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → trigger graceful shutdown
//!
//! Shutdown (shutdown.rs):
//!     Broadcast → background tasks exit → wait with deadline
//! ```
//!
//! # Design Decisions
//! - Ordered startup: config first, then core, then listeners
//! - Shutdown has a deadline: stragglers are aborted

pub mod context;
pub mod shutdown;
pub mod signals;

pub use context::{ContextError, GuardContext, GuardContextBuilder};
pub use shutdown::Shutdown;
pub use signals::shutdown_signal;
