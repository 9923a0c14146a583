//! Backend health subsystem.
//!
//! # Data Flow
//! ```text
//! Periodic timer / reporter trigger / explicit call
//!     → active.rs (probe GET {base_url}{path})
//!     → state.rs (HealthStatus)
//!     → watch channel (subscribers, admin API)
//! ```
//!
//! # Design Decisions
//! - A single backend; status is online/offline with the reason
//! - Background probes never overlap; explicit probes always run
//! - The newest probe wins; a slow stale probe cannot overwrite it

pub mod active;
pub mod state;

pub use active::HealthMonitor;
pub use state::HealthStatus;
