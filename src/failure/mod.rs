//! Failure taxonomy and normalization.
//!
//! # Data Flow
//! ```text
//! Transport / application code
//!     → raw.rs (RawFailure: closed set of failure shapes)
//!     → taxonomy.rs (ErrorKind, Severity)
//!     → message.rs (displayable message, log line)
//!     → payload.rs (opaque bodies, cycle-safe rendering)
//! ```
//!
//! # Design Decisions
//! - Failures are classified by variant, never by probing arbitrary fields
//! - Only `Opaque` payloads are inspected field by field
//! - Rendering a payload always terminates, even on self-referencing objects

pub mod message;
pub mod payload;
pub mod raw;
pub mod taxonomy;

pub use message::{extract_error_message, format_error_for_logging};
pub use payload::{sanitize_object, Payload, PayloadObject, CIRCULAR_MARKER};
pub use raw::{HttpFailure, NetworkCause, NetworkFailure, RawFailure, RuntimeFault, RuntimeKind};
pub use taxonomy::{ErrorKind, Severity};
