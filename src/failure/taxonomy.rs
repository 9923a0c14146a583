//! Error kinds and severities.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::failure::raw::RawFailure;

/// Shape-level category of a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorKind {
    Network,
    Http,
    Application,
    Framework,
    Unknown,
}

impl ErrorKind {
    pub const ALL: [ErrorKind; 5] = [
        ErrorKind::Network,
        ErrorKind::Http,
        ErrorKind::Application,
        ErrorKind::Framework,
        ErrorKind::Unknown,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Network => "network",
            ErrorKind::Http => "http",
            ErrorKind::Application => "application",
            ErrorKind::Framework => "framework",
            ErrorKind::Unknown => "unknown",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Coarse ranking deciding log level and escalation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

impl Severity {
    pub const ALL: [Severity; 4] = [
        Severity::Low,
        Severity::Medium,
        Severity::High,
        Severity::Critical,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Low => "low",
            Severity::Medium => "medium",
            Severity::High => "high",
            Severity::Critical => "critical",
        }
    }

    /// High and critical failures are surfaced to the user.
    pub fn is_user_visible(&self) -> bool {
        *self >= Severity::High
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl RawFailure {
    /// Category of this failure's shape.
    pub fn kind(&self) -> ErrorKind {
        match self {
            RawFailure::Http(_) => ErrorKind::Http,
            RawFailure::Network(_) => ErrorKind::Network,
            RawFailure::Runtime(_) => ErrorKind::Application,
            RawFailure::Wrapped { .. } => ErrorKind::Framework,
            RawFailure::Message(_) | RawFailure::Opaque(_) => ErrorKind::Unknown,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::failure::{NetworkCause, NetworkFailure, RuntimeFault};

    #[test]
    fn test_kind_by_shape() {
        let net: RawFailure = NetworkFailure::new(NetworkCause::Timeout, "timed out").into();
        assert_eq!(net.kind(), ErrorKind::Network);

        let rt: RawFailure = RuntimeFault::new("TypeError", "boom").into();
        assert_eq!(rt.kind(), ErrorKind::Application);
        assert_eq!(RawFailure::wrapped(rt, None).kind(), ErrorKind::Framework);
        assert_eq!(RawFailure::Message("x".into()).kind(), ErrorKind::Unknown);
    }

    #[test]
    fn test_severity_ordering() {
        assert!(Severity::Critical > Severity::High);
        assert!(Severity::High.is_user_visible());
        assert!(!Severity::Medium.is_user_visible());
        assert_eq!(serde_json::to_string(&Severity::High).unwrap(), "\"high\"");
    }
}
