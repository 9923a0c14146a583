//! Classified error records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::failure::{ErrorKind, Severity};

/// Request details attached to a failure reported by the HTTP client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequestContext {
    pub request_id: Uuid,
    pub method: String,
    pub url: String,
    /// Request headers, with credentials redacted.
    pub headers: Vec<(String, String)>,
    pub timestamp: DateTime<Utc>,
    pub is_network_error: bool,
}

/// A normalized, immutable error record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassifiedError {
    pub id: Uuid,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stack: Option<String>,
    pub timestamp: DateTime<Utc>,
    pub source_url: Option<String>,
    pub user_agent: String,
    /// Where the error was reported from (e.g. `http_client`).
    pub context: Option<String>,
    /// HTTP status, 0 for network failures.
    pub status: Option<u16>,
    pub kind: ErrorKind,
    pub severity: Severity,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request: Option<RequestContext>,
}

/// Per-severity counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeverityCounts {
    pub low: usize,
    pub medium: usize,
    pub high: usize,
    pub critical: usize,
}

/// Per-kind counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct KindCounts {
    pub network: usize,
    pub http: usize,
    pub application: usize,
    pub framework: usize,
    pub unknown: usize,
}

/// Counts over the current queue contents.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorStats {
    pub total: usize,
    pub by_severity: SeverityCounts,
    pub by_kind: KindCounts,
}

impl ErrorStats {
    /// Fold one error into the counts.
    pub fn record(&mut self, error: &ClassifiedError) {
        self.total += 1;
        match error.severity {
            Severity::Low => self.by_severity.low += 1,
            Severity::Medium => self.by_severity.medium += 1,
            Severity::High => self.by_severity.high += 1,
            Severity::Critical => self.by_severity.critical += 1,
        }
        match error.kind {
            ErrorKind::Network => self.by_kind.network += 1,
            ErrorKind::Http => self.by_kind.http += 1,
            ErrorKind::Application => self.by_kind.application += 1,
            ErrorKind::Framework => self.by_kind.framework += 1,
            ErrorKind::Unknown => self.by_kind.unknown += 1,
        }
    }

    pub fn severity(&self, severity: Severity) -> usize {
        match severity {
            Severity::Low => self.by_severity.low,
            Severity::Medium => self.by_severity.medium,
            Severity::High => self.by_severity.high,
            Severity::Critical => self.by_severity.critical,
        }
    }

    pub fn kind(&self, kind: ErrorKind) -> usize {
        match kind {
            ErrorKind::Network => self.by_kind.network,
            ErrorKind::Http => self.by_kind.http,
            ErrorKind::Application => self.by_kind.application,
            ErrorKind::Framework => self.by_kind.framework,
            ErrorKind::Unknown => self.by_kind.unknown,
        }
    }
}
