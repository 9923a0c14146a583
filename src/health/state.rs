//! Backend health snapshot.
//!
//! # Lifecycle
//! ```text
//! Monitor constructed → optimistic online status
//! Probe completes     → status replaced wholesale
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Latest known reachability of the backend API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthStatus {
    pub is_online: bool,
    pub last_checked: DateTime<Utc>,
    /// Round-trip time of the last successful probe.
    pub response_time_ms: Option<u64>,
    /// Reason the last probe failed.
    pub error: Option<String>,
}

impl HealthStatus {
    pub fn online(response_time_ms: u64) -> Self {
        Self {
            is_online: true,
            last_checked: Utc::now(),
            response_time_ms: Some(response_time_ms),
            error: None,
        }
    }

    pub fn offline(reason: impl Into<String>) -> Self {
        Self {
            is_online: false,
            last_checked: Utc::now(),
            response_time_ms: None,
            error: Some(reason.into()),
        }
    }
}

impl Default for HealthStatus {
    /// Assume online until the first probe says otherwise.
    fn default() -> Self {
        Self {
            is_online: true,
            last_checked: Utc::now(),
            response_time_ms: None,
            error: None,
        }
    }
}
