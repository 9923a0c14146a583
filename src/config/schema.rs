//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the guard.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

/// Environment variable overriding `api.base_url`.
pub const API_URL_ENV: &str = "BACKEND_GUARD_API_URL";

/// Default backend API base URL.
pub const DEFAULT_BASE_URL: &str = "http://localhost:8787";

/// Root configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq)]
#[serde(default)]
pub struct GuardConfig {
    /// Backend API location and client identity.
    pub api: ApiConfig,

    /// Retry configuration.
    pub retries: RetryConfig,

    /// Health check settings.
    pub health_check: HealthCheckConfig,

    /// Transport timeouts.
    pub timeouts: TimeoutConfig,

    /// Error reporter settings.
    pub reporter: ReporterConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,

    /// Admin API settings.
    pub admin: AdminConfig,
}

impl GuardConfig {
    /// Apply overrides from the process environment.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(url) = std::env::var(API_URL_ENV) {
            if !url.trim().is_empty() {
                self.api.base_url = url.trim().to_string();
            }
        }
    }
}

/// Backend API configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct ApiConfig {
    /// Base URL of the backend API.
    pub base_url: String,

    /// User agent sent with every request and recorded on reported errors.
    pub user_agent: String,

    /// Location reported as the error source (the page or view that failed).
    pub source_url: Option<String>,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            user_agent: format!("backend-guard/{}", env!("CARGO_PKG_VERSION")),
            source_url: None,
        }
    }
}

/// Retry configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct RetryConfig {
    /// Total attempts per request, including the first.
    pub max_attempts: u32,

    /// Fixed delay between attempts in milliseconds.
    pub delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            delay_ms: 1000,
        }
    }
}

/// Health check configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct HealthCheckConfig {
    /// Run periodic health checks.
    pub enabled: bool,

    /// Path probed relative to the API base URL.
    pub path: String,

    /// Health check interval in milliseconds.
    pub interval_ms: u64,

    /// Health check timeout in milliseconds.
    pub timeout_ms: u64,
}

impl Default for HealthCheckConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            path: "/health".to_string(),
            interval_ms: 30_000,
            timeout_ms: 5_000,
        }
    }
}

/// Transport timeout configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Connection establishment timeout in milliseconds.
    pub connect_ms: u64,

    /// Per-attempt request timeout in milliseconds.
    pub request_ms: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            connect_ms: 5_000,
            request_ms: 30_000,
        }
    }
}

/// Error reporter configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct ReporterConfig {
    /// Maximum number of queued errors (oldest evicted first).
    pub max_queue_size: usize,

    /// Route the user is sent to on a critical error.
    pub error_route: String,

    /// Fall back to a full reload when navigation fails.
    pub reload_on_navigation_failure: bool,
}

impl Default for ReporterConfig {
    fn default() -> Self {
        Self {
            max_queue_size: 50,
            error_route: "/error".to_string(),
            reload_on_navigation_failure: true,
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: true,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

/// Admin API configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct AdminConfig {
    /// Enable the admin API.
    pub enabled: bool,

    /// API key for authentication (Bearer token).
    pub api_key: String,

    /// Admin API bind address.
    pub bind_address: String,
}

impl Default for AdminConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            // WARNING: This is a placeholder! Change this in production.
            api_key: "CHANGE_ME_IN_PRODUCTION".to_string(),
            bind_address: "127.0.0.1:8081".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = GuardConfig::default();
        assert_eq!(config.api.base_url, "http://localhost:8787");
        assert_eq!(config.retries.max_attempts, 3);
        assert_eq!(config.retries.delay_ms, 1000);
        assert_eq!(config.health_check.interval_ms, 30_000);
        assert_eq!(config.health_check.timeout_ms, 5_000);
        assert_eq!(config.reporter.max_queue_size, 50);
    }

    #[test]
    fn test_partial_toml() {
        let config: GuardConfig = toml::from_str(
            r#"
            [retries]
            max_attempts = 5

            [health_check]
            interval_ms = 1000
            "#,
        )
        .unwrap();
        assert_eq!(config.retries.max_attempts, 5);
        assert_eq!(config.retries.delay_ms, 1000);
        assert_eq!(config.health_check.interval_ms, 1000);
        assert_eq!(config.health_check.path, "/health");
    }
}
