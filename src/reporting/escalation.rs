//! Escalation side effects.
//!
//! # Responsibilities
//! - Define the seams to the outside world: navigation, notification,
//!   health recheck
//! - Run the critical-error recovery chain in order until one strategy works
//!
//! # Design Decisions
//! - Each strategy is attempted with its own guard; a failure is logged and
//!   the next strategy runs
//! - Default implementations only log, so the reporter works headless

use std::panic::{catch_unwind, AssertUnwindSafe};

use thiserror::Error;

use crate::reporting::classified::ClassifiedError;

/// Failure of one escalation side effect.
#[derive(Debug, Clone, Error)]
pub enum EscalationError {
    #[error("navigation to {route} failed: {reason}")]
    Navigation { route: String, reason: String },

    #[error("reload failed: {0}")]
    Reload(String),

    #[error("notification failed: {0}")]
    Notification(String),
}

/// Moves the user to another view.
pub trait Navigator: Send + Sync {
    /// Navigate to `location` (route plus encoded query string).
    fn navigate(&self, location: &str) -> Result<(), EscalationError>;

    /// Fully reload the current view.
    fn reload(&self) -> Result<(), EscalationError>;
}

/// Shows a user-visible notification.
pub trait Notifier: Send + Sync {
    fn notify(&self, error: &ClassifiedError) -> Result<(), EscalationError>;
}

/// Requests an out-of-band backend health check.
pub trait HealthTrigger: Send + Sync {
    fn trigger_health_check(&self);
}

/// One step of the critical-error recovery chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Recovery {
    /// Send the user to the error page with message and timestamp.
    NavigateToErrorPage { route: String },
    /// Reload the current view.
    Reload,
}

impl Recovery {
    fn attempt(&self, navigator: &dyn Navigator, error: &ClassifiedError) -> Result<(), EscalationError> {
        match self {
            Recovery::NavigateToErrorPage { route } => {
                navigator.navigate(&error_page_location(route, error))
            }
            Recovery::Reload => navigator.reload(),
        }
    }
}

/// `route?message=...&timestamp=...` with an RFC 3339 timestamp.
pub fn error_page_location(route: &str, error: &ClassifiedError) -> String {
    let query = url::form_urlencoded::Serializer::new(String::new())
        .append_pair("message", &error.message)
        .append_pair("timestamp", &error.timestamp.to_rfc3339())
        .finish();
    format!("{}?{}", route, query)
}

/// Attempt each strategy in order; returns the one that succeeded.
pub fn run_recovery_chain<'a>(
    chain: &'a [Recovery],
    navigator: &dyn Navigator,
    error: &ClassifiedError,
) -> Option<&'a Recovery> {
    for strategy in chain {
        match catch_unwind(AssertUnwindSafe(|| strategy.attempt(navigator, error))) {
            Ok(Ok(())) => {
                tracing::info!(strategy = ?strategy, error_id = %error.id, "Recovery strategy applied");
                return Some(strategy);
            }
            Ok(Err(e)) => {
                tracing::error!(strategy = ?strategy, error = %e, "Recovery strategy failed");
            }
            Err(_) => {
                tracing::error!(strategy = ?strategy, "Recovery strategy panicked");
            }
        }
    }
    tracing::error!(error_id = %error.id, "All recovery strategies failed");
    None
}

/// Navigator that records the intended navigation in the log.
#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingNavigator;

impl Navigator for LoggingNavigator {
    fn navigate(&self, location: &str) -> Result<(), EscalationError> {
        tracing::warn!(location = %location, "Navigating to error page");
        Ok(())
    }

    fn reload(&self) -> Result<(), EscalationError> {
        tracing::warn!("Reloading current view");
        Ok(())
    }
}

/// Notifier that records the notification in the log.
#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingNotifier;

impl Notifier for LoggingNotifier {
    fn notify(&self, error: &ClassifiedError) -> Result<(), EscalationError> {
        tracing::warn!(
            error_id = %error.id,
            severity = %error.severity,
            message = %error.message,
            "User notification"
        );
        Ok(())
    }
}
