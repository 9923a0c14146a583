//! The error funnel.
//!
//! Every terminal HTTP failure and every uncaught application fault ends up
//! in [`ErrorReporter::process`]. It never fails and never panics: the
//! failure is classified, logged, queued, and escalated on a best-effort basis.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

use chrono::Utc;
use uuid::Uuid;

use crate::config::{ApiConfig, ReporterConfig};
use crate::failure::{extract_error_message, format_error_for_logging, RawFailure, Severity};
use crate::observability::metrics;
use crate::reporting::classified::{ClassifiedError, ErrorStats, RequestContext};
use crate::reporting::escalation::{
    run_recovery_chain, EscalationError, HealthTrigger, LoggingNavigator, LoggingNotifier,
    Navigator, Notifier, Recovery,
};
use crate::reporting::queue::ErrorQueue;
use crate::resilience::classifier::{classify_severity, is_network_error};

/// Classifies, queues and escalates failures.
pub struct ErrorReporter {
    queue: ErrorQueue,
    user_agent: String,
    source_url: Option<String>,
    recovery: Vec<Recovery>,
    navigator: Arc<dyn Navigator>,
    notifier: Arc<dyn Notifier>,
    health: Option<Arc<dyn HealthTrigger>>,
}

impl ErrorReporter {
    /// Reporter with logging-only navigation and notification.
    pub fn new(config: &ReporterConfig, api: &ApiConfig) -> Self {
        let mut recovery = vec![Recovery::NavigateToErrorPage {
            route: config.error_route.clone(),
        }];
        if config.reload_on_navigation_failure {
            recovery.push(Recovery::Reload);
        }

        Self {
            queue: ErrorQueue::new(config.max_queue_size),
            user_agent: api.user_agent.clone(),
            source_url: api.source_url.clone(),
            recovery,
            navigator: Arc::new(LoggingNavigator),
            notifier: Arc::new(LoggingNotifier),
            health: None,
        }
    }

    pub fn with_navigator(mut self, navigator: Arc<dyn Navigator>) -> Self {
        self.navigator = navigator;
        self
    }

    pub fn with_notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = notifier;
        self
    }

    pub fn with_health_trigger(mut self, health: Arc<dyn HealthTrigger>) -> Self {
        self.health = Some(health);
        self
    }

    /// Record a failure. `context` names where it was reported from.
    pub fn process(&self, failure: RawFailure, context: Option<&str>) {
        self.record(failure, context, None);
    }

    /// Alias of [`process`](Self::process) for callers outside the client.
    pub fn report(&self, failure: RawFailure, context: &str) {
        self.record(failure, Some(context), None);
    }

    /// Record a failure of an outbound request, with its request details.
    pub fn process_request_failure(&self, failure: RawFailure, context: &str, request: RequestContext) {
        self.record(failure, Some(context), Some(request));
    }

    /// Oldest-first copy of the queued errors.
    pub fn queued_errors(&self) -> Vec<ClassifiedError> {
        self.queue.snapshot()
    }

    pub fn clear_queue(&self) {
        self.queue.clear();
        metrics::record_queue_depth(0);
    }

    pub fn stats(&self) -> ErrorStats {
        self.queue.stats()
    }

    pub fn queue_capacity(&self) -> usize {
        self.queue.capacity()
    }

    fn record(&self, failure: RawFailure, context: Option<&str>, request: Option<RequestContext>) {
        let error = self.classify(&failure, context, request);
        self.log(&error);
        metrics::record_error(error.severity.as_str(), error.kind.as_str());

        if let Some(evicted) = self.queue.push(error.clone()) {
            tracing::trace!(evicted_id = %evicted.id, "Error queue full, evicted oldest entry");
        }
        metrics::record_queue_depth(self.queue.len());

        if error.severity == Severity::Critical {
            run_recovery_chain(&self.recovery, self.navigator.as_ref(), &error);
        }

        if error.severity.is_user_visible() {
            guarded("notification", || self.notifier.notify(&error));
        }

        if is_network_error(&failure) {
            if let Some(health) = &self.health {
                guarded("health recheck", || {
                    health.trigger_health_check();
                    Ok(())
                });
            }
        }
    }

    fn classify(
        &self,
        failure: &RawFailure,
        context: Option<&str>,
        request: Option<RequestContext>,
    ) -> ClassifiedError {
        ClassifiedError {
            id: Uuid::new_v4(),
            message: extract_error_message(failure),
            stack: failure.stack(),
            timestamp: Utc::now(),
            source_url: self.source_url.clone(),
            user_agent: self.user_agent.clone(),
            context: context.map(str::to_string),
            status: failure.status(),
            kind: failure.kind(),
            severity: classify_severity(failure),
            request,
        }
    }

    fn log(&self, error: &ClassifiedError) {
        let line = format_error_for_logging(&error.message, error.context.as_deref());
        match error.severity {
            Severity::Critical => tracing::error!(
                error_id = %error.id,
                kind = %error.kind,
                status = ?error.status,
                stack = ?error.stack,
                "CRITICAL ERROR: {}",
                line
            ),
            Severity::High => tracing::error!(
                error_id = %error.id,
                kind = %error.kind,
                status = ?error.status,
                "HIGH SEVERITY: {}",
                line
            ),
            Severity::Medium => tracing::warn!(
                error_id = %error.id,
                kind = %error.kind,
                status = ?error.status,
                "MEDIUM SEVERITY: {}",
                line
            ),
            Severity::Low => tracing::info!(
                error_id = %error.id,
                kind = %error.kind,
                "LOW SEVERITY: {}",
                line
            ),
        }
    }
}

/// Run one side effect so that neither its error nor a panic escapes.
fn guarded<F>(name: &str, effect: F)
where
    F: FnOnce() -> Result<(), EscalationError>,
{
    match catch_unwind(AssertUnwindSafe(effect)) {
        Ok(Ok(())) => {}
        Ok(Err(e)) => tracing::error!(effect = name, error = %e, "Error side effect failed"),
        Err(_) => tracing::error!(effect = name, "Error side effect panicked"),
    }
}

impl std::fmt::Debug for ErrorReporter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ErrorReporter")
            .field("queued", &self.queue.len())
            .field("capacity", &self.queue.capacity())
            .field("recovery", &self.recovery)
            .field("health_trigger", &self.health.is_some())
            .finish()
    }
}
