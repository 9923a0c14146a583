//! Composition root.
//!
//! # Responsibilities
//! - Build every component from one validated `GuardConfig`
//! - Wire the reporter to the health monitor
//! - Own background tasks and apply hot-reloaded settings
//!
//! # Design Decisions
//! - No globals: callers hold a `GuardContext` (or clones of its parts)
//! - Only retry and health settings are reloadable; everything else is
//!   logged as requiring a restart

use std::sync::Arc;
use std::time::Duration;

use arc_swap::ArcSwap;
use thiserror::Error;
use url::Url;

use crate::config::GuardConfig;
use crate::health::HealthMonitor;
use crate::http::{GuardedClient, HyperTransport, Transport};
use crate::lifecycle::shutdown::Shutdown;
use crate::reporting::{ErrorReporter, HealthTrigger, Navigator, Notifier};
use crate::resilience::RetryPolicy;

#[derive(Debug, Error)]
pub enum ContextError {
    #[error("invalid api.base_url: {0}")]
    InvalidBaseUrl(#[from] url::ParseError),
}

/// Optional overrides for the collaborators `GuardContext` would otherwise build.
#[derive(Default)]
pub struct GuardContextBuilder {
    transport: Option<Arc<dyn Transport>>,
    navigator: Option<Arc<dyn Navigator>>,
    notifier: Option<Arc<dyn Notifier>>,
}

impl GuardContextBuilder {
    pub fn transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    pub fn navigator(mut self, navigator: Arc<dyn Navigator>) -> Self {
        self.navigator = Some(navigator);
        self
    }

    pub fn notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = Some(notifier);
        self
    }

    pub fn build(self, config: GuardConfig) -> Result<GuardContext, ContextError> {
        let base_url = Url::parse(&config.api.base_url)?;
        let transport = self.transport.unwrap_or_else(|| {
            Arc::new(HyperTransport::new(&config.timeouts, &config.api.user_agent))
        });

        let health = HealthMonitor::new(transport.clone(), base_url.clone(), config.health_check.clone());

        let mut reporter = ErrorReporter::new(&config.reporter, &config.api)
            .with_health_trigger(health.clone() as Arc<dyn HealthTrigger>);
        if let Some(navigator) = self.navigator {
            reporter = reporter.with_navigator(navigator);
        }
        if let Some(notifier) = self.notifier {
            reporter = reporter.with_notifier(notifier);
        }
        let reporter = Arc::new(reporter);

        let retry = Arc::new(RetryPolicy::new(config.retries.clone()));
        let client = GuardedClient::new(transport, retry.clone(), reporter.clone(), base_url);

        tracing::info!(
            base_url = %config.api.base_url,
            max_attempts = config.retries.max_attempts,
            delay_ms = config.retries.delay_ms,
            queue_size = config.reporter.max_queue_size,
            "Guard context initialized"
        );

        Ok(GuardContext {
            config: ArcSwap::from_pointee(config),
            health,
            reporter,
            retry,
            client,
            shutdown: Shutdown::new(),
        })
    }
}

/// Owns the health monitor, reporter, retry policy and client.
pub struct GuardContext {
    config: ArcSwap<GuardConfig>,
    health: Arc<HealthMonitor>,
    reporter: Arc<ErrorReporter>,
    retry: Arc<RetryPolicy>,
    client: GuardedClient,
    shutdown: Shutdown,
}

impl GuardContext {
    /// Build with the hyper transport and logging-only escalation.
    pub fn from_config(config: GuardConfig) -> Result<Self, ContextError> {
        Self::builder().build(config)
    }

    pub fn builder() -> GuardContextBuilder {
        GuardContextBuilder::default()
    }

    /// Spawn background tasks (periodic health monitoring).
    pub fn start(&self) {
        let handle = self.health.start_monitoring(self.shutdown.subscribe());
        self.shutdown.track(handle);
    }

    pub fn config(&self) -> Arc<GuardConfig> {
        self.config.load_full()
    }

    pub fn health(&self) -> &Arc<HealthMonitor> {
        &self.health
    }

    pub fn reporter(&self) -> &Arc<ErrorReporter> {
        &self.reporter
    }

    pub fn retry_policy(&self) -> &Arc<RetryPolicy> {
        &self.retry
    }

    pub fn client(&self) -> &GuardedClient {
        &self.client
    }

    pub fn shutdown_handle(&self) -> &Shutdown {
        &self.shutdown
    }

    /// Swap reloadable settings into the running components.
    pub fn apply_config_update(&self, new: GuardConfig) {
        let old = self.config.load_full();

        if old.retries != new.retries {
            self.retry.apply(new.retries.clone());
        }
        if old.health_check != new.health_check {
            self.health.apply(new.health_check.clone());
        }

        let restart_required = [
            ("api", old.api != new.api),
            ("timeouts", old.timeouts != new.timeouts),
            ("reporter", old.reporter != new.reporter),
            ("observability", old.observability != new.observability),
            ("admin", old.admin != new.admin),
        ];
        for (section, changed) in restart_required {
            if changed {
                tracing::warn!(section, "Configuration section changed; restart required to apply");
            }
        }

        self.config.store(Arc::new(new));
    }

    /// Stop background tasks, waiting up to `deadline`.
    pub async fn shutdown(&self, deadline: Duration) -> bool {
        tracing::info!("Shutting down guard context");
        self.shutdown.drain(deadline).await
    }
}

impl std::fmt::Debug for GuardContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GuardContext")
            .field("health", &self.health)
            .field("reporter", &self.reporter)
            .field("client", &self.client)
            .finish()
    }
}
