//! Active health checking.
//!
//! # Responsibilities
//! - Probe the backend health endpoint on a fixed interval
//! - Run out-of-band rechecks when the error reporter sees network failures
//! - Publish the latest `HealthStatus` to subscribers

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;

use arc_swap::ArcSwap;
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;
use tokio::time::{self, Instant};
use url::Url;

use crate::config::HealthCheckConfig;
use crate::failure::{extract_error_message, NetworkCause, RawFailure};
use crate::health::state::HealthStatus;
use crate::http::{RequestDescriptor, Transport};
use crate::observability::metrics;
use crate::reporting::HealthTrigger;

pub struct HealthMonitor {
    this: Weak<HealthMonitor>,
    transport: Arc<dyn Transport>,
    base_url: Url,
    config: ArcSwap<HealthCheckConfig>,
    status: watch::Sender<HealthStatus>,
    in_flight: AtomicBool,
    issued: AtomicU64,
    published: AtomicU64,
}

/// Clears the in-flight flag even if the probe task is cancelled.
struct InFlight<'a>(&'a AtomicBool);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl HealthMonitor {
    pub fn new(transport: Arc<dyn Transport>, base_url: Url, config: HealthCheckConfig) -> Arc<Self> {
        let (status, _) = watch::channel(HealthStatus::default());
        Arc::new_cyclic(|this| Self {
            this: this.clone(),
            transport,
            base_url,
            config: ArcSwap::from_pointee(config),
            status,
            in_flight: AtomicBool::new(false),
            issued: AtomicU64::new(0),
            published: AtomicU64::new(0),
        })
    }

    /// Probe the health endpoint now. Never fails; the outcome is published.
    pub async fn check_health(&self) -> bool {
        let seq = self.issued.fetch_add(1, Ordering::AcqRel) + 1;
        let config = self.config.load_full();
        let timeout = Duration::from_millis(config.timeout_ms);

        let (status, elapsed) = match self.resolve(&config.path) {
            Ok(url) => {
                let (status, elapsed) = self.probe(RequestDescriptor::get(url), timeout).await;
                (status, Some(elapsed))
            }
            Err(e) => (
                HealthStatus::offline(format!("Invalid health check URL: {}", e)),
                None,
            ),
        };

        let online = status.is_online;
        self.publish(seq, status, elapsed);
        online
    }

    /// HEAD probe of an arbitrary endpoint. Absolute URLs are used as-is.
    /// Does not touch the published status.
    pub async fn check_endpoint(&self, endpoint: &str) -> bool {
        let url = if endpoint.starts_with("http://") || endpoint.starts_with("https://") {
            Url::parse(endpoint)
        } else {
            self.resolve(endpoint)
        };
        let url = match url {
            Ok(url) => url,
            Err(e) => {
                tracing::warn!(endpoint = %endpoint, error = %e, "Invalid endpoint URL");
                return false;
            }
        };

        let timeout = Duration::from_millis(self.config.load().timeout_ms);
        self.probe(RequestDescriptor::head(url), timeout).await.0.is_online
    }

    /// Spawn the periodic probe loop: one check immediately, then one per interval.
    ///
    /// `enabled` is read on every tick, so a disabled monitor idles until a
    /// config update turns it back on.
    pub fn start_monitoring(&self, mut shutdown: broadcast::Receiver<()>) -> JoinHandle<()> {
        let this = self.this.clone();
        tokio::spawn(async move {
            let Some(monitor) = this.upgrade() else {
                return;
            };
            let mut was_enabled = None;

            loop {
                let config = monitor.config.load_full();
                if was_enabled != Some(config.enabled) {
                    if config.enabled {
                        tracing::info!(
                            interval_ms = config.interval_ms,
                            path = %config.path,
                            base_url = %monitor.base_url,
                            "Health monitor starting"
                        );
                    } else {
                        tracing::info!("Active health checks disabled");
                    }
                    was_enabled = Some(config.enabled);
                }
                let enabled = config.enabled;
                drop(config);

                if enabled {
                    monitor.background_check().await;
                }

                let interval = Duration::from_millis(monitor.config.load().interval_ms);
                tokio::select! {
                    _ = time::sleep(interval) => {}
                    _ = shutdown.recv() => {
                        tracing::info!("Health monitor received shutdown signal, exiting loop");
                        break;
                    }
                }
            }
        })
    }

    /// Fire-and-forget recheck on the current runtime.
    pub fn trigger_health_check(&self) {
        let Ok(handle) = tokio::runtime::Handle::try_current() else {
            tracing::debug!("No runtime available, health recheck skipped");
            return;
        };
        let this = self.this.clone();
        handle.spawn(async move {
            if let Some(monitor) = this.upgrade() {
                monitor.background_check().await;
            }
        });
    }

    pub fn current_status(&self) -> HealthStatus {
        self.status.borrow().clone()
    }

    pub fn is_backend_online(&self) -> bool {
        self.status.borrow().is_online
    }

    pub fn subscribe(&self) -> watch::Receiver<HealthStatus> {
        self.status.subscribe()
    }

    /// Takes effect after the current wait.
    pub fn set_health_check_interval(&self, interval: Duration) {
        let interval_ms = duration_ms(interval);
        self.config.rcu(|current| HealthCheckConfig {
            interval_ms,
            ..(**current).clone()
        });
    }

    /// Takes effect on the next probe.
    pub fn set_health_check_timeout(&self, timeout: Duration) {
        let timeout_ms = duration_ms(timeout);
        self.config.rcu(|current| HealthCheckConfig {
            timeout_ms,
            ..(**current).clone()
        });
    }

    pub fn config(&self) -> Arc<HealthCheckConfig> {
        self.config.load_full()
    }

    /// Replace the health check configuration.
    pub fn apply(&self, config: HealthCheckConfig) {
        tracing::info!(
            interval_ms = config.interval_ms,
            timeout_ms = config.timeout_ms,
            path = %config.path,
            "Health check configuration updated"
        );
        self.config.store(Arc::new(config));
    }

    async fn background_check(&self) {
        if self
            .in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            tracing::debug!("Health probe already in flight, skipping");
            return;
        }
        let _guard = InFlight(&self.in_flight);
        self.check_health().await;
    }

    fn resolve(&self, path: &str) -> Result<Url, url::ParseError> {
        let base = self.base_url.as_str().trim_end_matches('/');
        if path.starts_with('/') {
            Url::parse(&format!("{}{}", base, path))
        } else {
            Url::parse(&format!("{}/{}", base, path))
        }
    }

    /// Returns the status together with the measured round trip, which is
    /// the full wait for failed and timed-out probes.
    async fn probe(&self, request: RequestDescriptor, timeout: Duration) -> (HealthStatus, Duration) {
        let start = Instant::now();
        let url = request.url.to_string();
        let outcome = time::timeout(timeout, self.transport.send(&request)).await;
        let elapsed = start.elapsed();

        let status = match outcome {
            Ok(Ok(_)) => HealthStatus::online(u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX)),
            Ok(Err(failure)) => HealthStatus::offline(offline_reason(&failure)),
            Err(_) => HealthStatus::offline("Request timeout"),
        };

        if let Some(reason) = &status.error {
            tracing::warn!(url = %url, reason = %reason, "Health check failed");
        } else {
            tracing::debug!(url = %url, elapsed_ms = ?status.response_time_ms, "Health check passed");
        }
        (status, elapsed)
    }

    /// Publish unless a later-issued probe already has.
    fn publish(&self, seq: u64, status: HealthStatus, elapsed: Option<Duration>) {
        let online = status.is_online;

        let published = self.status.send_if_modified(|current| {
            if self.published.load(Ordering::Acquire) > seq {
                return false;
            }
            self.published.store(seq, Ordering::Release);
            if current.is_online != status.is_online {
                if status.is_online {
                    tracing::info!("Backend is back online");
                } else {
                    tracing::warn!(reason = ?status.error, "Backend went offline");
                }
            }
            *current = status;
            true
        });

        if published {
            metrics::record_backend_online(online);
            if let Some(elapsed) = elapsed {
                metrics::record_health_probe(elapsed);
            }
        } else {
            tracing::debug!(seq, "Discarding stale health probe result");
        }
    }
}

impl HealthTrigger for HealthMonitor {
    fn trigger_health_check(&self) {
        HealthMonitor::trigger_health_check(self);
    }
}

impl std::fmt::Debug for HealthMonitor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HealthMonitor")
            .field("base_url", &self.base_url.as_str())
            .field("config", &*self.config.load_full())
            .field("status", &*self.status.borrow())
            .finish()
    }
}

fn offline_reason(failure: &RawFailure) -> String {
    match failure {
        RawFailure::Network(n) if n.cause == NetworkCause::Timeout => "Request timeout".to_string(),
        RawFailure::Network(_) => "Network connection failed".to_string(),
        other => match other.status() {
            Some(0) => "Network connection failed".to_string(),
            Some(s) if s >= 500 => "Server error".to_string(),
            Some(404) => "Health endpoint not found".to_string(),
            _ => extract_error_message(other),
        },
    }
}

fn duration_ms(d: Duration) -> u64 {
    u64::try_from(d.as_millis()).unwrap_or(u64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::failure::{HttpFailure, NetworkFailure};
    use crate::http::Response;
    use async_trait::async_trait;
    use http::{Method, StatusCode};
    use std::collections::VecDeque;
    use std::sync::atomic::AtomicUsize;
    use std::sync::Mutex;

    /// Replies from a script of (delay, status); status 0 is a refused connection.
    #[derive(Default)]
    struct ScriptedTransport {
        script: Mutex<VecDeque<(Duration, u16)>>,
        calls: AtomicUsize,
        methods: Mutex<Vec<Method>>,
    }

    impl ScriptedTransport {
        fn new(script: &[(u64, u16)]) -> Arc<Self> {
            Arc::new(Self {
                script: Mutex::new(
                    script
                        .iter()
                        .map(|(ms, status)| (Duration::from_millis(*ms), *status))
                        .collect(),
                ),
                ..Default::default()
            })
        }
    }

    #[async_trait]
    impl Transport for ScriptedTransport {
        async fn send(&self, request: &RequestDescriptor) -> Result<Response, RawFailure> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.methods.lock().unwrap().push(request.method.clone());
            let (delay, status) = self
                .script
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or((Duration::ZERO, 200));
            time::sleep(delay).await;

            match status {
                0 => Err(NetworkFailure::new(NetworkCause::Connect, "connection refused").into()),
                s if (200..300).contains(&s) => Ok(Response::new(StatusCode::from_u16(s).unwrap(), "ok")),
                s => Err(HttpFailure::new(s, "", request.method.clone(), request.url.as_str()).into()),
            }
        }
    }

    fn monitor(transport: Arc<ScriptedTransport>) -> Arc<HealthMonitor> {
        HealthMonitor::new(
            transport,
            Url::parse("http://localhost:8787").unwrap(),
            HealthCheckConfig::default(),
        )
    }

    #[tokio::test]
    async fn test_healthy_backend() {
        let monitor = monitor(ScriptedTransport::new(&[(0, 200)]));
        assert!(monitor.check_health().await);

        let status = monitor.current_status();
        assert!(status.is_online);
        assert!(status.response_time_ms.is_some());
        assert!(status.error.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_marks_offline() {
        let monitor = monitor(ScriptedTransport::new(&[(10_000, 200)]));
        monitor.set_health_check_timeout(Duration::from_millis(50));

        assert!(!monitor.check_health().await);
        let status = monitor.current_status();
        assert!(!status.is_online);
        assert_eq!(status.error.as_deref(), Some("Request timeout"));
    }

    #[tokio::test]
    async fn test_offline_reasons() {
        let transport = ScriptedTransport::new(&[(0, 0), (0, 503), (0, 404)]);
        let monitor = monitor(transport);

        let mut reasons = Vec::new();
        for _ in 0..3 {
            assert!(!monitor.check_health().await);
            reasons.push(monitor.current_status().error.unwrap());
        }
        assert_eq!(
            reasons,
            vec!["Network connection failed", "Server error", "Health endpoint not found"]
        );
        assert!(!monitor.is_backend_online());
    }

    #[tokio::test(start_paused = true)]
    async fn test_stale_probe_does_not_overwrite() {
        let monitor = monitor(ScriptedTransport::new(&[(500, 503), (0, 200)]));

        let slow = tokio::spawn({
            let monitor = monitor.clone();
            async move { monitor.check_health().await }
        });
        tokio::task::yield_now().await;

        assert!(monitor.check_health().await);
        assert!(!slow.await.unwrap());
        assert!(monitor.is_backend_online());
    }

    #[tokio::test(start_paused = true)]
    async fn test_triggers_skip_while_in_flight() {
        let transport = ScriptedTransport::new(&[(200, 200), (200, 200)]);
        let monitor = monitor(transport.clone());

        monitor.trigger_health_check();
        monitor.trigger_health_check();
        time::sleep(Duration::from_millis(500)).await;

        assert_eq!(transport.calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_trigger_outside_runtime_is_noop() {
        let transport = ScriptedTransport::new(&[]);
        let monitor = monitor(transport.clone());
        monitor.trigger_health_check();
        assert_eq!(transport.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_check_endpoint_uses_head() {
        let transport = ScriptedTransport::new(&[(0, 200), (0, 500)]);
        let monitor = monitor(transport.clone());

        assert!(monitor.check_endpoint("/api/reports").await);
        assert!(!monitor.check_endpoint("http://localhost:9999/ping").await);
        assert_eq!(*transport.methods.lock().unwrap(), vec![Method::HEAD, Method::HEAD]);
        assert!(monitor.is_backend_online());
    }

    #[tokio::test(start_paused = true)]
    async fn test_monitoring_loop_stops_on_shutdown() {
        let transport = ScriptedTransport::new(&[]);
        let monitor = monitor(transport.clone());
        monitor.set_health_check_interval(Duration::from_millis(100));

        let (tx, rx) = broadcast::channel(1);
        let handle = monitor.start_monitoring(rx);
        time::sleep(Duration::from_millis(350)).await;
        tx.send(()).unwrap();
        handle.await.unwrap();

        assert_eq!(transport.calls.load(Ordering::SeqCst), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn test_enabled_toggle_applies_without_restart() {
        let transport = ScriptedTransport::new(&[]);
        let monitor = HealthMonitor::new(
            transport.clone(),
            Url::parse("http://localhost:8787").unwrap(),
            HealthCheckConfig {
                enabled: false,
                interval_ms: 100,
                ..HealthCheckConfig::default()
            },
        );

        let (tx, rx) = broadcast::channel(1);
        let handle = monitor.start_monitoring(rx);
        time::sleep(Duration::from_millis(350)).await;
        assert_eq!(transport.calls.load(Ordering::SeqCst), 0);

        monitor.apply(HealthCheckConfig {
            enabled: true,
            interval_ms: 100,
            ..HealthCheckConfig::default()
        });
        time::sleep(Duration::from_millis(230)).await;
        assert!(transport.calls.load(Ordering::SeqCst) >= 2);

        monitor.apply(HealthCheckConfig {
            enabled: false,
            interval_ms: 100,
            ..HealthCheckConfig::default()
        });
        let calls = transport.calls.load(Ordering::SeqCst);
        time::sleep(Duration::from_millis(500)).await;
        assert_eq!(transport.calls.load(Ordering::SeqCst), calls);

        tx.send(()).unwrap();
        handle.await.unwrap();
    }

    #[test]
    fn test_failed_check_records_measured_latency() {
        let recorder = metrics_exporter_prometheus::PrometheusBuilder::new().build_recorder();
        let handle = recorder.handle();
        let monitor = monitor(ScriptedTransport::new(&[(250, 503)]));

        let online = ::metrics::with_local_recorder(&recorder, || {
            tokio::runtime::Builder::new_current_thread()
                .enable_time()
                .start_paused(true)
                .build()
                .unwrap()
                .block_on(monitor.check_health())
        });
        assert!(!online);

        let rendered = handle.render();
        let sum: f64 = rendered
            .lines()
            .find(|line| line.starts_with("guard_health_probe_seconds_sum"))
            .and_then(|line| line.split_whitespace().last())
            .unwrap()
            .parse()
            .unwrap();
        assert!(sum >= 0.25, "recorded {}", sum);
        assert!(rendered.contains("guard_backend_online 0"));
    }
}
