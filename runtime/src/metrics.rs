//! Prometheus metrics for the command pipeline.
//!
//! - Commands handled, by type and outcome
//! - Retries and lock contention
//! - Clawbacks created by earnings recalculation
//!
//! # Example
//!
//! ```rust,no_run
//! use employer_incentives_runtime::metrics::MetricsServer;
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let mut server = MetricsServer::new("0.0.0.0:9090".parse()?);
//! server.start()?;
//!
//! let body = server.render();
//! # Ok(())
//! # }
//! ```

use metrics::{describe_counter, describe_histogram};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};
use std::net::SocketAddr;
use std::time::Duration;
use thiserror::Error;

// Re-export metrics macros for use in other modules
pub use metrics::{counter, histogram};

/// Errors from metrics operations.
#[derive(Error, Debug)]
pub enum MetricsError {
    /// Failed to build metrics exporter
    #[error("Failed to build metrics exporter: {0}")]
    Build(String),
    /// Failed to install metrics exporter
    #[error("Failed to install metrics exporter: {0}")]
    Install(String),
}

/// Prometheus metrics server.
///
/// Owns the Prometheus recorder and renders the scrape body served on `addr`.
pub struct MetricsServer {
    addr: SocketAddr,
    handle: Option<PrometheusHandle>,
}

impl MetricsServer {
    /// Create a new metrics server.
    ///
    /// # Arguments
    ///
    /// * `addr` - Socket address to bind to (e.g., `0.0.0.0:9090`)
    #[must_use]
    pub const fn new(addr: SocketAddr) -> Self {
        Self { addr, handle: None }
    }

    /// Register metric descriptions and install the Prometheus recorder.
    ///
    /// The scrape body is produced by [`MetricsServer::render`]; the HTTP
    /// surface that serves it on `addr` belongs to the hosting process.
    ///
    /// # Errors
    ///
    /// Returns error if the exporter cannot be built or installed.
    ///
    /// # Note
    ///
    /// If a metrics recorder is already installed (e.g., in tests), this logs a
    /// warning and succeeds without a handle.
    pub fn start(&mut self) -> Result<(), MetricsError> {
        register_metrics();

        let builder = PrometheusBuilder::new()
            .set_buckets_for_metric(
                Matcher::Suffix("duration_seconds".to_string()),
                &[
                    0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0,
                ],
            )
            .map_err(|e| MetricsError::Build(e.to_string()))?;

        match builder.install_recorder() {
            Ok(handle) => {
                self.handle = Some(handle);
                tracing::info!(
                    addr = %self.addr,
                    "Metrics recorder installed"
                );
                Ok(())
            }
            Err(e) => {
                let err_msg = e.to_string();
                if err_msg.contains("already initialized") {
                    tracing::warn!("Metrics recorder already initialized, skipping re-initialization");
                    Ok(())
                } else {
                    Err(MetricsError::Install(err_msg))
                }
            }
        }
    }

    /// Address the scrape endpoint is served on.
    #[must_use]
    pub const fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Get the metrics handle for rendering.
    #[must_use]
    pub const fn handle(&self) -> Option<&PrometheusHandle> {
        self.handle.as_ref()
    }

    /// Render current metrics in Prometheus format.
    ///
    /// Returns `None` if server hasn't been started.
    #[must_use]
    pub fn render(&self) -> Option<String> {
        self.handle.as_ref().map(PrometheusHandle::render)
    }
}

/// Register all metric descriptions.
fn register_metrics() {
    describe_counter!(
        "command_pipeline_commands_total",
        "Total number of commands handled, by command type and outcome"
    );
    describe_histogram!(
        "command_pipeline_duration_seconds",
        "Time taken to handle a command, retries included"
    );
    describe_counter!(
        "command_pipeline_retries_total",
        "Total number of retried command attempts"
    );
    describe_counter!(
        "command_pipeline_lock_contention_total",
        "Total number of lock acquisitions that found the lock held"
    );
    describe_counter!(
        "incentive_clawbacks_created_total",
        "Total number of clawbacks created by earnings recalculation"
    );
}

/// Command pipeline metrics recorder.
pub struct PipelineMetrics;

impl PipelineMetrics {
    /// Record a handled command.
    pub fn record_command(command: &'static str, outcome: &'static str, duration: Duration) {
        counter!(
            "command_pipeline_commands_total",
            "command" => command,
            "outcome" => outcome
        )
        .increment(1);
        histogram!("command_pipeline_duration_seconds", "command" => command)
            .record(duration.as_secs_f64());
    }

    /// Record a retried attempt.
    pub fn record_retry(command: &'static str) {
        counter!("command_pipeline_retries_total", "command" => command).increment(1);
    }

    /// Record a lock found held elsewhere.
    pub fn record_lock_contention(command: &'static str) {
        counter!("command_pipeline_lock_contention_total", "command" => command).increment(1);
    }
}

/// Earnings metrics recorder.
pub struct IncentiveMetrics;

impl IncentiveMetrics {
    /// Record clawbacks created by one recalculation.
    pub fn record_clawbacks(count: usize) {
        if count > 0 {
            counter!("incentive_clawbacks_created_total").increment(count as u64);
        }
    }
}
