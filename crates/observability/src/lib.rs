//! # Observability
//!
//! Tracing and Prometheus metrics for the odometry pipeline.
//!
//! ## Features
//!
//! - Tracing initialization (JSON/Pretty/Compact)
//! - Prometheus exporter
//! - Per-period adapter metrics and in-memory aggregation
//!
//! ## Example
//!
//! ```ignore
//! use observability::metrics;
//!
//! observability::init()?;
//!
//! let inputs = module.update_inputs();
//! metrics::record_module_inputs(module.name(), &inputs);
//! ```

pub mod metrics;

use anyhow::{Context, Result};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

pub use crate::metrics::{
    record_gyro_inputs, record_module_inputs, record_sampler_health, MetricsSummary,
    OdometryMetricsAggregator, RunningStats, StatsSummary,
};

/// Crates of the pipeline, as tracing targets
pub const ODOMETRY_TARGETS: &[&str] = &[
    "sampler",
    "drivetrain",
    "config_loader",
    "observability",
    "swerve_odometry",
];

/// Targets that log once per sampling tick
const TICK_TARGETS: &[&str] = &["sampler::queue", "drivetrain::sim"];

/// Bucket bounds for `odometry_samples_per_period`, around the usual
/// 4-5 ticks per 20 ms period
const SAMPLES_PER_PERIOD_BUCKETS: &[f64] = &[0.0, 1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 8.0, 12.0, 20.0];

/// Initialize tracing and Prometheus with defaults
///
/// - Tracing: JSON, honours RUST_LOG
/// - Prometheus: listens on 0.0.0.0:9000
pub fn init() -> Result<()> {
    init_with_config(ObservabilityConfig::default())
}

/// Filter directives used when RUST_LOG is unset
///
/// Pipeline crates log at `level`, dependencies only at `warn`. Per-tick
/// events (one per sampling tick, 250 per second) are capped at `debug`
/// unless `trace_ticks` is set.
pub fn default_directives(level: &str, trace_ticks: bool) -> String {
    let mut directives = vec!["warn".to_string()];
    directives.extend(ODOMETRY_TARGETS.iter().map(|t| format!("{t}={level}")));
    if !trace_ticks {
        directives.extend(TICK_TARGETS.iter().map(|t| format!("{t}=debug")));
    }
    directives.join(",")
}

/// RUST_LOG if set, otherwise [`default_directives`]
pub fn env_filter(level: &str, trace_ticks: bool) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directives(level, trace_ticks)))
}

/// Observability configuration
#[derive(Debug, Clone)]
pub struct ObservabilityConfig {
    pub log_format: LogFormat,
    /// Prometheus port (None = disabled)
    pub metrics_port: Option<u16>,
    /// Pipeline log level used when RUST_LOG is unset
    pub default_log_level: String,
    /// Let per-tick sampler events through at `trace`
    pub trace_ticks: bool,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_format: LogFormat::Json,
            metrics_port: Some(9000),
            default_log_level: "info".to_string(),
            trace_ticks: false,
        }
    }
}

/// Log output format
#[derive(Debug, Clone, Copy, Default)]
pub enum LogFormat {
    /// Structured JSON
    #[default]
    Json,
    /// Human readable, multi-line
    Pretty,
    /// Single line
    Compact,
}

/// Initialize with a custom configuration
pub fn init_with_config(config: ObservabilityConfig) -> Result<()> {
    let filter = env_filter(&config.default_log_level, config.trace_ticks);

    match config.log_format {
        LogFormat::Json => {
            let fmt_layer = fmt::layer()
                .json()
                .with_target(true)
                .with_thread_ids(true)
                .with_thread_names(true)
                .with_file(true)
                .with_line_number(true);

            tracing_subscriber::registry()
                .with(filter)
                .with(fmt_layer)
                .try_init()
                .context("Failed to initialize tracing subscriber")?;
        }
        LogFormat::Pretty => {
            tracing_subscriber::registry()
                .with(filter)
                .with(fmt::layer().pretty().with_thread_names(true))
                .try_init()
                .context("Failed to initialize tracing subscriber")?;
        }
        LogFormat::Compact => {
            tracing_subscriber::registry()
                .with(filter)
                .with(fmt::layer().compact())
                .try_init()
                .context("Failed to initialize tracing subscriber")?;
        }
    }

    if let Some(port) = config.metrics_port {
        init_metrics_only(port)?;
    }

    tracing::info!(
        log_format = ?config.log_format,
        metrics_port = ?config.metrics_port,
        "Observability initialized"
    );

    Ok(())
}

/// Install only the Prometheus recorder
///
/// For callers that set up tracing themselves.
pub fn init_metrics_only(port: u16) -> Result<()> {
    PrometheusBuilder::new()
        .with_http_listener(([0, 0, 0, 0], port))
        .set_buckets_for_metric(
            Matcher::Full("odometry_samples_per_period".to_string()),
            SAMPLES_PER_PERIOD_BUCKETS,
        )
        .context("Invalid histogram buckets")?
        .install()
        .context("Failed to install Prometheus recorder")?;

    tracing::info!(port = port, "Prometheus metrics endpoint initialized");
    Ok(())
}
