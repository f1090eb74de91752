//! Odometry metrics
//!
//! Recording helpers called once per period by the adapters, plus an
//! in-memory aggregator for end-of-run summaries.

use std::collections::BTreeMap;

use contracts::{GyroInputs, ModuleInputs};
use metrics::{counter, gauge, histogram};

/// Adapter label used for the heading sensor
pub const GYRO_ADAPTER: &str = "gyro";

/// Record one period of a module adapter
pub fn record_module_inputs(module: &str, inputs: &ModuleInputs) {
    record_period(module, inputs.odometry.len(), inputs.unmatched_samples);

    if let Some(timestamp) = inputs.latest_timestamp() {
        gauge!("odometry_latest_sample_seconds", "adapter" => module.to_string()).set(timestamp);
    }
    gauge!("odometry_turn_aligned", "module" => module.to_string())
        .set(if inputs.turn_aligned { 1.0 } else { 0.0 });
}

/// Record one period of the heading adapter
pub fn record_gyro_inputs(inputs: &GyroInputs) {
    record_period(
        GYRO_ADAPTER,
        inputs.odometry.len(),
        inputs.unmatched_samples,
    );

    if let Some(timestamp) = inputs.latest_timestamp() {
        gauge!("odometry_latest_sample_seconds", "adapter" => GYRO_ADAPTER).set(timestamp);
    }
    gauge!("odometry_gyro_connected").set(if inputs.connected { 1.0 } else { 0.0 });
}

fn record_period(adapter: &str, samples: usize, unmatched: usize) {
    histogram!("odometry_samples_per_period", "adapter" => adapter.to_string())
        .record(samples as f64);

    if samples == 0 {
        counter!("odometry_empty_periods_total", "adapter" => adapter.to_string()).increment(1);
    }
    if unmatched > 0 {
        counter!(
            "odometry_unmatched_samples_total",
            "adapter" => adapter.to_string()
        )
        .increment(unmatched as u64);
    }
}

/// Record sampler thread health
pub fn record_sampler_health(ticks: u64, failure_rate: f64, last_tick_us: u64) {
    gauge!("odometry_sampler_ticks").set(ticks as f64);
    gauge!("odometry_sampler_failure_rate").set(failure_rate);
    histogram!("odometry_tick_duration_us").record(last_tick_us as f64);
}

/// Per-adapter running totals
#[derive(Debug, Clone, Default)]
pub struct AdapterStats {
    pub periods: u64,
    pub empty_periods: u64,
    pub unmatched_samples: u64,
    pub samples: RunningStats,
}

impl AdapterStats {
    fn push(&mut self, samples: usize, unmatched: usize) {
        self.periods += 1;
        if samples == 0 {
            self.empty_periods += 1;
        }
        self.unmatched_samples += unmatched as u64;
        self.samples.push(samples as f64);
    }
}

/// Odometry metrics aggregator
///
/// Aggregates in memory for summaries at the end of a run.
#[derive(Debug, Clone, Default)]
pub struct OdometryMetricsAggregator {
    /// Keyed by adapter name, sorted for stable output
    pub adapters: BTreeMap<String, AdapterStats>,

    /// Periods with `drift_corrected` set
    pub drift_corrections: u64,

    /// Periods where the gyro was not connected
    pub gyro_disconnected_periods: u64,
}

impl OdometryMetricsAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn update_module(&mut self, module: &str, inputs: &ModuleInputs) {
        self.adapters
            .entry(module.to_string())
            .or_default()
            .push(inputs.odometry.len(), inputs.unmatched_samples);
        if inputs.drift_corrected {
            self.drift_corrections += 1;
        }
    }

    pub fn update_gyro(&mut self, inputs: &GyroInputs) {
        self.adapters
            .entry(GYRO_ADAPTER.to_string())
            .or_default()
            .push(inputs.odometry.len(), inputs.unmatched_samples);
        if !inputs.connected {
            self.gyro_disconnected_periods += 1;
        }
    }

    /// Build the summary report
    pub fn summary(&self) -> MetricsSummary {
        MetricsSummary {
            periods: self.adapters.values().map(|a| a.periods).max().unwrap_or(0),
            drift_corrections: self.drift_corrections,
            gyro_disconnected_periods: self.gyro_disconnected_periods,
            adapters: self
                .adapters
                .iter()
                .map(|(name, stats)| AdapterSummary {
                    name: name.clone(),
                    empty_periods: stats.empty_periods,
                    unmatched_samples: stats.unmatched_samples,
                    samples_per_period: StatsSummary::from(&stats.samples),
                })
                .collect(),
        }
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// Per-adapter summary line
#[derive(Debug, Clone, Default)]
pub struct AdapterSummary {
    pub name: String,
    pub empty_periods: u64,
    pub unmatched_samples: u64,
    pub samples_per_period: StatsSummary,
}

/// Metrics summary
#[derive(Debug, Clone, Default)]
pub struct MetricsSummary {
    pub periods: u64,
    pub drift_corrections: u64,
    pub gyro_disconnected_periods: u64,
    pub adapters: Vec<AdapterSummary>,
}

impl std::fmt::Display for MetricsSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "=== Odometry Metrics Summary ===")?;
        writeln!(f, "Periods: {}", self.periods)?;
        writeln!(f, "Drift corrections: {}", self.drift_corrections)?;
        writeln!(
            f,
            "Gyro disconnected periods: {}",
            self.gyro_disconnected_periods
        )?;

        for adapter in &self.adapters {
            writeln!(
                f,
                "  {}: samples/period {} | empty {} | unmatched {}",
                adapter.name,
                adapter.samples_per_period,
                adapter.empty_periods,
                adapter.unmatched_samples
            )?;
        }

        Ok(())
    }
}

/// Statistics summary
#[derive(Debug, Clone, Default)]
pub struct StatsSummary {
    pub count: u64,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub std_dev: f64,
}

impl From<&RunningStats> for StatsSummary {
    fn from(stats: &RunningStats) -> Self {
        Self {
            count: stats.count,
            min: stats.min,
            max: stats.max,
            mean: stats.mean(),
            std_dev: stats.std_dev(),
        }
    }
}

impl std::fmt::Display for StatsSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.count == 0 {
            write!(f, "N/A")
        } else {
            write!(
                f,
                "min={:.1}, max={:.1}, mean={:.2}, std={:.2} (n={})",
                self.min, self.max, self.mean, self.std_dev, self.count
            )
        }
    }
}

/// Online statistics (Welford's algorithm)
#[derive(Debug, Clone, Default)]
pub struct RunningStats {
    count: u64,
    mean: f64,
    m2: f64,
    min: f64,
    max: f64,
}

impl RunningStats {
    pub fn push(&mut self, value: f64) {
        self.count += 1;

        if self.count == 1 {
            self.min = value;
            self.max = value;
            self.mean = value;
            self.m2 = 0.0;
        } else {
            self.min = self.min.min(value);
            self.max = self.max.max(value);

            let delta = value - self.mean;
            self.mean += delta / self.count as f64;
            let delta2 = value - self.mean;
            self.m2 += delta * delta2;
        }
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    pub fn mean(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.mean
        }
    }

    /// Sample variance
    pub fn variance(&self) -> f64 {
        if self.count < 2 {
            0.0
        } else {
            self.m2 / (self.count - 1) as f64
        }
    }

    pub fn std_dev(&self) -> f64 {
        self.variance().sqrt()
    }

    pub fn min(&self) -> f64 {
        self.min
    }

    pub fn max(&self) -> f64 {
        self.max
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::{HeadingSample, ModuleOdometrySample};

    fn module_inputs(samples: usize, unmatched: usize) -> ModuleInputs {
        let sample = ModuleOdometrySample {
            timestamp: 0.0,
            drive: Default::default(),
            turn: Default::default(),
        };
        ModuleInputs {
            odometry: vec![sample; samples],
            unmatched_samples: unmatched,
            ..Default::default()
        }
    }

    #[test]
    fn test_running_stats() {
        let mut stats = RunningStats::default();
        for v in [1.0, 2.0, 3.0, 4.0, 5.0] {
            stats.push(v);
        }

        assert_eq!(stats.count(), 5);
        assert!((stats.mean() - 3.0).abs() < 1e-10);
        assert!((stats.min() - 1.0).abs() < 1e-10);
        assert!((stats.max() - 5.0).abs() < 1e-10);
        assert!((stats.variance() - 2.5).abs() < 1e-10);
    }

    #[test]
    fn test_aggregator_update() {
        let mut aggregator = OdometryMetricsAggregator::new();

        aggregator.update_module("front_left", &module_inputs(5, 0));
        aggregator.update_module("front_left", &module_inputs(0, 2));
        aggregator.update_module(
            "front_left",
            &ModuleInputs {
                drift_corrected: true,
                ..module_inputs(5, 0)
            },
        );
        aggregator.update_gyro(&GyroInputs {
            connected: false,
            odometry: vec![
                HeadingSample {
                    timestamp: 0.0,
                    yaw: 0.0,
                    yaw_rate: 0.0,
                };
                4
            ],
            ..Default::default()
        });

        let fl = &aggregator.adapters["front_left"];
        assert_eq!(fl.periods, 3);
        assert_eq!(fl.empty_periods, 1);
        assert_eq!(fl.unmatched_samples, 2);
        assert_eq!(aggregator.drift_corrections, 1);
        assert_eq!(aggregator.gyro_disconnected_periods, 1);

        let summary = aggregator.summary();
        assert_eq!(summary.periods, 3);
        assert_eq!(summary.adapters.len(), 2);
        assert_eq!(summary.adapters[0].name, "front_left");
    }

    #[test]
    fn test_summary_display() {
        let summary = MetricsSummary {
            periods: 100,
            drift_corrections: 2,
            gyro_disconnected_periods: 0,
            adapters: vec![AdapterSummary {
                name: "gyro".into(),
                empty_periods: 1,
                unmatched_samples: 3,
                samples_per_period: StatsSummary {
                    count: 100,
                    min: 4.0,
                    max: 6.0,
                    mean: 5.0,
                    std_dev: 0.1,
                },
            }],
        };

        let output = format!("{summary}");
        assert!(output.contains("Periods: 100"));
        assert!(output.contains("gyro: samples/period min=4.0"));
        assert!(output.contains("unmatched 3"));
    }

    #[test]
    fn test_recording_without_recorder_is_noop() {
        record_module_inputs("front_left", &module_inputs(3, 1));
        record_gyro_inputs(&GyroInputs::default());
        record_sampler_health(10, 0.0, 42);
    }
}
