//! Pipeline orchestrator - wires simulated hardware, sampler and drivetrain.

use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use contracts::{Clock, DriveConfig, MonotonicClock};
use drivetrain::sim::SimHardware;
use drivetrain::Drivetrain;
use sampler::OdometryThread;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info, warn};

use super::PipelineStats;
use crate::error::{CliError, Result};

/// Simulated hardware physics step
const PHYSICS_PERIOD: Duration = Duration::from_millis(1);

/// Periods between sampler health reports
const HEALTH_REPORT_PERIODS: u64 = 50;

/// Motion and fault profile for the simulated robot
#[derive(Debug, Clone, Default)]
pub struct SimScenario {
    /// Probability that any sensor read fails
    pub failure_rate: f64,
    /// Steering encoder drift injected at start (degrees)
    pub drift_deg: f64,
    pub wheel_speed_rad_per_sec: f64,
    pub steer_rate_rad_per_sec: f64,
    pub yaw_rate_deg_per_sec: f64,
}

/// Pipeline configuration
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub drive: DriveConfig,

    /// Run time (None = until shutdown)
    pub duration: Option<Duration>,

    pub scenario: SimScenario,

    /// Metrics server port (None = disabled)
    pub metrics_port: Option<u16>,
}

/// Main pipeline orchestrator
pub struct Pipeline {
    config: PipelineConfig,
}

impl Pipeline {
    pub fn new(config: PipelineConfig) -> Self {
        Self { config }
    }

    /// Run until the configured duration elapses or `shutdown` resolves
    pub async fn run(self, shutdown: impl Future<Output = ()>) -> anyhow::Result<PipelineStats> {
        if let Some(port) = self.config.metrics_port {
            observability::init_metrics_only(port)?;
            info!("Metrics endpoint available on port {}", port);
        }

        let (mut drivetrain, hardware, running) = self.build()?;
        let period = Duration::from_secs_f64(self.config.drive.odometry.main_loop_period_s);
        let physics = tokio::spawn(run_physics(hardware.clone()));

        let mut stats = PipelineStats::default();
        let started = Instant::now();
        let mut ticker = interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        tokio::pin!(shutdown);

        info!(
            period_ms = period.as_secs_f64() * 1000.0,
            sampler_hz = running.frequency_hz(),
            "Main loop running"
        );

        let outcome = loop {
            tokio::select! {
                _ = ticker.tick() => {}
                _ = &mut shutdown => break Ok(()),
            }

            if !running.is_alive() {
                break Err(CliError::SamplerStopped);
            }

            let inputs = drivetrain.update_inputs();
            stats.record(&inputs, drivetrain.modules());

            if stats.periods % HEALTH_REPORT_PERIODS == 0 {
                let snapshot = running.metrics().snapshot();
                observability::record_sampler_health(
                    snapshot.ticks,
                    snapshot.failure_rate(),
                    snapshot.last_tick_us,
                );
                debug!(
                    periods = stats.periods,
                    ticks = snapshot.ticks,
                    failure_rate = snapshot.failure_rate(),
                    "Sampler health"
                );
            }

            if self
                .config
                .duration
                .is_some_and(|limit| started.elapsed() >= limit)
            {
                info!("Configured duration elapsed");
                break Ok(());
            }
        };

        physics.abort();
        stats.duration = started.elapsed();
        stats.sampler = running.metrics().snapshot();
        stats.drift_corrections = drivetrain.drift_corrections();

        if let Err(e) = outcome {
            warn!(error = %e, "Pipeline stopped early");
            return Err(e.into());
        }
        Ok(stats)
    }

    /// Construct hardware and adapters, then start the sampler
    fn build(&self) -> Result<(Drivetrain, Arc<SimHardware>, sampler::RunningOdometryThread)> {
        let drive = &self.config.drive;
        let scenario = &self.config.scenario;
        let clock: Arc<dyn Clock> = Arc::new(MonotonicClock::new());

        let mut hardware = SimHardware::new(drive);
        hardware.set_failure_probability(scenario.failure_rate);
        hardware.set_motion(
            scenario.wheel_speed_rad_per_sec,
            scenario.steer_rate_rad_per_sec,
        );
        hardware.sim_gyro().set_yaw_rate(scenario.yaw_rate_deg_per_sec);
        if scenario.drift_deg != 0.0 {
            for module in hardware.sim_modules() {
                module.inject_turn_drift(scenario.drift_deg);
            }
            info!(drift_deg = scenario.drift_deg, "Injected steering encoder drift");
        }

        let mut thread = OdometryThread::new(&drive.odometry, clock.clone())?;
        let drivetrain = Drivetrain::new(drive, &mut hardware, &mut thread, clock)?;
        let running = thread.start()?;

        info!(
            failure_rate = scenario.failure_rate,
            signals = running.signal_count(),
            "Simulated drivetrain ready"
        );
        Ok((drivetrain, Arc::new(hardware), running))
    }
}

/// Integrate the simulated motion in real time
async fn run_physics(hardware: Arc<SimHardware>) {
    let mut ticker = interval(PHYSICS_PERIOD);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut last = Instant::now();

    loop {
        ticker.tick().await;
        let now = Instant::now();
        hardware.advance((now - last).as_secs_f64());
        last = now;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(duration: Duration) -> PipelineConfig {
        PipelineConfig {
            drive: DriveConfig::default(),
            duration: Some(duration),
            scenario: SimScenario {
                wheel_speed_rad_per_sec: 10.0,
                ..Default::default()
            },
            metrics_port: None,
        }
    }

    #[tokio::test]
    async fn test_runs_for_duration() {
        let pipeline = Pipeline::new(config(Duration::from_millis(200)));
        let stats = pipeline.run(std::future::pending()).await.unwrap();

        assert!(stats.periods >= 5, "periods = {}", stats.periods);
        assert!(stats.samples > 0);
        assert!(stats.sampler.ticks > 0);
    }

    #[tokio::test]
    async fn test_shutdown_stops_loop() {
        let pipeline = Pipeline::new(config(Duration::from_secs(30)));
        let started = Instant::now();
        let stats = pipeline
            .run(tokio::time::sleep(Duration::from_millis(100)))
            .await
            .unwrap();

        assert!(started.elapsed() < Duration::from_secs(5));
        assert!(stats.periods > 0);
    }
}
