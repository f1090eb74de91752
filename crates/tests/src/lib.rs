//! # Integration Tests
//!
//! Cross-crate and end-to-end tests.
//!
//! Covers:
//! - the shipped robot configuration
//! - simulated end-to-end runs on the real sampling thread

#[cfg(test)]
mod contract_tests {
    use std::path::Path;

    use config_loader::ConfigLoader;
    use contracts::{DriveConfig, MODULE_COUNT};

    fn robot_toml() -> &'static Path {
        Path::new(concat!(env!("CARGO_MANIFEST_DIR"), "/../../config/robot.toml"))
    }

    #[test]
    fn test_shipped_config_matches_defaults() {
        let config = ConfigLoader::load_from_path(robot_toml()).unwrap();
        assert_eq!(config, DriveConfig::default());
        assert_eq!(config.modules.len(), MODULE_COUNT);
    }

    #[test]
    fn test_default_config_is_valid() {
        assert!(ConfigLoader::validate(&DriveConfig::default()).is_ok());
    }
}

#[cfg(test)]
mod e2e_tests {
    use std::sync::Arc;
    use std::time::Duration;

    use contracts::{Clock, DriveConfig, MonotonicClock, MODULE_COUNT};
    use drivetrain::sim::SimHardware;
    use drivetrain::{Drivetrain, DrivetrainInputs};
    use observability::OdometryMetricsAggregator;
    use sampler::{OdometryThread, RunningOdometryThread};
    use tokio::time::{interval, MissedTickBehavior};

    struct Rig {
        drivetrain: Drivetrain,
        hardware: SimHardware,
        running: RunningOdometryThread,
    }

    fn rig(config: &DriveConfig, setup: impl FnOnce(&SimHardware)) -> Rig {
        let clock: Arc<dyn Clock> = Arc::new(MonotonicClock::new());
        let mut hardware = SimHardware::new(config);
        setup(&hardware);

        let mut thread = OdometryThread::new(&config.odometry, clock.clone()).unwrap();
        let drivetrain = Drivetrain::new(config, &mut hardware, &mut thread, clock).unwrap();
        let running = thread.start().unwrap();

        Rig {
            drivetrain,
            hardware,
            running,
        }
    }

    /// Drive the main loop for `periods` periods, advancing the simulation
    /// once per period
    async fn run_periods(rig: &mut Rig, periods: usize) -> Vec<DrivetrainInputs> {
        let mut ticker = interval(Duration::from_millis(20));
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let mut collected = Vec::with_capacity(periods);
        for _ in 0..periods {
            ticker.tick().await;
            rig.hardware.advance(0.02);
            collected.push(rig.drivetrain.update_inputs());
        }
        collected
    }

    /// Sampler thread -> queues -> adapters, on simulated hardware
    #[tokio::test]
    async fn test_e2e_sim_pipeline() {
        let config = DriveConfig::default();
        let mut rig = rig(&config, |hw| {
            hw.set_motion(10.0, 0.0);
            hw.sim_gyro().set_yaw_rate(45.0);
        });

        let periods = run_periods(&mut rig, 25).await;
        assert!(rig.running.is_alive());

        let delivered: usize = periods.iter().map(|p| p.sample_count()).sum();
        assert!(delivered > 0);
        assert_eq!(
            periods.iter().map(|p| p.unmatched_samples()).sum::<usize>(),
            0
        );

        let last = periods.last().unwrap();
        assert_eq!(last.modules.len(), MODULE_COUNT);
        assert!(last.gyro.connected);
        // wheels turned forward, robot yawed left
        assert!(last.modules.iter().all(|m| m.drive_position_rad > 0.0));
        assert!(last.gyro.yaw_position.degrees() > 0.0);
    }

    /// Every tick reaches an adapter exactly once, in order, across periods
    #[tokio::test]
    async fn test_timestamps_strictly_increase_across_periods() {
        let config = DriveConfig::default();
        let mut rig = rig(&config, |_| {});

        let periods = run_periods(&mut rig, 15).await;

        for module in 0..MODULE_COUNT {
            let stamps: Vec<f64> = periods
                .iter()
                .flat_map(|p| p.modules[module].odometry.iter().map(|s| s.timestamp))
                .collect();
            assert!(!stamps.is_empty());
            assert!(stamps.windows(2).all(|w| w[0] < w[1]));
        }

        let gyro: Vec<f64> = periods
            .iter()
            .flat_map(|p| p.gyro.odometry.iter().map(|s| s.timestamp))
            .collect();
        assert!(gyro.windows(2).all(|w| w[0] < w[1]));
    }

    /// Injected steering drift is corrected after the check cadence
    #[tokio::test]
    async fn test_drift_is_corrected() {
        let mut config = DriveConfig::default();
        config.odometry.drift.interval_periods = 5;
        let mut rig = rig(&config, |hw| {
            for module in hw.sim_modules() {
                module.inject_turn_drift(5.0);
            }
        });

        let periods = run_periods(&mut rig, 12).await;

        assert_eq!(rig.drivetrain.drift_corrections(), MODULE_COUNT as u64);
        let last = periods.last().unwrap();
        for module in &last.modules {
            let error = module.turn_position.minus(module.turn_absolute_position);
            assert!(error.degrees().abs() < 0.3, "error = {}", error.degrees());
        }
    }

    /// Random read failures degrade completeness, nothing else
    #[tokio::test]
    async fn test_failures_degrade_gracefully() {
        let config = DriveConfig::default();
        let mut rig = rig(&config, |hw| {
            hw.set_motion(5.0, 0.2);
            hw.set_failure_probability(0.2);
        });

        let periods = run_periods(&mut rig, 20).await;
        assert!(rig.running.is_alive());

        let mut aggregator = OdometryMetricsAggregator::new();
        for p in &periods {
            for (module, inputs) in rig.drivetrain.modules().iter().zip(&p.modules) {
                aggregator.update_module(module.name(), inputs);
            }
            aggregator.update_gyro(&p.gyro);
        }

        let snapshot = rig.running.metrics().snapshot();
        assert!(snapshot.read_failures > 0);
        assert!(snapshot.failure_rate() < 0.5);

        let summary = aggregator.summary();
        assert_eq!(summary.periods, 20);
        assert_eq!(summary.adapters.len(), MODULE_COUNT + 1);
    }

    /// Dropping every handle stops the sampling thread
    #[tokio::test]
    async fn test_thread_exits_when_drivetrain_dropped() {
        let config = DriveConfig::default();
        let Rig {
            drivetrain,
            running,
            ..
        } = rig(&config, |_| {});
        let metrics = running.metrics();

        drop(drivetrain);
        drop(running);
        tokio::time::sleep(Duration::from_millis(50)).await;

        let ticks = metrics.snapshot().ticks;
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(metrics.snapshot().ticks, ticks);
    }
}
