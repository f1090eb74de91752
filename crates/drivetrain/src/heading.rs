//! Heading sensor adapter

use std::sync::Arc;

use contracts::{Clock, Gyro, GyroConfig, GyroInputs, HeadingSample, Rotation2d};
use sampler::{DrainedGroup, OdometryThread, QueueGroup};
use tracing::{debug, instrument};

use crate::signals::GyroYaw;
use crate::{DrivetrainError, Result};

/// Signal id of the sampled yaw channel
pub const YAW_SIGNAL: &str = "gyro/yaw";

/// Heading sensor odometry adapter
///
/// Yaw is sampled by the odometry thread. The yaw-rate channel is read
/// directly, no more often than `yaw_rate_frequency_hz`.
pub struct HeadingAdapter {
    gyro: Arc<dyn Gyro>,
    queues: QueueGroup,
    clock: Arc<dyn Clock>,
    yaw_rate_period_s: f64,
    last_rate_read: Option<f64>,
    yaw_rate_ok: bool,
    direct: GyroInputs,
    previous: Option<(f64, f64)>,
}

impl HeadingAdapter {
    /// Build the adapter and register the yaw signal
    ///
    /// `clock` must be the clock the odometry thread stamps ticks with.
    #[instrument(name = "heading_adapter_new", skip_all)]
    pub fn new(
        config: &GyroConfig,
        gyro: Arc<dyn Gyro>,
        thread: &mut OdometryThread,
        clock: Arc<dyn Clock>,
    ) -> Result<Self> {
        let rate = config.yaw_rate_frequency_hz;
        if !rate.is_finite() || rate <= 0.0 {
            return Err(DrivetrainError::invalid_config(
                "gyro.yaw_rate_frequency_hz",
                format!("must be positive, got {rate}"),
            ));
        }

        let timestamps = thread.make_timestamp_queue();
        let yaw = thread.register_signal(YAW_SIGNAL, GyroYaw::new(gyro.clone()))?;

        Ok(Self {
            gyro,
            queues: QueueGroup::new(timestamps, vec![yaw])?,
            clock,
            yaw_rate_period_s: 1.0 / rate,
            last_rate_read: None,
            yaw_rate_ok: false,
            direct: GyroInputs::default(),
            previous: None,
        })
    }

    /// Collect this period's inputs
    pub fn update_inputs(&mut self) -> GyroInputs {
        let yaw_ok = self.begin_period();
        let drained = self.queues.drain();
        self.finish_period(drained, yaw_ok)
    }

    /// Direct reads of the period; returns whether the yaw read succeeded
    pub(crate) fn begin_period(&mut self) -> bool {
        let yaw_ok = self.read_direct();
        self.refresh_yaw_rate();
        yaw_ok
    }

    pub(crate) fn queues(&self) -> &QueueGroup {
        &self.queues
    }

    pub(crate) fn finish_period(&mut self, drained: DrainedGroup, yaw_ok: bool) -> GyroInputs {
        let odometry = self.convert(&drained);
        let unmatched_samples = drained.unmatched();
        if unmatched_samples > 0 {
            debug!(unmatched_samples, "dropped unmatched yaw entries");
        }

        let inputs = GyroInputs {
            connected: yaw_ok && self.yaw_rate_ok,
            odometry,
            unmatched_samples,
            ..self.direct.clone()
        };
        observability::record_gyro_inputs(&inputs);
        inputs
    }

    fn read_direct(&mut self) -> bool {
        let yaw = self.gyro.yaw();
        match &yaw {
            Ok(degrees) => self.direct.yaw_position = Rotation2d::from_degrees(*degrees),
            Err(e) => debug!(error = %e, "direct yaw read failed"),
        }
        if let Ok(pitch) = self.gyro.pitch() {
            self.direct.pitch_deg = pitch;
        }
        if let Ok(roll) = self.gyro.roll() {
            self.direct.roll_deg = roll;
        }
        yaw.is_ok()
    }

    fn refresh_yaw_rate(&mut self) {
        let now = self.clock.now();
        let due = self
            .last_rate_read
            .map_or(true, |last| now - last >= self.yaw_rate_period_s);
        if !due {
            return;
        }

        self.last_rate_read = Some(now);
        match self.gyro.yaw_rate() {
            Ok(deg_per_sec) => {
                self.direct.yaw_velocity_rad_per_sec = deg_per_sec.to_radians();
                self.yaw_rate_ok = true;
            }
            Err(e) => {
                debug!(error = %e, "yaw rate read failed");
                self.yaw_rate_ok = false;
            }
        }
    }

    /// Yaw rate per sample is the finite difference against the previous
    /// sample, or the direct rate when there is none.
    fn convert(&mut self, drained: &DrainedGroup) -> Vec<HeadingSample> {
        let Some(yaw) = drained.samples.first() else {
            return Vec::new();
        };

        let mut samples = Vec::with_capacity(drained.matched_len());
        for (&timestamp, &degrees) in drained.timestamps.iter().zip(yaw) {
            let radians = degrees.to_radians();
            let yaw_rate = match self.previous {
                Some((t, y)) if timestamp > t => (radians - y) / (timestamp - t),
                _ => self.direct.yaw_velocity_rad_per_sec,
            };
            self.previous = Some((timestamp, radians));
            samples.push(HeadingSample {
                timestamp,
                yaw: radians,
                yaw_rate,
            });
        }
        samples
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::SimGyro;
    use contracts::ManualClock;

    fn setup() -> (Arc<ManualClock>, OdometryThread, Arc<SimGyro>, HeadingAdapter) {
        let clock = Arc::new(ManualClock::new(0.0));
        let mut thread = OdometryThread::with_frequency(200.0, clock.clone()).unwrap();
        let gyro = Arc::new(SimGyro::new("gyro"));
        let adapter =
            HeadingAdapter::new(&GyroConfig::default(), gyro.clone(), &mut thread, clock.clone())
                .unwrap();
        (clock, thread, gyro, adapter)
    }

    #[test]
    fn test_yaw_samples_in_radians() {
        let (clock, thread, gyro, mut adapter) = setup();
        gyro.set_yaw(90.0);
        for _ in 0..4 {
            clock.advance(0.005);
            thread.tick();
        }

        let inputs = adapter.update_inputs();
        assert!(inputs.connected);
        assert_eq!(inputs.odometry.len(), 4);
        assert!((inputs.odometry[0].yaw - std::f64::consts::FRAC_PI_2).abs() < 1e-12);
        assert!((inputs.yaw_position.degrees() - 90.0).abs() < 1e-9);
    }

    #[test]
    fn test_partial_attitude_frame_is_dropped() {
        let (clock, thread, gyro, mut adapter) = setup();
        clock.advance(0.005);
        thread.tick();
        gyro.fail_next(1);
        clock.advance(0.005);
        thread.tick();

        let inputs = adapter.update_inputs();
        assert_eq!(inputs.odometry.len(), 1);
        assert_eq!(inputs.unmatched_samples, 1);
    }

    #[test]
    fn test_yaw_rate_is_rate_limited() {
        let (clock, _thread, gyro, mut adapter) = setup();
        gyro.set_yaw_rate(90.0);
        let first = adapter.update_inputs().yaw_velocity_rad_per_sec;
        assert!((first - 90f64.to_radians()).abs() < 1e-12);

        // 100 Hz channel: not due again within 10 ms
        gyro.set_yaw_rate(180.0);
        clock.advance(0.004);
        assert_eq!(adapter.update_inputs().yaw_velocity_rad_per_sec, first);

        clock.advance(0.02);
        let refreshed = adapter.update_inputs().yaw_velocity_rad_per_sec;
        assert!((refreshed - 180f64.to_radians()).abs() < 1e-12);
    }

    #[test]
    fn test_disconnected_when_yaw_fails() {
        let (_clock, _thread, gyro, mut adapter) = setup();
        gyro.fail_next(1);
        assert!(!adapter.update_inputs().connected);
        assert!(adapter.update_inputs().connected);
    }

    #[test]
    fn test_rejects_zero_yaw_rate_frequency() {
        let clock = Arc::new(ManualClock::new(0.0));
        let mut thread = OdometryThread::with_frequency(200.0, clock.clone()).unwrap();
        let config = GyroConfig {
            yaw_rate_frequency_hz: 0.0,
        };
        let err = HeadingAdapter::new(&config, Arc::new(SimGyro::new("gyro")), &mut thread, clock)
            .err()
            .unwrap();
        assert!(matches!(err, DrivetrainError::InvalidConfig { .. }));
    }
}
