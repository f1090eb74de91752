//! Swerve module adapter
//!
//! Owns one module's drive encoder, steering encoder and absolute steering
//! encoder. Position channels of the two relative encoders are sampled by the
//! odometry thread; everything else is read directly once per period.

use std::sync::Arc;

use contracts::{
    AbsoluteEncoder, AxisSample, DriveConfig, HardwareError, ModuleConfig, ModuleInputs,
    ModuleOdometrySample, RelativeEncoder, Rotation2d, SignalId,
};
use metrics::counter;
use sampler::{DrainedGroup, OdometryThread, QueueGroup};
use tracing::{debug, info, instrument, warn};

use crate::drift::DriftCorrector;
use crate::signals::EncoderPosition;
use crate::units::{motor_rotations_to_radians, motor_rpm_to_radians_per_second};
use crate::{DrivetrainError, Result};

/// Absolute angle within this many degrees of straight ahead counts as aligned
const ALIGNED_TOLERANCE_DEG: f64 = 0.3;

/// Re-seed target and the outcome of writing it
pub(crate) type Reseed = Option<(f64, std::result::Result<(), HardwareError>)>;

/// Sensors of one swerve module
#[derive(Clone)]
pub struct ModuleHardware {
    /// Drive motor encoder
    pub drive: Arc<dyn RelativeEncoder>,
    /// Steering motor encoder
    pub turn: Arc<dyn RelativeEncoder>,
    /// Absolute encoder on the steering output
    pub turn_absolute: Arc<dyn AbsoluteEncoder>,
}

/// Values seen by the previous sample, for finite differences
#[derive(Debug, Clone, Copy)]
struct Previous {
    timestamp: f64,
    drive: f64,
    turn: f64,
}

/// One swerve module's odometry adapter
pub struct ModuleAdapter {
    config: ModuleConfig,
    hardware: ModuleHardware,
    queues: QueueGroup,
    drift: DriftCorrector,
    absolute_offset: Rotation2d,
    /// Last good direct readings; a failed read keeps the previous value
    direct: ModuleInputs,
    previous: Option<Previous>,
    /// Steering encoder was re-seeded since `previous` was taken
    turn_reseeded: bool,
}

impl ModuleAdapter {
    /// Build the adapter for module `index` and register its signals
    ///
    /// # Errors
    /// `InvalidModuleIndex` when `config` has no entry for `index`; `Sampler`
    /// when a signal id is already taken.
    #[instrument(name = "module_adapter_new", skip(config, hardware, thread))]
    pub fn new(
        index: usize,
        config: &DriveConfig,
        hardware: ModuleHardware,
        thread: &mut OdometryThread,
    ) -> Result<Self> {
        let module = config
            .module(index)
            .ok_or(DrivetrainError::InvalidModuleIndex { index })?
            .clone();

        let timestamps = thread.make_timestamp_queue();
        let drive = thread.register_signal(
            SignalId::scoped(&module.name, "drive"),
            EncoderPosition::new(hardware.drive.clone()),
        )?;
        let turn = thread.register_signal(
            SignalId::scoped(&module.name, "turn"),
            EncoderPosition::new(hardware.turn.clone()),
        )?;
        let queues = QueueGroup::new(timestamps, vec![drive, turn])?;

        debug!(name = %module.name, "module adapter registered");

        Ok(Self {
            absolute_offset: Rotation2d::from_degrees(module.absolute_offset_deg),
            drift: DriftCorrector::new(&config.odometry.drift),
            config: module,
            hardware,
            queues,
            direct: ModuleInputs::default(),
            previous: None,
            turn_reseeded: false,
        })
    }

    pub fn index(&self) -> usize {
        self.config.index
    }

    pub fn name(&self) -> &str {
        &self.config.name
    }

    /// Re-seeds applied so far
    pub fn drift_corrections(&self) -> u64 {
        self.drift.corrections()
    }

    /// Collect this period's inputs
    ///
    /// Never fails: a failed direct read keeps the last good value, failed
    /// sampled reads simply yield fewer odometry samples.
    pub fn update_inputs(&mut self) -> ModuleInputs {
        let seed = self.begin_period();
        let (drained, reseed) = self.queues.drain_with(|| self.reseed(seed));
        self.finish_period(drained, reseed)
    }

    /// Direct reads of the period; returns the steering re-seed target when
    /// a due drift check finds the error over threshold
    pub(crate) fn begin_period(&mut self) -> Option<f64> {
        let raw_turn = self.read_direct();
        if self.drift.tick() {
            self.drift_seed(raw_turn)
        } else {
            None
        }
    }

    pub(crate) fn queues(&self) -> &QueueGroup {
        &self.queues
    }

    /// Write the re-seed target; call with the sampler lock held, right
    /// after this module's drain
    pub(crate) fn reseed(&self, seed: Option<f64>) -> Reseed {
        seed.map(|rotations| (rotations, self.hardware.turn.set_position(rotations)))
    }

    /// Convert the drained queues and account for the re-seed
    pub(crate) fn finish_period(
        &mut self,
        drained: DrainedGroup,
        reseed: Reseed,
    ) -> ModuleInputs {
        let odometry = self.convert(&drained);
        let unmatched_samples = drained.unmatched();
        if unmatched_samples > 0 {
            debug!(
                module = %self.config.name,
                unmatched_samples,
                "dropped unmatched queue entries"
            );
        }

        let drift_corrected = match reseed {
            Some((rotations, Ok(()))) => {
                self.drift.record_correction();
                self.turn_reseeded = true;
                counter!(
                    "odometry_drift_corrections_total",
                    "module" => self.config.name.clone()
                )
                .increment(1);
                info!(module = %self.config.name, rotations, "turn encoder re-seeded");
                true
            }
            Some((_, Err(e))) => {
                warn!(module = %self.config.name, error = %e, "turn encoder re-seed failed");
                false
            }
            None => false,
        };

        let inputs = ModuleInputs {
            odometry,
            unmatched_samples,
            drift_corrected,
            ..self.direct.clone()
        };
        observability::record_module_inputs(&self.config.name, &inputs);
        inputs
    }

    /// Refresh the direct snapshot; returns the raw steering encoder reading
    /// and calibrated absolute angle when both were read this period
    fn read_direct(&mut self) -> Option<(f64, Rotation2d)> {
        let drive_ratio = self.config.drive_gear_ratio;
        let turn_ratio = self.config.turn_gear_ratio;
        let name = self.config.name.as_str();

        let drive = log_failure(name, "drive position", self.hardware.drive.position());
        if let Some(rotations) = drive {
            self.direct.drive_position_rad = motor_rotations_to_radians(rotations, drive_ratio);
        }
        if let Some(rpm) = log_failure(name, "drive velocity", self.hardware.drive.velocity()) {
            self.direct.drive_velocity_rad_per_sec =
                motor_rpm_to_radians_per_second(rpm, drive_ratio);
        }

        let turn = log_failure(name, "turn position", self.hardware.turn.position());
        if let Some(rotations) = turn {
            self.direct.turn_position =
                Rotation2d::from_radians(motor_rotations_to_radians(rotations, turn_ratio));
        }
        if let Some(rpm) = log_failure(name, "turn velocity", self.hardware.turn.velocity()) {
            self.direct.turn_velocity_rad_per_sec =
                motor_rpm_to_radians_per_second(rpm, turn_ratio);
        }

        let absolute = log_failure(
            name,
            "turn absolute position",
            self.hardware.turn_absolute.position(),
        )
        .map(|rotations| Rotation2d::from_rotations(rotations).minus(self.absolute_offset));
        if let Some(angle) = absolute {
            self.direct.turn_absolute_position = angle;
            self.direct.turn_aligned = angle.degrees().abs() < ALIGNED_TOLERANCE_DEG;
        }

        turn.zip(absolute)
    }

    fn drift_seed(&self, readings: Option<(f64, Rotation2d)>) -> Option<f64> {
        let Some((relative, absolute)) = readings else {
            debug!(module = %self.config.name, "drift check skipped, reads failed");
            return None;
        };
        self.drift
            .correction(relative, absolute, self.config.turn_gear_ratio)
    }

    /// Pair the drained prefix and convert to physical units
    ///
    /// Velocity is the finite difference against the previous sample. The
    /// first sample ever, a non-increasing timestamp or a steering re-seed in
    /// between fall back to the directly read velocity.
    fn convert(&mut self, drained: &DrainedGroup) -> Vec<ModuleOdometrySample> {
        let drive_ratio = self.config.drive_gear_ratio;
        let turn_ratio = self.config.turn_gear_ratio;
        let (drive, turn) = match drained.samples.as_slice() {
            [drive, turn] => (drive, turn),
            _ => return Vec::new(),
        };

        let mut samples = Vec::with_capacity(drained.matched_len());
        for i in 0..drained.matched_len() {
            let timestamp = drained.timestamps[i];
            let drive_position = motor_rotations_to_radians(drive[i], drive_ratio);
            let turn_position = motor_rotations_to_radians(turn[i], turn_ratio);

            let (drive_velocity, turn_velocity) = match self.previous {
                Some(prev) if timestamp > prev.timestamp => {
                    let dt = timestamp - prev.timestamp;
                    let turn_velocity = if self.turn_reseeded {
                        self.direct.turn_velocity_rad_per_sec
                    } else {
                        (turn_position - prev.turn) / dt
                    };
                    ((drive_position - prev.drive) / dt, turn_velocity)
                }
                _ => (
                    self.direct.drive_velocity_rad_per_sec,
                    self.direct.turn_velocity_rad_per_sec,
                ),
            };

            self.previous = Some(Previous {
                timestamp,
                drive: drive_position,
                turn: turn_position,
            });
            self.turn_reseeded = false;

            samples.push(ModuleOdometrySample {
                timestamp,
                drive: AxisSample {
                    position: drive_position,
                    velocity: drive_velocity,
                },
                turn: AxisSample {
                    position: turn_position,
                    velocity: turn_velocity,
                },
            });
        }
        samples
    }
}

fn log_failure<T>(
    module: &str,
    channel: &str,
    result: std::result::Result<T, HardwareError>,
) -> Option<T> {
    match result {
        Ok(value) => Some(value),
        Err(e) => {
            debug!(module, channel, error = %e, "direct read failed");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::{SimAbsoluteEncoder, SimRelativeEncoder};
    use contracts::{GearRatio, ManualClock};
    use std::f64::consts::TAU;

    struct Rig {
        clock: Arc<ManualClock>,
        thread: OdometryThread,
        drive: Arc<SimRelativeEncoder>,
        turn: Arc<SimRelativeEncoder>,
        absolute: Arc<SimAbsoluteEncoder>,
    }

    fn rig() -> Rig {
        let clock = Arc::new(ManualClock::new(0.0));
        let thread = OdometryThread::with_frequency(200.0, clock.clone()).unwrap();
        Rig {
            clock,
            thread,
            drive: Arc::new(SimRelativeEncoder::new("drive")),
            turn: Arc::new(SimRelativeEncoder::new("turn")),
            absolute: Arc::new(SimAbsoluteEncoder::new("absolute")),
        }
    }

    fn config(drive_ratio: f64, turn_ratio: f64, offset_deg: f64) -> DriveConfig {
        let mut config = DriveConfig::default();
        for module in &mut config.modules {
            module.drive_gear_ratio = GearRatio::new(drive_ratio, 1.0);
            module.turn_gear_ratio = GearRatio::new(turn_ratio, 1.0);
            module.absolute_offset_deg = offset_deg;
        }
        config
    }

    fn adapter(rig: &mut Rig, config: &DriveConfig) -> ModuleAdapter {
        let hardware = ModuleHardware {
            drive: rig.drive.clone(),
            turn: rig.turn.clone(),
            turn_absolute: rig.absolute.clone(),
        };
        ModuleAdapter::new(0, config, hardware, &mut rig.thread).unwrap()
    }

    fn tick(rig: &Rig, n: usize) {
        for _ in 0..n {
            rig.clock.advance(0.005);
            rig.thread.tick();
        }
    }

    #[test]
    fn test_signal_ids() {
        let mut rig = rig();
        let module = adapter(&mut rig, &DriveConfig::default());

        let ids: Vec<_> = module.queues.signal_ids().map(|id| id.to_string()).collect();
        assert_eq!(ids, ["front_left/drive", "front_left/turn"]);
        assert_eq!(module.name(), "front_left");
    }

    #[test]
    fn test_unit_conversion() {
        let mut rig = rig();
        let mut module = adapter(&mut rig, &config(6.75, 1.0, 0.0));

        rig.drive.set_position(1.0).unwrap();
        rig.turn.set_position(1.0).unwrap();
        tick(&rig, 1);

        let inputs = module.update_inputs();
        assert_eq!(inputs.odometry.len(), 1);
        let sample = inputs.odometry[0];
        assert!((sample.turn.position - TAU).abs() < 1e-9);
        assert!((sample.drive.position - TAU / 6.75).abs() < 1e-9);
        assert!((inputs.drive_position_rad - TAU / 6.75).abs() < 1e-9);
    }

    #[test]
    fn test_absolute_offset_applied() {
        let mut rig = rig();
        let mut module = adapter(&mut rig, &config(1.0, 1.0, 203.0));

        rig.absolute.set_rotations(210.0 / 360.0);
        let inputs = module.update_inputs();
        assert!((inputs.turn_absolute_position.degrees() - 7.0).abs() < 1e-9);
        assert!(!inputs.turn_aligned);

        rig.absolute.set_rotations(203.1 / 360.0);
        assert!(module.update_inputs().turn_aligned);
    }

    #[test]
    fn test_samples_per_period_with_failure() {
        let mut rig = rig();
        let mut module = adapter(&mut rig, &config(1.0, 1.0, 0.0));

        // 200 Hz against a 50 Hz loop: four ticks per period
        tick(&rig, 4);
        assert_eq!(module.update_inputs().odometry.len(), 4);

        rig.turn.fail_next(1);
        tick(&rig, 4);
        let inputs = module.update_inputs();
        assert_eq!(inputs.odometry.len(), 3);
        assert_eq!(inputs.unmatched_samples, 2);
    }

    #[test]
    fn test_finite_difference_velocity() {
        let mut rig = rig();
        let mut module = adapter(&mut rig, &config(1.0, 1.0, 0.0));

        rig.drive.set_velocity_rpm(60.0);
        for i in 0..3 {
            rig.drive.set_position(i as f64 * 0.01).unwrap();
            tick(&rig, 1);
        }

        let inputs = module.update_inputs();
        let first = inputs.odometry[0];
        // no predecessor: direct velocity, 60 RPM = 2π rad/s
        assert!((first.drive.velocity - TAU).abs() < 1e-9);
        let second = inputs.odometry[1];
        assert!((second.drive.velocity - 0.01 * TAU / 0.005).abs() < 1e-6);
    }

    #[test]
    fn test_failed_direct_read_keeps_previous_value() {
        let mut rig = rig();
        let mut module = adapter(&mut rig, &config(1.0, 1.0, 0.0));

        rig.drive.set_position(0.5).unwrap();
        let before = module.update_inputs().drive_position_rad;

        rig.drive.set_position(0.75).unwrap();
        rig.drive.fail_next(1);
        let after = module.update_inputs().drive_position_rad;
        assert_eq!(before, after);
    }

    #[test]
    fn test_drift_correction_reseeds() {
        let mut rig = rig();
        let mut config = config(1.0, 10.0, 0.0);
        config.odometry.drift.interval_periods = 2;
        let mut module = adapter(&mut rig, &config);

        // relative says 12 degrees, absolute says 10
        rig.turn.set_position(10.0 * 12.0 / 360.0).unwrap();
        rig.absolute.set_rotations(10.0 / 360.0);

        assert!(!module.update_inputs().drift_corrected);
        assert!(module.update_inputs().drift_corrected);
        assert_eq!(module.drift_corrections(), 1);

        let inputs = module.update_inputs();
        let error = inputs.turn_position.minus(inputs.turn_absolute_position);
        assert!(error.degrees().abs() < 0.3);
    }

    #[test]
    fn test_invalid_module_index() {
        let mut rig = rig();
        let hardware = ModuleHardware {
            drive: rig.drive.clone(),
            turn: rig.turn.clone(),
            turn_absolute: rig.absolute.clone(),
        };
        let err = ModuleAdapter::new(4, &DriveConfig::default(), hardware, &mut rig.thread)
            .err()
            .unwrap();
        assert!(matches!(err, DrivetrainError::InvalidModuleIndex { index: 4 }));
        assert_eq!(rig.thread.signal_count(), 0);
    }
}
