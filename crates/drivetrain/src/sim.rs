//! Simulated drivetrain hardware
//!
//! Kinematically consistent sensors for bench runs and tests: a module's drive
//! encoder, steering encoder and absolute encoder all follow the same
//! commanded motion. Faults are injectable per device, either scheduled
//! (`fail_next`) or random (`set_failure_probability`).

use std::f64::consts::TAU;
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use contracts::{
    AbsoluteEncoder, DriveConfig, Gyro, HardwareError, ModuleConfig, RelativeEncoder,
};
use rand::Rng;
use tracing::trace;

use crate::drivetrain::HardwareProvider;
use crate::module::ModuleHardware;
use crate::{DrivetrainError, Result};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Per-device fault injection
#[derive(Debug, Default)]
struct Faults {
    fail_next: AtomicU32,
    probability_bits: AtomicU64,
}

impl Faults {
    fn fail_next(&self, count: u32) {
        self.fail_next.fetch_add(count, Ordering::SeqCst);
    }

    fn set_probability(&self, probability: f64) {
        let p = if probability.is_finite() {
            probability.clamp(0.0, 1.0)
        } else {
            0.0
        };
        self.probability_bits.store(p.to_bits(), Ordering::Relaxed);
    }

    fn check(&self, device: &str) -> std::result::Result<(), HardwareError> {
        let scheduled = self
            .fail_next
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if scheduled {
            trace!(device, "scheduled fault");
            return Err(HardwareError::timeout(device));
        }

        let p = f64::from_bits(self.probability_bits.load(Ordering::Relaxed));
        if p > 0.0 && rand::rng().random_bool(p) {
            trace!(device, "random fault");
            return Err(HardwareError::status(device, "frame lost"));
        }
        Ok(())
    }
}

#[derive(Debug, Default)]
struct EncoderState {
    position: f64,
    velocity_rpm: f64,
}

/// Simulated motor-shaft encoder
#[derive(Debug)]
pub struct SimRelativeEncoder {
    device: String,
    state: Mutex<EncoderState>,
    faults: Faults,
}

impl SimRelativeEncoder {
    pub fn new(device: impl Into<String>) -> Self {
        Self {
            device: device.into(),
            state: Mutex::new(EncoderState::default()),
            faults: Faults::default(),
        }
    }

    pub fn set_velocity_rpm(&self, rpm: f64) {
        lock(&self.state).velocity_rpm = rpm;
    }

    /// Integrate the current velocity over `dt` seconds
    pub fn advance(&self, dt: f64) {
        let mut state = lock(&self.state);
        state.position += state.velocity_rpm / 60.0 * dt;
    }

    /// Shift the count without physical motion, like a skipped belt tooth
    pub fn slip(&self, rotations: f64) {
        lock(&self.state).position += rotations;
    }

    pub fn fail_next(&self, count: u32) {
        self.faults.fail_next(count);
    }

    pub fn set_failure_probability(&self, probability: f64) {
        self.faults.set_probability(probability);
    }
}

impl RelativeEncoder for SimRelativeEncoder {
    fn position(&self) -> std::result::Result<f64, HardwareError> {
        self.faults.check(&self.device)?;
        Ok(lock(&self.state).position)
    }

    fn velocity(&self) -> std::result::Result<f64, HardwareError> {
        self.faults.check(&self.device)?;
        Ok(lock(&self.state).velocity_rpm)
    }

    fn set_position(&self, rotations: f64) -> std::result::Result<(), HardwareError> {
        self.faults.check(&self.device)?;
        lock(&self.state).position = rotations;
        Ok(())
    }
}

/// Simulated duty-cycle absolute encoder
#[derive(Debug)]
pub struct SimAbsoluteEncoder {
    device: String,
    rotations: Mutex<f64>,
    faults: Faults,
}

impl SimAbsoluteEncoder {
    pub fn new(device: impl Into<String>) -> Self {
        Self {
            device: device.into(),
            rotations: Mutex::new(0.0),
            faults: Faults::default(),
        }
    }

    /// Set the raw reading; wrapped into `[0, 1)`
    pub fn set_rotations(&self, rotations: f64) {
        *lock(&self.rotations) = rotations.rem_euclid(1.0);
    }

    pub fn fail_next(&self, count: u32) {
        self.faults.fail_next(count);
    }

    pub fn set_failure_probability(&self, probability: f64) {
        self.faults.set_probability(probability);
    }
}

impl AbsoluteEncoder for SimAbsoluteEncoder {
    fn position(&self) -> std::result::Result<f64, HardwareError> {
        self.faults.check(&self.device)?;
        Ok(*lock(&self.rotations))
    }
}

#[derive(Debug, Default)]
struct Attitude {
    yaw: f64,
    yaw_rate: f64,
    pitch: f64,
    roll: f64,
}

/// Simulated IMU, degrees and degrees/second
#[derive(Debug)]
pub struct SimGyro {
    device: String,
    attitude: Mutex<Attitude>,
    faults: Faults,
}

impl SimGyro {
    pub fn new(device: impl Into<String>) -> Self {
        Self {
            device: device.into(),
            attitude: Mutex::new(Attitude::default()),
            faults: Faults::default(),
        }
    }

    pub fn set_yaw(&self, degrees: f64) {
        lock(&self.attitude).yaw = degrees;
    }

    pub fn set_yaw_rate(&self, deg_per_sec: f64) {
        lock(&self.attitude).yaw_rate = deg_per_sec;
    }

    pub fn set_tilt(&self, pitch: f64, roll: f64) {
        let mut attitude = lock(&self.attitude);
        attitude.pitch = pitch;
        attitude.roll = roll;
    }

    /// Integrate the yaw rate over `dt` seconds
    pub fn advance(&self, dt: f64) {
        let mut attitude = lock(&self.attitude);
        attitude.yaw += attitude.yaw_rate * dt;
    }

    pub fn fail_next(&self, count: u32) {
        self.faults.fail_next(count);
    }

    pub fn set_failure_probability(&self, probability: f64) {
        self.faults.set_probability(probability);
    }

    fn read(&self, f: impl FnOnce(&Attitude) -> f64) -> std::result::Result<f64, HardwareError> {
        self.faults.check(&self.device)?;
        Ok(f(&lock(&self.attitude)))
    }
}

impl Gyro for SimGyro {
    fn yaw(&self) -> std::result::Result<f64, HardwareError> {
        self.read(|a| a.yaw)
    }

    fn yaw_rate(&self) -> std::result::Result<f64, HardwareError> {
        self.read(|a| a.yaw_rate)
    }

    fn pitch(&self) -> std::result::Result<f64, HardwareError> {
        self.read(|a| a.pitch)
    }

    fn roll(&self) -> std::result::Result<f64, HardwareError> {
        self.read(|a| a.roll)
    }
}

#[derive(Debug, Default)]
struct Motion {
    wheel_speed_rad_per_sec: f64,
    steer_rate_rad_per_sec: f64,
    steer_angle_rad: f64,
}

/// One simulated swerve module
#[derive(Debug)]
pub struct SimModule {
    config: ModuleConfig,
    drive: Arc<SimRelativeEncoder>,
    turn: Arc<SimRelativeEncoder>,
    absolute: Arc<SimAbsoluteEncoder>,
    motion: Mutex<Motion>,
}

impl SimModule {
    /// Module pointing straight ahead, steering encoder zeroed
    pub fn new(config: &ModuleConfig) -> Self {
        let module = Self {
            drive: Arc::new(SimRelativeEncoder::new(format!("{}/drive", config.name))),
            turn: Arc::new(SimRelativeEncoder::new(format!("{}/turn", config.name))),
            absolute: Arc::new(SimAbsoluteEncoder::new(format!("{}/absolute", config.name))),
            config: config.clone(),
            motion: Mutex::new(Motion::default()),
        };
        module.sync_absolute(0.0);
        module
    }

    /// Command wheel speed and steering rate (rad/s, mechanism side)
    pub fn set_motion(&self, wheel_speed_rad_per_sec: f64, steer_rate_rad_per_sec: f64) {
        let mut motion = lock(&self.motion);
        motion.wheel_speed_rad_per_sec = wheel_speed_rad_per_sec;
        motion.steer_rate_rad_per_sec = steer_rate_rad_per_sec;

        let to_rpm = 60.0 / TAU;
        self.drive.set_velocity_rpm(
            wheel_speed_rad_per_sec * self.config.drive_gear_ratio.value() * to_rpm,
        );
        self.turn.set_velocity_rpm(
            steer_rate_rad_per_sec * self.config.turn_gear_ratio.value() * to_rpm,
        );
    }

    /// Move the module forward by `dt` seconds
    pub fn advance(&self, dt: f64) {
        let mut motion = lock(&self.motion);
        motion.steer_angle_rad += motion.steer_rate_rad_per_sec * dt;
        self.drive.advance(dt);
        self.turn.advance(dt);
        self.sync_absolute(motion.steer_angle_rad);
    }

    /// Drift the steering encoder away from the true angle
    pub fn inject_turn_drift(&self, degrees: f64) {
        self.turn.slip(degrees / 360.0 * self.config.turn_gear_ratio.value());
    }

    /// True steering angle (rad)
    pub fn steer_angle(&self) -> f64 {
        lock(&self.motion).steer_angle_rad
    }

    pub fn drive(&self) -> &Arc<SimRelativeEncoder> {
        &self.drive
    }

    pub fn turn(&self) -> &Arc<SimRelativeEncoder> {
        &self.turn
    }

    pub fn absolute(&self) -> &Arc<SimAbsoluteEncoder> {
        &self.absolute
    }

    pub fn set_failure_probability(&self, probability: f64) {
        self.drive.set_failure_probability(probability);
        self.turn.set_failure_probability(probability);
        self.absolute.set_failure_probability(probability);
    }

    pub fn hardware(&self) -> ModuleHardware {
        ModuleHardware {
            drive: self.drive.clone(),
            turn: self.turn.clone(),
            turn_absolute: self.absolute.clone(),
        }
    }

    fn sync_absolute(&self, steer_angle_rad: f64) {
        self.absolute
            .set_rotations(steer_angle_rad / TAU + self.config.absolute_offset_deg / 360.0);
    }
}

/// Simulated drivetrain: four modules and a gyro
#[derive(Debug)]
pub struct SimHardware {
    modules: Vec<Arc<SimModule>>,
    gyro: Arc<SimGyro>,
}

impl SimHardware {
    pub fn new(config: &DriveConfig) -> Self {
        Self {
            modules: config
                .modules
                .iter()
                .map(|m| Arc::new(SimModule::new(m)))
                .collect(),
            gyro: Arc::new(SimGyro::new("gyro")),
        }
    }

    /// Simulated module with the given index
    pub fn sim_module(&self, index: usize) -> Option<&Arc<SimModule>> {
        self.modules.iter().find(|m| m.config.index == index)
    }

    pub fn sim_modules(&self) -> &[Arc<SimModule>] {
        &self.modules
    }

    pub fn sim_gyro(&self) -> &Arc<SimGyro> {
        &self.gyro
    }

    /// Same wheel speed and steering rate on every module
    pub fn set_motion(&self, wheel_speed_rad_per_sec: f64, steer_rate_rad_per_sec: f64) {
        for module in &self.modules {
            module.set_motion(wheel_speed_rad_per_sec, steer_rate_rad_per_sec);
        }
    }

    pub fn set_failure_probability(&self, probability: f64) {
        for module in &self.modules {
            module.set_failure_probability(probability);
        }
        self.gyro.set_failure_probability(probability);
    }

    pub fn advance(&self, dt: f64) {
        for module in &self.modules {
            module.advance(dt);
        }
        self.gyro.advance(dt);
    }
}

impl HardwareProvider for SimHardware {
    fn module(&mut self, index: usize) -> Result<ModuleHardware> {
        self.sim_module(index)
            .map(|m| m.hardware())
            .ok_or_else(|| DrivetrainError::missing_hardware(format!("module {index}")))
    }

    fn gyro(&mut self) -> Result<Arc<dyn Gyro>> {
        Ok(self.gyro.clone())
    }
}
