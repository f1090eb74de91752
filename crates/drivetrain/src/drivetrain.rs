//! Drivetrain: four module adapters and the heading adapter

use std::sync::Arc;

use contracts::{Clock, DriveConfig, Gyro, GyroInputs, ModuleInputs, MODULE_COUNT};
use sampler::{DrainBatch, DrainedGroup, OdometryThread, QueueGroup};
use serde::Serialize;
use tracing::{error, info, instrument};

use crate::heading::HeadingAdapter;
use crate::module::{ModuleAdapter, ModuleHardware};
use crate::Result;

/// Source of the physical sensors
///
/// Implemented by vendor driver glue outside this crate and by
/// [`crate::sim::SimHardware`].
pub trait HardwareProvider {
    /// Sensors of module `index`
    fn module(&mut self, index: usize) -> Result<ModuleHardware>;

    /// Heading sensor
    fn gyro(&mut self) -> Result<Arc<dyn Gyro>>;
}

/// Everything the pose integrator consumes for one period
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DrivetrainInputs {
    /// Module inputs, by module index
    pub modules: Vec<ModuleInputs>,
    pub gyro: GyroInputs,
}

impl DrivetrainInputs {
    /// Odometry samples over all adapters
    pub fn sample_count(&self) -> usize {
        self.modules.iter().map(|m| m.odometry.len()).sum::<usize>() + self.gyro.odometry.len()
    }

    /// Discarded queue entries over all adapters
    pub fn unmatched_samples(&self) -> usize {
        self.modules.iter().map(|m| m.unmatched_samples).sum::<usize>()
            + self.gyro.unmatched_samples
    }
}

/// All odometry adapters of one robot
pub struct Drivetrain {
    modules: Vec<ModuleAdapter>,
    heading: HeadingAdapter,
}

impl Drivetrain {
    /// Build every adapter and register its signals on `thread`
    ///
    /// Must run before `thread` is started. `clock` must be the clock the
    /// thread was created with.
    #[instrument(name = "drivetrain_new", skip_all)]
    pub fn new(
        config: &DriveConfig,
        hardware: &mut dyn HardwareProvider,
        thread: &mut OdometryThread,
        clock: Arc<dyn Clock>,
    ) -> Result<Self> {
        let modules = (0..MODULE_COUNT)
            .map(|index| {
                let sensors = hardware.module(index)?;
                ModuleAdapter::new(index, config, sensors, thread)
            })
            .collect::<Result<Vec<_>>>()?;
        let heading = HeadingAdapter::new(&config.gyro, hardware.gyro()?, thread, clock)?;

        info!(
            modules = modules.len(),
            signals = thread.signal_count(),
            "drivetrain odometry registered"
        );

        Ok(Self { modules, heading })
    }

    /// Collect one period of inputs from every adapter
    ///
    /// Direct reads run first. All five queue groups are then drained, and
    /// drift re-seeds written, under one sampler lock, so every module and
    /// the gyro report the same ticks.
    pub fn update_inputs(&mut self) -> DrivetrainInputs {
        let seeds: Vec<_> = self.modules.iter_mut().map(ModuleAdapter::begin_period).collect();
        let yaw_ok = self.heading.begin_period();

        let (drained, heading_drained) = {
            let mut batch = self.heading.queues().batch();
            let drained: Vec<_> = self
                .modules
                .iter()
                .zip(seeds)
                .map(|(module, seed)| {
                    let group = drain_or_empty(&mut batch, module.queues());
                    (group, module.reseed(seed))
                })
                .collect();
            let heading_drained = drain_or_empty(&mut batch, self.heading.queues());
            (drained, heading_drained)
        };

        DrivetrainInputs {
            modules: self
                .modules
                .iter_mut()
                .zip(drained)
                .map(|(module, (group, reseed))| module.finish_period(group, reseed))
                .collect(),
            gyro: self.heading.finish_period(heading_drained, yaw_ok),
        }
    }

    pub fn modules(&self) -> &[ModuleAdapter] {
        &self.modules
    }

    /// Re-seeds applied over all modules
    pub fn drift_corrections(&self) -> u64 {
        self.modules.iter().map(ModuleAdapter::drift_corrections).sum()
    }
}

/// Adapters are all registered on the thread passed to [`Drivetrain::new`],
/// so a foreign group means a wiring bug; its period is reported empty.
fn drain_or_empty(batch: &mut DrainBatch<'_>, group: &QueueGroup) -> DrainedGroup {
    batch.drain(group).unwrap_or_else(|e| {
        error!(error = %e, "adapter queues not drained");
        DrainedGroup::default()
    })
}
