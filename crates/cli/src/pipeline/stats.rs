//! Pipeline statistics.

use std::time::Duration;

use drivetrain::{DrivetrainInputs, ModuleAdapter};
use observability::OdometryMetricsAggregator;
use sampler::MetricsSnapshot;

/// Statistics from a pipeline run
#[derive(Debug, Clone, Default)]
pub struct PipelineStats {
    /// Main loop periods completed
    pub periods: u64,

    /// Odometry samples delivered over all adapters
    pub samples: u64,

    /// Queue entries discarded as unmatched
    pub unmatched_samples: u64,

    pub duration: Duration,

    /// Sampler counters at the end of the run
    pub sampler: MetricsSnapshot,

    /// Steering encoder re-seeds over all modules
    pub drift_corrections: u64,

    /// Inputs of the last period
    pub last_inputs: Option<DrivetrainInputs>,

    pub odometry: OdometryMetricsAggregator,
}

impl PipelineStats {
    /// Fold one period into the totals
    pub fn record(&mut self, inputs: &DrivetrainInputs, modules: &[ModuleAdapter]) {
        self.periods += 1;
        self.samples += inputs.sample_count() as u64;
        self.unmatched_samples += inputs.unmatched_samples() as u64;

        for (module, module_inputs) in modules.iter().zip(&inputs.modules) {
            self.odometry.update_module(module.name(), module_inputs);
        }
        self.odometry.update_gyro(&inputs.gyro);
        self.last_inputs = Some(inputs.clone());
    }

    /// Achieved sampling rate (Hz)
    pub fn sample_rate(&self) -> f64 {
        let secs = self.duration.as_secs_f64();
        if secs > 0.0 {
            self.sampler.ticks as f64 / secs
        } else {
            0.0
        }
    }

    /// Print detailed summary
    pub fn print_summary(&self) {
        println!("\n╔══════════════════════════════════════════════════════════════╗");
        println!("║                    Odometry Statistics                       ║");
        println!("╚══════════════════════════════════════════════════════════════╝\n");

        println!("📊 Overview");
        println!("   ├─ Duration: {:.2}s", self.duration.as_secs_f64());
        println!("   ├─ Periods: {}", self.periods);
        println!("   ├─ Samples delivered: {}", self.samples);
        println!("   ├─ Unmatched (dropped): {}", self.unmatched_samples);
        println!("   └─ Drift corrections: {}", self.drift_corrections);

        println!("\n⏱  Sampler");
        println!("   ├─ Ticks: {} ({:.1} Hz)", self.sampler.ticks, self.sample_rate());
        println!(
            "   ├─ Read failures: {} ({:.2}%)",
            self.sampler.read_failures,
            self.sampler.failure_rate() * 100.0
        );
        println!("   └─ Overruns: {}", self.sampler.overruns);

        println!("\n{}", self.odometry.summary());

        if let Some(inputs) = &self.last_inputs {
            println!("🛞 Final module state");
            for (i, module) in inputs.modules.iter().enumerate() {
                println!(
                    "   ├─ [{}] wheel {:.2} rad, steer {:.2}°, absolute {:.2}°",
                    i,
                    module.drive_position_rad,
                    module.turn_position.wrapped().degrees(),
                    module.turn_absolute_position.degrees()
                );
            }
            println!(
                "   └─ yaw {:.2}° (connected: {})",
                inputs.gyro.yaw_position.degrees(),
                inputs.gyro.connected
            );
        }

        println!();
    }
}
