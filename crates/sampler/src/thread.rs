//! Odometry sampling thread
//!
//! Two states, one transition: an [`OdometryThread`] accepts registrations and
//! can be stepped by hand; [`OdometryThread::start`] consumes it and returns a
//! [`RunningOdometryThread`]. There is no way back and no pause.

use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Weak};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use contracts::{Clock, OdometryConfig, SignalId, SignalSource};
use metrics::counter;
use tracing::{debug, error, info, instrument, warn};

use crate::queue::{SampleQueue, Shared, TimestampQueue};
use crate::stats::SamplerMetrics;
use crate::{Result, SamplerError};

const THREAD_NAME: &str = "odometry-sampler";

/// Sampler that has not started yet
///
/// Every signal must be registered here; registration is impossible once the
/// thread is running.
pub struct OdometryThread {
    shared: Arc<Shared>,
    frequency_hz: f64,
    period: Duration,
}

impl OdometryThread {
    /// Create a sampler from the odometry configuration
    ///
    /// # Errors
    /// `InvalidFrequency` when `frequency_hz` gives no usable tick period.
    pub fn new(config: &OdometryConfig, clock: Arc<dyn Clock>) -> Result<Self> {
        Self::with_frequency(config.frequency_hz, clock)
    }

    /// Create a sampler ticking at `frequency_hz`
    ///
    /// # Errors
    /// `InvalidFrequency` unless the tick period is a representable, non-zero
    /// [`Duration`].
    pub fn with_frequency(frequency_hz: f64, clock: Arc<dyn Clock>) -> Result<Self> {
        let period = (frequency_hz.is_finite() && frequency_hz > 0.0)
            .then(|| Duration::try_from_secs_f64(1.0 / frequency_hz).ok())
            .flatten()
            .filter(|period| !period.is_zero())
            .ok_or(SamplerError::InvalidFrequency { frequency_hz })?;

        Ok(Self {
            shared: Arc::new(Shared::new(clock)),
            frequency_hz,
            period,
        })
    }

    /// Register a signal and get the queue its samples land in
    ///
    /// # Errors
    /// `DuplicateSignal` when `id` is already registered.
    #[instrument(
        name = "sampler_register_signal",
        skip(self, id, source),
        fields(signal_id = tracing::field::Empty)
    )]
    pub fn register_signal(
        &mut self,
        id: impl Into<SignalId>,
        source: impl SignalSource + 'static,
    ) -> Result<SampleQueue> {
        let id = id.into();
        tracing::Span::current().record("signal_id", id.as_str());
        self.shared.register(id, Box::new(source))
    }

    /// Create a timestamp queue fed by every tick of this sampler
    pub fn make_timestamp_queue(&mut self) -> TimestampQueue {
        self.shared.add_timestamp_queue()
    }

    /// Run one tick on the calling thread
    pub fn tick(&self) {
        self.shared.tick();
    }

    /// Number of registered signals
    pub fn signal_count(&self) -> usize {
        self.shared.signal_count()
    }

    /// Configured sampling frequency (Hz)
    pub fn frequency_hz(&self) -> f64 {
        self.frequency_hz
    }

    /// Shared counters
    pub fn metrics(&self) -> Arc<SamplerMetrics> {
        self.shared.metrics().clone()
    }

    /// Spawn the background sampling thread
    ///
    /// The thread keeps only a weak reference to the queues: it runs for as
    /// long as any queue handle or the returned handle is alive.
    ///
    /// # Errors
    /// `Spawn` when the OS refuses to create the thread.
    #[instrument(name = "sampler_start", skip(self), fields(frequency_hz = self.frequency_hz))]
    pub fn start(self) -> Result<RunningOdometryThread> {
        let period = self.period;
        let weak = Arc::downgrade(&self.shared);

        let handle = thread::Builder::new()
            .name(THREAD_NAME.to_string())
            .spawn(move || run(weak, period))?;

        info!(
            frequency_hz = self.frequency_hz,
            signals = self.shared.signal_count(),
            "odometry sampler started"
        );

        Ok(RunningOdometryThread {
            shared: self.shared,
            frequency_hz: self.frequency_hz,
            handle,
        })
    }
}

/// Handle to the running sampler
pub struct RunningOdometryThread {
    shared: Arc<Shared>,
    frequency_hz: f64,
    handle: JoinHandle<()>,
}

impl RunningOdometryThread {
    /// Shared counters
    pub fn metrics(&self) -> Arc<SamplerMetrics> {
        self.shared.metrics().clone()
    }

    /// Configured sampling frequency (Hz)
    pub fn frequency_hz(&self) -> f64 {
        self.frequency_hz
    }

    /// Number of registered signals
    pub fn signal_count(&self) -> usize {
        self.shared.signal_count()
    }

    /// `false` once the sampling loop has exited (a source panicked)
    pub fn is_alive(&self) -> bool {
        !self.handle.is_finished()
    }
}

/// Sampling loop with deadline scheduling
///
/// Deadlines advance by exactly one period so sleep jitter does not
/// accumulate. A tick that starts late resynchronises to now instead of
/// bursting to catch up.
fn run(shared: Weak<Shared>, period: Duration) {
    let mut deadline = Instant::now();

    loop {
        let Some(state) = shared.upgrade() else {
            debug!("all queue handles dropped, sampler exiting");
            break;
        };

        if panic::catch_unwind(AssertUnwindSafe(|| state.tick())).is_err() {
            error!("signal source panicked during tick, sampler stopped");
            break;
        }

        deadline += period;
        let now = Instant::now();
        if deadline > now {
            drop(state);
            thread::sleep(deadline - now);
        } else {
            state.metrics().record_overrun();
            counter!("odometry_tick_overruns_total").increment(1);
            warn!(
                late_us = (now - deadline).as_micros() as u64,
                "sampling tick overran its period"
            );
            deadline = now;
        }
    }
}
