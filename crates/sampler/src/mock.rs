//! Scripted signal source
//!
//! For tests and bench runs without hardware. Clones share one script, so a
//! test keeps a clone to steer the source after handing it to the sampler.

use std::sync::{Arc, Mutex, PoisonError};

use contracts::SignalSource;
use tracing::trace;

#[derive(Debug, Default)]
struct Script {
    value: f64,
    step: f64,
    fail_next: u32,
    fail_every: Option<u64>,
    reads: u64,
}

/// Signal source producing a ramp with injectable read failures
#[derive(Debug, Clone, Default)]
pub struct ScriptedSignal {
    script: Arc<Mutex<Script>>,
}

impl ScriptedSignal {
    /// Source that always reports `value`
    pub fn constant(value: f64) -> Self {
        Self::ramp(value, 0.0)
    }

    /// Source reporting `start`, `start + step`, `start + 2*step`, ...
    ///
    /// The ramp advances on every read attempt, failed or not, the way an
    /// encoder keeps counting while the bus is down.
    pub fn ramp(start: f64, step: f64) -> Self {
        Self {
            script: Arc::new(Mutex::new(Script {
                value: start,
                step,
                ..Default::default()
            })),
        }
    }

    /// Fail the next `count` reads
    pub fn fail_next(&self, count: u32) {
        self.with_script(|s| s.fail_next += count);
    }

    /// Fail every `n`-th read (1-based); `None` disables
    pub fn fail_every(&self, n: Option<u64>) {
        self.with_script(|s| s.fail_every = n.filter(|&n| n > 0));
    }

    /// Jump to a new value, keeping the step
    pub fn set_value(&self, value: f64) {
        self.with_script(|s| s.value = value);
    }

    /// Read attempts so far
    pub fn reads(&self) -> u64 {
        self.with_script(|s| s.reads)
    }

    fn with_script<R>(&self, f: impl FnOnce(&mut Script) -> R) -> R {
        let mut script = self.script.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut script)
    }
}

impl SignalSource for ScriptedSignal {
    fn sample(&self) -> Option<f64> {
        self.with_script(|s| {
            s.reads += 1;
            let value = s.value;
            s.value += s.step;

            let scheduled = s.fail_every.is_some_and(|n| s.reads % n == 0);
            if s.fail_next > 0 {
                s.fail_next -= 1;
                trace!(reads = s.reads, "scripted failure");
                None
            } else if scheduled {
                trace!(reads = s.reads, "scheduled failure");
                None
            } else {
                Some(value)
            }
        })
    }
}
