//! Sample queues, timestamp queues and the shared tick state
//!
//! Every queue of one sampler instance lives in a single [`TickState`] behind
//! one mutex. A tick and a drain therefore never interleave: a drain observes
//! either all of a tick or none of it.

use std::fmt;
use std::mem;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Instant;

use contracts::{Clock, SignalId, SignalSource};
use metrics::counter;
use tracing::{debug, trace};

use crate::stats::SamplerMetrics;
use crate::{Result, SamplerError};

struct RegisteredSignal {
    id: SignalId,
    source: Box<dyn SignalSource>,
    queue: Vec<f64>,
}

/// All mutable sampler state, guarded as one unit
#[derive(Default)]
struct TickState {
    timestamps: Vec<Vec<f64>>,
    signals: Vec<RegisteredSignal>,
}

/// State shared by the sampling thread and every queue handle
pub(crate) struct Shared {
    state: Mutex<TickState>,
    clock: Arc<dyn Clock>,
    metrics: Arc<SamplerMetrics>,
}

impl Shared {
    pub(crate) fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            state: Mutex::new(TickState::default()),
            clock,
            metrics: Arc::new(SamplerMetrics::new()),
        }
    }

    /// A panicking source poisons the mutex mid-tick. Queued data is still
    /// consistent per entry, so consumers keep draining.
    fn lock(&self) -> MutexGuard<'_, TickState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn metrics(&self) -> &Arc<SamplerMetrics> {
        &self.metrics
    }

    pub(crate) fn signal_count(&self) -> usize {
        self.lock().signals.len()
    }

    pub(crate) fn register(
        self: &Arc<Self>,
        id: SignalId,
        source: Box<dyn SignalSource>,
    ) -> Result<SampleQueue> {
        let mut state = self.lock();
        if state.signals.iter().any(|s| s.id == id) {
            return Err(SamplerError::DuplicateSignal { signal_id: id });
        }

        let index = state.signals.len();
        state.signals.push(RegisteredSignal {
            id: id.clone(),
            source,
            queue: Vec::new(),
        });
        debug!(signal_id = %id, index, "registered signal");

        Ok(SampleQueue {
            shared: self.clone(),
            index,
            id,
        })
    }

    pub(crate) fn add_timestamp_queue(self: &Arc<Self>) -> TimestampQueue {
        let mut state = self.lock();
        let index = state.timestamps.len();
        state.timestamps.push(Vec::new());
        debug!(index, "created timestamp queue");

        TimestampQueue {
            shared: self.clone(),
            index,
        }
    }

    /// One atomic tick: a timestamp for every timestamp queue, then one read
    /// per source in registration order.
    pub(crate) fn tick(&self) {
        let started = Instant::now();
        let mut recorded = 0u64;
        let mut failed = 0u64;

        {
            let mut guard = self.lock();
            let state = &mut *guard;
            let timestamp = self.clock.now();

            for queue in &mut state.timestamps {
                queue.push(timestamp);
            }

            for signal in &mut state.signals {
                match signal.source.sample() {
                    Some(value) => {
                        signal.queue.push(value);
                        recorded += 1;
                    }
                    None => {
                        failed += 1;
                        trace!(signal_id = %signal.id, timestamp, "signal read failed");
                        counter!(
                            "odometry_read_failures_total",
                            "signal" => signal.id.to_string()
                        )
                        .increment(1);
                    }
                }
            }
        }

        counter!("odometry_ticks_total").increment(1);
        self.metrics
            .record_tick(recorded, failed, started.elapsed().as_micros() as u64);
    }
}

/// Consumer handle for one registered signal
///
/// Only obtainable from [`crate::OdometryThread::register_signal`].
pub struct SampleQueue {
    shared: Arc<Shared>,
    index: usize,
    id: SignalId,
}

impl SampleQueue {
    /// Signal id given at registration
    pub fn id(&self) -> &SignalId {
        &self.id
    }

    /// Remove and return every value sampled since the previous drain, oldest first
    pub fn drain(&self) -> Vec<f64> {
        mem::take(&mut self.shared.lock().signals[self.index].queue)
    }

    /// Number of values waiting
    pub fn len(&self) -> usize {
        self.shared.lock().signals[self.index].queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl fmt::Debug for SampleQueue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SampleQueue")
            .field("id", &self.id)
            .field("index", &self.index)
            .finish()
    }
}

/// Consumer handle receiving the timestamp of every tick
///
/// Each consumer gets its own handle so draining one never starves another;
/// all handles of one sampler see identical timestamps.
pub struct TimestampQueue {
    shared: Arc<Shared>,
    index: usize,
}

impl TimestampQueue {
    /// Remove and return every tick timestamp since the previous drain, oldest first
    pub fn drain(&self) -> Vec<f64> {
        mem::take(&mut self.shared.lock().timestamps[self.index])
    }

    /// Number of timestamps waiting
    pub fn len(&self) -> usize {
        self.shared.lock().timestamps[self.index].len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl fmt::Debug for TimestampQueue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TimestampQueue")
            .field("index", &self.index)
            .finish()
    }
}

/// A timestamp queue and the sample queues read alongside it
///
/// Draining the group takes the sampler lock once, so no tick can land
/// between the timestamp drain and the sample drains.
#[derive(Debug)]
pub struct QueueGroup {
    timestamps: TimestampQueue,
    signals: Vec<SampleQueue>,
}

impl QueueGroup {
    /// Bundle queues of the same sampler instance
    ///
    /// # Errors
    /// `ForeignQueue` when a sample queue was registered on another sampler.
    pub fn new(timestamps: TimestampQueue, signals: Vec<SampleQueue>) -> Result<Self> {
        if let Some(foreign) = signals
            .iter()
            .find(|q| !Arc::ptr_eq(&q.shared, &timestamps.shared))
        {
            return Err(SamplerError::ForeignQueue {
                signal_id: foreign.id.clone(),
            });
        }

        Ok(Self {
            timestamps,
            signals,
        })
    }

    /// Drain every queue of the group under a single lock acquisition
    pub fn drain(&self) -> DrainedGroup {
        self.drain_with(|| ()).0
    }

    /// Drain the group, then run `f` before the lock is released
    ///
    /// Ticks are held off while `f` runs, so anything `f` changes on the
    /// hardware is seen by the first sample of the next drain and by none of
    /// this one. `f` must not touch any sampler queue.
    pub fn drain_with<R>(&self, f: impl FnOnce() -> R) -> (DrainedGroup, R) {
        let mut batch = self.batch();
        let drained = batch.take(self);
        (drained, f())
    }

    /// Hold the sampler lock to drain several groups against the same ticks
    ///
    /// No tick runs until the returned batch is dropped.
    pub fn batch(&self) -> DrainBatch<'_> {
        let shared = &self.timestamps.shared;
        DrainBatch {
            shared,
            state: shared.lock(),
        }
    }

    /// `true` when both groups are fed by the same sampler
    pub fn same_sampler(&self, other: &QueueGroup) -> bool {
        Arc::ptr_eq(&self.timestamps.shared, &other.timestamps.shared)
    }

    /// Ids of the grouped signals, in group order
    pub fn signal_ids(&self) -> impl Iterator<Item = &SignalId> {
        self.signals.iter().map(|q| &q.id)
    }
}

/// Sampler lock held across the drains of several groups
///
/// Every group drained through one batch sees exactly the same ticks.
pub struct DrainBatch<'a> {
    shared: &'a Arc<Shared>,
    state: MutexGuard<'a, TickState>,
}

impl DrainBatch<'_> {
    /// Drain `group` under the held lock
    ///
    /// # Errors
    /// `ForeignQueue` when `group` belongs to another sampler.
    pub fn drain(&mut self, group: &QueueGroup) -> Result<DrainedGroup> {
        if !Arc::ptr_eq(self.shared, &group.timestamps.shared) {
            return Err(SamplerError::ForeignQueue {
                signal_id: group
                    .signals
                    .first()
                    .map(|q| q.id.clone())
                    .unwrap_or_default(),
            });
        }
        Ok(self.take(group))
    }

    fn take(&mut self, group: &QueueGroup) -> DrainedGroup {
        let state = &mut *self.state;
        DrainedGroup {
            timestamps: mem::take(&mut state.timestamps[group.timestamps.index]),
            samples: group
                .signals
                .iter()
                .map(|q| mem::take(&mut state.signals[q.index].queue))
                .collect(),
        }
    }
}

impl fmt::Debug for DrainBatch<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DrainBatch").finish_non_exhaustive()
    }
}

/// Result of [`QueueGroup::drain`]
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DrainedGroup {
    /// Tick timestamps, oldest first
    pub timestamps: Vec<f64>,

    /// One vector per grouped signal, in group order
    pub samples: Vec<Vec<f64>>,
}

impl DrainedGroup {
    /// Length of the prefix present in every queue
    pub fn matched_len(&self) -> usize {
        self.samples
            .iter()
            .map(Vec::len)
            .fold(self.timestamps.len(), usize::min)
    }

    /// Entries beyond the matched prefix, summed over all queues
    pub fn unmatched(&self) -> usize {
        let matched = self.matched_len();
        let total: usize =
            self.timestamps.len() + self.samples.iter().map(Vec::len).sum::<usize>();
        total - matched * (1 + self.samples.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::OdometryThread;
    use contracts::ManualClock;

    fn thread() -> OdometryThread {
        OdometryThread::with_frequency(200.0, Arc::new(ManualClock::new(0.0))).unwrap()
    }

    #[test]
    fn test_group_drains_together() {
        let mut thread = thread();
        let ts = thread.make_timestamp_queue();
        let a = thread.register_signal("a", || Some(1.0)).unwrap();
        let b = thread.register_signal("b", || Some(2.0)).unwrap();
        let group = QueueGroup::new(ts, vec![a, b]).unwrap();

        thread.tick();
        thread.tick();

        let drained = group.drain();
        assert_eq!(drained.timestamps.len(), 2);
        assert_eq!(drained.samples, vec![vec![1.0, 1.0], vec![2.0, 2.0]]);
        assert_eq!(drained.unmatched(), 0);
        assert_eq!(
            group.drain(),
            DrainedGroup {
                timestamps: vec![],
                samples: vec![vec![], vec![]],
            }
        );
    }

    #[test]
    fn test_group_rejects_foreign_queue() {
        let mut first = thread();
        let mut second = thread();
        let ts = first.make_timestamp_queue();
        let foreign = second.register_signal("other", || Some(0.0)).unwrap();

        let err = QueueGroup::new(ts, vec![foreign]).unwrap_err();
        assert!(matches!(err, SamplerError::ForeignQueue { .. }));
    }

    #[test]
    fn test_matched_len_and_unmatched() {
        let drained = DrainedGroup {
            timestamps: vec![0.0, 0.005, 0.010, 0.015],
            samples: vec![vec![1.0, 2.0, 3.0], vec![4.0, 5.0, 6.0, 7.0]],
        };
        assert_eq!(drained.matched_len(), 3);
        // one timestamp + one turn sample beyond the prefix
        assert_eq!(drained.unmatched(), 2);
    }

    #[test]
    fn test_batch_drains_groups_against_same_ticks() {
        let mut thread = thread();
        let first = QueueGroup::new(
            thread.make_timestamp_queue(),
            vec![thread.register_signal("a", || Some(1.0)).unwrap()],
        )
        .unwrap();
        let second = QueueGroup::new(
            thread.make_timestamp_queue(),
            vec![thread.register_signal("b", || Some(2.0)).unwrap()],
        )
        .unwrap();
        assert!(first.same_sampler(&second));

        thread.tick();
        thread.tick();

        let mut batch = first.batch();
        let a = batch.drain(&first).unwrap();
        let b = batch.drain(&second).unwrap();
        drop(batch);

        assert_eq!(a.timestamps, b.timestamps);
        assert_eq!(a.samples, vec![vec![1.0, 1.0]]);
        assert_eq!(b.samples, vec![vec![2.0, 2.0]]);
        assert!(second.drain().timestamps.is_empty());
    }

    #[test]
    fn test_batch_rejects_group_of_other_sampler() {
        let mut first = thread();
        let mut second = thread();
        let ours = QueueGroup::new(first.make_timestamp_queue(), vec![]).unwrap();
        let theirs = QueueGroup::new(
            second.make_timestamp_queue(),
            vec![second.register_signal("other", || Some(0.0)).unwrap()],
        )
        .unwrap();
        assert!(!ours.same_sampler(&theirs));

        let err = ours.batch().drain(&theirs).unwrap_err();
        assert!(matches!(err, SamplerError::ForeignQueue { .. }));
    }

    #[test]
    fn test_timestamp_queues_are_independent() {
        let mut thread = thread();
        let first = thread.make_timestamp_queue();
        let second = thread.make_timestamp_queue();

        thread.tick();
        assert_eq!(first.drain().len(), 1);
        assert_eq!(second.len(), 1);
        assert!(first.is_empty());
    }
}
