//! SignalSource trait - one physical measurement the sampling thread can poll
//!
//! A source is bound to exactly one reading (one wheel's accumulated rotation,
//! one heading reading). The sampling thread owns the boxed source after
//! registration but the hardware it reads stays with the adapter that
//! registered it, typically through a shared `Arc` handle captured by the source.

/// Sensor-reading capability polled once per sampling tick.
///
/// Returns `None` when the read failed (bus timeout, vendor status error).
/// A failed read is not an error: the tick simply records nothing for this
/// source.
///
/// Closures implement this trait directly:
///
/// ```
/// use contracts::SignalSource;
///
/// let source = || Some(1.5);
/// assert_eq!(source.sample(), Some(1.5));
/// ```
pub trait SignalSource: Send {
    /// Read the current value of the signal.
    fn sample(&self) -> Option<f64>;
}

impl<F> SignalSource for F
where
    F: Fn() -> Option<f64> + Send,
{
    #[inline]
    fn sample(&self) -> Option<f64> {
        self()
    }
}

impl SignalSource for Box<dyn SignalSource> {
    #[inline]
    fn sample(&self) -> Option<f64> {
        self.as_ref().sample()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    #[test]
    fn test_closure_source_reports_failure() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = calls.clone();
        let source = move || {
            let n = counter.fetch_add(1, Ordering::Relaxed);
            (n % 2 == 0).then_some(n as f64)
        };

        assert_eq!(source.sample(), Some(0.0));
        assert_eq!(source.sample(), None);
        assert_eq!(source.sample(), Some(2.0));
        assert_eq!(calls.load(Ordering::Relaxed), 3);
    }

    #[test]
    fn test_boxed_source() {
        let boxed: Box<dyn SignalSource> = Box::new(|| Some(-0.25));
        assert_eq!(boxed.sample(), Some(-0.25));
    }
}
