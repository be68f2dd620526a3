use std::time::{Duration, Instant};

/// Trailing-edge debouncer driven by caller-supplied clock readings.
///
/// A new value restarts the quiet window and replaces whatever was pending;
/// nothing queues behind it.
#[derive(Debug, Clone)]
pub struct Debouncer<T> {
    delay: Duration,
    pending: Option<(T, Instant)>,
}

impl<T> Debouncer<T> {
    pub fn new(delay: Duration) -> Self {
        Debouncer {
            delay,
            pending: None,
        }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    pub fn push(&mut self, value: T, now: Instant) {
        self.pending = Some((value, now + self.delay));
    }

    /// The pending value once its window has elapsed.
    pub fn poll(&mut self, now: Instant) -> Option<T> {
        let due = matches!(self.pending, Some((_, deadline)) if now >= deadline);
        if due {
            self.flush()
        } else {
            None
        }
    }

    /// When the pending value becomes due, if any.
    pub fn deadline(&self) -> Option<Instant> {
        self.pending.as_ref().map(|(_, d)| *d)
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Take the pending value without waiting.
    pub fn flush(&mut self) -> Option<T> {
        self.pending.take().map(|(v, _)| v)
    }

    pub fn cancel(&mut self) {
        self.pending = None;
    }
}
