use std::sync::Mutex;
use std::time::{Duration, Instant};

/// Source of "now" for progress throttling.
pub trait Clock: Send + Sync {
    fn now(&self) -> Instant;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// Clock that only moves when told to. Used to drive throttling deterministically.
#[derive(Debug)]
pub struct ManualClock {
    current: Mutex<Instant>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::starting_at(Instant::now())
    }

    pub fn starting_at(start: Instant) -> Self {
        Self {
            current: Mutex::new(start),
        }
    }

    pub fn advance(&self, by: Duration) {
        let mut current = self.current.lock().unwrap_or_else(|e| e.into_inner());
        *current += by;
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        *self.current.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// Returns true when at least `min_interval` has passed between `last_emit` and `now`.
///
/// A zero interval disables throttling. A `now` earlier than `last_emit` never passes.
pub fn can_emit(last_emit: Instant, now: Instant, min_interval: Duration) -> bool {
    if min_interval.is_zero() {
        return true;
    }

    match now.checked_duration_since(last_emit) {
        Some(elapsed) => elapsed >= min_interval,
        None => false,
    }
}

/// Throttle window of a single file transfer.
#[derive(Debug, Clone, Copy)]
pub struct ThrottleState {
    last_emit: Instant,
}

impl ThrottleState {
    pub fn new(started_at: Instant) -> Self {
        Self {
            last_emit: started_at,
        }
    }

    pub fn last_emit(&self) -> Instant {
        self.last_emit
    }

    /// Opens the gate for `now` if the window has elapsed, recording the emission.
    pub fn try_emit(&mut self, now: Instant, min_interval: Duration) -> bool {
        if !can_emit(self.last_emit, now, min_interval) {
            return false;
        }
        // never move backwards, even with a zero interval
        if now > self.last_emit {
            self.last_emit = now;
        }
        true
    }
}
