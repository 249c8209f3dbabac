//! Logical clock utilities for frame-driven processing.
//!
//! Nothing in the processing path reads the wall clock: time advances only
//! through the millisecond timestamps attached to delivered frames. This
//! keeps every timer deterministic under test.

/// Milliseconds to seconds.
pub fn ms_to_secs(ms: f64) -> f64 {
    ms / 1000.0
}

/// Current wall-clock time as an RFC 3339 string, used to stamp records.
pub fn wall_clock_rfc3339() -> String {
    chrono::Utc::now().to_rfc3339()
}

/// Anchors a run to the timestamp of its first frame.
#[derive(Debug, Clone, Default)]
pub struct RunClock {
    start_ms: Option<f64>,
}

impl RunClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Time relative to the first observed timestamp. The first call anchors
    /// the clock and returns 0.
    pub fn relative_ms(&mut self, timestamp_ms: f64) -> f64 {
        let start = *self.start_ms.get_or_insert(timestamp_ms);
        timestamp_ms - start
    }

    /// Anchor timestamp, if any frame has been observed.
    pub fn start_ms(&self) -> Option<f64> {
        self.start_ms
    }

    pub fn reset(&mut self) {
        self.start_ms = None;
    }
}

/// A one-shot action scheduled at a logical time.
///
/// The owner polls it with the current frame time; it fires at most once
/// per schedule and can be cancelled before it fires.
#[derive(Debug, Clone, Default)]
pub struct Deadline {
    due_ms: Option<f64>,
}

impl Deadline {
    pub fn new() -> Self {
        Self::default()
    }

    /// Schedule (or reschedule) the deadline.
    pub fn schedule(&mut self, due_ms: f64) {
        self.due_ms = Some(due_ms);
    }

    /// Drop the pending deadline without firing it.
    pub fn cancel(&mut self) {
        self.due_ms = None;
    }

    pub fn is_pending(&self) -> bool {
        self.due_ms.is_some()
    }

    pub fn due_ms(&self) -> Option<f64> {
        self.due_ms
    }

    /// Returns true exactly once, on the first poll at or after the due time.
    pub fn poll(&mut self, now_ms: f64) -> bool {
        match self.due_ms {
            Some(due) if now_ms >= due => {
                self.due_ms = None;
                true
            }
            _ => false,
        }
    }
}

/// Frame rate limiter for analysis.
#[derive(Debug)]
pub struct RateController {
    target_interval_ms: f64,
    last_tick_ms: Option<f64>,
}

impl RateController {
    /// Create a controller admitting at most `target_hz` frames per second.
    /// A rate of 0 admits every frame.
    pub fn new(target_hz: u32) -> Self {
        let target_interval_ms = if target_hz == 0 {
            0.0
        } else {
            1000.0 / target_hz as f64
        };
        Self {
            target_interval_ms,
            last_tick_ms: None,
        }
    }

    /// Check if enough time has passed for the next tick.
    /// Returns true and updates internal state if ready.
    /// The first call always returns true.
    pub fn should_tick(&mut self, current_ms: f64) -> bool {
        match self.last_tick_ms {
            None => {
                self.last_tick_ms = Some(current_ms);
                true
            }
            Some(last) if current_ms >= last + self.target_interval_ms => {
                self.last_tick_ms = Some(current_ms);
                true
            }
            _ => false,
        }
    }

    /// Target interval in milliseconds.
    pub fn interval_ms(&self) -> f64 {
        self.target_interval_ms
    }

    pub fn reset(&mut self) {
        self.last_tick_ms = None;
    }
}
