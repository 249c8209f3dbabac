//! Streaming smoothing and differentiation filters.
//!
//! Pose landmarks jitter by a few pixels from frame to frame. Speeds derived
//! from raw positions amplify that noise, so the sprint chain smooths twice:
//! once on position, once on the resulting speed.
//!
//! Each filter owns its window exclusively; nothing here is shared between
//! test runs.

use std::collections::VecDeque;

use athletrack_common::clock::ms_to_secs;
use athletrack_model::geometry::Point2D;
use athletrack_model::result::SpeedSample;

/// Bounded-window moving average over a scalar stream.
#[derive(Debug, Clone)]
pub struct MovingAverage {
    window: usize,
    samples: VecDeque<f64>,
}

impl MovingAverage {
    /// Create a filter averaging the last `window` samples (minimum 1).
    pub fn new(window: usize) -> Self {
        let window = window.max(1);
        Self {
            window,
            samples: VecDeque::with_capacity(window + 1),
        }
    }

    /// Append a sample and return the mean of the current window.
    pub fn add_value(&mut self, value: f64) -> f64 {
        self.samples.push_back(value);
        while self.samples.len() > self.window {
            self.samples.pop_front();
        }
        self.samples.iter().sum::<f64>() / self.samples.len() as f64
    }

    /// Mean of the current window, if any sample has been added.
    pub fn current(&self) -> Option<f64> {
        if self.samples.is_empty() {
            return None;
        }
        Some(self.samples.iter().sum::<f64>() / self.samples.len() as f64)
    }

    pub fn window(&self) -> usize {
        self.window
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn reset(&mut self) {
        self.samples.clear();
    }
}

/// Independent moving averages over x and y.
#[derive(Debug, Clone)]
pub struct PositionSmoother {
    x: MovingAverage,
    y: MovingAverage,
}

impl PositionSmoother {
    pub fn new(window: usize) -> Self {
        Self {
            x: MovingAverage::new(window),
            y: MovingAverage::new(window),
        }
    }

    pub fn add(&mut self, position: Point2D) -> Point2D {
        Point2D::new(self.x.add_value(position.x), self.y.add_value(position.y))
    }

    pub fn reset(&mut self) {
        self.x.reset();
        self.y.reset();
    }
}

/// Position → speed derivation with smoothing at both stages.
///
/// Speeds are in position units per second (timestamps are milliseconds).
#[derive(Debug, Clone)]
pub struct SpeedTracker {
    position: PositionSmoother,
    speed: MovingAverage,
    previous: Option<(f64, Point2D)>,
    max_speed: f64,
    history: Vec<SpeedSample>,
}

impl SpeedTracker {
    pub fn new(position_window: usize, speed_window: usize) -> Self {
        Self {
            position: PositionSmoother::new(position_window),
            speed: MovingAverage::new(speed_window),
            previous: None,
            max_speed: 0.0,
            history: vec![],
        }
    }

    /// Feed a raw position and return the smoothed speed.
    ///
    /// The first sample only primes the tracker and reports 0. A sample whose
    /// timestamp does not advance contributes an instantaneous speed of 0.
    pub fn add_sample(&mut self, position: Point2D, timestamp_ms: f64) -> f64 {
        let smoothed_position = self.position.add(position);

        let smoothed_speed = match self.previous {
            None => 0.0,
            Some((prev_ms, prev_position)) => {
                let elapsed_secs = ms_to_secs(timestamp_ms - prev_ms);
                let instantaneous = if elapsed_secs > 0.0 {
                    smoothed_position.distance_to(&prev_position) / elapsed_secs
                } else {
                    0.0
                };
                self.speed.add_value(instantaneous)
            }
        };

        self.previous = Some((timestamp_ms, smoothed_position));
        self.max_speed = self.max_speed.max(smoothed_speed);
        self.history.push(SpeedSample {
            timestamp_ms,
            speed: smoothed_speed,
            position: smoothed_position,
        });

        smoothed_speed
    }

    pub fn max_speed(&self) -> f64 {
        self.max_speed
    }

    /// Latest smoothed speed (0 before any speed was derived).
    pub fn current_speed(&self) -> f64 {
        self.speed.current().unwrap_or(0.0)
    }

    pub fn history(&self) -> &[SpeedSample] {
        &self.history
    }

    pub fn reset(&mut self) {
        self.position.reset();
        self.speed.reset();
        self.previous = None;
        self.max_speed = 0.0;
        self.history.clear();
    }
}

/// Two-point finite-difference acceleration over a bounded speed history.
///
/// Acceleration is reported in speed units per millisecond.
#[derive(Debug, Clone)]
pub struct AccelerationEstimator {
    capacity: usize,
    samples: VecDeque<(f64, f64)>,
}

impl AccelerationEstimator {
    /// Keep at most `capacity` samples (minimum 2).
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(2);
        Self {
            capacity,
            samples: VecDeque::with_capacity(capacity + 1),
        }
    }

    /// Record a `(speed, timestamp)` pair and return the updated acceleration.
    pub fn add_sample(&mut self, speed: f64, timestamp_ms: f64) -> f64 {
        self.samples.push_back((speed, timestamp_ms));
        while self.samples.len() > self.capacity {
            self.samples.pop_front();
        }
        self.acceleration()
    }

    /// Difference of the two most recent samples over their elapsed time.
    /// 0 with fewer than two samples or non-positive elapsed time.
    pub fn acceleration(&self) -> f64 {
        let n = self.samples.len();
        if n < 2 {
            return 0.0;
        }
        let (s1, t1) = self.samples[n - 2];
        let (s2, t2) = self.samples[n - 1];
        let elapsed = t2 - t1;
        if elapsed <= 0.0 {
            return 0.0;
        }
        (s2 - s1) / elapsed
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn reset(&mut self) {
        self.samples.clear();
    }
}

/// Bounds of a centered window at `i`, shrunk at the array edges. An even
/// window leans one sample ahead of `i`.
fn centered_bounds(i: usize, len: usize, window: usize) -> (usize, usize) {
    let start = i.saturating_sub((window - 1) / 2);
    let end = (i + window / 2 + 1).min(len);
    (start, end)
}

/// Centered moving average. The window shrinks at the array boundaries.
pub fn centered_moving_average(values: &[f64], window: usize) -> Vec<f64> {
    if values.is_empty() || window <= 1 {
        return values.to_vec();
    }

    (0..values.len())
        .map(|i| {
            let (start, end) = centered_bounds(i, values.len(), window);
            values[start..end].iter().sum::<f64>() / (end - start) as f64
        })
        .collect()
}

/// Exponential smoothing: `s[i] = α·x[i] + (1 − α)·s[i−1]`, `s[0] = x[0]`.
///
/// `alpha` is clamped into `(0, 1]`; 1 passes the input through.
pub fn exponential_smoothing(values: &[f64], alpha: f64) -> Vec<f64> {
    let Some(&first) = values.first() else {
        return vec![];
    };
    let alpha = if alpha.is_nan() {
        1.0
    } else {
        alpha.clamp(f64::EPSILON, 1.0)
    };

    let mut result = Vec::with_capacity(values.len());
    let mut prev = first;
    result.push(first);
    for &value in &values[1..] {
        prev = alpha * value + (1.0 - alpha) * prev;
        result.push(prev);
    }
    result
}

/// Centered median filter. The window shrinks at the array boundaries; an
/// even-sized window takes the mean of the two middle values.
pub fn median_filter(values: &[f64], window: usize) -> Vec<f64> {
    if values.is_empty() || window <= 1 {
        return values.to_vec();
    }

    let mut scratch = Vec::with_capacity(window);
    (0..values.len())
        .map(|i| {
            let (start, end) = centered_bounds(i, values.len(), window);
            scratch.clear();
            scratch.extend_from_slice(&values[start..end]);
            scratch.sort_by(|a, b| a.total_cmp(b));
            let mid = scratch.len() / 2;
            if scratch.len() % 2 == 0 {
                (scratch[mid - 1] + scratch[mid]) / 2.0
            } else {
                scratch[mid]
            }
        })
        .collect()
}
