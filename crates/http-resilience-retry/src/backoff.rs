use std::time::Duration;

/// Abstraction for computing the pause between attempts.
///
/// This trait allows for flexible backoff strategies including no delay,
/// fixed delays, exponential backoff, randomized backoff, and custom
/// implementations.
pub trait IntervalFunction: Send + Sync {
    /// Computes the delay before the next attempt.
    ///
    /// # Arguments
    /// * `retry` - The retry number (0-indexed, so the first retry is 0)
    fn next_interval(&self, retry: usize) -> Duration;
}

/// Retry immediately, without pausing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoBackoff;

impl IntervalFunction for NoBackoff {
    fn next_interval(&self, _retry: usize) -> Duration {
        Duration::ZERO
    }
}

/// Fixed interval backoff - returns the same duration for every retry.
#[derive(Debug, Clone)]
pub struct FixedInterval {
    duration: Duration,
}

impl FixedInterval {
    /// Creates a new fixed interval backoff.
    pub fn new(duration: Duration) -> Self {
        Self { duration }
    }
}

impl IntervalFunction for FixedInterval {
    fn next_interval(&self, _retry: usize) -> Duration {
        self.duration
    }
}

/// Exponential backoff with configurable multiplier.
#[derive(Debug, Clone)]
pub struct ExponentialBackoff {
    initial_interval: Duration,
    multiplier: f64,
    max_interval: Option<Duration>,
}

impl ExponentialBackoff {
    /// Creates a new exponential backoff with default multiplier of 2.0.
    pub fn new(initial_interval: Duration) -> Self {
        Self {
            initial_interval,
            multiplier: 2.0,
            max_interval: None,
        }
    }

    /// Sets the multiplier for exponential growth.
    ///
    /// Negative and NaN multipliers are treated as zero.
    pub fn multiplier(mut self, multiplier: f64) -> Self {
        self.multiplier = multiplier.max(0.0);
        self
    }

    /// Sets the maximum interval to cap exponential growth.
    pub fn max_interval(mut self, max_interval: Duration) -> Self {
        self.max_interval = Some(max_interval);
        self
    }
}

impl IntervalFunction for ExponentialBackoff {
    fn next_interval(&self, retry: usize) -> Duration {
        let interval = grow(self.initial_interval, self.multiplier, retry);
        cap(interval, self.max_interval)
    }
}

/// Exponential backoff with randomization to prevent thundering herd.
#[derive(Debug, Clone)]
pub struct ExponentialRandomBackoff {
    initial_interval: Duration,
    multiplier: f64,
    randomization_factor: f64,
    max_interval: Option<Duration>,
}

impl ExponentialRandomBackoff {
    /// Creates a new exponential random backoff.
    ///
    /// # Arguments
    /// * `initial_interval` - The base interval
    /// * `randomization_factor` - Factor for randomization (0.0 to 1.0).
    ///   A factor of 0.5 spreads each interval between 50% and 150% of the
    ///   calculated value.
    pub fn new(initial_interval: Duration, randomization_factor: f64) -> Self {
        Self {
            initial_interval,
            multiplier: 2.0,
            randomization_factor: if randomization_factor.is_nan() {
                0.0
            } else {
                randomization_factor.clamp(0.0, 1.0)
            },
            max_interval: None,
        }
    }

    /// Sets the multiplier for exponential growth.
    ///
    /// Negative and NaN multipliers are treated as zero.
    pub fn multiplier(mut self, multiplier: f64) -> Self {
        self.multiplier = multiplier.max(0.0);
        self
    }

    /// Sets the maximum interval to cap exponential growth.
    pub fn max_interval(mut self, max_interval: Duration) -> Self {
        self.max_interval = Some(max_interval);
        self
    }

    fn randomize(&self, duration: Duration) -> Duration {
        use rand::Rng;

        let delta = duration.as_secs_f64() * self.randomization_factor;
        if delta <= 0.0 {
            return duration;
        }
        let min = duration.as_secs_f64() - delta;
        let max = duration.as_secs_f64() + delta;
        let randomized = rand::rng().random_range(min..=max);
        Duration::try_from_secs_f64(randomized.max(0.0)).unwrap_or(Duration::MAX)
    }
}

impl IntervalFunction for ExponentialRandomBackoff {
    fn next_interval(&self, retry: usize) -> Duration {
        let interval = grow(self.initial_interval, self.multiplier, retry);
        self.randomize(cap(interval, self.max_interval))
    }
}

/// Function-based interval implementation.
pub struct FnInterval<F> {
    f: F,
}

impl<F> FnInterval<F>
where
    F: Fn(usize) -> Duration + Send + Sync,
{
    /// Creates a new function-based interval.
    pub fn new(f: F) -> Self {
        Self { f }
    }
}

impl<F> IntervalFunction for FnInterval<F>
where
    F: Fn(usize) -> Duration + Send + Sync,
{
    fn next_interval(&self, retry: usize) -> Duration {
        (self.f)(retry)
    }
}

fn grow(initial: Duration, multiplier: f64, retry: usize) -> Duration {
    let exponent = i32::try_from(retry).unwrap_or(i32::MAX);
    let factor = multiplier.powi(exponent);
    if !factor.is_finite() {
        return Duration::MAX;
    }
    Duration::try_from_secs_f64(initial.as_secs_f64() * factor).unwrap_or(Duration::MAX)
}

fn cap(interval: Duration, max: Option<Duration>) -> Duration {
    match max {
        Some(max) => interval.min(max),
        None => interval,
    }
}
