use std::time::Duration;

/// Computes the wait before the next attempt.
///
/// Implement this for custom strategies, or use [`FnInterval`] for a closure.
pub trait IntervalFunction: Send + Sync {
    /// Delay before retry number `retry` (0-indexed: the first retry is 0).
    fn next_interval(&self, retry: usize) -> Duration;
}

/// Same delay before every retry.
#[derive(Debug, Clone)]
pub struct FixedInterval {
    duration: Duration,
}

impl FixedInterval {
    /// Creates a fixed interval backoff.
    pub fn new(duration: Duration) -> Self {
        Self { duration }
    }
}

impl IntervalFunction for FixedInterval {
    fn next_interval(&self, _retry: usize) -> Duration {
        self.duration
    }
}

/// `initial * multiplier^retry`, optionally capped.
#[derive(Debug, Clone)]
pub struct ExponentialBackoff {
    initial_interval: Duration,
    multiplier: f64,
    max_interval: Option<Duration>,
}

impl ExponentialBackoff {
    /// Creates an exponential backoff with a multiplier of 2.0 and no cap.
    pub fn new(initial_interval: Duration) -> Self {
        Self {
            initial_interval,
            multiplier: 2.0,
            max_interval: None,
        }
    }

    /// Sets the growth factor.
    pub fn multiplier(mut self, multiplier: f64) -> Self {
        self.multiplier = multiplier;
        self
    }

    /// Caps the interval.
    pub fn max_interval(mut self, max_interval: Duration) -> Self {
        self.max_interval = Some(max_interval);
        self
    }

    fn uncapped(&self, retry: usize) -> Duration {
        grow(self.initial_interval, self.multiplier, retry)
    }
}

impl IntervalFunction for ExponentialBackoff {
    fn next_interval(&self, retry: usize) -> Duration {
        cap(self.uncapped(retry), self.max_interval)
    }
}

/// Exponential backoff with jitter, so that callers failing together do not
/// retry together.
#[derive(Debug, Clone)]
pub struct ExponentialRandomBackoff {
    exponential: ExponentialBackoff,
    randomization_factor: f64,
}

impl ExponentialRandomBackoff {
    /// Creates a randomized exponential backoff.
    ///
    /// A `randomization_factor` of 0.5 spreads each interval uniformly over
    /// 50%..150% of the exponential value. The factor is clamped to `0.0..=1.0`.
    pub fn new(initial_interval: Duration, randomization_factor: f64) -> Self {
        Self {
            exponential: ExponentialBackoff::new(initial_interval),
            randomization_factor: randomization_factor.clamp(0.0, 1.0),
        }
    }

    /// Sets the growth factor.
    pub fn multiplier(mut self, multiplier: f64) -> Self {
        self.exponential = self.exponential.multiplier(multiplier);
        self
    }

    /// Caps the interval before jitter is applied.
    pub fn max_interval(mut self, max_interval: Duration) -> Self {
        self.exponential = self.exponential.max_interval(max_interval);
        self
    }

    fn randomize(&self, duration: Duration) -> Duration {
        use rand::Rng;

        let base = duration.as_secs_f64();
        let delta = base * self.randomization_factor;
        if delta <= 0.0 {
            return duration;
        }
        let randomized = rand::rng().random_range((base - delta)..=(base + delta));
        Duration::try_from_secs_f64(randomized.max(0.0)).unwrap_or(Duration::MAX)
    }
}

impl IntervalFunction for ExponentialRandomBackoff {
    fn next_interval(&self, retry: usize) -> Duration {
        self.randomize(self.exponential.next_interval(retry))
    }
}

/// Backoff computed by a closure.
pub struct FnInterval<F> {
    f: F,
}

impl<F> FnInterval<F>
where
    F: Fn(usize) -> Duration + Send + Sync,
{
    /// Wraps `f`, which receives the 0-indexed retry number.
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
    // saturate on overflow
    Duration::try_from_secs_f64((initial.as_secs_f64() * factor).max(0.0)).unwrap_or(Duration::MAX)
}

fn cap(interval: Duration, max: Option<Duration>) -> Duration {
    match max {
        Some(max) => interval.min(max),
        None => interval,
    }
}
