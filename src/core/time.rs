//! Session clock and fixed-rate stepping

use std::time::{Duration, Instant};

/// Simulated session time, advanced by the scheduler's `tick(dt)`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SessionClock {
    elapsed: f64,
    frame_count: u64,
}

impl SessionClock {
    /// Create a clock at t = 0
    pub fn new() -> Self {
        Self::default()
    }

    /// Advance by `dt` seconds. Negative or non-finite deltas are ignored.
    pub fn tick(&mut self, dt: f32) {
        self.frame_count += 1;
        if dt.is_finite() && dt > 0.0 {
            self.elapsed += dt as f64;
        }
    }

    /// Seconds since session start
    pub fn elapsed(&self) -> f64 {
        self.elapsed
    }

    /// Number of ticks so far
    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }
}

/// Converts wall-clock frame time into a whole number of fixed-rate steps.
pub struct FixedStep {
    step: Duration,
    accumulator: Duration,
    last: Instant,
    /// Upper bound on steps per `advance` so a stall cannot snowball
    max_steps: u32,
}

impl FixedStep {
    /// Create a stepper running at `hz` ticks per second
    pub fn new(hz: f32) -> Self {
        let hz = if hz.is_finite() && hz > 0.0 { hz } else { 60.0 };
        Self {
            step: Duration::from_secs_f32(1.0 / hz),
            accumulator: Duration::ZERO,
            last: Instant::now(),
            max_steps: 5,
        }
    }

    /// Step length in seconds
    pub fn step_secs(&self) -> f32 {
        self.step.as_secs_f32()
    }

    /// Account for wall time since the previous call and return how many steps to run
    pub fn advance(&mut self) -> u32 {
        let now = Instant::now();
        let elapsed = now - self.last;
        self.last = now;
        self.accumulate(elapsed)
    }

    fn accumulate(&mut self, elapsed: Duration) -> u32 {
        self.accumulator += elapsed;
        let mut steps = 0;
        while self.accumulator >= self.step && steps < self.max_steps {
            self.accumulator -= self.step;
            steps += 1;
        }
        if steps == self.max_steps {
            // Drop the backlog rather than trying to catch up
            self.accumulator = Duration::ZERO;
        }
        steps
    }
}
