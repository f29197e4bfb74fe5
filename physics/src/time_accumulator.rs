use std::time::Duration;
use tracing::warn;

/// Turns variable frame deltas into a whole number of fixed steps, carrying the remainder.
#[derive(Clone, Debug)]
pub struct TimeAccumulator {
    accumulated_time: Duration,
    frame_number: u64,
    num_steps: u32,
    max_steps: u32,
    update_rate: Duration,
}

impl TimeAccumulator {
    pub fn new(step_secs: f32, max_steps: u32) -> Self {
        let update_rate = Duration::try_from_secs_f32(step_secs)
            .ok()
            .filter(|rate| !rate.is_zero())
            .unwrap_or(Duration::from_secs(1) / 60);
        Self::with_rate(update_rate, max_steps)
    }

    pub fn with_rate(update_rate: Duration, max_steps: u32) -> Self {
        TimeAccumulator {
            accumulated_time: Duration::ZERO,
            frame_number: 0,
            num_steps: 0,
            max_steps,
            update_rate,
        }
    }

    /// Adds a frame delta in seconds. Negative or non-finite deltas count as zero.
    pub fn update_secs(&mut self, delta_secs: f32) -> u32 {
        let delta = Duration::try_from_secs_f32(delta_secs).unwrap_or(Duration::ZERO);
        self.update(delta)
    }

    pub fn update(&mut self, delta: Duration) -> u32 {
        self.frame_number += 1;
        self.accumulated_time += delta;
        let steps = self.accumulated_time.as_nanos() / self.update_rate.as_nanos().max(1);
        let steps = u32::try_from(steps).unwrap_or(u32::MAX);
        if steps > self.max_steps {
            warn!(
                steps,
                frame = self.frame_number,
                delta = delta.as_secs_f64(),
                accumulated = self.accumulated_time.as_secs_f64(),
                rate = self.update_rate.as_secs_f64(),
                "capping physics steps"
            );
            self.accumulated_time = Duration::ZERO;
            self.num_steps = self.max_steps;
        } else {
            self.accumulated_time -= self.update_rate * steps;
            self.num_steps = steps;
        }
        self.num_steps
    }

    pub fn step_secs(&self) -> f32 {
        self.update_rate.as_secs_f32()
    }

    pub fn num_steps(&self) -> u32 {
        self.num_steps
    }

    /// Time carried over to the next update.
    pub fn remainder(&self) -> Duration {
        self.accumulated_time
    }

    pub fn frame_number(&self) -> u64 {
        self.frame_number
    }
}
