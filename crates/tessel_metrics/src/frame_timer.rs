//! Frame-to-frame interval timing

use super::ring_buffer::RingBuffer;
use std::time::{Duration, Instant};

pub struct FrameTimer {
    last_tick: Option<Instant>,
    intervals: RingBuffer<Duration>,
}

impl FrameTimer {
    pub fn new(capacity: usize) -> Self {
        Self {
            last_tick: None,
            intervals: RingBuffer::new(capacity),
        }
    }

    /// Mark a frame boundary. Returns the time since the previous boundary
    /// (zero on the first call).
    pub fn tick(&mut self) -> Duration {
        let now = Instant::now();
        let elapsed = match self.last_tick.replace(now) {
            Some(prev) => now.duration_since(prev),
            None => return Duration::ZERO,
        };
        self.intervals.push(elapsed);
        elapsed
    }

    pub fn fps(&self) -> f64 {
        let avg = self.intervals.average();
        if avg.as_secs_f64() > 0.0 {
            1.0 / avg.as_secs_f64()
        } else {
            0.0
        }
    }

    pub fn frame_time_ms(&self) -> f64 {
        self.intervals.average().as_secs_f64() * 1000.0
    }

    pub fn frame_time_range_ms(&self) -> (f64, f64) {
        let (min, max) = self.intervals.min_max();
        (min.as_secs_f64() * 1000.0, max.as_secs_f64() * 1000.0)
    }
}
