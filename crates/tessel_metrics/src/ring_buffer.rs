//! Fixed-capacity rolling window of samples

use std::time::Duration;

pub struct RingBuffer<T> {
    samples: Vec<T>,
    capacity: usize,
    next: usize,
}

impl<T: Copy> RingBuffer<T> {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            samples: Vec::with_capacity(capacity),
            capacity,
            next: 0,
        }
    }

    /// Overwrites the oldest sample once full.
    pub fn push(&mut self, sample: T) {
        if self.samples.len() < self.capacity {
            self.samples.push(sample);
        } else {
            self.samples[self.next] = sample;
        }
        self.next = (self.next + 1) % self.capacity;
    }

    /// Most recently pushed sample.
    pub fn latest(&self) -> Option<T> {
        if self.samples.is_empty() {
            return None;
        }
        let idx = (self.next + self.capacity - 1) % self.capacity;
        self.samples.get(idx).copied()
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.samples.iter()
    }
}

impl RingBuffer<Duration> {
    pub fn average(&self) -> Duration {
        if self.samples.is_empty() {
            return Duration::ZERO;
        }
        let sum: Duration = self.samples.iter().sum();
        sum / self.samples.len() as u32
    }

    pub fn min_max(&self) -> (Duration, Duration) {
        let min = self.samples.iter().min().copied().unwrap_or_default();
        let max = self.samples.iter().max().copied().unwrap_or_default();
        (min, max)
    }
}

impl RingBuffer<u64> {
    pub fn average(&self) -> f64 {
        if self.samples.is_empty() {
            return 0.0;
        }
        let sum: u64 = self.samples.iter().sum();
        sum as f64 / self.samples.len() as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rolling_average_drops_oldest() {
        let mut buffer = RingBuffer::new(3);
        buffer.push(Duration::from_millis(10));
        buffer.push(Duration::from_millis(20));
        buffer.push(Duration::from_millis(30));
        assert_eq!(buffer.average(), Duration::from_millis(20));

        buffer.push(Duration::from_millis(40));
        assert_eq!(buffer.average(), Duration::from_millis(30));
        assert_eq!(buffer.latest(), Some(Duration::from_millis(40)));
        assert_eq!(
            buffer.min_max(),
            (Duration::from_millis(20), Duration::from_millis(40))
        );
    }

    #[test]
    fn integer_samples() {
        let mut buffer = RingBuffer::<u64>::new(4);
        assert!(buffer.latest().is_none());
        buffer.push(2);
        buffer.push(4);
        assert_eq!(buffer.average(), 3.0);
        assert_eq!(buffer.len(), 2);
    }
}
