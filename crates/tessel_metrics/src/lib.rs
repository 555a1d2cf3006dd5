//! Tessel Metrics - frame statistics for the recorder
//!
//! Provides zero-cost abstractions for metrics collection that completely
//! vanish in production builds via feature flags.
//!
//! # Feature Flags
//!
//! - `metrics` - Enable metrics collection (default: disabled)
//!
//! # Usage
//!
//! ```ignore
//! use tessel_metrics::{FrameCounters, FrameTimer};
//!
//! let mut timer = FrameTimer::new(60); // Track last 60 frames
//! let mut counters = FrameCounters::new();
//! loop {
//!     counters.add("draws", 1);
//!     timer.tick();
//!     counters.end_frame();
//! }
//! ```
//!
//! Without the `metrics` feature every type below is an empty stub with the
//! same API.

#[cfg(feature = "metrics")]
mod counter;
#[cfg(feature = "metrics")]
mod frame_timer;
#[cfg(feature = "metrics")]
mod ring_buffer;

#[cfg(feature = "metrics")]
pub use counter::FrameCounters;
#[cfg(feature = "metrics")]
pub use frame_timer::FrameTimer;
#[cfg(feature = "metrics")]
pub use ring_buffer::RingBuffer;

// ============================================================================
// No-op stubs when metrics disabled
// ============================================================================

#[cfg(not(feature = "metrics"))]
pub struct FrameTimer;

#[cfg(not(feature = "metrics"))]
impl FrameTimer {
    pub fn new(_capacity: usize) -> Self { Self }
    pub fn tick(&mut self) -> std::time::Duration { std::time::Duration::ZERO }
    pub fn fps(&self) -> f64 { 0.0 }
    pub fn frame_time_ms(&self) -> f64 { 0.0 }
    pub fn frame_time_range_ms(&self) -> (f64, f64) { (0.0, 0.0) }
}

#[cfg(not(feature = "metrics"))]
pub struct RingBuffer<T>(std::marker::PhantomData<T>);

#[cfg(not(feature = "metrics"))]
impl<T> RingBuffer<T> {
    pub fn new(_capacity: usize) -> Self { Self(std::marker::PhantomData) }
    pub fn push(&mut self, _value: T) {}
    pub fn len(&self) -> usize { 0 }
    pub fn is_empty(&self) -> bool { true }
}

#[cfg(not(feature = "metrics"))]
pub struct FrameCounters;

#[cfg(not(feature = "metrics"))]
impl FrameCounters {
    pub fn new() -> Self { Self }
    pub fn add(&mut self, _name: &'static str, _value: u64) {}
    pub fn end_frame(&mut self) {}
    pub fn last(&self, _name: &str) -> u64 { 0 }
    pub fn total(&self, _name: &str) -> u64 { 0 }
}

#[cfg(not(feature = "metrics"))]
impl Default for FrameCounters {
    fn default() -> Self { Self }
}
