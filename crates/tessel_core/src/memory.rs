//! Per-frame allocation tracking
//!
//! Used by the transient allocators to report how much of each ring a frame
//! consumed and the high-water mark across frames.

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AllocationTracker {
    frame_allocations: usize,
    last_frame: usize,
    peak: usize,
}

impl AllocationTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_allocation(&mut self, size: usize) {
        self.frame_allocations += size;
    }

    /// Close the current frame. Returns the bytes it used.
    pub fn reset_frame(&mut self) -> usize {
        let used = self.frame_allocations;
        self.last_frame = used;
        self.peak = self.peak.max(used);
        self.frame_allocations = 0;
        used
    }

    pub fn frame_allocations(&self) -> usize {
        self.frame_allocations
    }

    pub fn last_frame(&self) -> usize {
        self.last_frame
    }

    pub fn peak(&self) -> usize {
        self.peak.max(self.frame_allocations)
    }
}
