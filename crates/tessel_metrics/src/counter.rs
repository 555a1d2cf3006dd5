//! Named per-frame counters

use std::collections::HashMap;

#[derive(Debug, Default, Clone, Copy)]
struct Slot {
    current: u64,
    last: u64,
    total: u64,
}

/// Counters accumulate during a frame; `end_frame` latches them into
/// `last` and folds them into the running total.
#[derive(Debug, Default)]
pub struct FrameCounters {
    slots: HashMap<&'static str, Slot>,
}

impl FrameCounters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, name: &'static str, value: u64) {
        self.slots.entry(name).or_default().current += value;
    }

    pub fn end_frame(&mut self) {
        for slot in self.slots.values_mut() {
            slot.last = slot.current;
            slot.total += slot.current;
            slot.current = 0;
        }
    }

    /// Value of the counter in the most recently ended frame.
    pub fn last(&self, name: &str) -> u64 {
        self.slots.get(name).map_or(0, |s| s.last)
    }

    pub fn total(&self, name: &str) -> u64 {
        self.slots.get(name).map_or(0, |s| s.total)
    }
}
