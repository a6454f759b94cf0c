//! Circular history buffer
//!
//! Three parallel fixed-length arrays (level, phase, timestamp) plus a write
//! cursor and a count. Consumers only see `push` / `snapshot` / `clear`;
//! physical indices never leave this module.

use crate::types::{HistorySample, Phase};

/// Fixed-capacity ring of the most recent samples
#[derive(Debug, Clone)]
pub struct HistoryBuffer {
    levels: Box<[f64]>,
    phases: Box<[u8]>,
    timestamps: Box<[u64]>,
    /// Next physical slot to write
    cursor: usize,
    /// Logical number of stored samples (≤ capacity)
    count: usize,
}

impl HistoryBuffer {
    /// Create an empty buffer; capacity is at least 1
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            levels: vec![0.0; capacity].into_boxed_slice(),
            phases: vec![0; capacity].into_boxed_slice(),
            timestamps: vec![0; capacity].into_boxed_slice(),
            cursor: 0,
            count: 0,
        }
    }

    pub fn capacity(&self) -> usize {
        self.levels.len()
    }

    pub fn len(&self) -> usize {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Append a sample, overwriting the oldest when full
    pub fn push(&mut self, level: f64, phase: Phase, timestamp: u64) {
        let cap = self.capacity();
        self.levels[self.cursor] = level;
        self.phases[self.cursor] = phase.index();
        self.timestamps[self.cursor] = timestamp;
        self.cursor = (self.cursor + 1) % cap;
        if self.count < cap {
            self.count += 1;
        }
    }

    /// Samples oldest first
    pub fn snapshot(&self) -> Vec<HistorySample> {
        (0..self.count).map(|offset| self.sample_at(offset)).collect()
    }

    /// Most recent sample
    pub fn latest(&self) -> Option<HistorySample> {
        self.count.checked_sub(1).map(|last| self.sample_at(last))
    }

    pub fn clear(&mut self) {
        self.cursor = 0;
        self.count = 0;
    }

    fn sample_at(&self, logical_offset: usize) -> HistorySample {
        let cap = self.capacity();
        let idx = (self.cursor + cap - self.count + logical_offset) % cap;
        HistorySample {
            level: self.levels[idx],
            phase: Phase::from_index(self.phases[idx]),
            timestamp: self.timestamps[idx],
        }
    }
}
