//! Point-in-time pool counters

use serde::{Deserialize, Serialize};

/// Snapshot of a connection pool taken under its lock
///
/// `open == idle + borrowed` and `open <= capacity` always hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolStats {
    capacity: usize,
    open: usize,
    idle: usize,
    borrowed: usize,
    /// Acquire calls blocked at capacity
    waiting: usize,
}

impl PoolStats {
    pub fn new(capacity: usize, open: usize, idle: usize, waiting: usize) -> Self {
        Self {
            capacity,
            open,
            idle,
            borrowed: open.saturating_sub(idle),
            waiting,
        }
    }

    /// Configured pool size
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn open(&self) -> usize {
        self.open
    }

    pub fn idle(&self) -> usize {
        self.idle
    }

    pub fn borrowed(&self) -> usize {
        self.borrowed
    }

    pub fn waiting(&self) -> usize {
        self.waiting
    }

    /// How many acquires could succeed right now without blocking: idle
    /// connections plus slots not yet opened
    pub fn available(&self) -> usize {
        self.idle + self.capacity.saturating_sub(self.open)
    }

    /// Borrowed share of the configured capacity, 0.0 to 1.0
    pub fn utilization(&self) -> f64 {
        if self.capacity == 0 {
            return 0.0;
        }
        self.borrowed as f64 / self.capacity as f64
    }

    /// Every slot is open and borrowed, so the next acquire blocks
    pub fn is_exhausted(&self) -> bool {
        self.available() == 0
    }
}
