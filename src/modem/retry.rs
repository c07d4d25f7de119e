//! Bounded retry counter.

/// Counts failed attempts against a fixed ceiling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryCounter {
    count: u8,
    ceiling: u8,
}

impl RetryCounter {
    pub const fn new(ceiling: u8) -> Self {
        Self { count: 0, ceiling }
    }

    /// Record one failure.  Returns `true` while attempts remain.
    pub fn record_failure(&mut self) -> bool {
        self.count = self.count.saturating_add(1);
        !self.exhausted()
    }

    pub fn exhausted(&self) -> bool {
        self.count >= self.ceiling
    }

    pub fn reset(&mut self) {
        self.count = 0;
    }

    pub fn count(&self) -> u8 {
        self.count
    }

    pub fn ceiling(&self) -> u8 {
        self.ceiling
    }
}
