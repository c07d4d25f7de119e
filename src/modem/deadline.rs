//! Deadline primitive over the [`Clock`] port.

use crate::app::ports::Clock;

/// A point in time after which a wait is abandoned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Deadline {
    started_ms: u64,
    expires_ms: u64,
}

impl Deadline {
    /// A deadline `timeout_ms` after the clock's current time.
    pub fn after(clock: &impl Clock, timeout_ms: u32) -> Self {
        let started_ms = clock.now_ms();
        Self {
            started_ms,
            expires_ms: started_ms.saturating_add(u64::from(timeout_ms)),
        }
    }

    pub fn expired(&self, clock: &impl Clock) -> bool {
        clock.now_ms() >= self.expires_ms
    }

    pub fn elapsed_ms(&self, clock: &impl Clock) -> u64 {
        clock.now_ms().saturating_sub(self.started_ms)
    }
}
