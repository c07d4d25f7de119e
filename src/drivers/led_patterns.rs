//! Status LED blink patterns.
//!
//! The node has one single-colour LED, so the only state it can show is the
//! rhythm.  The pattern is picked from the fatal flag each cycle:
//!
//! | Pattern  | On      | Off    | Meaning                          |
//! |----------|---------|--------|----------------------------------|
//! | Healthy  | 200 ms  | 200 ms | lifecycle running                |
//! | Fatal    | 2000 ms | 700 ms | modem restarts exhausted         |

/// Pattern identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PatternId {
    Healthy,
    Fatal,
}

/// One on/off cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cadence {
    pub on_ms: u32,
    pub off_ms: u32,
}

impl Cadence {
    pub const fn period_ms(&self) -> u32 {
        self.on_ms + self.off_ms
    }

    /// Whether the LED is lit `phase_ms` into a cycle.
    #[cfg(test)]
    pub fn is_on_at(&self, phase_ms: u32) -> bool {
        phase_ms % self.period_ms() < self.on_ms
    }
}

pub const HEALTHY: Cadence = Cadence {
    on_ms: 200,
    off_ms: 200,
};

pub const FATAL: Cadence = Cadence {
    on_ms: 2_000,
    off_ms: 700,
};

impl PatternId {
    /// Pattern for the current fatal-flag value.
    pub fn select(fatal: bool) -> Self {
        if fatal { Self::Fatal } else { Self::Healthy }
    }

    pub fn cadence(self) -> Cadence {
        match self {
            Self::Healthy => HEALTHY,
            Self::Fatal => FATAL,
        }
    }
}
