//! Shared mutable context threaded through every FSM handler.
//!
//! `FsmContext` is the single struct state handlers read from and write to:
//! the modem link, session configuration, lifecycle flags, the lifecycle
//! error counter, and the credentials and reading the stages consume.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::config::SessionConfig;
use crate::error::LinkError;
use crate::modem::Modem;
use crate::modem::retry::RetryCounter;
use crate::provision::CertificateBundle;

// ---------------------------------------------------------------------------
// Session flags
// ---------------------------------------------------------------------------

/// What the current wake cycle has achieved so far.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionFlags {
    /// `AT+CCID` reported a SIM.
    pub sim_present: bool,
    /// `+QMTOPEN:` came back `0,0` or `0,2`.
    pub mqtt_already_open: bool,
    /// `+QMTCONN: 0,0,0` was seen.
    pub mqtt_connected: bool,
    /// The broker acknowledged the reading.
    pub data_published: bool,
    /// The link is far enough up that a reading should be taken.
    pub take_sensor_readings: bool,
}

// ---------------------------------------------------------------------------
// Fatal flag (shared with the status-LED thread)
// ---------------------------------------------------------------------------

/// Raised once lifecycle restarts are exhausted.  Cloning shares the flag.
#[derive(Debug, Clone, Default)]
pub struct FatalFlag(Arc<AtomicBool>);

impl FatalFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn raise(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_raised(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

// ---------------------------------------------------------------------------
// FsmContext
// ---------------------------------------------------------------------------

/// The shared context passed to every state handler function.
pub struct FsmContext<P, C> {
    // -- Link --
    pub modem: Modem<P, C>,

    // -- Configuration --
    pub config: SessionConfig,

    // -- Lifecycle state --
    pub flags: SessionFlags,
    pub fatal: FatalFlag,
    /// Restarts taken from the error state this wake cycle.
    pub error_retries: RetryCounter,
    /// When the post-ceiling dwell began; cleared on every modem probe.
    pub error_dwell_started_ms: Option<u64>,
    /// The failure that last sent the lifecycle to the error state.
    pub last_error: Option<LinkError>,
    /// First broker open or connect failure of this cycle.
    pub broker_error: Option<LinkError>,

    // -- Stage inputs --
    pub certificates: CertificateBundle,
    /// Reading to publish, sampled once `take_sensor_readings` is raised.
    pub measurement: Option<u16>,
}

impl<P, C> FsmContext<P, C> {
    pub fn new(
        modem: Modem<P, C>,
        config: SessionConfig,
        certificates: CertificateBundle,
        fatal: FatalFlag,
    ) -> Self {
        let error_retries = RetryCounter::new(config.retries.lifecycle_errors);
        Self {
            modem,
            config,
            flags: SessionFlags::default(),
            fatal,
            error_retries,
            error_dwell_started_ms: None,
            last_error: None,
            broker_error: None,
            certificates,
            measurement: None,
        }
    }
}
