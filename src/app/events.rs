//! Outbound application events.
//!
//! The [`GsmService`](super::service::GsmService) emits these through the
//! [`EventSink`](super::ports::EventSink) port.  Adapters on the other side
//! decide what to do with them.

use core::time::Duration;

use crate::error::LinkError;
use crate::fsm::{SleepReason, StateId};

/// What the lifecycle hands the power layer when it is done.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SleepRequest {
    pub reason: SleepReason,
    pub duration: Duration,
}

/// Structured events emitted by the application core.
#[derive(Debug, Clone)]
pub enum AppEvent {
    /// The service has started (carries initial state).
    Started(StateId),

    /// The FSM moved between stages.
    StateChanged { from: StateId, to: StateId },

    /// The broker acknowledged a reading.
    Published { value: u16 },

    /// Modem restarts are exhausted for this wake cycle.
    FatalError {
        restarts: u8,
        last_error: Option<LinkError>,
    },

    /// The lifecycle is finished and wants the host asleep.
    SleepRequested(SleepRequest),
}
