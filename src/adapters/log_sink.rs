//! Log-based event sink adapter.
//!
//! Implements [`EventSink`] by writing structured application events to the
//! logger (UART console on the device, stderr or nothing on the host).

use log::{error, info};

use crate::app::events::AppEvent;
use crate::app::ports::EventSink;

/// Adapter that logs every [`AppEvent`] to the serial console.
pub struct LogEventSink;

impl LogEventSink {
    pub fn new() -> Self {
        Self
    }
}

impl Default for LogEventSink {
    fn default() -> Self {
        Self::new()
    }
}

impl EventSink for LogEventSink {
    fn emit(&mut self, event: &AppEvent) {
        match event {
            AppEvent::Started(state) => {
                info!("START | initial_state={:?}", state);
            }
            AppEvent::StateChanged { from, to } => {
                info!("STATE | {:?} -> {:?}", from, to);
            }
            AppEvent::Published { value } => {
                info!("PUB   | distanceMeasure={}", value);
            }
            AppEvent::FatalError {
                restarts,
                last_error,
            } => match last_error {
                Some(e) => error!("FATAL | {} restarts used, last error: {}", restarts, e),
                None => error!("FATAL | {} restarts used", restarts),
            },
            AppEvent::SleepRequested(req) => {
                info!(
                    "SLEEP | reason={:?} duration={}s",
                    req.reason,
                    req.duration.as_secs()
                );
            }
        }
    }
}

/// Sink that keeps every event, for tests and host simulation.
#[derive(Debug, Default)]
pub struct RecordingSink {
    pub events: Vec<AppEvent>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }
}

impl EventSink for RecordingSink {
    fn emit(&mut self, event: &AppEvent) {
        self.events.push(event.clone());
    }
}
