//! Application service — the hexagonal core.
//!
//! [`GsmService`] owns the FSM and its context.  All I/O flows through port
//! traits: the modem link is injected at construction, the measurement
//! source, event sink and power port at call sites.  The same service runs
//! on the device and against the scripted modem on the host.
//!
//! ```text
//!  MeasurementSource ──▶ ┌─────────────────────────┐ ──▶ EventSink
//!                        │       GsmService        │
//!  SerialPort + Clock ◀─▶│  FSM · flags · retries  │ ──▶ PowerPort
//!                        └─────────────────────────┘
//! ```

use core::time::Duration;

use log::info;

use crate::config::SessionConfig;
use crate::error::LinkError;
use crate::fsm::context::{FatalFlag, FsmContext, SessionFlags};
use crate::fsm::states::build_state_table;
use crate::fsm::{Fsm, SleepReason, StateId};
use crate::modem::Modem;
use crate::modem::retry::RetryCounter;
use crate::provision::CertificateBundle;

use super::events::{AppEvent, SleepRequest};
use super::ports::{Clock, EventSink, MeasurementSource, PowerPort, SerialPort};

// ───────────────────────────────────────────────────────────────
// GsmService
// ───────────────────────────────────────────────────────────────

/// Drives one wake cycle of the modem lifecycle.
pub struct GsmService<P, C> {
    fsm: Fsm<P, C>,
    ctx: FsmContext<P, C>,
    tick_count: u64,
}

impl<P: SerialPort, C: Clock> GsmService<P, C> {
    /// Construct the service.  Does **not** start the FSM; call
    /// [`start`](Self::start) next.
    pub fn new(port: P, clock: C, config: SessionConfig, certificates: CertificateBundle) -> Self {
        let modem = Modem::new(port, clock, &config.timing);
        let ctx = FsmContext::new(modem, config, certificates, FatalFlag::new());
        let fsm = Fsm::new(build_state_table(), StateId::ProbeModem);
        Self {
            fsm,
            ctx,
            tick_count: 0,
        }
    }

    // ── Lifecycle ─────────────────────────────────────────────

    /// Start the FSM in `ProbeModem`.
    pub fn start(&mut self, sink: &mut impl EventSink) {
        self.fsm.start(&mut self.ctx);
        sink.emit(&AppEvent::Started(self.fsm.current_state()));
        info!("GsmService started in {:?}", self.fsm.current_state());
    }

    /// Run one stage.  Returns the sleep request once the lifecycle is done.
    pub fn tick(
        &mut self,
        source: &mut impl MeasurementSource,
        sink: &mut impl EventSink,
    ) -> Option<SleepRequest> {
        self.tick_count += 1;
        let prev_state = self.fsm.current_state();
        let was_fatal = self.ctx.fatal.is_raised();

        // Sample the sensor once the link is far enough up to use it.
        if prev_state == StateId::PublishData
            && self.ctx.flags.take_sensor_readings
            && self.ctx.measurement.is_none()
        {
            self.ctx.measurement = Some(source.read_measurement());
        }

        let reason = self.fsm.tick(&mut self.ctx);

        let new_state = self.fsm.current_state();
        if new_state != prev_state {
            sink.emit(&AppEvent::StateChanged {
                from: prev_state,
                to: new_state,
            });
        }
        if !was_fatal && self.ctx.fatal.is_raised() {
            sink.emit(&AppEvent::FatalError {
                restarts: self.ctx.error_retries.count(),
                last_error: self.ctx.last_error,
            });
        }

        let reason = reason?;
        if reason == SleepReason::Published && prev_state == StateId::PublishData {
            sink.emit(&AppEvent::Published {
                value: self.ctx.measurement.unwrap_or_default(),
            });
        }
        let request = SleepRequest {
            reason,
            duration: Duration::from_secs(self.ctx.config.timing.deep_sleep_secs),
        };
        sink.emit(&AppEvent::SleepRequested(request));
        Some(request)
    }

    /// Tick until the lifecycle asks for sleep.
    pub fn run_until_sleep(
        &mut self,
        source: &mut impl MeasurementSource,
        sink: &mut impl EventSink,
    ) -> SleepRequest {
        loop {
            if let Some(request) = self.tick(source, sink) {
                return request;
            }
        }
    }

    /// Let the modem sleep, then put the host to sleep.
    pub fn enter_sleep(&mut self, request: SleepRequest, power: &mut impl PowerPort) {
        info!(
            "entering sleep for {} s ({:?})",
            request.duration.as_secs(),
            request.reason
        );
        power.set_modem_sleep(true);
        self.ctx.modem.pause(self.ctx.config.timing.modem_sleep_settle_ms);
        power.deep_sleep(request.duration);
    }

    // ── Queries ───────────────────────────────────────────────

    /// Current FSM state.
    pub fn state(&self) -> StateId {
        self.fsm.current_state()
    }

    /// Total ticks executed since startup.
    pub fn tick_count(&self) -> u64 {
        self.tick_count
    }

    pub fn flags(&self) -> SessionFlags {
        self.ctx.flags
    }

    /// Handle to the fatal flag, for the status-LED thread.
    pub fn fatal_flag(&self) -> FatalFlag {
        self.ctx.fatal.clone()
    }

    pub fn error_retries(&self) -> RetryCounter {
        self.ctx.error_retries
    }

    pub fn last_error(&self) -> Option<LinkError> {
        self.ctx.last_error
    }

    pub fn config(&self) -> &SessionConfig {
        &self.ctx.config
    }

    /// The modem link (port, clock and last response).
    pub fn modem(&self) -> &Modem<P, C> {
        &self.ctx.modem
    }
}
