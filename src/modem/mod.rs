//! Modem link: transport reader, response matcher, command executor.
//!
//! ```text
//!   send_until ──▶ send_command ──▶ SerialPort::write_all
//!        │
//!        └──────▶ read_response ◀── SerialPort::read_byte
//!                      ▲
//!   wait_for ──────────┘  (poll until token / ERROR / deadline)
//! ```
//!
//! Everything here is blocking and single-flow.  Each read replaces the
//! response buffer, so a result token split across two reads is not seen;
//! the settle delay before every drain keeps that rare in practice.

pub mod buffer;
pub mod commands;
pub mod deadline;
pub mod parse;
pub mod retry;

use log::{debug, trace, warn};

use crate::app::ports::{Clock, SerialPort};
use crate::config::Timing;
use crate::error::{LinkError, Operation, Result};

use buffer::ResponseBuffer;
use deadline::Deadline;
use retry::RetryCounter;

/// How a [`Modem::wait_for`] poll loop ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchOutcome {
    /// The caller's token arrived.
    Found,
    /// The modem answered `ERROR`.
    ModemError,
    /// The modem answered `+CME ERROR:`.
    CmeError,
    /// Nothing matched before the deadline.
    Timeout,
}

impl MatchOutcome {
    pub fn is_found(self) -> bool {
        self == Self::Found
    }

    /// The error `op` reports when this outcome did not satisfy it.  A found
    /// token still fails when its fields were wrong.
    pub fn failure(self, op: Operation) -> LinkError {
        match self {
            Self::Found => LinkError::Semantic(op),
            Self::ModemError | Self::CmeError => LinkError::ModemError(op),
            Self::Timeout => LinkError::Silence(op),
        }
    }
}

/// Owns the serial port, the clock and the single response buffer.
pub struct Modem<P, C> {
    port: P,
    clock: C,
    buffer: ResponseBuffer,
    settle_ms: u32,
    poll_interval_ms: u32,
}

impl<P: SerialPort, C: Clock> Modem<P, C> {
    pub fn new(port: P, clock: C, timing: &Timing) -> Self {
        Self {
            port,
            clock,
            buffer: ResponseBuffer::new(),
            settle_ms: timing.settle_ms,
            poll_interval_ms: timing.poll_interval_ms,
        }
    }

    // ── Transport ─────────────────────────────────────────────

    /// Send one command line (CR LF appended).  Write failures are logged;
    /// the following read then sees silence and the caller's retry logic
    /// takes over.
    pub fn send_command(&mut self, command: &str) {
        debug!("TX -> {command}");
        if let Err(e) = self
            .port
            .write_all(command.as_bytes())
            .and_then(|()| self.port.write_all(b"\r\n"))
        {
            warn!("{command}: {e}");
        }
    }

    /// Send raw bytes (certificate blobs, publish payloads).
    pub fn send_raw(&mut self, bytes: &[u8]) {
        trace!("TX -> {} raw bytes", bytes.len());
        if let Err(e) = self.port.write_all(bytes) {
            warn!("raw write of {} bytes: {e}", bytes.len());
        }
    }

    /// Let the modem finish talking, then replace the buffer with whatever
    /// it said.
    pub fn read_response(&mut self) -> &ResponseBuffer {
        self.clock.sleep_ms(self.settle_ms);
        self.buffer.clear();
        while let Some(byte) = self.port.read_byte() {
            self.buffer.push(byte);
        }
        if self.buffer.overflow() > 0 {
            warn!("response truncated, {} bytes dropped", self.buffer.overflow());
        }
        if !self.buffer.is_empty() {
            debug!("RX <- {}", self.buffer.text().trim());
        }
        &self.buffer
    }

    /// Send a command and read its reply.
    pub fn exchange(&mut self, command: &str) -> &ResponseBuffer {
        self.send_command(command);
        self.read_response()
    }

    // ── Matcher ───────────────────────────────────────────────

    /// Poll until `token`, an error, or the deadline.
    ///
    /// Checked in order: the caller's token, then `ERROR` (reported as
    /// [`MatchOutcome::CmeError`] when it is a `+CME ERROR:`).  A response
    /// carrying both the token and an error counts as found.
    pub fn wait_for(&mut self, token: &str, timeout_ms: u32) -> MatchOutcome {
        let deadline = Deadline::after(&self.clock, timeout_ms);
        while !deadline.expired(&self.clock) {
            self.clock.sleep_ms(self.poll_interval_ms);
            let outcome = classify(self.read_response(), token);
            if let Some(outcome) = outcome {
                if !outcome.is_found() {
                    debug!("waiting for {token}: {outcome:?}");
                }
                return outcome;
            }
        }
        debug!(
            "waiting for {token}: timed out after {} ms",
            deadline.elapsed_ms(&self.clock)
        );
        MatchOutcome::Timeout
    }

    // ── Executor ──────────────────────────────────────────────

    /// Send `command` until the reply contains `token`.  See
    /// [`Self::send_until_with`].
    pub fn send_until(
        &mut self,
        op: Operation,
        command: &str,
        token: &str,
        max_attempts: u8,
        backoff_ms: u32,
    ) -> Result<()> {
        self.send_until_with(op, command, max_attempts, backoff_ms, |r| r.contains(token))
    }

    /// Send `command` until `accept` approves the reply text, at most
    /// `max_attempts` times with `backoff_ms` between attempts.  On failure
    /// the last reply decides the error.
    pub fn send_until_with(
        &mut self,
        op: Operation,
        command: &str,
        max_attempts: u8,
        backoff_ms: u32,
        accept: impl Fn(&str) -> bool,
    ) -> Result<()> {
        if max_attempts == 0 {
            return Err(LinkError::RetriesExhausted(op));
        }
        let mut retries = RetryCounter::new(max_attempts);
        loop {
            self.send_command(command);
            if accept(&self.read_response().text()) {
                return Ok(());
            }
            if !retries.record_failure() {
                let err = self.rejection(op);
                warn!("{command}: {err} after {} attempts", retries.count());
                return Err(err);
            }
            self.clock.sleep_ms(backoff_ms);
        }
    }

    /// Classify the reply in the buffer as the reason `op` failed.
    pub fn rejection(&self, op: Operation) -> LinkError {
        if self.buffer.is_empty() {
            LinkError::Silence(op)
        } else if self.buffer.contains(commands::ERROR) {
            LinkError::ModemError(op)
        } else {
            LinkError::Semantic(op)
        }
    }

    // ── Accessors ─────────────────────────────────────────────

    /// Block for `ms` on the modem's clock.
    pub fn pause(&mut self, ms: u32) {
        self.clock.sleep_ms(ms);
    }

    /// The most recent response.
    pub fn response(&self) -> &ResponseBuffer {
        &self.buffer
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    pub fn port(&self) -> &P {
        &self.port
    }

    pub fn port_mut(&mut self) -> &mut P {
        &mut self.port
    }
}

/// Match one response against `token` and the error tokens.
pub fn classify(response: &ResponseBuffer, token: &str) -> Option<MatchOutcome> {
    if response.contains(token) {
        Some(MatchOutcome::Found)
    } else if response.contains(commands::ERROR) {
        if response.contains(commands::CME_ERROR) {
            Some(MatchOutcome::CmeError)
        } else {
            Some(MatchOutcome::ModemError)
        }
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::sim_modem::ScriptedModem;
    use crate::adapters::time::SimClock;

    fn modem(script: ScriptedModem) -> Modem<ScriptedModem, SimClock> {
        Modem::new(script, SimClock::new(), &Timing::default())
    }

    #[test]
    fn read_applies_settle_delay_and_keeps_last_byte() {
        let mut m = modem(ScriptedModem::new().on("AT", "OK"));
        m.send_command("AT");
        let text = m.read_response().text().into_owned();
        assert_eq!(text, "OK");
        assert_eq!(m.clock().now_ms(), 600);
    }

    #[test]
    fn each_read_replaces_the_buffer() {
        let mut m = modem(ScriptedModem::new().on("AT", "OK"));
        m.send_command("AT");
        m.read_response();
        assert!(m.read_response().is_empty());
    }

    #[test]
    fn wait_for_finds_token() {
        let mut m = modem(ScriptedModem::new().on("AT+QMTOPEN=0", "+QMTOPEN: 0,0"));
        m.send_command("AT+QMTOPEN=0");
        assert_eq!(m.wait_for("+QMTOPEN:", 75_000), MatchOutcome::Found);
    }

    #[test]
    fn wait_for_reports_errors() {
        let mut m = modem(ScriptedModem::new().on("AT+X", "ERROR").on("AT+Y", "+CME ERROR: 10"));
        m.send_command("AT+X");
        assert_eq!(m.wait_for("OK", 1_000), MatchOutcome::ModemError);
        m.send_command("AT+Y");
        assert_eq!(m.wait_for("OK", 1_000), MatchOutcome::CmeError);
    }

    #[test]
    fn wait_for_sees_unsolicited_result() {
        let mut m = modem(ScriptedModem::new());
        m.port_mut().inject("\r\n+QMTSTAT: 0,1\r\n");
        assert_eq!(m.wait_for("+QMTSTAT:", 1_000), MatchOutcome::Found);
        assert!(parse::mqtt_session_closed(&m.response().text()));
    }

    #[test]
    fn wait_for_times_out_on_silence() {
        let mut m = modem(ScriptedModem::new());
        assert_eq!(m.wait_for("OK", 7_000), MatchOutcome::Timeout);
        assert!(m.clock().now_ms() >= 7_000);
    }

    fn until_ok(m: &mut Modem<ScriptedModem, SimClock>, max_attempts: u8) -> Result<()> {
        m.send_until(Operation::ModuleProbe, "AT", "OK", max_attempts, 100)
    }

    #[test]
    fn send_until_stops_on_success() {
        let mut m = modem(ScriptedModem::new().on_sequence("AT", &["", "", "OK"]));
        assert_eq!(until_ok(&mut m, 15), Ok(()));
        assert_eq!(m.port().count_of("AT"), 3);
    }

    #[test]
    fn send_until_gives_up_after_max_attempts() {
        let mut m = modem(ScriptedModem::new());
        assert_eq!(until_ok(&mut m, 15), Err(LinkError::Silence(Operation::ModuleProbe)));
        assert_eq!(m.port().count_of("AT"), 15);
    }

    #[test]
    fn zero_attempts_sends_nothing() {
        let mut m = modem(ScriptedModem::new().on("AT", "OK"));
        assert_eq!(
            until_ok(&mut m, 0),
            Err(LinkError::RetriesExhausted(Operation::ModuleProbe))
        );
        assert_eq!(m.port().count_of("AT"), 0);
    }

    #[test]
    fn last_reply_decides_the_error() {
        let mut m = modem(ScriptedModem::new().on_sequence("AT", &["", "+CME ERROR: 13"]));
        assert_eq!(until_ok(&mut m, 2), Err(LinkError::ModemError(Operation::ModuleProbe)));

        let mut m = modem(ScriptedModem::new().on("AT+CREG?", "+CREG: 0,2\r\n\r\nOK"));
        let registered = m.send_until_with(
            Operation::Registration,
            "AT+CREG?",
            3,
            70,
            parse::registered,
        );
        assert_eq!(registered, Err(LinkError::Semantic(Operation::Registration)));
    }

    #[test]
    fn predicate_form_sees_reply_text() {
        let mut m = modem(ScriptedModem::new().on("AT+CREG?", "+CREG: 0,5\r\n\r\nOK"));
        let registered =
            m.send_until_with(Operation::Registration, "AT+CREG?", 50, 70, parse::registered);
        assert_eq!(registered, Ok(()));
    }

    #[test]
    fn outcomes_map_to_errors() {
        let op = Operation::MqttConnect;
        assert_eq!(MatchOutcome::Timeout.failure(op), LinkError::Silence(op));
        assert_eq!(MatchOutcome::CmeError.failure(op), LinkError::ModemError(op));
        assert_eq!(MatchOutcome::ModemError.failure(op), LinkError::ModemError(op));
        assert_eq!(MatchOutcome::Found.failure(op), LinkError::Semantic(op));
    }
}
