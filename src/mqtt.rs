//! MQTT session over the modem's built-in client 0.
//!
//! Open the TLS socket, connect with the configured client id, publish one
//! reading.  The modem does the MQTT framing; this module only drives the
//! `AT+QMT*` commands and interprets their result lines.

use heapless::String;
use log::{debug, info, warn};
use serde::Serialize;

use crate::app::ports::{Clock, SerialPort};
use crate::config::SessionConfig;
use crate::error::{Operation, Result};
use crate::modem::commands::{self, PAYLOAD_TERMINATOR};
use crate::modem::parse;
use crate::modem::retry::RetryCounter;
use crate::modem::Modem;

// ---------------------------------------------------------------------------
// Payload
// ---------------------------------------------------------------------------

const PAYLOAD_SKELETON_LEN: usize = r#"{"distanceMeasure": }"#.len();

/// Room for the skeleton plus the widest `u16`.
pub const PAYLOAD_CAPACITY: usize = PAYLOAD_SKELETON_LEN + 5;

pub type Payload = String<PAYLOAD_CAPACITY>;

#[derive(Serialize)]
struct DistanceReading {
    #[serde(rename = "distanceMeasure")]
    distance_measure: u16,
}

/// Compact JSON with a space after each key's colon.
struct SpacedColon;

impl serde_json::ser::Formatter for SpacedColon {
    fn begin_object_value<W: ?Sized + std::io::Write>(&mut self, writer: &mut W) -> std::io::Result<()> {
        writer.write_all(b": ")
    }
}

/// Render `{"distanceMeasure": <value>}`.
pub fn build_payload(value: u16) -> Payload {
    let mut json = std::vec::Vec::with_capacity(PAYLOAD_CAPACITY);
    let mut ser = serde_json::Serializer::with_formatter(&mut json, SpacedColon);
    let reading = DistanceReading {
        distance_measure: value,
    };
    let mut payload = Payload::new();
    if reading.serialize(&mut ser).is_ok() {
        if let Ok(text) = core::str::from_utf8(&json) {
            let _ = payload.push_str(text);
        }
    }
    payload
}

// ---------------------------------------------------------------------------
// Socket open
// ---------------------------------------------------------------------------

/// A usable broker socket.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SocketOpen {
    /// `+QMTOPEN: 0,0`
    Opened,
    /// `+QMTOPEN: 0,2`, the identifier is already in use.
    AlreadyOpen,
}

fn classify_open(result: Option<(i32, i32)>) -> Option<SocketOpen> {
    match result {
        Some((0, 0)) => Some(SocketOpen::Opened),
        Some((0, 2)) => Some(SocketOpen::AlreadyOpen),
        _ => None,
    }
}

/// Open the broker socket, retrying up to the configured ceiling.
pub fn open_socket<P: SerialPort, C: Clock>(
    modem: &mut Modem<P, C>,
    config: &SessionConfig,
) -> Result<SocketOpen> {
    let command = commands::mqtt_open(&config.broker_host, config.broker_port);
    let mut retries = RetryCounter::new(config.retries.mqtt_open);
    loop {
        modem.send_command(&command);
        let outcome = modem.wait_for("+QMTOPEN:", config.timing.mqtt_open_timeout_ms);
        let result = if outcome.is_found() {
            parse::mqtt_open_result(&modem.response().text())
        } else {
            None
        };
        if let Some(open) = classify_open(result) {
            info!("MQTT socket {open:?} ({}:{})", config.broker_host, config.broker_port);
            return Ok(open);
        }
        debug!("MQTT open attempt {}: {outcome:?} {result:?}", retries.count() + 1);
        if !retries.record_failure() {
            let err = outcome.failure(Operation::MqttOpen);
            warn!("{err} after {} attempts", retries.count());
            return Err(err);
        }
    }
}

// ---------------------------------------------------------------------------
// Connect
// ---------------------------------------------------------------------------

/// Connect client 0 to the broker.  Only `+QMTCONN: 0,0,0` is success.
pub fn connect<P: SerialPort, C: Clock>(
    modem: &mut Modem<P, C>,
    config: &SessionConfig,
) -> Result<()> {
    let command = commands::mqtt_connect(&config.client_id);
    let mut retries = RetryCounter::new(config.retries.mqtt_connect);
    loop {
        modem.send_command(&command);
        let outcome = modem.wait_for("+QMTCONN:", config.timing.mqtt_connect_timeout_ms);
        let text = modem.response().text().into_owned();
        if parse::mqtt_session_closed(&text) {
            warn!("broker closed the MQTT session (+QMTSTAT: 0,1)");
        }
        if outcome.is_found() {
            match parse::mqtt_connect_result(&text) {
                Some((0, 0, 0)) => {
                    info!("MQTT connected as {}", config.client_id);
                    return Ok(());
                }
                result => {
                    debug!("MQTT connect rejected: {result:?}");
                    modem.pause(config.timing.mqtt_connect_backoff_ms);
                }
            }
        }
        if !retries.record_failure() {
            let err = outcome.failure(Operation::MqttConnect);
            warn!("{err} after {} attempts", retries.count());
            return Err(err);
        }
    }
}

// ---------------------------------------------------------------------------
// Publish
// ---------------------------------------------------------------------------

/// Publish `payload` to the configured topic.
///
/// Each attempt sends command, payload and terminator twice back to back,
/// then checks the last reply for `+QMTPUB: ... 0,0,0`.  With `link_ready`
/// false nothing is sent but the acknowledgement is still checked, so the
/// failure then reads as silence.
pub fn publish<P: SerialPort, C: Clock>(
    modem: &mut Modem<P, C>,
    config: &SessionConfig,
    payload: &str,
    link_ready: bool,
) -> Result<()> {
    let command = commands::mqtt_publish(&config.publish_topic);
    let mut retries = RetryCounter::new(config.retries.publish);
    if !link_ready {
        warn!("MQTT link not up, publish sends skipped");
    }
    loop {
        if link_ready {
            for _ in 0..2 {
                modem.send_command(&command);
                modem.read_response();
                modem.send_raw(payload.as_bytes());
                modem.send_raw(PAYLOAD_TERMINATOR);
                modem.pause(config.timing.publish_gap_ms);
            }
        }
        if parse::publish_acknowledged(&modem.read_response().text()) {
            info!("published {payload} to {}", config.publish_topic);
            return Ok(());
        }
        if !retries.record_failure() {
            let err = modem.rejection(Operation::Publish);
            warn!("{err} after {} attempts", retries.count());
            return Err(err);
        }
        modem.pause(config.timing.poll_interval_ms);
    }
}

/// Close client 0's session.
pub fn disconnect<P: SerialPort, C: Clock>(modem: &mut Modem<P, C>) {
    modem.exchange(commands::MQTT_DISCONNECT);
}
