//! Session configuration parameters
//!
//! Every tunable of the modem lifecycle: broker profile, carrier APN table,
//! protocol timings and retry ceilings. Values can be overridden via NVS;
//! `Default` carries the field-proven values for the M95 modem.

use heapless::String;
use serde::{Deserialize, Serialize};

/// Maximum broker hostname length.
pub const MAX_HOST_LEN: usize = 64;
/// Maximum MQTT client identifier length.
pub const MAX_CLIENT_ID_LEN: usize = 32;
/// Maximum publish topic length.
pub const MAX_TOPIC_LEN: usize = 64;
/// Maximum operator-name match string length.
pub const MAX_OPERATOR_LEN: usize = 24;
/// Maximum APN length.
pub const MAX_APN_LEN: usize = 48;

/// Build a fixed-capacity string, leaving it empty if `s` does not fit.
pub(crate) fn fixed<const N: usize>(s: &str) -> String<N> {
    let mut out = String::new();
    let _ = out.push_str(s);
    out
}

/// One known carrier: a substring of the `AT+COPS?` operator name and the
/// APN used for its packet-data context.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CarrierApn {
    pub operator_match: String<MAX_OPERATOR_LEN>,
    pub apn: String<MAX_APN_LEN>,
}

/// Protocol timings, all in milliseconds unless the name says otherwise.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Timing {
    /// Delay before draining the serial port on every read.
    pub settle_ms: u32,
    /// Pause between matcher polls.
    pub poll_interval_ms: u32,
    /// Backoff between `AT` liveness probes.
    pub probe_backoff_ms: u32,
    /// Backoff between `AT+CCID` probes.
    pub sim_backoff_ms: u32,
    /// Backoff between `AT+CREG?` polls.
    pub registration_backoff_ms: u32,
    /// Pause before the registration and GPRS stages start talking.
    pub stage_lead_in_ms: u32,
    /// Wait for the `CONNECT` upload prompt after `AT+QSECWRITE`.
    pub cert_prompt_timeout_ms: u32,
    /// Pause between a `AT+QSECREAD` and its read.
    pub cert_readback_delay_ms: u32,
    /// Wait for `+QMTOPEN:`.
    pub mqtt_open_timeout_ms: u32,
    /// Wait for `+QMTCONN:`.
    pub mqtt_connect_timeout_ms: u32,
    /// Pause after a rejected `+QMTCONN:` result.
    pub mqtt_connect_backoff_ms: u32,
    /// Pause after each publish send.
    pub publish_gap_ms: u32,
    /// Pause between `AT+CFUN=0` and `AT+CFUN=1,1`.
    pub restart_pause_ms: u32,
    /// Pause per tick while parked in the error state.
    pub error_pause_ms: u32,
    /// How long the error state dwells after the retry ceiling before
    /// forcing deep sleep.
    pub error_dwell_ms: u32,
    /// Pause between lowering the modem sleep pin and host deep sleep.
    pub modem_sleep_settle_ms: u32,
    /// Host deep-sleep duration between telemetry cycles.
    pub deep_sleep_secs: u64,
}

impl Default for Timing {
    fn default() -> Self {
        Self {
            settle_ms: 600,
            poll_interval_ms: 100,
            probe_backoff_ms: 100,
            sim_backoff_ms: 100,
            registration_backoff_ms: 70,
            stage_lead_in_ms: 1000,
            cert_prompt_timeout_ms: 10_000,
            cert_readback_delay_ms: 200,
            mqtt_open_timeout_ms: 75_000,
            mqtt_connect_timeout_ms: 7_000,
            mqtt_connect_backoff_ms: 500,
            publish_gap_ms: 700,
            restart_pause_ms: 2_000,
            error_pause_ms: 100,
            error_dwell_ms: 60_000,
            modem_sleep_settle_ms: 1_000,
            deep_sleep_secs: 14_400, // 4 h between readings
        }
    }
}

/// Retry ceilings for every retry-bearing operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryLimits {
    pub module_probe: u8,
    pub sim_probe: u8,
    pub registration: u8,
    pub mqtt_open: u8,
    pub mqtt_connect: u8,
    pub publish: u8,
    /// Full lifecycle restarts from the error state before escalating.
    pub lifecycle_errors: u8,
}

impl Default for RetryLimits {
    fn default() -> Self {
        Self {
            module_probe: 15,
            sim_probe: 30,
            registration: 50,
            mqtt_open: 7,
            mqtt_connect: 7,
            publish: 3,
            lifecycle_errors: 5,
        }
    }
}

/// Core session configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionConfig {
    // --- Broker ---
    pub broker_host: String<MAX_HOST_LEN>,
    pub broker_port: u16,
    pub client_id: String<MAX_CLIENT_ID_LEN>,
    pub publish_topic: String<MAX_TOPIC_LEN>,

    // --- Carriers ---
    pub carrier_a: CarrierApn,
    pub carrier_b: CarrierApn,

    // --- Policy ---
    /// Route a certificate upload without a `CONNECT` prompt to the error
    /// state instead of carrying on.
    pub strict_provisioning: bool,

    pub timing: Timing,
    pub retries: RetryLimits,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            broker_host: fixed("iot.thingsty.com"),
            broker_port: 8883,
            client_id: fixed("625fdecb95fe84dd1ac9"),
            publish_topic: fixed("625fdecb95fe8/pub/l/4dd1ac9"),

            carrier_a: CarrierApn {
                operator_match: fixed("Telenor"),
                apn: fixed("internet"),
            },
            carrier_b: CarrierApn {
                operator_match: fixed("Mobilink"),
                apn: fixed("wap.mobilinkworld.com"),
            },

            strict_provisioning: false,

            timing: Timing::default(),
            retries: RetryLimits::default(),
        }
    }
}
