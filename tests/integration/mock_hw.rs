//! Shared modem scripts and service builders for integration tests.
//!
//! [`ScriptedModem`] matches rules in insertion order, so each builder adds
//! the rules a test wants to override before the healthy defaults.

use gsmlink::adapters::sim_modem::ScriptedModem;
use gsmlink::adapters::time::SimClock;
use gsmlink::app::service::GsmService;
use gsmlink::config::SessionConfig;
use gsmlink::provision::CertificateBundle;

pub type Service = GsmService<ScriptedModem, SimClock>;

pub const SIM_PRESENT: &str = "+CCID: \"89920100000000000000\"\r\n\r\nOK\r\n";
pub const TELENOR: &str = "+COPS: 0,0,\"Telenor\"\r\n\r\nOK\r\n";
pub const MQTT_OPENED: &str = "OK\r\n\r\n+QMTOPEN: 0,0\r\n";

/// A modem that answers every stage the way a healthy M95 on Telenor does.
pub fn healthy_modem() -> ScriptedModem {
    lifecycle_modem(ScriptedModem::new().on("AT+CCID", SIM_PRESENT), TELENOR, MQTT_OPENED)
}

/// Healthy replies for every stage past the SIM check.  `base` decides how
/// the SIM probe goes.
pub fn after_sim(base: ScriptedModem) -> ScriptedModem {
    lifecycle_modem(base, TELENOR, MQTT_OPENED)
}

/// Full lifecycle script with the operator and broker-open replies chosen
/// by the caller.
pub fn lifecycle_modem(base: ScriptedModem, operator: &str, open: &str) -> ScriptedModem {
    base.on("AT+CSQ", "+CSQ: 18,0\r\n\r\nOK\r\n")
        .on("AT+CREG?", "+CREG: 0,1\r\n\r\nOK\r\n")
        .on("AT+COPS?", operator)
        .on("AT+CGATT?", "+CGATT: 1\r\n\r\nOK\r\n")
        .on_prefix("AT+QSECWRITE=", "CONNECT\r\n")
        .on_prefix("AT+QMTOPEN=", open)
        .on_prefix("AT+QMTCONN=", "OK\r\n\r\n+QMTCONN: 0,0,0\r\n")
        .on_prefix("AT+QMTPUB=", ">")
        .on_payload(&["\r\nOK\r\n\r\n+QMTPUB: 0,0,0\r\n"])
        .with_default("OK\r\n")
}

/// A complete set of (tiny) credentials.
pub fn test_certificates() -> CertificateBundle {
    CertificateBundle::from_pem(b"CA\n", b"CERT\n", b"KEY\n").expect("fits")
}

pub fn make_service(port: ScriptedModem) -> Service {
    make_service_with(port, SessionConfig::default(), test_certificates())
}

pub fn make_service_with(
    port: ScriptedModem,
    config: SessionConfig,
    certificates: CertificateBundle,
) -> Service {
    GsmService::new(port, SimClock::new(), config, certificates)
}
