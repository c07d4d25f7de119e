//! Stage-level behaviour seen through the whole service: registration,
//! credentials, carrier selection and broker failures.

use gsmlink::adapters::log_sink::LogEventSink;
use gsmlink::adapters::measurement::FixedMeasurement;
use gsmlink::adapters::sim_modem::ScriptedModem;
use gsmlink::config::SessionConfig;
use gsmlink::error::{LinkError, Operation};
use gsmlink::fsm::{SleepReason, StateId};
use gsmlink::provision::CertificateBundle;

use crate::mock_hw::{
    MQTT_OPENED, SIM_PRESENT, TELENOR, Service, healthy_modem, lifecycle_modem, make_service,
    make_service_with,
};

const CONNECT: &str = r#"AT+QMTCONN=0,"625fdecb95fe84dd1ac9""#;

/// Tick until the service leaves `state` or asks for sleep.
fn run_past(app: &mut Service, state: StateId) {
    let mut sink = LogEventSink::new();
    let mut sensor = FixedMeasurement::new(9);
    while app.state() == state || app.state().index() < state.index() {
        if app.tick(&mut sensor, &mut sink).is_some() {
            return;
        }
    }
}

fn started(app: &mut Service) {
    app.start(&mut LogEventSink::new());
}

// ── Registration ─────────────────────────────────────────────

#[test]
fn unregistered_modem_gives_up_after_fifty_polls() {
    let base = ScriptedModem::new()
        .on("AT+CCID", SIM_PRESENT)
        .on("AT+CREG?", "+CREG: 0,2\r\n\r\nOK\r\n");
    let mut app = make_service(lifecycle_modem(base, TELENOR, MQTT_OPENED));
    started(&mut app);
    run_past(&mut app, StateId::RegisterNetwork);

    assert_eq!(app.state(), StateId::ErrorState);
    assert_eq!(app.modem().port().count_of("AT+CREG?"), 50);
    assert_eq!(
        app.last_error(),
        Some(LinkError::Semantic(Operation::Registration))
    );
    assert!(!app.modem().port().commands().iter().any(|c| c.starts_with("AT+QSECWRITE=")));
}

// ── TLS provisioning ─────────────────────────────────────────

#[test]
fn credentials_are_uploaded_and_profile_configured() {
    let mut app = make_service(healthy_modem());
    started(&mut app);
    run_past(&mut app, StateId::ProvisionTls);

    let modem = app.modem().port();
    assert_eq!(modem.uploads().len(), 3);
    assert_eq!(modem.uploads()[2], b"KEY\n");
    assert!(modem.sent(r#"AT+QMTCFG="SSL",0,1,2"#));
    assert!(modem.commands().iter().any(|c| c.starts_with("AT+QSECREAD=")));
    assert!(modem.commands().iter().any(|c| c.starts_with("AT+QSSLCFG=")));
}

#[test]
fn missing_credentials_are_skipped_when_lenient() {
    let mut app = make_service_with(
        healthy_modem(),
        SessionConfig::default(),
        CertificateBundle::default(),
    );
    started(&mut app);
    run_past(&mut app, StateId::ProvisionTls);

    assert_eq!(app.state(), StateId::OpenGprs);
    let modem = app.modem().port();
    assert!(modem.uploads().is_empty());
    assert!(!modem.commands().iter().any(|c| c.starts_with("AT+QSECWRITE=")));
}

#[test]
fn missing_credentials_fail_when_strict() {
    let mut config = SessionConfig::default();
    config.strict_provisioning = true;
    let mut app = make_service_with(healthy_modem(), config, CertificateBundle::default());
    started(&mut app);
    run_past(&mut app, StateId::ProvisionTls);

    assert_eq!(app.state(), StateId::ErrorState);
    assert_eq!(
        app.last_error(),
        Some(LinkError::RetriesExhausted(Operation::CertificateUpload))
    );
}

// ── Carrier / APN ────────────────────────────────────────────

#[test]
fn telenor_gets_its_apn() {
    let mut app = make_service(healthy_modem());
    started(&mut app);
    run_past(&mut app, StateId::OpenGprs);
    assert!(app.modem().port().sent(r#"AT+QICSGP=1,"internet""#));
}

#[test]
fn mobilink_gets_its_apn() {
    let cops = "+COPS: 0,0,\"Mobilink\"\r\n\r\nOK\r\n";
    let modem = lifecycle_modem(ScriptedModem::new().on("AT+CCID", SIM_PRESENT), cops, MQTT_OPENED);
    let mut app = make_service(modem);
    started(&mut app);
    run_past(&mut app, StateId::OpenGprs);
    assert!(app.modem().port().sent(r#"AT+QICSGP=1,"wap.mobilinkworld.com""#));
}

#[test]
fn unknown_carrier_keeps_modem_apn_and_still_publishes() {
    let cops = "+COPS: 0,0,\"Zong\"\r\n\r\nOK\r\n";
    let modem = lifecycle_modem(ScriptedModem::new().on("AT+CCID", SIM_PRESENT), cops, MQTT_OPENED);
    let mut app = make_service(modem);
    started(&mut app);
    let request = app.run_until_sleep(&mut FixedMeasurement::new(2), &mut LogEventSink::new());

    assert_eq!(request.reason, SleepReason::Published);
    let modem = app.modem().port();
    assert!(!modem.commands().iter().any(|c| c.starts_with("AT+QICSGP=")));
    assert!(modem.sent("AT+QIREGAPP"));
}

// ── Broker ───────────────────────────────────────────────────

#[test]
fn already_open_socket_is_reused() {
    let open = "OK\r\n\r\n+QMTOPEN: 0,2\r\n";
    let modem = lifecycle_modem(ScriptedModem::new().on("AT+CCID", SIM_PRESENT), TELENOR, open);
    let mut app = make_service(modem);
    started(&mut app);
    run_past(&mut app, StateId::OpenMqtt);

    assert_eq!(app.state(), StateId::PublishData);
    assert!(app.flags().mqtt_already_open);
    assert!(app.flags().take_sensor_readings);
    assert_eq!(
        app.modem().port().count_of(r#"AT+QMTOPEN=0,"iot.thingsty.com",8883"#),
        1
    );
}

#[test]
fn connect_is_attempted_even_when_open_fails() {
    let open = "OK\r\n\r\n+QMTOPEN: 0,-1\r\n";
    let modem = lifecycle_modem(ScriptedModem::new().on("AT+CCID", SIM_PRESENT), TELENOR, open);
    let mut app = make_service(modem);
    started(&mut app);
    let request = app.run_until_sleep(&mut FixedMeasurement::new(5), &mut LogEventSink::new());

    assert_eq!(request.reason, SleepReason::Published);
    assert!(!app.flags().mqtt_already_open);
    assert!(app.flags().mqtt_connected);
    assert!(app.flags().data_published);
    assert_eq!(app.modem().port().count_of(CONNECT), 1);
}

#[test]
fn unreachable_broker_ends_in_error_state() {
    let open = "OK\r\n\r\n+QMTOPEN: 0,-1\r\n";
    let base = ScriptedModem::new()
        .on("AT+CCID", SIM_PRESENT)
        .on_prefix("AT+QMTCONN=", "ERROR\r\n");
    let mut app = make_service(lifecycle_modem(base, TELENOR, open));
    started(&mut app);
    run_past(&mut app, StateId::PublishData);

    assert_eq!(app.state(), StateId::ErrorState);
    assert_eq!(app.last_error(), Some(LinkError::Semantic(Operation::MqttOpen)));
    assert!(!app.flags().mqtt_already_open);
    assert!(!app.flags().mqtt_connected);
    let modem = app.modem().port();
    assert_eq!(modem.count_of(r#"AT+QMTOPEN=0,"iot.thingsty.com",8883"#), 7);
    assert_eq!(modem.count_of(CONNECT), 7);
    assert!(!modem.commands().iter().any(|c| c.starts_with("AT+QMTPUB=")));
    assert!(!app.flags().data_published);
}

#[test]
fn silent_broker_open_is_blamed_before_refused_connect() {
    let base = ScriptedModem::new()
        .on("AT+CCID", SIM_PRESENT)
        .on_prefix("AT+QMTCONN=", "OK\r\n\r\n+QMTCONN: 0,0,5\r\n");
    let mut app = make_service(lifecycle_modem(base, TELENOR, ""));
    started(&mut app);
    run_past(&mut app, StateId::PublishData);

    assert_eq!(app.state(), StateId::ErrorState);
    assert_eq!(app.last_error(), Some(LinkError::Silence(Operation::MqttOpen)));
    assert_eq!(app.modem().port().count_of(CONNECT), 7);
}
