//! End-to-end wake cycles: publish, recover, give up.

use core::time::Duration;

use gsmlink::adapters::log_sink::RecordingSink;
use gsmlink::adapters::measurement::FixedMeasurement;
use gsmlink::adapters::power::SimPower;
use gsmlink::adapters::sim_modem::ScriptedModem;
use gsmlink::app::events::AppEvent;
use gsmlink::app::ports::Clock;
use gsmlink::config::SessionConfig;
use gsmlink::error::LinkError;
use gsmlink::fsm::{SleepReason, StateId};

use crate::mock_hw::{after_sim, healthy_modem, make_service, make_service_with, test_certificates};

// ── Happy path ───────────────────────────────────────────────

#[test]
fn healthy_modem_publishes_then_sleeps() {
    let mut app = make_service(healthy_modem());
    let mut sink = RecordingSink::new();
    let mut sensor = FixedMeasurement::new(14);

    app.start(&mut sink);
    let request = app.run_until_sleep(&mut sensor, &mut sink);

    assert_eq!(request.reason, SleepReason::Published);
    assert_eq!(request.duration, Duration::from_secs(14_400));
    assert_eq!(app.state(), StateId::PublishData);
    assert!(app.flags().data_published);
    assert!(app.flags().mqtt_connected);
    assert_eq!(app.error_retries().count(), 0);
    assert_eq!(app.last_error(), None);
    assert_eq!(sensor.reads(), 1);

    let modem = app.modem().port();
    // Each publish attempt sends the message twice.
    assert_eq!(modem.payloads().len(), 2);
    assert_eq!(modem.payloads()[0], br#"{"distanceMeasure": 14}"#);
    assert!(modem.sent("AT+QMTDISC=0"));
}

#[test]
fn stages_run_in_order() {
    let mut app = make_service(healthy_modem());
    let mut sink = RecordingSink::new();
    app.start(&mut sink);
    app.run_until_sleep(&mut FixedMeasurement::new(7), &mut sink);

    let visited: Vec<StateId> = sink
        .events
        .iter()
        .filter_map(|e| match e {
            AppEvent::StateChanged { to, .. } => Some(*to),
            _ => None,
        })
        .collect();
    assert_eq!(
        visited,
        [
            StateId::CheckSim,
            StateId::RegisterNetwork,
            StateId::ProvisionTls,
            StateId::OpenGprs,
            StateId::OpenMqtt,
            StateId::PublishData,
        ]
    );
    assert!(sink
        .events
        .iter()
        .any(|e| matches!(e, AppEvent::Published { value: 7 })));
    assert!(matches!(
        sink.events.last(),
        Some(AppEvent::SleepRequested(r)) if r.reason == SleepReason::Published
    ));
}

#[test]
fn sleep_request_powers_down_modem_and_host() {
    let mut app = make_service(healthy_modem());
    let mut sink = RecordingSink::new();
    let mut power = SimPower::new();
    app.start(&mut sink);
    let request = app.run_until_sleep(&mut FixedMeasurement::new(1), &mut sink);
    app.enter_sleep(request, &mut power);

    assert!(power.modem_asleep());
    assert_eq!(power.deep_sleeps(), [Duration::from_secs(14_400)]);
}

// ── Recovery ─────────────────────────────────────────────────

fn no_sim_modem() -> ScriptedModem {
    ScriptedModem::new()
        .on("AT+CCID", "+CME ERROR: SIM not inserted\r\n")
        .with_default("OK\r\n")
}

#[test]
fn missing_sim_restarts_modem_once() {
    let mut app = make_service(no_sim_modem());
    let mut sink = RecordingSink::new();
    let mut sensor = FixedMeasurement::new(0);
    app.start(&mut sink);

    app.tick(&mut sensor, &mut sink); // probe
    app.tick(&mut sensor, &mut sink); // SIM fails
    assert_eq!(app.state(), StateId::ErrorState);
    assert_eq!(app.last_error(), Some(LinkError::NoSim));
    assert_eq!(app.modem().port().count_of("AT+CCID"), 30);

    app.tick(&mut sensor, &mut sink); // restart
    assert_eq!(app.state(), StateId::ProbeModem);
    assert_eq!(app.error_retries().count(), 1);

    let sent = app.modem().port().commands();
    let off = sent.iter().position(|c| c == "AT+CFUN=0");
    let reset = sent.iter().position(|c| c == "AT+CFUN=1,1");
    assert!(off.is_some() && off < reset);
    assert!(!app.flags().take_sensor_readings);
}

#[test]
fn exhausted_restarts_dwell_then_sleep() {
    let mut config = SessionConfig::default();
    config.retries.lifecycle_errors = 2;
    let mut app = make_service_with(no_sim_modem(), config, test_certificates());
    let mut sink = RecordingSink::new();
    let mut sensor = FixedMeasurement::new(0);
    app.start(&mut sink);

    let request = app.run_until_sleep(&mut sensor, &mut sink);

    assert_eq!(request.reason, SleepReason::ErrorDwellExpired);
    assert_eq!(app.state(), StateId::ErrorState);
    assert_eq!(app.error_retries().count(), 2);
    assert!(app.fatal_flag().is_raised());
    assert!(!app.flags().data_published);
    assert_eq!(sensor.reads(), 0);
    // Initial attempt plus one per restart.
    assert_eq!(app.modem().port().count_of("AT+CCID"), 30 * 3);
    assert_eq!(app.modem().port().count_of("AT+CFUN=1,1"), 2);

    let fatal_events = sink
        .events
        .iter()
        .filter(|e| matches!(e, AppEvent::FatalError { .. }))
        .count();
    assert_eq!(fatal_events, 1);
    assert!(app.modem().clock().now_ms() >= 60_000);
}

#[test]
fn recovery_after_restart_still_publishes() {
    // First SIM probe round fails, the restarted modem answers.
    let mut replies = vec!["ERROR\r\n"; 30];
    replies.push("+CCID: \"8992\"\r\n\r\nOK\r\n");
    let modem = after_sim(ScriptedModem::new().on_sequence("AT+CCID", &replies));

    let mut app = make_service(modem);
    let mut sink = RecordingSink::new();
    app.start(&mut sink);
    let request = app.run_until_sleep(&mut FixedMeasurement::new(5), &mut sink);

    assert_eq!(request.reason, SleepReason::Published);
    assert!(app.flags().data_published);
    // Publishing resets the restart counter.
    assert_eq!(app.error_retries().count(), 0);
    assert_eq!(app.modem().port().count_of("AT+CFUN=1,1"), 1);
}
