//! Fuzz target: full lifecycle against a modem that answers garbage
//!
//! Every command gets the fuzz input as its reply.  The lifecycle must
//! always end in a sleep request without panicking.
//!
//! cargo fuzz run fuzz_modem_replies

#![no_main]

use gsmlink::adapters::log_sink::RecordingSink;
use gsmlink::adapters::measurement::FixedMeasurement;
use gsmlink::adapters::sim_modem::ScriptedModem;
use gsmlink::adapters::time::SimClock;
use gsmlink::app::service::GsmService;
use gsmlink::config::SessionConfig;
use gsmlink::provision::CertificateBundle;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let reply = String::from_utf8_lossy(data);
    let mut config = SessionConfig::default();
    config.retries.lifecycle_errors = 1;

    let modem = ScriptedModem::new()
        .on_payload(&[&reply])
        .with_default(&reply);
    let mut app = GsmService::new(modem, SimClock::new(), config, CertificateBundle::default());
    let mut sink = RecordingSink::new();
    app.start(&mut sink);
    let _ = app.run_until_sleep(&mut FixedMeasurement::new(1), &mut sink);
});
