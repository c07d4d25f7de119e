//! Fuzz target: response buffer, matcher and result-line parsers
//!
//! Feeds arbitrary modem output through the fixed-size buffer and every
//! parser, asserting none of them panic and the buffer stays bounded.
//!
//! cargo fuzz run fuzz_response_parser

#![no_main]

use gsmlink::config::SessionConfig;
use gsmlink::modem::buffer::{RESPONSE_CAPACITY, ResponseBuffer};
use gsmlink::modem::{classify, parse};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let mut buffer = ResponseBuffer::new();
    for &byte in data {
        buffer.push(byte);
    }
    assert!(buffer.len() <= RESPONSE_CAPACITY);
    assert_eq!(buffer.len() + buffer.overflow(), data.len());

    let _ = classify(&buffer, "OK");
    let _ = classify(&buffer, "+QMTOPEN:");

    let text = buffer.text();
    let _ = parse::mqtt_open_result(&text);
    let _ = parse::mqtt_connect_result(&text);
    let _ = parse::publish_acknowledged(&text);
    let _ = parse::sim_status(&text);
    let _ = parse::registered(&text);
    let _ = gsmlink::apn::select_apn(&text, &SessionConfig::default());
});
