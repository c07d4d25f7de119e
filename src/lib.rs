//! gsmlink library.
//!
//! Drives a Quectel M95 GSM modem over its AT-command UART from probe to
//! one MQTT-over-TLS publish.  The lifecycle logic is host-testable; all
//! ESP-IDF-specific code is guarded by `#[cfg(target_os = "espidf")]`
//! within each module.

#![deny(unused_must_use)]

pub mod apn;
pub mod app;
pub mod config;
pub mod error;
pub mod fsm;
pub mod modem;
pub mod mqtt;
pub mod pins;
pub mod provision;

pub mod adapters;
pub mod drivers;
