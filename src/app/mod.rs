//! Application core — pure domain logic, zero I/O.
//!
//! This module holds the lifecycle orchestration for the telemetry node.
//! All interaction with hardware happens through **port traits** defined in
//! [`ports`], keeping this layer fully testable without a modem attached.

pub mod events;
pub mod ports;
pub mod service;
