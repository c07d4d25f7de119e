//! Board drivers: status LED and task watchdog.

pub mod led_patterns;
pub mod status_led;
pub mod watchdog;
