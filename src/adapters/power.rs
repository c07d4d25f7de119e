//! Power adapters: modem sleep line and host deep sleep.
//!
//! The board's modem sleep-control line is active low: driving it low lets
//! the modem enter its slow-clock sleep (enabled with `AT+QSCLK=1`).

use core::time::Duration;

use embedded_hal::digital::OutputPin;
use log::{info, warn};

use crate::app::ports::PowerPort;

/// Real board power control over any `OutputPin`.
pub struct BoardPower<S> {
    sleep_line: S,
}

impl<S: OutputPin> BoardPower<S> {
    pub fn new(sleep_line: S) -> Self {
        Self { sleep_line }
    }
}

impl<S: OutputPin> PowerPort for BoardPower<S> {
    fn set_modem_sleep(&mut self, asleep: bool) {
        let result = if asleep {
            self.sleep_line.set_low()
        } else {
            self.sleep_line.set_high()
        };
        if let Err(e) = result {
            warn!("modem sleep line: {:?}", e);
        }
    }

    #[cfg(target_os = "espidf")]
    fn deep_sleep(&mut self, duration: Duration) {
        info!("deep sleep for {} s", duration.as_secs());
        // SAFETY: plain ESP-IDF calls; deep sleep never returns.
        unsafe {
            esp_idf_svc::sys::esp_sleep_enable_timer_wakeup(duration.as_micros() as u64);
            esp_idf_svc::sys::esp_deep_sleep_start();
        }
    }

    #[cfg(not(target_os = "espidf"))]
    fn deep_sleep(&mut self, duration: Duration) {
        info!("(sim) deep sleep for {} s", duration.as_secs());
    }
}

/// Records power requests for tests and host simulation.
#[derive(Debug, Default)]
pub struct SimPower {
    modem_asleep: bool,
    deep_sleeps: Vec<Duration>,
}

impl SimPower {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn modem_asleep(&self) -> bool {
        self.modem_asleep
    }

    pub fn deep_sleeps(&self) -> &[Duration] {
        &self.deep_sleeps
    }
}

impl PowerPort for SimPower {
    fn set_modem_sleep(&mut self, asleep: bool) {
        self.modem_asleep = asleep;
    }

    fn deep_sleep(&mut self, duration: Duration) {
        self.deep_sleeps.push(duration);
    }
}
