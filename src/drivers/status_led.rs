//! Status LED driver.
//!
//! Blinks a single GPIO LED on its own thread, reading only the shared
//! [`FatalFlag`].  Generic over `embedded-hal` so the same driver runs on an
//! `esp_idf_hal` `PinDriver` and on a test double.

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::OutputPin;
use log::warn;

use crate::drivers::led_patterns::{Cadence, PatternId};
use crate::fsm::context::FatalFlag;

pub struct StatusLed<P, D> {
    pin: P,
    delay: D,
    fatal: FatalFlag,
}

impl<P: OutputPin, D: DelayNs> StatusLed<P, D> {
    pub fn new(pin: P, delay: D, fatal: FatalFlag) -> Self {
        Self { pin, delay, fatal }
    }

    /// Run one on/off cycle of the pattern the fatal flag selects.
    pub fn blink_once(&mut self) -> PatternId {
        let pattern = PatternId::select(self.fatal.is_raised());
        let Cadence { on_ms, off_ms } = pattern.cadence();
        self.set(true);
        self.delay.delay_ms(on_ms);
        self.set(false);
        self.delay.delay_ms(off_ms);
        pattern
    }

    /// Blink forever.
    pub fn run(mut self) -> ! {
        loop {
            self.blink_once();
        }
    }

    fn set(&mut self, on: bool) {
        let result = if on {
            self.pin.set_high()
        } else {
            self.pin.set_low()
        };
        if let Err(e) = result {
            warn!("status LED: {:?}", e);
        }
    }
}
