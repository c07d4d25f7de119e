//! Clock adapters.
//!
//! - [`SystemClock`]: the real time base.  On `target_os = "espidf"` it
//!   reads `esp_timer_get_time()`, sleeps through FreeRTOS in watchdog-sized
//!   slices and feeds the task watchdog between them.  On the host
//!   it uses `std::time::Instant` and `std::thread::sleep`.
//! - [`SimClock`]: virtual time for tests; sleeping just advances the
//!   counter, so a 75 s MQTT timeout runs instantly.

use crate::app::ports::Clock;

#[cfg(target_os = "espidf")]
use crate::drivers::watchdog::Watchdog;

/// Monotonic platform clock.
pub struct SystemClock {
    #[cfg(target_os = "espidf")]
    watchdog: Watchdog,
    #[cfg(not(target_os = "espidf"))]
    start: std::time::Instant,
}

impl SystemClock {
    #[cfg(target_os = "espidf")]
    pub fn new(watchdog: Watchdog) -> Self {
        Self { watchdog }
    }

    #[cfg(not(target_os = "espidf"))]
    pub fn new() -> Self {
        Self {
            start: std::time::Instant::now(),
        }
    }
}

#[cfg(not(target_os = "espidf"))]
impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    #[cfg(target_os = "espidf")]
    fn now_ms(&self) -> u64 {
        (unsafe { esp_idf_svc::sys::esp_timer_get_time() }) as u64 / 1_000
    }

    #[cfg(not(target_os = "espidf"))]
    fn now_ms(&self) -> u64 {
        self.start.elapsed().as_millis() as u64
    }

    #[cfg(target_os = "espidf")]
    fn sleep_ms(&mut self, ms: u32) {
        self.watchdog.feed();
        for step in self.watchdog.slices(ms) {
            esp_idf_hal::delay::FreeRtos::delay_ms(step);
            self.watchdog.feed();
        }
    }

    #[cfg(not(target_os = "espidf"))]
    fn sleep_ms(&mut self, ms: u32) {
        std::thread::sleep(std::time::Duration::from_millis(u64::from(ms)));
    }
}

/// Virtual clock: time moves only when someone sleeps.
#[derive(Debug, Default, Clone)]
pub struct SimClock {
    now_ms: u64,
    slept_ms: u64,
}

impl SimClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Jump forward without counting it as a sleep.
    #[cfg(test)]
    pub fn advance(&mut self, ms: u64) {
        self.now_ms += ms;
    }

    /// Total time spent in [`Clock::sleep_ms`].
    pub fn slept_ms(&self) -> u64 {
        self.slept_ms
    }
}

impl Clock for SimClock {
    fn now_ms(&self) -> u64 {
        self.now_ms
    }

    fn sleep_ms(&mut self, ms: u32) {
        self.now_ms += u64::from(ms);
        self.slept_ms += u64::from(ms);
    }
}
