//! Task watchdog (TWDT) for the lifecycle task.
//!
//! The lifecycle blocks on the modem for long stretches, so the watchdog is
//! fed from inside [`SystemClock`](crate::adapters::time::SystemClock)
//! sleeps.  Long sleeps are cut into [`Watchdog::slices`] so a single pause
//! can never outlast the timeout.  Dropping the handle unsubscribes the task.

use core::fmt;

#[cfg(target_os = "espidf")]
use esp_idf_svc::sys;
use log::info;

/// Reset the chip if the lifecycle task stops sleeping through its clock
/// for this long.  Well above the longest single blocking step (a 4 KB
/// certificate upload at 9600 baud).
pub const WATCHDOG_TIMEOUT_MS: u32 = 30_000;

/// Feeds per timeout window.
const FEEDS_PER_WINDOW: u32 = 3;

/// A TWDT call returned a non-`ESP_OK` code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WatchdogError(pub i32);

impl fmt::Display for WatchdogError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "task watchdog call failed ({})", self.0)
    }
}

impl std::error::Error for WatchdogError {}

#[cfg(target_os = "espidf")]
fn check(rc: sys::esp_err_t) -> Result<(), WatchdogError> {
    if rc == sys::ESP_OK { Ok(()) } else { Err(WatchdogError(rc)) }
}

/// Subscription of the calling task to the TWDT.
#[derive(Debug)]
pub struct Watchdog {
    timeout_ms: u32,
}

impl Watchdog {
    /// Arm the TWDT with `timeout_ms` and subscribe the calling task.
    pub fn subscribe(timeout_ms: u32) -> Result<Self, WatchdogError> {
        #[cfg(target_os = "espidf")]
        {
            let cfg = sys::esp_task_wdt_config_t {
                timeout_ms,
                idle_core_mask: 0,
                trigger_panic: true,
            };
            // Reconfigure fails when the bootloader left the TWDT off.
            if unsafe { sys::esp_task_wdt_reconfigure(&cfg) } != sys::ESP_OK {
                check(unsafe { sys::esp_task_wdt_init(&cfg) })?;
            }
            check(unsafe { sys::esp_task_wdt_add(core::ptr::null_mut()) })?;
        }
        info!("watchdog armed ({timeout_ms} ms, fed every {} ms)", timeout_ms / FEEDS_PER_WINDOW);
        Ok(Self { timeout_ms })
    }

    /// Longest sleep allowed between two feeds.
    pub fn slice_ms(&self) -> u32 {
        (self.timeout_ms / FEEDS_PER_WINDOW).max(1)
    }

    /// Split a sleep of `ms` into steps no longer than [`Self::slice_ms`].
    pub fn slices(&self, ms: u32) -> impl Iterator<Item = u32> + use<> {
        let slice = self.slice_ms();
        let mut left = ms;
        core::iter::from_fn(move || {
            if left == 0 {
                return None;
            }
            let step = left.min(slice);
            left -= step;
            Some(step)
        })
    }

    /// Reset the countdown.
    pub fn feed(&self) {
        #[cfg(target_os = "espidf")]
        unsafe {
            sys::esp_task_wdt_reset();
        }
    }
}

impl Drop for Watchdog {
    fn drop(&mut self) {
        #[cfg(target_os = "espidf")]
        unsafe {
            sys::esp_task_wdt_delete(core::ptr::null_mut());
        }
        info!("watchdog released");
    }
}
