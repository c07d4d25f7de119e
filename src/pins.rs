//! GPIO / peripheral pin assignments for the telemetry node.
//!
//! Single source of truth: `main` takes the peripherals by these numbers
//! rather than hard-coding them at the call sites.

// ---------------------------------------------------------------------------
// Modem (Quectel M95)
// ---------------------------------------------------------------------------

/// ESP32 TX → modem RX.
pub const MODEM_TX_GPIO: i32 = 18;
/// Modem TX → ESP32 RX.
pub const MODEM_RX_GPIO: i32 = 19;
/// The modem's autobaud is pinned to this rate with `AT+IPR=9600`.
pub const MODEM_BAUD: u32 = 9_600;
/// Modem sleep-control line, active low.
pub const MODEM_SLEEP_GPIO: i32 = 32;

// ---------------------------------------------------------------------------
// Status LED
// ---------------------------------------------------------------------------

/// On-board LED, active high.
pub const STATUS_LED_GPIO: i32 = 2;
