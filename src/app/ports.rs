//! Port traits — the hexagonal boundary between the modem lifecycle and the
//! outside world.
//!
//! ```text
//!   Adapter ──▶ Port trait ──▶ GsmService (domain)
//! ```
//!
//! Driven adapters (UART, clock, certificate files, sensor, power control,
//! NVS, event sinks) implement these traits.  The
//! [`GsmService`](super::service::GsmService) consumes them via generics, so
//! the lifecycle never touches hardware directly and runs unchanged against
//! the scripted modem on the host.

use core::fmt;
use core::time::Duration;

use crate::config::SessionConfig;
use crate::provision::CertificateBundle;

// ───────────────────────────────────────────────────────────────
// Serial port (driven adapter: domain ↔ modem UART)
// ───────────────────────────────────────────────────────────────

/// Byte-level link to the modem.
pub trait SerialPort {
    /// Write every byte or fail.
    fn write_all(&mut self, bytes: &[u8]) -> Result<(), SerialError>;

    /// Pop one already-received byte without blocking.
    /// `None` means the receive queue is empty right now.
    fn read_byte(&mut self) -> Option<u8>;
}

/// Serial write failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SerialError {
    /// The driver rejected or timed out the write.
    WriteFailed,
}

impl fmt::Display for SerialError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::WriteFailed => write!(f, "serial write failed"),
        }
    }
}

// ───────────────────────────────────────────────────────────────
// Clock port (driven adapter: domain → time base)
// ───────────────────────────────────────────────────────────────

/// Monotonic time plus a blocking sleep.
///
/// Every delay in the lifecycle goes through [`Clock::sleep_ms`], so a
/// virtual clock makes the whole protocol run instantly under test.
pub trait Clock {
    /// Milliseconds since an arbitrary fixed origin.
    fn now_ms(&self) -> u64;

    /// Block the caller for `ms` milliseconds.
    fn sleep_ms(&mut self, ms: u32);
}

// ───────────────────────────────────────────────────────────────
// Certificate source (driven adapter: storage → domain)
// ───────────────────────────────────────────────────────────────

/// Supplies the PEM blobs streamed into the modem during provisioning.
pub trait CertificateSource {
    fn load_bundle(&self) -> Result<CertificateBundle, CertSourceError>;
}

/// Certificate loading failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CertSourceError {
    /// A file or key was not present.
    NotFound(&'static str),
    /// A blob exceeded its fixed capacity.
    TooLarge(&'static str),
    /// The storage backend could not be read.
    ReadFailed,
}

impl fmt::Display for CertSourceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound(name) => write!(f, "{name} not found"),
            Self::TooLarge(name) => write!(f, "{name} exceeds capacity"),
            Self::ReadFailed => write!(f, "certificate storage read failed"),
        }
    }
}

// ───────────────────────────────────────────────────────────────
// Measurement source (driven adapter: sensor → domain)
// ───────────────────────────────────────────────────────────────

/// The telemetry value published once per wake cycle.
pub trait MeasurementSource {
    /// Current distance reading.
    fn read_measurement(&mut self) -> u16;
}

// ───────────────────────────────────────────────────────────────
// Power port (driven adapter: domain → sleep control)
// ───────────────────────────────────────────────────────────────

/// Modem sleep line and host deep sleep.
pub trait PowerPort {
    /// Drive the modem sleep-control line; `true` lets the modem sleep.
    fn set_modem_sleep(&mut self, asleep: bool);

    /// Enter host deep sleep with a timed wake-up.  Does not return on the
    /// device; simulations record the request and return.
    fn deep_sleep(&mut self, duration: Duration);
}

// ───────────────────────────────────────────────────────────────
// Event sink port (driven adapter: domain → logging)
// ───────────────────────────────────────────────────────────────

/// The domain emits structured [`AppEvent`](super::events::AppEvent)s
/// through this port.
pub trait EventSink {
    fn emit(&mut self, event: &super::events::AppEvent);
}

// ───────────────────────────────────────────────────────────────
// Configuration port (driven adapter: domain ↔ persistent config)
// ───────────────────────────────────────────────────────────────

/// Loads and persists the session configuration.
///
/// Implementations MUST validate before persisting and reject bad values
/// with [`ConfigError::ValidationFailed`] instead of clamping them.
pub trait ConfigPort {
    /// Load configuration.  Returns [`SessionConfig::default()`] if nothing
    /// has been stored.
    fn load(&self) -> Result<SessionConfig, ConfigError>;

    /// Validate and persist configuration.
    fn save(&self, config: &SessionConfig) -> Result<(), ConfigError>;
}

/// Configuration persistence failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// A field is out of range.
    ValidationFailed(&'static str),
    /// The backing store failed.
    StorageFailed,
    /// Stored bytes could not be decoded.
    Corrupted,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ValidationFailed(field) => write!(f, "invalid config: {field}"),
            Self::StorageFailed => write!(f, "config storage failed"),
            Self::Corrupted => write!(f, "stored config is corrupted"),
        }
    }
}

impl std::error::Error for SerialError {}
impl std::error::Error for CertSourceError {}
impl std::error::Error for ConfigError {}
