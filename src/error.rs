//! Unified error types for the modem lifecycle.
//!
//! Every stage failure funnels into [`LinkError`] so the controller can log
//! it uniformly before routing the lifecycle to the error state. All variants
//! are `Copy`; nothing here allocates.

use core::fmt;

// ---------------------------------------------------------------------------
// Lifecycle stage identity (for error context)
// ---------------------------------------------------------------------------

/// The operation a [`LinkError`] belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    ModuleProbe,
    SimProbe,
    Registration,
    CertificateUpload,
    MqttOpen,
    MqttConnect,
    Publish,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ModuleProbe => write!(f, "module probe"),
            Self::SimProbe => write!(f, "SIM probe"),
            Self::Registration => write!(f, "network registration"),
            Self::CertificateUpload => write!(f, "certificate upload"),
            Self::MqttOpen => write!(f, "MQTT open"),
            Self::MqttConnect => write!(f, "MQTT connect"),
            Self::Publish => write!(f, "MQTT publish"),
        }
    }
}

// ---------------------------------------------------------------------------
// Top-level link error
// ---------------------------------------------------------------------------

/// Why a lifecycle stage gave up.  The operation names the stage; the
/// variant says what its last reply looked like.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkError {
    /// No reply, or no matching token before the deadline.
    Silence(Operation),
    /// The modem answered `ERROR` or `+CME ERROR:`.
    ModemError(Operation),
    /// A well-formed result line carried non-success fields.
    Semantic(Operation),
    /// The modem reports no SIM; not retryable within this cycle.
    NoSim,
    /// The stage had nothing to send: zero attempts allowed, or strict
    /// provisioning found credentials missing.
    RetriesExhausted(Operation),
}

impl fmt::Display for LinkError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Silence(op) => write!(f, "{op}: no response before timeout"),
            Self::ModemError(op) => write!(f, "{op}: modem reported an error"),
            Self::Semantic(op) => write!(f, "{op}: unexpected result code"),
            Self::NoSim => write!(f, "SIM not inserted"),
            Self::RetriesExhausted(op) => write!(f, "{op}: retries exhausted"),
        }
    }
}

impl std::error::Error for LinkError {}

/// Result of one modem operation.
pub type Result<T> = core::result::Result<T, LinkError>;
