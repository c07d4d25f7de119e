//! Measurement source adapters.
//!
//! The distance sensor itself sits outside this firmware; the reading
//! arrives through [`MeasurementSource`].  [`FixedMeasurement`] stands in for
//! it on the bench and in tests.

use log::debug;

use crate::app::ports::MeasurementSource;

/// Always reports the same value and counts how often it was asked.
#[derive(Debug, Clone)]
pub struct FixedMeasurement {
    value: u16,
    reads: u32,
}

impl FixedMeasurement {
    pub fn new(value: u16) -> Self {
        Self { value, reads: 0 }
    }

    pub fn reads(&self) -> u32 {
        self.reads
    }
}

impl MeasurementSource for FixedMeasurement {
    fn read_measurement(&mut self) -> u16 {
        self.reads += 1;
        debug!("measurement read: {}", self.value);
        self.value
    }
}
