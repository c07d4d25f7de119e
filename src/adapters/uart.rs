//! UART link to the modem (ESP-IDF only).
//!
//! Wraps an `esp_idf_hal` [`UartDriver`] as a [`SerialPort`].  The driver's
//! receive ring buffer keeps filling while the lifecycle sleeps through the
//! settle delay, so non-blocking reads afterwards see the whole reply.

use esp_idf_hal::delay::NON_BLOCK;
use esp_idf_hal::gpio::{AnyIOPin, InputPin, OutputPin};
use esp_idf_hal::peripheral::Peripheral;
use esp_idf_hal::uart::{config::Config, Uart, UartDriver};
use esp_idf_hal::units::Hertz;
use esp_idf_svc::sys::EspError;
use log::info;

use crate::app::ports::{SerialError, SerialPort};

/// The modem's serial link.
pub struct UartLink<'d> {
    driver: UartDriver<'d>,
}

impl<'d> UartLink<'d> {
    /// Open `uart` on the given pins at `baud`, 8N1, no flow control.
    pub fn new<U: Uart>(
        uart: impl Peripheral<P = U> + 'd,
        tx: impl Peripheral<P = impl OutputPin> + 'd,
        rx: impl Peripheral<P = impl InputPin> + 'd,
        baud: u32,
    ) -> Result<Self, EspError> {
        let config = Config::default().baudrate(Hertz(baud));
        let driver = UartDriver::new(
            uart,
            tx,
            rx,
            Option::<AnyIOPin>::None,
            Option::<AnyIOPin>::None,
            &config,
        )?;
        info!("UartLink: modem UART up at {} baud", baud);
        Ok(Self { driver })
    }
}

impl SerialPort for UartLink<'_> {
    fn write_all(&mut self, mut bytes: &[u8]) -> Result<(), SerialError> {
        while !bytes.is_empty() {
            match self.driver.write(bytes) {
                Ok(0) | Err(_) => return Err(SerialError::WriteFailed),
                Ok(n) => bytes = &bytes[n..],
            }
        }
        Ok(())
    }

    fn read_byte(&mut self) -> Option<u8> {
        let mut byte = [0u8; 1];
        match self.driver.read(&mut byte, NON_BLOCK) {
            Ok(1) => Some(byte[0]),
            _ => None,
        }
    }
}
