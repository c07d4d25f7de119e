//! Adapters — concrete implementations of the hexagonal port traits.
//!
//! | Adapter       | Implements         | Connects to                  |
//! |---------------|--------------------|------------------------------|
//! | `uart`        | SerialPort         | ESP32 UART to the modem      |
//! | `sim_modem`   | SerialPort         | Scripted modem (host tests)  |
//! | `time`        | Clock              | ESP32 system timer / virtual |
//! | `cert_store`  | CertificateSource  | SPIFFS credential files      |
//! | `nvs`         | ConfigPort         | NVS / in-memory store        |
//! | `power`       | PowerPort          | Modem sleep line, deep sleep |
//! | `measurement` | MeasurementSource  | Fixed reading                |
//! | `log_sink`    | EventSink          | Serial log output            |

pub mod cert_store;
pub mod log_sink;
pub mod measurement;
pub mod nvs;
pub mod power;
pub mod sim_modem;
pub mod time;
#[cfg(target_os = "espidf")]
pub mod uart;
