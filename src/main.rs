//! gsmlink firmware entry point.
//!
//! One wake cycle per boot: bring the modem up, publish one reading over
//! MQTT/TLS, then deep-sleep until the next cycle.
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────────┐
//! │                      Adapters (outer ring)                     │
//! │                                                                │
//! │  UartLink      SystemClock     FsCertStore    NvsAdapter       │
//! │  (SerialPort)  (Clock+TWDT)    (Certificates) (ConfigPort)     │
//! │  BoardPower    LogEventSink    StatusLed thread                │
//! │  (PowerPort)   (EventSink)     (reads FatalFlag)               │
//! │                                                                │
//! │  ──────────────── Port Trait Boundary ───────────────────      │
//! │                                                                │
//! │  ┌────────────────────────────────────────────────────────┐    │
//! │  │              GsmService (pure logic)                   │    │
//! │  │  FSM · modem link · retries                            │    │
//! │  └────────────────────────────────────────────────────────┘    │
//! └────────────────────────────────────────────────────────────────┘
//! ```
#![deny(unused_must_use)]

use anyhow::Result;
use log::{info, warn};

use esp_idf_hal::delay::FreeRtos;
use esp_idf_hal::gpio::{AnyIOPin, AnyOutputPin, PinDriver};
use esp_idf_hal::peripherals::Peripherals;

use gsmlink::adapters::cert_store::{self, FsCertStore};
use gsmlink::adapters::log_sink::LogEventSink;
use gsmlink::adapters::measurement::FixedMeasurement;
use gsmlink::adapters::nvs::NvsAdapter;
use gsmlink::adapters::power::BoardPower;
use gsmlink::adapters::time::SystemClock;
use gsmlink::adapters::uart::UartLink;
use gsmlink::app::ports::{CertificateSource, ConfigPort, PowerPort};
use gsmlink::app::service::GsmService;
use gsmlink::config::SessionConfig;
use gsmlink::drivers::status_led::StatusLed;
use gsmlink::drivers::watchdog::{WATCHDOG_TIMEOUT_MS, Watchdog};
use gsmlink::pins;
use gsmlink::provision::CertificateBundle;

/// Reading published until a distance sensor is wired to the board.
const BENCH_DISTANCE: u16 = 14;

fn main() -> Result<()> {
    // ── 1. ESP-IDF bootstrap ──────────────────────────────────
    esp_idf_svc::sys::link_patches();
    esp_idf_logger::init()?;

    info!("gsmlink v{}", env!("CARGO_PKG_VERSION"));

    let peripherals = Peripherals::take()?;
    let watchdog = Watchdog::subscribe(WATCHDOG_TIMEOUT_MS)?;

    // ── 2. Config from NVS (or defaults) ──────────────────────
    let config = match NvsAdapter::new() {
        Ok(nvs) => nvs.load().unwrap_or_else(|e| {
            warn!("config load failed ({}), using defaults", e);
            SessionConfig::default()
        }),
        Err(e) => {
            warn!("NVS init failed ({}), using defaults", e);
            SessionConfig::default()
        }
    };

    // ── 3. TLS credentials from SPIFFS ────────────────────────
    let certificates = cert_store::mount_spiffs()
        .and_then(|()| FsCertStore::new(cert_store::SPIFFS_BASE).load_bundle())
        .unwrap_or_else(|e| {
            warn!("certificates unavailable ({}), uploads will be skipped", e);
            CertificateBundle::default()
        });

    // ── 4. Board I/O ──────────────────────────────────────────
    // SAFETY: each GPIO number is claimed exactly once, here, and never
    // through `peripherals.pins`.
    let (tx, rx, sleep_pin, led_pin) = unsafe {
        (
            AnyIOPin::new(pins::MODEM_TX_GPIO),
            AnyIOPin::new(pins::MODEM_RX_GPIO),
            AnyOutputPin::new(pins::MODEM_SLEEP_GPIO),
            AnyOutputPin::new(pins::STATUS_LED_GPIO),
        )
    };
    let uart = UartLink::new(peripherals.uart2, tx, rx, pins::MODEM_BAUD)?;
    let mut power = BoardPower::new(PinDriver::output(sleep_pin)?);
    power.set_modem_sleep(false);

    // ── 5. Service + status LED ───────────────────────────────
    let mut service = GsmService::new(uart, SystemClock::new(watchdog), config, certificates);

    let led = StatusLed::new(PinDriver::output(led_pin)?, FreeRtos, service.fatal_flag());
    std::thread::Builder::new()
        .name("status-led".into())
        .stack_size(3 * 1024)
        .spawn(move || led.run())?;

    // ── 6. One wake cycle ─────────────────────────────────────
    let mut sink = LogEventSink::new();
    let mut sensor = FixedMeasurement::new(BENCH_DISTANCE);
    service.start(&mut sink);
    let request = service.run_until_sleep(&mut sensor, &mut sink);
    service.enter_sleep(request, &mut power);

    Ok(())
}
