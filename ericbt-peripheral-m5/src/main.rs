//! ericbt display peripheral for M5StickC PLUS2
//!
//! Advertises the Nordic UART service, renders incoming JSON commands on the
//! built-in screen and scrolls a banner while nobody is connected.

mod radio;
mod screen;

use std::error::Error;
use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use display_interface_spi::SPIInterface;
use ericbt_domain::app::DisplayApp;
use ericbt_domain::service::{ServiceConfig, UartService};
use esp32_nimble::BLEDevice;
use esp_idf_hal::delay::Delay;
use esp_idf_hal::gpio::{AnyIOPin, PinDriver};
use esp_idf_hal::peripherals::Peripherals;
use esp_idf_hal::spi::config::DriverConfig;
use esp_idf_hal::spi::{SpiConfig, SpiDeviceDriver, SpiDriver};
use esp_idf_hal::units::Hertz;
use esp_idf_svc::log::EspLogger;
use log::{error, info};
use mipidsi::options::{ColorOrder, Orientation, Rotation};
use mipidsi::Builder;

use crate::radio::NimbleRadio;
use crate::screen::LcdScreen;

const TICK: Duration = Duration::from_millis(200);

fn main() -> Result<(), Box<dyn Error>> {
    esp_idf_svc::sys::link_patches();
    EspLogger::initialize_default();
    info!("Starting ericbt display for M5StickC PLUS2");

    let peripherals = Peripherals::take()?;

    // GPIO27 drives the backlight on the PLUS2
    let backlight = PinDriver::output(peripherals.pins.gpio27)?;

    // MOSI GPIO15, CLK GPIO13, CS GPIO5, DC GPIO14, RST GPIO12
    let driver = SpiDriver::new(
        peripherals.spi2,
        peripherals.pins.gpio13,
        peripherals.pins.gpio15,
        None::<AnyIOPin>,
        &DriverConfig::new(),
    )?;
    let spi = SpiDeviceDriver::new(
        driver,
        Some(peripherals.pins.gpio5),
        &SpiConfig::new().baudrate(Hertz(26_000_000)),
    )?;
    let dc = PinDriver::output(peripherals.pins.gpio14)?;
    let rst = PinDriver::output(peripherals.pins.gpio12)?;

    let tft = Builder::new(mipidsi::models::ST7789, SPIInterface::new(spi, dc))
        .display_size(135, 240)
        .display_offset(52, 40)
        .color_order(ColorOrder::Bgr)
        .orientation(Orientation::new().rotate(Rotation::Deg90))
        .reset_pin(rst)
        .init(&mut Delay::new_default())
        .map_err(|e| format!("display init: {e:?}"))?;
    let screen = LcdScreen::new(tft, backlight)?;

    let device = BLEDevice::take();
    let mut service = UartService::start(NimbleRadio::new(device), ServiceConfig::default())?;

    let app = Arc::new(Mutex::new(DisplayApp::new(screen, service.adv_name())?));
    DisplayApp::attach(&app, &mut service);

    let (events_tx, events) = mpsc::channel();
    service.radio().forward_events(events_tx)?;

    loop {
        match events.recv_timeout(TICK) {
            Ok(event) => service.handle_event(event)?,
            Err(RecvTimeoutError::Timeout) => {
                let Ok(mut app) = app.lock() else {
                    return Err("display app lock poisoned".into());
                };
                if let Err(e) = app.tick() {
                    error!("tick: {e}");
                }
            }
            Err(RecvTimeoutError::Disconnected) => return Err("radio event channel closed".into()),
        }
    }
}
