//! NimBLE binding of the UART service's radio seam

use std::fmt;
use std::sync::mpsc::Sender;
use std::sync::Arc;
use std::time::Duration;

use esp32_nimble::utilities::mutex::Mutex;
use esp32_nimble::{uuid128, BLECharacteristic, BLEDevice, NimbleProperties};
use ericbt_domain::service::{AttrHandle, ConnHandle, Radio, RadioEvent, UartHandles};
use ericbt_domain::{NUS_RX_CHARACTERISTIC_UUID_STR, NUS_SERVICE_UUID_STR, NUS_TX_CHARACTERISTIC_UUID_STR};
use log::{debug, warn};

/// NimBLE only hands out attribute handles once the server is running, so
/// the dispatcher sees these fixed ones instead.
const TX_HANDLE: AttrHandle = 1;
const RX_HANDLE: AttrHandle = 2;

/// Advertising intervals are counted in 0.625 ms units
const ADV_UNIT_MICROS: u128 = 625;

#[derive(Debug)]
pub struct RadioError(String);

impl fmt::Display for RadioError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::error::Error for RadioError {}

fn nimble_err(e: impl fmt::Debug) -> RadioError {
    RadioError(format!("{e:?}"))
}

type Characteristic = Arc<Mutex<BLECharacteristic>>;

pub struct NimbleRadio {
    device: &'static BLEDevice,
    tx: Option<Characteristic>,
    rx: Option<Characteristic>,
}

impl NimbleRadio {
    pub fn new(device: &'static BLEDevice) -> Self {
        Self {
            device,
            tx: None,
            rx: None,
        }
    }

    /// Push stack callbacks into `events` for the main loop to dispatch.
    pub fn forward_events(&self, events: Sender<RadioEvent>) -> Result<(), RadioError> {
        let rx = self
            .rx
            .as_ref()
            .ok_or_else(|| RadioError("UART service not registered".to_string()))?;

        let server = self.device.get_server();
        server.advertise_on_disconnect(false);

        let on_connect = events.clone();
        server.on_connect(move |_server, desc| {
            if on_connect.send(RadioEvent::Connect(desc.conn_handle())).is_err() {
                warn!("event loop gone, dropping connect");
            }
        });
        let on_disconnect = events.clone();
        server.on_disconnect(move |desc, reason| {
            debug!("disconnect reason: {reason:?}");
            if on_disconnect.send(RadioEvent::Disconnect(desc.conn_handle())).is_err() {
                warn!("event loop gone, dropping disconnect");
            }
        });
        rx.lock().on_write(move |args| {
            let event = RadioEvent::Write {
                conn: args.desc().conn_handle(),
                value_handle: RX_HANDLE,
                data: args.recv_data().to_vec(),
            };
            if events.send(event).is_err() {
                warn!("event loop gone, dropping write");
            }
        });
        Ok(())
    }
}

impl Radio for NimbleRadio {
    type Error = RadioError;

    fn address(&mut self) -> Option<Vec<u8>> {
        match self.device.get_addr() {
            Ok(address) => Some(address.as_be_bytes().to_vec()),
            Err(e) => {
                warn!("no BLE address: {e:?}");
                None
            }
        }
    }

    fn register_uart(&mut self) -> Result<UartHandles, RadioError> {
        let server = self.device.get_server();
        let service = server.create_service(uuid128!(NUS_SERVICE_UUID_STR));
        let tx = service.lock().create_characteristic(
            uuid128!(NUS_TX_CHARACTERISTIC_UUID_STR),
            NimbleProperties::READ | NimbleProperties::NOTIFY,
        );
        let rx = service.lock().create_characteristic(
            uuid128!(NUS_RX_CHARACTERISTIC_UUID_STR),
            NimbleProperties::WRITE | NimbleProperties::WRITE_NO_RSP,
        );
        self.tx = Some(tx);
        self.rx = Some(rx);
        Ok(UartHandles {
            tx: TX_HANDLE,
            rx: RX_HANDLE,
        })
    }

    fn set_rx_buffer(&mut self, _rx: AttrHandle, size: usize) -> Result<(), RadioError> {
        // characteristic values grow on demand, the MTU is what bounds a write
        debug!("RX buffer {size} bytes");
        Ok(())
    }

    fn set_preferred_mtu(&mut self, mtu: u16) -> Result<(), RadioError> {
        self.device.set_preferred_mtu(mtu).map_err(nimble_err)
    }

    fn advertise(
        &mut self,
        interval: Duration,
        adv_data: &[u8],
        resp_data: Option<&[u8]>,
    ) -> Result<(), RadioError> {
        let units = u16::try_from(interval.as_micros() / ADV_UNIT_MICROS).unwrap_or(u16::MAX);
        let mut advertising = self.device.get_advertising().lock();
        advertising.set_raw_data(adv_data).map_err(nimble_err)?;
        if let Some(resp) = resp_data {
            advertising
                .scan_response(true)
                .set_raw_scan_response_data(resp)
                .map_err(nimble_err)?;
        } else {
            advertising.scan_response(false);
        }
        advertising.min_interval(units).max_interval(units);
        advertising.start().map_err(nimble_err)
    }

    fn stop_advertising(&mut self) -> Result<(), RadioError> {
        self.device.get_advertising().lock().stop().map_err(nimble_err)
    }

    fn notify(&mut self, conn: ConnHandle, value_handle: AttrHandle, data: &[u8]) -> Result<(), RadioError> {
        if value_handle != TX_HANDLE {
            return Err(RadioError(format!("unknown value handle {value_handle}")));
        }
        let tx = self
            .tx
            .as_ref()
            .ok_or_else(|| RadioError("UART service not registered".to_string()))?;
        tx.lock().notify_with(data, conn).map_err(nimble_err)
    }
}
