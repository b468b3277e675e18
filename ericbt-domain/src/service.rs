//! BLE UART peripheral service.
//!
//! [`UartService`] sits on top of a platform [`Radio`]: it registers the
//! Nordic UART service, advertises `"<base>-<suffix>"`, tracks connected
//! centrals and dispatches [`RadioEvent`]s to optional hooks. Hook failures
//! are logged and never disturb the dispatcher. The only error that escapes
//! [`UartService::handle_event`] is an advertising failure that the
//! name-only fallback could not recover from.

use std::collections::BTreeSet;
use std::error::Error;
use std::fmt;
use std::time::Duration;

use log::{debug, error, info, warn};

use crate::NUS_SERVICE_UUID;
use crate::advertising::{AdvError, AdvPayload, build_advertising, build_scan_response};
use crate::identity::{SuffixWidth, advertised_name, format_address};

/// Opaque peer handle assigned by the radio stack
pub type ConnHandle = u16;

/// GATT attribute value handle
pub type AttrHandle = u16;

pub type HookError = Box<dyn Error + Send + Sync>;

/// Prefix of the reply sent when no receive hook is registered
pub const DEFAULT_ACK_PREFIX: &[u8] = b"OK:";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct UartHandles {
    /// Notify + read, peripheral to central
    pub tx: AttrHandle,
    /// Write + write without response, central to peripheral
    pub rx: AttrHandle,
}

/// The platform BLE stack as seen by [`UartService`].
pub trait Radio {
    type Error: fmt::Display;

    /// Hardware address in display order, if the stack can report one
    fn address(&mut self) -> Option<Vec<u8>>;

    /// Create the UART service with its TX and RX characteristics
    fn register_uart(&mut self) -> Result<UartHandles, Self::Error>;

    fn set_rx_buffer(&mut self, rx: AttrHandle, size: usize) -> Result<(), Self::Error>;

    fn set_preferred_mtu(&mut self, mtu: u16) -> Result<(), Self::Error>;

    fn advertise(
        &mut self,
        interval: Duration,
        adv_data: &[u8],
        resp_data: Option<&[u8]>,
    ) -> Result<(), Self::Error>;

    fn stop_advertising(&mut self) -> Result<(), Self::Error>;

    fn notify(
        &mut self,
        conn: ConnHandle,
        value_handle: AttrHandle,
        data: &[u8],
    ) -> Result<(), Self::Error>;
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RadioEvent {
    Connect(ConnHandle),
    Disconnect(ConnHandle),
    Write {
        conn: ConnHandle,
        value_handle: AttrHandle,
        data: Vec<u8>,
    },
}

#[derive(Clone, Debug)]
pub struct ServiceConfig {
    pub base_name: String,
    pub suffix_width: SuffixWidth,
    /// Put the service UUID in the scan response
    pub include_uuid_in_scan_response: bool,
    /// RX characteristic buffer, also requested as the preferred MTU
    pub rx_buffer_size: usize,
    pub advertise_interval: Duration,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            base_name: "ericbt".to_string(),
            suffix_width: SuffixWidth::Four,
            include_uuid_in_scan_response: true,
            rx_buffer_size: 128,
            advertise_interval: Duration::from_millis(30),
        }
    }
}

#[derive(Debug)]
pub enum ServiceError {
    Payload(AdvError),
    Register(String),
    Advertise(String),
}

impl fmt::Display for ServiceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ServiceError::Payload(e) => write!(f, "advertising payload: {e}"),
            ServiceError::Register(e) => write!(f, "registering UART service: {e}"),
            ServiceError::Advertise(e) => write!(f, "advertising failed: {e}"),
        }
    }
}

impl Error for ServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            ServiceError::Payload(e) => Some(e),
            _ => None,
        }
    }
}

impl From<AdvError> for ServiceError {
    fn from(e: AdvError) -> Self {
        ServiceError::Payload(e)
    }
}

type ConnectionHook = Box<dyn FnMut(ConnHandle) -> Result<(), HookError> + Send>;
type ReceiveHook = Box<dyn FnMut(&[u8], ConnHandle) -> Result<Option<Vec<u8>>, HookError> + Send>;

#[derive(Default)]
struct Hooks {
    on_connect: Option<ConnectionHook>,
    on_disconnect: Option<ConnectionHook>,
    on_receive: Option<ReceiveHook>,
}

pub struct UartService<R: Radio> {
    radio: R,
    handles: UartHandles,
    adv_name: String,
    base_name: String,
    advertise_interval: Duration,
    adv: AdvPayload,
    resp: Option<AdvPayload>,
    connections: BTreeSet<ConnHandle>,
    hooks: Hooks,
}

impl<R: Radio> UartService<R> {
    /// Register the service and start advertising.
    pub fn start(mut radio: R, config: ServiceConfig) -> Result<Self, ServiceError> {
        let address = radio.address();
        let adv_name = advertised_name(&config.base_name, address.as_deref(), config.suffix_width);

        let handles = radio
            .register_uart()
            .map_err(|e| ServiceError::Register(e.to_string()))?;

        if let Err(e) = radio.set_rx_buffer(handles.rx, config.rx_buffer_size) {
            debug!("RX buffer of {} bytes not applied: {e}", config.rx_buffer_size);
        }
        let mtu = u16::try_from(config.rx_buffer_size).unwrap_or(u16::MAX);
        if let Err(e) = radio.set_preferred_mtu(mtu) {
            debug!("Preferred MTU {mtu} not applied: {e}");
        }

        let adv = build_advertising(Some(&adv_name))?;
        let resp = if config.include_uuid_in_scan_response {
            Some(build_scan_response(&[NUS_SERVICE_UUID])?)
        } else {
            None
        };

        let mut service = Self {
            radio,
            handles,
            adv_name,
            base_name: config.base_name,
            advertise_interval: config.advertise_interval,
            adv,
            resp,
            connections: BTreeSet::new(),
            hooks: Hooks::default(),
        };
        service.advertise()?;

        info!("Advertising as: {}", service.adv_name);
        info!("BLE MAC: {}", format_address(address.as_deref()));
        info!("TX handle: {} RX handle: {}", handles.tx, handles.rx);
        Ok(service)
    }

    #[must_use]
    pub fn adv_name(&self) -> &str {
        &self.adv_name
    }

    #[must_use]
    pub fn handles(&self) -> UartHandles {
        self.handles
    }

    pub fn connections(&self) -> impl Iterator<Item = ConnHandle> + '_ {
        self.connections.iter().copied()
    }

    #[must_use]
    pub fn is_connected(&self, conn: ConnHandle) -> bool {
        self.connections.contains(&conn)
    }

    #[must_use]
    pub fn radio(&self) -> &R {
        &self.radio
    }

    pub fn radio_mut(&mut self) -> &mut R {
        &mut self.radio
    }

    pub fn set_on_connect<F>(&mut self, hook: F)
    where
        F: FnMut(ConnHandle) -> Result<(), HookError> + Send + 'static,
    {
        self.hooks.on_connect = Some(Box::new(hook));
    }

    pub fn set_on_disconnect<F>(&mut self, hook: F)
    where
        F: FnMut(ConnHandle) -> Result<(), HookError> + Send + 'static,
    {
        self.hooks.on_disconnect = Some(Box::new(hook));
    }

    /// The hook gets the written bytes and the writer's handle; a non-empty
    /// reply is notified back to that writer.
    pub fn set_on_receive<F>(&mut self, hook: F)
    where
        F: FnMut(&[u8], ConnHandle) -> Result<Option<Vec<u8>>, HookError> + Send + 'static,
    {
        self.hooks.on_receive = Some(Box::new(hook));
    }

    pub fn handle_event(&mut self, event: RadioEvent) -> Result<(), ServiceError> {
        match event {
            RadioEvent::Connect(conn) => {
                self.connections.insert(conn);
                info!("Central connected: {conn}");
                if let Some(hook) = self.hooks.on_connect.as_mut()
                    && let Err(e) = hook(conn)
                {
                    error!("on_connect error: {e}");
                }
                Ok(())
            }
            RadioEvent::Disconnect(conn) => {
                self.connections.remove(&conn);
                info!("Central disconnected: {conn}");
                if let Some(hook) = self.hooks.on_disconnect.as_mut()
                    && let Err(e) = hook(conn)
                {
                    error!("on_disconnect error: {e}");
                }
                self.advertise()
            }
            RadioEvent::Write {
                conn,
                value_handle,
                data,
            } => {
                if value_handle == self.handles.rx {
                    self.receive(conn, &data);
                } else {
                    debug!("Ignoring write to handle {value_handle} from {conn}");
                }
                Ok(())
            }
        }
    }

    fn receive(&mut self, conn: ConnHandle, data: &[u8]) {
        let Some(hook) = self.hooks.on_receive.as_mut() else {
            let mut echo = Vec::with_capacity(DEFAULT_ACK_PREFIX.len() + data.len());
            echo.extend_from_slice(DEFAULT_ACK_PREFIX);
            echo.extend_from_slice(data);
            self.notify(&echo, Some(conn));
            return;
        };
        match hook(data, conn) {
            Ok(Some(reply)) if !reply.is_empty() => self.notify(&reply, Some(conn)),
            Ok(_) => {}
            Err(e) => error!("on_receive error: {e}"),
        }
    }

    /// Send to one peer, or to every connected peer when `conn` is `None`.
    /// A failing peer is skipped.
    pub fn notify(&mut self, data: &[u8], conn: Option<ConnHandle>) {
        let tx = self.handles.tx;
        match conn {
            Some(conn) => {
                if let Err(e) = self.radio.notify(conn, tx, data) {
                    debug!("Notify to {conn} dropped: {e}");
                }
            }
            None => {
                for &peer in &self.connections {
                    if let Err(e) = self.radio.notify(peer, tx, data) {
                        debug!("Notify to {peer} dropped: {e}");
                    }
                }
            }
        }
    }

    /// Stop then start advertising. Falls back once to a flags + base name payload.
    pub fn advertise(&mut self) -> Result<(), ServiceError> {
        self.stop_advertising();
        let resp = self.resp.as_ref().map(AdvPayload::as_bytes);
        let Err(e) = self
            .radio
            .advertise(self.advertise_interval, self.adv.as_bytes(), resp)
        else {
            return Ok(());
        };
        warn!("Advertising failed: {e}");

        let name_only = build_advertising(Some(&self.base_name))?;
        match self
            .radio
            .advertise(self.advertise_interval, name_only.as_bytes(), None)
        {
            Ok(()) => {
                info!("Fell back to name-only advertising.");
                Ok(())
            }
            Err(e) => {
                error!("Fallback advertising also failed: {e}");
                Err(ServiceError::Advertise(e.to_string()))
            }
        }
    }

    pub fn stop_advertising(&mut self) {
        if let Err(e) = self.radio.stop_advertising() {
            debug!("Stopping advertising: {e}");
        }
    }
}
