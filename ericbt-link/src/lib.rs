//! Companion side of the ericbt link: find the peripheral, open its UART
//! characteristics and push status frames at it.

pub mod finder;
pub mod link;
pub mod pump;

use std::error::Error;
use std::fmt;

use async_trait::async_trait;
use uuid::Uuid;

/// Anything a JSON command payload can be written to.
#[async_trait]
pub trait CommandSink: Send {
    async fn send(&mut self, payload: &[u8]) -> Result<(), LinkError>;
}

#[derive(Debug)]
pub enum LinkError {
    NoAdapter,
    MissingCharacteristic(Uuid),
    Disconnected,
    Ble(btleplug::Error),
    Encode(serde_json::Error),
}

impl fmt::Display for LinkError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LinkError::NoAdapter => write!(f, "No Bluetooth adapters found"),
            LinkError::MissingCharacteristic(uuid) => {
                write!(f, "characteristic {uuid} not found on device")
            }
            LinkError::Disconnected => write!(f, "device disconnected"),
            LinkError::Ble(e) => write!(f, "bluetooth: {e}"),
            LinkError::Encode(e) => write!(f, "encoding command: {e}"),
        }
    }
}

impl Error for LinkError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            LinkError::Ble(e) => Some(e),
            LinkError::Encode(e) => Some(e),
            _ => None,
        }
    }
}

impl From<btleplug::Error> for LinkError {
    fn from(e: btleplug::Error) -> Self {
        match e {
            btleplug::Error::NotConnected => LinkError::Disconnected,
            other => LinkError::Ble(other),
        }
    }
}

impl From<serde_json::Error> for LinkError {
    fn from(e: serde_json::Error) -> Self {
        LinkError::Encode(e)
    }
}
