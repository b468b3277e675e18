use std::pin::Pin;

use async_trait::async_trait;
use btleplug::api::{Characteristic, Peripheral as _, WriteType};
use btleplug::platform::Peripheral;
use ericbt_domain::{NUS_RX_CHARACTERISTIC_UUID, NUS_TX_CHARACTERISTIC_UUID};
use futures::stream::{Stream, StreamExt};
use tracing::{debug, info};

use crate::{CommandSink, LinkError};

/// Whether the peripheral has to confirm each write
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Delivery {
    #[default]
    FireAndForget,
    Acknowledged,
}

impl From<Delivery> for WriteType {
    fn from(delivery: Delivery) -> Self {
        match delivery {
            Delivery::FireAndForget => WriteType::WithoutResponse,
            Delivery::Acknowledged => WriteType::WithResponse,
        }
    }
}

pub type AckStream = Pin<Box<dyn Stream<Item = Vec<u8>> + Send>>;

/// An open connection to the peripheral's UART service.
pub struct UartLink {
    peripheral: Peripheral,
    rx: Characteristic,
    tx: Option<Characteristic>,
    delivery: Delivery,
}

impl UartLink {
    pub async fn connect(peripheral: Peripheral, delivery: Delivery) -> Result<UartLink, LinkError> {
        info!("Connecting...");
        if !peripheral.is_connected().await? {
            peripheral.connect().await?;
        }
        peripheral.discover_services().await?;

        let characteristics = peripheral.characteristics();
        let rx = characteristics
            .iter()
            .find(|c| c.uuid == NUS_RX_CHARACTERISTIC_UUID)
            .cloned()
            .ok_or(LinkError::MissingCharacteristic(NUS_RX_CHARACTERISTIC_UUID))?;
        let tx = characteristics
            .iter()
            .find(|c| c.uuid == NUS_TX_CHARACTERISTIC_UUID)
            .cloned();
        if tx.is_none() {
            debug!("No TX characteristic, acknowledgements unavailable");
        }

        info!("Connected!");
        Ok(UartLink {
            peripheral,
            rx,
            tx,
            delivery,
        })
    }

    /// Subscribe to TX notifications. `None` when the device has no TX characteristic.
    pub async fn subscribe_acks(&self) -> Result<Option<AckStream>, LinkError> {
        let Some(tx) = &self.tx else {
            return Ok(None);
        };
        let notifications = self.peripheral.notifications().await?;
        self.peripheral.subscribe(tx).await?;
        let uuid = tx.uuid;
        let acks = notifications.filter_map(move |n| async move { (n.uuid == uuid).then_some(n.value) });
        Ok(Some(Box::pin(acks)))
    }

    pub async fn disconnect(&self) -> Result<(), LinkError> {
        self.peripheral.disconnect().await?;
        Ok(())
    }
}

#[async_trait]
impl CommandSink for UartLink {
    async fn send(&mut self, payload: &[u8]) -> Result<(), LinkError> {
        self.peripheral
            .write(&self.rx, payload, self.delivery.into())
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn delivery_maps_to_write_type() {
        assert_eq!(WriteType::from(Delivery::default()), WriteType::WithoutResponse);
        assert_eq!(WriteType::from(Delivery::Acknowledged), WriteType::WithResponse);
    }
}
