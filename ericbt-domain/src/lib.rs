//! Shared definitions for the ericbt BLE UART display link

pub mod advertising;
pub mod app;
pub mod command;
pub mod display;
pub mod identity;
pub mod marquee;
pub mod service;
pub mod status;

use uuid::Uuid;

/// Nordic UART Service UUID
pub const NUS_SERVICE_UUID_STR: &str = "6E400001-B5A3-F393-E0A9-E50E24DCCA9E";

/// Inbound characteristic (client writes here)
pub const NUS_RX_CHARACTERISTIC_UUID_STR: &str = "6E400002-B5A3-F393-E0A9-E50E24DCCA9E";

/// Outbound characteristic (peripheral notifies here)
pub const NUS_TX_CHARACTERISTIC_UUID_STR: &str = "6E400003-B5A3-F393-E0A9-E50E24DCCA9E";

pub const NUS_SERVICE_UUID: Uuid = Uuid::from_u128(0x6E400001_B5A3_F393_E0A9_E50E24DCCA9E);
pub const NUS_RX_CHARACTERISTIC_UUID: Uuid = Uuid::from_u128(0x6E400002_B5A3_F393_E0A9_E50E24DCCA9E);
pub const NUS_TX_CHARACTERISTIC_UUID: Uuid = Uuid::from_u128(0x6E400003_B5A3_F393_E0A9_E50E24DCCA9E);

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn string_and_typed_uuids_agree() {
        assert_eq!(Uuid::parse_str(NUS_SERVICE_UUID_STR).unwrap(), NUS_SERVICE_UUID);
        assert_eq!(
            Uuid::parse_str(NUS_RX_CHARACTERISTIC_UUID_STR).unwrap(),
            NUS_RX_CHARACTERISTIC_UUID
        );
        assert_eq!(
            Uuid::parse_str(NUS_TX_CHARACTERISTIC_UUID_STR).unwrap(),
            NUS_TX_CHARACTERISTIC_UUID
        );
    }
}
