//! Property tests over identity, advertising and the dispatcher.
//!
//! Host only; compiled out when building for the ESP-IDF target.

#![cfg(not(target_os = "espidf"))]

use std::collections::BTreeSet;
use std::time::Duration;

use ericbt_domain::advertising::{
    AD_TYPE_COMPLETE_NAME, AD_TYPE_FLAGS, AdvError, MAX_ADV_BYTES, build_advertising,
    build_scan_response, decode_records,
};
use ericbt_domain::identity::{SuffixWidth, suffix_from_address};
use ericbt_domain::service::{
    AttrHandle, ConnHandle, Radio, RadioEvent, ServiceConfig, UartHandles, UartService,
};
use proptest::prelude::*;
use uuid::Uuid;

const BASE62: &str = "0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz";

fn arb_width() -> impl Strategy<Value = SuffixWidth> {
    prop_oneof![Just(SuffixWidth::Three), Just(SuffixWidth::Four)]
}

proptest! {
    #[test]
    fn suffix_has_fixed_width_and_alphabet(
        address in proptest::collection::vec(any::<u8>(), 2..=8),
        width in arb_width(),
    ) {
        let suffix = suffix_from_address(Some(address.as_slice()), width);
        prop_assert_eq!(suffix.len(), width.chars());
        prop_assert!(suffix.chars().all(|c| BASE62.contains(c)));
    }

    #[test]
    fn short_address_falls_back_to_zeros(
        address in proptest::collection::vec(any::<u8>(), 0..2),
        width in arb_width(),
    ) {
        prop_assert_eq!(suffix_from_address(Some(address.as_slice()), width), "0".repeat(width.chars()));
    }

    #[test]
    fn advertising_round_trips(name in "[ -~]{1,26}") {
        let payload = build_advertising(Some(&name)).unwrap();
        let records = decode_records(payload.as_bytes()).unwrap();
        prop_assert_eq!(records.len(), 2);
        prop_assert_eq!(records[0].ad_type, AD_TYPE_FLAGS);
        prop_assert_eq!(&records[0].value, &vec![0x06u8]);
        prop_assert_eq!(records[1].ad_type, AD_TYPE_COMPLETE_NAME);
        prop_assert_eq!(&records[1].value, &name.into_bytes());
    }

    #[test]
    fn oversized_advertising_always_fails(name in "[a-z]{27,64}") {
        let result = build_advertising(Some(&name));
        let too_long = matches!(result, Err(AdvError::TooLong { len, .. }) if len > MAX_ADV_BYTES);
        prop_assert!(too_long);
    }

    #[test]
    fn scan_response_fits_one_uuid_only(ids in proptest::collection::vec(any::<u128>(), 0..4)) {
        let uuids: Vec<Uuid> = ids.into_iter().map(Uuid::from_u128).collect();
        let result = build_scan_response(&uuids);
        prop_assert_eq!(result.is_ok(), uuids.len() <= 1);
    }
}

#[derive(Default)]
struct FlakyRadio {
    failing: BTreeSet<ConnHandle>,
    delivered: Vec<ConnHandle>,
    advertise_calls: usize,
}

impl Radio for FlakyRadio {
    type Error = &'static str;

    fn address(&mut self) -> Option<Vec<u8>> {
        None
    }
    fn register_uart(&mut self) -> Result<UartHandles, Self::Error> {
        Ok(UartHandles { tx: 1, rx: 2 })
    }
    fn set_rx_buffer(&mut self, _rx: AttrHandle, _size: usize) -> Result<(), Self::Error> {
        Ok(())
    }
    fn set_preferred_mtu(&mut self, _mtu: u16) -> Result<(), Self::Error> {
        Ok(())
    }
    fn advertise(&mut self, _: Duration, _: &[u8], _: Option<&[u8]>) -> Result<(), Self::Error> {
        self.advertise_calls += 1;
        Ok(())
    }
    fn stop_advertising(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }
    fn notify(&mut self, conn: ConnHandle, _handle: AttrHandle, _data: &[u8]) -> Result<(), Self::Error> {
        if self.failing.contains(&conn) {
            return Err("peer gone");
        }
        self.delivered.push(conn);
        Ok(())
    }
}

fn connected(peers: &BTreeSet<ConnHandle>) -> UartService<FlakyRadio> {
    let mut service = UartService::start(FlakyRadio::default(), ServiceConfig::default()).unwrap();
    for &peer in peers {
        service.handle_event(RadioEvent::Connect(peer)).unwrap();
    }
    service
}

proptest! {
    #[test]
    fn broadcast_reaches_every_healthy_peer(
        peers in proptest::collection::btree_set(any::<u16>(), 1..8),
        pick in any::<prop::sample::Index>(),
    ) {
        let mut service = connected(&peers);
        let failing = *pick.get(&peers.iter().copied().collect::<Vec<_>>());
        service.radio_mut().failing.insert(failing);

        service.notify(b"status", None);

        let expected: Vec<ConnHandle> = peers.iter().copied().filter(|&p| p != failing).collect();
        prop_assert_eq!(&service.radio().delivered, &expected);
    }

    #[test]
    fn disconnect_readvertises_once(
        peers in proptest::collection::btree_set(any::<u16>(), 1..8),
        pick in any::<prop::sample::Index>(),
    ) {
        let mut service = connected(&peers);
        let leaving = *pick.get(&peers.iter().copied().collect::<Vec<_>>());
        let before = service.radio().advertise_calls;

        service.handle_event(RadioEvent::Disconnect(leaving)).unwrap();

        prop_assert!(!service.is_connected(leaving));
        prop_assert_eq!(service.connections().count(), peers.len() - 1);
        prop_assert_eq!(service.radio().advertise_calls, before + 1);
    }
}
