//! Advertising and scan-response payloads: `[len][type][value]` records, 31 bytes max

use std::fmt;

use uuid::Uuid;

/// Legacy advertising PDUs carry at most 31 bytes of AD structures
pub const MAX_ADV_BYTES: usize = 31;

/// Longest name that still goes out as a "complete local name" record
pub const MAX_COMPLETE_NAME_BYTES: usize = 26;

pub const AD_TYPE_FLAGS: u8 = 0x01;
pub const AD_TYPE_UUID128_COMPLETE: u8 = 0x07;
pub const AD_TYPE_SHORTENED_NAME: u8 = 0x08;
pub const AD_TYPE_COMPLETE_NAME: u8 = 0x09;

pub const LE_GENERAL_DISCOVERABLE: u8 = 0x02;
pub const BR_EDR_NOT_SUPPORTED: u8 = 0x04;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PayloadKind {
    Advertising,
    ScanResponse,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AdvError {
    /// The encoded payload does not fit in [`MAX_ADV_BYTES`]
    TooLong { kind: PayloadKind, len: usize },
    /// A record claims more bytes than remain in the buffer
    Malformed { offset: usize },
}

impl fmt::Display for AdvError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AdvError::TooLong {
                kind: PayloadKind::Advertising,
                len,
            } => write!(f, "adv_data is {len} bytes, limit is {MAX_ADV_BYTES}; shorten the name"),
            AdvError::TooLong {
                kind: PayloadKind::ScanResponse,
                len,
            } => write!(
                f,
                "resp_data is {len} bytes, limit is {MAX_ADV_BYTES}; remove UUIDs or fields"
            ),
            AdvError::Malformed { offset } => write!(f, "truncated AD record at offset {offset}"),
        }
    }
}

impl std::error::Error for AdvError {}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AdRecord {
    pub ad_type: u8,
    pub value: Vec<u8>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AdvPayload(Vec<u8>);

impl AdvPayload {
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn records(&self) -> Result<Vec<AdRecord>, AdvError> {
        decode_records(&self.0)
    }

    fn push(&mut self, ad_type: u8, value: &[u8]) {
        // Oversized values are caught by `finish`, the length byte just saturates.
        let len = u8::try_from(value.len() + 1).unwrap_or(u8::MAX);
        self.0.push(len);
        self.0.push(ad_type);
        self.0.extend_from_slice(value);
    }

    fn finish(self, kind: PayloadKind) -> Result<AdvPayload, AdvError> {
        if self.0.len() > MAX_ADV_BYTES {
            Err(AdvError::TooLong {
                kind,
                len: self.0.len(),
            })
        } else {
            Ok(self)
        }
    }
}

/// Flags record followed by an optional name record.
pub fn build_advertising(name: Option<&str>) -> Result<AdvPayload, AdvError> {
    let mut payload = AdvPayload::default();
    payload.push(AD_TYPE_FLAGS, &[LE_GENERAL_DISCOVERABLE | BR_EDR_NOT_SUPPORTED]);
    if let Some(name) = name.filter(|n| !n.is_empty()) {
        let encoded = name.as_bytes();
        let ad_type = if encoded.len() <= MAX_COMPLETE_NAME_BYTES {
            AD_TYPE_COMPLETE_NAME
        } else {
            AD_TYPE_SHORTENED_NAME
        };
        payload.push(ad_type, encoded);
    }
    payload.finish(PayloadKind::Advertising)
}

/// One complete-list record per 128-bit service UUID, little-endian on the air.
pub fn build_scan_response(services: &[Uuid]) -> Result<AdvPayload, AdvError> {
    let mut payload = AdvPayload::default();
    for service in services {
        payload.push(AD_TYPE_UUID128_COMPLETE, &service.as_u128().to_le_bytes());
    }
    payload.finish(PayloadKind::ScanResponse)
}

/// Split a buffer into its AD records. A zero length byte ends the significant part.
pub fn decode_records(data: &[u8]) -> Result<Vec<AdRecord>, AdvError> {
    let mut records = Vec::new();
    let mut offset = 0;
    while offset < data.len() {
        let len = usize::from(data[offset]);
        if len == 0 {
            break;
        }
        let end = offset + 1 + len;
        if end > data.len() {
            return Err(AdvError::Malformed { offset });
        }
        records.push(AdRecord {
            ad_type: data[offset + 1],
            value: data[offset + 2..end].to_vec(),
        });
        offset = end;
    }
    Ok(records)
}
