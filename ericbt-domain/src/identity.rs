//! Advertised device identity derived from the hardware address

/// Character used for left padding and for the fallback suffix
pub const PAD_DIGIT: char = '0';

/// Number of base62 characters in the advertised name suffix.
///
/// Three characters already cover the whole 16-bit range (62^3 > 65535), so
/// the four character form always starts with a zero.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SuffixWidth {
    Three,
    #[default]
    Four,
}

impl SuffixWidth {
    #[must_use]
    pub fn chars(self) -> usize {
        match self {
            SuffixWidth::Three => 3,
            SuffixWidth::Four => 4,
        }
    }
}

/// Encode the last two address bytes (big-endian) as a fixed width base62 suffix.
///
/// An absent address, or one shorter than two bytes, yields a suffix made only
/// of zero characters.
#[must_use]
pub fn suffix_from_address(address: Option<&[u8]>, width: SuffixWidth) -> String {
    let width = width.chars();
    match address {
        Some([.., high, low]) => {
            let value = u16::from_be_bytes([*high, *low]);
            format!("{:0>width$}", base62::encode(value))
        }
        _ => PAD_DIGIT.to_string().repeat(width),
    }
}

/// `"<base>-<suffix>"`
#[must_use]
pub fn advertised_name(base_name: &str, address: Option<&[u8]>, width: SuffixWidth) -> String {
    format!("{base_name}-{}", suffix_from_address(address, width))
}

/// Colon separated upper-case hex, e.g. `24:0A:C4:12:44:06`
#[must_use]
pub fn format_address(address: Option<&[u8]>) -> String {
    match address {
        Some(bytes) if !bytes.is_empty() => bytes
            .iter()
            .map(|b| format!("{b:02X}"))
            .collect::<Vec<_>>()
            .join(":"),
        _ => "<unknown>".to_string(),
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn known_address_matches_companion_default() {
        let mac = [0x24, 0x0a, 0xc4, 0x12, 0x44, 0x06];
        assert_eq!(suffix_from_address(Some(&mac), SuffixWidth::Four), "04Ws");
        assert_eq!(suffix_from_address(Some(&mac), SuffixWidth::Three), "4Ws");
        assert_eq!(
            advertised_name("ericbt", Some(&mac), SuffixWidth::Four),
            "ericbt-04Ws"
        );
    }

    #[test]
    fn extremes_of_the_16_bit_range() {
        assert_eq!(suffix_from_address(Some(&[0, 0]), SuffixWidth::Four), "0000");
        assert_eq!(suffix_from_address(Some(&[0xff, 0xff]), SuffixWidth::Four), "0H31");
        assert_eq!(suffix_from_address(Some(&[0xff, 0xff]), SuffixWidth::Three), "H31");
    }

    #[test]
    fn only_the_last_two_bytes_count() {
        let a = [0x01, 0x02, 0x03, 0x04, 0x00, 0x3d];
        let b = [0xaa, 0xbb, 0x00, 0x3d];
        assert_eq!(
            suffix_from_address(Some(&a), SuffixWidth::Four),
            suffix_from_address(Some(&b), SuffixWidth::Four)
        );
        assert_eq!(suffix_from_address(Some(&a), SuffixWidth::Four), "000z");
    }

    #[test]
    fn short_or_missing_address_falls_back() {
        assert_eq!(suffix_from_address(None, SuffixWidth::Four), "0000");
        assert_eq!(suffix_from_address(Some(&[]), SuffixWidth::Four), "0000");
        assert_eq!(suffix_from_address(Some(&[0x7f]), SuffixWidth::Three), "000");
        assert_eq!(advertised_name("ericbt", None, SuffixWidth::Four), "ericbt-0000");
    }

    #[test]
    fn address_formatting() {
        let mac = [0x24, 0x0a, 0xc4, 0x12, 0x44, 0x06];
        assert_eq!(format_address(Some(&mac)), "24:0A:C4:12:44:06");
        assert_eq!(format_address(None), "<unknown>");
    }
}
