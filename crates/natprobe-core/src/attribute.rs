//! STUN attribute codec.
//!
//! Attributes are TLV encoded: a 16-bit type, a 16-bit value length and the
//! value bytes, all big-endian. This module also decodes the MAPPED-ADDRESS
//! and XOR-MAPPED-ADDRESS value layouts:
//!
//! ```text
//!  0                   1                   2                   3
//!  0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! |0 0 0 0 0 0 0 0|    Family     |           Port                |
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! |                 Address (32 bits or 128 bits)                 |
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! ```

use crate::error::{CodecError, CodecResult};
use crate::message::{MAGIC_COOKIE, TransactionId};
use crate::reader::ByteReader;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};

/// Attribute header size (type + length)
pub const ATTRIBUTE_HEADER_SIZE: usize = 4;

/// Address family code for IPv4
pub const FAMILY_IPV4: u8 = 0x01;

/// Address family code for IPv6
pub const FAMILY_IPV6: u8 = 0x02;

/// Textual address reported for an unknown address family
pub const UNSUPPORTED_ADDRESS: &str = "unsupported";

/// CHANGE-REQUEST flag: respond from a different IP address
pub const CHANGE_IP: u32 = 0x04;

/// CHANGE-REQUEST flag: respond from a different port
pub const CHANGE_PORT: u32 = 0x02;

/// Attribute type codes known to this engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u16)]
pub enum AttributeType {
    /// Reserved (0x0000)
    Reserved = 0x0000,
    /// MAPPED-ADDRESS (0x0001)
    MappedAddress = 0x0001,
    /// RESPONSE-ADDRESS (0x0002)
    ResponseAddress = 0x0002,
    /// CHANGE-REQUEST (0x0003)
    ChangeAddress = 0x0003,
    /// SOURCE-ADDRESS (0x0004)
    SourceAddress = 0x0004,
    /// CHANGED-ADDRESS (0x0005)
    ChangedAddress = 0x0005,
    /// USERNAME (0x0006)
    Username = 0x0006,
    /// PASSWORD (0x0007)
    Password = 0x0007,
    /// MESSAGE-INTEGRITY (0x0008)
    MessageIntegrity = 0x0008,
    /// ERROR-CODE (0x0009)
    ErrorCode = 0x0009,
    /// UNKNOWN-ATTRIBUTES (0x000A)
    UnknownAttributes = 0x000A,
    /// REFLECTED-FROM (0x000B)
    ReflectedFrom = 0x000B,
    /// REALM (0x0014)
    Realm = 0x0014,
    /// NONCE (0x0015)
    Nonce = 0x0015,
    /// XOR-MAPPED-ADDRESS (0x0020)
    XorMappedAddress = 0x0020,
    /// XOR-MAPPED-ADDRESS, pre-standard vendor code (0x8020)
    XorMappedAddressLegacy = 0x8020,
    /// SOFTWARE (0x8022)
    Software = 0x8022,
    /// ALTERNATE-SERVER (0x8023)
    AlternateServer = 0x8023,
    /// FINGERPRINT (0x8028)
    Fingerprint = 0x8028,
}

impl AttributeType {
    /// Wire code
    #[must_use]
    pub const fn as_u16(self) -> u16 {
        self as u16
    }

    /// Look up a known attribute type by its wire code
    #[must_use]
    pub fn from_u16(code: u16) -> Option<Self> {
        let ty = match code {
            0x0000 => Self::Reserved,
            0x0001 => Self::MappedAddress,
            0x0002 => Self::ResponseAddress,
            0x0003 => Self::ChangeAddress,
            0x0004 => Self::SourceAddress,
            0x0005 => Self::ChangedAddress,
            0x0006 => Self::Username,
            0x0007 => Self::Password,
            0x0008 => Self::MessageIntegrity,
            0x0009 => Self::ErrorCode,
            0x000A => Self::UnknownAttributes,
            0x000B => Self::ReflectedFrom,
            0x0014 => Self::Realm,
            0x0015 => Self::Nonce,
            0x0020 => Self::XorMappedAddress,
            0x8020 => Self::XorMappedAddressLegacy,
            0x8022 => Self::Software,
            0x8023 => Self::AlternateServer,
            0x8028 => Self::Fingerprint,
            _ => return None,
        };
        Some(ty)
    }
}

/// Codes 0x0000-0x7FFF must be understood by the receiver
#[must_use]
pub fn is_comprehension_required(code: u16) -> bool {
    code <= 0x7FFF
}

/// Codes 0x8000-0xFFFF may be ignored when not understood
#[must_use]
pub fn is_comprehension_optional(code: u16) -> bool {
    code >= 0x8000
}

/// Allow-list of comprehension-required codes this engine accepts in responses
#[must_use]
pub fn is_supported_required(code: u16) -> bool {
    matches!(code, 0x0000..=0x000B | 0x0014 | 0x0015 | 0x0020 | 0x8020)
}

/// Attribute TLV header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttributeHeader {
    /// Attribute type code
    pub attr_type: u16,
    /// Value length in bytes
    pub length: u16,
}

/// One attribute: header plus raw value bytes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    header: AttributeHeader,
    value: Vec<u8>,
}

impl Attribute {
    /// Build an attribute from a type code and value.
    ///
    /// The value is stored as given; callers apply any padding.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::ValueTooLong`] if the value exceeds 65535 bytes.
    pub fn encode(attr_type: u16, value: Vec<u8>) -> CodecResult<Self> {
        let length = u16::try_from(value.len()).map_err(|_| CodecError::ValueTooLong(value.len()))?;
        Ok(Self {
            header: AttributeHeader { attr_type, length },
            value,
        })
    }

    /// Decode one attribute starting at `offset` in `buf`.
    ///
    /// Returns the attribute and the number of bytes consumed, which covers
    /// the header, the value, and whatever alignment padding is present
    /// before the next 4-byte boundary.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::Truncated`] if the header or the value extends
    /// past the end of `buf`.
    pub fn decode(buf: &[u8], offset: usize) -> CodecResult<(Self, usize)> {
        let tail = buf.get(offset..).ok_or(CodecError::Truncated {
            needed: offset,
            remaining: buf.len(),
        })?;
        let mut reader = ByteReader::new(tail);

        let attr_type = reader.read_u16()?;
        let length = reader.read_u16()?;
        let value = reader.read_bytes(usize::from(length))?.to_vec();

        let padding = (4 - usize::from(length) % 4) % 4;
        reader.skip_at_most(padding);

        Ok((
            Self {
                header: AttributeHeader { attr_type, length },
                value,
            },
            reader.position(),
        ))
    }

    /// Append the encoded header and value to `out`
    pub fn write_to(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(&self.header.attr_type.to_be_bytes());
        out.extend_from_slice(&self.header.length.to_be_bytes());
        out.extend_from_slice(&self.value);
    }

    /// Encoded size including the header
    #[must_use]
    pub fn encoded_len(&self) -> usize {
        ATTRIBUTE_HEADER_SIZE + self.value.len()
    }

    /// Attribute header
    #[must_use]
    pub fn header(&self) -> &AttributeHeader {
        &self.header
    }

    /// Attribute type code
    #[must_use]
    pub fn attr_type(&self) -> u16 {
        self.header.attr_type
    }

    /// Value length from the header
    #[must_use]
    pub fn length(&self) -> u16 {
        self.header.length
    }

    /// Raw value bytes
    #[must_use]
    pub fn value(&self) -> &[u8] {
        &self.value
    }

    /// Interpret the value as a MAPPED-ADDRESS
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::Truncated`] if the value is too short for its family.
    pub fn mapped_address(&self) -> CodecResult<MappedAddress> {
        decode_mapped_address(&self.value)
    }

    /// Interpret the value as an XOR-MAPPED-ADDRESS of the given transaction
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::Truncated`] if the value is too short for its family.
    pub fn xor_mapped_address(&self, transaction_id: &TransactionId) -> CodecResult<MappedAddress> {
        decode_xor_mapped_address(&self.value, transaction_id)
    }
}

/// Address carried by a (XOR-)MAPPED-ADDRESS attribute
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MappedAddress {
    /// Family code from the attribute
    pub family: u8,
    /// Textual address, or [`UNSUPPORTED_ADDRESS`] for an unknown family
    pub address: String,
    /// Port in host order
    pub port: u16,
}

impl MappedAddress {
    /// Parsed IP address, if the family was supported
    #[must_use]
    pub fn ip(&self) -> Option<IpAddr> {
        self.address.parse().ok()
    }

    /// Parsed socket address, if the family was supported
    #[must_use]
    pub fn socket_addr(&self) -> Option<SocketAddr> {
        self.ip().map(|ip| SocketAddr::new(ip, self.port))
    }
}

/// Decode a MAPPED-ADDRESS value (no transform)
///
/// # Errors
///
/// Returns [`CodecError::Truncated`] if the value is too short.
pub fn decode_mapped_address(value: &[u8]) -> CodecResult<MappedAddress> {
    let mut reader = ByteReader::new(value);
    reader.read_u8()?;
    let family = reader.read_u8()?;
    let port = reader.read_u16()?;

    let address = match family {
        FAMILY_IPV4 => Ipv4Addr::from(reader.read_array::<4>()?).to_string(),
        FAMILY_IPV6 => Ipv6Addr::from(reader.read_array::<16>()?).to_string(),
        _ => UNSUPPORTED_ADDRESS.to_string(),
    };

    Ok(MappedAddress {
        family,
        address,
        port,
    })
}

/// Decode an XOR-MAPPED-ADDRESS value.
///
/// The port is XORed with the high 16 bits of the magic cookie. An IPv4
/// address is XORed with the cookie; an IPv6 address is XORed word by word
/// with the cookie followed by the three transaction ID words.
///
/// # Errors
///
/// Returns [`CodecError::Truncated`] if the value is too short.
pub fn decode_xor_mapped_address(
    value: &[u8],
    transaction_id: &TransactionId,
) -> CodecResult<MappedAddress> {
    let mut reader = ByteReader::new(value);
    reader.read_u8()?;
    let family = reader.read_u8()?;
    let port = reader.read_u16()? ^ (MAGIC_COOKIE >> 16) as u16;

    let address = match family {
        FAMILY_IPV4 => Ipv4Addr::from(reader.read_u32()? ^ MAGIC_COOKIE).to_string(),
        FAMILY_IPV6 => {
            let mut octets = [0u8; 16];
            for (chunk, mask) in octets.chunks_exact_mut(4).zip(xor_key(transaction_id)) {
                chunk.copy_from_slice(&(reader.read_u32()? ^ mask).to_be_bytes());
            }
            Ipv6Addr::from(octets).to_string()
        }
        _ => UNSUPPORTED_ADDRESS.to_string(),
    };

    Ok(MappedAddress {
        family,
        address,
        port,
    })
}

/// Build a MAPPED-ADDRESS value for `addr`.
///
/// Probes never send address attributes; this exists for responders.
#[must_use]
pub fn mapped_address_value(addr: SocketAddr) -> Vec<u8> {
    let mut value = vec![0, family_of(&addr)];
    value.extend_from_slice(&addr.port().to_be_bytes());
    match addr.ip() {
        IpAddr::V4(ip) => value.extend_from_slice(&ip.octets()),
        IpAddr::V6(ip) => value.extend_from_slice(&ip.octets()),
    }
    value
}

/// Build an XOR-MAPPED-ADDRESS value for `addr` under `transaction_id`.
///
/// Probes never send address attributes; this exists for responders.
#[must_use]
pub fn xor_mapped_address_value(addr: SocketAddr, transaction_id: &TransactionId) -> Vec<u8> {
    let mut value = vec![0, family_of(&addr)];
    value.extend_from_slice(&(addr.port() ^ (MAGIC_COOKIE >> 16) as u16).to_be_bytes());
    match addr.ip() {
        IpAddr::V4(ip) => value.extend_from_slice(&(u32::from(ip) ^ MAGIC_COOKIE).to_be_bytes()),
        IpAddr::V6(ip) => {
            let octets = ip.octets();
            for (chunk, mask) in octets.chunks_exact(4).zip(xor_key(transaction_id)) {
                let word = u32::from_be_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
                value.extend_from_slice(&(word ^ mask).to_be_bytes());
            }
        }
    }
    value
}

fn xor_key(transaction_id: &TransactionId) -> [u32; 4] {
    let [t0, t1, t2] = transaction_id.words();
    [MAGIC_COOKIE, t0, t1, t2]
}

fn family_of(addr: &SocketAddr) -> u8 {
    if addr.is_ipv4() { FAMILY_IPV4 } else { FAMILY_IPV6 }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_change_request_flags() {
        assert_eq!(CHANGE_IP | CHANGE_PORT, 6);
        assert_eq!(CHANGE_PORT, 2);

        let attr = Attribute::encode(
            AttributeType::ChangeAddress.as_u16(),
            (CHANGE_IP | CHANGE_PORT).to_be_bytes().to_vec(),
        )
        .unwrap();
        assert_eq!(attr.attr_type(), 0x0003);
        assert_eq!(attr.value(), &[0, 0, 0, 6]);
    }

    #[test]
    fn test_comprehension_ranges() {
        assert!(is_comprehension_required(0x0000));
        assert!(is_comprehension_required(0x7FFF));
        assert!(!is_comprehension_required(0x8000));
        assert!(is_comprehension_optional(0x8022));
        assert!(!is_comprehension_optional(0x0020));
    }

    #[test]
    fn test_supported_required_allow_list() {
        for code in 0x0000..=0x000B {
            assert!(is_supported_required(code), "0x{code:04X}");
        }
        assert!(is_supported_required(0x0014));
        assert!(is_supported_required(0x0015));
        assert!(is_supported_required(0x0020));
        assert!(is_supported_required(0x8020));

        assert!(!is_supported_required(0x000C));
        assert!(!is_supported_required(0x0013));
        assert!(!is_supported_required(0x0024));
    }

    #[test]
    fn test_attribute_type_lookup() {
        assert_eq!(AttributeType::from_u16(0x8022), Some(AttributeType::Software));
        assert_eq!(AttributeType::from_u16(0x0003), Some(AttributeType::ChangeAddress));
        assert_eq!(AttributeType::from_u16(0x1234), None);
        assert_eq!(AttributeType::XorMappedAddressLegacy.as_u16(), 0x8020);
    }

    #[test]
    fn test_encode_stores_value_as_given() {
        let attr = Attribute::encode(0x8022, b"abcde".to_vec()).unwrap();
        assert_eq!(attr.length(), 5);
        assert_eq!(attr.value(), b"abcde");
        assert_eq!(attr.encoded_len(), 9);
    }

    #[test]
    fn test_encode_rejects_oversized_value() {
        let err = Attribute::encode(0x8022, vec![0; 70_000]).unwrap_err();
        assert_eq!(err, CodecError::ValueTooLong(70_000));
    }

    #[test]
    fn test_decode_header_and_value() {
        let buf = [0x80, 0x22, 0x00, 0x04, b'a', b'b', b'c', b'd', 0xFF];
        let (attr, consumed) = Attribute::decode(&buf, 0).unwrap();
        assert_eq!(attr.attr_type(), 0x8022);
        assert_eq!(attr.value(), b"abcd");
        assert_eq!(consumed, 8);
    }

    #[test]
    fn test_decode_skips_alignment_padding() {
        // SOFTWARE "abc" with one padding byte, then a second attribute
        let buf = [
            0x80, 0x22, 0x00, 0x03, b'a', b'b', b'c', 0x00, 0x00, 0x09, 0x00, 0x00,
        ];
        let (attr, consumed) = Attribute::decode(&buf, 0).unwrap();
        assert_eq!(attr.value(), b"abc");
        assert_eq!(consumed, 8);

        let (next, consumed) = Attribute::decode(&buf, 8).unwrap();
        assert_eq!(next.attr_type(), 0x0009);
        assert_eq!(consumed, 4);
    }

    #[test]
    fn test_decode_truncated_value() {
        let buf = [0x00, 0x01, 0x00, 0x08, 0x00, 0x01];
        assert!(matches!(
            Attribute::decode(&buf, 0),
            Err(CodecError::Truncated { .. })
        ));
        assert!(Attribute::decode(&buf, 4).is_err());
        assert!(Attribute::decode(&buf, 64).is_err());
    }

    #[test]
    fn test_write_to_matches_decode() {
        let attr = Attribute::encode(0x0003, 6u32.to_be_bytes().to_vec()).unwrap();
        let mut out = Vec::new();
        attr.write_to(&mut out);
        assert_eq!(out, [0x00, 0x03, 0x00, 0x04, 0x00, 0x00, 0x00, 0x06]);

        let (decoded, consumed) = Attribute::decode(&out, 0).unwrap();
        assert_eq!(decoded, attr);
        assert_eq!(consumed, out.len());
    }

    #[test]
    fn test_mapped_address_ipv4() {
        let value = [0x00, 0x01, 0x11, 0x5C, 192, 0, 2, 1];
        let mapped = decode_mapped_address(&value).unwrap();
        assert_eq!(mapped.family, FAMILY_IPV4);
        assert_eq!(mapped.address, "192.0.2.1");
        assert_eq!(mapped.port, 4444);
        assert_eq!(mapped.socket_addr(), Some("192.0.2.1:4444".parse().unwrap()));
    }

    #[test]
    fn test_mapped_address_ipv6() {
        let addr: SocketAddr = "[2001:db8::1]:3478".parse().unwrap();
        let mapped = decode_mapped_address(&mapped_address_value(addr)).unwrap();
        assert_eq!(mapped.family, FAMILY_IPV6);
        assert_eq!(mapped.address, "2001:db8::1");
        assert_eq!(mapped.port, 3478);
    }

    #[test]
    fn test_xor_mapped_address_rfc5769_ipv4() {
        // RFC 5769 2.2: 192.0.2.1:32853
        let value = [0x00, 0x01, 0xA1, 0x47, 0xE1, 0x12, 0xA6, 0x43];
        let tid = TransactionId::from_bytes([
            0xB7, 0xE7, 0xA7, 0x01, 0xBC, 0x34, 0xD6, 0x86, 0xFA, 0x87, 0xDF, 0xAE,
        ]);
        let mapped = decode_xor_mapped_address(&value, &tid).unwrap();
        assert_eq!(mapped.address, "192.0.2.1");
        assert_eq!(mapped.port, 32853);
    }

    #[test]
    fn test_xor_mapped_address_rfc5769_ipv6() {
        // RFC 5769 2.3: 2001:db8:1234:5678:11:2233:4455:6677 port 32853
        let value = [
            0x00, 0x02, 0xA1, 0x47, 0x01, 0x13, 0xA9, 0xFA, 0xA5, 0xD3, 0xF1, 0x79, 0xBC, 0x25,
            0xF4, 0xB5, 0xBE, 0xD2, 0xB9, 0xD9,
        ];
        let tid = TransactionId::from_bytes([
            0xB7, 0xE7, 0xA7, 0x01, 0xBC, 0x34, 0xD6, 0x86, 0xFA, 0x87, 0xDF, 0xAE,
        ]);
        let mapped = decode_xor_mapped_address(&value, &tid).unwrap();
        assert_eq!(mapped.address, "2001:db8:1234:5678:11:2233:4455:6677");
        assert_eq!(mapped.port, 32853);
    }

    #[test]
    fn test_xor_value_matches_rfc_vector() {
        let tid = TransactionId::from_bytes([
            0xB7, 0xE7, 0xA7, 0x01, 0xBC, 0x34, 0xD6, 0x86, 0xFA, 0x87, 0xDF, 0xAE,
        ]);
        let value = xor_mapped_address_value("192.0.2.1:32853".parse().unwrap(), &tid);
        assert_eq!(value, [0x00, 0x01, 0xA1, 0x47, 0xE1, 0x12, 0xA6, 0x43]);
    }

    #[test]
    fn test_unsupported_family_is_not_fatal() {
        let value = [0x00, 0x07, 0x12, 0x34];
        let mapped = decode_mapped_address(&value).unwrap();
        assert_eq!(mapped.address, UNSUPPORTED_ADDRESS);
        assert_eq!(mapped.port, 0x1234);
        assert!(mapped.ip().is_none());

        let xored = decode_xor_mapped_address(&value, &TransactionId::default()).unwrap();
        assert_eq!(xored.address, UNSUPPORTED_ADDRESS);
    }

    #[test]
    fn test_short_address_value_is_truncated() {
        let value = [0x00, 0x01, 0x12, 0x34, 0x01, 0x02];
        assert!(decode_mapped_address(&value).is_err());
        assert!(decode_xor_mapped_address(&value, &TransactionId::default()).is_err());

        let value = [0x00, 0x02, 0x12, 0x34, 0, 0, 0, 0];
        assert!(decode_xor_mapped_address(&value, &TransactionId::default()).is_err());
    }
}
