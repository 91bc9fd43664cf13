//! STUN message model.
//!
//! A message is a 20-byte header followed by TLV attributes:
//!
//! ```text
//!  0                   1                   2                   3
//!  0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! |0 0|     STUN Message Type     |         Message Length        |
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! |                         Magic Cookie                          |
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! |                     Transaction ID (96 bits)                  |
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! ```
//!
//! `Message Length` counts the attribute section only.

use crate::attribute::{ATTRIBUTE_HEADER_SIZE, Attribute, AttributeType};
use crate::error::{CodecError, CodecResult};
use crate::reader::ByteReader;
use rand::RngCore;
use std::fmt;

/// STUN magic cookie (0x2112A442)
pub const MAGIC_COOKIE: u32 = 0x2112_A442;

/// STUN message header size (20 bytes)
pub const HEADER_SIZE: usize = 20;

/// Default STUN UDP port
pub const DEFAULT_PORT: u16 = 3478;

/// 96-bit transaction identifier, held as three big-endian words
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct TransactionId([u32; 3]);

impl TransactionId {
    /// Generate a fresh identifier from the system random source
    #[must_use]
    pub fn random() -> Self {
        let mut bytes = [0u8; 12];
        rand::rngs::OsRng.fill_bytes(&mut bytes);
        Self::from_bytes(bytes)
    }

    /// Build from the three words
    #[must_use]
    pub const fn from_words(words: [u32; 3]) -> Self {
        Self(words)
    }

    /// Build from wire bytes
    #[must_use]
    pub fn from_bytes(bytes: [u8; 12]) -> Self {
        let word = |i: usize| u32::from_be_bytes([bytes[i], bytes[i + 1], bytes[i + 2], bytes[i + 3]]);
        Self([word(0), word(4), word(8)])
    }

    /// Wire bytes
    #[must_use]
    pub fn to_bytes(&self) -> [u8; 12] {
        let mut bytes = [0u8; 12];
        for (chunk, word) in bytes.chunks_exact_mut(4).zip(self.0) {
            chunk.copy_from_slice(&word.to_be_bytes());
        }
        bytes
    }

    /// The three words, in wire order
    #[must_use]
    pub fn words(&self) -> [u32; 3] {
        self.0
    }
}

impl fmt::Display for TransactionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for byte in self.to_bytes() {
            write!(f, "{byte:02x}")?;
        }
        Ok(())
    }
}

/// STUN message types used by the classic binding exchange
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageType {
    /// Sentinel for a message that was never filled from the wire
    Unknown,
    /// Binding Request (0x0001)
    BindingRequest,
    /// Binding Success Response (0x0101)
    BindingSuccessResponse,
    /// Binding Error Response (0x0111)
    BindingErrorResponse,
    /// Binding Indication (0x0011)
    BindingIndication,
    /// Any other code
    Other(u16),
}

impl MessageType {
    /// Wire code
    #[must_use]
    pub fn as_u16(self) -> u16 {
        match self {
            Self::Unknown => 0x0000,
            Self::BindingRequest => 0x0001,
            Self::BindingSuccessResponse => 0x0101,
            Self::BindingErrorResponse => 0x0111,
            Self::BindingIndication => 0x0011,
            Self::Other(code) => code,
        }
    }

    /// Classify a wire code
    #[must_use]
    pub fn from_u16(code: u16) -> Self {
        match code {
            0x0000 => Self::Unknown,
            0x0001 => Self::BindingRequest,
            0x0101 => Self::BindingSuccessResponse,
            0x0111 => Self::BindingErrorResponse,
            0x0011 => Self::BindingIndication,
            other => Self::Other(other),
        }
    }
}

impl fmt::Display for MessageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unknown => write!(f, "Unknown"),
            Self::BindingRequest => write!(f, "Binding Request"),
            Self::BindingSuccessResponse => write!(f, "Binding Success Response"),
            Self::BindingErrorResponse => write!(f, "Binding Error Response"),
            Self::BindingIndication => write!(f, "Binding Indication"),
            Self::Other(code) => write!(f, "0x{code:04X}"),
        }
    }
}

/// Fixed message header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MessageHeader {
    /// Message type
    pub message_type: MessageType,
    /// Attribute section length in bytes
    pub length: u16,
    /// Magic cookie
    pub magic_cookie: u32,
    /// Transaction ID
    pub transaction_id: TransactionId,
}

impl MessageHeader {
    fn decode(reader: &mut ByteReader<'_>) -> CodecResult<Self> {
        Ok(Self {
            message_type: MessageType::from_u16(reader.read_u16()?),
            length: reader.read_u16()?,
            magic_cookie: reader.read_u32()?,
            transaction_id: TransactionId::from_bytes(reader.read_array()?),
        })
    }

    fn write_to(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(&self.message_type.as_u16().to_be_bytes());
        out.extend_from_slice(&self.length.to_be_bytes());
        out.extend_from_slice(&self.magic_cookie.to_be_bytes());
        out.extend_from_slice(&self.transaction_id.to_bytes());
    }
}

/// Where an outgoing request is addressed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Destination {
    /// Server hostname or IP literal
    pub server: String,
    /// UDP port
    pub port: u16,
}

/// One STUN message: header, ordered attributes, and for requests a destination
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StunMessage {
    header: MessageHeader,
    attributes: Vec<Attribute>,
    destination: Option<Destination>,
}

impl Default for StunMessage {
    fn default() -> Self {
        Self::unknown()
    }
}

impl StunMessage {
    /// Empty message carrying the [`MessageType::Unknown`] sentinel
    #[must_use]
    pub fn unknown() -> Self {
        Self {
            header: MessageHeader {
                message_type: MessageType::Unknown,
                length: 0,
                magic_cookie: 0,
                transaction_id: TransactionId::default(),
            },
            attributes: Vec::new(),
            destination: None,
        }
    }

    /// New request to `server:port` with a fresh transaction ID
    #[must_use]
    pub fn new_request(server: impl Into<String>, port: u16, message_type: MessageType) -> Self {
        Self {
            header: MessageHeader {
                message_type,
                length: 0,
                magic_cookie: MAGIC_COOKIE,
                transaction_id: TransactionId::random(),
            },
            attributes: Vec::new(),
            destination: Some(Destination {
                server: server.into(),
                port,
            }),
        }
    }

    /// New response header answering `transaction_id`
    #[must_use]
    pub fn response(message_type: MessageType, transaction_id: TransactionId) -> Self {
        Self {
            header: MessageHeader {
                message_type,
                length: 0,
                magic_cookie: MAGIC_COOKIE,
                transaction_id,
            },
            attributes: Vec::new(),
            destination: None,
        }
    }

    /// Append a string attribute, zero-padded to a 4-byte boundary.
    ///
    /// The padded length is what goes into the attribute length field.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::ValueTooLong`] if the attribute or the message
    /// body would overflow its 16-bit length.
    pub fn add_string_attribute(&mut self, attr_type: AttributeType, value: &str) -> CodecResult<()> {
        let mut bytes = value.as_bytes().to_vec();
        let padded = bytes.len().div_ceil(4) * 4;
        bytes.resize(padded, 0);
        self.add_attribute(Attribute::encode(attr_type.as_u16(), bytes)?)
    }

    /// Append a 4-byte big-endian integer attribute
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::ValueTooLong`] if the message body would
    /// overflow its 16-bit length.
    pub fn add_int_attribute(&mut self, attr_type: AttributeType, value: u32) -> CodecResult<()> {
        self.add_attribute(Attribute::encode(attr_type.as_u16(), value.to_be_bytes().to_vec())?)
    }

    /// Append an already encoded attribute and grow the header length
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::ValueTooLong`] if the message body would
    /// overflow its 16-bit length.
    pub fn add_attribute(&mut self, attribute: Attribute) -> CodecResult<()> {
        let new_length = usize::from(self.header.length) + attribute.encoded_len();
        self.header.length =
            u16::try_from(new_length).map_err(|_| CodecError::ValueTooLong(new_length))?;
        self.attributes.push(attribute);
        Ok(())
    }

    /// Encode header and attributes in insertion order
    #[must_use]
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(HEADER_SIZE + usize::from(self.header.length));
        self.header.write_to(&mut out);
        for attribute in &self.attributes {
            attribute.write_to(&mut out);
        }
        out
    }

    /// Decode a datagram.
    ///
    /// Attributes are read from the declared body length, clipped to the
    /// bytes actually present. Parsing stops quietly at the first attribute
    /// that is truncated; everything decoded before it is kept. Zero-length
    /// attributes are skipped.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::MessageTooShort`] if `bytes` cannot hold a header.
    pub fn from_bytes(bytes: &[u8]) -> CodecResult<Self> {
        if bytes.len() < HEADER_SIZE {
            return Err(CodecError::MessageTooShort(bytes.len()));
        }

        let mut reader = ByteReader::new(bytes);
        let header = MessageHeader::decode(&mut reader)?;

        let body_len = usize::from(header.length).min(reader.remaining());
        let body = &bytes[HEADER_SIZE..HEADER_SIZE + body_len];

        let mut attributes = Vec::new();
        let mut offset = 0;
        while body.len() - offset >= ATTRIBUTE_HEADER_SIZE {
            let Ok((attribute, consumed)) = Attribute::decode(body, offset) else {
                break;
            };
            offset += consumed;
            if attribute.length() > 0 {
                attributes.push(attribute);
            }
        }

        Ok(Self {
            header,
            attributes,
            destination: None,
        })
    }

    /// First attribute of the given type, in insertion order
    #[must_use]
    pub fn find_attribute(&self, attr_type: AttributeType) -> Option<&Attribute> {
        let code = attr_type.as_u16();
        self.attributes.iter().find(|a| a.attr_type() == code)
    }

    /// Message header
    #[must_use]
    pub fn header(&self) -> &MessageHeader {
        &self.header
    }

    /// Message type
    #[must_use]
    pub fn message_type(&self) -> MessageType {
        self.header.message_type
    }

    /// Whether this is the [`MessageType::Unknown`] sentinel
    #[must_use]
    pub fn is_unknown(&self) -> bool {
        self.header.message_type == MessageType::Unknown
    }

    /// Declared attribute section length
    #[must_use]
    pub fn length(&self) -> u16 {
        self.header.length
    }

    /// Magic cookie
    #[must_use]
    pub fn magic_cookie(&self) -> u32 {
        self.header.magic_cookie
    }

    /// Transaction ID
    #[must_use]
    pub fn transaction_id(&self) -> &TransactionId {
        &self.header.transaction_id
    }

    /// Attributes in wire order
    #[must_use]
    pub fn attributes(&self) -> &[Attribute] {
        &self.attributes
    }

    /// Request destination, if this is an outgoing request
    #[must_use]
    pub fn destination(&self) -> Option<&Destination> {
        self.destination.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> StunMessage {
        StunMessage::new_request("stun.example.org", DEFAULT_PORT, MessageType::BindingRequest)
    }

    #[test]
    fn test_magic_cookie() {
        assert_eq!(MAGIC_COOKIE, 0x2112_A442);
    }

    #[test]
    fn test_message_type_codes() {
        for ty in [
            MessageType::Unknown,
            MessageType::BindingRequest,
            MessageType::BindingSuccessResponse,
            MessageType::BindingErrorResponse,
            MessageType::BindingIndication,
        ] {
            assert_eq!(MessageType::from_u16(ty.as_u16()), ty);
        }
        assert_eq!(MessageType::from_u16(0x0101), MessageType::BindingSuccessResponse);
        assert_eq!(MessageType::from_u16(0x0002), MessageType::Other(0x0002));
        assert_eq!(MessageType::Other(0x0002).as_u16(), 0x0002);
    }

    #[test]
    fn test_transaction_id_bytes() {
        let bytes = [1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12];
        let tid = TransactionId::from_bytes(bytes);
        assert_eq!(tid.words(), [0x0102_0304, 0x0506_0708, 0x090A_0B0C]);
        assert_eq!(tid.to_bytes(), bytes);
        assert_eq!(tid.to_string(), "0102030405060708090a0b0c");
    }

    #[test]
    fn test_random_transaction_ids_differ() {
        assert_ne!(TransactionId::random(), TransactionId::random());
    }

    #[test]
    fn test_new_request_header() {
        let msg = request();
        assert_eq!(msg.message_type(), MessageType::BindingRequest);
        assert_eq!(msg.length(), 0);
        assert_eq!(msg.magic_cookie(), MAGIC_COOKIE);
        let dest = msg.destination().unwrap();
        assert_eq!(dest.server, "stun.example.org");
        assert_eq!(dest.port, 3478);
    }

    #[test]
    fn test_unknown_sentinel() {
        let msg = StunMessage::default();
        assert!(msg.is_unknown());
        assert_eq!(msg.message_type().as_u16(), 0x0000);
        assert!(msg.attributes().is_empty());
    }

    #[test]
    fn test_string_attribute_padding() {
        let mut msg = request();
        msg.add_string_attribute(AttributeType::Software, "HELLO").unwrap();

        let attr = msg.find_attribute(AttributeType::Software).unwrap();
        assert_eq!(attr.length(), 8);
        assert_eq!(attr.value(), b"HELLO\0\0\0");
        assert_eq!(msg.length(), 12);

        let bytes = msg.to_bytes();
        assert_eq!(&bytes[HEADER_SIZE..HEADER_SIZE + 4], &[0x80, 0x22, 0x00, 0x08]);
        assert_eq!(&bytes[HEADER_SIZE + 9..], &[0, 0, 0]);
    }

    #[test]
    fn test_aligned_string_is_not_padded() {
        let mut msg = request();
        msg.add_string_attribute(AttributeType::Software, "ABCD").unwrap();
        assert_eq!(msg.length(), 8);
    }

    #[test]
    fn test_int_attribute() {
        let mut msg = request();
        msg.add_int_attribute(AttributeType::ChangeAddress, 6).unwrap();

        let attr = msg.find_attribute(AttributeType::ChangeAddress).unwrap();
        assert_eq!(attr.value(), &[0, 0, 0, 6]);
        assert_eq!(msg.length(), 8);
    }

    #[test]
    fn test_serialized_size_matches_length() {
        let mut msg = request();
        msg.add_string_attribute(AttributeType::Software, "natprobe").unwrap();
        msg.add_int_attribute(AttributeType::ChangeAddress, 2).unwrap();

        let bytes = msg.to_bytes();
        assert_eq!(bytes.len(), HEADER_SIZE + usize::from(msg.length()));
        assert_eq!(u16::from_be_bytes([bytes[2], bytes[3]]), msg.length());
        assert_eq!(&bytes[4..8], &MAGIC_COOKIE.to_be_bytes());
        assert_eq!(&bytes[8..20], &msg.transaction_id().to_bytes());
    }

    #[test]
    fn test_roundtrip() {
        let mut msg = request();
        msg.add_string_attribute(AttributeType::Software, "abc").unwrap();
        msg.add_int_attribute(AttributeType::ChangeAddress, 6).unwrap();

        let decoded = StunMessage::from_bytes(&msg.to_bytes()).unwrap();
        assert_eq!(decoded.header(), msg.header());
        assert_eq!(decoded.attributes(), msg.attributes());
        assert!(decoded.destination().is_none());
    }

    #[test]
    fn test_decode_too_short() {
        let err = StunMessage::from_bytes(&[0u8; 19]).unwrap_err();
        assert_eq!(err, CodecError::MessageTooShort(19));
    }

    #[test]
    fn test_decode_drops_truncated_trailing_attribute() {
        let mut msg = StunMessage::response(MessageType::BindingSuccessResponse, TransactionId::random());
        msg.add_int_attribute(AttributeType::ChangeAddress, 1).unwrap();
        msg.add_string_attribute(AttributeType::Software, "trailing").unwrap();

        let bytes = msg.to_bytes();
        let cut = &bytes[..bytes.len() - 3];
        let decoded = StunMessage::from_bytes(cut).unwrap();

        assert_eq!(decoded.length(), msg.length());
        assert_eq!(decoded.attributes().len(), 1);
        assert_eq!(decoded.attributes()[0].attr_type(), 0x0003);
    }

    #[test]
    fn test_decode_ignores_bytes_past_declared_length() {
        let mut msg = StunMessage::response(MessageType::BindingSuccessResponse, TransactionId::random());
        msg.add_int_attribute(AttributeType::ChangeAddress, 1).unwrap();

        let mut bytes = msg.to_bytes();
        bytes.extend_from_slice(&[0x00, 0x01, 0x00, 0x04, 1, 2, 3, 4]);
        let decoded = StunMessage::from_bytes(&bytes).unwrap();
        assert_eq!(decoded.attributes().len(), 1);
    }

    #[test]
    fn test_decode_skips_zero_length_attribute() {
        let mut bytes = StunMessage::response(MessageType::BindingErrorResponse, TransactionId::random()).to_bytes();
        bytes[2..4].copy_from_slice(&12u16.to_be_bytes());
        bytes.extend_from_slice(&[0x80, 0x22, 0x00, 0x00]);
        bytes.extend_from_slice(&[0x00, 0x09, 0x00, 0x04, 0, 0, 4, 0]);

        let decoded = StunMessage::from_bytes(&bytes).unwrap();
        assert_eq!(decoded.attributes().len(), 1);
        assert!(decoded.find_attribute(AttributeType::Software).is_none());
        assert!(decoded.find_attribute(AttributeType::ErrorCode).is_some());
    }

    #[test]
    fn test_find_attribute_returns_first_match() {
        let mut msg = request();
        msg.add_int_attribute(AttributeType::ChangeAddress, 2).unwrap();
        msg.add_int_attribute(AttributeType::ChangeAddress, 6).unwrap();

        let attr = msg.find_attribute(AttributeType::ChangeAddress).unwrap();
        assert_eq!(attr.value(), &[0, 0, 0, 2]);
        assert!(msg.find_attribute(AttributeType::MappedAddress).is_none());
    }

    #[test]
    fn test_body_overflow_is_rejected() {
        let mut msg = request();
        let big = "x".repeat(40_000);
        msg.add_string_attribute(AttributeType::Software, &big).unwrap();
        let err = msg.add_string_attribute(AttributeType::Software, &big).unwrap_err();
        assert!(matches!(err, CodecError::ValueTooLong(_)));
        assert_eq!(msg.attributes().len(), 1);
    }
}
