//! # natprobe core
//!
//! STUN wire codec used by the natprobe NAT classifier.
//!
//! This crate provides:
//! - The STUN message model (header, ordered attributes, request destination)
//! - Attribute TLV encoding and decoding
//! - MAPPED-ADDRESS and XOR-MAPPED-ADDRESS decoding for IPv4 and IPv6
//! - A bounds-checked reader for untrusted datagrams
//! - Protocol validation error kinds
//!
//! No I/O happens here; sockets live in `natprobe-transport`.
//!
//! ## Example
//!
//! ```rust
//! use natprobe_core::{AttributeType, MessageType, StunMessage, DEFAULT_PORT};
//!
//! let mut request = StunMessage::new_request("stun.example.org", DEFAULT_PORT, MessageType::BindingRequest);
//! request.add_int_attribute(AttributeType::ChangeAddress, 6).unwrap();
//!
//! let bytes = request.to_bytes();
//! let decoded = StunMessage::from_bytes(&bytes).unwrap();
//! assert_eq!(decoded.transaction_id(), request.transaction_id());
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod attribute;
pub mod error;
pub mod message;
pub mod reader;

pub use attribute::{
    ATTRIBUTE_HEADER_SIZE, Attribute, AttributeHeader, AttributeType, CHANGE_IP, CHANGE_PORT,
    MappedAddress, UNSUPPORTED_ADDRESS, is_comprehension_optional, is_comprehension_required,
    is_supported_required,
};
pub use error::{CodecError, CodecResult, ValidationError};
pub use message::{
    DEFAULT_PORT, Destination, HEADER_SIZE, MAGIC_COOKIE, MessageHeader, MessageType,
    StunMessage, TransactionId,
};
pub use reader::ByteReader;
