//! Error types for the STUN codec.

use thiserror::Error;

/// Wire decoding errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CodecError {
    /// A field extends past the end of the available bytes
    #[error("truncated input: needed {needed} bytes, {remaining} remaining")]
    Truncated {
        /// Bytes required by the read
        needed: usize,
        /// Bytes left in the buffer
        remaining: usize,
    },

    /// Datagram shorter than the fixed message header
    #[error("STUN message too short: {0} bytes")]
    MessageTooShort(usize),

    /// Value or message body does not fit a 16-bit length field
    #[error("length {0} exceeds the 16-bit length field")]
    ValueTooLong(usize),
}

/// Protocol conformance failures for a received response.
///
/// Each variant corresponds to one check, evaluated in declaration order.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// Neither a Binding Success nor a Binding Error response
    #[error("message type 0x{0:04X} is not supported")]
    UnsupportedMessageType(u16),

    /// Magic cookie does not equal 0x2112A442
    #[error("magic cookie 0x{0:08X} is not valid")]
    BadMagicCookie(u32),

    /// Declared attribute section length is zero
    #[error("message length is not valid")]
    EmptyMessage,

    /// Response transaction ID differs from the request's
    #[error("transaction ID does not match the request")]
    TransactionMismatch,

    /// Success response without MAPPED-ADDRESS or XOR-MAPPED-ADDRESS
    #[error("(xor) mapped address attributes don't exist")]
    MissingAddressAttribute,

    /// Error response without ERROR-CODE
    #[error("error code attribute doesn't exist")]
    MissingErrorCode,

    /// Comprehension-required attribute outside the supported set
    #[error("unknown comprehension-required attribute 0x{0:04X}")]
    UnsupportedRequiredAttribute(u16),
}

/// Result type for codec operations
pub type CodecResult<T> = Result<T, CodecError>;
