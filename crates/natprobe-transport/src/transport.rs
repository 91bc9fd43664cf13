//! Transport trait abstraction for STUN request/response exchange.
//!
//! The detector talks to the network only through [`StunTransport`], so the
//! retry loop and the classification logic can run against a scripted
//! transport in tests.

use async_trait::async_trait;
use natprobe_core::{CodecError, StunMessage, TransactionId, ValidationError};
use std::io;
use std::time::Duration;

/// Transport layer errors
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// Server name could not be resolved
    #[error("Failed to get information about {server} server. Error: {reason}")]
    Resolution {
        /// Name that was looked up
        server: String,
        /// Resolver diagnostic
        reason: String,
    },

    /// Every resolved candidate rejected the datagram
    #[error("Failed to send message to {server} ({candidates} candidate addresses tried)")]
    Send {
        /// Destination server name
        server: String,
        /// Number of addresses attempted
        candidates: usize,
    },

    /// Request carries no destination
    #[error("Message has no destination")]
    NoDestination,

    /// Local socket could not be created or bound
    #[error("Failed to bind UDP socket: {0}")]
    Bind(String),

    /// Datagram too short to hold a STUN header
    #[error("Malformed datagram: {0}")]
    Malformed(#[from] CodecError),

    /// Response violated a protocol conformance rule
    #[error("Failed to validate message: {0}")]
    Validation(#[from] ValidationError),

    /// I/O error from the underlying socket
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

/// Result type for transport operations
pub type TransportResult<T> = Result<T, TransportError>;

/// One send-then-wait STUN exchange surface.
///
/// Implementations make exactly one attempt per call; retransmission and
/// backoff belong to the caller.
#[async_trait]
pub trait StunTransport: Send + Sync {
    /// Serialize `message` and deliver it to its destination.
    ///
    /// # Errors
    /// Returns [`TransportError::Resolution`] if the destination cannot be
    /// resolved and [`TransportError::Send`] if no candidate accepts it.
    async fn send(&self, message: &StunMessage) -> TransportResult<()>;

    /// Wait up to `timeout` for one response to `transaction_id`.
    ///
    /// Returns a validated message, or the [`MessageType::Unknown`] sentinel
    /// if nothing usable arrived in time.
    ///
    /// # Errors
    /// Returns [`TransportError::Validation`] or [`TransportError::Malformed`]
    /// if a datagram arrived but is not a conformant response.
    ///
    /// [`MessageType::Unknown`]: natprobe_core::MessageType::Unknown
    async fn receive(
        &self,
        transaction_id: &TransactionId,
        timeout: Duration,
    ) -> TransportResult<StunMessage>;

    /// Counters for the exchanges made so far
    fn stats(&self) -> TransportStats {
        TransportStats::default()
    }
}

/// Transport statistics
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TransportStats {
    /// Requests handed to the socket
    pub requests_sent: u64,
    /// Datagrams that passed validation
    pub responses_received: u64,
    /// Waits that ended without data
    pub timeouts: u64,
    /// Socket errors downgraded to "no response"
    pub socket_errors: u64,
}
