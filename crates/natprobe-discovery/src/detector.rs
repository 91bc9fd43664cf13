//! NAT type detection.
//!
//! Runs the classic three-probe STUN sequence against two servers:
//!
//! 1. Binding request to server 1. The mapped address is the public IP; if
//!    it can be bound locally there is no NAT.
//! 2. Binding request to server 1 asking for a reply from another IP and
//!    port. Without NAT a reply means no filtering firewall; behind NAT a
//!    reply means Full Cone.
//! 3. Binding request to server 2. A different public IP means Symmetric.
//!    Otherwise a request to server 1 asking for a reply from another port
//!    tells Address-Restricted from Port-Restricted Cone.

use crate::probe::{BindProbe, LocalAddressProbe};
use crate::retry::RetryPolicy;
use crate::types::{DetectError, DetectResult, NatReport, NatType};
use natprobe_core::{
    AttributeType, CHANGE_IP, CHANGE_PORT, DEFAULT_PORT, MappedAddress, MessageType, StunMessage,
    ValidationError,
};
use natprobe_transport::{StunTransport, TransportError};
use tracing::{debug, info, warn};

/// Detector configuration
#[derive(Debug, Clone)]
pub struct DetectorConfig {
    /// STUN server port used for both servers
    pub port: u16,
    /// Retransmission policy for every request
    pub retry: RetryPolicy,
    /// SOFTWARE attribute attached to the first probe
    pub software: String,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            retry: RetryPolicy::default(),
            software: format!("natprobe/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

/// Result of a binding probe
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BindingProbe {
    /// Address the server saw the request come from
    pub mapped: MappedAddress,
    /// The mapped address is not assigned to a local interface
    pub nat_present: bool,
}

/// NAT type detector
///
/// Borrows the transport for the whole run; the transport is built once by
/// the caller and shared by all probes.
pub struct NatDetector<'a, T: ?Sized, P = BindProbe> {
    transport: &'a T,
    probe: P,
    config: DetectorConfig,
}

impl<'a, T: StunTransport + ?Sized> NatDetector<'a, T, BindProbe> {
    /// Create a detector that checks local addresses by binding to them
    #[must_use]
    pub fn new(transport: &'a T, config: DetectorConfig) -> Self {
        Self::with_probe(transport, BindProbe, config)
    }
}

impl<'a, T, P> NatDetector<'a, T, P>
where
    T: StunTransport + ?Sized,
    P: LocalAddressProbe,
{
    /// Create a detector with a custom local-address probe
    #[must_use]
    pub fn with_probe(transport: &'a T, probe: P, config: DetectorConfig) -> Self {
        Self {
            transport,
            probe,
            config,
        }
    }

    /// Detector configuration
    #[must_use]
    pub fn config(&self) -> &DetectorConfig {
        &self.config
    }

    /// Send `request` and wait for its response, retransmitting with
    /// exponential backoff.
    ///
    /// Returns the first response that is not the `Unknown` sentinel, or the
    /// sentinel itself once every attempt has gone unanswered.
    ///
    /// # Errors
    ///
    /// Returns [`DetectError::Transport`] if sending fails or a datagram
    /// arrives that is not a conformant response.
    pub async fn make_request(&self, request: &StunMessage) -> DetectResult<StunMessage> {
        let mut response = StunMessage::unknown();

        for (attempt, wait) in self.config.retry.schedule().into_iter().enumerate() {
            self.transport.send(request).await?;
            response = self
                .transport
                .receive(request.transaction_id(), wait)
                .await?;

            if !response.is_unknown() {
                debug!(attempt = attempt + 1, "got {}", response.message_type());
                break;
            }
            debug!(attempt = attempt + 1, ?wait, "no response");
        }

        Ok(response)
    }

    /// Probe 1: plain binding request, yielding the public address.
    ///
    /// # Errors
    ///
    /// Returns [`DetectError::NoStunResponse`] if `server` never answers,
    /// [`DetectError::ErrorResponse`] if it answers with a Binding Error
    /// response, [`DetectError::Transport`] on send or validation failure,
    /// and [`DetectError::MalformedAddress`] if the address attribute is
    /// truncated.
    pub async fn test_1(&self, server: &str) -> DetectResult<BindingProbe> {
        let mut request = self.request(server);
        request.add_string_attribute(AttributeType::Software, &self.config.software)?;

        let response = self.make_request(&request).await?;
        if response.is_unknown() {
            return Err(DetectError::NoStunResponse {
                server: server.to_string(),
            });
        }

        if response.message_type() == MessageType::BindingErrorResponse {
            let code = error_code(&response);
            warn!(server, ?code, "binding probe rejected");
            return Err(DetectError::ErrorResponse {
                server: server.to_string(),
                code,
            });
        }

        let mapped = public_address(&response)?;
        let nat_present = !self.probe.is_local_address(&mapped.address);
        info!(
            server,
            address = %mapped.address,
            port = mapped.port,
            nat_present,
            "binding probe answered"
        );

        Ok(BindingProbe {
            mapped,
            nat_present,
        })
    }

    /// Probe 2: ask `server` to reply from a different IP and port.
    ///
    /// # Errors
    ///
    /// Same as [`make_request`](Self::make_request); silence is `Ok(false)`.
    pub async fn test_2(&self, server: &str) -> DetectResult<bool> {
        self.change_request(server, CHANGE_IP | CHANGE_PORT).await
    }

    /// Probe 3: ask `server` to reply from a different port only.
    ///
    /// # Errors
    ///
    /// Same as [`make_request`](Self::make_request); silence is `Ok(false)`.
    pub async fn test_3(&self, server: &str) -> DetectResult<bool> {
        self.change_request(server, CHANGE_PORT).await
    }

    /// Classify the path to `server1`, using `server2` as the second vantage
    /// point.
    ///
    /// # Errors
    ///
    /// Returns [`DetectError::NoStunResponse`] or
    /// [`DetectError::ErrorResponse`] if `server1` does not answer the first
    /// probe with an address, and any transport or validation failure.
    /// Silence or an error response from `server2` is not an error: the NAT
    /// type is reported as [`NatType::Unknown`].
    pub async fn detect(&self, server1: &str, server2: &str) -> DetectResult<NatReport> {
        let first = self.test_1(server1).await?;
        let mut report = NatReport::new(first.mapped.address.clone(), first.nat_present);

        if !report.nat_present {
            report.firewall_present = !self.test_2(server1).await?;
            info!(firewall = report.firewall_present, "no NAT");
            return Ok(report);
        }

        if self.test_2(server1).await? {
            report.nat_type = NatType::FullCone;
        } else {
            match self.test_1(server2).await {
                Ok(second) if second.mapped.address == first.mapped.address => {
                    report.nat_type = if self.test_3(server1).await? {
                        NatType::AddressRestrictedCone
                    } else {
                        NatType::PortRestrictedCone
                    };
                }
                Ok(second) => {
                    debug!(
                        first = %first.mapped.address,
                        second = %second.mapped.address,
                        "mapping differs per destination"
                    );
                    report.nat_type = NatType::Symmetric;
                }
                Err(
                    DetectError::NoStunResponse { server }
                    | DetectError::ErrorResponse { server, .. },
                ) => {
                    warn!(%server, "could not verify via second server");
                }
                Err(e) => return Err(e),
            }
        }

        info!(nat_type = %report.nat_type, "NAT classified");
        Ok(report)
    }

    fn request(&self, server: &str) -> StunMessage {
        StunMessage::new_request(server, self.config.port, MessageType::BindingRequest)
    }

    async fn change_request(&self, server: &str, flags: u32) -> DetectResult<bool> {
        let mut request = self.request(server);
        request.add_int_attribute(AttributeType::ChangeAddress, flags)?;

        let answered = !self.make_request(&request).await?.is_unknown();
        info!(server, flags, answered, "change request probe finished");
        Ok(answered)
    }
}

/// Extract the mapped address from a validated success response, preferring
/// the XOR-encoded attributes.
///
/// # Errors
///
/// Returns [`DetectError::MalformedAddress`] if the attribute value is
/// truncated, or a validation error if no address attribute is present.
pub fn public_address(response: &StunMessage) -> DetectResult<MappedAddress> {
    let tid = response.transaction_id();

    for attr_type in [
        AttributeType::XorMappedAddress,
        AttributeType::XorMappedAddressLegacy,
    ] {
        if let Some(attr) = response.find_attribute(attr_type) {
            return Ok(attr.xor_mapped_address(tid)?);
        }
    }

    if let Some(attr) = response.find_attribute(AttributeType::MappedAddress) {
        return Ok(attr.mapped_address()?);
    }

    Err(TransportError::Validation(ValidationError::MissingAddressAttribute).into())
}

/// ERROR-CODE of an error response as `class * 100 + number`
#[must_use]
pub fn error_code(response: &StunMessage) -> Option<u16> {
    let value = response.find_attribute(AttributeType::ErrorCode)?.value();
    match value {
        [_, _, class, number, ..] => Some(u16::from(class & 0x07) * 100 + u16::from(*number)),
        _ => None,
    }
}
