//! UDP transport controller.
//!
//! Owns the single UDP socket used for every probe of a detection run.
//! The socket is created once, non-blocking, and closed when the
//! controller is dropped.

use crate::transport::{StunTransport, TransportError, TransportResult, TransportStats};
use crate::validation::validate_response;
use async_trait::async_trait;
use natprobe_core::{StunMessage, TransactionId};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::net::UdpSocket;
use tracing::{debug, warn};

/// Default wait for a single response
pub const DEFAULT_RECEIVE_TIMEOUT: Duration = Duration::from_secs(1);

/// Largest UDP payload
const MAX_DATAGRAM_SIZE: usize = 65535;

/// Controller configuration
#[derive(Debug, Clone)]
pub struct ControllerConfig {
    /// Local address for the probe socket
    pub bind_addr: SocketAddr,
    /// Receive buffer size in bytes
    pub recv_buffer_size: usize,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 0)),
            recv_buffer_size: MAX_DATAGRAM_SIZE,
        }
    }
}

/// STUN transport over one UDP socket
///
/// # Examples
///
/// ```no_run
/// use natprobe_core::{MessageType, StunMessage, DEFAULT_PORT};
/// use natprobe_transport::{ControllerConfig, StunController, StunTransport, DEFAULT_RECEIVE_TIMEOUT};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let controller = StunController::bind(&ControllerConfig::default()).await?;
///
/// let request = StunMessage::new_request("stun.example.org", DEFAULT_PORT, MessageType::BindingRequest);
/// controller.send(&request).await?;
/// let response = controller.receive(request.transaction_id(), DEFAULT_RECEIVE_TIMEOUT).await?;
/// println!("{}", response.message_type());
/// # Ok(())
/// # }
/// ```
pub struct StunController {
    socket: UdpSocket,
    recv_buffer_size: usize,
    requests_sent: AtomicU64,
    responses_received: AtomicU64,
    timeouts: AtomicU64,
    socket_errors: AtomicU64,
}

impl StunController {
    /// Create the probe socket.
    ///
    /// # Errors
    /// Returns [`TransportError::Bind`] if the socket cannot be created,
    /// bound, or registered with the runtime.
    pub async fn bind(config: &ControllerConfig) -> TransportResult<Self> {
        let addr = config.bind_addr;

        let domain = if addr.is_ipv4() {
            socket2::Domain::IPV4
        } else {
            socket2::Domain::IPV6
        };

        let socket2 =
            socket2::Socket::new(domain, socket2::Type::DGRAM, Some(socket2::Protocol::UDP))
                .map_err(|e| TransportError::Bind(e.to_string()))?;

        socket2
            .bind(&addr.into())
            .map_err(|e| TransportError::Bind(e.to_string()))?;

        socket2
            .set_nonblocking(true)
            .map_err(|e| TransportError::Bind(e.to_string()))?;
        let std_socket: std::net::UdpSocket = socket2.into();
        let socket =
            UdpSocket::from_std(std_socket).map_err(|e| TransportError::Bind(e.to_string()))?;

        debug!(local = ?socket.local_addr().ok(), "STUN probe socket bound");

        Ok(Self {
            socket,
            recv_buffer_size: config.recv_buffer_size.clamp(1, MAX_DATAGRAM_SIZE),
            requests_sent: AtomicU64::new(0),
            responses_received: AtomicU64::new(0),
            timeouts: AtomicU64::new(0),
            socket_errors: AtomicU64::new(0),
        })
    }

    /// Local address of the probe socket
    ///
    /// # Errors
    /// Returns [`TransportError::Io`] if the address cannot be determined.
    pub fn local_addr(&self) -> TransportResult<SocketAddr> {
        Ok(self.socket.local_addr()?)
    }
}

/// Resolve `server:port` into candidate socket addresses, in resolver order.
///
/// # Errors
/// Returns [`TransportError::Resolution`] with the resolver's diagnostic if
/// the name cannot be resolved or yields no address.
pub async fn resolve(server: &str, port: u16) -> TransportResult<Vec<SocketAddr>> {
    let addrs: Vec<SocketAddr> = tokio::net::lookup_host((server, port))
        .await
        .map_err(|e| TransportError::Resolution {
            server: server.to_string(),
            reason: e.to_string(),
        })?
        .collect();

    if addrs.is_empty() {
        return Err(TransportError::Resolution {
            server: server.to_string(),
            reason: "no addresses returned".to_string(),
        });
    }

    Ok(addrs)
}

#[async_trait]
impl StunTransport for StunController {
    async fn send(&self, message: &StunMessage) -> TransportResult<()> {
        let destination = message.destination().ok_or(TransportError::NoDestination)?;
        let candidates = resolve(&destination.server, destination.port).await?;
        let data = message.to_bytes();

        for addr in &candidates {
            match self.socket.send_to(&data, *addr).await {
                Ok(_) => {
                    self.requests_sent.fetch_add(1, Ordering::Relaxed);
                    debug!(
                        server = %destination.server,
                        %addr,
                        tid = %message.transaction_id(),
                        bytes = data.len(),
                        "sent {}",
                        message.message_type()
                    );
                    return Ok(());
                }
                Err(e) => debug!(%addr, error = %e, "candidate rejected datagram"),
            }
        }

        Err(TransportError::Send {
            server: destination.server.clone(),
            candidates: candidates.len(),
        })
    }

    async fn receive(
        &self,
        transaction_id: &TransactionId,
        timeout: Duration,
    ) -> TransportResult<StunMessage> {
        let mut buf = vec![0u8; self.recv_buffer_size];

        let (len, from) = match tokio::time::timeout(timeout, self.socket.recv_from(&mut buf)).await
        {
            Ok(Ok(received)) => received,
            Ok(Err(e)) => {
                self.socket_errors.fetch_add(1, Ordering::Relaxed);
                warn!(error = %e, "socket error while waiting for response");
                return Ok(StunMessage::unknown());
            }
            Err(_) => {
                self.timeouts.fetch_add(1, Ordering::Relaxed);
                debug!(?timeout, tid = %transaction_id, "no response");
                return Ok(StunMessage::unknown());
            }
        };

        let message = StunMessage::from_bytes(&buf[..len])?;
        debug!(%from, bytes = len, "received {}", message.message_type());

        validate_response(&message, transaction_id)?;
        self.responses_received.fetch_add(1, Ordering::Relaxed);

        Ok(message)
    }

    fn stats(&self) -> TransportStats {
        TransportStats {
            requests_sent: self.requests_sent.load(Ordering::Relaxed),
            responses_received: self.responses_received.load(Ordering::Relaxed),
            timeouts: self.timeouts.load(Ordering::Relaxed),
            socket_errors: self.socket_errors.load(Ordering::Relaxed),
        }
    }
}
