//! Local interface check used to decide whether a NAT is present.
//!
//! If the address a STUN server reports can be bound on this host, the host
//! owns it and no translation happened on the way out.

use socket2::{Domain, Protocol, Socket, Type};
use std::net::{IpAddr, SocketAddr};
use tracing::{debug, warn};

/// Decides whether an address belongs to one of this host's interfaces
pub trait LocalAddressProbe: Send + Sync {
    /// `true` if `address` is assigned locally.
    ///
    /// Failures of any kind count as "not local".
    fn is_local_address(&self, address: &str) -> bool;
}

/// Probe that tries to bind a throwaway UDP socket to `address:0`
#[derive(Debug, Clone, Copy, Default)]
pub struct BindProbe;

impl LocalAddressProbe for BindProbe {
    fn is_local_address(&self, address: &str) -> bool {
        let ip: IpAddr = match address.parse() {
            Ok(ip) => ip,
            Err(_) => {
                warn!(address, "mapped address is not an IP literal; treating as not local");
                return false;
            }
        };

        let domain = if ip.is_ipv4() {
            Domain::IPV4
        } else {
            Domain::IPV6
        };

        let socket = match Socket::new(domain, Type::DGRAM, Some(Protocol::UDP)) {
            Ok(socket) => socket,
            Err(e) => {
                warn!(%ip, error = %e, "could not create probe socket; treating as not local");
                return false;
            }
        };

        match socket.bind(&SocketAddr::new(ip, 0).into()) {
            Ok(()) => {
                debug!(%ip, "mapped address is local");
                true
            }
            Err(e) => {
                debug!(%ip, error = %e, "mapped address is not local");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_loopback_is_local() {
        assert!(BindProbe.is_local_address("127.0.0.1"));
    }

    #[test]
    fn test_documentation_address_is_not_local() {
        assert!(!BindProbe.is_local_address("203.0.113.77"));
    }

    #[test]
    fn test_unparseable_address_is_not_local() {
        assert!(!BindProbe.is_local_address("unsupported"));
        assert!(!BindProbe.is_local_address(""));
    }
}
