//! NAT classification result types.

use natprobe_core::CodecError;
use natprobe_transport::TransportError;
use serde::Serialize;
use std::fmt;

/// NAT type classification
///
/// The classic categories, told apart by how the mapping and the filtering
/// depend on the remote address and port:
/// - Full Cone: any external host can reach the mapped port
/// - Address-Restricted Cone: only hosts the client contacted can reply
/// - Port-Restricted Cone: only the exact IP:port contacted can reply
/// - Symmetric: a different mapping per destination
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum NatType {
    /// No NAT between the host and the server
    None,
    /// Full Cone NAT
    FullCone,
    /// Address-Restricted Cone NAT
    AddressRestrictedCone,
    /// Port-Restricted Cone NAT
    PortRestrictedCone,
    /// Symmetric NAT
    Symmetric,
    /// NAT present but the type could not be established
    Unknown,
}

impl fmt::Display for NatType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::None => write!(f, "None"),
            Self::FullCone => write!(f, "Full-cone NAT"),
            Self::AddressRestrictedCone => write!(f, "Address-restricted-cone NAT"),
            Self::PortRestrictedCone => write!(f, "Port-restricted-cone NAT"),
            Self::Symmetric => write!(f, "Symmetric NAT"),
            Self::Unknown => write!(f, "Undetermined (could not verify via second server)"),
        }
    }
}

/// Outcome of one detection run
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NatReport {
    /// At least one NAT sits between the host and the first server
    pub nat_present: bool,
    /// Filtering firewall detected; only meaningful without NAT
    pub firewall_present: bool,
    /// NAT classification
    pub nat_type: NatType,
    /// Externally visible address reported by the first server
    pub public_ip: String,
}

impl NatReport {
    /// Report for a host that sees `public_ip` with no classification yet
    #[must_use]
    pub fn new(public_ip: impl Into<String>, nat_present: bool) -> Self {
        Self {
            nat_present,
            firewall_present: false,
            nat_type: if nat_present {
                NatType::Unknown
            } else {
                NatType::None
            },
            public_ip: public_ip.into(),
        }
    }
}

impl fmt::Display for NatReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "NAT detected: {}",
            if self.nat_present { "YES" } else { "NO" }
        )?;
        if self.nat_present {
            writeln!(f, "NAT type: {}", self.nat_type)?;
        } else if self.firewall_present {
            writeln!(f, "Symmetric Firewall")?;
        } else {
            writeln!(f, "Open Internet")?;
        }
        write!(f, "Public IP: {}", self.public_ip)
    }
}

/// Fatal detection errors
#[derive(Debug, thiserror::Error)]
pub enum DetectError {
    /// Resolution, send, or protocol validation failure
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// First probe never received a response
    #[error("UDP is blocked or check access to {server} server")]
    NoStunResponse {
        /// Server that stayed silent
        server: String,
    },

    /// Binding probe answered with a Binding Error response
    #[error("{server} server rejected the binding request{}", error_code_suffix(.code))]
    ErrorResponse {
        /// Server that sent the error
        server: String,
        /// ERROR-CODE value (class * 100 + number), if readable
        code: Option<u16>,
    },

    /// Address attribute (or the request carrying it) failed to encode/decode
    #[error("Malformed mapped address: {0}")]
    MalformedAddress(#[from] CodecError),
}

fn error_code_suffix(code: &Option<u16>) -> String {
    code.map(|code| format!(" with error {code}"))
        .unwrap_or_default()
}

/// Result type for detection operations
pub type DetectResult<T> = Result<T, DetectError>;
