//! # natprobe discovery
//!
//! NAT type detection over an injected [`StunTransport`].
//!
//! This crate provides:
//! - The three-probe classification sequence ([`NatDetector`])
//! - Retransmission with exponential backoff ([`RetryPolicy`])
//! - The local-bind check that decides whether a NAT is present
//! - The detection result ([`NatReport`])
//!
//! ## Example
//!
//! ```no_run
//! use natprobe_discovery::{DetectorConfig, NatDetector};
//! use natprobe_transport::{ControllerConfig, StunController};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let controller = StunController::bind(&ControllerConfig::default()).await?;
//! let detector = NatDetector::new(&controller, DetectorConfig::default());
//!
//! let report = detector.detect("stun1.example.org", "stun2.example.org").await?;
//! println!("{report}");
//! # Ok(())
//! # }
//! ```
//!
//! [`StunTransport`]: natprobe_transport::StunTransport

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod detector;
pub mod probe;
pub mod retry;
pub mod types;

pub use detector::{BindingProbe, DetectorConfig, NatDetector, error_code, public_address};
pub use probe::{BindProbe, LocalAddressProbe};
pub use retry::{DEFAULT_ATTEMPTS, DEFAULT_INITIAL_RTO, RetryPolicy};
pub use types::{DetectError, DetectResult, NatReport, NatType};
