//! # natprobe transport
//!
//! UDP transport controller for the natprobe NAT classifier.
//!
//! This crate provides:
//! - [`StunTransport`], the single send-then-wait exchange surface the
//!   detector depends on
//! - [`StunController`], its UDP implementation owning one socket per run
//! - Server name resolution
//! - Response conformance validation
//!
//! A wait that times out or hits a socket error yields the
//! [`MessageType::Unknown`](natprobe_core::MessageType::Unknown) sentinel;
//! a datagram that arrives but breaks a protocol rule is an error.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod controller;
pub mod transport;
pub mod validation;

pub use controller::{ControllerConfig, DEFAULT_RECEIVE_TIMEOUT, StunController, resolve};
pub use transport::{StunTransport, TransportError, TransportResult, TransportStats};
pub use validation::validate_response;
