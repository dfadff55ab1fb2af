//! # Courier Domain
//!
//! Pure types shared across Courier crates.
//!
//! This crate contains:
//! - The closed error taxonomy ([`DataError`]) and `Result` alias
//! - The response envelope wire format ([`Envelope`], [`ResponseStatus`])
//! - Persisted authentication state ([`TokenState`])
//! - Configuration structs loaded by the infra crate
//!
//! ## Architecture Principles
//! - No I/O, no async, no transport types
//! - Everything here is serializable and cheaply cloneable

pub mod config;
pub mod envelope;
pub mod errors;
pub mod token;

pub use config::{ApiConfig, CourierConfig, DeviceConfig, RetryConfig};
pub use envelope::{Envelope, HeaderAware, ResponseStatus, HEADER_PARAMETERS_FIELD};
pub use errors::{DataError, Result};
pub use token::TokenState;
