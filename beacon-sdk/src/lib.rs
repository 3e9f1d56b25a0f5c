//! Wire types for Beacon.
//!
//! This crate holds everything that crosses the serialization boundary
//! between application code and the analytics collector:
//!
//! - [`objects::Value`]: the closed set of parameter shapes an event may carry
//! - [`codec`]: encoding/decoding of values with a fixed variant priority
//! - [`objects::Event`] and its named constructors (page view, exception, session)
//! - [`objects::Payload`]: the request envelope sent to the collector
//! - [`identity`]: client id derivation from a stable installation id
//! - [`system`]: the host property lookups used by convenience constructors
//!
//! It has no async runtime dependency; batching and delivery live in
//! `beacon-core`.

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]
#![forbid(unsafe_code)]

pub mod codec;
pub mod identity;
pub mod objects;
pub mod system;

pub use codec::{DecodingError, EncodingError};
pub use objects::{Event, ExceptionDetails, PageView, Payload, Value};
pub use system::{StaticSystemInfo, SystemInfo};
