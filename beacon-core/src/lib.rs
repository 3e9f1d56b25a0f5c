//! Batched analytics telemetry runtime.
//!
//! Events go into an [`EventBuffer`](buffer::EventBuffer), leave it in
//! batches on count, age, lifecycle or manual triggers, and are posted to
//! the collector by a [`Deliverer`](processors::Deliverer). Most hosts only
//! need [`Telemetry`](telemetry::Telemetry).

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]
#![forbid(unsafe_code)]

pub mod buffer;
pub mod config;
pub mod events;
pub mod identity;
pub mod processors;
pub mod session;
pub mod telemetry;

#[cfg(test)]
mod test_support;

pub use buffer::{BatchSink, BufferError, BufferPolicy, EventBuffer};
pub use config::{ConfigError, TelemetryConfig};
pub use events::{FlushTrigger, LifecycleEvent, LifecycleSignal};
pub use identity::{IdentityProvider, StaticIdentity};
pub use processors::{Deliverer, DeliveryConfig, DeliveryOutcome, DeliverySink};
pub use session::SessionTracker;
pub use telemetry::{Telemetry, TelemetryBuilder, TelemetryError};
