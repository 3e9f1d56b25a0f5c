//! Control events for the batching pipeline.
//!
//! # Event Flow
//!
//! 1. `track` appends to the `EventBuffer`
//! 2. A `FlushTrigger` (count, age, lifecycle, manual) hands the batch to a `BatchSink`
//! 3. The `DeliverySink` posts it to the collector on a spawned task
//!
//! `LifecycleEvent`s arrive from the host through a `LifecycleSignal`.

pub mod channels;
pub mod types;

pub use channels::{
    DEFAULT_CHANNEL_BUFFER, LifecycleReceiver, LifecycleSender, LifecycleSignal,
    lifecycle_channel,
};

pub use types::{FlushTrigger, LifecycleEvent};
