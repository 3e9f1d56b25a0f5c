//! Processors that move batches out of the process.
//!
//! - `Deliverer`: Receives a batch, posts it to the collector, classifies the response
//! - `DeliverySink`: Adapts a `Deliverer` into a `BatchSink`, one task per batch

pub mod deliverer;

pub use deliverer::{
    BuildError, CompletionCallback, DEFAULT_ENDPOINT, DEFAULT_REQUEST_TIMEOUT, Deliverer,
    DeliveryConfig, DeliveryFailure, DeliveryOutcome, DeliverySink, classify_status,
};
