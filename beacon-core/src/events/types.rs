//! Event type definitions for the batching pipeline.
//!
//! These are control events, not analytics events: they describe why a
//! batch left the buffer and what the host process is about to do.

/// Host process lifecycle notifications.
///
/// Both mean "flush now, you may not get another chance". Delivery started
/// in response is best-effort; the process may die before it completes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LifecycleEvent {
    /// The process is about to be suspended (e.g. moved to the background).
    Suspending,
    /// The process is about to exit.
    Terminating,
}

impl std::fmt::Display for LifecycleEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LifecycleEvent::Suspending => write!(f, "suspending"),
            LifecycleEvent::Terminating => write!(f, "terminating"),
        }
    }
}

/// What caused a batch to be handed off.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FlushTrigger {
    /// The pending count reached the batch size.
    Count,
    /// The batch reached its maximum age.
    Age,
    /// A lifecycle notification arrived.
    Lifecycle(LifecycleEvent),
    /// The host asked for a flush.
    Manual,
}

impl std::fmt::Display for FlushTrigger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FlushTrigger::Count => write!(f, "count"),
            FlushTrigger::Age => write!(f, "age"),
            FlushTrigger::Lifecycle(event) => write!(f, "lifecycle:{event}"),
            FlushTrigger::Manual => write!(f, "manual"),
        }
    }
}
