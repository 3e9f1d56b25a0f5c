//! Lifecycle signal channel.
//!
//! The host owns a [`LifecycleSignal`] and fires it from whatever platform
//! hook it has (OS notifications, Unix signals, a UI framework callback).
//! Buffers subscribe through [`EventBuffer::watch_lifecycle`].
//!
//! [`EventBuffer::watch_lifecycle`]: crate::buffer::EventBuffer::watch_lifecycle

use super::types::LifecycleEvent;
use tokio::sync::broadcast;

/// Buffer size for the lifecycle channel.
///
/// Lifecycle events are rare; a lagging subscriber only needs to see the
/// most recent ones.
pub const DEFAULT_CHANNEL_BUFFER: usize = 16;

/// Sender handle for lifecycle events.
pub type LifecycleSender = broadcast::Sender<LifecycleEvent>;
/// Receiver handle for lifecycle events.
pub type LifecycleReceiver = broadcast::Receiver<LifecycleEvent>;

/// Create a new lifecycle channel.
///
/// Returns a (sender, receiver) pair. More receivers can be created with
/// `sender.subscribe()`.
pub fn lifecycle_channel() -> (LifecycleSender, LifecycleReceiver) {
    broadcast::channel(DEFAULT_CHANNEL_BUFFER)
}

/// A lifecycle event source.
///
/// Cheap to clone. Dropping every clone closes the channel, which ends the
/// subscriber tasks.
#[derive(Debug, Clone)]
pub struct LifecycleSignal {
    tx: LifecycleSender,
}

impl LifecycleSignal {
    pub fn new() -> Self {
        let (tx, _) = lifecycle_channel();
        Self { tx }
    }

    /// Fire a lifecycle event.
    ///
    /// Returns the number of subscribers that will see it. Firing with no
    /// subscribers is not an error.
    pub fn notify(&self, event: LifecycleEvent) -> usize {
        self.tx.send(event).unwrap_or(0)
    }

    pub fn subscribe(&self) -> LifecycleReceiver {
        self.tx.subscribe()
    }
}

impl Default for LifecycleSignal {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_notify_without_subscribers() {
        let signal = LifecycleSignal::new();
        assert_eq!(signal.notify(LifecycleEvent::Terminating), 0);
    }

    #[tokio::test]
    async fn test_subscribers_receive_events() {
        let signal = LifecycleSignal::new();
        let mut rx = signal.subscribe();

        assert_eq!(signal.notify(LifecycleEvent::Suspending), 1);
        assert_eq!(rx.recv().await.unwrap(), LifecycleEvent::Suspending);
    }
}
