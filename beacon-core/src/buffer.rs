//! The batching engine.
//!
//! An [`EventBuffer`] accumulates events and hands them to a [`BatchSink`]
//! in batches. A batch leaves the buffer when:
//!
//! - the pending count reaches `batch_size` (checked on every `track`)
//! - `max_age` has passed since the buffer left the idle state
//! - the host signals that the process is suspending or terminating
//! - the host calls [`EventBuffer::flush`]
//!
//! # States
//!
//! ```text
//!            track                       count / age / lifecycle
//!   Idle ───────────▶ Accumulating ─────────────────────────────▶ Idle
//!   (no events,       (>= 1 event,        swap pending for an empty
//!    no timer)         one timer)         list, dispatch, stop timer
//! ```
//!
//! The pending list and the timer handle live behind one mutex. Every
//! mutation (append, any flush) runs under it, so a flush captures the whole
//! pending list exactly once and a concurrent `track` lands either in that
//! batch or in the fresh list. The sink is called while the lock is held,
//! which keeps batches in trigger order; sinks must hand the batch off
//! (e.g. spawn a task) and must not call back into the buffer.
//!
//! The age timer is started when the buffer leaves `Idle` and is never
//! restarted by later events, so continuous traffic cannot postpone a flush.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Duration;

use beacon_sdk::Event;
use thiserror::Error;
use tokio::runtime::Handle;
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;
use tracing::{debug, trace, warn};

use crate::events::{FlushTrigger, LifecycleEvent, LifecycleReceiver};

/// Default number of events per batch.
pub const DEFAULT_BATCH_SIZE: usize = 8;

/// Default maximum batch age (24 hours).
pub const DEFAULT_MAX_AGE: Duration = Duration::from_secs(24 * 60 * 60);

/// Errors raised when creating a buffer.
#[derive(Debug, Error)]
pub enum BufferError {
    /// The age timer needs a Tokio runtime to run on.
    #[error("event buffer must be created inside a Tokio runtime")]
    NoRuntime,

    #[error("invalid buffer policy: {0}")]
    InvalidPolicy(String),
}

/// Receives batches handed off by an [`EventBuffer`].
///
/// Called with the buffer lock held: implementations must return quickly
/// and must not call back into the buffer.
pub trait BatchSink: Send + Sync + 'static {
    fn dispatch(&self, batch: Vec<Event>);
}

impl<F> BatchSink for F
where
    F: Fn(Vec<Event>) + Send + Sync + 'static,
{
    fn dispatch(&self, batch: Vec<Event>) {
        self(batch)
    }
}

/// Flush thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BufferPolicy {
    /// Flush as soon as this many events are pending.
    pub batch_size: usize,
    /// Flush this long after the first event of a batch arrived.
    pub max_age: Duration,
}

impl BufferPolicy {
    pub fn new(batch_size: usize, max_age: Duration) -> Self {
        Self {
            batch_size,
            max_age,
        }
    }

    pub fn validate(&self) -> Result<(), BufferError> {
        if self.batch_size == 0 {
            return Err(BufferError::InvalidPolicy(
                "batch_size must be at least 1".to_string(),
            ));
        }
        if self.max_age.is_zero() {
            return Err(BufferError::InvalidPolicy(
                "max_age must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for BufferPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_BATCH_SIZE, DEFAULT_MAX_AGE)
    }
}

/// Accumulates events and hands them off in batches.
///
/// Cheap to clone; clones share the same pending list.
#[derive(Clone)]
pub struct EventBuffer {
    shared: Arc<Shared>,
}

struct Shared {
    policy: BufferPolicy,
    sink: Box<dyn BatchSink>,
    runtime: Handle,
    state: Mutex<BufferState>,
}

#[derive(Default)]
struct BufferState {
    pending: Vec<Event>,
    timer: Option<AgeTimer>,
    /// Incremented for every timer started. A timer only acts if it is
    /// still the current one when it fires.
    next_generation: u64,
}

struct AgeTimer {
    generation: u64,
    handle: JoinHandle<()>,
}

impl EventBuffer {
    /// Create a buffer that dispatches batches to `sink`.
    ///
    /// Must be called from within a Tokio runtime; the age timer runs on it.
    pub fn new(policy: BufferPolicy, sink: impl BatchSink) -> Result<Self, BufferError> {
        policy.validate()?;
        let runtime = Handle::try_current().map_err(|_| BufferError::NoRuntime)?;

        Ok(Self {
            shared: Arc::new(Shared {
                policy,
                sink: Box::new(sink),
                runtime,
                state: Mutex::new(BufferState::default()),
            }),
        })
    }

    pub fn policy(&self) -> BufferPolicy {
        self.shared.policy
    }

    /// Append an event. Never blocks on I/O.
    ///
    /// Starts the age timer if the buffer was idle, and flushes immediately
    /// once `batch_size` events are pending.
    pub fn track(&self, event: Event) {
        let mut state = self.shared.lock();
        trace!(event = event.name(), "Tracking event");
        state.pending.push(event);

        if state.pending.len() >= self.shared.policy.batch_size {
            self.shared.flush_locked(&mut state, FlushTrigger::Count);
            return;
        }

        if state.timer.is_none() {
            Shared::start_timer(&self.shared, &mut state);
        }
    }

    /// Hand off whatever is pending. Returns the number of events flushed.
    pub fn flush(&self) -> usize {
        let mut state = self.shared.lock();
        self.shared.flush_locked(&mut state, FlushTrigger::Manual)
    }

    /// React to a lifecycle notification: flush everything pending, now.
    ///
    /// Does not wait for delivery. Returns the number of events flushed.
    pub fn on_lifecycle(&self, event: LifecycleEvent) -> usize {
        let mut state = self.shared.lock();
        self.shared
            .flush_locked(&mut state, FlushTrigger::Lifecycle(event))
    }

    /// Subscribe to a lifecycle signal.
    ///
    /// The returned task flushes on every event and ends when the signal is
    /// closed or the buffer is dropped.
    pub fn watch_lifecycle(&self, mut rx: LifecycleReceiver) -> JoinHandle<()> {
        let weak: Weak<Shared> = Arc::downgrade(&self.shared);

        self.shared.runtime.spawn(async move {
            loop {
                match rx.recv().await {
                    Ok(event) => {
                        let Some(shared) = weak.upgrade() else {
                            break;
                        };
                        let mut state = shared.lock();
                        shared.flush_locked(&mut state, FlushTrigger::Lifecycle(event));
                    }
                    Err(RecvError::Lagged(skipped)) => {
                        // Newer events are still queued; the next recv flushes.
                        warn!(skipped, "Lifecycle subscriber lagged");
                    }
                    Err(RecvError::Closed) => {
                        debug!("Lifecycle signal closed");
                        break;
                    }
                }
            }
        })
    }

    /// Number of events waiting for the next flush.
    pub fn pending_len(&self) -> usize {
        self.shared.lock().pending.len()
    }

    /// `true` when nothing is pending and no timer is running.
    pub fn is_idle(&self) -> bool {
        let state = self.shared.lock();
        state.pending.is_empty() && state.timer.is_none()
    }
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, BufferState> {
        // A panicking sink must not wedge every later `track` call.
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Swap the pending list out and dispatch it. Caller holds the lock.
    fn flush_locked(&self, state: &mut BufferState, trigger: FlushTrigger) -> usize {
        if let Some(timer) = state.timer.take() {
            timer.handle.abort();
        }

        if state.pending.is_empty() {
            trace!(%trigger, "Nothing pending, skipping flush");
            return 0;
        }

        let batch = std::mem::take(&mut state.pending);
        let count = batch.len();
        debug!(%trigger, events = count, "Flushing event batch");
        self.sink.dispatch(batch);
        count
    }

    fn start_timer(this: &Arc<Self>, state: &mut BufferState) {
        let generation = state.next_generation;
        state.next_generation += 1;

        let weak = Arc::downgrade(this);
        let max_age = this.policy.max_age;
        let handle = this.runtime.spawn(async move {
            tokio::time::sleep(max_age).await;
            if let Some(shared) = weak.upgrade() {
                shared.on_timer(generation);
            }
        });

        trace!(generation, max_age_secs = max_age.as_secs(), "Started age timer");
        state.timer = Some(AgeTimer { generation, handle });
    }

    fn on_timer(&self, generation: u64) {
        let mut state = self.lock();

        match &state.timer {
            Some(timer) if timer.generation == generation => {}
            _ => {
                trace!(generation, "Ignoring superseded age timer");
                return;
            }
        }
        // This is the running task; clear it without aborting.
        state.timer = None;

        if state.pending.is_empty() {
            trace!("Age timer fired with nothing pending");
            return;
        }
        self.flush_locked(&mut state, FlushTrigger::Age);
    }
}

impl Drop for Shared {
    fn drop(&mut self) {
        let state = self.state.get_mut().unwrap_or_else(PoisonError::into_inner);
        if let Some(timer) = state.timer.take() {
            timer.handle.abort();
        }
        if !state.pending.is_empty() {
            debug!(
                events = state.pending.len(),
                "Event buffer dropped with unsent events"
            );
        }
    }
}
