//! Start/stop session timing.
//!
//! A [`SessionTracker`] pairs a `start` with the next `stop` for the same
//! name and turns the pair into an [`Event::session`] carrying the elapsed
//! time. Elapsed time uses the monotonic clock.

use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

use beacon_sdk::Event;
use beacon_sdk::objects::session_id_for;
use tokio::time::Instant;
use tracing::trace;

#[derive(Debug, Default)]
pub struct SessionTracker {
    started: Mutex<HashMap<String, Instant>>,
}

impl SessionTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the start of `name`. A second start for the same name
    /// replaces the first.
    pub fn start(&self, name: &str) {
        let mut started = self.started.lock().unwrap_or_else(PoisonError::into_inner);
        if started.insert(name.to_string(), Instant::now()).is_some() {
            trace!(session = name, "Restarted session");
        }
    }

    /// Finish `name` and build its session event.
    ///
    /// Returns `None` if `name` was never started (or already stopped).
    pub fn stop(&self, name: &str) -> Option<Event> {
        let start = self
            .started
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(name)?;

        let elapsed_ms = i64::try_from(start.elapsed().as_millis()).unwrap_or(i64::MAX);
        trace!(session = name, elapsed_ms, "Stopped session");
        Some(Event::session(name, session_id_for(name), elapsed_ms))
    }

    pub fn is_running(&self, name: &str) -> bool {
        self.started
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(name)
    }
}
