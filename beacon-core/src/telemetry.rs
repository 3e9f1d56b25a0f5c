//! The application-facing handle.
//!
//! [`Telemetry`] wires an [`EventBuffer`] to a [`DeliverySink`] and adds
//! session timing on top. Build one with [`Telemetry::builder`] inside a
//! Tokio runtime and pass it to whoever records events; clones share state.

use std::sync::Arc;
use std::time::Duration;

use beacon_sdk::Event;
use thiserror::Error;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tracing::info;

use crate::buffer::{BufferError, EventBuffer};
use crate::config::{ConfigError, TelemetryConfig};
use crate::events::{LifecycleEvent, LifecycleReceiver};
use crate::identity::IdentityProvider;
use crate::processors::{CompletionCallback, Deliverer, DeliveryOutcome, DeliverySink};
use crate::session::SessionTracker;

#[derive(Debug, Error)]
pub enum TelemetryError {
    #[error("invalid telemetry config: {0}")]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Buffer(#[from] BufferError),

    /// Neither `client_id_seed` nor an identity provider was given.
    #[error("no client id source: set client_id_seed or provide an identity")]
    MissingIdentity,
}

pub struct TelemetryBuilder {
    config: TelemetryConfig,
    identity: Option<Arc<dyn IdentityProvider>>,
    on_complete: Option<CompletionCallback>,
}

impl TelemetryBuilder {
    pub fn identity(mut self, identity: impl IdentityProvider + 'static) -> Self {
        self.identity = Some(Arc::new(identity));
        self
    }

    /// Called once per batch with its delivery outcome.
    pub fn on_complete(
        mut self,
        callback: impl Fn(&DeliveryOutcome) + Send + Sync + 'static,
    ) -> Self {
        self.on_complete = Some(Arc::new(callback));
        self
    }

    /// Validate the config and start the pipeline.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn build(self) -> Result<Telemetry, TelemetryError> {
        let config = self.config;
        config.validate()?;

        let runtime = Handle::try_current().map_err(|_| BufferError::NoRuntime)?;
        let seed = match (&config.client_id_seed, &self.identity) {
            (Some(seed), _) => seed.clone(),
            (None, Some(identity)) => identity.stable_id(),
            (None, None) => return Err(TelemetryError::MissingIdentity),
        };

        let mut deliverer = Deliverer::new(config.delivery_config(), seed)
            .with_non_personalized_ads(config.non_personalized_ads);
        if let Some(properties) = config.user_properties.clone() {
            deliverer = deliverer.with_user_properties(properties);
        }

        let mut sink = DeliverySink::new(deliverer, runtime);
        if let Some(callback) = self.on_complete {
            sink = sink.on_complete(move |outcome| callback(outcome));
        }
        let buffer = EventBuffer::new(config.buffer_policy(), sink.clone())?;

        info!(
            measurement_id = %config.measurement_id,
            batch_size = config.batch_size,
            max_batch_age_secs = config.max_batch_age.as_secs(),
            "Telemetry started"
        );

        Ok(Telemetry {
            buffer,
            sink,
            sessions: Arc::new(SessionTracker::new()),
        })
    }
}

/// Records events and sends them in batches.
#[derive(Clone)]
pub struct Telemetry {
    buffer: EventBuffer,
    sink: DeliverySink,
    sessions: Arc<SessionTracker>,
}

impl Telemetry {
    pub fn builder(config: TelemetryConfig) -> TelemetryBuilder {
        TelemetryBuilder {
            config,
            identity: None,
            on_complete: None,
        }
    }

    pub fn send(&self, event: Event) {
        self.buffer.track(event);
    }

    /// Track each event in order.
    pub fn send_all(&self, events: impl IntoIterator<Item = Event>) {
        for event in events {
            self.buffer.track(event);
        }
    }

    pub fn start_session(&self, name: &str) {
        self.sessions.start(name);
    }

    /// Stop a session and track its event. Returns `false` if `name` was
    /// not running.
    pub fn stop_session(&self, name: &str) -> bool {
        match self.sessions.stop(name) {
            Some(event) => {
                self.buffer.track(event);
                true
            }
            None => false,
        }
    }

    pub fn flush(&self) -> usize {
        self.buffer.flush()
    }

    pub fn on_lifecycle(&self, event: LifecycleEvent) -> usize {
        self.buffer.on_lifecycle(event)
    }

    pub fn watch_lifecycle(&self, rx: LifecycleReceiver) -> JoinHandle<()> {
        self.buffer.watch_lifecycle(rx)
    }

    /// Wait (at most `timeout`) for deliveries already handed off.
    pub async fn wait_idle(&self, timeout: Duration) -> bool {
        self.sink.wait_idle(timeout).await
    }

    /// The client id a payload created now would carry.
    pub fn client_id(&self) -> String {
        self.sink.deliverer().client_id()
    }

    pub fn buffer(&self) -> &EventBuffer {
        &self.buffer
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::LifecycleSignal;
    use crate::identity::StaticIdentity;
    use crate::test_support::Collector;
    use tokio::sync::mpsc;

    fn config(endpoint: &str, batch_size: usize, max_age: Duration) -> TelemetryConfig {
        TelemetryConfig {
            endpoint: endpoint.to_string(),
            api_secret: Some("secret".to_string()),
            batch_size,
            max_batch_age: max_age,
            request_timeout: Duration::from_secs(5),
            ..TelemetryConfig::new("G-TEST")
        }
    }

    #[test]
    fn test_build_outside_runtime_fails() {
        let result = Telemetry::builder(TelemetryConfig::new("G-TEST"))
            .identity(StaticIdentity::new("id"))
            .build();
        assert!(matches!(
            result,
            Err(TelemetryError::Buffer(BufferError::NoRuntime))
        ));
    }

    #[tokio::test]
    async fn test_build_requires_identity_and_valid_config() {
        let result = Telemetry::builder(TelemetryConfig::new("G-TEST")).build();
        assert!(matches!(result, Err(TelemetryError::MissingIdentity)));

        let result = Telemetry::builder(TelemetryConfig::new(""))
            .identity(StaticIdentity::new("id"))
            .build();
        assert!(matches!(result, Err(TelemetryError::Config(_))));
    }

    #[tokio::test]
    async fn test_client_id_seed_overrides_identity() {
        let config = TelemetryConfig {
            client_id_seed: Some("123".to_string()),
            ..TelemetryConfig::new("G-TEST")
        };
        let telemetry = Telemetry::builder(config)
            .identity(StaticIdentity::new("something-else"))
            .build()
            .unwrap();
        assert!(telemetry.client_id().starts_with("0000000901."));
    }

    #[tokio::test]
    async fn test_count_flush_delivers_one_batch() {
        let (collector, endpoint) = Collector::spawn(200).await;
        let telemetry = Telemetry::builder(config(&endpoint, 3, Duration::from_secs(60)))
            .identity(StaticIdentity::new("install-1"))
            .build()
            .unwrap();

        telemetry.send_all([
            Event::custom("a", "k", "1"),
            Event::custom("b", "k", "2"),
            Event::custom("c", "k", "3"),
        ]);
        assert_eq!(telemetry.buffer().pending_len(), 0);
        assert!(telemetry.wait_idle(Duration::from_secs(5)).await);

        let requests = collector.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].event_names(), vec!["a", "b", "c"]);
        assert_eq!(
            requests[0].query.as_deref(),
            Some("api_secret=secret&measurement_id=G-TEST")
        );
    }

    #[tokio::test]
    async fn test_lifecycle_flush_reports_outcome() {
        let (collector, endpoint) = Collector::spawn(500).await;
        let (tx, mut rx) = mpsc::unbounded_channel();
        let telemetry = Telemetry::builder(config(&endpoint, 10, Duration::from_secs(3600)))
            .identity(StaticIdentity::new("install-1"))
            .on_complete(move |outcome| {
                let _ = tx.send(outcome.is_success());
            })
            .build()
            .unwrap();

        let signal = LifecycleSignal::new();
        let _watcher = telemetry.watch_lifecycle(signal.subscribe());

        telemetry.send(Event::custom("one", "k", "v"));
        telemetry.send(Event::custom("two", "k", "v"));
        signal.notify(LifecycleEvent::Terminating);

        let success = tokio::time::timeout(Duration::from_secs(5), rx.recv())
            .await
            .unwrap()
            .unwrap();
        assert!(!success);
        assert!(telemetry.buffer().is_idle());
        assert_eq!(collector.requests()[0].event_names(), vec!["one", "two"]);
    }

    #[tokio::test]
    async fn test_sessions_are_tracked() {
        let (collector, endpoint) = Collector::spawn(200).await;
        let telemetry = Telemetry::builder(config(&endpoint, 10, Duration::from_secs(3600)))
            .identity(StaticIdentity::new("install-1"))
            .build()
            .unwrap();

        assert!(!telemetry.stop_session("unknown"));
        assert_eq!(telemetry.buffer().pending_len(), 0);

        telemetry.start_session("onboarding");
        assert!(telemetry.stop_session("onboarding"));
        assert_eq!(telemetry.flush(), 1);
        assert!(telemetry.wait_idle(Duration::from_secs(5)).await);

        let requests = collector.requests();
        let params = &requests[0].body["events"][0]["params"];
        assert_eq!(params["session_id"], beacon_sdk::objects::session_id_for("onboarding"));
        assert!(params["engagement_time_msec"].as_i64().unwrap() >= 0);
    }
}
