//! Deliverer processor.
//!
//! The Deliverer is responsible for:
//! - Wrapping a batch of events in a `Payload`
//! - Building the collector request (query parameters, JSON body)
//! - Making exactly one HTTP attempt
//! - Classifying the result by status code
//!
//! Nothing is retried. `DeliverySink` plugs a Deliverer into an
//! `EventBuffer` and runs each batch on its own task.

use std::collections::BTreeMap;
use std::convert::Infallible;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use beacon_sdk::identity::client_id_now;
use beacon_sdk::objects::MAX_PAYLOAD_BYTES;
use beacon_sdk::{Event, Payload};
use kanau::processor::Processor;
use reqwest::header::CONTENT_TYPE;
use thiserror::Error;
use tokio::runtime::Handle;
use tokio::sync::Notify;
use tracing::{debug, info, warn};
use url::Url;

use crate::buffer::BatchSink;

/// Measurement Protocol collection endpoint.
pub const DEFAULT_ENDPOINT: &str = "https://www.google-analytics.com/mp/collect";

/// Default HTTP timeout for one delivery attempt.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Errors building a request. No network call has been made.
#[derive(Debug, Error)]
pub enum BuildError {
    #[error("invalid collector endpoint {endpoint:?}: {source}")]
    InvalidEndpoint {
        endpoint: String,
        #[source]
        source: url::ParseError,
    },

    #[error("unsupported endpoint scheme: {0}")]
    UnsupportedScheme(String),

    /// Payload serialization error
    #[error("payload serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("failed to assemble request: {0}")]
    Request(#[from] reqwest::Error),
}

/// Why a delivery did not succeed.
#[derive(Debug, Error)]
pub enum DeliveryFailure {
    #[error("refusing to deliver an empty batch")]
    EmptyBatch,

    #[error(transparent)]
    Build(#[from] BuildError),

    /// The request never got a response (DNS, connect, timeout, TLS).
    #[error("HTTP request error: {0}")]
    Transport(#[source] reqwest::Error),

    #[error("collector server error (status {0})")]
    ServerError(u16),

    #[error("collector rejected the request (status {0})")]
    Rejected(u16),
}

/// Result of one delivery attempt.
#[derive(Debug)]
pub enum DeliveryOutcome {
    Delivered { status: u16 },
    Failed(DeliveryFailure),
}

impl DeliveryOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, DeliveryOutcome::Delivered { .. })
    }

    pub fn failure(&self) -> Option<&DeliveryFailure> {
        match self {
            DeliveryOutcome::Delivered { .. } => None,
            DeliveryOutcome::Failed(failure) => Some(failure),
        }
    }
}

/// Classify a collector response by status code alone.
///
/// 2xx is success, 5xx is a server error, everything else (1xx, 3xx, 4xx)
/// is a rejection.
pub fn classify_status(status: u16) -> DeliveryOutcome {
    match status {
        200..=299 => DeliveryOutcome::Delivered { status },
        500.. => DeliveryOutcome::Failed(DeliveryFailure::ServerError(status)),
        _ => DeliveryOutcome::Failed(DeliveryFailure::Rejected(status)),
    }
}

/// Where and how to deliver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeliveryConfig {
    pub endpoint: String,
    pub measurement_id: String,
    pub api_secret: Option<String>,
    pub timeout: Duration,
}

impl DeliveryConfig {
    pub fn new(measurement_id: impl Into<String>) -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            measurement_id: measurement_id.into(),
            api_secret: None,
            timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }

    /// The endpoint with the query parameters the collector expects.
    pub fn collect_url(&self) -> Result<Url, BuildError> {
        let mut url = Url::parse(&self.endpoint).map_err(|source| BuildError::InvalidEndpoint {
            endpoint: self.endpoint.clone(),
            source,
        })?;

        match url.scheme() {
            "http" | "https" => {}
            other => return Err(BuildError::UnsupportedScheme(other.to_string())),
        }

        {
            let mut query = url.query_pairs_mut();
            if let Some(secret) = &self.api_secret {
                query.append_pair("api_secret", secret);
            }
            query.append_pair("measurement_id", &self.measurement_id);
        }
        Ok(url)
    }
}

/// Sends batches to the collector.
pub struct Deliverer {
    config: DeliveryConfig,
    client_id_seed: String,
    user_properties: Option<BTreeMap<String, String>>,
    non_personalized_ads: bool,
    http_client: reqwest::Client,
}

impl Deliverer {
    /// Create a new Deliverer.
    ///
    /// # Arguments
    ///
    /// * `config` - Collector endpoint and credentials
    /// * `client_id_seed` - Stable identity the client id is derived from
    pub fn new(config: DeliveryConfig, client_id_seed: impl Into<String>) -> Self {
        let http_client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self {
            config,
            client_id_seed: client_id_seed.into(),
            user_properties: None,
            non_personalized_ads: false,
            http_client,
        }
    }

    pub fn with_user_properties(mut self, properties: BTreeMap<String, String>) -> Self {
        self.user_properties = Some(properties);
        self
    }

    pub fn with_non_personalized_ads(mut self, non_personalized_ads: bool) -> Self {
        self.non_personalized_ads = non_personalized_ads;
        self
    }

    pub fn config(&self) -> &DeliveryConfig {
        &self.config
    }

    /// Client id for a payload created now.
    pub fn client_id(&self) -> String {
        client_id_now(&self.client_id_seed)
    }

    /// Wrap `events` in a payload stamped with the current time.
    pub fn payload(&self, events: Vec<Event>) -> Payload {
        let payload = Payload::new(self.client_id(), events)
            .with_non_personalized_ads(self.non_personalized_ads);
        match &self.user_properties {
            Some(properties) => payload.with_user_properties(properties.clone()),
            None => payload,
        }
    }

    /// Build the POST request for a payload without sending it.
    pub fn build_request(&self, payload: &Payload) -> Result<reqwest::Request, BuildError> {
        let url = self.config.collect_url()?;
        let body = payload.to_json_vec()?;

        if body.len() > MAX_PAYLOAD_BYTES {
            warn!(
                bytes = body.len(),
                limit = MAX_PAYLOAD_BYTES,
                events = payload.events().len(),
                "Payload exceeds the collector size limit, sending anyway"
            );
        }

        let request = self
            .http_client
            .post(url)
            .header(CONTENT_TYPE, "application/json")
            .body(body)
            .build()?;
        Ok(request)
    }

    /// Make exactly one attempt and classify the response.
    pub async fn send(&self, request: reqwest::Request) -> DeliveryOutcome {
        let response = match self.http_client.execute(request).await {
            Ok(response) => response,
            Err(e) => {
                return DeliveryOutcome::Failed(DeliveryFailure::Transport(e));
            }
        };

        let status = response.status().as_u16();
        // Only read for diagnostics; classification never looks at it.
        let body = response.text().await.unwrap_or_default();
        if !body.is_empty() {
            debug!(status, body = %body, "Collector response body");
        }

        classify_status(status)
    }

    /// Deliver a batch as one request.
    #[tracing::instrument(skip_all, fields(events = batch.len()))]
    pub async fn deliver(&self, batch: Vec<Event>) -> DeliveryOutcome {
        if batch.is_empty() {
            return DeliveryOutcome::Failed(DeliveryFailure::EmptyBatch);
        }

        let count = batch.len();
        let payload = self.payload(batch);
        let request = match self.build_request(&payload) {
            Ok(request) => request,
            Err(e) => {
                warn!(error = %e, "Failed to build delivery request");
                return DeliveryOutcome::Failed(e.into());
            }
        };

        let outcome = self.send(request).await;
        match &outcome {
            DeliveryOutcome::Delivered { status } => {
                info!(status, events = count, "Batch delivered");
            }
            DeliveryOutcome::Failed(failure) => {
                warn!(error = %failure, events = count, "Batch delivery failed");
            }
        }
        outcome
    }
}

impl Processor<Vec<Event>> for Deliverer {
    type Output = DeliveryOutcome;
    type Error = Infallible;

    async fn process(&self, batch: Vec<Event>) -> Result<DeliveryOutcome, Infallible> {
        Ok(self.deliver(batch).await)
    }
}

/// Called once per dispatched batch with its outcome.
pub type CompletionCallback = Arc<dyn Fn(&DeliveryOutcome) + Send + Sync>;

/// A [`BatchSink`] that delivers every batch on its own task.
#[derive(Clone)]
pub struct DeliverySink {
    deliverer: Arc<Deliverer>,
    on_complete: Option<CompletionCallback>,
    in_flight: Arc<InFlight>,
    runtime: Handle,
}

#[derive(Default)]
struct InFlight {
    count: AtomicUsize,
    idle: Notify,
}

/// Decrements the in-flight count when the delivery task ends, including
/// when it is cancelled.
struct InFlightGuard(Arc<InFlight>);

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        if self.0.count.fetch_sub(1, Ordering::AcqRel) == 1 {
            self.0.idle.notify_waiters();
        }
    }
}

impl DeliverySink {
    pub fn new(deliverer: Deliverer, runtime: Handle) -> Self {
        Self {
            deliverer: Arc::new(deliverer),
            on_complete: None,
            in_flight: Arc::new(InFlight::default()),
            runtime,
        }
    }

    pub fn on_complete(mut self, callback: impl Fn(&DeliveryOutcome) + Send + Sync + 'static) -> Self {
        self.on_complete = Some(Arc::new(callback));
        self
    }

    pub fn deliverer(&self) -> &Deliverer {
        &self.deliverer
    }

    /// Number of deliveries started but not finished.
    pub fn in_flight(&self) -> usize {
        self.in_flight.count.load(Ordering::Acquire)
    }

    /// Wait until no delivery is in flight, for at most `timeout`.
    ///
    /// Returns `false` if deliveries were still running at the deadline.
    pub async fn wait_idle(&self, timeout: Duration) -> bool {
        let in_flight = self.in_flight.clone();
        let wait = async move {
            loop {
                let notified = in_flight.idle.notified();
                if in_flight.count.load(Ordering::Acquire) == 0 {
                    return;
                }
                notified.await;
            }
        };
        tokio::time::timeout(timeout, wait).await.is_ok()
    }
}

impl BatchSink for DeliverySink {
    fn dispatch(&self, batch: Vec<Event>) {
        self.in_flight.count.fetch_add(1, Ordering::AcqRel);
        let guard = InFlightGuard(self.in_flight.clone());
        let deliverer = self.deliverer.clone();
        let on_complete = self.on_complete.clone();

        self.runtime.spawn(async move {
            let _guard = guard;
            let outcome = deliverer.deliver(batch).await;
            if let Some(callback) = on_complete {
                callback(&outcome);
            }
        });
    }
}
