//! The request envelope sent to the collector.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::Event;

/// Practical ceiling for an encoded payload. The collector rejects larger
/// requests; batch sizing is the caller's job, nothing here enforces it.
pub const MAX_PAYLOAD_BYTES: usize = 130 * 1024;

/// The collector accepts at most this many user properties per request.
pub const MAX_USER_PROPERTIES: usize = 25;

/// A batch of events plus the identity and flags they are reported under.
///
/// Serializes to:
///
/// ```json
/// {
///   "client_id": "1234567890.1700000000",
///   "events": [{"name": "page_view", "params": {"page_title": "Home"}}],
///   "timestamp_micros": "1700000000000000",
///   "user_properties": {"plan": "pro"},
///   "non_personalized_ads": false
/// }
/// ```
///
/// `user_properties` is omitted when not set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Payload {
    client_id: String,
    events: Vec<Event>,
    /// Capture time in microseconds since the Unix epoch. The collector
    /// needs this to place delayed events correctly.
    timestamp_micros: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    user_properties: Option<BTreeMap<String, String>>,
    non_personalized_ads: bool,
}

impl Payload {
    /// Create a payload stamped with the current time.
    pub fn new(client_id: impl Into<String>, events: Vec<Event>) -> Self {
        let micros = time::OffsetDateTime::now_utc().unix_timestamp_nanos() / 1_000;
        Self {
            client_id: client_id.into(),
            events,
            timestamp_micros: micros.to_string(),
            user_properties: None,
            non_personalized_ads: false,
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

    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    pub fn events(&self) -> &[Event] {
        &self.events
    }

    pub fn timestamp_micros(&self) -> &str {
        &self.timestamp_micros
    }

    pub fn user_properties(&self) -> Option<&BTreeMap<String, String>> {
        self.user_properties.as_ref()
    }

    pub fn non_personalized_ads(&self) -> bool {
        self.non_personalized_ads
    }

    /// A payload with no events has nothing worth sending.
    pub fn is_sendable(&self) -> bool {
        !self.events.is_empty()
    }

    /// Serialize to the JSON request body.
    ///
    /// Fails if any parameter cannot be encoded; one bad event fails the
    /// whole payload.
    pub fn to_json_vec(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(self)
    }
}
