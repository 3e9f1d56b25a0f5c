//! Analytics events and their named constructors.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::Value;
use crate::system::SystemInfo;

/// Event name used by [`Event::page_view`].
pub const PAGE_VIEW_EVENT: &str = "page_view";

/// Event name used by [`Event::exception`].
pub const EXCEPTION_EVENT: &str = "exception";

/// Number of digits in a session id.
const SESSION_ID_DIGITS: usize = 10;

/// A named analytics event with its parameters.
///
/// Names should be 40 characters or fewer, contain only alphanumeric
/// characters and underscores, and start with a letter. The collector
/// enforces this, not this type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    name: String,
    params: BTreeMap<String, Value>,
}

impl Event {
    pub fn new(name: impl Into<String>, params: BTreeMap<String, Value>) -> Self {
        Self {
            name: name.into(),
            params,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn params(&self) -> &BTreeMap<String, Value> {
        &self.params
    }

    pub fn param(&self, key: &str) -> Option<&Value> {
        self.params.get(key)
    }

    /// An event with a single string parameter.
    ///
    /// `Event::custom("view_item_list", "item_list_name", "Home Page")`
    pub fn custom(title: impl Into<String>, key: impl Into<String>, value: impl Into<String>) -> Self {
        let mut params = BTreeMap::new();
        params.insert(key.into(), Value::String(value.into()));
        Self::new(title, params)
    }

    /// A `page_view` event. Page views count as user engagement.
    ///
    /// Screen resolution and language come from `system` unless the
    /// [`PageView`] overrides them.
    pub fn page_view(view: PageView, system: &dyn SystemInfo) -> Self {
        let mut params = BTreeMap::new();
        params.insert(
            "screen_resolution".to_string(),
            Value::String(view.screen_resolution.unwrap_or_else(|| system.screen_resolution())),
        );
        params.insert(
            "language".to_string(),
            Value::String(view.language.unwrap_or_else(|| system.language())),
        );
        params.insert("page_title".to_string(), Value::String(view.page_title));
        insert_present(&mut params, "page_location", view.page_location);
        insert_present(&mut params, "page_referrer", view.page_referrer);
        insert_present(&mut params, "engagement_time_msec", view.engagement_time_msec);
        Self::new(PAGE_VIEW_EVENT, params)
    }

    /// An `exception` event built from the fields that are present.
    pub fn exception(details: ExceptionDetails) -> Self {
        let mut params = BTreeMap::new();
        insert_present(&mut params, "description", details.description);
        insert_present(&mut params, "fatal", details.fatal);
        insert_present(&mut params, "stack_trace", details.stack_trace);
        insert_present(&mut params, "error_code", details.error_code);
        insert_present(&mut params, "user_action", details.user_action);
        insert_present(&mut params, "environment", details.environment);
        insert_present(&mut params, "file_path", details.file_path);
        Self::exception_with_params(params)
    }

    /// An `exception` event with caller-assembled parameters.
    pub fn exception_with_params(params: BTreeMap<String, Value>) -> Self {
        Self::new(EXCEPTION_EVENT, params)
    }

    /// A session event for callers that measure elapsed time themselves.
    ///
    /// `session_id` is usually [`session_id_for`] of the event name.
    pub fn session(
        name: impl Into<String>,
        session_id: impl Into<String>,
        engagement_time_msec: impl Into<Value>,
    ) -> Self {
        let mut params = BTreeMap::new();
        params.insert("session_id".to_string(), Value::String(session_id.into()));
        params.insert("engagement_time_msec".to_string(), engagement_time_msec.into());
        Self::new(name, params)
    }
}

/// Inputs for [`Event::page_view`].
#[derive(Debug, Clone, Default)]
pub struct PageView {
    pub page_title: String,
    /// URL of the page viewed.
    pub page_location: Option<String>,
    /// URL of the page that referred the user.
    pub page_referrer: Option<String>,
    /// The collector only counts engaged users when this is present; `1`
    /// is enough when the real value is unknown.
    pub engagement_time_msec: Option<Value>,
    pub screen_resolution: Option<String>,
    pub language: Option<String>,
}

impl PageView {
    pub fn new(page_title: impl Into<String>) -> Self {
        Self {
            page_title: page_title.into(),
            ..Default::default()
        }
    }

    pub fn location(mut self, location: impl Into<String>) -> Self {
        self.page_location = Some(location.into());
        self
    }

    pub fn referrer(mut self, referrer: impl Into<String>) -> Self {
        self.page_referrer = Some(referrer.into());
        self
    }

    pub fn engagement_time_msec(mut self, msec: impl Into<Value>) -> Self {
        self.engagement_time_msec = Some(msec.into());
        self
    }
}

/// Inputs for [`Event::exception`]. Every field is optional.
#[derive(Debug, Clone, Default)]
pub struct ExceptionDetails {
    /// Human-readable description, e.g. `"IndexOutOfBounds in ListAdapter"`.
    pub description: Option<String>,
    /// Whether the error ended the program.
    pub fatal: Option<bool>,
    pub stack_trace: Option<String>,
    pub error_code: Option<String>,
    pub user_action: Option<String>,
    pub environment: Option<String>,
    pub file_path: Option<String>,
}

/// Deterministic 10-digit session id for an event name.
///
/// Takes the decimal digits of the hex-encoded SHA-256 of `name`, in
/// order, and keeps the first ten (padding with `0` in the unlikely case
/// the digest has fewer).
pub fn session_id_for(name: &str) -> String {
    let digest = ring::digest::digest(&ring::digest::SHA256, name.as_bytes());
    let hex: String = digest
        .as_ref()
        .iter()
        .map(|byte| format!("{byte:02x}"))
        .collect();

    let mut id: String = hex
        .chars()
        .filter(char::is_ascii_digit)
        .take(SESSION_ID_DIGITS)
        .collect();
    while id.len() < SESSION_ID_DIGITS {
        id.push('0');
    }
    id
}

fn insert_present<V: Into<Value>>(
    params: &mut BTreeMap<String, Value>,
    key: &str,
    value: Option<V>,
) {
    if let Some(value) = value {
        params.insert(key.to_string(), value.into());
    }
}
