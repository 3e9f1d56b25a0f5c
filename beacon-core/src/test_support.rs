//! A local collector for delivery tests.

use std::sync::atomic::{AtomicU16, Ordering};
use std::sync::{Arc, Mutex};

use axum::Router;
use axum::body::Bytes;
use axum::extract::{RawQuery, State};
use axum::http::StatusCode;
use axum::routing::post;

/// One request as the collector saw it.
#[derive(Debug, Clone)]
pub struct Received {
    pub query: Option<String>,
    pub body: serde_json::Value,
}

impl Received {
    pub fn event_names(&self) -> Vec<String> {
        self.body["events"]
            .as_array()
            .map(|events| {
                events
                    .iter()
                    .filter_map(|e| e["name"].as_str().map(str::to_string))
                    .collect()
            })
            .unwrap_or_default()
    }
}

#[derive(Clone, Default)]
pub struct Collector {
    requests: Arc<Mutex<Vec<Received>>>,
    status: Arc<AtomicU16>,
}

impl Collector {
    /// Serve on an ephemeral port, answering every request with `status`.
    /// Returns the collector and its endpoint URL.
    pub async fn spawn(status: u16) -> (Self, String) {
        let collector = Self::default();
        collector.set_status(status);

        let app = Router::new()
            .route("/mp/collect", post(collect))
            .with_state(collector.clone());
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        (collector, format!("http://{addr}/mp/collect"))
    }

    pub fn set_status(&self, status: u16) {
        self.status.store(status, Ordering::SeqCst);
    }

    pub fn requests(&self) -> Vec<Received> {
        self.requests.lock().unwrap().clone()
    }
}

async fn collect(
    State(collector): State<Collector>,
    RawQuery(query): RawQuery,
    body: Bytes,
) -> StatusCode {
    let body = serde_json::from_slice(&body).unwrap_or(serde_json::Value::Null);
    collector.requests.lock().unwrap().push(Received { query, body });
    StatusCode::from_u16(collector.status.load(Ordering::SeqCst)).unwrap()
}
