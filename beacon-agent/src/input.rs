//! Newline-delimited JSON input.
//!
//! Each line is one command. A line without a `kind` is a plain event:
//!
//! ```text
//! {"name": "signup", "params": {"plan": "pro", "seats": 3}}
//! {"kind": "page_view", "title": "Home", "location": "app://home"}
//! {"kind": "exception", "description": "disk full", "fatal": false}
//! {"kind": "session_start", "name": "onboarding"}
//! {"kind": "session_stop", "name": "onboarding"}
//! {"kind": "flush"}
//! ```

use beacon_core::Telemetry;
use beacon_sdk::{EncodingError, Event, ExceptionDetails, PageView, SystemInfo, Value};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::future::Future;
use thiserror::Error;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};

#[derive(Debug, Error)]
pub enum InputError {
    #[error("malformed line: {0}")]
    Json(#[from] serde_json::Error),

    #[error("unsupported value for parameter {key:?}: {source}")]
    Param {
        key: String,
        #[source]
        source: EncodingError,
    },
}

#[derive(Debug, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Command {
    Event {
        name: String,
        #[serde(default)]
        params: serde_json::Map<String, serde_json::Value>,
    },
    PageView {
        title: String,
        location: Option<String>,
        referrer: Option<String>,
        engagement_time_msec: Option<i64>,
    },
    Exception {
        description: Option<String>,
        fatal: Option<bool>,
        stack_trace: Option<String>,
        error_code: Option<String>,
        user_action: Option<String>,
        environment: Option<String>,
        file_path: Option<String>,
    },
    SessionStart {
        name: String,
    },
    SessionStop {
        name: String,
    },
    Flush,
}

/// Counters for what the input loop saw.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InputStats {
    pub accepted: usize,
    pub rejected: usize,
}

pub fn parse_line(line: &str) -> Result<Command, InputError> {
    let mut raw: serde_json::Value = serde_json::from_str(line)?;
    if let Some(object) = raw.as_object_mut() {
        object
            .entry("kind")
            .or_insert_with(|| serde_json::Value::String("event".to_string()));
    }
    Ok(serde_json::from_value(raw)?)
}

fn convert_params(
    raw: serde_json::Map<String, serde_json::Value>,
) -> Result<BTreeMap<String, Value>, InputError> {
    raw.into_iter()
        .map(|(key, value)| match Value::try_from(value) {
            Ok(value) => Ok((key, value)),
            Err(source) => Err(InputError::Param { key, source }),
        })
        .collect()
}

/// Carry out one command against `telemetry`.
pub fn apply(
    command: Command,
    telemetry: &Telemetry,
    system: &dyn SystemInfo,
) -> Result<(), InputError> {
    match command {
        Command::Event { name, params } => {
            let params = convert_params(params)?;
            telemetry.send(Event::new(name, params));
        }
        Command::PageView {
            title,
            location,
            referrer,
            engagement_time_msec,
        } => {
            let view = PageView {
                page_location: location,
                page_referrer: referrer,
                engagement_time_msec: engagement_time_msec.map(Value::from),
                ..PageView::new(title)
            };
            telemetry.send(Event::page_view(view, system));
        }
        Command::Exception {
            description,
            fatal,
            stack_trace,
            error_code,
            user_action,
            environment,
            file_path,
        } => {
            telemetry.send(Event::exception(ExceptionDetails {
                description,
                fatal,
                stack_trace,
                error_code,
                user_action,
                environment,
                file_path,
            }));
        }
        Command::SessionStart { name } => telemetry.start_session(&name),
        Command::SessionStop { name } => {
            if !telemetry.stop_session(&name) {
                tracing::debug!(session = %name, "Stop for a session that was not running");
            }
        }
        Command::Flush => {
            telemetry.flush();
        }
    }
    Ok(())
}

/// Read commands until EOF or `shutdown` completes.
///
/// Bad lines are logged and skipped.
pub async fn run<R>(
    reader: R,
    telemetry: &Telemetry,
    system: &dyn SystemInfo,
    shutdown: impl Future<Output = ()>,
) -> std::io::Result<InputStats>
where
    R: AsyncBufRead + Unpin,
{
    let mut lines = reader.lines();
    let mut stats = InputStats::default();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            biased;

            _ = &mut shutdown => break,

            line = lines.next_line() => {
                let Some(line) = line? else {
                    tracing::info!("Input closed");
                    break;
                };
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }

                match parse_line(line).and_then(|command| apply(command, telemetry, system)) {
                    Ok(()) => stats.accepted += 1,
                    Err(e) => {
                        stats.rejected += 1;
                        tracing::error!(error = %e, "Skipping input line");
                    }
                }
            }
        }
    }

    Ok(stats)
}

#[cfg(test)]
mod tests {
    use super::*;
    use beacon_core::{StaticIdentity, TelemetryConfig};
    use beacon_sdk::StaticSystemInfo;

    fn telemetry() -> Telemetry {
        let config = TelemetryConfig {
            // Never reached: batches stay below the size and age thresholds.
            endpoint: "http://127.0.0.1:9/mp/collect".to_string(),
            batch_size: 100,
            ..TelemetryConfig::new("G-TEST")
        };
        Telemetry::builder(config)
            .identity(StaticIdentity::new("test"))
            .build()
            .unwrap()
    }

    #[test]
    fn test_line_without_kind_is_an_event() {
        let command = parse_line(r#"{"name": "signup", "params": {"plan": "pro"}}"#).unwrap();
        match command {
            Command::Event { name, params } => {
                assert_eq!(name, "signup");
                assert_eq!(params["plan"], "pro");
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_tagged_commands() {
        assert!(matches!(
            parse_line(r#"{"kind": "flush"}"#).unwrap(),
            Command::Flush
        ));
        assert!(matches!(
            parse_line(r#"{"kind": "session_start", "name": "a"}"#).unwrap(),
            Command::SessionStart { name } if name == "a"
        ));
        assert!(matches!(
            parse_line(r#"{"kind": "page_view", "title": "Home"}"#).unwrap(),
            Command::PageView { title, location: None, .. } if title == "Home"
        ));
    }

    #[test]
    fn test_malformed_lines() {
        assert!(matches!(parse_line("not json"), Err(InputError::Json(_))));
        assert!(matches!(
            parse_line(r#"{"kind": "teleport"}"#),
            Err(InputError::Json(_))
        ));
        assert!(matches!(parse_line(r#"{"params": {}}"#), Err(InputError::Json(_))));
    }

    #[test]
    fn test_unsupported_param_is_rejected() {
        let Command::Event { params, .. } =
            parse_line(r#"{"name": "x", "params": {"ok": 1, "bad": null}}"#).unwrap()
        else {
            panic!("expected an event");
        };
        match convert_params(params) {
            Err(InputError::Param { key, .. }) => assert_eq!(key, "bad"),
            other => panic!("unexpected result {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_run_counts_and_skips_bad_lines() {
        let telemetry = telemetry();
        let system = StaticSystemInfo::default();
        let input = concat!(
            "{\"name\": \"one\", \"params\": {\"n\": 1, \"ratio\": 0.5, \"tags\": [\"a\"]}}\n",
            "\n",
            "garbage\n",
            "{\"kind\": \"page_view\", \"title\": \"Home\", \"engagement_time_msec\": 1}\n",
            "{\"name\": \"nested\", \"params\": {\"m\": {\"k\": 1}}}\n",
            "{\"kind\": \"session_start\", \"name\": \"s\"}\n",
            "{\"kind\": \"session_stop\", \"name\": \"s\"}\n",
        );

        let stats = run(input.as_bytes(), &telemetry, &system, std::future::pending())
            .await
            .unwrap();

        assert_eq!(stats, InputStats { accepted: 4, rejected: 2 });
        // one, page_view, session event
        assert_eq!(telemetry.buffer().pending_len(), 3);
    }

    #[tokio::test]
    async fn test_run_stops_on_shutdown() {
        let telemetry = telemetry();
        let system = StaticSystemInfo::default();
        let input = "{\"name\": \"one\"}\n";

        let stats = run(input.as_bytes(), &telemetry, &system, std::future::ready(()))
            .await
            .unwrap();
        assert_eq!(stats, InputStats::default());
        assert_eq!(telemetry.buffer().pending_len(), 0);
    }
}
