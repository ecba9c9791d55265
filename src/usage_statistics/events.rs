//! Envelope construction and recording for usage-statistics events.

use crate::usage_statistics::anonymizers::DatasourceAnonymizer;
use crate::usage_statistics::schemas::USAGE_STATISTICS_RECORD_SCHEMA;
use crate::usage_statistics::validator;
use chrono::{SecondsFormat, Utc};
use serde_json::{json, Value};
use std::fmt;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::PathBuf;
use tracing::debug;
use uuid::Uuid;

/// Names of the events the envelope schema knows about.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventName {
    DataContextInit,
    RunValidationOperator,
}

impl EventName {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventName::DataContextInit => "data_context.init",
            EventName::RunValidationOperator => "data_context.run_validation_operator",
        }
    }
}

impl fmt::Display for EventName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Where validated events go.
pub trait EventSink {
    /// Records one validated envelope.
    ///
    /// # Errors
    /// Returns an I/O error when the sink cannot persist the event; the
    /// handler logs and drops the event in that case.
    fn record(&mut self, event: &Value) -> std::io::Result<()>;
}

/// Sink collecting events in memory, for tests.
#[derive(Debug, Default)]
pub struct InMemorySink {
    pub events: Vec<Value>,
}

impl InMemorySink {
    pub fn new() -> Self {
        InMemorySink { events: Vec::new() }
    }
}

impl EventSink for InMemorySink {
    fn record(&mut self, event: &Value) -> std::io::Result<()> {
        self.events.push(event.clone());
        Ok(())
    }
}

/// Sink appending one JSON document per line to a file.
#[derive(Debug)]
pub struct JsonlFileSink {
    path: PathBuf,
}

impl JsonlFileSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        JsonlFileSink { path: path.into() }
    }
}

impl EventSink for JsonlFileSink {
    fn record(&mut self, event: &Value) -> std::io::Result<()> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        writeln!(file, "{}", event)
    }
}

/// Builds, validates, and records usage-statistics envelope events.
///
/// Telemetry must never break the host command: invalid envelopes and
/// sink failures are logged at debug level and dropped, never surfaced
/// as errors.
pub struct UsageStatisticsHandler {
    data_context_id: Uuid,
    data_context_instance_id: Uuid,
    library_version: String,
    sink: Box<dyn EventSink>,
}

impl UsageStatisticsHandler {
    /// Creates a handler for one context id. The per-process instance id
    /// is generated fresh.
    pub fn new(data_context_id: Uuid, sink: Box<dyn EventSink>) -> Self {
        UsageStatisticsHandler {
            data_context_id,
            data_context_instance_id: Uuid::new_v4(),
            library_version: env!("CARGO_PKG_VERSION").to_string(),
            sink,
        }
    }

    /// Builds the versioned envelope for a payload, validates it against
    /// the record schema, and records it when valid.
    ///
    /// Returns `true` when the event was recorded.
    pub fn emit_event(
        &mut self,
        event: EventName,
        success: Option<bool>,
        event_payload: Value,
    ) -> bool {
        let envelope = json!({
            "version": "1.0.0",
            "event_time": Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
            "data_context_id": self.data_context_id.to_string(),
            "data_context_instance_id": self.data_context_instance_id.to_string(),
            "library_version": self.library_version,
            "event": event.as_str(),
            "success": success,
            "event_payload": event_payload,
        });

        let violations = validator::validate(&envelope, &USAGE_STATISTICS_RECORD_SCHEMA);
        if !violations.is_empty() {
            debug!(
                event = event.as_str(),
                violations = violations.len(),
                first = %violations[0],
                "Dropping usage-statistics event that failed schema validation"
            );
            return false;
        }

        if let Err(err) = self.sink.record(&envelope) {
            debug!(event = event.as_str(), error = %err, "Failed to record usage-statistics event");
            return false;
        }
        true
    }
}

/// Builds the init-event payload from datasource (name, class name) pairs.
pub fn build_init_payload(
    anonymizer: &DatasourceAnonymizer,
    datasources: &[(String, String)],
) -> Value {
    json!({
        "platform.system": std::env::consts::OS,
        "platform.release": std::env::consts::ARCH,
        "version_info": format!("{} {}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION")),
        "anonymized_datasources": datasources
            .iter()
            .map(|(name, class_name)| {
                anonymizer.anonymize_datasource_info(name, &json!({"class_name": class_name}))
            })
            .collect::<Vec<_>>(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::usage_statistics::schemas::INIT_PAYLOAD_SCHEMA;

    fn minimal_init_payload() -> Value {
        json!({
            "platform.system": "linux",
            "platform.release": "x86_64",
            "version_info": "expectations 0.1.0",
            "anonymized_datasources": [],
        })
    }

    #[test]
    fn test_minimal_init_payload_passes_schema() {
        assert!(validator::is_valid(&minimal_init_payload(), &INIT_PAYLOAD_SCHEMA));
    }

    #[test]
    fn test_init_payload_missing_required_field_fails() {
        let mut payload = minimal_init_payload();
        payload.as_object_mut().unwrap().remove("version_info");
        assert!(!validator::is_valid(&payload, &INIT_PAYLOAD_SCHEMA));
    }

    #[test]
    fn test_envelope_missing_event_time_fails_validation() {
        let envelope = json!({
            "version": "1.0.0",
            "data_context_id": Uuid::new_v4().to_string(),
            "data_context_instance_id": Uuid::new_v4().to_string(),
            "library_version": "0.1.0",
            "event": "data_context.init",
            "success": true,
            "event_payload": minimal_init_payload(),
        });
        let violations = validator::validate(&envelope, &USAGE_STATISTICS_RECORD_SCHEMA);
        assert!(violations
            .iter()
            .any(|violation| violation.message.contains("`event_time`")));
    }

    #[test]
    fn test_handler_records_valid_init_event() {
        let mut handler =
            UsageStatisticsHandler::new(Uuid::new_v4(), Box::new(InMemorySink::new()));
        let recorded =
            handler.emit_event(EventName::DataContextInit, Some(true), minimal_init_payload());
        assert!(recorded);
    }

    #[test]
    fn test_handler_drops_invalid_payload() {
        let mut handler =
            UsageStatisticsHandler::new(Uuid::new_v4(), Box::new(InMemorySink::new()));
        // run_validation_operator payload missing its required field
        let recorded = handler.emit_event(
            EventName::RunValidationOperator,
            Some(false),
            json!({"n_assets": 3}),
        );
        assert!(!recorded);
    }

    #[test]
    fn test_run_validation_operator_event_round_trip() {
        let mut handler =
            UsageStatisticsHandler::new(Uuid::new_v4(), Box::new(InMemorySink::new()));
        let token = "a".repeat(32);
        let recorded = handler.emit_event(
            EventName::RunValidationOperator,
            None,
            json!({
                "anonymized_operator_name": token,
                "n_assets": 1,
            }),
        );
        assert!(recorded);
    }

    #[test]
    fn test_build_init_payload_validates() {
        let anonymizer = DatasourceAnonymizer::new(Some("test-salt".to_string()));
        let payload = build_init_payload(
            &anonymizer,
            &[
                ("files".to_string(), "DirectoryDatasource".to_string()),
                ("warehouse".to_string(), "SqliteDatasource".to_string()),
            ],
        );
        let violations = validator::validate(&payload, &INIT_PAYLOAD_SCHEMA);
        assert!(violations.is_empty(), "violations: {:?}", violations);
    }

    #[test]
    fn test_jsonl_sink_appends_lines() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("events.jsonl");
        let mut sink = JsonlFileSink::new(&path);
        sink.record(&json!({"event": "one"})).unwrap();
        sink.record(&json!({"event": "two"})).unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines.len(), 2);
        let first: Value = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(first["event"], json!("one"));
    }
}
