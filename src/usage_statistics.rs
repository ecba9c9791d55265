//! Anonymized usage-statistics surface.
//!
//! Telemetry payloads are validated against a declarative JSON Schema
//! catalog before being recorded; identifying values are reduced to
//! fixed-length salted-hash tokens. No raw identifying data is persisted.

pub mod anonymizers;
pub mod events;
pub mod schemas;
pub mod validator;

pub use anonymizers::{
    Anonymizer, DataDocsSiteAnonymizer, DatasourceAnonymizer, SiteBuilderAnonymizer,
    StoreBackendAnonymizer,
};
pub use events::{
    build_init_payload, EventName, EventSink, InMemorySink, JsonlFileSink,
    UsageStatisticsHandler,
};
pub use validator::{is_valid, validate, SchemaViolation};
