//! Declarative JSON Schema catalog for usage-statistics payloads.
//!
//! These are wire contracts, not logic: each event type's payload schema
//! enumerates field names, types, length bounds, and enum constraints.
//! Anonymized fields are fixed-length 32-character hashed tokens.

use once_cell::sync::Lazy;
use serde_json::{json, Value};

/// A 32-character anonymized token.
pub static ANONYMIZED_NAME_SCHEMA: Lazy<Value> = Lazy::new(|| {
    json!({
        "$schema": "http://json-schema.org/schema#",
        "type": "string",
        "minLength": 32,
        "maxLength": 32,
    })
});

/// An anonymized datasource description.
pub static ANONYMIZED_DATASOURCE_SCHEMA: Lazy<Value> = Lazy::new(|| {
    json!({
        "$schema": "http://json-schema.org/schema#",
        "title": "anonymized-datasource",
        "definitions": {
            "anonymized_name": ANONYMIZED_NAME_SCHEMA.clone(),
        },
        "oneOf": [
            {
                "type": "object",
                "properties": {
                    "anonymized_name": {
                        "$ref": "#/definitions/anonymized_name"
                    },
                    "parent_class": {
                        "type": "string",
                        "maxLength": 256
                    },
                    "anonymized_class": {
                        "$ref": "#/definitions/anonymized_name"
                    },
                    "engine": {
                        "type": "string",
                        "maxLength": 256,
                    }
                },
                "additionalProperties": false,
                "required": [
                    "parent_class"
                ]
            }
        ]
    })
});

/// An anonymized store description.
pub static ANONYMIZED_STORE_SCHEMA: Lazy<Value> = Lazy::new(|| {
    json!({
        "$schema": "http://json-schema.org/schema#",
        "title": "anonymized-store",
        "definitions": {
            "anonymized_name": ANONYMIZED_NAME_SCHEMA.clone(),
        },
        "oneOf": [
            {
                "type": "object",
                "properties": {
                    "anonymized_name": {
                        "$ref": "#/definitions/anonymized_name"
                    },
                    "parent_class": {
                        "type": "string",
                        "maxLength": 256
                    },
                    "anonymized_class": {
                        "$ref": "#/definitions/anonymized_name"
                    },
                    "parent_backend": {
                        "type": "string",
                        "maxLength": 256
                    },
                    "anonymized_backend": {
                        "$ref": "#/definitions/anonymized_name"
                    }
                },
                "additionalProperties": false,
                "required": [
                    "parent_class"
                ]
            }
        ]
    })
});

/// Payload of the context-initialization event.
pub static INIT_PAYLOAD_SCHEMA: Lazy<Value> = Lazy::new(|| {
    json!({
        "$schema": "https://json-schema.org/schema#",
        "definitions": {
            "anonymized_datasource": ANONYMIZED_DATASOURCE_SCHEMA.clone(),
            "anonymized_store": ANONYMIZED_STORE_SCHEMA.clone(),
        },
        "type": "object",
        "properties": {
            "version": {
                "enum": ["1.0.0"]
            },
            "platform.system": {
                "type": "string",
                "maxLength": 256
            },
            "platform.release": {
                "type": "string",
                "maxLength": 256
            },
            "version_info": {
                "type": "string",
                "maxLength": 256
            },
            "anonymized_datasources": {
                "type": "array",
                "maxItems": 1000,
                "items": {
                    "$ref": "#/definitions/anonymized_datasource"
                }
            },
            "anonymized_stores": {
                "type": "array",
                "maxItems": 1000,
                "items": {
                    "$ref": "#/definitions/anonymized_store"
                }
            },
            "anonymized_validation_operators": {
                "type": "array",
                "maxItems": 1000,
                "items": {
                    "type": "object"
                },
            },
        },
        "required": [
            "platform.system",
            "platform.release",
            "version_info",
            "anonymized_datasources",
        ],
        "additionalProperties": false
    })
});

/// Payload of the run-validation-operator event.
pub static RUN_VALIDATION_OPERATOR_PAYLOAD_SCHEMA: Lazy<Value> = Lazy::new(|| {
    json!({
        "$schema": "http://json-schema.org/schema#",
        "type": "object",
        "properties": {
            "anonymized_operator_name": {
                "type": "string",
                "maxLength": 256,
            },
            "anonymized_datasource_name": {
                "type": "string",
                "maxLength": 256,
            },
            "anonymized_batch_kwargs": {
                "type": "array",
                "maxItems": 10,
                "items": {
                    "type": "string",
                    "maxLength": 256,
                }
            },
            "n_assets": {
                "type": "number"
            }
        },
        "required": [
            "anonymized_operator_name",
        ],
        "additionalProperties": false
    })
});

/// The versioned envelope every recorded event must conform to.
pub static USAGE_STATISTICS_RECORD_SCHEMA: Lazy<Value> = Lazy::new(|| {
    json!({
        "$schema": "http://json-schema.org/schema#",
        "definitions": {
            "anonymized_name": ANONYMIZED_NAME_SCHEMA.clone(),
            "anonymized_datasource": ANONYMIZED_DATASOURCE_SCHEMA.clone(),
            "anonymized_store": ANONYMIZED_STORE_SCHEMA.clone(),
            "init_payload": INIT_PAYLOAD_SCHEMA.clone(),
            "run_validation_operator_payload": RUN_VALIDATION_OPERATOR_PAYLOAD_SCHEMA.clone(),
        },
        "type": "object",
        "properties": {
            "version": {
                "enum": ["1.0.0"]
            },
            "event_time": {
                "type": "string",
                "format": "date-time"
            },
            "data_context_id": {
                "type": "string",
                "format": "uuid"
            },
            "data_context_instance_id": {
                "type": "string",
                "format": "uuid"
            },
            "library_version": {
                "type": "string",
                "maxLength": 32
            },
            "success": {
                "type": ["boolean", "null"]
            },
        },
        "oneOf": [
            {
                "type": "object",
                "properties": {
                    "event": {
                        "enum": ["data_context.init"],
                    },
                    "event_payload": {
                        "$ref": "#/definitions/init_payload"
                    }
                }
            },
            {
                "type": "object",
                "properties": {
                    "event": {
                        "enum": ["data_context.run_validation_operator"],
                    },
                    "event_payload": {
                        "$ref": "#/definitions/run_validation_operator_payload"
                    },
                }
            }
        ],
        "required": [
            "version",
            "event_time",
            "data_context_id",
            "data_context_instance_id",
            "library_version",
            "event",
            "success",
            "event_payload"
        ]
    })
});

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_catalog_builds() {
        // Force every lazy schema and sanity-check the shapes
        assert_eq!(ANONYMIZED_NAME_SCHEMA["maxLength"], json!(32));
        assert!(ANONYMIZED_DATASOURCE_SCHEMA["oneOf"].is_array());
        assert!(ANONYMIZED_STORE_SCHEMA["oneOf"].is_array());
        assert_eq!(INIT_PAYLOAD_SCHEMA["required"][0], json!("platform.system"));
        assert_eq!(
            RUN_VALIDATION_OPERATOR_PAYLOAD_SCHEMA["required"][0],
            json!("anonymized_operator_name")
        );
        assert_eq!(
            USAGE_STATISTICS_RECORD_SCHEMA["properties"]["version"]["enum"],
            json!(["1.0.0"])
        );
    }

    #[test]
    fn test_record_schema_embeds_payload_definitions() {
        let definitions = USAGE_STATISTICS_RECORD_SCHEMA["definitions"]
            .as_object()
            .unwrap();
        assert!(definitions.contains_key("init_payload"));
        assert!(definitions.contains_key("run_validation_operator_payload"));
        // Embedded schemas keep their own definitions for $ref resolution
        assert!(definitions["init_payload"]["definitions"]
            .as_object()
            .unwrap()
            .contains_key("anonymized_datasource"));
    }
}
