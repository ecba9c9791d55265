//! Declarative schema checker for the usage-statistics catalog.
//!
//! Covers exactly the subset of JSON Schema the catalog uses: `type`,
//! `enum`, string length bounds, `maxItems`/`items`, object
//! `properties`/`required`/`additionalProperties`, `$ref` into
//! `definitions`, and `oneOf`. `format` annotations are not enforced.
//!
//! `$ref` resolution is scoped: a reference is looked up in the
//! definitions of the nearest enclosing schema that declares it, so
//! embedded sub-schemas that carry their own `definitions` stay
//! self-consistent.

use serde_json::{Map, Value};
use std::fmt;

/// One schema violation: where it happened and what went wrong.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaViolation {
    /// JSON-pointer-style path into the instance ("" is the root)
    pub path: String,
    pub message: String,
}

impl fmt::Display for SchemaViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let path = if self.path.is_empty() { "$" } else { &self.path };
        write!(f, "{}: {}", path, self.message)
    }
}

/// Validates an instance against a schema, collecting all violations.
pub fn validate(instance: &Value, schema: &Value) -> Vec<SchemaViolation> {
    let mut violations = Vec::new();
    let mut scopes: Vec<&Map<String, Value>> = Vec::new();
    check(instance, schema, &mut scopes, "", &mut violations);
    violations
}

/// Convenience wrapper: `true` when the instance has no violations.
pub fn is_valid(instance: &Value, schema: &Value) -> bool {
    validate(instance, schema).is_empty()
}

fn violation(path: &str, message: String) -> SchemaViolation {
    SchemaViolation {
        path: path.to_string(),
        message,
    }
}

fn check<'a>(
    instance: &Value,
    schema: &'a Value,
    scopes: &mut Vec<&'a Map<String, Value>>,
    path: &str,
    out: &mut Vec<SchemaViolation>,
) {
    let Some(schema_obj) = schema.as_object() else {
        return;
    };

    let pushed_scope = match schema_obj.get("definitions").and_then(Value::as_object) {
        Some(definitions) => {
            scopes.push(definitions);
            true
        }
        None => false,
    };

    if let Some(reference) = schema_obj.get("$ref").and_then(Value::as_str) {
        match resolve_ref(reference, scopes) {
            Some(target) => check(instance, target, scopes, path, out),
            None => out.push(violation(path, format!("unresolvable $ref {}", reference))),
        }
        if pushed_scope {
            scopes.pop();
        }
        return;
    }

    if let Some(expected) = schema_obj.get("type") {
        check_type(instance, expected, path, out);
    }

    if let Some(allowed) = schema_obj.get("enum").and_then(Value::as_array) {
        if !allowed.contains(instance) {
            out.push(violation(
                path,
                format!("{} is not one of the allowed values", instance),
            ));
        }
    }

    if let Some(text) = instance.as_str() {
        let length = text.chars().count();
        if let Some(min) = schema_obj.get("minLength").and_then(Value::as_u64) {
            if (length as u64) < min {
                out.push(violation(
                    path,
                    format!("string is shorter than minLength {}", min),
                ));
            }
        }
        if let Some(max) = schema_obj.get("maxLength").and_then(Value::as_u64) {
            if (length as u64) > max {
                out.push(violation(
                    path,
                    format!("string is longer than maxLength {}", max),
                ));
            }
        }
    }

    if let Some(items) = instance.as_array() {
        if let Some(max) = schema_obj.get("maxItems").and_then(Value::as_u64) {
            if (items.len() as u64) > max {
                out.push(violation(
                    path,
                    format!("array has more than maxItems {}", max),
                ));
            }
        }
        if let Some(item_schema) = schema_obj.get("items") {
            for (index, item) in items.iter().enumerate() {
                let item_path = format!("{}/{}", path, index);
                check(item, item_schema, scopes, &item_path, out);
            }
        }
    }

    if let Some(object) = instance.as_object() {
        let properties = schema_obj.get("properties").and_then(Value::as_object);

        if let Some(properties) = properties {
            for (key, property_schema) in properties {
                if let Some(value) = object.get(key) {
                    let property_path = format!("{}/{}", path, key);
                    check(value, property_schema, scopes, &property_path, out);
                }
            }
        }

        if let Some(required) = schema_obj.get("required").and_then(Value::as_array) {
            for key in required.iter().filter_map(Value::as_str) {
                if !object.contains_key(key) {
                    out.push(violation(
                        path,
                        format!("required property `{}` is missing", key),
                    ));
                }
            }
        }

        if schema_obj.get("additionalProperties") == Some(&Value::Bool(false)) {
            for key in object.keys() {
                let declared = properties
                    .map(|properties| properties.contains_key(key))
                    .unwrap_or(false);
                if !declared {
                    out.push(violation(
                        path,
                        format!("additional property `{}` is not allowed", key),
                    ));
                }
            }
        }
    }

    if let Some(alternatives) = schema_obj.get("oneOf").and_then(Value::as_array) {
        let mut matched = 0;
        for alternative in alternatives {
            let mut sub_violations = Vec::new();
            check(instance, alternative, scopes, path, &mut sub_violations);
            if sub_violations.is_empty() {
                matched += 1;
            }
        }
        if matched != 1 {
            out.push(violation(
                path,
                format!(
                    "instance is valid under {} of the oneOf schemas, expected exactly 1",
                    matched
                ),
            ));
        }
    }

    if pushed_scope {
        scopes.pop();
    }
}

fn check_type(instance: &Value, expected: &Value, path: &str, out: &mut Vec<SchemaViolation>) {
    let matches = match expected {
        Value::String(name) => type_matches(instance, name),
        Value::Array(names) => names
            .iter()
            .filter_map(Value::as_str)
            .any(|name| type_matches(instance, name)),
        _ => true,
    };
    if !matches {
        out.push(violation(
            path,
            format!("expected type {}, got {}", expected, type_name(instance)),
        ));
    }
}

fn type_matches(instance: &Value, name: &str) -> bool {
    match name {
        "object" => instance.is_object(),
        "array" => instance.is_array(),
        "string" => instance.is_string(),
        "number" => instance.is_number(),
        "integer" => instance.is_i64() || instance.is_u64(),
        "boolean" => instance.is_boolean(),
        "null" => instance.is_null(),
        _ => false,
    }
}

fn type_name(instance: &Value) -> &'static str {
    match instance {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn resolve_ref<'a>(
    reference: &str,
    scopes: &[&'a Map<String, Value>],
) -> Option<&'a Value> {
    let name = reference.strip_prefix("#/definitions/")?;
    // Innermost definitions win
    scopes
        .iter()
        .rev()
        .find_map(|definitions| definitions.get(name))
}
