use crate::batch_kwargs::BatchKwargs;
use crate::suite::Expectation;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Outcome of evaluating a single expectation against a batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExpectationValidationResult {
    pub success: bool,
    pub expectation: Expectation,
}

/// Aggregate counts over a validation run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ValidationStatistics {
    pub evaluated_expectations: usize,
    pub successful_expectations: usize,
}

/// Metadata block of a validation result.
///
/// All fields are optional at the type level: results can arrive from
/// collaborators in partial shapes, and identifier construction reports
/// exactly which field is missing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ValidationResultMeta {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expectation_suite_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub run_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub batch_kwargs: Option<BatchKwargs>,
}

/// Result of validating (or profiling) one batch against one suite.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationResult {
    pub success: bool,
    #[serde(default)]
    pub results: Vec<ExpectationValidationResult>,
    #[serde(default)]
    pub statistics: ValidationStatistics,
    #[serde(default)]
    pub meta: ValidationResultMeta,
}

/// Uniquely identifies one validation result within a context.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ValidationResultIdentifier {
    pub expectation_suite_name: String,
    pub run_id: String,
    pub batch_identifier: String,
}

impl ValidationResultIdentifier {
    /// Builds an identifier from a validation result's metadata.
    ///
    /// # Errors
    /// Returns an error naming the first metadata field that is missing.
    /// Callers that open documentation use this to detect unusable result
    /// shapes and fall back to the docs index.
    pub fn from_validation_result(
        result: &ValidationResult,
    ) -> Result<Self, IdentifierError> {
        let expectation_suite_name = result
            .meta
            .expectation_suite_name
            .clone()
            .ok_or(IdentifierError::MissingSuiteName)?;
        let run_id = result
            .meta
            .run_id
            .clone()
            .ok_or(IdentifierError::MissingRunId)?;
        let batch_identifier = result
            .meta
            .batch_kwargs
            .as_ref()
            .map(BatchKwargs::fingerprint)
            .ok_or(IdentifierError::MissingBatchKwargs)?;

        Ok(ValidationResultIdentifier {
            expectation_suite_name,
            run_id,
            batch_identifier,
        })
    }
}

impl fmt::Display for ValidationResultIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{}/{}",
            self.expectation_suite_name, self.run_id, self.batch_identifier
        )
    }
}

/// Errors raised when an identifier cannot be built from a result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IdentifierError {
    /// The result meta has no suite name
    MissingSuiteName,
    /// The result meta has no run id
    MissingRunId,
    /// The result meta has no batch kwargs
    MissingBatchKwargs,
}

impl fmt::Display for IdentifierError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IdentifierError::MissingSuiteName => {
                write!(f, "Validation result has no expectation suite name")
            }
            IdentifierError::MissingRunId => write!(f, "Validation result has no run id"),
            IdentifierError::MissingBatchKwargs => {
                write!(f, "Validation result has no batch kwargs")
            }
        }
    }
}

impl std::error::Error for IdentifierError {}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn complete_result() -> ValidationResult {
        let mut kwargs = BatchKwargs::new();
        kwargs.insert("path", json!("/data/orders.csv"));
        ValidationResult {
            success: true,
            results: Vec::new(),
            statistics: ValidationStatistics::default(),
            meta: ValidationResultMeta {
                expectation_suite_name: Some("orders.warning".to_string()),
                run_id: Some("20240115T120000.000000Z".to_string()),
                batch_kwargs: Some(kwargs),
            },
        }
    }

    #[test]
    fn test_identifier_from_complete_result() {
        let result = complete_result();
        let id = ValidationResultIdentifier::from_validation_result(&result).unwrap();
        assert_eq!(id.expectation_suite_name, "orders.warning");
        assert_eq!(id.run_id, "20240115T120000.000000Z");
        assert_eq!(id.batch_identifier.len(), 32);
    }

    #[test]
    fn test_identifier_missing_suite_name() {
        let mut result = complete_result();
        result.meta.expectation_suite_name = None;
        let err = ValidationResultIdentifier::from_validation_result(&result).unwrap_err();
        assert_eq!(err, IdentifierError::MissingSuiteName);
    }

    #[test]
    fn test_identifier_missing_run_id() {
        let mut result = complete_result();
        result.meta.run_id = None;
        let err = ValidationResultIdentifier::from_validation_result(&result).unwrap_err();
        assert_eq!(err, IdentifierError::MissingRunId);
    }

    #[test]
    fn test_identifier_missing_batch_kwargs() {
        let mut result = complete_result();
        result.meta.batch_kwargs = None;
        let err = ValidationResultIdentifier::from_validation_result(&result).unwrap_err();
        assert_eq!(err, IdentifierError::MissingBatchKwargs);
    }

    #[test]
    fn test_identifier_display_is_path_like() {
        let result = complete_result();
        let id = ValidationResultIdentifier::from_validation_result(&result).unwrap();
        let rendered = format!("{}", id);
        assert!(rendered.starts_with("orders.warning/20240115T120000.000000Z/"));
    }

    #[test]
    fn test_result_deserializes_with_partial_shape() {
        // Collaborators may hand back minimal result documents
        let result: ValidationResult = serde_json::from_value(json!({"success": false})).unwrap();
        assert!(!result.success);
        assert!(result.results.is_empty());
        assert_eq!(result.meta, ValidationResultMeta::default());
    }
}
