use crate::batch_kwargs::BatchKwargs;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A single assertion about a dataset.
///
/// Expectations are declarative: the type names the assertion (for example
/// `expect_column_to_exist`) and the kwargs carry its parameters. This crate
/// does not execute expectations; it creates, profiles, stores, and
/// documents them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Expectation {
    /// Name of the assertion, e.g. "expect_table_row_count_to_be_between"
    pub expectation_type: String,
    /// Assertion parameters as a free-form JSON object
    pub kwargs: Value,
}

impl Expectation {
    /// Creates a new expectation.
    pub fn new(expectation_type: impl Into<String>, kwargs: Value) -> Self {
        Expectation {
            expectation_type: expectation_type.into(),
            kwargs,
        }
    }
}

/// Provenance note attached to a suite when it is created or edited.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Citation {
    /// Human-readable note about where the suite came from
    pub comment: String,
    /// When the citation was recorded
    pub citation_date: DateTime<Utc>,
    /// Batch kwargs in effect when the suite was created, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub batch_kwargs: Option<BatchKwargs>,
}

/// Suite metadata block. Currently carries citations only.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SuiteMeta {
    #[serde(default)]
    pub citations: Vec<Citation>,
}

/// A named collection of expectations about one data asset.
///
/// Suite names are unique within a context; creating a suite under a name
/// that already exists is an error at the context layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExpectationSuite {
    pub expectation_suite_name: String,
    #[serde(default)]
    pub expectations: Vec<Expectation>,
    #[serde(default)]
    pub meta: SuiteMeta,
}

impl ExpectationSuite {
    /// Creates an empty suite with the given name.
    pub fn new(name: impl Into<String>) -> Self {
        ExpectationSuite {
            expectation_suite_name: name.into(),
            expectations: Vec::new(),
            meta: SuiteMeta::default(),
        }
    }

    /// Appends an expectation to the suite.
    pub fn add_expectation(&mut self, expectation: Expectation) {
        self.expectations.push(expectation);
    }

    /// Records a provenance citation, stamped with the current time.
    ///
    /// # Arguments
    /// * `comment` - Human-readable origin note
    /// * `batch_kwargs` - Batch kwargs in effect when the suite was created
    pub fn add_citation(&mut self, comment: impl Into<String>, batch_kwargs: Option<BatchKwargs>) {
        self.meta.citations.push(Citation {
            comment: comment.into(),
            citation_date: Utc::now(),
            batch_kwargs,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_new_suite_is_empty() {
        let suite = ExpectationSuite::new("orders.warning");
        assert_eq!(suite.expectation_suite_name, "orders.warning");
        assert!(suite.expectations.is_empty());
        assert!(suite.meta.citations.is_empty());
    }

    #[test]
    fn test_add_citation_records_comment_and_batch_kwargs() {
        let mut suite = ExpectationSuite::new("orders.warning");
        let mut kwargs = BatchKwargs::new();
        kwargs.insert("path", json!("/data/orders.csv"));

        suite.add_citation("New suite added via CLI", Some(kwargs.clone()));

        assert_eq!(suite.meta.citations.len(), 1);
        let citation = &suite.meta.citations[0];
        assert_eq!(citation.comment, "New suite added via CLI");
        assert_eq!(citation.batch_kwargs, Some(kwargs));
        // Timestamp must be populated and recent enough to be "now"
        assert!((Utc::now() - citation.citation_date).num_seconds() < 60);
    }

    #[test]
    fn test_suite_deserializes_with_missing_optional_fields() {
        let suite: ExpectationSuite =
            serde_json::from_value(json!({"expectation_suite_name": "bare"})).unwrap();
        assert_eq!(suite.expectation_suite_name, "bare");
        assert!(suite.expectations.is_empty());
        assert!(suite.meta.citations.is_empty());
    }

    #[test]
    fn test_add_expectation_preserves_order() {
        let mut suite = ExpectationSuite::new("orders.warning");
        suite.add_expectation(Expectation::new(
            "expect_table_columns_to_match_ordered_list",
            json!({"column_list": ["id", "amount"]}),
        ));
        suite.add_expectation(Expectation::new(
            "expect_column_to_exist",
            json!({"column": "id"}),
        ));

        assert_eq!(suite.expectations.len(), 2);
        assert_eq!(
            suite.expectations[0].expectation_type,
            "expect_table_columns_to_match_ordered_list"
        );
        assert_eq!(suite.expectations[1].expectation_type, "expect_column_to_exist");
    }
}
