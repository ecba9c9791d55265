use crate::batch::Batch;
use crate::suite::{Expectation, ExpectationSuite};
use crate::validation_result::{
    ExpectationValidationResult, ValidationResult, ValidationResultMeta, ValidationStatistics,
};
use serde::{Deserialize, Serialize};
use serde_json::json;

/// Error code reported when profiling was asked for assets that do not
/// exist in the datasource.
pub const PROFILING_ERROR_CODE_SPECIFIED_DATA_ASSETS_NOT_FOUND: i32 = 2;

/// Error detail attached to a failed profiling run.
///
/// Codes are an open set: contexts may surface codes this crate does not
/// know, and callers classify them accordingly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfilingError {
    pub code: i32,
    #[serde(default)]
    pub not_found_data_assets: Vec<String>,
}

/// Outcome of a profiling run over one or more assets.
#[derive(Debug, Clone, PartialEq)]
pub struct ProfilingResult {
    pub success: bool,
    pub error: Option<ProfilingError>,
    /// (asset name, validation result) pairs for profiled assets
    pub results: Vec<(String, ValidationResult)>,
}

impl ProfilingResult {
    /// A failure result carrying the assets-not-found code.
    pub fn assets_not_found(assets: Vec<String>) -> Self {
        ProfilingResult {
            success: false,
            error: Some(ProfilingError {
                code: PROFILING_ERROR_CODE_SPECIFIED_DATA_ASSETS_NOT_FOUND,
                not_found_data_assets: assets,
            }),
            results: Vec::new(),
        }
    }
}

/// Inspects a batch and proposes an expectation suite for it.
///
/// The profiler is an injected collaborator of the context: swapping it
/// changes what expectations a "demo" suite starts with without touching
/// the suite-creation flow.
pub trait Profiler {
    /// Profiler name used in logs.
    fn name(&self) -> &str;

    /// Builds a suite and the validation result observed while building it.
    ///
    /// The returned result's meta carries the suite name; the context fills
    /// in the run id and batch kwargs before persisting.
    fn profile(&self, batch: &Batch, suite_name: &str) -> (ExpectationSuite, ValidationResult);
}

/// Default structural profiler.
///
/// Emits shape-level expectations only (column list, row count bounds, one
/// existence expectation per column). Statistical profiling is deliberately
/// out of scope; richer profilers plug in through the `Profiler` trait.
#[derive(Debug, Default)]
pub struct BasicSuiteProfiler;

impl BasicSuiteProfiler {
    pub fn new() -> Self {
        BasicSuiteProfiler
    }
}

impl Profiler for BasicSuiteProfiler {
    fn name(&self) -> &str {
        "BasicSuiteProfiler"
    }

    fn profile(&self, batch: &Batch, suite_name: &str) -> (ExpectationSuite, ValidationResult) {
        let mut suite = ExpectationSuite::new(suite_name);

        suite.add_expectation(Expectation::new(
            "expect_table_columns_to_match_ordered_list",
            json!({"column_list": batch.columns}),
        ));
        suite.add_expectation(Expectation::new(
            "expect_table_row_count_to_be_between",
            json!({"min_value": 0, "max_value": batch.row_count}),
        ));
        for column in &batch.columns {
            suite.add_expectation(Expectation::new(
                "expect_column_to_exist",
                json!({"column": column}),
            ));
        }

        // Expectations were derived from the batch itself, so each one
        // holds against it by construction.
        let results: Vec<ExpectationValidationResult> = suite
            .expectations
            .iter()
            .map(|expectation| ExpectationValidationResult {
                success: true,
                expectation: expectation.clone(),
            })
            .collect();

        let statistics = ValidationStatistics {
            evaluated_expectations: results.len(),
            successful_expectations: results.len(),
        };

        let validation_result = ValidationResult {
            success: true,
            results,
            statistics,
            meta: ValidationResultMeta {
                expectation_suite_name: Some(suite_name.to_string()),
                run_id: None,
                batch_kwargs: None,
            },
        };

        (suite, validation_result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::batch_kwargs::BatchKwargs;

    fn sample_batch() -> Batch {
        Batch {
            columns: vec!["id".to_string(), "amount".to_string()],
            row_count: 42,
            batch_kwargs: BatchKwargs::new(),
        }
    }

    #[test]
    fn test_basic_profiler_emits_structural_expectations() {
        let profiler = BasicSuiteProfiler::new();
        let (suite, _result) = profiler.profile(&sample_batch(), "orders.warning");

        assert_eq!(suite.expectation_suite_name, "orders.warning");
        // Column list + row count + one existence expectation per column
        assert_eq!(suite.expectations.len(), 4);
        assert_eq!(
            suite.expectations[0].expectation_type,
            "expect_table_columns_to_match_ordered_list"
        );
        assert_eq!(
            suite.expectations[1].kwargs,
            json!({"min_value": 0, "max_value": 42})
        );
        assert_eq!(
            suite.expectations[2].kwargs,
            json!({"column": "id"})
        );
    }

    #[test]
    fn test_basic_profiler_validation_result_succeeds() {
        let profiler = BasicSuiteProfiler::new();
        let (_suite, result) = profiler.profile(&sample_batch(), "orders.warning");

        assert!(result.success);
        assert_eq!(result.statistics.evaluated_expectations, 4);
        assert_eq!(result.statistics.successful_expectations, 4);
        assert_eq!(
            result.meta.expectation_suite_name.as_deref(),
            Some("orders.warning")
        );
        // Run id and batch kwargs are filled in by the context
        assert!(result.meta.run_id.is_none());
    }

    #[test]
    fn test_assets_not_found_result_shape() {
        let result = ProfilingResult::assets_not_found(vec!["orders".to_string()]);
        assert!(!result.success);
        let error = result.error.unwrap();
        assert_eq!(error.code, PROFILING_ERROR_CODE_SPECIFIED_DATA_ASSETS_NOT_FOUND);
        assert_eq!(error.not_found_data_assets, vec!["orders".to_string()]);
        assert!(result.results.is_empty());
    }
}
