use expectations::batch::Batch;
use expectations::batch_kwargs::BatchKwargs;
use expectations::cli::testing::ScriptedPrompt;
use expectations::cli::toolkit::{create_expectation_suite, CreateSuiteOptions};
use expectations::cli::CliError;
use expectations::context::{ContextError, DataContext, InMemoryContext};
use expectations::profile::Profiler;
use expectations::suite::ExpectationSuite;
use expectations::validation_result::ValidationResult;
use serde_json::json;

fn context_with_orders() -> InMemoryContext {
    let mut context = InMemoryContext::new();
    context.add_datasource("files");
    context.add_asset(
        "files",
        "orders",
        Batch {
            columns: vec!["id".to_string(), "amount".to_string()],
            row_count: 10,
            batch_kwargs: BatchKwargs::new(),
        },
    );
    context
}

#[test]
fn profiled_flow_creates_suite_and_builds_docs() {
    let mut context = context_with_orders();
    // Answers: asset selection, then accept the default suite name
    let mut prompt = ScriptedPrompt::new(&["1", ""]);

    let suite_name = create_expectation_suite(
        &mut context,
        &mut prompt,
        CreateSuiteOptions::default(),
    )
    .unwrap();

    assert_eq!(suite_name, "orders.warning");
    let suite = context.suite("orders.warning").expect("suite was saved");
    assert!(!suite.expectations.is_empty());
    assert_eq!(context.docs_build_count(), 1);
    // open_docs was not requested
    assert!(context.opened_docs().is_empty());
    // The profiling confirmation prompt fired exactly once
    assert_eq!(prompt.pause_count(), 1);
}

#[test]
fn profiled_flow_records_run_id_and_batch_kwargs() {
    let mut context = context_with_orders();
    let mut prompt = ScriptedPrompt::new(&["1", ""]);

    create_expectation_suite(&mut context, &mut prompt, CreateSuiteOptions::default()).unwrap();

    let validation = &context.validations()[0];
    let run_id = validation.meta.run_id.as_deref().unwrap();
    // Timestamp-based run id, e.g. 20240115T120000.123456Z
    assert!(run_id.ends_with('Z'));
    assert!(run_id.contains('T'));
    assert!(validation.meta.batch_kwargs.is_some());
}

#[test]
fn open_docs_targets_first_validation_result() {
    let mut context = context_with_orders();
    let mut prompt = ScriptedPrompt::new(&["1", ""]);

    create_expectation_suite(
        &mut context,
        &mut prompt,
        CreateSuiteOptions {
            open_docs: true,
            ..Default::default()
        },
    )
    .unwrap();

    assert_eq!(context.opened_docs().len(), 1);
    let identifier = context.opened_docs()[0].as_ref().expect("targeted open");
    assert_eq!(identifier.expectation_suite_name, "orders.warning");
}

/// Profiler returning results without identifier metadata, to exercise
/// the docs-opening fallback.
struct MetalessProfiler;

impl Profiler for MetalessProfiler {
    fn name(&self) -> &str {
        "MetalessProfiler"
    }

    fn profile(&self, _batch: &Batch, suite_name: &str) -> (ExpectationSuite, ValidationResult) {
        let suite = ExpectationSuite::new(suite_name);
        let result = ValidationResult {
            success: true,
            results: Vec::new(),
            statistics: Default::default(),
            meta: Default::default(),
        };
        (suite, result)
    }
}

#[test]
fn open_docs_falls_back_to_index_on_malformed_results() {
    let mut context = context_with_orders().with_profiler(Box::new(MetalessProfiler));
    let mut prompt = ScriptedPrompt::new(&["1", ""]);

    create_expectation_suite(
        &mut context,
        &mut prompt,
        CreateSuiteOptions {
            open_docs: true,
            ..Default::default()
        },
    )
    .unwrap();

    // Identifier construction failed, so the general docs index opened
    assert_eq!(context.opened_docs(), &[None]);
}

#[test]
fn duplicate_suite_name_fails_without_creating_anything() {
    let mut context = context_with_orders();
    let existing = context
        .create_expectation_suite("orders.warning", false)
        .unwrap();
    context.save_expectation_suite(&existing).unwrap();

    let mut prompt = ScriptedPrompt::new(&[]);
    let err = create_expectation_suite(
        &mut context,
        &mut prompt,
        CreateSuiteOptions {
            expectation_suite_name: Some("orders.warning".to_string()),
            ..Default::default()
        },
    )
    .unwrap_err();

    assert_eq!(err, CliError::SuiteAlreadyExists("orders.warning".to_string()));
    // Nothing else happened: no prompts, no docs build
    assert!(prompt.questions().is_empty());
    assert_eq!(context.docs_build_count(), 0);
    assert_eq!(context.list_expectation_suite_names().len(), 1);
}

#[test]
fn colliding_default_name_is_reprompted() {
    let mut context = context_with_orders();
    let taken = context.create_expectation_suite("taken", false).unwrap();
    context.save_expectation_suite(&taken).unwrap();

    // Asset selection, then a colliding name, then a fresh one
    let mut prompt = ScriptedPrompt::new(&["1", "taken", "fresh"]);
    let suite_name = create_expectation_suite(
        &mut context,
        &mut prompt,
        CreateSuiteOptions {
            empty_suite: true,
            ..Default::default()
        },
    )
    .unwrap();

    assert_eq!(suite_name, "fresh");
    assert!(context.suite("fresh").is_some());
}

#[test]
fn empty_suite_gets_cli_citation_and_skips_profiling() {
    let mut context = context_with_orders();
    let mut prompt = ScriptedPrompt::new(&["1", ""]);

    let suite_name = create_expectation_suite(
        &mut context,
        &mut prompt,
        CreateSuiteOptions {
            empty_suite: true,
            ..Default::default()
        },
    )
    .unwrap();

    assert_eq!(suite_name, "orders.warning");
    let suite = context.suite("orders.warning").unwrap();
    assert!(suite.expectations.is_empty());

    let citation = &suite.meta.citations[0];
    assert_eq!(citation.comment, "New suite added via CLI");
    let kwargs = citation.batch_kwargs.as_ref().unwrap();
    assert_eq!(kwargs.get("data_asset_name"), Some(&json!("orders")));

    // The empty path never profiles and never builds docs
    assert_eq!(prompt.pause_count(), 0);
    assert_eq!(context.docs_build_count(), 0);
}

#[test]
fn no_datasource_resolves_to_user_facing_failure() {
    let mut context = InMemoryContext::new();
    let mut prompt = ScriptedPrompt::new(&[]);

    let err = create_expectation_suite(&mut context, &mut prompt, CreateSuiteOptions::default())
        .unwrap_err();
    assert_eq!(err, CliError::DatasourceNotResolved);
}

#[test]
fn unknown_profiling_error_code_is_classified() {
    let mut context = context_with_orders();
    context.set_profiling_error_code(99);
    let mut prompt = ScriptedPrompt::new(&["1", ""]);

    let err = create_expectation_suite(&mut context, &mut prompt, CreateSuiteOptions::default())
        .unwrap_err();
    assert_eq!(
        err,
        CliError::Context(ContextError::Profiling(
            "Unknown profiling error code: 99".to_string()
        ))
    );
    // Docs are not rebuilt after a failed profiling run
    assert_eq!(context.docs_build_count(), 0);
}

#[test]
fn explicit_selection_skips_interactive_resolution() {
    let mut context = context_with_orders();
    let mut prompt = ScriptedPrompt::new(&[]);

    let mut batch_kwargs = BatchKwargs::new();
    batch_kwargs.insert("datasource", json!("files"));
    batch_kwargs.insert("data_asset_name", json!("orders"));

    let suite_name = create_expectation_suite(
        &mut context,
        &mut prompt,
        CreateSuiteOptions {
            datasource_name: Some("files".to_string()),
            generator_name: Some("default".to_string()),
            data_asset_name: Some("orders".to_string()),
            batch_kwargs: Some(batch_kwargs),
            expectation_suite_name: Some("orders.custom".to_string()),
            ..Default::default()
        },
    )
    .unwrap();

    assert_eq!(suite_name, "orders.custom");
    // Only the profiling confirmation paused; nothing was asked
    assert!(prompt.questions().is_empty());
    assert_eq!(prompt.pause_count(), 1);
}
