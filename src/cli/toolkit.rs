//! The suite-creation flow and its helpers.

use crate::batch::Batch;
use crate::batch_kwargs::BatchKwargs;
use crate::cli::datasource::{get_batch_kwargs, select_datasource};
use crate::cli::util::{cli_message, Prompt};
use crate::cli::CliError;
use crate::context::{ContextError, DataContext, ProfileRequest};
use crate::profile::{ProfilingResult, PROFILING_ERROR_CODE_SPECIFIED_DATA_ASSETS_NOT_FOUND};
use crate::validation_result::ValidationResultIdentifier;
use chrono::Utc;
use std::path::Path;

/// Options of one `create_expectation_suite` invocation.
#[derive(Debug, Default)]
pub struct CreateSuiteOptions {
    pub datasource_name: Option<String>,
    pub generator_name: Option<String>,
    pub data_asset_name: Option<String>,
    pub batch_kwargs: Option<BatchKwargs>,
    pub expectation_suite_name: Option<String>,
    pub additional_batch_kwargs: Option<BatchKwargs>,
    /// Create the suite empty instead of profiling a sample batch
    pub empty_suite: bool,
    /// Show the banner above the interactive flow
    pub show_intro_message: bool,
    /// Open data docs once profiling results are in
    pub open_docs: bool,
}

/// Creates a new expectation suite, empty or seeded by the profiler.
///
/// Resolves the datasource (interactively when ambiguous), refuses names
/// that already exist, resolves missing generator/asset/batch-kwargs
/// pieces interactively, derives and offers a default suite name, then
/// either persists an empty suite with a provenance citation or profiles
/// a sample batch into a starter suite, rebuilds data docs, and
/// optionally opens the results.
///
/// Returns the name of the created suite.
///
/// # Errors
/// User-recoverable conditions (no datasource, name collision) and
/// context failures come back as `CliError`; the binary maps them to a
/// message and a non-zero exit status.
pub fn create_expectation_suite(
    context: &mut dyn DataContext,
    prompt: &mut dyn Prompt,
    options: CreateSuiteOptions,
) -> Result<String, CliError> {
    if options.show_intro_message && !options.empty_suite {
        cli_message("\n<cyan>========== Create sample Expectations ==========</cyan>\n");
    }

    let datasource_name = select_datasource(context, prompt, options.datasource_name.as_deref())
        .ok_or(CliError::DatasourceNotResolved)?;

    if let Some(name) = &options.expectation_suite_name {
        if context
            .list_expectation_suite_names()
            .iter()
            .any(|existing| existing == name)
        {
            tell_user_suite_exists(name);
            return Err(CliError::SuiteAlreadyExists(name.clone()));
        }
    }

    let mut generator_name = options.generator_name;
    let mut data_asset_name = options.data_asset_name;
    let mut batch_kwargs = options.batch_kwargs;
    let mut additional_batch_kwargs = options.additional_batch_kwargs;

    if generator_name.is_none() || data_asset_name.is_none() || batch_kwargs.is_none() {
        let (resolved_generator, resolved_asset, resolved_kwargs) = get_batch_kwargs(
            context,
            prompt,
            &datasource_name,
            generator_name.as_deref(),
            data_asset_name.as_deref(),
            // Consumed here; the profiler must not apply them twice
            additional_batch_kwargs.take(),
        )?;
        generator_name = Some(resolved_generator);
        data_asset_name = Some(resolved_asset);
        batch_kwargs = Some(resolved_kwargs);
    }
    let batch_kwargs = batch_kwargs.unwrap_or_default();

    let expectation_suite_name = match options.expectation_suite_name {
        Some(name) => name,
        None => {
            let default = default_suite_name(&batch_kwargs, data_asset_name.as_deref());
            loop {
                let name = prompt.ask("\nName the new expectation suite", Some(&default));
                if context
                    .list_expectation_suite_names()
                    .iter()
                    .any(|existing| existing == &name)
                {
                    tell_user_suite_exists(&name);
                } else {
                    break name;
                }
            }
        }
    };

    if options.empty_suite {
        create_empty_suite(context, &expectation_suite_name, &batch_kwargs)?;
        return Ok(expectation_suite_name);
    }

    let profiling_results = profile_to_create_a_suite(
        context,
        prompt,
        &datasource_name,
        generator_name.as_deref(),
        data_asset_name.as_deref(),
        batch_kwargs,
        &expectation_suite_name,
        additional_batch_kwargs,
    )?;

    context.build_data_docs()?;
    if options.open_docs {
        attempt_to_open_validation_results_in_data_docs(context, &profiling_results)?;
    }

    Ok(expectation_suite_name)
}

#[allow(clippy::too_many_arguments)]
fn profile_to_create_a_suite(
    context: &mut dyn DataContext,
    prompt: &mut dyn Prompt,
    datasource_name: &str,
    generator_name: Option<&str>,
    data_asset_name: Option<&str>,
    batch_kwargs: BatchKwargs,
    expectation_suite_name: &str,
    additional_batch_kwargs: Option<BatchKwargs>,
) -> Result<ProfilingResult, CliError> {
    prompt.pause(
        "\nA couple of columns of the selected data will be inspected to generate example\n\
         expectations, demonstrating some of the assertions you can make about your data.\n\n\
         Press Enter to continue\n",
    );
    cli_message("\nGenerating example Expectation Suite...");

    let run_id = Utc::now().format("%Y%m%dT%H%M%S%.6fZ").to_string();
    let profiling_results = context.profile_data_asset(ProfileRequest {
        datasource_name: datasource_name.to_string(),
        generator_name: generator_name.map(String::from),
        data_asset_name: data_asset_name.map(String::from),
        batch_kwargs: Some(batch_kwargs),
        expectation_suite_name: expectation_suite_name.to_string(),
        run_id,
        additional_batch_kwargs,
    })?;

    if !profiling_results.success {
        return Err(classify_profiling_error(&profiling_results));
    }
    Ok(profiling_results)
}

/// Maps a failed profiling result to a context-level error.
///
/// Two codes are known: specified assets were not found (the message
/// lists them), and everything else, surfaced as an unknown code.
fn classify_profiling_error(profiling_results: &ProfilingResult) -> CliError {
    match &profiling_results.error {
        Some(error) if error.code == PROFILING_ERROR_CODE_SPECIFIED_DATA_ASSETS_NOT_FOUND => {
            CliError::Context(ContextError::Profiling(format!(
                "Some of the data assets you specified were not found: {}",
                error.not_found_data_assets.join(",")
            )))
        }
        Some(error) => CliError::Context(ContextError::Profiling(format!(
            "Unknown profiling error code: {}",
            error.code
        ))),
        None => CliError::Context(ContextError::Profiling(
            "Profiling failed without an error code".to_string(),
        )),
    }
}

/// Opens the first profiled validation result in data docs, degrading to
/// the docs index when the result shape is unusable.
fn attempt_to_open_validation_results_in_data_docs(
    context: &mut dyn DataContext,
    profiling_results: &ProfilingResult,
) -> Result<(), CliError> {
    let identifier = profiling_results
        .results
        .first()
        .and_then(|(_, validation_result)| {
            ValidationResultIdentifier::from_validation_result(validation_result).ok()
        });

    match identifier {
        Some(identifier) => context.open_data_docs(Some(&identifier))?,
        None => context.open_data_docs(None)?,
    }
    Ok(())
}

/// Derives the default suite name offered during interactive naming.
fn default_suite_name(batch_kwargs: &BatchKwargs, data_asset_name: Option<&str>) -> String {
    if let Some(asset) = data_asset_name {
        if !asset.is_empty() {
            return format!("{}.warning", asset);
        }
    }
    if batch_kwargs.contains_key("query") {
        return "query.warning".to_string();
    }
    if let Some(path) = batch_kwargs.path() {
        if let Some(stem) = Path::new(path).file_stem().and_then(|stem| stem.to_str()) {
            return format!("{}.warning", stem);
        }
    }
    "warning".to_string()
}

fn tell_user_suite_exists(suite_name: &str) {
    cli_message(&format!(
        "<red>An expectation suite named `{}` already exists.</red>\n  - Please choose a different suite name.",
        suite_name
    ));
}

/// Creates and persists an empty suite carrying a CLI-origin citation.
pub fn create_empty_suite(
    context: &mut dyn DataContext,
    expectation_suite_name: &str,
    batch_kwargs: &BatchKwargs,
) -> Result<(), CliError> {
    let mut suite = context.create_expectation_suite(expectation_suite_name, false)?;
    suite.add_citation("New suite added via CLI", Some(batch_kwargs.clone()));
    context.save_expectation_suite(&suite)?;
    Ok(())
}

/// Materializes the batch a suite should be edited or validated against.
///
/// # Errors
/// Returns an error when the batch cannot be loaded from the given
/// kwargs.
pub fn load_batch(
    context: &dyn DataContext,
    expectation_suite_name: &str,
    batch_kwargs: &BatchKwargs,
) -> Result<Batch, CliError> {
    Ok(context.get_batch(batch_kwargs, expectation_suite_name)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn kwargs_with(key: &str, value: serde_json::Value) -> BatchKwargs {
        let mut kwargs = BatchKwargs::new();
        kwargs.insert(key, value);
        kwargs
    }

    #[test]
    fn test_default_name_from_asset() {
        let kwargs = kwargs_with("query", json!("SELECT 1"));
        // Asset name wins over everything else in the kwargs
        assert_eq!(
            default_suite_name(&kwargs, Some("orders")),
            "orders.warning"
        );
    }

    #[test]
    fn test_default_name_from_query() {
        let kwargs = kwargs_with("query", json!("SELECT 1"));
        assert_eq!(default_suite_name(&kwargs, None), "query.warning");
    }

    #[test]
    fn test_default_name_from_path_strips_extension() {
        let kwargs = kwargs_with("path", json!("/a/b/report.v2.csv"));
        assert_eq!(default_suite_name(&kwargs, None), "report.v2.warning");
    }

    #[test]
    fn test_default_name_fallback() {
        assert_eq!(default_suite_name(&BatchKwargs::new(), None), "warning");
    }

    #[test]
    fn test_default_name_empty_asset_falls_through() {
        let kwargs = kwargs_with("path", json!("/data/orders.csv"));
        assert_eq!(default_suite_name(&kwargs, Some("")), "orders.warning");
    }

    #[test]
    fn test_classify_assets_not_found() {
        let results = ProfilingResult::assets_not_found(vec![
            "orders".to_string(),
            "customers".to_string(),
        ]);
        let err = classify_profiling_error(&results);
        assert_eq!(
            err,
            CliError::Context(ContextError::Profiling(
                "Some of the data assets you specified were not found: orders,customers"
                    .to_string()
            ))
        );
    }

    #[test]
    fn test_classify_unknown_code() {
        let results = ProfilingResult {
            success: false,
            error: Some(crate::profile::ProfilingError {
                code: 99,
                not_found_data_assets: Vec::new(),
            }),
            results: Vec::new(),
        };
        let err = classify_profiling_error(&results);
        assert_eq!(
            err,
            CliError::Context(ContextError::Profiling(
                "Unknown profiling error code: 99".to_string()
            ))
        );
    }
}
