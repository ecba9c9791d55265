use crate::batch::{Batch, BatchError};
use crate::batch_kwargs::BatchKwargs;
use crate::datasource::DatasourceError;
use crate::profile::{Profiler, ProfilingError, ProfilingResult};
use crate::suite::ExpectationSuite;
use crate::validation_result::{ValidationResult, ValidationResultIdentifier};
use serde_json::json;
use std::collections::BTreeMap;
use std::fmt;

/// Parameters of one profiling invocation.
///
/// Either `data_asset_name` or `batch_kwargs` must be present; the
/// suite-creation flow guarantees this by resolving missing pieces
/// interactively before profiling.
#[derive(Debug, Clone)]
pub struct ProfileRequest {
    pub datasource_name: String,
    pub generator_name: Option<String>,
    pub data_asset_name: Option<String>,
    pub batch_kwargs: Option<BatchKwargs>,
    pub expectation_suite_name: String,
    pub run_id: String,
    pub additional_batch_kwargs: Option<BatchKwargs>,
}

/// The shared collaborator every command works against.
///
/// A context owns datasource configuration, the expectation suite store,
/// profiling delegation, and the data-docs surface. It is passed in by the
/// caller (dependency-injected), never a global.
///
/// Implementations: `FilesystemContext` for real projects,
/// `InMemoryContext` for tests.
pub trait DataContext {
    /// Names of the configured datasources.
    fn datasource_names(&self) -> Vec<String>;

    /// Generator names of one datasource.
    ///
    /// # Errors
    /// Returns `ContextError::DatasourceNotFound` for unknown datasources.
    fn generator_names(&self, datasource_name: &str) -> Result<Vec<String>, ContextError>;

    /// Asset names one generator can materialize.
    fn list_asset_names(
        &self,
        datasource_name: &str,
        generator_name: Option<&str>,
    ) -> Result<Vec<String>, ContextError>;

    /// Builds batch kwargs for a named asset.
    fn build_batch_kwargs(
        &self,
        datasource_name: &str,
        generator_name: Option<&str>,
        data_asset_name: &str,
    ) -> Result<BatchKwargs, ContextError>;

    /// Names of all stored expectation suites, sorted.
    fn list_expectation_suite_names(&self) -> Vec<String>;

    /// Creates a new (empty, unsaved) suite.
    ///
    /// # Errors
    /// Returns `ContextError::SuiteAlreadyExists` when the name is taken
    /// and `overwrite_existing` is false.
    fn create_expectation_suite(
        &mut self,
        name: &str,
        overwrite_existing: bool,
    ) -> Result<ExpectationSuite, ContextError>;

    /// Persists a suite under its own name.
    fn save_expectation_suite(&mut self, suite: &ExpectationSuite) -> Result<(), ContextError>;

    /// Loads a stored suite.
    fn get_expectation_suite(&self, name: &str) -> Result<ExpectationSuite, ContextError>;

    /// Materializes a batch for the given kwargs.
    fn get_batch(
        &self,
        batch_kwargs: &BatchKwargs,
        expectation_suite_name: &str,
    ) -> Result<Batch, ContextError>;

    /// Profiles one data asset into a new suite.
    ///
    /// Asset-resolution failures (the requested asset does not exist) are
    /// reported inside the returned `ProfilingResult`, not as an `Err`:
    /// they carry an error code the caller classifies. `Err` is reserved
    /// for infrastructure failures (storage, unreadable data).
    fn profile_data_asset(
        &mut self,
        request: ProfileRequest,
    ) -> Result<ProfilingResult, ContextError>;

    /// Rebuilds the data-docs site index.
    fn build_data_docs(&mut self) -> Result<(), ContextError>;

    /// Opens the docs viewer, targeting one validation result when given.
    fn open_data_docs(
        &mut self,
        resource_identifier: Option<&ValidationResultIdentifier>,
    ) -> Result<(), ContextError>;
}

/// Errors raised by data contexts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContextError {
    /// A suite with this name already exists
    SuiteAlreadyExists(String),
    /// No stored suite has this name
    SuiteNotFound(String),
    /// No configured datasource has this name
    DatasourceNotFound(String),
    /// Datasource or generator failure
    Datasource(DatasourceError),
    /// Batch loading failure
    Batch(BatchError),
    /// Profiling failed with a classified, human-readable message
    Profiling(String),
    /// Suite or validation store access failed
    Storage(String),
    /// Data-docs building or opening failed
    Docs(String),
}

impl fmt::Display for ContextError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ContextError::SuiteAlreadyExists(name) => {
                write!(f, "An expectation suite named `{}` already exists", name)
            }
            ContextError::SuiteNotFound(name) => {
                write!(f, "No expectation suite named `{}` was found", name)
            }
            ContextError::DatasourceNotFound(name) => {
                write!(f, "Datasource {} could not be found", name)
            }
            ContextError::Datasource(err) => write!(f, "{}", err),
            ContextError::Batch(err) => write!(f, "{}", err),
            ContextError::Profiling(msg) => write!(f, "{}", msg),
            ContextError::Storage(msg) => write!(f, "Store error: {}", msg),
            ContextError::Docs(msg) => write!(f, "Data docs error: {}", msg),
        }
    }
}

impl std::error::Error for ContextError {}

impl From<DatasourceError> for ContextError {
    fn from(err: DatasourceError) -> Self {
        ContextError::Datasource(err)
    }
}

impl From<BatchError> for ContextError {
    fn from(err: BatchError) -> Self {
        ContextError::Batch(err)
    }
}

/// Best-effort asset label for a profiling result pair.
pub(crate) fn asset_label(batch_kwargs: &BatchKwargs) -> String {
    if let Some(name) = batch_kwargs.get("data_asset_name").and_then(|v| v.as_str()) {
        return name.to_string();
    }
    if let Some(table) = batch_kwargs.table() {
        return table.to_string();
    }
    if let Some(path) = batch_kwargs.path() {
        if let Some(stem) = std::path::Path::new(path)
            .file_stem()
            .and_then(|stem| stem.to_str())
        {
            return stem.to_string();
        }
    }
    "unknown".to_string()
}

/// In-memory context for tests.
///
/// Assets and their batches are scripted up front; docs building and
/// opening are recorded instead of performed. Mirrors what a real context
/// does closely enough to exercise the CLI flow end to end.
pub struct InMemoryContext {
    datasources: Vec<String>,
    /// (datasource name, asset name) -> scripted batch
    assets: BTreeMap<(String, String), Batch>,
    suites: BTreeMap<String, ExpectationSuite>,
    validations: Vec<ValidationResult>,
    profiler: Box<dyn Profiler>,
    forced_profiling_error_code: Option<i32>,
    docs_builds: usize,
    opened_docs: Vec<Option<ValidationResultIdentifier>>,
}

impl InMemoryContext {
    /// Creates an empty context with the default structural profiler.
    pub fn new() -> Self {
        InMemoryContext {
            datasources: Vec::new(),
            assets: BTreeMap::new(),
            suites: BTreeMap::new(),
            validations: Vec::new(),
            profiler: Box::new(crate::profile::BasicSuiteProfiler::new()),
            forced_profiling_error_code: None,
            docs_builds: 0,
            opened_docs: Vec::new(),
        }
    }

    /// Replaces the profiler used for `profile_data_asset`.
    pub fn with_profiler(mut self, profiler: Box<dyn Profiler>) -> Self {
        self.profiler = profiler;
        self
    }

    /// Registers a datasource by name.
    pub fn add_datasource(&mut self, name: impl Into<String>) {
        self.datasources.push(name.into());
    }

    /// Scripts an asset and the batch it materializes to.
    ///
    /// When the batch kwargs are empty, datasource and asset-name keys are
    /// filled in so generated kwargs look like a generator produced them.
    pub fn add_asset(
        &mut self,
        datasource_name: impl Into<String>,
        asset_name: impl Into<String>,
        mut batch: Batch,
    ) {
        let datasource_name = datasource_name.into();
        let asset_name = asset_name.into();
        if batch.batch_kwargs.is_empty() {
            batch
                .batch_kwargs
                .insert("datasource", json!(datasource_name));
            batch
                .batch_kwargs
                .insert("data_asset_name", json!(asset_name));
        }
        self.assets.insert((datasource_name, asset_name), batch);
    }

    /// Forces `profile_data_asset` to fail with the given error code.
    pub fn set_profiling_error_code(&mut self, code: i32) {
        self.forced_profiling_error_code = Some(code);
    }

    /// A stored suite, if present.
    pub fn suite(&self, name: &str) -> Option<&ExpectationSuite> {
        self.suites.get(name)
    }

    /// Validation results recorded by profiling runs.
    pub fn validations(&self) -> &[ValidationResult] {
        &self.validations
    }

    /// How many times the docs site was rebuilt.
    pub fn docs_build_count(&self) -> usize {
        self.docs_builds
    }

    /// Recorded docs-open calls (None = docs index).
    pub fn opened_docs(&self) -> &[Option<ValidationResultIdentifier>] {
        &self.opened_docs
    }

    fn asset_batch(&self, datasource_name: &str, asset_name: &str) -> Option<&Batch> {
        self.assets
            .get(&(datasource_name.to_string(), asset_name.to_string()))
    }
}

impl Default for InMemoryContext {
    fn default() -> Self {
        Self::new()
    }
}

impl DataContext for InMemoryContext {
    fn datasource_names(&self) -> Vec<String> {
        self.datasources.clone()
    }

    fn generator_names(&self, datasource_name: &str) -> Result<Vec<String>, ContextError> {
        if !self.datasources.iter().any(|name| name == datasource_name) {
            return Err(ContextError::DatasourceNotFound(datasource_name.to_string()));
        }
        Ok(vec!["default".to_string()])
    }

    fn list_asset_names(
        &self,
        datasource_name: &str,
        _generator_name: Option<&str>,
    ) -> Result<Vec<String>, ContextError> {
        if !self.datasources.iter().any(|name| name == datasource_name) {
            return Err(ContextError::DatasourceNotFound(datasource_name.to_string()));
        }
        Ok(self
            .assets
            .keys()
            .filter(|(datasource, _)| datasource == datasource_name)
            .map(|(_, asset)| asset.clone())
            .collect())
    }

    fn build_batch_kwargs(
        &self,
        datasource_name: &str,
        _generator_name: Option<&str>,
        data_asset_name: &str,
    ) -> Result<BatchKwargs, ContextError> {
        let batch = self
            .asset_batch(datasource_name, data_asset_name)
            .ok_or_else(|| {
                ContextError::Datasource(DatasourceError::AssetNotFound {
                    asset: data_asset_name.to_string(),
                })
            })?;
        Ok(batch.batch_kwargs.clone())
    }

    fn list_expectation_suite_names(&self) -> Vec<String> {
        self.suites.keys().cloned().collect()
    }

    fn create_expectation_suite(
        &mut self,
        name: &str,
        overwrite_existing: bool,
    ) -> Result<ExpectationSuite, ContextError> {
        if !overwrite_existing && self.suites.contains_key(name) {
            return Err(ContextError::SuiteAlreadyExists(name.to_string()));
        }
        Ok(ExpectationSuite::new(name))
    }

    fn save_expectation_suite(&mut self, suite: &ExpectationSuite) -> Result<(), ContextError> {
        self.suites
            .insert(suite.expectation_suite_name.clone(), suite.clone());
        Ok(())
    }

    fn get_expectation_suite(&self, name: &str) -> Result<ExpectationSuite, ContextError> {
        self.suites
            .get(name)
            .cloned()
            .ok_or_else(|| ContextError::SuiteNotFound(name.to_string()))
    }

    fn get_batch(
        &self,
        batch_kwargs: &BatchKwargs,
        _expectation_suite_name: &str,
    ) -> Result<Batch, ContextError> {
        // Scripted lookup: by asset-name key first, then by exact kwargs
        if let Some(name) = batch_kwargs.get("data_asset_name").and_then(|v| v.as_str()) {
            if let Some(batch) = self
                .assets
                .iter()
                .find(|((_, asset), _)| asset == name)
                .map(|(_, batch)| batch)
            {
                return Ok(batch.clone());
            }
        }
        self.assets
            .values()
            .find(|batch| &batch.batch_kwargs == batch_kwargs)
            .cloned()
            .ok_or_else(|| {
                ContextError::Datasource(DatasourceError::AssetNotFound {
                    asset: asset_label(batch_kwargs),
                })
            })
    }

    fn profile_data_asset(
        &mut self,
        request: ProfileRequest,
    ) -> Result<ProfilingResult, ContextError> {
        if !self
            .datasources
            .iter()
            .any(|name| name == &request.datasource_name)
        {
            return Err(ContextError::DatasourceNotFound(request.datasource_name));
        }

        if let Some(code) = self.forced_profiling_error_code {
            return Ok(ProfilingResult {
                success: false,
                error: Some(ProfilingError {
                    code,
                    not_found_data_assets: Vec::new(),
                }),
                results: Vec::new(),
            });
        }

        let mut batch = if let Some(kwargs) = &request.batch_kwargs {
            self.get_batch(kwargs, &request.expectation_suite_name)?
        } else if let Some(asset_name) = &request.data_asset_name {
            match self.asset_batch(&request.datasource_name, asset_name) {
                Some(batch) => batch.clone(),
                None => {
                    return Ok(ProfilingResult::assets_not_found(vec![asset_name.clone()]))
                }
            }
        } else {
            return Err(ContextError::Profiling(
                "No data asset or batch kwargs specified for profiling".to_string(),
            ));
        };

        if let Some(additional) = request.additional_batch_kwargs {
            batch.batch_kwargs.merge(additional);
        }

        let (suite, mut validation_result) = self
            .profiler
            .profile(&batch, &request.expectation_suite_name);
        validation_result.meta.run_id = Some(request.run_id.clone());
        validation_result.meta.batch_kwargs = Some(batch.batch_kwargs.clone());

        self.save_expectation_suite(&suite)?;
        self.validations.push(validation_result.clone());

        Ok(ProfilingResult {
            success: true,
            error: None,
            results: vec![(asset_label(&batch.batch_kwargs), validation_result)],
        })
    }

    fn build_data_docs(&mut self) -> Result<(), ContextError> {
        self.docs_builds += 1;
        Ok(())
    }

    fn open_data_docs(
        &mut self,
        resource_identifier: Option<&ValidationResultIdentifier>,
    ) -> Result<(), ContextError> {
        self.opened_docs.push(resource_identifier.cloned());
        Ok(())
    }
}
