use crate::batch::{load_batch, Batch};
use crate::batch_kwargs::BatchKwargs;
use crate::context::{asset_label, ContextError, DataContext, ProfileRequest};
use crate::datasource::DatasourceConfig;
use crate::profile::{BasicSuiteProfiler, Profiler, ProfilingResult};
use crate::suite::ExpectationSuite;
use crate::validation_result::{ValidationResult, ValidationResultIdentifier};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::path::{Path, PathBuf};
use std::process::Command;
use uuid::Uuid;

const CONFIG_FILE: &str = "context.json";
const EXPECTATIONS_DIR: &str = "expectations";
const VALIDATIONS_DIR: &str = "validations";
const DATA_DOCS_DIR: &str = "data_docs";
const DOCS_INDEX_FILE: &str = "index.json";

/// Environment variable naming the program used to open data docs.
pub const DOCS_VIEWER_ENV: &str = "EXPECTATIONS_DOCS_VIEWER";

/// Anonymous usage-statistics settings stored in the project config.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UsageStatisticsConfig {
    pub enabled: bool,
    pub data_context_id: Uuid,
}

impl Default for UsageStatisticsConfig {
    fn default() -> Self {
        UsageStatisticsConfig {
            enabled: true,
            data_context_id: Uuid::new_v4(),
        }
    }
}

/// Project configuration persisted as `context.json` at the project root.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ContextConfig {
    #[serde(default)]
    pub datasources: Vec<DatasourceConfig>,
    #[serde(default)]
    pub anonymous_usage_statistics: UsageStatisticsConfig,
}

/// A data context backed by a project directory.
///
/// Layout:
/// ```text
/// <root>/context.json             project configuration
/// <root>/expectations/<name>.json suite store
/// <root>/validations/<suite>/<run_id>/<batch_id>.json
/// <root>/data_docs/index.json     machine-readable site index
/// ```
pub struct FilesystemContext {
    root: PathBuf,
    config: ContextConfig,
    profiler: Box<dyn Profiler>,
}

impl FilesystemContext {
    /// Scaffolds a new project directory and writes its configuration.
    ///
    /// # Errors
    /// Returns a storage error when the directory is already initialized
    /// or cannot be written.
    pub fn init(
        root: impl Into<PathBuf>,
        datasources: Vec<DatasourceConfig>,
    ) -> Result<Self, ContextError> {
        let root = root.into();
        let config_path = root.join(CONFIG_FILE);
        if config_path.exists() {
            return Err(ContextError::Storage(format!(
                "project already initialized at {}",
                root.display()
            )));
        }

        for dir in [EXPECTATIONS_DIR, VALIDATIONS_DIR, DATA_DOCS_DIR] {
            std::fs::create_dir_all(root.join(dir))
                .map_err(|e| ContextError::Storage(e.to_string()))?;
        }

        let config = ContextConfig {
            datasources,
            anonymous_usage_statistics: UsageStatisticsConfig::default(),
        };
        let serialized = serde_json::to_string_pretty(&config)
            .map_err(|e| ContextError::Storage(e.to_string()))?;
        std::fs::write(&config_path, serialized)
            .map_err(|e| ContextError::Storage(e.to_string()))?;

        log::info!("Initialized project at {}", root.display());
        Ok(FilesystemContext {
            root,
            config,
            profiler: Box::new(BasicSuiteProfiler::new()),
        })
    }

    /// Opens an existing project directory.
    ///
    /// # Errors
    /// Returns a storage error when `context.json` is missing or invalid.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self, ContextError> {
        let root = root.into();
        let config_path = root.join(CONFIG_FILE);
        let raw = std::fs::read_to_string(&config_path).map_err(|e| {
            ContextError::Storage(format!("{}: {}", config_path.display(), e))
        })?;
        let config: ContextConfig = serde_json::from_str(&raw).map_err(|e| {
            ContextError::Storage(format!("{}: {}", config_path.display(), e))
        })?;

        Ok(FilesystemContext {
            root,
            config,
            profiler: Box::new(BasicSuiteProfiler::new()),
        })
    }

    /// Replaces the profiler used for `profile_data_asset`.
    pub fn with_profiler(mut self, profiler: Box<dyn Profiler>) -> Self {
        self.profiler = profiler;
        self
    }

    /// Project root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Project configuration.
    pub fn config(&self) -> &ContextConfig {
        &self.config
    }

    fn datasource(&self, name: &str) -> Option<&DatasourceConfig> {
        self.config
            .datasources
            .iter()
            .find(|config| config.name() == name)
    }

    fn suite_path(&self, name: &str) -> PathBuf {
        self.root
            .join(EXPECTATIONS_DIR)
            .join(format!("{}.json", name))
    }

    fn validation_path(&self, identifier: &ValidationResultIdentifier) -> PathBuf {
        self.root
            .join(VALIDATIONS_DIR)
            .join(&identifier.expectation_suite_name)
            .join(&identifier.run_id)
            .join(format!("{}.json", identifier.batch_identifier))
    }

    fn docs_index_path(&self) -> PathBuf {
        self.root.join(DATA_DOCS_DIR).join(DOCS_INDEX_FILE)
    }

    fn check_suite_name(name: &str) -> Result<(), ContextError> {
        if name.is_empty() || name.contains('/') || name.contains('\\') {
            return Err(ContextError::Storage(format!(
                "invalid expectation suite name: `{}`",
                name
            )));
        }
        Ok(())
    }

    fn save_validation_result(
        &self,
        result: &ValidationResult,
    ) -> Result<ValidationResultIdentifier, ContextError> {
        let identifier = ValidationResultIdentifier::from_validation_result(result)
            .map_err(|e| ContextError::Storage(e.to_string()))?;
        let path = self.validation_path(&identifier);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| ContextError::Storage(e.to_string()))?;
        }
        let serialized = serde_json::to_string_pretty(result)
            .map_err(|e| ContextError::Storage(e.to_string()))?;
        std::fs::write(&path, serialized).map_err(|e| ContextError::Storage(e.to_string()))?;
        Ok(identifier)
    }

    /// Identifiers of all stored validation results, sorted by path.
    pub fn list_validation_result_identifiers(
        &self,
    ) -> Result<Vec<ValidationResultIdentifier>, ContextError> {
        let base = self.root.join(VALIDATIONS_DIR);
        let mut identifiers = Vec::new();
        if !base.exists() {
            return Ok(identifiers);
        }

        for suite_entry in read_dir_sorted(&base)? {
            let suite_name = file_name_string(&suite_entry);
            if !suite_entry.is_dir() {
                continue;
            }
            for run_entry in read_dir_sorted(&suite_entry)? {
                let run_id = file_name_string(&run_entry);
                if !run_entry.is_dir() {
                    continue;
                }
                for batch_entry in read_dir_sorted(&run_entry)? {
                    if batch_entry.extension().and_then(|ext| ext.to_str()) == Some("json") {
                        if let Some(stem) =
                            batch_entry.file_stem().and_then(|stem| stem.to_str())
                        {
                            identifiers.push(ValidationResultIdentifier {
                                expectation_suite_name: suite_name.clone(),
                                run_id: run_id.clone(),
                                batch_identifier: stem.to_string(),
                            });
                        }
                    }
                }
            }
        }
        Ok(identifiers)
    }
}

fn read_dir_sorted(dir: &Path) -> Result<Vec<PathBuf>, ContextError> {
    let mut paths: Vec<PathBuf> = std::fs::read_dir(dir)
        .map_err(|e| ContextError::Storage(format!("{}: {}", dir.display(), e)))?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .collect();
    paths.sort();
    Ok(paths)
}

fn file_name_string(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default()
}

impl DataContext for FilesystemContext {
    fn datasource_names(&self) -> Vec<String> {
        self.config
            .datasources
            .iter()
            .map(|config| config.name().to_string())
            .collect()
    }

    fn generator_names(&self, datasource_name: &str) -> Result<Vec<String>, ContextError> {
        let config = self
            .datasource(datasource_name)
            .ok_or_else(|| ContextError::DatasourceNotFound(datasource_name.to_string()))?;
        Ok(config.generator_names())
    }

    fn list_asset_names(
        &self,
        datasource_name: &str,
        generator_name: Option<&str>,
    ) -> Result<Vec<String>, ContextError> {
        let config = self
            .datasource(datasource_name)
            .ok_or_else(|| ContextError::DatasourceNotFound(datasource_name.to_string()))?;
        Ok(config.generator(generator_name)?.list_asset_names()?)
    }

    fn build_batch_kwargs(
        &self,
        datasource_name: &str,
        generator_name: Option<&str>,
        data_asset_name: &str,
    ) -> Result<BatchKwargs, ContextError> {
        let config = self
            .datasource(datasource_name)
            .ok_or_else(|| ContextError::DatasourceNotFound(datasource_name.to_string()))?;
        Ok(config
            .generator(generator_name)?
            .build_batch_kwargs(data_asset_name)?)
    }

    fn list_expectation_suite_names(&self) -> Vec<String> {
        let dir = self.root.join(EXPECTATIONS_DIR);
        let mut names = Vec::new();
        if let Ok(entries) = std::fs::read_dir(&dir) {
            for entry in entries.flatten() {
                let path = entry.path();
                if path.extension().and_then(|ext| ext.to_str()) == Some("json") {
                    if let Some(stem) = path.file_stem().and_then(|stem| stem.to_str()) {
                        names.push(stem.to_string());
                    }
                }
            }
        }
        names.sort();
        names
    }

    fn create_expectation_suite(
        &mut self,
        name: &str,
        overwrite_existing: bool,
    ) -> Result<ExpectationSuite, ContextError> {
        Self::check_suite_name(name)?;
        if !overwrite_existing && self.suite_path(name).exists() {
            return Err(ContextError::SuiteAlreadyExists(name.to_string()));
        }
        Ok(ExpectationSuite::new(name))
    }

    fn save_expectation_suite(&mut self, suite: &ExpectationSuite) -> Result<(), ContextError> {
        Self::check_suite_name(&suite.expectation_suite_name)?;
        let path = self.suite_path(&suite.expectation_suite_name);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| ContextError::Storage(e.to_string()))?;
        }
        let serialized = serde_json::to_string_pretty(suite)
            .map_err(|e| ContextError::Storage(e.to_string()))?;
        std::fs::write(&path, serialized).map_err(|e| ContextError::Storage(e.to_string()))?;
        log::info!(
            "Saved expectation suite {} to {}",
            suite.expectation_suite_name,
            path.display()
        );
        Ok(())
    }

    fn get_expectation_suite(&self, name: &str) -> Result<ExpectationSuite, ContextError> {
        let path = self.suite_path(name);
        if !path.exists() {
            return Err(ContextError::SuiteNotFound(name.to_string()));
        }
        let raw = std::fs::read_to_string(&path)
            .map_err(|e| ContextError::Storage(format!("{}: {}", path.display(), e)))?;
        serde_json::from_str(&raw)
            .map_err(|e| ContextError::Storage(format!("{}: {}", path.display(), e)))
    }

    fn get_batch(
        &self,
        batch_kwargs: &BatchKwargs,
        _expectation_suite_name: &str,
    ) -> Result<Batch, ContextError> {
        let datasource_name = match batch_kwargs.get("datasource").and_then(|v| v.as_str()) {
            Some(name) => name.to_string(),
            // A single configured datasource is unambiguous
            None if self.config.datasources.len() == 1 => {
                self.config.datasources[0].name().to_string()
            }
            None => {
                return Err(ContextError::Profiling(
                    "Batch kwargs do not name a datasource".to_string(),
                ))
            }
        };
        let config = self
            .datasource(&datasource_name)
            .ok_or_else(|| ContextError::DatasourceNotFound(datasource_name.clone()))?;
        Ok(load_batch(config, batch_kwargs)?)
    }

    fn profile_data_asset(
        &mut self,
        request: ProfileRequest,
    ) -> Result<ProfilingResult, ContextError> {
        let config = self
            .datasource(&request.datasource_name)
            .ok_or_else(|| ContextError::DatasourceNotFound(request.datasource_name.clone()))?
            .clone();

        let mut batch_kwargs = if let Some(kwargs) = request.batch_kwargs {
            kwargs
        } else if let Some(asset_name) = &request.data_asset_name {
            let generator = config.generator(request.generator_name.as_deref())?;
            let assets = generator.list_asset_names()?;
            if !assets.iter().any(|asset| asset == asset_name) {
                return Ok(ProfilingResult::assets_not_found(vec![asset_name.clone()]));
            }
            generator.build_batch_kwargs(asset_name)?
        } else {
            return Err(ContextError::Profiling(
                "No data asset or batch kwargs specified for profiling".to_string(),
            ));
        };

        if let Some(additional) = request.additional_batch_kwargs {
            batch_kwargs.merge(additional);
        }

        let batch = load_batch(&config, &batch_kwargs)?;
        let (suite, mut validation_result) = self
            .profiler
            .profile(&batch, &request.expectation_suite_name);
        validation_result.meta.run_id = Some(request.run_id.clone());
        validation_result.meta.batch_kwargs = Some(batch.batch_kwargs.clone());

        self.save_expectation_suite(&suite)?;
        self.save_validation_result(&validation_result)?;

        Ok(ProfilingResult {
            success: true,
            error: None,
            results: vec![(asset_label(&batch.batch_kwargs), validation_result)],
        })
    }

    fn build_data_docs(&mut self) -> Result<(), ContextError> {
        let suites = self.list_expectation_suite_names();
        let validations = self.list_validation_result_identifiers()?;

        let index = json!({
            "generated_at": Utc::now().to_rfc3339(),
            "expectation_suites": suites,
            "validation_results": validations
                .iter()
                .map(|id| json!({
                    "expectation_suite_name": id.expectation_suite_name,
                    "run_id": id.run_id,
                    "batch_identifier": id.batch_identifier,
                }))
                .collect::<Vec<_>>(),
        });

        let path = self.docs_index_path();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| ContextError::Docs(e.to_string()))?;
        }
        let serialized = serde_json::to_string_pretty(&index)
            .map_err(|e| ContextError::Docs(e.to_string()))?;
        std::fs::write(&path, serialized).map_err(|e| ContextError::Docs(e.to_string()))?;

        log::info!(
            "Built data docs index: {} suites, {} validation results",
            index["expectation_suites"].as_array().map(Vec::len).unwrap_or(0),
            index["validation_results"].as_array().map(Vec::len).unwrap_or(0),
        );
        Ok(())
    }

    fn open_data_docs(
        &mut self,
        resource_identifier: Option<&ValidationResultIdentifier>,
    ) -> Result<(), ContextError> {
        let target = match resource_identifier {
            Some(identifier) => {
                let path = self.validation_path(identifier);
                if path.exists() {
                    path
                } else {
                    self.docs_index_path()
                }
            }
            None => self.docs_index_path(),
        };

        if !target.exists() {
            return Err(ContextError::Docs(format!(
                "data docs have not been built: {} does not exist",
                target.display()
            )));
        }

        let viewer =
            std::env::var(DOCS_VIEWER_ENV).unwrap_or_else(|_| "xdg-open".to_string());
        log::info!("Opening {} with {}", target.display(), viewer);
        Command::new(viewer)
            .arg(&target)
            .spawn()
            .map_err(|e| ContextError::Docs(e.to_string()))?;
        Ok(())
    }
}
