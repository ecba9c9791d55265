pub mod batch;
pub mod batch_kwargs;
pub mod cli;
pub mod context;
pub mod datasource;
pub mod filesystem_context;
pub mod profile;
pub mod suite;
pub mod usage_statistics;
pub mod validation_result;

pub use batch::{load_batch, Batch, BatchError};
pub use batch_kwargs::BatchKwargs;
pub use context::{ContextError, DataContext, InMemoryContext, ProfileRequest};
pub use datasource::{BatchKwargsGenerator, DatasourceConfig, DatasourceError};
pub use filesystem_context::{ContextConfig, FilesystemContext, UsageStatisticsConfig};
pub use profile::{
    BasicSuiteProfiler, Profiler, ProfilingError, ProfilingResult,
    PROFILING_ERROR_CODE_SPECIFIED_DATA_ASSETS_NOT_FOUND,
};
pub use suite::{Citation, Expectation, ExpectationSuite, SuiteMeta};
pub use validation_result::{
    ExpectationValidationResult, IdentifierError, ValidationResult, ValidationResultIdentifier,
    ValidationResultMeta, ValidationStatistics,
};
