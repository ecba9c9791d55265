use crate::context::{ContextError, DataContext};
use clap::{Parser, Subcommand};
use std::fmt;
use std::path::PathBuf;

pub mod datasource;
pub mod testing;
pub mod toolkit;
pub mod util;

use toolkit::CreateSuiteOptions;
use util::{cli_message, Prompt};

/// Command-line interface for the expectations toolkit.
#[derive(Debug, Parser)]
#[command(name = "expectations", about = "Data validation suite toolkit")]
pub struct Cli {
    /// Project directory containing context.json
    #[arg(long, default_value = ".", global = true)]
    pub project_dir: PathBuf,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Initialize a new project directory
    Init {
        /// Add a directory datasource reading CSV files from this path
        #[arg(long)]
        data_dir: Option<PathBuf>,

        /// Add a SQLite datasource reading tables from this database file
        #[arg(long)]
        db_path: Option<PathBuf>,
    },
    /// Work with expectation suites
    Suite {
        #[command(subcommand)]
        command: SuiteCommands,
    },
    /// Work with data docs
    Docs {
        #[command(subcommand)]
        command: DocsCommands,
    },
}

#[derive(Debug, Subcommand)]
pub enum SuiteCommands {
    /// Create a new expectation suite, empty or seeded by the profiler
    New {
        /// Datasource to read the sample batch from
        #[arg(long)]
        datasource: Option<String>,

        /// Batch-kwargs generator to resolve assets with
        #[arg(long)]
        generator: Option<String>,

        /// Data asset to profile
        #[arg(long)]
        asset: Option<String>,

        /// Batch kwargs as inline JSON, e.g. '{"path": "data/orders.csv"}'
        #[arg(long)]
        batch_kwargs: Option<String>,

        /// Name for the new suite (prompted when omitted)
        #[arg(long)]
        suite: Option<String>,

        /// Create an empty suite without profiling
        #[arg(long)]
        empty: bool,

        /// Open data docs once the suite is created
        #[arg(long)]
        open_docs: bool,
    },
    /// List expectation suites in the project
    List,
}

#[derive(Debug, Subcommand)]
pub enum DocsCommands {
    /// Rebuild the data docs site index
    Build {
        /// Open the docs index after building
        #[arg(long)]
        open: bool,
    },
}

/// Errors surfaced by CLI commands.
///
/// The binary prints the message and exits with a non-zero status; none of
/// these abort the process from library code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CliError {
    /// No datasource could be selected (none configured, or the requested
    /// one does not exist). A detailed message was already shown.
    DatasourceNotResolved,
    /// The requested suite name is already taken
    SuiteAlreadyExists(String),
    /// The selected datasource has no assets to offer
    NoDataAssets { datasource: String },
    /// The --batch-kwargs argument was not a JSON object
    InvalidBatchKwargs(String),
    /// A context operation failed
    Context(ContextError),
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CliError::DatasourceNotResolved => write!(f, "No datasource could be resolved"),
            CliError::SuiteAlreadyExists(name) => {
                write!(f, "An expectation suite named `{}` already exists", name)
            }
            CliError::NoDataAssets { datasource } => {
                write!(f, "Datasource {} has no data assets to choose from", datasource)
            }
            CliError::InvalidBatchKwargs(msg) => {
                write!(f, "Invalid --batch-kwargs value: {}", msg)
            }
            CliError::Context(err) => write!(f, "{}", err),
        }
    }
}

impl std::error::Error for CliError {}

impl From<ContextError> for CliError {
    fn from(err: ContextError) -> Self {
        CliError::Context(err)
    }
}

/// Runs one parsed subcommand against a context.
///
/// # Errors
/// Returns a `CliError` for user-recoverable and context failures; the
/// caller decides how to report it and which exit status to use.
pub fn run_command(
    command: Commands,
    context: &mut dyn DataContext,
    prompt: &mut dyn Prompt,
) -> Result<(), CliError> {
    match command {
        Commands::Init { .. } => {
            // Init creates the context and is handled by the binary before
            // a context exists.
            Ok(())
        }
        Commands::Suite { command } => run_suite_command(command, context, prompt),
        Commands::Docs { command } => run_docs_command(command, context),
    }
}

fn run_suite_command(
    command: SuiteCommands,
    context: &mut dyn DataContext,
    prompt: &mut dyn Prompt,
) -> Result<(), CliError> {
    match command {
        SuiteCommands::New {
            datasource,
            generator,
            asset,
            batch_kwargs,
            suite,
            empty,
            open_docs,
        } => {
            let batch_kwargs = match batch_kwargs {
                Some(raw) => Some(
                    serde_json::from_str(&raw)
                        .map_err(|e| CliError::InvalidBatchKwargs(e.to_string()))?,
                ),
                None => None,
            };

            let options = CreateSuiteOptions {
                datasource_name: datasource,
                generator_name: generator,
                data_asset_name: asset,
                batch_kwargs,
                expectation_suite_name: suite,
                additional_batch_kwargs: None,
                empty_suite: empty,
                show_intro_message: true,
                open_docs,
            };

            let suite_name = toolkit::create_expectation_suite(context, prompt, options)?;
            cli_message(&format!(
                "<green>A new Expectation suite '{}' was added to your project</green>",
                suite_name
            ));
            Ok(())
        }
        SuiteCommands::List => {
            let names = context.list_expectation_suite_names();
            if names.is_empty() {
                cli_message("No expectation suites found");
            } else {
                cli_message(&format!("{} expectation suite(s) found:", names.len()));
                for name in names {
                    cli_message(&format!("  {}", name));
                }
            }
            Ok(())
        }
    }
}

fn run_docs_command(command: DocsCommands, context: &mut dyn DataContext) -> Result<(), CliError> {
    match command {
        DocsCommands::Build { open } => {
            context.build_data_docs()?;
            cli_message("<green>Data docs built</green>");
            if open {
                context.open_data_docs(None)?;
            }
            Ok(())
        }
    }
}
