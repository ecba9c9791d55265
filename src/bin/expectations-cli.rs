//! Expectations CLI Binary
//!
//! Run with: `cargo run --bin expectations-cli`

use clap::Parser;
use expectations::cli::util::{cli_message, TerminalPrompt};
use expectations::cli::{self, Cli, Commands};
use expectations::datasource::DatasourceConfig;
use expectations::filesystem_context::FilesystemContext;
use expectations::usage_statistics::{
    build_init_payload, DatasourceAnonymizer, EventName, JsonlFileSink, UsageStatisticsHandler,
};

fn main() {
    // Set RUST_LOG to control log level, e.g.:
    //   RUST_LOG=debug cargo run --bin expectations-cli
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .compact()
        .init();

    let cli = Cli::parse();
    if let Err(err) = run(cli) {
        cli_message(&format!("<red>{}</red>", err));
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    match cli.command {
        Commands::Init { data_dir, db_path } => {
            let mut datasources = Vec::new();
            if let Some(base_dir) = data_dir {
                datasources.push(DatasourceConfig::Directory {
                    name: "files".to_string(),
                    base_dir,
                });
            }
            if let Some(db_path) = db_path {
                datasources.push(DatasourceConfig::Sqlite {
                    name: "warehouse".to_string(),
                    db_path,
                });
            }
            let context = FilesystemContext::init(&cli.project_dir, datasources)?;
            cli_message(&format!(
                "<green>Initialized new project at {}</green>",
                context.root().display()
            ));
            Ok(())
        }
        command => {
            let mut context = FilesystemContext::open(&cli.project_dir)?;
            emit_init_event(&context);

            let mut prompt = TerminalPrompt;
            cli::run_command(command, &mut context, &mut prompt)?;
            Ok(())
        }
    }
}

/// Records the anonymized context-initialization event, if enabled.
///
/// Telemetry never interferes with the command: the handler validates and
/// drops anything that does not conform to the record schema.
fn emit_init_event(context: &FilesystemContext) {
    let stats = &context.config().anonymous_usage_statistics;
    if !stats.enabled {
        return;
    }

    let sink = JsonlFileSink::new(context.root().join("usage_statistics.jsonl"));
    let mut handler = UsageStatisticsHandler::new(stats.data_context_id, Box::new(sink));
    let anonymizer = DatasourceAnonymizer::new(None);
    let datasources: Vec<(String, String)> = context
        .config()
        .datasources
        .iter()
        .map(|config| (config.name().to_string(), config.class_name().to_string()))
        .collect();

    handler.emit_event(
        EventName::DataContextInit,
        Some(true),
        build_init_payload(&anonymizer, &datasources),
    );
}
