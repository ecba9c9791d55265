use crate::batch_kwargs::BatchKwargs;
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::fmt;
use std::path::PathBuf;

/// Declares a named source of data assets.
///
/// Two kinds are supported:
/// - `Directory`: assets are CSV files under a base directory
/// - `Sqlite`: assets are tables of a SQLite database file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DatasourceConfig {
    /// File-backed datasource reading CSV files from a directory
    Directory { name: String, base_dir: PathBuf },
    /// SQLite-backed datasource reading tables from a database file
    Sqlite { name: String, db_path: PathBuf },
}

impl DatasourceConfig {
    /// The datasource name used in batch kwargs and CLI selection.
    pub fn name(&self) -> &str {
        match self {
            DatasourceConfig::Directory { name, .. } => name,
            DatasourceConfig::Sqlite { name, .. } => name,
        }
    }

    /// Implementation class name, used by the telemetry anonymizers.
    pub fn class_name(&self) -> &'static str {
        match self {
            DatasourceConfig::Directory { .. } => "DirectoryDatasource",
            DatasourceConfig::Sqlite { .. } => "SqliteDatasource",
        }
    }

    /// Names of the batch-kwargs generators this datasource offers.
    pub fn generator_names(&self) -> Vec<String> {
        match self {
            DatasourceConfig::Directory { .. } => vec!["subdir_reader".to_string()],
            DatasourceConfig::Sqlite { .. } => vec!["table".to_string()],
        }
    }

    /// Resolves a generator by name, or the default generator when `None`.
    ///
    /// # Errors
    /// Returns `DatasourceError::UnknownGenerator` when the name does not
    /// match any generator of this datasource.
    pub fn generator(
        &self,
        generator_name: Option<&str>,
    ) -> Result<Box<dyn BatchKwargsGenerator>, DatasourceError> {
        match self {
            DatasourceConfig::Directory { name, base_dir } => {
                if let Some(requested) = generator_name {
                    if requested != "subdir_reader" {
                        return Err(DatasourceError::UnknownGenerator {
                            datasource: name.clone(),
                            generator: requested.to_string(),
                        });
                    }
                }
                Ok(Box::new(SubdirReaderGenerator {
                    datasource_name: name.clone(),
                    base_dir: base_dir.clone(),
                }))
            }
            DatasourceConfig::Sqlite { name, db_path } => {
                if let Some(requested) = generator_name {
                    if requested != "table" {
                        return Err(DatasourceError::UnknownGenerator {
                            datasource: name.clone(),
                            generator: requested.to_string(),
                        });
                    }
                }
                Ok(Box::new(TableGenerator {
                    datasource_name: name.clone(),
                    db_path: db_path.clone(),
                }))
            }
        }
    }
}

/// Lists the assets of a datasource and builds batch kwargs for them.
///
/// Generators decouple "what assets exist" from "how a sample of one is
/// materialized": the CLI asks a generator for asset names during
/// interactive selection, then asks it for the batch kwargs of the chosen
/// asset.
pub trait BatchKwargsGenerator {
    /// Generator name, unique within its datasource.
    fn name(&self) -> &str;

    /// Asset names this generator can materialize, sorted.
    ///
    /// # Errors
    /// Returns an error when the underlying directory or database cannot
    /// be read.
    fn list_asset_names(&self) -> Result<Vec<String>, DatasourceError>;

    /// Builds batch kwargs for a named asset.
    ///
    /// # Errors
    /// Returns `DatasourceError::AssetNotFound` when the asset is not one
    /// of this generator's assets.
    fn build_batch_kwargs(&self, data_asset_name: &str) -> Result<BatchKwargs, DatasourceError>;
}

/// Generator over CSV files in a directory. Asset name = file stem.
struct SubdirReaderGenerator {
    datasource_name: String,
    base_dir: PathBuf,
}

impl BatchKwargsGenerator for SubdirReaderGenerator {
    fn name(&self) -> &str {
        "subdir_reader"
    }

    fn list_asset_names(&self) -> Result<Vec<String>, DatasourceError> {
        let entries = std::fs::read_dir(&self.base_dir)
            .map_err(|e| DatasourceError::Io(format!("{}: {}", self.base_dir.display(), e)))?;

        let mut names = Vec::new();
        for entry in entries {
            let entry =
                entry.map_err(|e| DatasourceError::Io(format!("{}: {}", self.base_dir.display(), e)))?;
            let path = entry.path();
            if path.extension().and_then(|ext| ext.to_str()) == Some("csv") {
                if let Some(stem) = path.file_stem().and_then(|stem| stem.to_str()) {
                    names.push(stem.to_string());
                }
            }
        }
        names.sort();
        Ok(names)
    }

    fn build_batch_kwargs(&self, data_asset_name: &str) -> Result<BatchKwargs, DatasourceError> {
        let assets = self.list_asset_names()?;
        if !assets.iter().any(|asset| asset == data_asset_name) {
            return Err(DatasourceError::AssetNotFound {
                asset: data_asset_name.to_string(),
            });
        }

        let path = self.base_dir.join(format!("{}.csv", data_asset_name));
        let mut kwargs = BatchKwargs::new();
        kwargs.insert("datasource", json!(self.datasource_name));
        kwargs.insert("data_asset_name", json!(data_asset_name));
        kwargs.insert("path", json!(path.to_string_lossy()));
        Ok(kwargs)
    }
}

/// Generator over tables of a SQLite database file.
struct TableGenerator {
    datasource_name: String,
    db_path: PathBuf,
}

impl BatchKwargsGenerator for TableGenerator {
    fn name(&self) -> &str {
        "table"
    }

    fn list_asset_names(&self) -> Result<Vec<String>, DatasourceError> {
        let conn = Connection::open(&self.db_path)
            .map_err(|e| DatasourceError::Sqlite(e.to_string()))?;
        let mut stmt = conn
            .prepare(
                "SELECT name FROM sqlite_master
                 WHERE type = 'table' AND name NOT LIKE 'sqlite_%'
                 ORDER BY name",
            )
            .map_err(|e| DatasourceError::Sqlite(e.to_string()))?;

        let names = stmt
            .query_map([], |row| row.get::<_, String>(0))
            .map_err(|e| DatasourceError::Sqlite(e.to_string()))?
            .collect::<Result<Vec<String>, _>>()
            .map_err(|e| DatasourceError::Sqlite(e.to_string()))?;
        Ok(names)
    }

    fn build_batch_kwargs(&self, data_asset_name: &str) -> Result<BatchKwargs, DatasourceError> {
        let assets = self.list_asset_names()?;
        if !assets.iter().any(|asset| asset == data_asset_name) {
            return Err(DatasourceError::AssetNotFound {
                asset: data_asset_name.to_string(),
            });
        }

        let mut kwargs = BatchKwargs::new();
        kwargs.insert("datasource", json!(self.datasource_name));
        kwargs.insert("data_asset_name", json!(data_asset_name));
        kwargs.insert("table", json!(data_asset_name));
        Ok(kwargs)
    }
}

/// Errors raised by datasources and their generators.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DatasourceError {
    /// The named asset is not known to the generator
    AssetNotFound { asset: String },
    /// The named generator does not exist on the datasource
    UnknownGenerator { datasource: String, generator: String },
    /// Filesystem access failed
    Io(String),
    /// Database access failed
    Sqlite(String),
}

impl fmt::Display for DatasourceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DatasourceError::AssetNotFound { asset } => {
                write!(f, "Data asset not found: {}", asset)
            }
            DatasourceError::UnknownGenerator {
                datasource,
                generator,
            } => write!(
                f,
                "Datasource {} has no generator named {}",
                datasource, generator
            ),
            DatasourceError::Io(msg) => write!(f, "I/O error: {}", msg),
            DatasourceError::Sqlite(msg) => write!(f, "SQLite error: {}", msg),
        }
    }
}

impl std::error::Error for DatasourceError {}
