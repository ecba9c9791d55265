use crate::batch_kwargs::BatchKwargs;
use crate::datasource::DatasourceConfig;
use rusqlite::Connection;
use std::fmt;
use std::path::Path;

/// A materialized sample of a data asset.
///
/// Carries the shape of the sample (column names and row count) plus the
/// batch kwargs it was loaded from. Profilers consume batches; the crate
/// never holds the sampled rows themselves in memory beyond loading.
#[derive(Debug, Clone, PartialEq)]
pub struct Batch {
    pub columns: Vec<String>,
    pub row_count: usize,
    pub batch_kwargs: BatchKwargs,
}

/// Loads a batch for the given datasource and batch kwargs.
///
/// Dispatch follows the kwargs contents:
/// - `path` on a directory datasource reads a CSV file
/// - `table` on a SQLite datasource counts a table
/// - `query` on a SQLite datasource runs arbitrary SQL
///
/// # Errors
/// Returns an error when the kwargs carry no usable key for the datasource
/// kind, or when the underlying file or database cannot be read.
pub fn load_batch(
    datasource: &DatasourceConfig,
    batch_kwargs: &BatchKwargs,
) -> Result<Batch, BatchError> {
    match datasource {
        DatasourceConfig::Directory { .. } => {
            let path = batch_kwargs.path().ok_or(BatchError::MissingBatchKey {
                key: "path",
                datasource: datasource.name().to_string(),
            })?;
            load_csv_batch(Path::new(path), batch_kwargs)
        }
        DatasourceConfig::Sqlite { db_path, .. } => {
            if let Some(table) = batch_kwargs.table() {
                load_table_batch(db_path, table, batch_kwargs)
            } else if let Some(query) = batch_kwargs.query() {
                load_query_batch(db_path, query, batch_kwargs)
            } else {
                Err(BatchError::MissingBatchKey {
                    key: "table",
                    datasource: datasource.name().to_string(),
                })
            }
        }
    }
}

fn load_csv_batch(path: &Path, batch_kwargs: &BatchKwargs) -> Result<Batch, BatchError> {
    let mut reader = csv::Reader::from_path(path)
        .map_err(|e| BatchError::Csv(format!("{}: {}", path.display(), e)))?;

    let columns: Vec<String> = reader
        .headers()
        .map_err(|e| BatchError::Csv(format!("{}: {}", path.display(), e)))?
        .iter()
        .map(String::from)
        .collect();

    let mut row_count = 0;
    for record in reader.records() {
        record.map_err(|e| BatchError::Csv(format!("{}: {}", path.display(), e)))?;
        row_count += 1;
    }

    Ok(Batch {
        columns,
        row_count,
        batch_kwargs: batch_kwargs.clone(),
    })
}

fn load_table_batch(
    db_path: &Path,
    table: &str,
    batch_kwargs: &BatchKwargs,
) -> Result<Batch, BatchError> {
    // Table names come from sqlite_master listings or user input; quoting
    // keeps unusual identifiers working and arbitrary SQL out.
    let quoted = format!("\"{}\"", table.replace('"', "\"\""));
    let conn = Connection::open(db_path).map_err(|e| BatchError::Sqlite(e.to_string()))?;

    let stmt = conn
        .prepare(&format!("SELECT * FROM {} LIMIT 0", quoted))
        .map_err(|e| BatchError::Sqlite(e.to_string()))?;
    let columns: Vec<String> = stmt.column_names().iter().map(|s| s.to_string()).collect();
    drop(stmt);

    let row_count: usize = conn
        .query_row(&format!("SELECT COUNT(*) FROM {}", quoted), [], |row| {
            row.get::<_, i64>(0)
        })
        .map_err(|e| BatchError::Sqlite(e.to_string()))? as usize;

    Ok(Batch {
        columns,
        row_count,
        batch_kwargs: batch_kwargs.clone(),
    })
}

fn load_query_batch(
    db_path: &Path,
    query: &str,
    batch_kwargs: &BatchKwargs,
) -> Result<Batch, BatchError> {
    let conn = Connection::open(db_path).map_err(|e| BatchError::Sqlite(e.to_string()))?;
    let mut stmt = conn
        .prepare(query)
        .map_err(|e| BatchError::Sqlite(e.to_string()))?;
    let columns: Vec<String> = stmt.column_names().iter().map(|s| s.to_string()).collect();

    let mut rows = stmt
        .query([])
        .map_err(|e| BatchError::Sqlite(e.to_string()))?;
    let mut row_count = 0;
    while rows
        .next()
        .map_err(|e| BatchError::Sqlite(e.to_string()))?
        .is_some()
    {
        row_count += 1;
    }

    Ok(Batch {
        columns,
        row_count,
        batch_kwargs: batch_kwargs.clone(),
    })
}

/// Errors raised while materializing a batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BatchError {
    /// The batch kwargs carry no key the datasource kind can use
    MissingBatchKey {
        key: &'static str,
        datasource: String,
    },
    /// CSV file could not be read or parsed
    Csv(String),
    /// SQLite access failed
    Sqlite(String),
}

impl fmt::Display for BatchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BatchError::MissingBatchKey { key, datasource } => write!(
                f,
                "Batch kwargs for datasource {} are missing the `{}` key",
                datasource, key
            ),
            BatchError::Csv(msg) => write!(f, "CSV error: {}", msg),
            BatchError::Sqlite(msg) => write!(f, "SQLite error: {}", msg),
        }
    }
}

impl std::error::Error for BatchError {}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::fs;

    fn directory_config(base_dir: &Path) -> DatasourceConfig {
        DatasourceConfig::Directory {
            name: "files".to_string(),
            base_dir: base_dir.to_path_buf(),
        }
    }

    #[test]
    fn test_load_csv_batch_columns_and_rows() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("orders.csv");
        fs::write(&path, "id,amount,status\n1,10.5,open\n2,20.0,closed\n").unwrap();

        let mut kwargs = BatchKwargs::new();
        kwargs.insert("path", json!(path.to_string_lossy()));

        let batch = load_batch(&directory_config(dir.path()), &kwargs).unwrap();
        assert_eq!(batch.columns, vec!["id", "amount", "status"]);
        assert_eq!(batch.row_count, 2);
        assert_eq!(batch.batch_kwargs, kwargs);
    }

    #[test]
    fn test_load_csv_batch_missing_path_key() {
        let dir = tempfile::tempdir().unwrap();
        let kwargs = BatchKwargs::new();

        let err = load_batch(&directory_config(dir.path()), &kwargs).unwrap_err();
        assert_eq!(
            err,
            BatchError::MissingBatchKey {
                key: "path",
                datasource: "files".to_string()
            }
        );
    }

    #[test]
    fn test_load_csv_batch_nonexistent_file() {
        let dir = tempfile::tempdir().unwrap();
        let mut kwargs = BatchKwargs::new();
        kwargs.insert("path", json!("/nonexistent/orders.csv"));

        let err = load_batch(&directory_config(dir.path()), &kwargs).unwrap_err();
        assert!(matches!(err, BatchError::Csv(_)));
    }

    fn sqlite_config(dir: &Path) -> (DatasourceConfig, std::path::PathBuf) {
        let db_path = dir.join("warehouse.db");
        let conn = Connection::open(&db_path).unwrap();
        conn.execute("CREATE TABLE orders (id INTEGER, amount REAL)", [])
            .unwrap();
        conn.execute("INSERT INTO orders VALUES (1, 10.5), (2, 20.0), (3, 7.25)", [])
            .unwrap();
        drop(conn);
        (
            DatasourceConfig::Sqlite {
                name: "warehouse".to_string(),
                db_path: db_path.clone(),
            },
            db_path,
        )
    }

    #[test]
    fn test_load_table_batch() {
        let dir = tempfile::tempdir().unwrap();
        let (config, _db_path) = sqlite_config(dir.path());

        let mut kwargs = BatchKwargs::new();
        kwargs.insert("table", json!("orders"));

        let batch = load_batch(&config, &kwargs).unwrap();
        assert_eq!(batch.columns, vec!["id", "amount"]);
        assert_eq!(batch.row_count, 3);
    }

    #[test]
    fn test_load_query_batch() {
        let dir = tempfile::tempdir().unwrap();
        let (config, _db_path) = sqlite_config(dir.path());

        let mut kwargs = BatchKwargs::new();
        kwargs.insert("query", json!("SELECT id FROM orders WHERE amount > 10"));

        let batch = load_batch(&config, &kwargs).unwrap();
        assert_eq!(batch.columns, vec!["id"]);
        assert_eq!(batch.row_count, 2);
    }

    #[test]
    fn test_sqlite_kwargs_without_table_or_query() {
        let dir = tempfile::tempdir().unwrap();
        let (config, _db_path) = sqlite_config(dir.path());

        let kwargs = BatchKwargs::new();
        let err = load_batch(&config, &kwargs).unwrap_err();
        assert!(matches!(err, BatchError::MissingBatchKey { key: "table", .. }));
    }
}
