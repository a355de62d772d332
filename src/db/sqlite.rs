//! SQLite database client implementation.
//!
//! Provides the `SqliteClient` struct that implements the `DatabaseClient`
//! trait for SQLite files (and in-memory databases) using sqlx.

use crate::config::ConnectionConfig;
use crate::db::{ColumnInfo, DatabaseClient, QueryOptions, QueryResult, Row, Value};
use crate::error::{Result, RsqError};
use async_trait::async_trait;
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions, SqliteRow};
use sqlx::{Column as SqlxColumn, Executor, Row as SqlxRow, TypeInfo};
use std::time::Instant;
use tracing::{debug, warn};

/// SQLite database client.
#[derive(Debug)]
pub struct SqliteClient {
    pool: SqlitePool,
    options: QueryOptions,
}

impl SqliteClient {
    /// Opens a SQLite database file or an in-memory database.
    ///
    /// The pool is pinned to a single connection so that `:memory:`
    /// databases keep their state across statements.
    pub async fn connect(config: &ConnectionConfig, options: QueryOptions) -> Result<Self> {
        let conn_str = config.to_connection_string()?;

        debug!("opening {}", config.display_string());

        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect(&conn_str)
            .await
            .map_err(|e| map_connection_error(e, config))?;

        Ok(Self { pool, options })
    }

    /// Fetches column metadata for a query that returned no rows.
    async fn fetch_column_metadata(&self, sql: &str) -> Result<Vec<ColumnInfo>> {
        let describe = self
            .pool
            .describe(sql)
            .await
            .map_err(|e| RsqError::query(e.to_string()))?;

        Ok(describe
            .columns()
            .iter()
            .map(|col| ColumnInfo::new(col.name(), col.type_info().name()))
            .collect())
    }
}

#[async_trait]
impl DatabaseClient for SqliteClient {
    async fn execute_query(&self, sql: &str) -> Result<QueryResult> {
        let start = Instant::now();

        let fetched = tokio::time::timeout(
            self.options.timeout,
            sqlx::query(sql).fetch_all(&self.pool),
        )
        .await
        .map_err(|_| {
            RsqError::query(format!(
                "Query timed out after {} seconds",
                self.options.timeout.as_secs()
            ))
        })?
        .map_err(|e| RsqError::query(format_query_error(e)))?;

        let elapsed = start.elapsed();

        let columns: Vec<ColumnInfo> = match fetched.first() {
            Some(first_row) => first_row
                .columns()
                .iter()
                .map(|col| ColumnInfo::new(col.name(), col.type_info().name()))
                .collect(),
            None => self.fetch_column_metadata(sql).await.unwrap_or_default(),
        };

        let total_rows = fetched.len();
        let truncated_from = (total_rows > self.options.max_rows).then_some(total_rows);
        if truncated_from.is_some() {
            warn!(
                "query returned {} rows, truncating to {}",
                total_rows, self.options.max_rows
            );
        }

        let rows: Vec<Row> = fetched
            .iter()
            .take(self.options.max_rows)
            .map(convert_row)
            .collect();

        Ok(QueryResult {
            columns,
            rows,
            elapsed,
            truncated_from,
        })
    }

    async fn close(&self) -> Result<()> {
        self.pool.close().await;
        Ok(())
    }
}

/// Converts a sqlx SqliteRow to our Row type.
fn convert_row(row: &SqliteRow) -> Row {
    row.columns()
        .iter()
        .enumerate()
        .map(|(i, col)| convert_value(row, i, col.type_info().name()))
        .collect()
}

/// Decodes a nullable column, folding type mismatches into NULL.
fn get<'r, T>(row: &'r SqliteRow, index: usize) -> Option<T>
where
    T: sqlx::Decode<'r, sqlx::Sqlite> + sqlx::Type<sqlx::Sqlite>,
{
    row.try_get::<Option<T>, _>(index).ok().flatten()
}

/// Converts a single column value from a SqliteRow to our Value type.
///
/// SQLite reports storage classes rather than rich types, so the mapping is
/// by affinity: INTEGER, REAL/NUMERIC, BLOB, BOOLEAN, and text for the rest.
fn convert_value(row: &SqliteRow, index: usize, type_name: &str) -> Value {
    match type_name.to_uppercase().as_str() {
        "NULL" => Value::Null,
        "BOOLEAN" => get::<bool>(row, index).map(Value::Bool).unwrap_or_default(),
        "INTEGER" | "INT" | "INT8" | "BIGINT" => {
            get::<i64>(row, index).map(Value::Int).unwrap_or_default()
        }
        "REAL" | "NUMERIC" | "FLOAT" | "DOUBLE" => get::<f64>(row, index)
            .map(Value::Float)
            .unwrap_or_default(),
        "BLOB" => get::<Vec<u8>>(row, index)
            .map(Value::Bytes)
            .unwrap_or_default(),
        _ => get::<String>(row, index).map(Value::Text).unwrap_or_default(),
    }
}

/// Maps sqlx connection errors to user-actionable messages.
fn map_connection_error(error: sqlx::Error, config: &ConnectionConfig) -> RsqError {
    let path = config.database.as_deref().unwrap_or("unknown");
    let error_str = error.to_string().to_lowercase();

    if error_str.contains("unable to open") || error_str.contains("no such file") {
        RsqError::connection(format!(
            "Cannot open SQLite database '{path}'. Check that the file exists and is readable."
        ))
    } else {
        RsqError::connection(error.to_string())
    }
}

/// Formats a query error from the driver.
fn format_query_error(error: sqlx::Error) -> String {
    match error.as_database_error() {
        Some(db_error) => format!("ERROR: {}", db_error.message()),
        None => error.to_string(),
    }
}
