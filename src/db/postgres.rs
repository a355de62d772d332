//! PostgreSQL database client implementation.
//!
//! Provides the `PostgresClient` struct that implements the `DatabaseClient`
//! trait for PostgreSQL databases using sqlx.

use crate::config::ConnectionConfig;
use crate::db::{ColumnInfo, DatabaseClient, QueryOptions, QueryResult, Row, Value};
use crate::error::{Result, RsqError};
use async_trait::async_trait;
use sqlx::postgres::{PgPool, PgPoolOptions, PgRow};
use sqlx::{Column as SqlxColumn, Executor, Row as SqlxRow, TypeInfo};
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// PostgreSQL database client.
#[derive(Debug)]
pub struct PostgresClient {
    pool: PgPool,
    options: QueryOptions,
}

impl PostgresClient {
    /// Opens a connection to a PostgreSQL server.
    pub async fn connect(config: &ConnectionConfig, options: QueryOptions) -> Result<Self> {
        let conn_str = config.to_connection_string()?;

        debug!("connecting to {}", config.display_string());

        // One shot, one connection. The first failure is the answer.
        let pool = PgPoolOptions::new()
            .max_connections(1)
            .acquire_timeout(Duration::from_secs(10))
            .connect(&conn_str)
            .await
            .map_err(|e| map_connection_error(e, config))?;

        debug!("connected");
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
impl DatabaseClient for PostgresClient {
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

        // Column metadata comes from the first row; an empty result set needs
        // a round trip to the statement description instead.
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

/// Converts a sqlx PgRow to our Row type.
fn convert_row(row: &PgRow) -> Row {
    row.columns()
        .iter()
        .enumerate()
        .map(|(i, col)| convert_value(row, i, col.type_info().name()))
        .collect()
}

/// Decodes a nullable column, folding type mismatches into NULL.
fn get<'r, T>(row: &'r PgRow, index: usize) -> Option<T>
where
    T: sqlx::Decode<'r, sqlx::Postgres> + sqlx::Type<sqlx::Postgres>,
{
    row.try_get::<Option<T>, _>(index).ok().flatten()
}

/// Converts a single column value from a PgRow to our Value type.
fn convert_value(row: &PgRow, index: usize, type_name: &str) -> Value {
    match type_name.to_uppercase().as_str() {
        "BOOL" | "BOOLEAN" => get::<bool>(row, index).map(Value::Bool).unwrap_or_default(),
        "INT2" | "SMALLINT" => get::<i16>(row, index)
            .map(|v| Value::Int(v.into()))
            .unwrap_or_default(),
        "INT4" | "INT" | "INTEGER" => get::<i32>(row, index)
            .map(|v| Value::Int(v.into()))
            .unwrap_or_default(),
        "INT8" | "BIGINT" => get::<i64>(row, index).map(Value::Int).unwrap_or_default(),
        "FLOAT4" | "REAL" => get::<f32>(row, index)
            .map(|v| Value::Float(v.into()))
            .unwrap_or_default(),
        "FLOAT8" | "DOUBLE PRECISION" => get::<f64>(row, index)
            .map(Value::Float)
            .unwrap_or_default(),
        "BYTEA" => get::<Vec<u8>>(row, index)
            .map(Value::Bytes)
            .unwrap_or_default(),
        // Everything else decodes as text when the driver allows it.
        _ => get::<String>(row, index).map(Value::Text).unwrap_or_default(),
    }
}

/// Maps sqlx connection errors to user-actionable messages.
fn map_connection_error(error: sqlx::Error, config: &ConnectionConfig) -> RsqError {
    let host = config.host.as_deref().unwrap_or("localhost");
    let port = config.port;
    let user = config.user.as_deref().unwrap_or("unknown");
    let database = config.database.as_deref().unwrap_or("unknown");

    let error_str = error.to_string().to_lowercase();

    if error_str.contains("connection refused") || error_str.contains("could not connect") {
        RsqError::connection(format!(
            "Cannot connect to {host}:{port}. Check that the server is running."
        ))
    } else if error_str.contains("password authentication failed")
        || error_str.contains("authentication failed")
    {
        RsqError::connection(format!(
            "Authentication failed for user '{user}'. Check your credentials."
        ))
    } else if error_str.contains("does not exist") && error_str.contains("database") {
        RsqError::connection(format!("Database '{database}' does not exist."))
    } else if error_str.contains("ssl") || error_str.contains("tls") {
        RsqError::connection(
            "Server requires SSL. Add '?sslmode=require' to the connection string.".to_string(),
        )
    } else if error_str.contains("timed out") || error_str.contains("timeout") {
        RsqError::connection(format!(
            "Connection to {host}:{port} timed out. The server may be overloaded or unreachable."
        ))
    } else {
        RsqError::connection(error.to_string())
    }
}

/// Formats a query error, carrying the server's detail and hint if present.
fn format_query_error(error: sqlx::Error) -> String {
    let Some(db_error) = error.as_database_error() else {
        return error.to_string();
    };

    let mut result = format!("ERROR: {}", db_error.message());

    if let Some(pg_error) = db_error.try_downcast_ref::<sqlx::postgres::PgDatabaseError>() {
        if let Some(detail) = pg_error.detail() {
            result.push_str("\n  DETAIL: ");
            result.push_str(detail);
        }
        if let Some(hint) = pg_error.hint() {
            result.push_str("\n  HINT: ");
            result.push_str(hint);
        }
    }

    result
}
