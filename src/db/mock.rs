//! Mock database clients for testing.
//!
//! Provide in-memory implementations of `DatabaseClient` so the query flow
//! and formatters can be exercised without a real server.

use super::{ColumnInfo, DatabaseClient, QueryResult, Value};
use crate::error::{Result, RsqError};
use async_trait::async_trait;
use std::time::Duration;

/// A mock database client that returns a canned result for every query.
#[derive(Debug)]
pub struct MockDatabaseClient {
    result: QueryResult,
}

impl MockDatabaseClient {
    /// Creates a mock client that answers every query with a single-row result.
    pub fn new() -> Self {
        let columns = vec![ColumnInfo::new("result", "TEXT")];
        let rows = vec![vec![Value::Text("ok".to_string())]];
        Self {
            result: QueryResult::new(columns, rows).with_elapsed(Duration::from_millis(1)),
        }
    }

    /// Creates a mock client that answers every query with the given result.
    pub fn with_result(result: QueryResult) -> Self {
        Self { result }
    }
}

impl Default for MockDatabaseClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DatabaseClient for MockDatabaseClient {
    async fn execute_query(&self, _sql: &str) -> Result<QueryResult> {
        Ok(self.result.clone())
    }

    async fn close(&self) -> Result<()> {
        Ok(())
    }
}

/// A mock database client whose every operation fails.
#[derive(Debug)]
pub struct FailingDatabaseClient;

#[async_trait]
impl DatabaseClient for FailingDatabaseClient {
    async fn execute_query(&self, _sql: &str) -> Result<QueryResult> {
        Err(RsqError::query("mock query failure"))
    }

    async fn close(&self) -> Result<()> {
        Err(RsqError::connection("mock close failure"))
    }
}
