//! Query execution integration tests.
//!
//! The end-to-end flow — connect, execute, materialize — against an
//! in-memory SQLite database, plus env-gated PostgreSQL coverage.

use rsq::config::ConnectionConfig;
use rsq::db::{self, DatabaseClient, PostgresClient, QueryOptions, Value};
use rsq::error::RsqError;
use std::time::Duration;

async fn sqlite_client() -> Box<dyn DatabaseClient> {
    let config = ConnectionConfig::from_connection_string("sqlite::memory:").unwrap();
    db::connect(&config, QueryOptions::default()).await.unwrap()
}

#[tokio::test]
async fn test_create_insert_select_round_trip() {
    let client = sqlite_client().await;

    client
        .execute_query("CREATE TABLE users (id INTEGER PRIMARY KEY, name TEXT, score REAL)")
        .await
        .unwrap();
    client
        .execute_query("INSERT INTO users (name, score) VALUES ('Alice', 9.5), ('Bob', NULL)")
        .await
        .unwrap();

    let result = client
        .execute_query("SELECT id, name, score FROM users ORDER BY id")
        .await
        .unwrap();

    assert_eq!(result.columns.len(), 3);
    assert_eq!(result.columns[0].name, "id");
    assert_eq!(result.columns[1].name, "name");
    assert_eq!(result.columns[2].name, "score");

    assert_eq!(result.row_count(), 2);
    assert_eq!(result.rows[0][0], Value::Int(1));
    assert_eq!(result.rows[0][1], Value::Text("Alice".to_string()));
    assert_eq!(result.rows[0][2], Value::Float(9.5));
    assert_eq!(result.rows[1][1], Value::Text("Bob".to_string()));
    assert!(result.rows[1][2].is_null());

    client.close().await.unwrap();
}

#[tokio::test]
async fn test_query_returns_elapsed_time() {
    let client = sqlite_client().await;

    let result = client.execute_query("SELECT 1").await.unwrap();
    assert!(result.elapsed > Duration::ZERO);

    client.close().await.unwrap();
}

#[tokio::test]
async fn test_empty_result_still_has_columns() {
    let client = sqlite_client().await;

    client
        .execute_query("CREATE TABLE empty_table (id INTEGER, label TEXT)")
        .await
        .unwrap();

    let result = client
        .execute_query("SELECT id, label FROM empty_table")
        .await
        .unwrap();

    assert!(result.is_empty());
    assert_eq!(result.columns.len(), 2);
    assert_eq!(result.columns[0].name, "id");
    assert_eq!(result.columns[1].name, "label");

    client.close().await.unwrap();
}

#[tokio::test]
async fn test_row_cap_truncates_result() {
    let config = ConnectionConfig::from_connection_string("sqlite::memory:").unwrap();
    let options = QueryOptions {
        timeout: Duration::from_secs(30),
        max_rows: 2,
    };
    let client = db::connect(&config, options).await.unwrap();

    let result = client
        .execute_query("WITH t(n) AS (VALUES (1), (2), (3), (4), (5)) SELECT n FROM t")
        .await
        .unwrap();

    assert_eq!(result.row_count(), 2);
    assert!(result.is_truncated());
    assert_eq!(result.truncated_from, Some(5));
    assert_eq!(
        result.truncation_notice().unwrap(),
        "Result truncated: showing 2 of 5 rows"
    );

    client.close().await.unwrap();
}

#[tokio::test]
async fn test_malformed_sql_is_query_error() {
    let client = sqlite_client().await;

    let result = client.execute_query("SELEKT broken FROM").await;
    assert!(result.is_err());
    assert!(matches!(result.unwrap_err(), RsqError::Query(_)));

    client.close().await.unwrap();
}

#[tokio::test]
async fn test_postgres_select_round_trip() {
    let Some(url) = std::env::var("DATABASE_URL").ok() else {
        eprintln!("Skipping test: DATABASE_URL not set");
        return;
    };

    let config = ConnectionConfig::from_connection_string(&url).unwrap();
    let client = PostgresClient::connect(&config, QueryOptions::default())
        .await
        .unwrap();

    let result = client
        .execute_query("SELECT 1 AS num, 'hello' AS greeting, NULL::text AS missing")
        .await
        .unwrap();

    assert_eq!(result.columns[0].name, "num");
    assert_eq!(result.rows[0][1], Value::Text("hello".to_string()));
    assert!(result.rows[0][2].is_null());

    client.close().await.unwrap();
}
