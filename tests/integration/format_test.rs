//! Formatting integration tests.
//!
//! Renders results produced by a real query through each output format.

use pretty_assertions::assert_eq;
use rsq::config::ConnectionConfig;
use rsq::db::{self, DatabaseClient, FailingDatabaseClient, MockDatabaseClient, QueryOptions};
use rsq::error::RsqError;
use rsq::format::{OutputFormat, OutputFormatter};

async fn seeded_client() -> Box<dyn DatabaseClient> {
    let config = ConnectionConfig::from_connection_string("sqlite::memory:").unwrap();
    let client = db::connect(&config, QueryOptions::default()).await.unwrap();

    client
        .execute_query("CREATE TABLE pets (id INTEGER PRIMARY KEY, name TEXT)")
        .await
        .unwrap();
    client
        .execute_query("INSERT INTO pets (name) VALUES ('Rex'), (NULL)")
        .await
        .unwrap();

    client
}

#[tokio::test]
async fn test_table_output_from_live_query() {
    let client = seeded_client().await;
    let result = client
        .execute_query("SELECT id, name FROM pets ORDER BY id")
        .await
        .unwrap();
    client.close().await.unwrap();

    let rendered = OutputFormatter::new(OutputFormat::Table)
        .format(&result)
        .unwrap();

    assert!(rendered.contains("│ id │ name │"));
    assert!(rendered.contains("│ 1  │ Rex  │"));
    assert!(rendered.contains("│ 2  │ NULL │"));
    assert!(rendered.contains("(2 rows)"));
}

#[tokio::test]
async fn test_json_output_from_live_query() {
    let client = seeded_client().await;
    let result = client
        .execute_query("SELECT id, name FROM pets ORDER BY id")
        .await
        .unwrap();
    client.close().await.unwrap();

    let rendered = OutputFormatter::new(OutputFormat::Json)
        .format(&result)
        .unwrap();

    let parsed: serde_json::Value = serde_json::from_str(&rendered).unwrap();
    assert_eq!(parsed[0]["id"], serde_json::json!(1));
    assert_eq!(parsed[0]["name"], serde_json::json!("Rex"));
    assert_eq!(parsed[1]["name"], serde_json::Value::Null);
}

#[tokio::test]
async fn test_csv_output_from_live_query() {
    let client = seeded_client().await;
    let result = client
        .execute_query("SELECT id, name FROM pets ORDER BY id")
        .await
        .unwrap();
    client.close().await.unwrap();

    let rendered = OutputFormatter::new(OutputFormat::Csv)
        .format(&result)
        .unwrap();

    assert_eq!(rendered, "id,name\n1,Rex\n2,NULL\n");
}

#[tokio::test]
async fn test_mock_client_formats_like_any_other() {
    let client = MockDatabaseClient::new();
    let result = client.execute_query("SELECT anything").await.unwrap();

    let rendered = OutputFormatter::new(OutputFormat::Table)
        .format(&result)
        .unwrap();

    assert!(rendered.contains("result"));
    assert!(rendered.contains("(1 row)"));
}

#[tokio::test]
async fn test_failing_client_surfaces_query_error() {
    let client = FailingDatabaseClient;
    let result = client.execute_query("SELECT 1").await;

    assert!(matches!(result.unwrap_err(), RsqError::Query(_)));
}
