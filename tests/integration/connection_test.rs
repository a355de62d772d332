//! Connection integration tests.
//!
//! Tests connection establishment and error handling through the backend
//! factory.

use rsq::config::ConnectionConfig;
use rsq::db::{self, DatabaseBackend, DatabaseClient, PostgresClient, QueryOptions};
use rsq::error::RsqError;

/// Helper to get the test database URL from the environment.
fn get_test_database_url() -> Option<String> {
    std::env::var("DATABASE_URL").ok()
}

#[tokio::test]
async fn test_connect_sqlite_memory_through_factory() {
    let config = ConnectionConfig::from_connection_string("sqlite::memory:").unwrap();
    assert_eq!(config.backend, DatabaseBackend::Sqlite);

    let client = db::connect(&config, QueryOptions::default()).await.unwrap();
    client.close().await.unwrap();
}

#[tokio::test]
async fn test_connect_postgres_with_valid_credentials() {
    let Some(url) = get_test_database_url() else {
        eprintln!("Skipping test: DATABASE_URL not set");
        return;
    };

    let config = ConnectionConfig::from_connection_string(&url).unwrap();
    let client = PostgresClient::connect(&config, QueryOptions::default())
        .await
        .unwrap();

    client.close().await.unwrap();
}

#[tokio::test(flavor = "current_thread")]
async fn test_connect_with_invalid_host() {
    let config = ConnectionConfig {
        host: Some("invalid.host.that.does.not.exist.local".to_string()),
        port: 5432,
        database: Some("testdb".to_string()),
        user: Some("testuser".to_string()),
        password: Some("testpass".to_string()),
        ..Default::default()
    };

    let result = PostgresClient::connect(&config, QueryOptions::default()).await;
    assert!(result.is_err());

    // The specific message varies by system, but the category must be a
    // connection error.
    assert!(matches!(result.unwrap_err(), RsqError::Connection(_)));
}

#[tokio::test]
async fn test_connect_sqlite_missing_file() {
    let config =
        ConnectionConfig::from_connection_string("sqlite:///no/such/directory/data.db").unwrap();

    let result = db::connect(&config, QueryOptions::default()).await;
    assert!(result.is_err());
    assert!(matches!(result.unwrap_err(), RsqError::Connection(_)));
}

#[test]
fn test_malformed_connection_string_is_rejected() {
    let result = ConnectionConfig::from_connection_string("not a url at all");
    assert!(result.is_err());
    assert!(matches!(result.unwrap_err(), RsqError::Config(_)));
}
