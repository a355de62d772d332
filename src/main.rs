//! rsq - run a SQL query against a database URL and print the result set.

use rsq::cli::Cli;
use rsq::config::{Config, ConnectionConfig};
use rsq::error::{Result, RsqError};
use rsq::format::OutputFormatter;
use rsq::{db, logging};
use std::io::Read;
use tracing::{debug, error, info};

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    logging::init();

    if let Err(e) = run().await {
        error!("{}: {}", e.category(), e);
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    // Parse CLI arguments
    let cli = Cli::parse_args();

    let output_format = cli.parse_output_format().map_err(RsqError::config)?;

    // Load configuration file
    let config_path = cli.config_path();
    debug!("loading config from {}", config_path.display());
    let config = Config::load_from_file(&config_path)?;

    // Build connection config with precedence:
    // 1. CLI arguments (highest)
    // 2. Named connection from config
    // 3. Default connection from config
    // 4. DATABASE_URL environment variable
    let connection = resolve_connection(&cli, &config)?.ok_or_else(|| {
        RsqError::config(
            "No database connection configured. \
             Pass a connection URL, use --connection, or set DATABASE_URL.",
        )
    })?;

    let sql = read_query(&cli)?;

    info!("connecting to {}", connection.display_string());
    let client = db::connect(&connection, cli.query_options()).await?;

    let outcome = client.execute_query(&sql).await;
    let _ = client.close().await;
    let result = outcome?;

    debug!(
        "query returned {} rows in {:?}",
        result.row_count(),
        result.elapsed
    );

    let rendered = OutputFormatter::new(output_format).format(&result)?;
    write_output(&cli, &rendered)
}

/// Resolves the final connection configuration from CLI args, config file,
/// and environment.
fn resolve_connection(cli: &Cli, config: &Config) -> Result<Option<ConnectionConfig>> {
    // Start with CLI connection config if provided
    let mut connection = cli.to_connection_config()?;

    // If no CLI connection, try named connection from config
    if connection.is_none() {
        if let Some(name) = cli.connection_name() {
            connection = config.get_connection(Some(name)).cloned();
            if connection.is_none() {
                return Err(RsqError::config(format!(
                    "Connection '{}' not found in config file",
                    name
                )));
            }
        }
    }

    // If still no connection, try default from config
    if connection.is_none() {
        connection = config.get_connection(None).cloned();
    }

    // Last resort: DATABASE_URL from the environment
    if connection.is_none() {
        if let Ok(url) = std::env::var("DATABASE_URL") {
            connection = Some(ConnectionConfig::from_connection_string(&url)?);
        }
    }

    // Apply environment variable defaults
    if let Some(ref mut conn) = connection {
        conn.apply_env_defaults();
    }

    Ok(connection)
}

/// Returns the SQL text to execute: the -e argument, or stdin.
fn read_query(cli: &Cli) -> Result<String> {
    let sql = match &cli.execute {
        Some(sql) => sql.clone(),
        None => {
            let mut buffer = String::new();
            std::io::stdin()
                .read_to_string(&mut buffer)
                .map_err(|e| RsqError::config(format!("Failed to read query from stdin: {e}")))?;
            buffer
        }
    };

    let sql = sql.trim().to_string();
    if sql.is_empty() {
        return Err(RsqError::config(
            "No SQL query provided. Pass one with -e or pipe it on stdin.",
        ));
    }

    Ok(sql)
}

/// Writes the rendered result to stdout or the --output-file path.
fn write_output(cli: &Cli, rendered: &str) -> Result<()> {
    match &cli.output_file {
        Some(path) => std::fs::write(path, format!("{rendered}\n"))
            .map_err(|e| RsqError::output(format!("Failed to write {}: {e}", path.display()))),
        None => {
            println!("{rendered}");
            Ok(())
        }
    }
}
