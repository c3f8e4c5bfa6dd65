use anyhow::Result;
use std::sync::Arc;

use snowload::config::Settings;
use snowload::server::McpServer;
use snowload::snowflake::SnowflakeConnector;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment
    dotenvy::dotenv().ok();

    // stdout is the MCP transport, so all diagnostics go to stderr.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();
    tracing::info!("Server startup: tracing initialised, environment loaded");

    // Configuration gate: validate everything before serving a single call.
    let settings = match Settings::from_env() {
        Ok(settings) => settings,
        Err(err) => {
            tracing::error!(error = %err, "Configuration error");
            eprintln!("snowload: configuration error: {err}");
            std::process::exit(1);
        }
    };

    let connector = Arc::new(SnowflakeConnector::new(&settings));
    let server = McpServer::new(settings, connector);

    tokio::select! {
        result = server.run() => {
            if let Err(err) = result {
                tracing::error!(error = %err, "Server failed");
                eprintln!("snowload: fatal error: {err}");
                std::process::exit(1);
            }
            tracing::info!("Server stopped: stdin closed");
        }
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Server stopped by user");
        }
    }

    Ok(())
}
