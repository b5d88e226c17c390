#![cfg(not(tarpaulin_include))]

use annual_report::app;
use annual_report::config::ServerConfig;

/// Main entry point for the report server
///
/// Reads `REPORT_BIND_ADDR`, `REPORT_DATA_DIR` and `REPORT_STATIC_DIR` from
/// the environment and serves the HTTP API until interrupted.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = ServerConfig::from_env();
    app::run(config).await
}
