use anyhow::Context;
use docqa_server::config::{AppConfig, load_dotenv, telemetry_config};
use docqa_server::run_server;
use docqa_telemetry::init_telemetry;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let dotenv = load_dotenv();

    init_telemetry(&telemetry_config().context("invalid logging configuration")?)?;
    match &dotenv {
        Some(path) => tracing::info!(path = %path.display(), "loaded environment file"),
        None => tracing::info!("no .env file found, using the process environment"),
    }

    let config = AppConfig::from_env().context("invalid configuration")?;
    run_server(config).await
}
