mod agent;
mod config;
mod graph;
mod providers;
mod server;
mod state;
mod streaming;
mod time_utils;
mod tools;
mod traits;

#[cfg(test)]
mod testing;

use std::path::PathBuf;
use std::sync::Arc;

use tracing_subscriber::EnvFilter;

fn main() -> anyhow::Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config_path = PathBuf::from("config.toml");
    let config = config::AppConfig::load(&config_path)?;

    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?
        .block_on(run(config))
}

async fn run(config: config::AppConfig) -> anyhow::Result<()> {
    let tz = config.timezone()?;

    let provider = Arc::new(
        providers::OpenAiCompatibleProvider::new(
            &config.provider.base_url,
            &config.provider.api_key,
        )
        .map_err(|e| anyhow::anyhow!(e))?,
    );

    let agent = Arc::new(agent::Agent::new(
        provider,
        config.provider.model.clone(),
        tz,
        config.pipeline.max_tool_iterations,
    ));

    server::serve(agent, &config.server).await
}
