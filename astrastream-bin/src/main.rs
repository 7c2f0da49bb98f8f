use astrastream_core::{Server, ServerConfig};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = ServerConfig::from_env()?;

    let admin_token_tail = config.admin_token.as_deref().map(|token| {
        let skip = token.chars().count().saturating_sub(3);
        token.chars().skip(skip).collect::<String>()
    });
    tracing::info!(
        port = config.port,
        tick_interval_ms = config.tick_interval.as_millis() as u64,
        auth_endpoint = config.auth_endpoint.as_deref().unwrap_or("<permissive>"),
        admin_token_tail = admin_token_tail.as_deref().unwrap_or("<disabled>"),
        idle_timeout_secs = config.idle_timeout.map(|t| t.as_secs()),
        "starting astrastream"
    );

    Server::new(config).run().await?;

    Ok(())
}
