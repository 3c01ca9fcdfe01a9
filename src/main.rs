use std::sync::Arc;

use acai_bot::adapter::BotAdapter;
use acai_bot::cli::CliSession;
use acai_bot::config::{BotConfig, StorageBackend};
use acai_bot::routes::{BotRouteState, bot_routes};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let config = BotConfig::from_env()?;
    let adapter = Arc::new(BotAdapter::from_config(&config).await?);

    let storage = match &config.storage {
        StorageBackend::Memory => "in-memory".to_string(),
        StorageBackend::LibSql(path) => path.display().to_string(),
    };

    if std::env::args().any(|arg| arg == "--cli") {
        eprintln!("🥣 Açaí Bot v{} (CLI)", env!("CARGO_PKG_VERSION"));
        eprintln!("   Locale: {}", config.locale);
        eprintln!("   Storage: {}", storage);
        eprintln!("   Type a message and press Enter. /quit to exit.\n");
        CliSession::new(adapter).run_stdio().await?;
        return Ok(());
    }

    let addr = config.bind_addr();
    eprintln!("🥣 Açaí Bot v{}", env!("CARGO_PKG_VERSION"));
    eprintln!("   Messages: http://{}/api/messages", addr);
    eprintln!("   Profiles: http://{}/api/profiles/{{channel}}/{{user}}", addr);
    eprintln!("   Locale: {}", config.locale);
    eprintln!("   Storage: {}", storage);

    let app = bot_routes(BotRouteState { adapter });
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(addr = %addr, "Bot server listening");
    axum::serve(listener, app).await?;

    Ok(())
}
