use anyhow::{Context, Result};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use nexushub_webhooks::config::Config;
use nexushub_webhooks::http_server;
use nexushub_webhooks::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::load()?;

    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(format!("{},tower_http=info", config.log_level))),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let addr = config.server_addr()?;
    let state = AppState::initialize(&config)
        .await
        .context("failed to initialize application state")?;

    let app = http_server::router(state, config.request_timeout());
    http_server::serve(addr, app)
        .await
        .context("HTTP server failed")?;
    Ok(())
}
