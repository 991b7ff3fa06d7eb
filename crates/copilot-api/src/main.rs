//! Support Copilot server

use anyhow::Context;
use copilot_api::{bootstrap, build_router, CopilotConfig};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = CopilotConfig::load().context("loading configuration")?;
    let addr = config.bind_addr()?;
    let (state, worker) = bootstrap(config).await.context("starting services")?;
    info!(ai_enabled = state.ai_enabled, forecast_ready = state.forecast.is_ready(), "services ready");

    let app = build_router(state);
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("binding {addr}"))?;
    info!("Support Copilot listening on {}", addr);
    info!("API docs at http://{}/docs", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("shutdown signal received");
        })
        .await?;

    worker.abort();
    Ok(())
}
