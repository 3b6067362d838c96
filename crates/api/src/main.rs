use anyhow::Context;

use docgate_api::config::Config;
use docgate_observability::LogFormat;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Logging comes up before the rest of the config so its warnings are seen.
    let log_format = std::env::var("LOG_FORMAT")
        .ok()
        .and_then(|raw| raw.parse().ok())
        .unwrap_or(LogFormat::Json);
    docgate_observability::init(log_format);

    let config = Config::from_env()?;

    let app = docgate_api::app::build_app(&config).await?;

    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;

    tracing::info!("listening on {}", listener.local_addr()?);

    axum::serve(listener, app.router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    app.ingestion_worker.shutdown().await;
    tracing::info!("shut down");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for shutdown signal");
    }
}
