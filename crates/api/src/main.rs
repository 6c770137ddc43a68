use anyhow::Context;

use depot_infra::AppConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = AppConfig::from_env().context("invalid configuration")?;
    depot_observability::init(config.log_format);

    let app = depot_api::app::build_app(&config)
        .await
        .context("failed to start the application")?;

    let listener = tokio::net::TcpListener::bind(config.bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.bind_addr))?;

    tracing::info!(
        addr = %listener.local_addr()?,
        persistent = config.use_persistent_stores,
        "listening"
    );

    axum::serve(listener, app).await.context("server error")?;
    Ok(())
}
