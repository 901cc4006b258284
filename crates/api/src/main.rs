use anyhow::Context;

use silos_api::config::Config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    silos_observability::init();

    let config = Config::from_env().context("invalid configuration")?;
    let app = silos_api::app::build_app(&config)
        .await
        .context("failed to initialize silo store")?;

    let listener = tokio::net::TcpListener::bind(config.bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.bind_addr))?;

    tracing::info!(
        addr = %listener.local_addr()?,
        delete_policy = config.policy.delete.as_str(),
        retain_cereal_on_empty = config.policy.retain_cereal_on_empty,
        "listening"
    );

    axum::serve(listener, app).await.context("server error")?;
    Ok(())
}
