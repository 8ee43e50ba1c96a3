use std::sync::Arc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    stockroom_observability::init();

    let config = stockroom_api::config::Config::from_env()?;

    let services = Arc::new(stockroom_api::app::services::build_services(&config).await?);
    let app = stockroom_api::app::build_app(services);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    tracing::info!("listening on {}", listener.local_addr()?);

    axum::serve(listener, app).await?;
    Ok(())
}
