use std::net::SocketAddr;

use anyhow::Context;

use ridepool_api::app::{build_app, services::AppServices};
use ridepool_api::config::Settings;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let settings = Settings::from_env().context("invalid configuration")?;
    ridepool_observability::init(settings.log_format);

    let services = AppServices::build(&settings)?;
    let app = build_app(&services);

    let listener = tokio::net::TcpListener::bind(settings.bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", settings.bind_addr))?;

    tracing::info!("listening on {}", listener.local_addr()?);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;
    Ok(())
}
