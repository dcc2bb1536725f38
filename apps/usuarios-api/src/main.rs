//! Usuarios API - in-memory user registry over REST

use axum_helpers::server::{create_app, create_router};
use core_config::tracing::{init_tracing, install_color_eyre};
use tracing::info;

mod api;
mod config;
mod openapi;

use config::Config;

#[tokio::main]
async fn main() -> eyre::Result<()> {
    install_color_eyre();

    let config = Config::from_env()?;
    init_tracing(&config.environment);

    let api_routes = api::routes(config.app);
    let app = create_router::<openapi::ApiDoc>(api_routes, &config.server)?;

    info!(
        "Starting {} v{} on {}",
        config.app.name,
        config.app.version,
        config.server.address()
    );
    for (method, path) in api::endpoints() {
        info!("  {:<6} http://localhost:{}{}", method, config.server.port, path);
    }

    create_app(app, &config.server)
        .await
        .map_err(|e| eyre::eyre!("Server error: {}", e))?;

    info!("Usuarios API shutdown complete");
    Ok(())
}
