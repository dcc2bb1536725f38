//! API routes module

pub mod usuarios;

use axum::Router;
use axum_helpers::health_router;
use core_config::AppInfo;

/// Path the users resource is mounted under
pub const USERS_PATH: &str = "/usuarios";

/// Create all API routes
pub fn routes(app: AppInfo) -> Router {
    Router::new()
        .nest(USERS_PATH, usuarios::router())
        .merge(health_router(app))
}

/// Method and path of every endpoint served, for the startup banner
pub fn endpoints() -> Vec<(&'static str, String)> {
    vec![
        ("GET", USERS_PATH.to_string()),
        ("GET", format!("{USERS_PATH}/:id")),
        ("POST", USERS_PATH.to_string()),
        ("PUT", format!("{USERS_PATH}/:id")),
        ("DELETE", format!("{USERS_PATH}/:id")),
        ("GET", "/health".to_string()),
        ("GET", axum_helpers::server::app::OPENAPI_JSON_PATH.to_string()),
    ]
}
