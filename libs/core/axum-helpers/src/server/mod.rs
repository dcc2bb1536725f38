//! Server infrastructure module.
//!
//! This module provides:
//! - Router assembly with cross-cutting middleware and OpenAPI JSON
//! - Health endpoint
//! - Graceful shutdown coordination
//!
//! # Example
//!
//! ```ignore
//! use axum_helpers::server::{create_app, create_router, health_router};
//! use core_config::{server::ServerConfig, app_info};
//!
//! let apis = api_routes.merge(health_router(app_info!()));
//! let router = create_router::<ApiDoc>(apis, &config)?;
//! create_app(router, &config).await?;
//! ```

pub mod app;
pub mod health;
pub mod shutdown;

pub use app::{create_app, create_router, normalize_paths, serve};
pub use health::{HealthResponse, health_router};
pub use shutdown::{ShutdownCoordinator, shutdown_signal};
