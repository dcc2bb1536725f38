use super::shutdown::ShutdownCoordinator;
use crate::errors::handlers::{handle_panic, route_not_found};
use crate::http::{create_cors_layer, create_permissive_cors_layer};
use axum::{Json, Router, ServiceExt, extract::Request, routing::get};
use core_config::server::ServerConfig;
use std::future::IntoFuture;
use std::io;
use std::time::Duration;
use tokio::net::TcpListener;
use tower::Layer;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::normalize_path::{NormalizePath, NormalizePathLayer};
use tower_http::trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer};
use tracing::{Level, info, warn};
use utoipa::OpenApi;

/// Path the generated OpenAPI document is served from.
pub const OPENAPI_JSON_PATH: &str = "/api-docs/openapi.json";

/// Binds the configured address and serves `router` until SIGINT/SIGTERM.
///
/// # Errors
/// Returns an error if:
/// - The TCP listener fails to bind to the configured address
/// - The server encounters an error during operation
///
/// # Example
/// ```ignore
/// use axum::Router;
/// use core_config::server::ServerConfig;
/// use axum_helpers::server::create_app;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let router = Router::new();
///     let config = ServerConfig::default();
///     create_app(router, &config).await?;
///     Ok(())
/// }
/// ```
pub async fn create_app(router: Router, server_config: &ServerConfig) -> io::Result<()> {
    let listener = TcpListener::bind(server_config.address()).await?;
    serve(listener, router, server_config.shutdown_timeout).await
}

/// Serves `router` on an already bound listener with graceful shutdown.
///
/// Once a shutdown signal arrives the server stops accepting connections and
/// waits up to `shutdown_timeout` for in-flight requests before returning.
pub async fn serve(
    listener: TcpListener,
    router: Router,
    shutdown_timeout: Duration,
) -> io::Result<()> {
    let (coordinator, mut deadline_rx) = ShutdownCoordinator::new();
    let mut graceful_rx = coordinator.subscribe();

    info!("Server starting on {}", listener.local_addr()?);

    let signal_handle = {
        let coordinator = coordinator.clone();
        tokio::spawn(async move { coordinator.wait_for_signal().await })
    };

    let app = normalize_paths(router);
    let server = axum::serve(listener, ServiceExt::<Request>::into_make_service(app))
        .with_graceful_shutdown(async move {
            let _ = graceful_rx.recv().await;
        })
        .into_future();

    let deadline = async move {
        let _ = deadline_rx.recv().await;
        tokio::time::sleep(shutdown_timeout).await;
    };

    let result = tokio::select! {
        result = server => result.inspect_err(|e| {
            tracing::error!("Server encountered an error: {:?}", e);
        }),
        _ = deadline => {
            warn!(
                "In-flight requests did not finish within {:?}, forcing shutdown",
                shutdown_timeout
            );
            Ok(())
        }
    };

    signal_handle.abort();
    result
}

/// Strips a trailing slash before routing, so `/usuarios/` and `/usuarios/1/`
/// reach the same handlers as `/usuarios` and `/usuarios/1`.
///
/// Has to wrap the finished router: a `Router::layer` runs after the route
/// has already been matched.
pub fn normalize_paths(router: Router) -> NormalizePath<Router> {
    NormalizePathLayer::trim_trailing_slash().layer(router)
}

/// Wraps the API routes with the cross-cutting layers every service shares.
///
/// This function sets up:
/// - `GET /api-docs/openapi.json` serving `T::openapi()`
/// - A `{ "erro": "Rota não encontrada" }` 404 for unknown paths *and* for
///   known paths called with an unsupported method
/// - Panic boundary: a panicking handler yields a generic 500
/// - Request tracing (method, URI, status, latency)
/// - CORS: any origin when `cors_allowed_origins` is empty, otherwise only
///   the listed origins
///
/// `apis` is merged at the root, so its paths are served as-is.
///
/// # Errors
/// Returns `InvalidInput` if an allowed CORS origin is not a valid header value.
pub fn create_router<T>(apis: Router, server_config: &ServerConfig) -> io::Result<Router>
where
    T: OpenApi + 'static,
{
    let cors_layer = if server_config.cors_allowed_origins.is_empty() {
        info!("CORS configured to accept any origin");
        create_permissive_cors_layer()
    } else {
        info!(
            "CORS configured with allowed origins: {}",
            server_config.cors_allowed_origins.join(",")
        );
        create_cors_layer(&server_config.cors_allowed_origins)?
    };

    let openapi = T::openapi();

    let router = Router::new()
        .route(
            OPENAPI_JSON_PATH,
            get(move || {
                let doc = openapi.clone();
                async move { Json(doc) }
            }),
        )
        .merge(apis)
        .fallback(route_not_found)
        .method_not_allowed_fallback(route_not_found)
        .layer(CatchPanicLayer::custom(handle_panic))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_request(DefaultOnRequest::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(cors_layer);

    Ok(router)
}
