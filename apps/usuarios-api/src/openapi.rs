//! OpenAPI documentation configuration

use utoipa::OpenApi;

/// Combined OpenAPI documentation for Usuarios API
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Usuarios API",
        version = "0.1.0",
        description = "In-memory user registry (CRUD over /usuarios)"
    ),
    servers(
        (url = "http://localhost:3000", description = "Local development server")
    ),
    nest(
        (path = "/usuarios", api = domain_users::ApiDoc)
    ),
    tags(
        (name = "Usuarios", description = "User management endpoints")
    )
)]
pub struct ApiDoc;
