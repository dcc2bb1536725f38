//! Usuarios API routes

use axum::Router;
use domain_users::{handlers, InMemoryUserRepository, UserService};

/// Create the users router backed by a fresh in-memory store
pub fn router() -> Router {
    let repository = InMemoryUserRepository::new();
    let service = UserService::new(repository);
    handlers::router(service)
}
