//! HTTP middleware module.
//!
//! # Example
//!
//! ```ignore
//! use axum_helpers::http::create_cors_layer;
//!
//! let origins = vec!["http://localhost:5173".to_string()];
//! let app = Router::new().layer(create_cors_layer(&origins)?);
//! ```

pub mod cors;

pub use cors::{create_cors_layer, create_permissive_cors_layer};
