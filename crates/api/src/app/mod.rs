//! HTTP API application wiring (Axum router + service wiring).
//!
//! - `services.rs`: sink, interceptors and timed backends
//! - `routes/`: controllers and their handlers
//! - `dto.rs`: request DTOs, validation and extractors
//! - `errors.rs`: consistent error responses

use axum::{routing::get, Router};

pub mod dto;
pub mod errors;
pub mod routes;
pub mod services;

use services::AppServices;

/// Build the full HTTP router (public entrypoint used by `main.rs`).
///
/// Serve it with `into_make_service_with_connect_info::<SocketAddr>()` so
/// access events carry the client address.
pub fn build_app(services: &AppServices) -> Router {
    Router::new()
        .route("/health", get(routes::system::health))
        .merge(routes::router(services))
}
