use std::sync::Arc;

use axum::Router;

use crate::app::services::AppServices;
use crate::middleware;

pub mod system;
pub mod users;

/// Router for every intercepted controller.
pub fn router(services: &AppServices) -> Router {
    let users = Arc::new(users::UserController::new(
        services.users.clone(),
        services.distances.clone(),
    ));

    Router::new().merge(middleware::intercepted(
        users,
        services.interceptor.clone(),
        services.body_limit,
    ))
}
