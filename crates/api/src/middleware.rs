//! Glue between axum routing and the [`RequestInterceptor`].
//!
//! Controllers are composed with [`intercepted`], which puts every route of
//! the controller behind [`intercept_controller`]. A handler failure is
//! recognised by the [`ControllerFailure`] extension that [`ApiError`] leaves
//! on its response.

use std::fmt;
use std::sync::Arc;

use axum::{
    Router,
    extract::{MatchedPath, Request, State},
    http::{Method, StatusCode},
    middleware::Next,
    response::Response,
};

use ridepool_observability::{CallSite, Interceptable, RequestInterceptor};

use crate::app::errors::{ApiError, json_error};
use crate::context::HttpExchange;

/// A component exposing HTTP routes whose calls are intercepted.
pub trait Controller: Interceptable + 'static {
    fn routes(self: Arc<Self>) -> Router;

    /// Operation serving `method` on `route`, the matched route pattern.
    /// Calls without a name are identified as `"<METHOD> <route>"`.
    fn operation(&self, _method: &Method, _route: &str) -> Option<&'static str> {
        None
    }
}

/// Marks a response rendered from a failing controller operation.
#[derive(Debug, Clone)]
pub struct ControllerFailure(pub Arc<ApiError>);

#[derive(Clone)]
pub struct InterceptionState {
    controller: Arc<dyn Controller>,
    interceptor: Arc<RequestInterceptor>,
    body_limit: usize,
}

/// Route every call of `controller` through `interceptor`.
pub fn intercepted<C: Controller>(
    controller: Arc<C>,
    interceptor: Arc<RequestInterceptor>,
    body_limit: usize,
) -> Router {
    let state = InterceptionState {
        controller: controller.clone(),
        interceptor,
        body_limit,
    };
    controller
        .routes()
        .route_layer(axum::middleware::from_fn_with_state(state, intercept_controller))
}

/// A failed controller call: the error and the response already rendered for it.
struct Raised {
    error: Arc<ApiError>,
    response: Response,
}

impl fmt::Display for Raised {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.error, f)
    }
}

impl fmt::Debug for Raised {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&self.error, f)
    }
}

fn split_failure(mut response: Response) -> Result<Response, Raised> {
    match response.extensions_mut().remove::<ControllerFailure>() {
        Some(ControllerFailure(error)) => Err(Raised { error, response }),
        None => Ok(response),
    }
}

pub async fn intercept_controller(
    State(state): State<InterceptionState>,
    req: Request,
    next: Next,
) -> Response {
    let route = match req.extensions().get::<MatchedPath>() {
        Some(matched) => matched.as_str().to_string(),
        None => req.uri().path().to_string(),
    };
    let operation = match state.controller.operation(req.method(), &route) {
        Some(name) => name.to_string(),
        None => format!("{} {}", req.method(), route),
    };

    let exchange = HttpExchange::new(req, state.body_limit);
    let exchange_ref = &exchange;

    let outcome = state
        .interceptor
        .intercept(
            CallSite::new(state.controller.target(), &operation),
            Some(exchange_ref),
            || async move {
                let Some(req) = exchange_ref.take_request() else {
                    return Ok(json_error(
                        StatusCode::INTERNAL_SERVER_ERROR,
                        "internal_error",
                        "request was consumed before reaching the handler",
                    ));
                };
                split_failure(next.run(req).await)
            },
        )
        .await;

    match outcome {
        Ok(response) => response,
        Err(Raised { mut response, .. }) => {
            if let Some(status) = exchange.status_override() {
                *response.status_mut() = status;
            }
            response
        }
    }
}
