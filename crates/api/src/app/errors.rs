//! Consistent error responses.
//!
//! Two families: [`ApiError`] is raised by a controller operation and is
//! tagged as a failure for the interception middleware; [`Rejection`] happens
//! while extracting/validating input, before the controller runs.

use std::sync::Arc;

use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use thiserror::Error;

use ridepool_core::DomainError;
use ridepool_infra::{DistanceError, UserServiceError};

use crate::app::dto::Violation;
use crate::middleware::ControllerFailure;

/// Failure raised inside a controller operation.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Users(#[from] UserServiceError),

    #[error(transparent)]
    Distance(#[from] DistanceError),

    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            ApiError::Users(UserServiceError::Domain(e)) => match e {
                DomainError::NotFound => (StatusCode::NOT_FOUND, "not_found"),
                DomainError::Conflict(_) => (StatusCode::CONFLICT, "conflict"),
                DomainError::InvalidId(_) => (StatusCode::BAD_REQUEST, "invalid_id"),
            },
            ApiError::Users(UserServiceError::Storage(_)) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "store_error")
            }
            ApiError::Distance(_) => (StatusCode::BAD_GATEWAY, "distance_error"),
            ApiError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "internal_error"),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();
        let mut response = json_error(status, code, self.to_string());
        response
            .extensions_mut()
            .insert(ControllerFailure(Arc::new(self)));
        response
    }
}

/// Input refused before the controller runs.
#[derive(Debug, Error)]
pub enum Rejection {
    #[error(transparent)]
    Json(#[from] JsonRejection),

    #[error(transparent)]
    Query(#[from] QueryRejection),

    #[error(transparent)]
    Path(#[from] PathRejection),

    #[error("{0}")]
    InvalidId(DomainError),

    #[error("{}", join_violations(.0))]
    Invalid(Vec<Violation>),
}

fn join_violations(violations: &[Violation]) -> String {
    violations
        .iter()
        .map(|v| v.message.as_str())
        .collect::<Vec<_>>()
        .join(" ")
}

impl IntoResponse for Rejection {
    fn into_response(self) -> Response {
        match self {
            Rejection::Json(e) => json_error(e.status(), "invalid_json", e.body_text()),
            Rejection::Query(e) => json_error(e.status(), "invalid_query", e.body_text()),
            Rejection::Path(e) => json_error(e.status(), "invalid_path", e.body_text()),
            Rejection::InvalidId(e) => json_error(StatusCode::BAD_REQUEST, "invalid_id", e.to_string()),
            Rejection::Invalid(violations) => (
                StatusCode::BAD_REQUEST,
                axum::Json(json!({
                    "error": "validation_error",
                    "message": join_violations(&violations),
                    "violations": violations,
                })),
            )
                .into_response(),
        }
    }
}

pub fn json_error(
    status: StatusCode,
    code: &'static str,
    message: impl Into<String>,
) -> Response {
    (
        status,
        axum::Json(json!({
            "error": code,
            "message": message.into(),
        })),
    )
        .into_response()
}
