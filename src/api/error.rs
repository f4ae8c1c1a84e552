use crate::error::{Error, TransitionError};
use axum::{
    extract::rejection::{JsonRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

/// Error response body
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
}

/// HTTP face of the crate error; every typed outcome keeps its own status code.
#[derive(Debug)]
pub struct ApiError(pub Error);

pub type ApiResult<T> = std::result::Result<T, ApiError>;

impl From<Error> for ApiError {
    fn from(e: Error) -> Self {
        ApiError(e)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError(Error::InvalidInput(rejection.body_text()))
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError(Error::InvalidInput(rejection.body_text()))
    }
}

impl ApiError {
    pub fn status_and_code(&self) -> (StatusCode, &'static str) {
        match &self.0 {
            Error::NotFound(_) => (StatusCode::NOT_FOUND, "NOT_FOUND"),
            Error::Forbidden(_) => (StatusCode::FORBIDDEN, "FORBIDDEN"),
            Error::Transition(TransitionError::InvalidStage { .. }) => {
                (StatusCode::BAD_REQUEST, "INVALID_STAGE")
            }
            Error::Transition(TransitionError::TerminalState(_)) => {
                (StatusCode::BAD_REQUEST, "TERMINAL_STATE")
            }
            Error::Conflict(_) => (StatusCode::CONFLICT, "CONFLICT"),
            Error::InvalidClaims(_) => (StatusCode::UNAUTHORIZED, "INVALID_CLAIMS"),
            Error::InvalidInput(_) => (StatusCode::BAD_REQUEST, "INVALID_INPUT"),
            Error::AlreadySubmitted(_) => (StatusCode::CONFLICT, "ALREADY_SUBMITTED"),
            Error::PaymentNotAllowed(_) => (StatusCode::BAD_REQUEST, "PAYMENT_NOT_ALLOWED"),
            Error::Storage(_) | Error::Server(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR")
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();

        let message = match &self.0 {
            Error::Storage(detail) | Error::Server(detail) => {
                tracing::error!(error = %detail, "request failed");
                "Internal error".to_string()
            }
            other => other.to_string(),
        };

        let body = ErrorResponse {
            error: message,
            code: code.to_string(),
        };
        (status, Json(body)).into_response()
    }
}
