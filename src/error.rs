//! Error responses for the HTTP API.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

use crate::auth::PasswordError;
use crate::db::StoreError;
use crate::models::ValidationError;
use crate::reconcile::ReconcileError;

#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("Email and password are required.")]
    MissingCredentials,

    #[error("Invalid email or password.")]
    InvalidCredentials,

    #[error("{0}")]
    NotFound(&'static str),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Password(#[from] PasswordError),

    #[error("Internal error: {0}")]
    Internal(String),
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: &'static str,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
}

/// Login failures keep the body shape the front end reads.
#[derive(Debug, Serialize)]
struct LoginErrorResponse {
    #[serde(rename = "LoginStatus")]
    login_status: bool,
    #[serde(rename = "Error")]
    error: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error, message, field) = match self {
            AppError::MissingCredentials | AppError::InvalidCredentials => {
                let status = match self {
                    AppError::MissingCredentials => StatusCode::BAD_REQUEST,
                    _ => StatusCode::UNAUTHORIZED,
                };
                let body = LoginErrorResponse {
                    login_status: false,
                    error: self.to_string(),
                };
                return (status, Json(body)).into_response();
            }
            AppError::Validation(ValidationError { field, message }) => (
                StatusCode::BAD_REQUEST,
                "validation_error",
                message,
                Some(field),
            ),
            AppError::Store(StoreError::Reconcile(ReconcileError::DuplicateId { table, id })) => (
                StatusCode::BAD_REQUEST,
                "validation_error",
                format!("row {id} is listed more than once"),
                Some(table.field_name().to_string()),
            ),
            AppError::NotFound(message) => {
                (StatusCode::NOT_FOUND, "not_found", message.to_string(), None)
            }
            AppError::Store(StoreError::Database(err)) => {
                tracing::error!(error = %err, "Storage error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "storage_error",
                    err.to_string(),
                    None,
                )
            }
            AppError::Password(err) => {
                tracing::error!(error = %err, "Password verification failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal_error",
                    "An unexpected error occurred".to_string(),
                    None,
                )
            }
            AppError::Internal(message) => {
                tracing::error!("Internal error: {message}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal_error",
                    "An unexpected error occurred".to_string(),
                    None,
                )
            }
        };

        let body = ErrorResponse {
            error,
            message,
            field,
        };

        (status, Json(body)).into_response()
    }
}
