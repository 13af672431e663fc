use crate::services::{
    credential_store::CredentialError, identity_service::IdentityError,
    inventory_store::InventoryError, rental_coordinator::RentalError,
};
use axum::{
    Json,
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use std::fmt;

/// A lightweight wrapper for general errors that keeps the message local.
///
/// Every service error is mapped into one of these at the HTTP boundary;
/// storage and hashing faults are logged here and reduced to a generic 500.
#[derive(Debug)]
pub struct AppError {
    pub status: StatusCode,
    pub message: String,
}

impl AppError {
    /// Create a new AppError with a specific status and message.
    pub fn new(status: StatusCode, msg: impl Into<String>) -> Self {
        Self {
            status,
            message: msg.into(),
        }
    }

    /// Shortcut for a 500 Internal Server Error
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, msg)
    }

    /// Shortcut for 404 Not Found
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, msg)
    }

    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, msg)
    }

    pub fn unauthorized(msg: impl Into<String>) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, msg)
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::new(StatusCode::CONFLICT, msg)
    }

    /// 400 naming every required field that was absent or empty.
    pub fn missing_fields(fields: &[&str]) -> Self {
        Self::bad_request(format!("missing or empty fields: {}", fields.join(", ")))
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for AppError {}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = Json(json!({
            "error": self.message,
            "status": self.status.as_u16()
        }));

        (self.status, body).into_response()
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::new(rejection.status(), rejection.body_text())
    }
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        AppError::new(rejection.status(), rejection.body_text())
    }
}

impl From<PathRejection> for AppError {
    fn from(rejection: PathRejection) -> Self {
        AppError::new(rejection.status(), rejection.body_text())
    }
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        tracing::error!(error = %err, "database failure");
        AppError::internal("internal storage error")
    }
}

impl From<CredentialError> for AppError {
    fn from(err: CredentialError) -> Self {
        match err {
            CredentialError::NotFound => AppError::not_found("account not found"),
            CredentialError::Conflict(field) => {
                AppError::conflict(format!("an account with this {field} already exists"))
            }
            CredentialError::PolicyViolation(violation) => {
                AppError::bad_request(violation.to_string())
            }
            CredentialError::Sqlx(err) => err.into(),
            other => {
                tracing::error!(error = %other, "credential processing failed");
                AppError::internal("internal error")
            }
        }
    }
}

impl From<IdentityError> for AppError {
    fn from(err: IdentityError) -> Self {
        match err {
            IdentityError::Unauthenticated => AppError::unauthorized("invalid or expired token"),
            IdentityError::Unauthorized => AppError::unauthorized("invalid credentials"),
            IdentityError::Credential(err) => err.into(),
            IdentityError::Token(err) => {
                tracing::error!(error = %err, "token signing failed");
                AppError::internal("internal error")
            }
        }
    }
}

impl From<InventoryError> for AppError {
    fn from(err: InventoryError) -> Self {
        match err {
            InventoryError::NotFound(id) => AppError::not_found(format!("car {id} does not exist")),
            InventoryError::OutOfStock(id) => {
                AppError::conflict(format!("car {id} is not available for rent"))
            }
            InventoryError::Conflict(field) => {
                AppError::conflict(format!("a car with this {field} already exists"))
            }
            InventoryError::NegativeStock => AppError::bad_request("stock cannot be negative"),
            InventoryError::Sqlx(err) => err.into(),
        }
    }
}

impl From<RentalError> for AppError {
    fn from(err: RentalError) -> Self {
        match err {
            RentalError::Unauthenticated => AppError::unauthorized("invalid or expired token"),
            RentalError::Unauthorized => AppError::unauthorized("could not verify the account"),
            RentalError::EntryMissing(id) => {
                AppError::not_found(format!("car {id} does not exist"))
            }
            RentalError::OutOfStock { car_id, .. } => {
                AppError::conflict(format!("car {car_id} is not available for rent"))
            }
            RentalError::UpstreamUnavailable { status, .. } => {
                let status = status
                    .filter(|s| s.is_client_error() || s.is_server_error())
                    .unwrap_or(StatusCode::BAD_GATEWAY);
                AppError::new(status, "could not verify the account")
            }
            RentalError::Inventory(err) => err.into(),
        }
    }
}
