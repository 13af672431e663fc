//! `Authorization: Bearer <token>` extraction.

use crate::{errors::AppError, models::token::BearerCredential};
use axum::{
    extract::FromRequestParts,
    http::{header, request::Parts},
};

impl<S> FromRequestParts<S> for BearerCredential
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(BearerCredential::parse)
            .ok_or_else(|| AppError::unauthorized("missing or malformed bearer token"))
    }
}
