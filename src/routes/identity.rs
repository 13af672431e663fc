//! Routes served by the identity service.
//!
//! - `POST /register`: create an account
//! - `POST /login`: exchange credentials for a bearer token
//! - `GET /verify_user`: confirm the bearer owns `?email=`
//! - `GET /protected`: echo the bearer's subject

use crate::{
    handlers::{
        health_handlers::{healthz, readyz},
        identity_handlers::{login, protected, register, verify_user},
    },
    state::IdentityState,
};
use axum::{
    Router,
    routing::{get, post},
};

pub fn routes() -> Router<IdentityState> {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/verify_user", get(verify_user))
        .route("/protected", get(protected))
}
