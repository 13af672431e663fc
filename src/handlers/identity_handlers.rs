//! HTTP handlers for the identity service: registration, login and the
//! subject verification endpoint the inventory service calls.

use crate::{
    errors::AppError,
    handlers::{non_blank, required_text},
    models::{
        account::{AccountId, LoginRequest, NewAccount},
        token::BearerCredential,
    },
    state::IdentityState,
};
use axum::{
    Json,
    extract::{
        Query, State,
        rejection::{JsonRejection, QueryRejection},
    },
    http::StatusCode,
    response::IntoResponse,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Deserialize)]
pub struct RegisterBody {
    pub email: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
}

impl RegisterBody {
    fn validate(self) -> Result<NewAccount, AppError> {
        let mut missing = Vec::new();
        let email = required_text(self.email, "email", &mut missing);
        let username = required_text(self.username, "username", &mut missing);
        let password = required_text(self.password, "password", &mut missing);
        if !missing.is_empty() {
            return Err(AppError::missing_fields(&missing));
        }

        Ok(NewAccount {
            email,
            username,
            password,
        })
    }
}

#[derive(Deserialize)]
pub struct LoginBody {
    pub email: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
}

impl LoginBody {
    fn validate(self) -> Result<LoginRequest, AppError> {
        let email = non_blank(self.email);
        let username = non_blank(self.username);
        let has_key = email.is_some() || username.is_some();
        match (non_blank(self.password), has_key) {
            (Some(password), true) => Ok(LoginRequest {
                email,
                username,
                password,
            }),
            _ => Err(AppError::bad_request("email or username, and password, are required")),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct VerifyQuery {
    pub email: Option<String>,
}

#[derive(Serialize)]
struct AccountMessage {
    message: String,
    user_id: AccountId,
}

#[derive(Serialize)]
struct LoginResponse {
    message: &'static str,
    token: String,
    expires_at: DateTime<Utc>,
}

/// `POST /register`
pub async fn register(
    State(state): State<IdentityState>,
    payload: Result<Json<RegisterBody>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let Json(body) = payload?;
    let account = body.validate()?;
    let user_id = state.identity.register(account).await?;

    Ok((
        StatusCode::CREATED,
        Json(AccountMessage {
            message: "account registered".into(),
            user_id,
        }),
    ))
}

/// `POST /login`: by email or username. Unknown accounts and wrong
/// passwords get the same 401.
pub async fn login(
    State(state): State<IdentityState>,
    payload: Result<Json<LoginBody>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let Json(body) = payload?;
    let request = body.validate()?;
    let issued = state.identity.login(&request).await?;

    Ok(Json(LoginResponse {
        message: "login succeeded",
        token: issued.token,
        expires_at: issued.expires_at,
    }))
}

/// `GET /verify_user?email=...`
///
/// 200 only when the bearer token's subject owns `email`; 401 otherwise.
pub async fn verify_user(
    State(state): State<IdentityState>,
    credential: BearerCredential,
    query: Result<Query<VerifyQuery>, QueryRejection>,
) -> Result<impl IntoResponse, AppError> {
    let Query(query) = query?;
    let email = non_blank(query.email)
        .ok_or_else(|| AppError::bad_request("email is required"))?;
    let user_id = state
        .identity
        .verify_subject(credential.token(), &email)
        .await?;

    Ok(Json(AccountMessage {
        message: "account verified".into(),
        user_id,
    }))
}

/// `GET /protected`: echoes the subject of a valid token.
pub async fn protected(
    State(state): State<IdentityState>,
    credential: BearerCredential,
) -> Result<impl IntoResponse, AppError> {
    let user_id = state.identity.authenticate(credential.token())?;

    Ok(Json(AccountMessage {
        message: format!("access granted for account {user_id}"),
        user_id,
    }))
}
