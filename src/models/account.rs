//! Accounts owned by the identity service.

use chrono::{DateTime, Utc};
use sqlx::FromRow;
use std::fmt;

/// Identifier assigned by the identity store on registration.
pub type AccountId = i64;

/// A registered account.
///
/// `email` and `username` are each unique across the store. The password is
/// only ever held as an Argon2id PHC string.
#[derive(Clone, FromRow)]
pub struct Account {
    pub id: AccountId,
    pub email: String,
    pub username: String,
    pub password_digest: String,
    pub created_at: DateTime<Utc>,
}

impl fmt::Debug for Account {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Account")
            .field("id", &self.id)
            .field("email", &self.email)
            .field("username", &self.username)
            .field("password_digest", &"<redacted>")
            .field("created_at", &self.created_at)
            .finish()
    }
}

/// The unique keys an account can be resolved by.
#[derive(Debug, Clone, Copy)]
pub enum AccountKey<'a> {
    Email(&'a str),
    Username(&'a str),
}

/// Registration input after boundary validation.
#[derive(Clone)]
pub struct NewAccount {
    pub email: String,
    pub username: String,
    pub password: String,
}

/// Login input after boundary validation. At least one of `email` or
/// `username` is present.
#[derive(Clone)]
pub struct LoginRequest {
    pub email: Option<String>,
    pub username: Option<String>,
    pub password: String,
}

impl LoginRequest {
    /// Lookup keys in the order they are tried: email first, then username.
    pub fn keys(&self) -> impl Iterator<Item = AccountKey<'_>> {
        self.email
            .as_deref()
            .map(AccountKey::Email)
            .into_iter()
            .chain(self.username.as_deref().map(AccountKey::Username))
    }
}
