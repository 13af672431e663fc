//! CredentialStore: account records and password verification.
//!
//! Uniqueness of `email` and `username` is enforced by the store's UNIQUE
//! constraints, never by a read-then-insert check. Passwords are hashed with
//! Argon2id on the blocking pool and verified through `PasswordVerifier`,
//! which compares digests in constant time.

use crate::{
    db::unique_violation_column,
    models::account::{Account, AccountKey, NewAccount},
};
use argon2::{
    Algorithm, Argon2, Params, PasswordHash, PasswordHasher, PasswordVerifier, Version,
    password_hash::{SaltString, rand_core::OsRng},
};
use chrono::Utc;
use sqlx::SqlitePool;
use thiserror::Error;
use tokio::task;
use tracing::{debug, error};

pub const PASSWORD_MIN_LEN: usize = 8;
pub const PASSWORD_MAX_LEN: usize = 15;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum PolicyViolation {
    #[error("password must be between 8 and 15 characters")]
    Length,
    #[error("password must contain an uppercase letter")]
    MissingUppercase,
    #[error("password must contain a lowercase letter")]
    MissingLowercase,
    #[error("password must contain a punctuation symbol")]
    MissingPunctuation,
}

#[derive(Debug, Error)]
pub enum CredentialError {
    #[error("account not found")]
    NotFound,
    #[error("{0} is already registered")]
    Conflict(String),
    #[error(transparent)]
    PolicyViolation(#[from] PolicyViolation),
    #[error("password hashing failed: {0}")]
    Hashing(String),
    #[error("password hashing task failed: {0}")]
    Join(#[from] task::JoinError),
    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
}

pub type CredentialResult<T> = Result<T, CredentialError>;

/// Check `password` against the account password policy: 8 to 15
/// characters with at least one ASCII uppercase letter, one ASCII lowercase
/// letter and one ASCII punctuation symbol (``!"#$%&'()*+,-./:;<=>?@[\]^_`{|}~``).
pub fn validate_password(password: &str) -> Result<(), PolicyViolation> {
    let len = password.chars().count();
    if !(PASSWORD_MIN_LEN..=PASSWORD_MAX_LEN).contains(&len) {
        return Err(PolicyViolation::Length);
    }
    if !password.chars().any(|c| c.is_ascii_uppercase()) {
        return Err(PolicyViolation::MissingUppercase);
    }
    if !password.chars().any(|c| c.is_ascii_lowercase()) {
        return Err(PolicyViolation::MissingLowercase);
    }
    if !password.chars().any(|c| c.is_ascii_punctuation()) {
        return Err(PolicyViolation::MissingPunctuation);
    }
    Ok(())
}

/// Argon2id cost parameters.
#[derive(Debug, Clone, Copy)]
pub struct HashingConfig {
    pub memory_kib: u32,
    pub iterations: u32,
    pub parallelism: u32,
}

impl Default for HashingConfig {
    fn default() -> Self {
        Self {
            memory_kib: Params::DEFAULT_M_COST,
            iterations: Params::DEFAULT_T_COST,
            parallelism: Params::DEFAULT_P_COST,
        }
    }
}

#[derive(Clone)]
pub struct CredentialStore {
    db: SqlitePool,
    hasher: Argon2<'static>,
    /// Digest of a random password, verified against when an account is
    /// missing so both login failure paths cost the same.
    decoy_digest: String,
}

impl CredentialStore {
    pub fn new(db: SqlitePool, config: HashingConfig) -> CredentialResult<Self> {
        let params = Params::new(
            config.memory_kib,
            config.iterations,
            config.parallelism,
            None,
        )
        .map_err(|err| CredentialError::Hashing(err.to_string()))?;
        let hasher = Argon2::new(Algorithm::Argon2id, Version::V0x13, params);

        let decoy_salt = SaltString::generate(&mut OsRng);
        let decoy_digest = hasher
            .hash_password(decoy_salt.as_str().as_bytes(), &decoy_salt)
            .map_err(|err| CredentialError::Hashing(err.to_string()))?
            .to_string();

        Ok(Self {
            db,
            hasher,
            decoy_digest,
        })
    }

    /// Resolve an account by email or username.
    pub async fn lookup(&self, key: AccountKey<'_>) -> CredentialResult<Account> {
        let (sql, value) = match key {
            AccountKey::Email(email) => (
                "SELECT id, email, username, password_digest, created_at
                 FROM accounts WHERE email = ?",
                email,
            ),
            AccountKey::Username(username) => (
                "SELECT id, email, username, password_digest, created_at
                 FROM accounts WHERE username = ?",
                username,
            ),
        };

        sqlx::query_as::<_, Account>(sql)
            .bind(value)
            .fetch_optional(&self.db)
            .await?
            .ok_or(CredentialError::NotFound)
    }

    /// Whether `candidate` matches the account's stored digest. Any failure
    /// along the way (malformed digest, hashing task panic) counts as a
    /// mismatch.
    pub async fn verify_password(&self, account: &Account, candidate: &str) -> bool {
        self.verify_digest(account.password_digest.clone(), candidate)
            .await
    }

    /// Spend the same effort as [`verify_password`](Self::verify_password)
    /// without an account to check against.
    pub async fn verify_against_decoy(&self, candidate: &str) {
        let _ = self
            .verify_digest(self.decoy_digest.clone(), candidate)
            .await;
    }

    /// Insert a new account after checking the password policy.
    ///
    /// Fails with `Conflict` naming the clashing field when the email or
    /// username is already taken.
    pub async fn create(&self, account: NewAccount) -> CredentialResult<Account> {
        validate_password(&account.password)?;
        let digest = self.hash_password(account.password).await?;

        sqlx::query_as::<_, Account>(
            "INSERT INTO accounts (email, username, password_digest, created_at)
             VALUES (?, ?, ?, ?)
             RETURNING id, email, username, password_digest, created_at",
        )
        .bind(&account.email)
        .bind(&account.username)
        .bind(&digest)
        .bind(Utc::now())
        .fetch_one(&self.db)
        .await
        .map_err(|err| match unique_violation_column(&err) {
            Some(column) => {
                debug!(column, "registration rejected by unique constraint");
                CredentialError::Conflict(column.to_string())
            }
            None => CredentialError::Sqlx(err),
        })
    }

    async fn hash_password(&self, password: String) -> CredentialResult<String> {
        let hasher = self.hasher.clone();
        task::spawn_blocking(move || {
            let salt = SaltString::generate(&mut OsRng);
            hasher
                .hash_password(password.as_bytes(), &salt)
                .map(|hash| hash.to_string())
                .map_err(|err| CredentialError::Hashing(err.to_string()))
        })
        .await?
    }

    async fn verify_digest(&self, digest: String, candidate: &str) -> bool {
        let hasher = self.hasher.clone();
        let candidate = candidate.to_owned();
        let outcome = task::spawn_blocking(move || match PasswordHash::new(&digest) {
            Ok(parsed) => hasher
                .verify_password(candidate.as_bytes(), &parsed)
                .is_ok(),
            Err(err) => {
                error!(error = %err, "stored password digest is malformed");
                false
            }
        })
        .await;

        outcome.unwrap_or_else(|err| {
            error!(error = %err, "password verification task failed");
            false
        })
    }
}

#[cfg(test)]
pub(crate) fn cheap_hashing() -> HashingConfig {
    HashingConfig {
        memory_kib: 1024,
        iterations: 1,
        parallelism: 1,
    }
}
