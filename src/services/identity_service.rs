//! IdentityService: registration, login and subject verification.
//!
//! Composes [`CredentialStore`] and [`TokenAuthority`]. `verify_subject` is
//! the operation the inventory service calls remotely before committing a
//! rental.

use crate::{
    models::{
        account::{AccountId, AccountKey, LoginRequest, NewAccount},
        token::IssuedToken,
    },
    services::{
        credential_store::{CredentialError, CredentialStore},
        token_authority::{TokenAuthority, TokenError},
    },
};
use thiserror::Error;
use tracing::{debug, info};

#[derive(Debug, Error)]
pub enum IdentityError {
    /// Missing, malformed, expired or foreign-signed token.
    #[error("invalid or expired token")]
    Unauthenticated,
    /// Wrong credentials, or a token whose subject does not own the address.
    #[error("not authorized")]
    Unauthorized,
    #[error(transparent)]
    Credential(#[from] CredentialError),
    #[error(transparent)]
    Token(TokenError),
}

pub type IdentityResult<T> = Result<T, IdentityError>;

#[derive(Clone)]
pub struct IdentityService {
    credentials: CredentialStore,
    tokens: TokenAuthority,
}

impl IdentityService {
    pub fn new(credentials: CredentialStore, tokens: TokenAuthority) -> Self {
        Self {
            credentials,
            tokens,
        }
    }

    /// Register a new account and return its identifier. The password policy
    /// is enforced by [`CredentialStore::create`].
    pub async fn register(&self, account: NewAccount) -> IdentityResult<AccountId> {
        let created = self.credentials.create(account).await?;
        info!(account_id = created.id, "account registered");
        Ok(created.id)
    }

    /// Exchange credentials for a bearer token.
    ///
    /// A missing account and a wrong password both yield `Unauthorized`, and
    /// both run one password verification.
    pub async fn login(&self, request: &LoginRequest) -> IdentityResult<IssuedToken> {
        let mut account = None;
        for key in request.keys() {
            match self.credentials.lookup(key).await {
                Ok(found) => {
                    account = Some(found);
                    break;
                }
                Err(CredentialError::NotFound) => continue,
                Err(err) => return Err(err.into()),
            }
        }

        let Some(account) = account else {
            self.credentials
                .verify_against_decoy(&request.password)
                .await;
            debug!("login rejected");
            return Err(IdentityError::Unauthorized);
        };

        if !self
            .credentials
            .verify_password(&account, &request.password)
            .await
        {
            debug!("login rejected");
            return Err(IdentityError::Unauthorized);
        }

        let issued = self
            .tokens
            .issue(account.id)
            .map_err(IdentityError::Token)?;
        info!(account_id = account.id, "login succeeded");
        Ok(issued)
    }

    /// Resolve the subject of a bearer token.
    pub fn authenticate(&self, token: &str) -> IdentityResult<AccountId> {
        self.tokens
            .validate(token)
            .map_err(|_| IdentityError::Unauthenticated)
    }

    /// Succeed only when `token` is valid and was issued to the account that
    /// owns `email`. An unknown address is indistinguishable from a mismatch.
    pub async fn verify_subject(&self, token: &str, email: &str) -> IdentityResult<AccountId> {
        let subject = self.authenticate(token)?;

        let account = match self.credentials.lookup(AccountKey::Email(email)).await {
            Ok(account) => account,
            Err(CredentialError::NotFound) => {
                info!(subject, "verification denied: address not registered");
                return Err(IdentityError::Unauthorized);
            }
            Err(err) => return Err(err.into()),
        };

        if account.id != subject {
            info!(
                subject,
                account_id = account.id,
                "verification denied: subject mismatch"
            );
            return Err(IdentityError::Unauthorized);
        }

        debug!(subject, "subject verified");
        Ok(subject)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        db::{Schema, scratch_pool},
        services::{credential_store::cheap_hashing, token_authority::TokenConfig},
    };

    async fn service() -> (tempfile::TempDir, IdentityService) {
        let (dir, pool) = scratch_pool(Schema::Identity).await;
        let credentials = CredentialStore::new(pool, cheap_hashing()).expect("store should build");
        let tokens = TokenAuthority::new(&TokenConfig::new("identity-unit-secret"));
        (dir, IdentityService::new(credentials, tokens))
    }

    fn account(email: &str, username: &str) -> NewAccount {
        NewAccount {
            email: email.into(),
            username: username.into(),
            password: "Abcdefg!".into(),
        }
    }

    fn login_with(email: Option<&str>, username: Option<&str>, password: &str) -> LoginRequest {
        LoginRequest {
            email: email.map(str::to_string),
            username: username.map(str::to_string),
            password: password.into(),
        }
    }

    #[tokio::test]
    async fn login_by_email_or_username_issues_token_for_subject() {
        let (_dir, identity) = service().await;
        let id = identity
            .register(account("a@x.com", "alice"))
            .await
            .expect("registration should succeed");

        let by_email = identity
            .login(&login_with(Some("a@x.com"), None, "Abcdefg!"))
            .await
            .expect("email login should succeed");
        let by_username = identity
            .login(&login_with(None, Some("alice"), "Abcdefg!"))
            .await
            .expect("username login should succeed");

        assert_eq!(by_email.subject, id);
        assert_eq!(
            identity.authenticate(&by_username.token).expect("valid"),
            id
        );
    }

    #[tokio::test]
    async fn login_falls_back_to_username_when_email_is_unknown() {
        let (_dir, identity) = service().await;
        identity
            .register(account("a@x.com", "alice"))
            .await
            .expect("registration should succeed");

        identity
            .login(&login_with(Some("typo@x.com"), Some("alice"), "Abcdefg!"))
            .await
            .expect("username fallback should succeed");
    }

    #[tokio::test]
    async fn login_failures_are_uniform() {
        let (_dir, identity) = service().await;
        identity
            .register(account("a@x.com", "alice"))
            .await
            .expect("registration should succeed");

        let missing = identity
            .login(&login_with(Some("nobody@x.com"), None, "Abcdefg!"))
            .await
            .expect_err("unknown account should fail");
        let wrong = identity
            .login(&login_with(Some("a@x.com"), None, "Wrong!pass"))
            .await
            .expect_err("wrong password should fail");

        assert!(matches!(missing, IdentityError::Unauthorized));
        assert!(matches!(wrong, IdentityError::Unauthorized));
        assert_eq!(missing.to_string(), wrong.to_string());
    }

    #[tokio::test]
    async fn verify_subject_requires_matching_owner() {
        let (_dir, identity) = service().await;
        identity
            .register(account("a@x.com", "alice"))
            .await
            .expect("registration should succeed");
        identity
            .register(account("b@x.com", "bob"))
            .await
            .expect("registration should succeed");

        let alice = identity
            .login(&login_with(Some("a@x.com"), None, "Abcdefg!"))
            .await
            .expect("login should succeed");
        let bob = identity
            .login(&login_with(Some("b@x.com"), None, "Abcdefg!"))
            .await
            .expect("login should succeed");

        assert_eq!(
            identity
                .verify_subject(&alice.token, "a@x.com")
                .await
                .expect("owner should verify"),
            alice.subject
        );
        for (token, email) in [(&alice.token, "b@x.com"), (&bob.token, "a@x.com")] {
            assert!(matches!(
                identity.verify_subject(token, email).await,
                Err(IdentityError::Unauthorized)
            ));
        }
        assert!(matches!(
            identity.verify_subject(&alice.token, "ghost@x.com").await,
            Err(IdentityError::Unauthorized)
        ));
        assert!(matches!(
            identity.verify_subject("garbage", "a@x.com").await,
            Err(IdentityError::Unauthenticated)
        ));
    }

    #[tokio::test]
    async fn register_surfaces_store_errors() {
        let (_dir, identity) = service().await;
        identity
            .register(account("a@x.com", "alice"))
            .await
            .expect("registration should succeed");

        assert!(matches!(
            identity.register(account("a@x.com", "other")).await,
            Err(IdentityError::Credential(CredentialError::Conflict(_)))
        ));

        let weak = NewAccount {
            email: "c@x.com".into(),
            username: "carol".into(),
            password: "abcdefgh".into(),
        };
        let err = identity
            .register(weak)
            .await
            .expect_err("weak password should be rejected");
        assert!(matches!(
            err,
            IdentityError::Credential(CredentialError::PolicyViolation(_))
        ));
        assert!(matches!(
            identity.credentials.lookup(AccountKey::Email("c@x.com")).await,
            Err(CredentialError::NotFound)
        ));
    }
}
