//! TokenAuthority: issues and validates HS256 bearer tokens.
//!
//! Tokens are stateless: validity is a pure function of the signing secret
//! and the current time. Every validation failure collapses into the single
//! [`TokenError::Invalid`] so callers cannot learn who a rejected token named.

use crate::models::{
    account::AccountId,
    token::{Claims, IssuedToken},
};
use chrono::{DateTime, TimeDelta, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use std::fmt;
use thiserror::Error;
use tracing::debug;

/// Default validity window for issued tokens, in seconds.
pub const DEFAULT_TOKEN_TTL_SECS: i64 = 3600;

/// Longest validity window a token may be issued with: 30 days.
pub const MAX_TOKEN_TTL_SECS: i64 = 30 * 24 * 3600;

#[derive(Debug, Error)]
pub enum TokenError {
    #[error("invalid or expired token")]
    Invalid,
    #[error("token expiry is out of range")]
    ExpiryOutOfRange,
    #[error("failed to sign token: {0}")]
    Signing(#[from] jsonwebtoken::errors::Error),
}

/// Signing secret and validity window shared by both services.
#[derive(Clone)]
pub struct TokenConfig {
    pub secret: String,
    pub ttl: TimeDelta,
}

impl TokenConfig {
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
            ttl: TimeDelta::seconds(DEFAULT_TOKEN_TTL_SECS),
        }
    }
}

impl fmt::Debug for TokenConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenConfig")
            .field("secret", &"<redacted>")
            .field("ttl", &self.ttl)
            .finish()
    }
}

#[derive(Clone)]
pub struct TokenAuthority {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
    ttl: TimeDelta,
}

impl TokenAuthority {
    pub fn new(config: &TokenConfig) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        // Expiry is checked by hand so that `now >= exp` rejects with no leeway.
        validation.validate_exp = false;
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp", "sub"]);

        Self {
            encoding: EncodingKey::from_secret(config.secret.as_bytes()),
            decoding: DecodingKey::from_secret(config.secret.as_bytes()),
            validation,
            ttl: config.ttl,
        }
    }

    /// Issue a token for `subject`, valid from now for the configured window.
    pub fn issue(&self, subject: AccountId) -> Result<IssuedToken, TokenError> {
        self.issue_at(subject, Utc::now())
    }

    pub fn issue_at(
        &self,
        subject: AccountId,
        issued_at: DateTime<Utc>,
    ) -> Result<IssuedToken, TokenError> {
        let expires_at = issued_at
            .checked_add_signed(self.ttl)
            .ok_or(TokenError::ExpiryOutOfRange)?;
        let claims = Claims {
            sub: subject.to_string(),
            iat: issued_at.timestamp(),
            exp: expires_at.timestamp(),
        };
        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)?;

        Ok(IssuedToken {
            token,
            subject,
            issued_at,
            expires_at,
        })
    }

    /// Validate `token` against the signing secret and the current time,
    /// returning the subject it was issued to.
    pub fn validate(&self, token: &str) -> Result<AccountId, TokenError> {
        self.validate_at(token, Utc::now())
    }

    pub fn validate_at(&self, token: &str, now: DateTime<Utc>) -> Result<AccountId, TokenError> {
        let data = decode::<Claims>(token, &self.decoding, &self.validation).map_err(|err| {
            debug!(kind = ?err.kind(), "token failed signature or claim checks");
            TokenError::Invalid
        })?;

        if now.timestamp() >= data.claims.exp {
            debug!("token expired");
            return Err(TokenError::Invalid);
        }

        data.claims
            .sub
            .parse::<AccountId>()
            .map_err(|_| TokenError::Invalid)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn authority(secret: &str) -> TokenAuthority {
        TokenAuthority::new(&TokenConfig::new(secret))
    }

    #[test]
    fn token_is_valid_until_expiry() {
        let tokens = authority("unit-secret");
        let issued_at = Utc::now() - TimeDelta::minutes(30);

        for subject in [1, 42, 9_000_000] {
            let issued = tokens
                .issue_at(subject, issued_at)
                .expect("token should sign");
            assert_eq!(
                issued.expires_at - issued.issued_at,
                TimeDelta::seconds(DEFAULT_TOKEN_TTL_SECS)
            );

            let just_before = issued.expires_at - TimeDelta::seconds(1);
            assert_eq!(
                tokens
                    .validate_at(&issued.token, just_before)
                    .expect("token should be valid before expiry"),
                subject
            );
            assert!(
                tokens
                    .validate_at(&issued.token, issued.expires_at)
                    .is_err()
            );
            assert!(
                tokens
                    .validate_at(&issued.token, issued.expires_at + TimeDelta::hours(2))
                    .is_err()
            );
        }
    }

    #[test]
    fn custom_windows_are_honoured() {
        let windows = [
            TimeDelta::seconds(5),
            TimeDelta::minutes(10),
            TimeDelta::days(2),
        ];
        for window in windows {
            let tokens = TokenAuthority::new(&TokenConfig {
                secret: "window-secret".into(),
                ttl: window,
            });
            let issued = tokens.issue(7).expect("token should sign");

            assert_eq!(tokens.validate(&issued.token).expect("fresh token"), 7);
            let end = issued.issued_at + window;
            assert!(tokens.validate_at(&issued.token, end).is_err());
        }
    }

    #[test]
    fn already_expired_token_is_rejected() {
        let tokens = authority("unit-secret");
        let issued = tokens
            .issue_at(3, Utc::now() - TimeDelta::hours(2))
            .expect("token should sign");

        assert!(matches!(
            tokens.validate(&issued.token),
            Err(TokenError::Invalid)
        ));
    }

    #[test]
    fn foreign_secret_and_tampering_are_rejected() {
        let ours = authority("unit-secret");
        let theirs = authority("other-secret");
        let issued = theirs.issue(5).expect("token should sign");
        assert!(matches!(
            ours.validate(&issued.token),
            Err(TokenError::Invalid)
        ));

        let genuine = ours.issue(5).expect("token should sign");
        let mut tampered = genuine.token.clone();
        tampered.pop();
        let replacement = if genuine.token.ends_with('A') {
            'B'
        } else {
            'A'
        };
        tampered.push(replacement);
        assert!(matches!(ours.validate(&tampered), Err(TokenError::Invalid)));
        assert!(matches!(
            ours.validate("not-a-token"),
            Err(TokenError::Invalid)
        ));
    }

    #[test]
    fn non_numeric_subject_is_rejected() {
        let tokens = authority("unit-secret");
        let now = Utc::now().timestamp();
        let claims = Claims {
            sub: "admin".into(),
            iat: now,
            exp: now + 600,
        };
        let token = encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(b"unit-secret"),
        )
        .expect("token should sign");

        assert!(matches!(tokens.validate(&token), Err(TokenError::Invalid)));
    }

    #[test]
    fn expiry_overflow_is_an_error_not_a_panic() {
        let tokens = TokenAuthority::new(&TokenConfig {
            secret: "unit-secret".into(),
            ttl: TimeDelta::seconds(9_000_000_000_000),
        });

        assert!(matches!(tokens.issue(1), Err(TokenError::ExpiryOutOfRange)));
    }

}
