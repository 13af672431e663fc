//! Bearer token payloads and the transport form of a presented credential.

use crate::models::account::AccountId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Signed claims carried by every bearer token.
///
/// `sub` is the decimal account identifier; `iat` and `exp` are seconds since
/// the Unix epoch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub iat: i64,
    pub exp: i64,
}

/// A freshly signed token and the window it is valid for.
#[derive(Clone)]
pub struct IssuedToken {
    pub token: String,
    pub subject: AccountId,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl fmt::Debug for IssuedToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IssuedToken")
            .field("subject", &self.subject)
            .field("issued_at", &self.issued_at)
            .field("expires_at", &self.expires_at)
            .finish_non_exhaustive()
    }
}

/// A credential presented in an `Authorization: Bearer <token>` header.
///
/// The raw header value is kept so it can be forwarded verbatim to the
/// identity service.
#[derive(Clone, PartialEq, Eq)]
pub struct BearerCredential {
    header: String,
    token: String,
}

impl BearerCredential {
    /// Parse an `Authorization` header value. The scheme is matched
    /// case-insensitively; an empty token is rejected.
    pub fn parse(header: &str) -> Option<Self> {
        let (scheme, token) = header.trim().split_once(' ')?;
        if !scheme.eq_ignore_ascii_case("bearer") {
            return None;
        }
        let token = token.trim();
        if token.is_empty() || token.contains(char::is_whitespace) {
            return None;
        }
        Some(Self {
            header: header.to_string(),
            token: token.to_string(),
        })
    }

    /// Build a credential from a bare token, as a client would send it.
    pub fn from_token(token: impl Into<String>) -> Self {
        let token = token.into();
        Self {
            header: format!("Bearer {token}"),
            token,
        }
    }

    pub fn header(&self) -> &str {
        &self.header
    }

    pub fn token(&self) -> &str {
        &self.token
    }
}

impl fmt::Debug for BearerCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("BearerCredential(<redacted>)")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_bearer_scheme_case_insensitively() {
        let credential = BearerCredential::parse("bearer abc.def.ghi").expect("should parse");
        assert_eq!(credential.token(), "abc.def.ghi");
        assert_eq!(credential.header(), "bearer abc.def.ghi");
    }

    #[test]
    fn rejects_other_schemes_and_empty_tokens() {
        assert!(BearerCredential::parse("Basic dXNlcjpwYXNz").is_none());
        assert!(BearerCredential::parse("Bearer ").is_none());
        assert!(BearerCredential::parse("Bearer").is_none());
        assert!(BearerCredential::parse("Bearer a b").is_none());
    }

    #[test]
    fn debug_output_hides_the_token() {
        let credential = BearerCredential::from_token("secret-token");
        assert!(!format!("{credential:?}").contains("secret-token"));
    }
}
