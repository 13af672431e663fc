//! Remote subject verification against the identity service.
//!
//! [`SubjectVerifier`] is the seam between the rental coordinator and the
//! network. [`HttpSubjectVerifier`] calls `GET /verify_user` on the identity
//! service, forwarding the caller's `Authorization` header unchanged. Redirects
//! are not followed. It does not enforce a deadline itself; the coordinator
//! bounds every call.

use crate::models::token::BearerCredential;
use reqwest::{Client, StatusCode, Url, header::AUTHORIZATION, redirect};
use std::{future::Future, time::Duration};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum VerificationError {
    /// The identity service answered 401: a legitimate denial.
    #[error("identity service denied the subject")]
    Unauthorized,
    /// The identity service answered with any other non-success status.
    #[error("identity service returned {0}")]
    UpstreamStatus(StatusCode),
    /// The request never produced a response (refused, reset, DNS, ...).
    #[error("identity service unreachable: {0}")]
    Transport(String),
}

/// Confirms that the holder of `credential` owns `email`.
pub trait SubjectVerifier: Send + Sync + 'static {
    fn verify_subject(
        &self,
        credential: &BearerCredential,
        email: &str,
    ) -> impl Future<Output = Result<(), VerificationError>> + Send;
}

/// Where the identity service lives and how long to wait for it.
#[derive(Debug, Clone)]
pub struct VerifierConfig {
    /// Full URL of the identity service's `verify_user` endpoint.
    pub endpoint: Url,
    /// Upper bound for one verification, connection set-up included.
    pub timeout: Duration,
}

pub struct HttpSubjectVerifier {
    client: Client,
    endpoint: Url,
}

impl HttpSubjectVerifier {
    /// Build a verifier for `config.endpoint`.
    ///
    /// # Errors
    ///
    /// Returns an error when the reqwest client cannot be constructed.
    pub fn new(config: &VerifierConfig) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .connect_timeout(config.timeout)
            .redirect(redirect::Policy::none())
            .build()?;
        Ok(Self {
            client,
            endpoint: config.endpoint.clone(),
        })
    }
}

impl SubjectVerifier for HttpSubjectVerifier {
    async fn verify_subject(
        &self,
        credential: &BearerCredential,
        email: &str,
    ) -> Result<(), VerificationError> {
        let response = self
            .client
            .get(self.endpoint.clone())
            .header(AUTHORIZATION, credential.header())
            .query(&[("email", email)])
            .send()
            .await
            .map_err(|err| VerificationError::Transport(err.to_string()))?;

        let status = response.status();
        if status.is_success() {
            Ok(())
        } else if status == StatusCode::UNAUTHORIZED {
            Err(VerificationError::Unauthorized)
        } else {
            Err(VerificationError::UpstreamStatus(status))
        }
    }
}
