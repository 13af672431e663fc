//! RentalCoordinator: the cross-service rental transaction.
//!
//! A rental moves through four steps, each with its own terminal failure:
//!
//! 1. **Token check**: validate the bearer token locally.
//! 2. **Catalog check**: the entry must exist; zero stock fails fast. This
//!    read is advisory only.
//! 3. **Remote verification**: ask the identity service whether the token's
//!    subject owns the claimed address, bounded by a timeout. Anything but a
//!    clear yes fails closed.
//! 4. **Commit**: `atomic_decrement_if_positive`, the authoritative stock
//!    check. Losing the race here is reported as a late out-of-stock.
//!
//! No lock is held while step 3 is in flight, and a committed decrement is
//! final: there is no compensation path.

use crate::{
    models::{
        account::AccountId,
        car::{Car, CarId},
        rental::RentalRequest,
        token::BearerCredential,
    },
    services::{
        inventory_store::{InventoryError, InventoryStore},
        subject_verifier::{SubjectVerifier, VerificationError},
        token_authority::TokenAuthority,
    },
};
use reqwest::StatusCode;
use std::time::Duration;
use thiserror::Error;
use tokio::time::timeout;
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

/// Where an out-of-stock condition was detected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StockCheck {
    /// The advisory read before remote verification.
    Early,
    /// The atomic decrement after verification; another rental won the race.
    Late,
}

#[derive(Debug, Error)]
pub enum RentalError {
    #[error("missing, invalid or expired token")]
    Unauthenticated,
    #[error("car {0} does not exist")]
    EntryMissing(CarId),
    #[error("car {car_id} is out of stock")]
    OutOfStock { car_id: CarId, detected: StockCheck },
    #[error("token subject does not own the claimed address")]
    Unauthorized,
    #[error("identity service unavailable: {reason}")]
    UpstreamUnavailable {
        status: Option<StatusCode>,
        reason: String,
    },
    #[error(transparent)]
    Inventory(#[from] InventoryError),
}

pub struct RentalCoordinator<V> {
    tokens: TokenAuthority,
    inventory: InventoryStore,
    verifier: V,
    verify_timeout: Duration,
}

impl<V: SubjectVerifier> RentalCoordinator<V> {
    pub fn new(
        tokens: TokenAuthority,
        inventory: InventoryStore,
        verifier: V,
        verify_timeout: Duration,
    ) -> Self {
        Self {
            tokens,
            inventory,
            verifier,
            verify_timeout,
        }
    }

    /// Run one rental to completion and return the updated entry.
    ///
    /// Dropping the returned future cancels the rental; if that happens
    /// before the commit step, stock is untouched.
    #[instrument(
        skip_all,
        fields(rental_id = %Uuid::new_v4(), car_id = request.car_id)
    )]
    pub async fn rent(
        &self,
        request: &RentalRequest,
        credential: &BearerCredential,
    ) -> Result<Car, RentalError> {
        let Ok(subject) = self.tokens.validate(credential.token()) else {
            info!(
                outcome = "unauthenticated",
                "rental rejected: token did not validate"
            );
            return Err(RentalError::Unauthenticated);
        };

        match self.inventory.get(request.car_id).await {
            Ok(car) if car.stock <= 0 => {
                info!(
                    outcome = "out_of_stock_early",
                    subject,
                    "rental rejected before verification"
                );
                return Err(RentalError::OutOfStock {
                    car_id: request.car_id,
                    detected: StockCheck::Early,
                });
            }
            Ok(_) => {}
            Err(InventoryError::NotFound(id)) => {
                info!(
                    outcome = "entry_missing",
                    subject,
                    "rental rejected: no such car"
                );
                return Err(RentalError::EntryMissing(id));
            }
            Err(err) => {
                error!(error = %err, "catalog read failed");
                return Err(err.into());
            }
        }

        self.verify_remotely(subject, request, credential).await?;

        match self
            .inventory
            .atomic_decrement_if_positive(request.car_id)
            .await
        {
            Ok(car) => {
                info!(
                    outcome = "completed",
                    subject,
                    stock = car.stock,
                    "rental committed"
                );
                Ok(car)
            }
            Err(InventoryError::OutOfStock(car_id)) => {
                info!(
                    outcome = "out_of_stock_late",
                    subject,
                    "rental lost the race for the last unit"
                );
                Err(RentalError::OutOfStock {
                    car_id,
                    detected: StockCheck::Late,
                })
            }
            Err(InventoryError::NotFound(id)) => {
                info!(
                    outcome = "entry_missing",
                    subject,
                    "car removed during verification"
                );
                Err(RentalError::EntryMissing(id))
            }
            Err(err) => {
                error!(error = %err, "stock decrement failed");
                Err(err.into())
            }
        }
    }

    async fn verify_remotely(
        &self,
        subject: AccountId,
        request: &RentalRequest,
        credential: &BearerCredential,
    ) -> Result<(), RentalError> {
        let call = self.verifier.verify_subject(credential, &request.email);
        match timeout(self.verify_timeout, call).await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(VerificationError::Unauthorized)) => {
                info!(
                    outcome = "unauthorized",
                    subject,
                    "identity service denied the claimed address"
                );
                Err(RentalError::Unauthorized)
            }
            Ok(Err(VerificationError::UpstreamStatus(status))) => {
                warn!(
                    outcome = "upstream_unavailable",
                    subject,
                    %status,
                    "identity service returned an error status"
                );
                Err(RentalError::UpstreamUnavailable {
                    status: Some(status),
                    reason: format!("identity service returned {status}"),
                })
            }
            Ok(Err(VerificationError::Transport(reason))) => {
                warn!(
                    outcome = "upstream_unavailable",
                    subject,
                    %reason,
                    "identity service unreachable"
                );
                Err(RentalError::UpstreamUnavailable {
                    status: None,
                    reason,
                })
            }
            Err(_) => {
                warn!(
                    outcome = "upstream_unavailable",
                    subject,
                    timeout_ms = self.verify_timeout.as_millis() as u64,
                    "identity verification timed out"
                );
                Err(RentalError::UpstreamUnavailable {
                    status: None,
                    reason: "verification timed out".into(),
                })
            }
        }
    }
}
