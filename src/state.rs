//! Shared router state for each service, assembled from explicit config.

use crate::services::{
    credential_store::{CredentialError, CredentialStore, HashingConfig},
    identity_service::IdentityService,
    inventory_store::InventoryStore,
    rental_coordinator::RentalCoordinator,
    subject_verifier::{HttpSubjectVerifier, VerifierConfig},
    token_authority::{TokenAuthority, TokenConfig},
};
use axum::extract::FromRef;
use sqlx::SqlitePool;
use std::sync::Arc;

#[derive(Clone)]
pub struct IdentityState {
    pub identity: IdentityService,
    pub db: SqlitePool,
}

impl IdentityState {
    pub fn new(
        db: SqlitePool,
        tokens: &TokenConfig,
        hashing: HashingConfig,
    ) -> Result<Self, CredentialError> {
        let credentials = CredentialStore::new(db.clone(), hashing)?;
        let identity = IdentityService::new(credentials, TokenAuthority::new(tokens));
        Ok(Self { identity, db })
    }
}

impl FromRef<IdentityState> for SqlitePool {
    fn from_ref(state: &IdentityState) -> Self {
        state.db.clone()
    }
}

#[derive(Clone)]
pub struct InventoryState {
    pub inventory: InventoryStore,
    pub coordinator: Arc<RentalCoordinator<HttpSubjectVerifier>>,
    pub db: SqlitePool,
}

impl InventoryState {
    pub fn new(
        db: SqlitePool,
        tokens: &TokenConfig,
        verifier: &VerifierConfig,
    ) -> Result<Self, reqwest::Error> {
        let inventory = InventoryStore::new(db.clone());
        let coordinator = RentalCoordinator::new(
            TokenAuthority::new(tokens),
            inventory.clone(),
            HttpSubjectVerifier::new(verifier)?,
            verifier.timeout,
        );
        Ok(Self {
            inventory,
            coordinator: Arc::new(coordinator),
            db,
        })
    }
}

impl FromRef<InventoryState> for SqlitePool {
    fn from_ref(state: &InventoryState) -> Self {
        state.db.clone()
    }
}
