pub mod credential_store;
pub mod identity_service;
pub mod inventory_store;
pub mod rental_coordinator;
pub mod subject_verifier;
pub mod token_authority;
