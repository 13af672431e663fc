//! Car rental backend: an identity service that issues bearer tokens and an
//! inventory service that rents cars only after the identity service confirms
//! the caller.

pub mod config;
pub mod db;
pub mod errors;
pub mod handlers;
pub mod models;
pub mod routes;
pub mod services;
pub mod state;

use axum::Router;
use state::{IdentityState, InventoryState};

/// Fully assembled identity router.
pub fn identity_app(state: IdentityState) -> Router {
    routes::identity::routes().with_state(state)
}

/// Fully assembled inventory router.
pub fn inventory_app(state: InventoryState) -> Router {
    routes::inventory::routes().with_state(state)
}
