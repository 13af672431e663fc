//! Routes served by the inventory service.
//!
//! - `GET/POST /cars`: list and create catalog entries
//! - `GET/PUT/DELETE /cars/{id}`: single entry
//! - `POST /rent`: rent one unit

use crate::{
    handlers::{
        car_handlers::{create_car, delete_car, get_car, list_cars, update_car},
        health_handlers::{healthz, readyz},
        rental_handlers::rent_car,
    },
    state::InventoryState,
};
use axum::{
    Router,
    routing::{get, post},
};

pub fn routes() -> Router<InventoryState> {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        .route("/cars", get(list_cars).post(create_car))
        .route(
            "/cars/{id}",
            get(get_car).put(update_car).delete(delete_car),
        )
        .route("/rent", post(rent_car))
}
