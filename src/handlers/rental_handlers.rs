//! `POST /rent`: the only entry point that consumes stock.

use crate::{
    errors::AppError,
    handlers::{required, required_text},
    models::{
        car::{Car, CarId},
        rental::RentalRequest,
        token::BearerCredential,
    },
    state::InventoryState,
};
use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
    response::IntoResponse,
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize)]
pub struct RentBody {
    pub car_id: Option<CarId>,
    pub email: Option<String>,
}

impl RentBody {
    fn validate(self) -> Result<RentalRequest, AppError> {
        let mut missing = Vec::new();
        let car_id = required(self.car_id, "car_id", &mut missing);
        let email = required_text(self.email, "email", &mut missing);
        if !missing.is_empty() {
            return Err(AppError::missing_fields(&missing));
        }
        Ok(RentalRequest { car_id, email })
    }
}

#[derive(Serialize)]
struct RentalResponse {
    success: bool,
    message: String,
    car: Car,
}

/// Rent one unit of `car_id` on behalf of the bearer, who must own `email`.
/// A missing bearer is rejected before the body is read.
pub async fn rent_car(
    State(state): State<InventoryState>,
    credential: BearerCredential,
    payload: Result<Json<RentBody>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let Json(body) = payload?;
    let request = body.validate()?;
    let car = state.coordinator.rent(&request, &credential).await?;

    Ok(Json(RentalResponse {
        success: true,
        message: format!("car {} rented", car.id),
        car,
    }))
}
