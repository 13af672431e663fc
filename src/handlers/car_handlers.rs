//! HTTP handlers for the car catalog.

use crate::{
    errors::AppError,
    handlers::{required, required_text},
    models::car::{Car, CarId, CarUpdate, NewCar},
    state::InventoryState,
};
use axum::{
    Json,
    extract::{
        Path, State,
        rejection::{JsonRejection, PathRejection},
    },
    http::StatusCode,
    response::IntoResponse,
};
use serde::{Deserialize, Serialize};

/// Body of `POST /cars`. Every field but `description` is required.
#[derive(Debug, Deserialize)]
pub struct CreateCarBody {
    pub id: Option<CarId>,
    pub name: Option<String>,
    pub brand: Option<String>,
    pub model: Option<String>,
    pub year: Option<i64>,
    pub price: Option<f64>,
    pub color: Option<String>,
    pub description: Option<String>,
    pub stock: Option<i64>,
}

impl CreateCarBody {
    fn validate(self) -> Result<NewCar, AppError> {
        let mut missing = Vec::new();
        let car = NewCar {
            id: required(self.id, "id", &mut missing),
            name: required_text(self.name, "name", &mut missing),
            brand: required_text(self.brand, "brand", &mut missing),
            model: required_text(self.model, "model", &mut missing),
            year: required(self.year, "year", &mut missing),
            price: required(self.price, "price", &mut missing),
            color: required_text(self.color, "color", &mut missing),
            description: self.description.unwrap_or_default(),
            stock: required(self.stock, "stock", &mut missing),
        };
        if !missing.is_empty() {
            return Err(AppError::missing_fields(&missing));
        }
        Ok(car)
    }
}

#[derive(Serialize)]
struct CarEnvelope {
    success: bool,
    car: Car,
}

#[derive(Serialize)]
struct CarListEnvelope {
    success: bool,
    cars: Vec<Car>,
}

fn car_id(path: Result<Path<CarId>, PathRejection>) -> Result<CarId, AppError> {
    let Path(id) = path?;
    Ok(id)
}

/// `POST /cars`
pub async fn create_car(
    State(state): State<InventoryState>,
    payload: Result<Json<CreateCarBody>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let Json(body) = payload?;
    let car = state.inventory.create(body.validate()?).await?;

    Ok((
        StatusCode::CREATED,
        Json(CarEnvelope { success: true, car }),
    ))
}

/// `GET /cars`, ordered by id.
pub async fn list_cars(State(state): State<InventoryState>) -> Result<impl IntoResponse, AppError> {
    let cars = state.inventory.list().await?;
    Ok(Json(CarListEnvelope {
        success: true,
        cars,
    }))
}

/// `GET /cars/{id}`
pub async fn get_car(
    State(state): State<InventoryState>,
    path: Result<Path<CarId>, PathRejection>,
) -> Result<impl IntoResponse, AppError> {
    let car = state.inventory.get(car_id(path)?).await?;
    Ok(Json(CarEnvelope { success: true, car }))
}

/// `PUT /cars/{id}`: partial update; absent fields are kept.
pub async fn update_car(
    State(state): State<InventoryState>,
    path: Result<Path<CarId>, PathRejection>,
    payload: Result<Json<CarUpdate>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let id = car_id(path)?;
    let Json(changes) = payload?;
    let car = state.inventory.update(id, changes).await?;
    Ok(Json(CarEnvelope { success: true, car }))
}

/// `DELETE /cars/{id}`
pub async fn delete_car(
    State(state): State<InventoryState>,
    path: Result<Path<CarId>, PathRejection>,
) -> Result<impl IntoResponse, AppError> {
    state.inventory.delete(car_id(path)?).await?;
    Ok(StatusCode::NO_CONTENT)
}
