//! Catalog entries held by the inventory service.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Identifier chosen by whoever creates the entry; never auto-generated.
pub type CarId = i64;

/// A rentable car and its stock counter.
///
/// `stock` is never negative: the schema carries a `CHECK (stock >= 0)` and
/// every decrement is conditional on `stock > 0`.
#[derive(Serialize, Deserialize, Clone, FromRow, Debug, PartialEq)]
pub struct Car {
    pub id: CarId,
    pub name: String,
    pub brand: String,
    pub model: String,
    pub year: i64,
    pub price: f64,
    pub color: String,
    pub description: String,
    pub stock: i64,
}

/// Creation input after boundary validation.
#[derive(Debug, Clone)]
pub struct NewCar {
    pub id: CarId,
    pub name: String,
    pub brand: String,
    pub model: String,
    pub year: i64,
    pub price: f64,
    pub color: String,
    pub description: String,
    pub stock: i64,
}

/// Partial update. `None` keeps the stored value.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CarUpdate {
    pub name: Option<String>,
    pub brand: Option<String>,
    pub model: Option<String>,
    pub year: Option<i64>,
    pub price: Option<f64>,
    pub color: Option<String>,
    pub description: Option<String>,
    pub stock: Option<i64>,
}
