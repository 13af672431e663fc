//! InventoryStore: the car catalog and its stock counters.
//!
//! Every stock mutation is a single conditional SQL statement, so SQLite's
//! write lock gives a total order over concurrent mutations of one entry.
//! `atomic_decrement_if_positive` is the only path a rental uses to consume
//! stock.

use crate::{
    db::unique_violation_column,
    models::car::{Car, CarId, CarUpdate, NewCar},
};
use sqlx::SqlitePool;
use thiserror::Error;
use tracing::{debug, info};

#[derive(Debug, Error)]
pub enum InventoryError {
    #[error("car {0} not found")]
    NotFound(CarId),
    #[error("car {0} is out of stock")]
    OutOfStock(CarId),
    #[error("a car with this {0} already exists")]
    Conflict(String),
    #[error("stock cannot be negative")]
    NegativeStock,
    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
}

pub type InventoryResult<T> = Result<T, InventoryError>;

#[derive(Clone)]
pub struct InventoryStore {
    db: SqlitePool,
}

impl InventoryStore {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }

    pub async fn get(&self, id: CarId) -> InventoryResult<Car> {
        sqlx::query_as::<_, Car>(
            "SELECT id, name, brand, model, year, price, color, description, stock
             FROM cars WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.db)
        .await?
        .ok_or(InventoryError::NotFound(id))
    }

    pub async fn list(&self) -> InventoryResult<Vec<Car>> {
        let cars = sqlx::query_as::<_, Car>(
            "SELECT id, name, brand, model, year, price, color, description, stock
             FROM cars ORDER BY id ASC",
        )
        .fetch_all(&self.db)
        .await?;
        Ok(cars)
    }

    /// Insert a catalog entry under its caller-assigned id.
    ///
    /// Returns `Conflict` when the id or the name is already taken.
    pub async fn create(&self, car: NewCar) -> InventoryResult<Car> {
        if car.stock < 0 {
            return Err(InventoryError::NegativeStock);
        }

        let created = sqlx::query_as::<_, Car>(
            "INSERT INTO cars (id, name, brand, model, year, price, color, description, stock)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
             RETURNING id, name, brand, model, year, price, color, description, stock",
        )
        .bind(car.id)
        .bind(&car.name)
        .bind(&car.brand)
        .bind(&car.model)
        .bind(car.year)
        .bind(car.price)
        .bind(&car.color)
        .bind(&car.description)
        .bind(car.stock)
        .fetch_one(&self.db)
        .await
        .map_err(map_write_error)?;

        info!(car_id = created.id, stock = created.stock, "car created");
        Ok(created)
    }

    /// Apply a partial update in one statement. Absent fields keep their
    /// stored value.
    pub async fn update(&self, id: CarId, changes: CarUpdate) -> InventoryResult<Car> {
        if changes.stock.is_some_and(|stock| stock < 0) {
            return Err(InventoryError::NegativeStock);
        }

        let updated = sqlx::query_as::<_, Car>(
            "UPDATE cars SET
                name = COALESCE(?, name),
                brand = COALESCE(?, brand),
                model = COALESCE(?, model),
                year = COALESCE(?, year),
                price = COALESCE(?, price),
                color = COALESCE(?, color),
                description = COALESCE(?, description),
                stock = COALESCE(?, stock)
             WHERE id = ?
             RETURNING id, name, brand, model, year, price, color, description, stock",
        )
        .bind(changes.name)
        .bind(changes.brand)
        .bind(changes.model)
        .bind(changes.year)
        .bind(changes.price)
        .bind(changes.color)
        .bind(changes.description)
        .bind(changes.stock)
        .bind(id)
        .fetch_optional(&self.db)
        .await
        .map_err(map_write_error)?
        .ok_or(InventoryError::NotFound(id))?;

        info!(car_id = id, stock = updated.stock, "car updated");
        Ok(updated)
    }

    pub async fn delete(&self, id: CarId) -> InventoryResult<()> {
        let result = sqlx::query("DELETE FROM cars WHERE id = ?")
            .bind(id)
            .execute(&self.db)
            .await?;

        if result.rows_affected() == 0 {
            return Err(InventoryError::NotFound(id));
        }
        info!(car_id = id, "car deleted");
        Ok(())
    }

    /// Decrement the stock of `id` by one if, and only if, it is positive.
    ///
    /// The check and the write are one statement, so concurrent callers are
    /// serialized by SQLite and the counter never goes below zero. On a miss
    /// a follow-up read tells `OutOfStock` apart from `NotFound`.
    pub async fn atomic_decrement_if_positive(&self, id: CarId) -> InventoryResult<Car> {
        let decremented = sqlx::query_as::<_, Car>(
            "UPDATE cars SET stock = stock - 1
             WHERE id = ? AND stock > 0
             RETURNING id, name, brand, model, year, price, color, description, stock",
        )
        .bind(id)
        .fetch_optional(&self.db)
        .await?;

        if let Some(car) = decremented {
            debug!(car_id = id, stock = car.stock, "stock decremented");
            return Ok(car);
        }

        let exists: Option<i64> = sqlx::query_scalar("SELECT 1 FROM cars WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.db)
            .await?;

        match exists {
            Some(_) => Err(InventoryError::OutOfStock(id)),
            None => Err(InventoryError::NotFound(id)),
        }
    }
}

fn map_write_error(err: sqlx::Error) -> InventoryError {
    match unique_violation_column(&err) {
        Some(column) => InventoryError::Conflict(column.to_string()),
        None => InventoryError::Sqlx(err),
    }
}

#[cfg(test)]
pub(crate) fn sample_car(id: CarId, name: &str, stock: i64) -> NewCar {
    NewCar {
        id,
        name: name.into(),
        brand: "Toyota".into(),
        model: "Corolla".into(),
        year: 2022,
        price: 45.5,
        color: "blue".into(),
        description: String::new(),
        stock,
    }
}
