//! Ephemeral rental request. Lives for a single request/response cycle and is
//! never persisted or retried.

use crate::models::car::CarId;

#[derive(Debug, Clone)]
pub struct RentalRequest {
    pub car_id: CarId,
    /// Contact address the caller claims to own; cross-checked remotely.
    pub email: String,
}
