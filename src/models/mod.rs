//! Core data models shared by the identity and inventory services.
//!
//! Persistent records (`Account`, `Car`) map to SQLite rows via
//! `sqlx::FromRow`. The remaining types are validated, typed inputs that
//! handlers build once at the HTTP boundary before any business logic runs.

pub mod account;
pub mod car;
pub mod rental;
pub mod token;
