//! HTTP handlers. Request bodies arrive as DTOs with optional fields and are
//! validated into typed models here, before any service call.

pub mod auth;
pub mod car_handlers;
pub mod health_handlers;
pub mod identity_handlers;
pub mod rental_handlers;

/// Take a required text field, recording `name` when it is absent or blank.
pub(crate) fn required_text(
    value: Option<String>,
    name: &'static str,
    missing: &mut Vec<&'static str>,
) -> String {
    match value {
        Some(value) if !value.trim().is_empty() => value,
        _ => {
            missing.push(name);
            String::new()
        }
    }
}

/// Take a required non-text field, recording `name` when it is absent.
pub(crate) fn required<T: Default>(
    value: Option<T>,
    name: &'static str,
    missing: &mut Vec<&'static str>,
) -> T {
    value.unwrap_or_else(|| {
        missing.push(name);
        T::default()
    })
}

/// Treat blank optional text as absent.
pub(crate) fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}
