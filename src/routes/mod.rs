pub mod identity;
pub mod inventory;
