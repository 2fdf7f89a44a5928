//! Domain layer - core business logic and entities

pub mod source;
pub mod alert;
pub mod monitor;
pub mod admission;
