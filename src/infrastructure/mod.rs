//! Infrastructure layer - upstream data sources and notification delivery

pub mod sources;
pub mod notify;
