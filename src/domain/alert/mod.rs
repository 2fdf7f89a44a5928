//! Alert domain - deduplication and per-identifier alert statistics

mod alert_tracker;

pub use alert_tracker::{AlertRecord, AlertTracker};
