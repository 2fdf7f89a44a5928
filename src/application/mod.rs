//! Application layer - orchestrates the monitoring engine

mod watch_engine;

pub use watch_engine::{EngineStats, WatchEngine};
