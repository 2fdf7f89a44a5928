//! Volwatch - concurrent token volume monitor
//! Built with Domain-Driven Design principles

pub mod domain;
pub mod infrastructure;
pub mod application;
pub mod shared;

// Re-export main types for convenience
pub use application::WatchEngine;
pub use domain::admission::AdmissionController;
pub use domain::alert::AlertTracker;
pub use domain::monitor::{MonitorSession, MonitorStatus};
pub use domain::source::SourceRegistry;
pub use infrastructure::sources::SourceDispatcher;
