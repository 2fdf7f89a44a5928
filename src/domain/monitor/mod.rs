//! Monitor domain - per-identifier bounded monitoring sessions

mod monitor_task;

pub use monitor_task::{MonitorSession, MonitorState, MonitorStatus, SessionOutcome};
