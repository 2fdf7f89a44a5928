//! Shared value types used across the monitoring core

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::time::Duration;

/// Candle intervals supported by the data sources
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Interval {
    OneMinute,
    FiveMinutes,
    FifteenMinutes,
    OneHour,
}

impl Interval {
    pub fn as_str(&self) -> &'static str {
        match self {
            Interval::OneMinute => "1m",
            Interval::FiveMinutes => "5m",
            Interval::FifteenMinutes => "15m",
            Interval::OneHour => "1h",
        }
    }

    /// The shortest interval, used by the per-tick poll.
    pub fn shortest() -> Self {
        Interval::OneMinute
    }

    pub fn duration(&self) -> Duration {
        match self {
            Interval::OneMinute => Duration::from_secs(60),
            Interval::FiveMinutes => Duration::from_secs(300),
            Interval::FifteenMinutes => Duration::from_secs(900),
            Interval::OneHour => Duration::from_secs(3600),
        }
    }
}

impl std::fmt::Display for Interval {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Normalized result of one adapter call for one identifier at one instant.
/// Produced fresh on every poll and owned by the requesting session.
#[derive(Debug, Clone)]
pub struct MarketSnapshot {
    pub identifier: String,
    pub interval: Interval,
    pub timestamp: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
    pub trade_count: Option<u64>,
}

/// Per-session monitoring parameters, supplied at session-creation time.
/// The core treats these as opaque inputs (overridable per deployment).
#[derive(Debug, Clone)]
pub struct MonitorSettings {
    pub tick_interval: Duration,
    pub max_ticks: u32,
    pub volume_threshold: f64,
    pub alert_cooldown: Duration,
}

impl Default for MonitorSettings {
    fn default() -> Self {
        Self {
            tick_interval: Duration::from_secs(60),
            max_ticks: 5,
            volume_threshold: 5000.0,
            alert_cooldown: Duration::from_secs(600),
        }
    }
}

/// Metadata attached to a submitted identifier by the ingestion collaborator
#[derive(Debug, Clone, Default)]
pub struct SubmitContext {
    pub requester: Option<String>,
    pub destination: Option<String>,
}

/// Payload handed to the alert sink on a successful trigger
#[derive(Debug, Clone, Serialize)]
pub struct AlertPayload {
    pub identifier: String,
    pub accumulated_volume: f64,
    pub threshold: f64,
    pub tick_index: u32,
    pub alert_count_24h: usize,
    pub timestamp: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub destination: Option<String>,
}
