//! Alert tracker - records last-alert timestamps and rolling alert counts
//! per identifier, with time-based eviction.

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;
use tracing::debug;

/// How long alert history is retained per identifier.
const HISTORY_WINDOW_HOURS: i64 = 24;

/// Per-identifier alert record
#[derive(Debug, Clone)]
pub struct AlertRecord {
    pub identifier: String,
    pub last_alert_at: DateTime<Utc>,
    /// Alert timestamps within the trailing 24 hours, oldest first.
    pub history: Vec<DateTime<Utc>>,
}

/// Alert tracker
///
/// The only write-shared state in the core: all monitor sessions for the same
/// identifier funnel through it. A single lock over the record map serializes
/// the check-and-record pair, so two near-simultaneous triggers can never
/// both pass the dedup gate.
pub struct AlertTracker {
    records: Mutex<HashMap<String, AlertRecord>>,
}

impl AlertTracker {
    pub fn new() -> Self {
        Self {
            records: Mutex::new(HashMap::new()),
        }
    }

    /// Check whether an alert for `identifier` would currently pass the
    /// dedup gate. Query only; use [`try_alert`](Self::try_alert) from
    /// monitor sessions so the check and the record are atomic.
    pub fn should_alert(&self, identifier: &str, cooldown: Duration, now: DateTime<Utc>) -> bool {
        let records = self.records.lock().expect("alert tracker lock poisoned");
        Self::gate_open(&records, identifier, cooldown, now)
    }

    /// Atomic test-and-set: returns true and records the alert if the
    /// identifier is outside its cooldown window, false otherwise.
    pub fn try_alert(&self, identifier: &str, cooldown: Duration, now: DateTime<Utc>) -> bool {
        let mut records = self.records.lock().expect("alert tracker lock poisoned");
        if !Self::gate_open(&records, identifier, cooldown, now) {
            debug!(identifier, "alert suppressed inside cooldown window");
            return false;
        }
        Self::append(&mut records, identifier, now);
        Self::evict_stale(&mut records, now);
        true
    }

    /// Record an alert unconditionally.
    pub fn record_alert(&self, identifier: &str, now: DateTime<Utc>) {
        let mut records = self.records.lock().expect("alert tracker lock poisoned");
        Self::append(&mut records, identifier, now);
        Self::evict_stale(&mut records, now);
    }

    /// Number of alerts recorded for `identifier` within the trailing 24h.
    pub fn alert_count_24h(&self, identifier: &str, now: DateTime<Utc>) -> usize {
        let mut records = self.records.lock().expect("alert tracker lock poisoned");
        match records.get_mut(identifier) {
            Some(record) => {
                Self::prune_history(record, now);
                record.history.len()
            }
            None => 0,
        }
    }

    /// Number of identifiers currently tracked.
    pub fn tracked_identifiers(&self) -> usize {
        self.records.lock().expect("alert tracker lock poisoned").len()
    }

    fn gate_open(
        records: &HashMap<String, AlertRecord>,
        identifier: &str,
        cooldown: Duration,
        now: DateTime<Utc>,
    ) -> bool {
        match records.get(identifier) {
            Some(record) => {
                let elapsed = now.signed_duration_since(record.last_alert_at);
                elapsed >= ChronoDuration::from_std(cooldown).unwrap_or(ChronoDuration::zero())
            }
            None => true,
        }
    }

    fn append(records: &mut HashMap<String, AlertRecord>, identifier: &str, now: DateTime<Utc>) {
        let record = records
            .entry(identifier.to_string())
            .or_insert_with(|| AlertRecord {
                identifier: identifier.to_string(),
                last_alert_at: now,
                history: Vec::new(),
            });
        record.last_alert_at = now;
        record.history.push(now);
        Self::prune_history(record, now);
    }

    fn prune_history(record: &mut AlertRecord, now: DateTime<Utc>) {
        let cutoff = now - ChronoDuration::hours(HISTORY_WINDOW_HOURS);
        record.history.retain(|ts| *ts >= cutoff);
    }

    /// Drop records with no activity in the retention window to bound memory.
    fn evict_stale(records: &mut HashMap<String, AlertRecord>, now: DateTime<Utc>) {
        let cutoff = now - ChronoDuration::hours(HISTORY_WINDOW_HOURS);
        records.retain(|_, record| record.last_alert_at >= cutoff);
    }
}

impl Default for AlertTracker {
    fn default() -> Self {
        Self::new()
    }
}
