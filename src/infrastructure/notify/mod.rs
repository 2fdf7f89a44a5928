//! Notification delivery - the alert sink boundary
//!
//! The monitoring core calls `send_alert` exactly once per successful
//! trigger; delivery failure is non-fatal to the session.

mod log_sink;
mod telegram;

pub use log_sink::LogSink;
pub use telegram::TelegramSink;

use async_trait::async_trait;

use crate::shared::errors::DeliveryError;
use crate::shared::types::AlertPayload;

/// Trait for outbound alert delivery
#[async_trait]
pub trait AlertSink: Send + Sync {
    async fn send_alert(&self, payload: &AlertPayload) -> Result<(), DeliveryError>;
}

/// Human-readable alert text shared by the sink implementations.
pub(crate) fn format_alert(payload: &AlertPayload) -> String {
    format!(
        "🔔 Volume alert: {}\n\
         Accumulated volume: ${:.2} (threshold ${:.2})\n\
         Triggered at tick {} | alerts in 24h: {}\n\
         {}",
        payload.identifier,
        payload.accumulated_volume,
        payload.threshold,
        payload.tick_index + 1,
        payload.alert_count_24h,
        payload.timestamp.format("%Y-%m-%d %H:%M:%S UTC"),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn test_alert_text_carries_core_fields() {
        let payload = AlertPayload {
            identifier: "mint-a".to_string(),
            accumulated_volume: 6000.0,
            threshold: 5000.0,
            tick_index: 0,
            alert_count_24h: 1,
            timestamp: Utc::now(),
            destination: None,
        };
        let text = format_alert(&payload);
        assert!(text.contains("mint-a"));
        assert!(text.contains("$6000.00"));
        assert!(text.contains("$5000.00"));
        assert!(text.contains("tick 1"));
    }
}
