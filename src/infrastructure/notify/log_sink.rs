//! Log-only alert sink for deployments without a configured bot

use async_trait::async_trait;
use tracing::warn;

use super::{format_alert, AlertSink};
use crate::shared::errors::DeliveryError;
use crate::shared::types::AlertPayload;

/// Writes alerts to the log instead of an external channel.
pub struct LogSink;

#[async_trait]
impl AlertSink for LogSink {
    async fn send_alert(&self, payload: &AlertPayload) -> Result<(), DeliveryError> {
        warn!("{}", format_alert(payload));
        Ok(())
    }
}
