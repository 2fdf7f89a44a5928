//! Telegram alert sink - delivers alerts via the Bot API

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;
use tracing::debug;

use super::{format_alert, AlertSink};
use crate::shared::errors::DeliveryError;
use crate::shared::types::AlertPayload;

#[derive(Debug, Deserialize)]
struct SendMessageResponse {
    ok: bool,
    description: Option<String>,
}

/// Telegram Bot API sink
pub struct TelegramSink {
    http_client: Client,
    api_base: String,
    bot_token: String,
    default_chat_id: String,
}

impl TelegramSink {
    pub const DEFAULT_API_BASE: &'static str = "https://api.telegram.org";
    const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

    pub fn new(api_base: String, bot_token: String, default_chat_id: String) -> Self {
        Self {
            http_client: Client::new(),
            api_base,
            bot_token,
            default_chat_id,
        }
    }
}

#[async_trait]
impl AlertSink for TelegramSink {
    async fn send_alert(&self, payload: &AlertPayload) -> Result<(), DeliveryError> {
        let chat_id = payload
            .destination
            .as_deref()
            .unwrap_or(&self.default_chat_id);
        let url = format!("{}/bot{}/sendMessage", self.api_base, self.bot_token);
        let body = json!({
            "chat_id": chat_id,
            "text": format_alert(payload),
            "disable_web_page_preview": true,
        });

        let response = self
            .http_client
            .post(&url)
            .json(&body)
            .timeout(Self::REQUEST_TIMEOUT)
            .send()
            .await
            .map_err(|e| DeliveryError::SendFailed(format!("Telegram request failed: {e}")))?;

        let status = response.status();
        let parsed: SendMessageResponse = response
            .json()
            .await
            .map_err(|e| DeliveryError::SendFailed(format!("Telegram response parse failed: {e}")))?;

        if !status.is_success() || !parsed.ok {
            return Err(DeliveryError::Rejected(format!(
                "Telegram sendMessage failed (status {status}): {}",
                parsed.description.unwrap_or_else(|| "no description".to_string())
            )));
        }

        debug!(identifier = %payload.identifier, chat_id, "alert delivered via Telegram");
        Ok(())
    }
}
