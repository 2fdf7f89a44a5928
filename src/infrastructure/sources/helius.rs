//! Helius adapter - Solana on-chain data provider
//!
//! Builds a one-interval candle for a mint from its recent enhanced
//! transaction history, with the asset price from the getAsset RPC method.

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use super::rate_limiter::RateLimiter;
use super::traits::DataSourceAdapter;
use crate::domain::source::SourceKind;
use crate::shared::errors::SourceError;
use crate::shared::types::{Interval, MarketSnapshot};

const USDC_MINT: &str = "EPjFWdd5AufqSSqeM2qN1xzybapC8G4wEGGkZwyTDt1v";

#[derive(Debug, Deserialize)]
struct GetAssetResponse {
    result: Option<AssetResult>,
    error: Option<RpcError>,
}

#[derive(Debug, Deserialize)]
struct RpcError {
    message: String,
}

#[derive(Debug, Deserialize)]
struct AssetResult {
    #[serde(rename = "token_info")]
    token_info: Option<TokenInfo>,
}

#[derive(Debug, Deserialize)]
struct TokenInfo {
    #[serde(rename = "price_info")]
    price_info: Option<PriceInfo>,
}

#[derive(Debug, Deserialize)]
struct PriceInfo {
    #[serde(rename = "price_per_token")]
    price_per_token: Option<f64>,
}

/// One entry from the enhanced transactions endpoint
#[derive(Debug, Deserialize)]
struct EnhancedTransaction {
    timestamp: Option<i64>,
    #[serde(rename = "tokenTransfers", default)]
    token_transfers: Vec<TokenTransfer>,
}

#[derive(Debug, Deserialize)]
struct TokenTransfer {
    mint: Option<String>,
    #[serde(rename = "tokenAmount")]
    token_amount: Option<f64>,
}

/// A single observed trade of the watched mint
#[derive(Debug, Clone)]
struct Trade {
    timestamp: DateTime<Utc>,
    amount: f64,
    /// USD price implied by a paired stablecoin leg, if one was present.
    price: Option<f64>,
}

/// Helius API adapter (Solana on-chain data)
pub struct HeliusAdapter {
    http_client: Client,
    base_url: String,
    rpc_url: String,
    api_key: String,
    limiter: Arc<RateLimiter>,
}

impl HeliusAdapter {
    pub const DEFAULT_BASE_URL: &'static str = "https://api.helius.xyz/v0";
    pub const DEFAULT_RPC_URL: &'static str = "https://mainnet.helius-rpc.com";
    const REQUEST_TIMEOUT: Duration = Duration::from_secs(5);
    const TX_LIMIT: u32 = 100;

    pub fn new(
        base_url: String,
        rpc_url: String,
        api_key: String,
        limiter: Arc<RateLimiter>,
    ) -> Self {
        Self {
            http_client: Client::new(),
            base_url,
            rpc_url,
            api_key,
            limiter,
        }
    }

    /// Solana address shape: 32-44 base58 characters.
    pub fn is_solana_address(address: &str) -> bool {
        if address.len() < 32 || address.len() > 44 {
            return false;
        }
        address.chars().all(|c| {
            c.is_ascii_alphanumeric() && !matches!(c, '0' | 'O' | 'I' | 'l')
        })
    }

    fn transient(err: reqwest::Error) -> SourceError {
        if err.is_timeout() {
            SourceError::Transient(format!("Helius request timed out: {err}"))
        } else {
            SourceError::Transient(format!("Helius request failed: {err}"))
        }
    }

    /// Current USD price via the getAsset RPC method.
    async fn get_current_price(&self, identifier: &str) -> Result<f64, SourceError> {
        let url = format!("{}/?api-key={}", self.rpc_url, self.api_key);
        let payload = json!({
            "jsonrpc": "2.0",
            "id": "1",
            "method": "getAsset",
            "params": {
                "id": identifier,
                "displayOptions": { "showFungible": true }
            }
        });

        let response = self
            .http_client
            .post(&url)
            .json(&payload)
            .timeout(Self::REQUEST_TIMEOUT)
            .send()
            .await
            .map_err(Self::transient)?;

        let status = response.status();
        if status.is_server_error() || status.as_u16() == 429 {
            return Err(SourceError::Transient(format!(
                "Helius RPC returned status {status}"
            )));
        }
        if !status.is_success() {
            return Err(SourceError::Permanent(format!(
                "Helius RPC returned status {status}"
            )));
        }

        let body: GetAssetResponse = response
            .json()
            .await
            .map_err(|e| SourceError::Transient(format!("Helius RPC parse failed: {e}")))?;

        if let Some(err) = body.error {
            return Err(SourceError::NotFound(format!(
                "{identifier}: {}",
                err.message
            )));
        }

        body.result
            .and_then(|r| r.token_info)
            .and_then(|t| t.price_info)
            .and_then(|p| p.price_per_token)
            .filter(|p| *p > 0.0)
            .ok_or_else(|| SourceError::NotFound(identifier.to_string()))
    }

    /// Recent trades of the mint from the enhanced transactions endpoint.
    async fn get_recent_trades(&self, identifier: &str) -> Result<Vec<Trade>, SourceError> {
        let url = format!(
            "{}/addresses/{}/transactions?api-key={}&limit={}",
            self.base_url,
            identifier,
            self.api_key,
            Self::TX_LIMIT
        );

        let response = self
            .http_client
            .get(&url)
            .timeout(Self::REQUEST_TIMEOUT)
            .send()
            .await
            .map_err(Self::transient)?;

        let status = response.status();
        if status.as_u16() == 404 {
            return Err(SourceError::NotFound(identifier.to_string()));
        }
        if status.is_server_error() || status.as_u16() == 429 {
            return Err(SourceError::Transient(format!(
                "Helius transactions returned status {status}"
            )));
        }
        if !status.is_success() {
            return Err(SourceError::Permanent(format!(
                "Helius transactions returned status {status}"
            )));
        }

        let transactions: Vec<EnhancedTransaction> = response
            .json()
            .await
            .map_err(|e| SourceError::Transient(format!("Helius transactions parse failed: {e}")))?;

        Ok(transactions
            .iter()
            .filter_map(|tx| Self::parse_trade(tx, identifier))
            .collect())
    }

    /// Extract the watched mint's traded amount and, when a USDC leg is
    /// present in the same transaction, the implied USD price.
    fn parse_trade(tx: &EnhancedTransaction, identifier: &str) -> Option<Trade> {
        let timestamp = Utc.timestamp_opt(tx.timestamp?, 0).single()?;

        let mut token_amount = 0.0;
        let mut usdc_amount = 0.0;
        for transfer in &tx.token_transfers {
            let amount = transfer.token_amount.unwrap_or(0.0).abs();
            match transfer.mint.as_deref() {
                Some(mint) if mint == identifier => token_amount += amount,
                Some(USDC_MINT) => usdc_amount += amount,
                _ => {}
            }
        }

        if token_amount <= 0.0 {
            return None;
        }

        let price = (usdc_amount > 0.0).then(|| usdc_amount / token_amount);
        Some(Trade {
            timestamp,
            amount: token_amount,
            price,
        })
    }

    /// Aggregate the trades inside the interval window into one candle.
    /// With no trades in the window the current price stands in for all
    /// four legs and the volume is zero.
    fn build_candle(
        identifier: &str,
        interval: Interval,
        current_price: f64,
        trades: &[Trade],
        now: DateTime<Utc>,
    ) -> MarketSnapshot {
        let window_start = now
            - chrono::Duration::from_std(interval.duration())
                .unwrap_or_else(|_| chrono::Duration::seconds(60));

        let mut window: Vec<&Trade> = trades
            .iter()
            .filter(|t| t.timestamp >= window_start && t.timestamp <= now)
            .collect();
        window.sort_by_key(|t| t.timestamp);

        let prices: Vec<f64> = window
            .iter()
            .map(|t| t.price.unwrap_or(current_price))
            .collect();
        let token_volume: f64 = window.iter().map(|t| t.amount).sum();
        // Volume is reported in USD terms, matching the aggregator source.
        let quote_volume: f64 = window
            .iter()
            .map(|t| t.amount * t.price.unwrap_or(current_price))
            .sum();

        let (open, high, low, close) = if prices.is_empty() {
            (current_price, current_price, current_price, current_price)
        } else {
            (
                prices[0],
                prices.iter().cloned().fold(f64::MIN, f64::max),
                prices.iter().cloned().fold(f64::MAX, f64::min),
                prices[prices.len() - 1],
            )
        };

        debug!(
            identifier,
            trades = window.len(),
            token_volume,
            quote_volume,
            "built candle from transaction history"
        );

        MarketSnapshot {
            identifier: identifier.to_string(),
            interval,
            timestamp: now,
            open,
            high,
            low,
            close,
            volume: quote_volume,
            trade_count: Some(window.len() as u64),
        }
    }
}

#[async_trait]
impl DataSourceAdapter for HeliusAdapter {
    fn kind(&self) -> SourceKind {
        SourceKind::Helius
    }

    fn accepts(&self, identifier: &str) -> bool {
        Self::is_solana_address(identifier)
    }

    async fn fetch(
        &self,
        identifier: &str,
        interval: Interval,
    ) -> Result<MarketSnapshot, SourceError> {
        if self.api_key.is_empty() {
            return Err(SourceError::Permanent(
                "Helius API key not configured".to_string(),
            ));
        }
        if !Self::is_solana_address(identifier) {
            return Err(SourceError::NotFound(identifier.to_string()));
        }

        // One slot per upstream request.
        self.limiter.acquire().await;
        let current_price = self.get_current_price(identifier).await?;

        self.limiter.acquire().await;
        let trades = match self.get_recent_trades(identifier).await {
            Ok(trades) => trades,
            Err(err) if err.is_retryable() => {
                // The price alone still makes a usable zero-volume candle.
                warn!(identifier, %err, "transaction history unavailable, price-only candle");
                Vec::new()
            }
            Err(err) => return Err(err),
        };

        Ok(Self::build_candle(
            identifier,
            interval,
            current_price,
            &trades,
            Utc::now(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration as ChronoDuration;

    #[test]
    fn test_all_requests_share_the_declared_timeout() {
        assert_eq!(HeliusAdapter::REQUEST_TIMEOUT, Duration::from_secs(5));
    }

    #[test]
    fn test_solana_address_shape() {
        assert!(HeliusAdapter::is_solana_address(
            "7xKXtg2CW87d97TXJSDpbD5jBkheTqA83TZRuJosgAsU"
        ));
        assert!(HeliusAdapter::is_solana_address(
            "So11111111111111111111111111111111111111112"
        ));
        // Too short, wrong alphabet, EVM shape.
        assert!(!HeliusAdapter::is_solana_address("PEPE"));
        assert!(!HeliusAdapter::is_solana_address(
            "0x6982508145454ce325ddbe47a25d4ec3d2311933"
        ));
        assert!(!HeliusAdapter::is_solana_address(""));
    }

    #[test]
    fn test_parse_trade_sums_matching_transfers() {
        let tx: EnhancedTransaction = serde_json::from_str(
            r#"{
                "timestamp": 1700000000,
                "tokenTransfers": [
                    {"mint": "mint-a", "tokenAmount": 100.0},
                    {"mint": "mint-a", "tokenAmount": -25.0},
                    {"mint": "EPjFWdd5AufqSSqeM2qN1xzybapC8G4wEGGkZwyTDt1v", "tokenAmount": 250.0},
                    {"mint": "other", "tokenAmount": 7.0}
                ]
            }"#,
        )
        .unwrap();
        let trade = HeliusAdapter::parse_trade(&tx, "mint-a").unwrap();
        assert_eq!(trade.amount, 125.0);
        assert_eq!(trade.price, Some(2.0));
    }

    #[test]
    fn test_parse_trade_skips_unrelated_transactions() {
        let tx: EnhancedTransaction = serde_json::from_str(
            r#"{"timestamp": 1700000000, "tokenTransfers": [{"mint": "other", "tokenAmount": 5.0}]}"#,
        )
        .unwrap();
        assert!(HeliusAdapter::parse_trade(&tx, "mint-a").is_none());
    }

    #[test]
    fn test_candle_aggregates_window_trades() {
        let now = Utc::now();
        let trades = vec![
            Trade {
                timestamp: now - ChronoDuration::seconds(50),
                amount: 100.0,
                price: Some(1.0),
            },
            Trade {
                timestamp: now - ChronoDuration::seconds(20),
                amount: 50.0,
                price: Some(3.0),
            },
            // Outside the 1m window, must be ignored.
            Trade {
                timestamp: now - ChronoDuration::seconds(300),
                amount: 999.0,
                price: Some(9.0),
            },
        ];
        let candle = HeliusAdapter::build_candle("mint-a", Interval::OneMinute, 2.0, &trades, now);
        assert_eq!(candle.open, 1.0);
        assert_eq!(candle.close, 3.0);
        assert_eq!(candle.high, 3.0);
        assert_eq!(candle.low, 1.0);
        assert_eq!(candle.volume, 100.0 + 150.0);
        assert_eq!(candle.trade_count, Some(2));
    }

    #[test]
    fn test_candle_without_trades_uses_current_price() {
        let now = Utc::now();
        let candle = HeliusAdapter::build_candle("mint-a", Interval::OneMinute, 0.5, &[], now);
        assert_eq!(candle.open, 0.5);
        assert_eq!(candle.close, 0.5);
        assert_eq!(candle.volume, 0.0);
        assert_eq!(candle.trade_count, Some(0));
    }
}
