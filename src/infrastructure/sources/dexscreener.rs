//! DexScreener adapter - generic market aggregator, the fallback source
//! for identifiers no chain-specific adapter claims.

use async_trait::async_trait;
use chrono::Utc;
use reqwest::Client;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use super::rate_limiter::RateLimiter;
use super::traits::DataSourceAdapter;
use crate::domain::source::SourceKind;
use crate::shared::errors::SourceError;
use crate::shared::types::{Interval, MarketSnapshot};

/// Response structure from the DexScreener token endpoint
#[derive(Debug, Deserialize)]
struct TokenResponse {
    pairs: Option<Vec<PairData>>,
}

#[derive(Debug, Deserialize)]
struct PairData {
    #[serde(rename = "baseToken")]
    base_token: Option<TokenMeta>,
    #[serde(rename = "priceUsd")]
    price_usd: Option<String>,
    volume: Option<VolumeBuckets>,
    txns: Option<TxnBuckets>,
    liquidity: Option<LiquidityData>,
}

#[derive(Debug, Deserialize)]
struct TokenMeta {
    address: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct VolumeBuckets {
    m5: Option<f64>,
    h1: Option<f64>,
    h6: Option<f64>,
    h24: Option<f64>,
}

#[derive(Debug, Default, Deserialize)]
struct TxnBuckets {
    h24: Option<TxnCounts>,
}

#[derive(Debug, Default, Deserialize)]
struct TxnCounts {
    buys: Option<u64>,
    sells: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct LiquidityData {
    usd: Option<f64>,
}

/// DexScreener API adapter
pub struct DexScreenerAdapter {
    http_client: Client,
    base_url: String,
    limiter: Arc<RateLimiter>,
}

impl DexScreenerAdapter {
    pub const DEFAULT_BASE_URL: &'static str = "https://api.dexscreener.com/latest/dex";
    const REQUEST_TIMEOUT: Duration = Duration::from_secs(8);

    pub fn new(base_url: String, limiter: Arc<RateLimiter>) -> Self {
        Self {
            http_client: Client::new(),
            base_url,
            limiter,
        }
    }

    /// Pick the interval's nearest volume bucket; DexScreener does not
    /// expose a 1m bucket, so the shortest interval maps to m5.
    fn volume_for_interval(volume: &VolumeBuckets, interval: Interval) -> f64 {
        match interval {
            Interval::OneMinute | Interval::FiveMinutes => volume.m5,
            Interval::FifteenMinutes | Interval::OneHour => volume.h1,
        }
        .or(volume.h6)
        .or(volume.h24)
        .unwrap_or(0.0)
    }

    fn to_snapshot(
        &self,
        identifier: &str,
        interval: Interval,
        pair: &PairData,
    ) -> Result<MarketSnapshot, SourceError> {
        let price: f64 = pair
            .price_usd
            .as_deref()
            .ok_or_else(|| SourceError::Permanent(format!("pair without priceUsd: {identifier}")))?
            .parse()
            .map_err(|e| SourceError::Permanent(format!("unparseable priceUsd: {e}")))?;
        if price <= 0.0 {
            return Err(SourceError::NotFound(identifier.to_string()));
        }

        let volume = pair
            .volume
            .as_ref()
            .map(|v| Self::volume_for_interval(v, interval))
            .unwrap_or(0.0);

        let trade_count = pair.txns.as_ref().and_then(|t| t.h24.as_ref()).map(|h24| {
            h24.buys.unwrap_or(0) + h24.sells.unwrap_or(0)
        });

        // The aggregator only exposes the current price, so it stands in
        // for all four candle legs.
        Ok(MarketSnapshot {
            identifier: identifier.to_string(),
            interval,
            timestamp: Utc::now(),
            open: price,
            high: price,
            low: price,
            close: price,
            volume,
            trade_count,
        })
    }
}

#[async_trait]
impl DataSourceAdapter for DexScreenerAdapter {
    fn kind(&self) -> SourceKind {
        SourceKind::DexScreener
    }

    /// Generic fallback: any non-empty identifier is worth asking about.
    fn accepts(&self, identifier: &str) -> bool {
        !identifier.trim().is_empty()
    }

    async fn fetch(
        &self,
        identifier: &str,
        interval: Interval,
    ) -> Result<MarketSnapshot, SourceError> {
        self.limiter.acquire().await;

        let url = format!("{}/tokens/{}", self.base_url, identifier);
        debug!(identifier, %url, "fetching DexScreener pair data");

        let response = self
            .http_client
            .get(&url)
            .timeout(Self::REQUEST_TIMEOUT)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    SourceError::Transient(format!("DexScreener request timed out: {e}"))
                } else {
                    SourceError::Transient(format!("DexScreener request failed: {e}"))
                }
            })?;

        let status = response.status();
        if status.as_u16() == 404 {
            return Err(SourceError::NotFound(identifier.to_string()));
        }
        if status.is_server_error() || status.as_u16() == 429 {
            return Err(SourceError::Transient(format!(
                "DexScreener returned status {status}"
            )));
        }
        if !status.is_success() {
            return Err(SourceError::Permanent(format!(
                "DexScreener returned status {status}"
            )));
        }

        let body: TokenResponse = response
            .json()
            .await
            .map_err(|e| SourceError::Transient(format!("DexScreener response parse failed: {e}")))?;

        let pairs = body.pairs.unwrap_or_default();
        if pairs.is_empty() {
            warn!(identifier, "no pairs found on DexScreener");
            return Err(SourceError::NotFound(identifier.to_string()));
        }

        // Use the pair with the deepest USD liquidity.
        let pair = pairs
            .iter()
            .max_by(|a, b| {
                let la = a.liquidity.as_ref().and_then(|l| l.usd).unwrap_or(0.0);
                let lb = b.liquidity.as_ref().and_then(|l| l.usd).unwrap_or(0.0);
                la.total_cmp(&lb)
            })
            .ok_or_else(|| SourceError::NotFound(identifier.to_string()))?;

        if let Some(base) = pair.base_token.as_ref().and_then(|t| t.address.as_deref()) {
            debug!(identifier, base, "selected deepest-liquidity pair");
        }

        self.to_snapshot(identifier, interval, pair)
    }
}
