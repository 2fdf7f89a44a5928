use async_trait::async_trait;

use crate::domain::source::SourceKind;
use crate::shared::errors::SourceError;
use crate::shared::types::{Interval, MarketSnapshot};

/// Trait for upstream market data source adapters
/// This provides a unified interface for different data providers
#[async_trait]
pub trait DataSourceAdapter: Send + Sync {
    /// Get the source kind this adapter handles
    fn kind(&self) -> SourceKind;

    /// Whether this adapter can serve the given identifier (by its shape)
    fn accepts(&self, identifier: &str) -> bool;

    /// Fetch a normalized market snapshot for one identifier.
    ///
    /// Adapters rate-limit themselves and never retry internally; retry
    /// policy belongs to the caller.
    async fn fetch(&self, identifier: &str, interval: Interval)
        -> Result<MarketSnapshot, SourceError>;
}
