//! Source dispatcher - adapter selection and ordered fallback
//!
//! The only place fallback ordering is decided; monitor sessions never pick
//! adapters directly.

use std::sync::Arc;
use tracing::{debug, warn};

use super::traits::DataSourceAdapter;
use crate::shared::errors::{DispatchError, SourceError};
use crate::shared::types::{Interval, MarketSnapshot};

/// Dispatches fetches across the registered adapters.
///
/// Registration order encodes specificity: chain-specific adapters first,
/// the generic fallback last. The registration is immutable after startup.
pub struct SourceDispatcher {
    adapters: Vec<Arc<dyn DataSourceAdapter>>,
    fallback: Arc<dyn DataSourceAdapter>,
}

impl SourceDispatcher {
    pub fn new(
        adapters: Vec<Arc<dyn DataSourceAdapter>>,
        fallback: Arc<dyn DataSourceAdapter>,
    ) -> Self {
        Self { adapters, fallback }
    }

    /// Adapters able to serve `identifier`, most specific first, ending with
    /// the generic fallback when it accepts the identifier too. An identifier
    /// no adapter claims (the fallback takes anything non-empty) is a caller
    /// fault, surfaced as `Internal` by [`resolve`](Self::resolve).
    pub fn select(&self, identifier: &str) -> Vec<Arc<dyn DataSourceAdapter>> {
        let mut selected: Vec<Arc<dyn DataSourceAdapter>> = self
            .adapters
            .iter()
            .filter(|adapter| adapter.accepts(identifier))
            .cloned()
            .collect();
        if self.fallback.accepts(identifier)
            && !selected.iter().any(|a| a.kind() == self.fallback.kind())
        {
            selected.push(Arc::clone(&self.fallback));
        }
        selected
    }

    /// Try adapters in order: `NotFound` and transient failures move on to
    /// the next adapter; a permanent failure or exhaustion of the list ends
    /// the attempt with `NoDataAvailable`.
    pub async fn resolve(
        &self,
        identifier: &str,
        interval: Interval,
    ) -> Result<MarketSnapshot, DispatchError> {
        let candidates = self.select(identifier);
        if candidates.is_empty() {
            return Err(DispatchError::Internal(format!(
                "no adapter accepts identifier: {identifier:?}"
            )));
        }

        for adapter in &candidates {
            debug!(identifier, source = %adapter.kind(), "trying adapter");
            match adapter.fetch(identifier, interval).await {
                Ok(snapshot) => return Ok(snapshot),
                Err(err @ (SourceError::NotFound(_) | SourceError::Transient(_))) => {
                    debug!(identifier, source = %adapter.kind(), %err, "adapter miss, falling through");
                }
                Err(err @ SourceError::Permanent(_)) => {
                    warn!(identifier, source = %adapter.kind(), %err, "permanent upstream failure");
                    return Err(DispatchError::NoDataAvailable(identifier.to_string()));
                }
            }
        }

        Err(DispatchError::NoDataAvailable(identifier.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::source::SourceKind;
    use async_trait::async_trait;
    use chrono::Utc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct StubAdapter {
        kind: SourceKind,
        accepts_all: bool,
        outcome: Result<f64, SourceError>,
        calls: AtomicUsize,
    }

    impl StubAdapter {
        fn new(kind: SourceKind, accepts_all: bool, outcome: Result<f64, SourceError>) -> Arc<Self> {
            Arc::new(Self {
                kind,
                accepts_all,
                outcome,
                calls: AtomicUsize::new(0),
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl DataSourceAdapter for StubAdapter {
        fn kind(&self) -> SourceKind {
            self.kind
        }

        fn accepts(&self, identifier: &str) -> bool {
            self.accepts_all || identifier.len() >= 32
        }

        async fn fetch(
            &self,
            identifier: &str,
            interval: Interval,
        ) -> Result<MarketSnapshot, SourceError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let volume = self.outcome.clone()?;
            Ok(MarketSnapshot {
                identifier: identifier.to_string(),
                interval,
                timestamp: Utc::now(),
                open: 1.0,
                high: 1.0,
                low: 1.0,
                close: 1.0,
                volume,
                trade_count: None,
            })
        }
    }

    const SOL_MINT: &str = "7xKXtg2CW87d97TXJSDpbD5jBkheTqA83TZRuJosgAsU";

    #[tokio::test]
    async fn test_specific_adapter_tried_before_fallback() {
        let specific = StubAdapter::new(SourceKind::Helius, false, Ok(100.0));
        let fallback = StubAdapter::new(SourceKind::DexScreener, true, Ok(999.0));
        let dispatcher = SourceDispatcher::new(
            vec![specific.clone() as Arc<dyn DataSourceAdapter>],
            fallback.clone(),
        );

        let snapshot = dispatcher
            .resolve(SOL_MINT, Interval::OneMinute)
            .await
            .unwrap();
        assert_eq!(snapshot.volume, 100.0);
        assert_eq!(specific.calls(), 1);
        assert_eq!(fallback.calls(), 0);
    }

    #[tokio::test]
    async fn test_short_identifier_goes_straight_to_fallback() {
        let specific = StubAdapter::new(SourceKind::Helius, false, Ok(100.0));
        let fallback = StubAdapter::new(SourceKind::DexScreener, true, Ok(42.0));
        let dispatcher = SourceDispatcher::new(
            vec![specific.clone() as Arc<dyn DataSourceAdapter>],
            fallback.clone(),
        );

        let snapshot = dispatcher.resolve("PEPE", Interval::OneMinute).await.unwrap();
        assert_eq!(snapshot.volume, 42.0);
        assert_eq!(specific.calls(), 0);
    }

    #[tokio::test]
    async fn test_not_found_falls_through_to_next_adapter() {
        let specific = StubAdapter::new(
            SourceKind::Helius,
            false,
            Err(SourceError::NotFound("mint".into())),
        );
        let fallback = StubAdapter::new(SourceKind::DexScreener, true, Ok(55.0));
        let dispatcher = SourceDispatcher::new(
            vec![specific.clone() as Arc<dyn DataSourceAdapter>],
            fallback.clone(),
        );

        let snapshot = dispatcher
            .resolve(SOL_MINT, Interval::OneMinute)
            .await
            .unwrap();
        assert_eq!(snapshot.volume, 55.0);
        assert_eq!(specific.calls(), 1);
        assert_eq!(fallback.calls(), 1);
    }

    #[tokio::test]
    async fn test_transient_failure_falls_through() {
        let specific = StubAdapter::new(
            SourceKind::Helius,
            false,
            Err(SourceError::Transient("timeout".into())),
        );
        let fallback = StubAdapter::new(SourceKind::DexScreener, true, Ok(12.0));
        let dispatcher = SourceDispatcher::new(
            vec![specific as Arc<dyn DataSourceAdapter>],
            fallback,
        );

        let snapshot = dispatcher
            .resolve(SOL_MINT, Interval::OneMinute)
            .await
            .unwrap();
        assert_eq!(snapshot.volume, 12.0);
    }

    #[tokio::test]
    async fn test_permanent_failure_short_circuits() {
        let specific = StubAdapter::new(
            SourceKind::Helius,
            false,
            Err(SourceError::Permanent("bad key".into())),
        );
        let fallback = StubAdapter::new(SourceKind::DexScreener, true, Ok(12.0));
        let dispatcher = SourceDispatcher::new(
            vec![specific as Arc<dyn DataSourceAdapter>],
            fallback.clone(),
        );

        let err = dispatcher
            .resolve(SOL_MINT, Interval::OneMinute)
            .await
            .unwrap_err();
        assert!(matches!(err, DispatchError::NoDataAvailable(_)));
        assert_eq!(fallback.calls(), 0);
    }

    #[tokio::test]
    async fn test_identifier_nobody_accepts_is_an_internal_fault() {
        let specific = StubAdapter::new(SourceKind::Helius, false, Ok(100.0));
        // A fallback that only takes address-shaped identifiers.
        let fallback = StubAdapter::new(SourceKind::DexScreener, false, Ok(42.0));
        let dispatcher = SourceDispatcher::new(
            vec![specific.clone() as Arc<dyn DataSourceAdapter>],
            fallback.clone(),
        );

        let err = dispatcher.resolve("", Interval::OneMinute).await.unwrap_err();
        assert!(matches!(err, DispatchError::Internal(_)));
        assert_eq!(specific.calls(), 0);
        assert_eq!(fallback.calls(), 0);
    }

    #[tokio::test]
    async fn test_exhaustion_yields_no_data_available() {
        let specific = StubAdapter::new(
            SourceKind::Helius,
            false,
            Err(SourceError::NotFound("mint".into())),
        );
        let fallback = StubAdapter::new(
            SourceKind::DexScreener,
            true,
            Err(SourceError::Transient("down".into())),
        );
        let dispatcher = SourceDispatcher::new(
            vec![specific as Arc<dyn DataSourceAdapter>],
            fallback,
        );

        let err = dispatcher
            .resolve(SOL_MINT, Interval::OneMinute)
            .await
            .unwrap_err();
        assert!(matches!(err, DispatchError::NoDataAvailable(_)));
    }
}
