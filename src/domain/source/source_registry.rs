//! Registry of supported upstream market data sources

/// Supported upstream source kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SourceKind {
    /// Solana on-chain data provider (enhanced transaction history)
    Helius,
    /// Generic market aggregator, used as the fallback for any identifier
    DexScreener,
}

/// Source information
#[derive(Debug, Clone)]
pub struct SourceInfo {
    pub name: String,
    pub kind: SourceKind,
    pub base_url: String,
    pub max_calls_per_second: u32,
    pub is_active: bool,
}

/// Registry of upstream sources
pub struct SourceRegistry;

impl SourceRegistry {
    /// Get all supported sources
    pub fn get_all_sources() -> Vec<SourceInfo> {
        vec![
            SourceInfo {
                name: "helius".to_string(),
                kind: SourceKind::Helius,
                base_url: "https://api.helius.xyz/v0".to_string(),
                // Free-plan RPC cap; the DAS endpoints allow only 2/s but
                // the adapter stays on RPC-backed routes.
                max_calls_per_second: 10,
                is_active: true,
            },
            SourceInfo {
                name: "dexscreener".to_string(),
                kind: SourceKind::DexScreener,
                base_url: "https://api.dexscreener.com/latest/dex".to_string(),
                // Public API allows 60 calls per minute.
                max_calls_per_second: 1,
                is_active: true,
            },
        ]
    }

    /// Get source by kind
    pub fn get_source_by_kind(kind: &SourceKind) -> Option<SourceInfo> {
        Self::get_all_sources()
            .into_iter()
            .find(|source| source.kind == *kind)
    }

    /// Get active sources only
    pub fn get_active_sources() -> Vec<SourceInfo> {
        Self::get_all_sources()
            .into_iter()
            .filter(|source| source.is_active)
            .collect()
    }
}

impl SourceKind {
    /// Get string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceKind::Helius => "Helius",
            SourceKind::DexScreener => "DexScreener",
        }
    }
}

impl std::fmt::Display for SourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
