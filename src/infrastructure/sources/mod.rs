//! Upstream data sources - adapters, dispatch and rate limiting

pub mod traits;
pub mod rate_limiter;
pub mod dispatcher;
pub mod helius;
pub mod dexscreener;

pub use traits::DataSourceAdapter;
pub use rate_limiter::{RateLimiter, RateLimiterRegistry};
pub use dispatcher::SourceDispatcher;
pub use helius::HeliusAdapter;
pub use dexscreener::DexScreenerAdapter;
