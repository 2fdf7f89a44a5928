//! Source domain - upstream market data providers

mod source_registry;

pub use source_registry::{SourceInfo, SourceKind, SourceRegistry};
