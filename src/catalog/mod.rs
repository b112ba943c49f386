//! Symbol catalog module
//!
//! Discovers the tradable symbols the dashboard should stream

mod http;

pub use http::{HttpCatalog, CATALOG_PATH};

use crate::feed::Symbol;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A catalog entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SymbolInfo {
    pub symbol: Symbol,
    /// Human-readable name (e.g., "Apple Inc.")
    #[serde(rename = "name")]
    pub display_name: String,
}

/// The catalog could not be fetched or decoded
#[derive(Debug, Error)]
#[error("Catalog unavailable: {0}")]
pub struct CatalogUnavailableError(pub String);

/// Source of the symbol roster
#[async_trait]
pub trait CatalogSource: Send + Sync {
    /// Fetch every available symbol, in display order
    async fn fetch_symbols(&self) -> Result<Vec<SymbolInfo>, CatalogUnavailableError>;
}
