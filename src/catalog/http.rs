//! HTTP catalog client
//!
//! Fetches the symbol roster from `GET {base_url}/api/stocks`, which answers
//! `{"stocks": [{"symbol": "AAPL", "name": "Apple Inc."}, ...]}`.

use super::{CatalogSource, CatalogUnavailableError, SymbolInfo};
use crate::config::CatalogConfig;
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;

/// Path of the catalog endpoint relative to the base URL
pub const CATALOG_PATH: &str = "/api/stocks";

#[derive(Debug, Deserialize)]
struct CatalogResponse {
    stocks: Vec<SymbolInfo>,
}

/// Catalog client backed by `reqwest`
pub struct HttpCatalog {
    base_url: String,
    client: Client,
}

impl HttpCatalog {
    /// Create a client from catalog configuration
    pub fn new(config: &CatalogConfig) -> Result<Self, CatalogUnavailableError> {
        let client = Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|e| CatalogUnavailableError(format!("HTTP client: {e}")))?;

        Ok(Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            client,
        })
    }

    fn catalog_url(&self) -> String {
        format!("{}{}", self.base_url, CATALOG_PATH)
    }
}

#[async_trait]
impl CatalogSource for HttpCatalog {
    async fn fetch_symbols(&self) -> Result<Vec<SymbolInfo>, CatalogUnavailableError> {
        let url = self.catalog_url();
        tracing::debug!(url = %url, "Fetching symbol catalog");

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| CatalogUnavailableError(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(CatalogUnavailableError(format!("{status} - {body}")));
        }

        let catalog: CatalogResponse = response
            .json()
            .await
            .map_err(|e| CatalogUnavailableError(format!("Invalid catalog body: {e}")))?;

        tracing::info!(symbols = catalog.stocks.len(), "Fetched symbol catalog");
        Ok(catalog.stocks)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_catalog_url_strips_trailing_slash() {
        let config = CatalogConfig {
            base_url: "http://localhost:8000/".to_string(),
            timeout_secs: 1,
        };
        let catalog = HttpCatalog::new(&config).unwrap();
        assert_eq!(catalog.catalog_url(), "http://localhost:8000/api/stocks");
    }

    #[test]
    fn test_parse_catalog_response() {
        let body = r#"{
            "stocks": [
                {"symbol": "AAPL", "name": "Apple Inc."},
                {"symbol": "GOOGL", "name": "Alphabet Inc."}
            ]
        }"#;

        let parsed: CatalogResponse = serde_json::from_str(body).unwrap();
        assert_eq!(parsed.stocks.len(), 2);
        assert_eq!(parsed.stocks[0].symbol.as_str(), "AAPL");
        assert_eq!(parsed.stocks[1].display_name, "Alphabet Inc.");
    }

    #[tokio::test]
    async fn test_unreachable_catalog_is_unavailable() {
        let config = CatalogConfig {
            base_url: "http://127.0.0.1:1".to_string(),
            timeout_secs: 2,
        };
        let catalog = HttpCatalog::new(&config).unwrap();
        let err = catalog.fetch_symbols().await.unwrap_err();
        assert!(err.to_string().starts_with("Catalog unavailable"));
    }
}
