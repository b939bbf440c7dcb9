//! Symbol listing from a cached exchange-info JSON document.
//!
//! The document is the payload an exchange's `exchangeInfo` endpoint returns;
//! fetching it is left to the caller; this adapter only reads a saved copy.

use crate::domain::error::BtscanError;
use crate::ports::symbol_port::SymbolPort;
use chrono::DateTime;
use serde::Deserialize;
use std::fs;
use std::path::Path;
use tracing::info;

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExchangeInfo {
    pub server_time: i64,
    pub symbols: Vec<SymbolInfo>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SymbolInfo {
    pub base_asset: String,
    pub quote_asset: String,
    pub status: String,
    #[serde(default)]
    pub permissions: Vec<String>,
}

impl SymbolInfo {
    /// Leveraged tokens (UP/DOWN) carry a `LEVERAGED` permission.
    pub fn is_leveraged(&self) -> bool {
        self.permissions.iter().any(|p| p == "LEVERAGED")
    }
}

pub struct ExchangeInfoAdapter {
    info: ExchangeInfo,
}

impl ExchangeInfoAdapter {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, BtscanError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| BtscanError::ExchangeInfo {
            reason: format!("failed to read {}: {}", path.display(), e),
        })?;
        let adapter = Self::from_json(&content)?;

        if let Some(ts) = DateTime::from_timestamp_millis(adapter.info.server_time) {
            info!(
                path = %path.display(),
                cached_at = %ts.format("%Y-%m-%d %H:%M"),
                "using cached exchange info"
            );
        }
        Ok(adapter)
    }

    pub fn from_json(content: &str) -> Result<Self, BtscanError> {
        let info: ExchangeInfo =
            serde_json::from_str(content).map_err(|e| BtscanError::ExchangeInfo {
                reason: format!("invalid exchange info: {}", e),
            })?;
        Ok(Self { info })
    }

    pub fn server_time(&self) -> i64 {
        self.info.server_time
    }
}

impl SymbolPort for ExchangeInfoAdapter {
    fn list_symbols(&self, quote_asset: &str) -> Result<Vec<String>, BtscanError> {
        Ok(self
            .info
            .symbols
            .iter()
            .filter(|s| s.quote_asset == quote_asset && !s.is_leveraged() && s.status != "BREAK")
            .map(|s| format!("{}-{}", s.base_asset, quote_asset))
            .collect())
    }
}
