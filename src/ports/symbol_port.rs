//! Tradable symbol listing port.

use crate::domain::error::BtscanError;

pub trait SymbolPort {
    /// Symbols quoted in `quote_asset`, formatted as `BASE-QUOTE`.
    fn list_symbols(&self, quote_asset: &str) -> Result<Vec<String>, BtscanError>;
}
