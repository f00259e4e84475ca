use std::collections::HashMap;

use tracing::info;

use crate::error::{AlertError, AlertResult};
use crate::upstream::MarketDataSource;

/// Immutable snapshot of the tradable symbols, in directory order.
#[derive(Debug, Clone)]
pub struct SymbolSet {
    symbols: Vec<String>,
    by_lowercase: HashMap<String, usize>,
}

impl SymbolSet {
    pub fn new<I, S>(symbols: I) -> AlertResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut ordered = Vec::new();
        let mut by_lowercase = HashMap::new();
        for symbol in symbols {
            let symbol: String = symbol.into();
            let key = symbol.to_lowercase();
            if key.is_empty() || by_lowercase.contains_key(&key) {
                continue;
            }
            by_lowercase.insert(key, ordered.len());
            ordered.push(symbol);
        }
        if ordered.is_empty() {
            return Err(AlertError::Startup("symbol directory returned no symbols".into()));
        }
        Ok(Self { symbols: ordered, by_lowercase })
    }

    /// Fetches the directory once. Any failure is a startup failure.
    pub async fn load<S: MarketDataSource + ?Sized>(source: &S) -> AlertResult<Self> {
        let symbols = source
            .symbols()
            .await
            .map_err(|e| AlertError::Startup(format!("could not load symbol directory: {e}")))?;
        let set = Self::new(symbols)?;
        info!("Loaded {} tradable symbols", set.len());
        Ok(set)
    }

    /// Canonical spelling of `symbol`, matched case-insensitively.
    pub fn resolve(&self, symbol: &str) -> Option<&str> {
        self.by_lowercase
            .get(&symbol.to_lowercase())
            .map(|&i| self.symbols[i].as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.symbols.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }
}
