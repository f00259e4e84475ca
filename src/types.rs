use serde::{Deserialize, Serialize};

use crate::error::{AlertError, AlertResult};

// ── Upstream payloads ──

/// Ticker payload from the Gemini v2 ticker endpoint. Prices arrive as
/// decimal strings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TickerSnapshot {
    #[serde(default)]
    pub symbol: String,
    #[serde(default)]
    pub open: String,
    #[serde(default)]
    pub high: String,
    #[serde(default)]
    pub low: String,
    /// Last traded price.
    pub close: String,
    /// Hourly prices over the last day, oldest first.
    #[serde(default)]
    pub changes: Vec<String>,
    #[serde(default)]
    pub bid: String,
    #[serde(default)]
    pub ask: String,
}

impl TickerSnapshot {
    pub fn new(symbol: &str, close: f64, changes: &[f64]) -> Self {
        Self {
            symbol: symbol.to_string(),
            close: close.to_string(),
            changes: changes.iter().map(|p| p.to_string()).collect(),
            ..Default::default()
        }
    }

    pub fn last_price(&self) -> AlertResult<f64> {
        parse_price(&self.close)
    }

    pub fn history(&self) -> AlertResult<Vec<f64>> {
        self.changes.iter().map(|p| parse_price(p)).collect()
    }
}

fn parse_price(raw: &str) -> AlertResult<f64> {
    raw.trim()
        .parse::<f64>()
        .map_err(|_| AlertError::Arithmetic(format!("price {raw:?} is not a number")))
}

/// Error body returned by Gemini on non-success responses.
#[derive(Debug, Clone, Deserialize)]
pub struct UpstreamErrorBody {
    #[serde(default)]
    pub reason: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

// ── Derived values ──

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PriceStats {
    pub mean: f64,
    pub change: f64,
    pub deviation_score: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AlertRequest {
    pub symbols: Vec<String>,
    pub deviation_threshold: f64,
}

#[derive(Debug, Clone)]
pub enum Outcome {
    Success { symbol: String, ticker: TickerSnapshot, stats: PriceStats },
    Failure { symbol: String, error: AlertError },
}

impl Outcome {
    pub fn symbol(&self) -> &str {
        match self {
            Outcome::Success { symbol, .. } | Outcome::Failure { symbol, .. } => symbol,
        }
    }
}
