use chrono::{SecondsFormat, Utc};
use serde::Serialize;
use tracing::warn;

use crate::error::AlertError;
use crate::types::{Outcome, PriceStats, TickerSnapshot};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Level {
    Info,
    Error,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PriceData {
    pub last_price: String,
    pub average: String,
    pub sdev: String,
    pub change: String,
}

impl PriceData {
    fn new(ticker: &TickerSnapshot, stats: &PriceStats) -> Self {
        Self {
            last_price: ticker.close.clone(),
            average: to_fixed4(stats.mean),
            sdev: to_fixed4(stats.deviation_score),
            change: to_fixed4(stats.change),
        }
    }
}

/// Four-decimal rendering with exact ties rounded away from zero.
/// `{:.4}` rounds exact binary ties to even instead.
fn to_fixed4(value: f64) -> String {
    if !value.is_finite() {
        return value.to_string();
    }
    // Every finite f64 has a terminating expansion within 1074 fractional digits.
    let exact = format!("{:.1100}", value.abs());
    let (int_part, frac) = exact.split_once('.').unwrap_or((exact.as_str(), ""));
    let mut digits: Vec<u8> = int_part
        .bytes()
        .chain(frac.bytes().chain(std::iter::repeat(b'0')).take(4))
        .map(|b| b - b'0')
        .collect();

    if frac.as_bytes().get(4).is_some_and(|d| *d >= b'5') {
        let mut i = digits.len();
        loop {
            if i == 0 {
                digits.insert(0, 1);
                break;
            }
            i -= 1;
            if digits[i] == 9 {
                digits[i] = 0;
            } else {
                digits[i] += 1;
                break;
            }
        }
    }

    let split = digits.len() - 4;
    let mut out = String::with_capacity(digits.len() + 2);
    if value < 0.0 {
        out.push('-');
    }
    out.extend(digits[..split].iter().map(|d| char::from(b'0' + d)));
    out.push('.');
    out.extend(digits[split..].iter().map(|d| char::from(b'0' + d)));
    out
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ErrorData {
    pub result: &'static str,
    pub reason: &'static str,
    pub message: String,
}

impl ErrorData {
    pub fn new(reason: &'static str, message: String) -> Self {
        Self { result: "error", reason, message }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum AlertData {
    Price(PriceData),
    Error(ErrorData),
}

/// One entry of the response array.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AlertRecord {
    pub timestamp: String,
    pub level: Level,
    pub symbol: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exceeded: Option<bool>,
    pub data: AlertData,
}

impl AlertRecord {
    pub fn from_outcome(outcome: &Outcome, deviation_threshold: f64) -> Self {
        match outcome {
            Outcome::Success { symbol, ticker, stats } => Self {
                timestamp: iso_timestamp(),
                level: Level::Info,
                symbol: symbol.clone(),
                exceeded: Some(stats.deviation_score > deviation_threshold),
                data: AlertData::Price(PriceData::new(ticker, stats)),
            },
            Outcome::Failure { symbol, error } => Self {
                timestamp: iso_timestamp(),
                level: Level::Error,
                symbol: symbol.clone(),
                exceeded: None,
                data: AlertData::Error(error.to_data()),
            },
        }
    }
}

pub fn iso_timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Collects per-symbol outcomes for one request. Each requested position owns
/// one slot, written at most once, so arrival order never affects output order.
pub struct AlertAggregator {
    symbols: Vec<String>,
    slots: Vec<Option<Outcome>>,
    filled: usize,
}

impl AlertAggregator {
    pub fn new(symbols: Vec<String>) -> Self {
        let slots = vec![None; symbols.len()];
        Self { symbols, slots, filled: 0 }
    }

    /// Stores the outcome for `index`. Returns false if the slot was already
    /// filled or out of range; the first write wins.
    pub fn record(&mut self, index: usize, outcome: Outcome) -> bool {
        match self.slots.get_mut(index) {
            Some(slot) if slot.is_none() => {
                *slot = Some(outcome);
                self.filled += 1;
                true
            }
            Some(_) => {
                warn!("Duplicate outcome for {} at position {}, ignored", outcome.symbol(), index);
                false
            }
            None => {
                warn!("Outcome for {} at out-of-range position {}, ignored", outcome.symbol(), index);
                false
            }
        }
    }

    pub fn pending(&self) -> usize {
        self.slots.len() - self.filled
    }

    pub fn is_complete(&self) -> bool {
        self.pending() == 0
    }

    /// Projects every slot to a record in request order. A slot that never
    /// received an outcome becomes an error record.
    pub fn assemble(self, deviation_threshold: f64) -> Vec<AlertRecord> {
        self.symbols
            .into_iter()
            .zip(self.slots)
            .map(|(symbol, slot)| {
                let outcome = slot.unwrap_or_else(|| Outcome::Failure {
                    error: AlertError::Internal(format!("no result recorded for {symbol}")),
                    symbol,
                });
                AlertRecord::from_outcome(&outcome, deviation_threshold)
            })
            .collect()
    }
}
