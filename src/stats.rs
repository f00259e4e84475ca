use crate::error::{AlertError, AlertResult};
use crate::types::PriceStats;

/// Computes mean, change and deviation score for `last_price` against its
/// history. `last_price` is appended to the series before anything is computed.
pub fn compute_stats(history: &[f64], last_price: f64) -> AlertResult<PriceStats> {
    let mut prices: Vec<f64> = Vec::with_capacity(history.len() + 1);
    prices.extend_from_slice(history);
    prices.push(last_price);

    if let Some(bad) = prices.iter().find(|p| !p.is_finite()) {
        return Err(AlertError::Arithmetic(format!("price series contains non-finite value {bad}")));
    }

    // A flat series would otherwise pick up rounding noise in the mean.
    if prices.iter().all(|p| *p == last_price) {
        return Ok(PriceStats { mean: last_price, change: 0.0, deviation_score: 0.0 });
    }

    let n = prices.len() as f64;
    let mean = prices.iter().sum::<f64>() / n;
    let variance = prices.iter().map(|p| (p - mean).powi(2)).sum::<f64>() / n;
    let stddev = variance.sqrt();

    let change = (mean - last_price).abs();
    let deviation_score = if change == 0.0 || stddev == 0.0 {
        0.0
    } else {
        ((last_price - mean) / stddev).abs()
    };

    let stats = PriceStats { mean, change, deviation_score };
    if !(stats.mean.is_finite() && stats.change.is_finite() && stats.deviation_score.is_finite()) {
        return Err(AlertError::Arithmetic(format!("non-finite statistics {stats:?}")));
    }
    Ok(stats)
}
