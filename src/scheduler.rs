//! Paced fan-out of ticker requests.
//!
//! Every symbol gets its own task, dispatched in request order. Before every
//! `every`-th dispatch the loop waits `delay`, which keeps the request rate
//! under the upstream limit without throttling calls already in flight.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use futures::{FutureExt, Stream};
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::error::AlertError;
use crate::stats::compute_stats;
use crate::types::Outcome;
use crate::upstream::MarketDataSource;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pacing {
    pub every: usize,
    pub delay: Duration,
}

impl Default for Pacing {
    fn default() -> Self {
        Self { every: 10, delay: Duration::from_secs(1) }
    }
}

impl Pacing {
    /// Whether dispatching the symbol at zero-based `index` waits first.
    pub fn pauses_before(&self, index: usize) -> bool {
        self.every > 0 && (index + 1) % self.every == 0
    }

    pub fn pauses_for(&self, count: usize) -> usize {
        (0..count).filter(|&i| self.pauses_before(i)).count()
    }
}

/// A resolved symbol: its position in the request and its outcome.
pub type Resolved = (usize, Outcome);

pub struct BatchScheduler<S: ?Sized> {
    source: Arc<S>,
    pacing: Pacing,
}

impl<S: ?Sized> Clone for BatchScheduler<S> {
    fn clone(&self) -> Self {
        Self { source: Arc::clone(&self.source), pacing: self.pacing }
    }
}

impl<S> BatchScheduler<S>
where
    S: MarketDataSource + ?Sized + 'static,
{
    pub fn new(source: Arc<S>, pacing: Pacing) -> Self {
        Self { source, pacing }
    }

    pub fn pacing(&self) -> Pacing {
        self.pacing
    }

    /// Dispatches one call per symbol and yields outcomes as they resolve.
    /// The stream ends once every dispatched call has resolved. Dropping the
    /// stream stops further dispatch; calls already in flight still finish.
    pub fn dispatch(&self, symbols: Vec<String>) -> impl Stream<Item = Resolved> + Send + Unpin {
        let (tx, mut rx) = mpsc::unbounded_channel::<Resolved>();
        let source = Arc::clone(&self.source);
        let pacing = self.pacing;

        tokio::spawn(async move {
            for (index, symbol) in symbols.into_iter().enumerate() {
                if pacing.pauses_before(index) {
                    debug!("Pacing {:?} before dispatching #{} ({})", pacing.delay, index + 1, symbol);
                    tokio::time::sleep(pacing.delay).await;
                }
                if tx.is_closed() {
                    debug!("Request dropped, stopping dispatch after {} symbols", index);
                    break;
                }
                let source = Arc::clone(&source);
                let tx = tx.clone();
                tokio::spawn(async move {
                    let outcome = resolve_guarded(source.as_ref(), symbol).await;
                    // The receiver only goes away if the request was dropped.
                    let _ = tx.send((index, outcome));
                });
            }
        });

        futures::stream::poll_fn(move |cx| rx.poll_recv(cx))
    }
}

/// Fetch + statistics for one symbol. Panics are caught here so a single
/// symbol can never take down its siblings.
async fn resolve_guarded<S: MarketDataSource + ?Sized>(source: &S, symbol: String) -> Outcome {
    let result = AssertUnwindSafe(resolve(source, &symbol)).catch_unwind().await;
    match result {
        Ok(Ok(outcome)) => outcome,
        Ok(Err(error)) => {
            warn!("{} failed: {} ({})", symbol, error, error.reason());
            Outcome::Failure { symbol, error }
        }
        Err(_) => {
            warn!("{} panicked while resolving", symbol);
            Outcome::Failure {
                error: AlertError::Internal(format!("processing {symbol} panicked")),
                symbol,
            }
        }
    }
}

async fn resolve<S: MarketDataSource + ?Sized>(source: &S, symbol: &str) -> Result<Outcome, AlertError> {
    let ticker = source.ticker(symbol).await?;
    let stats = compute_stats(&ticker.history()?, ticker.last_price()?)?;
    Ok(Outcome::Success { symbol: symbol.to_string(), ticker, stats })
}
