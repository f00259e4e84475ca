use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use axum::http::Method;
use futures::StreamExt;
use tracing::debug;

use crate::alerts::{AlertAggregator, AlertRecord};
use crate::error::AlertResult;
use crate::scheduler::{BatchScheduler, Pacing};
use crate::symbols::SymbolSet;
use crate::upstream::MarketDataSource;
use crate::validation::validate;

/// Lifecycle of one alert request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Received,
    Validating,
    Dispatching,
    Awaiting(usize),
    Aggregating,
    Completed,
    Failed,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::Awaiting(n) => write!(f, "Awaiting({n} pending)"),
            other => write!(f, "{other:?}"),
        }
    }
}

/// Validates a request, fans out to the upstream source and assembles the
/// ordered alert array. Cheap to clone; the symbol set is shared read-only.
pub struct AlertPipeline<S: ?Sized> {
    symbols: Arc<SymbolSet>,
    scheduler: BatchScheduler<S>,
}

impl<S: ?Sized> Clone for AlertPipeline<S> {
    fn clone(&self) -> Self {
        Self { symbols: Arc::clone(&self.symbols), scheduler: self.scheduler.clone() }
    }
}

impl<S> AlertPipeline<S>
where
    S: MarketDataSource + ?Sized + 'static,
{
    pub fn new(symbols: Arc<SymbolSet>, source: Arc<S>, pacing: Pacing) -> Self {
        Self { symbols, scheduler: BatchScheduler::new(source, pacing) }
    }

    pub async fn handle(&self, method: &Method, query: &HashMap<String, String>) -> AlertResult<Vec<AlertRecord>> {
        let mut stage = Stage::Received;
        advance(&mut stage, Stage::Validating);

        let request = match validate(method, query, &self.symbols) {
            Ok(request) => request,
            Err(e) => {
                advance(&mut stage, Stage::Failed);
                return Err(e);
            }
        };

        advance(&mut stage, Stage::Dispatching);
        debug!(
            "Dispatching {} symbols with {} pacing waits",
            request.symbols.len(),
            self.scheduler.pacing().pauses_for(request.symbols.len())
        );
        let mut resolved = self.scheduler.dispatch(request.symbols.clone());
        let mut aggregator = AlertAggregator::new(request.symbols);

        advance(&mut stage, Stage::Awaiting(aggregator.pending()));
        while let Some((index, outcome)) = resolved.next().await {
            aggregator.record(index, outcome);
            if aggregator.is_complete() {
                break;
            }
        }

        advance(&mut stage, Stage::Aggregating);
        let records = aggregator.assemble(request.deviation_threshold);

        advance(&mut stage, Stage::Completed);
        Ok(records)
    }
}

fn advance(stage: &mut Stage, next: Stage) {
    debug!("{} -> {}", stage, next);
    *stage = next;
}
