use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use price_deviation_alerts::config::Config;
use price_deviation_alerts::error::AlertResult;
use price_deviation_alerts::pipeline::AlertPipeline;
use price_deviation_alerts::symbols::SymbolSet;
use price_deviation_alerts::upstream::{GeminiClient, MarketDataSource};
use price_deviation_alerts::web::{self, SharedPipeline};

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("price_deviation_alerts=info")))
        .init();

    let config = Config::parse();
    info!("Starting up server (upstream: {})", config.upstream_url);

    let pipeline = match startup(&config).await {
        Ok(pipeline) => pipeline,
        Err(e) => {
            error!("Could not start server: {}", e);
            return ExitCode::FAILURE;
        }
    };

    if let Err(e) = web::serve(config.listen_addr(), pipeline).await {
        error!("Server error: {}", e);
        return ExitCode::FAILURE;
    }
    ExitCode::SUCCESS
}

/// Loads the symbol directory once; the server does not start without it.
async fn startup(config: &Config) -> AlertResult<SharedPipeline> {
    let source: Arc<dyn MarketDataSource> =
        Arc::new(GeminiClient::new(&config.upstream_url, config.request_timeout())?);
    let symbols = SymbolSet::load(source.as_ref()).await?;
    Ok(Arc::new(AlertPipeline::new(Arc::new(symbols), source, config.pacing())))
}
