use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::{Query, State};
use axum::http::{Method, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::{Json, Router};
use tower_http::trace::TraceLayer;
use tracing::{error, info};

use crate::error::AlertError;
use crate::pipeline::AlertPipeline;
use crate::upstream::MarketDataSource;

pub type SharedPipeline = Arc<AlertPipeline<dyn MarketDataSource>>;

/// Every path and method lands on the alert handler; the validator decides
/// what is acceptable.
pub fn router(pipeline: SharedPipeline) -> Router {
    Router::new()
        .fallback(alert_handler)
        .layer(TraceLayer::new_for_http())
        .with_state(pipeline)
}

pub async fn serve(addr: SocketAddr, pipeline: SharedPipeline) -> std::io::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("Server running on http://{}", listener.local_addr()?);
    axum::serve(listener, router(pipeline)).await
}

async fn alert_handler(State(pipeline): State<SharedPipeline>, method: Method, uri: Uri) -> Response {
    info!("{} {}", method, uri);

    let result = match Query::<HashMap<String, String>>::try_from_uri(&uri) {
        Ok(Query(query)) => pipeline.handle(&method, &query).await,
        Err(e) => Err(AlertError::InvalidRequest(format!("Malformed query string: {e}"))),
    };

    match result {
        Ok(records) => (StatusCode::OK, Json(records)).into_response(),
        Err(e) => {
            error!("Could not handle request: {}", e);
            e.into_response()
        }
    }
}
