//! Upstream market data access.
//!
//! [`MarketDataSource`] is the seam between the pipeline and the ticker
//! service. [`GeminiClient`] talks to the Gemini public REST API; tests and
//! benches plug in in-memory sources instead.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::error::{AlertError, AlertResult};
use crate::types::{TickerSnapshot, UpstreamErrorBody};

pub const DEFAULT_BASE_URL: &str = "https://api.gemini.com";

#[async_trait]
pub trait MarketDataSource: Send + Sync {
    /// Symbol directory, queried once at startup.
    async fn symbols(&self) -> AlertResult<Vec<String>>;

    /// Current ticker for one symbol. Single attempt, no retry.
    async fn ticker(&self, symbol: &str) -> AlertResult<TickerSnapshot>;
}

pub struct GeminiClient {
    client: Client,
    base_url: String,
}

impl GeminiClient {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> AlertResult<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AlertError::Startup(format!("Failed to create HTTP client: {e}")))?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> AlertResult<T> {
        let url = format!("{}{}", self.base_url, path);
        debug!("GET {}", url);
        let response = self.client.get(&url).send().await?;
        let response = check_status(response).await?;
        Ok(response.json::<T>().await?)
    }
}

#[async_trait]
impl MarketDataSource for GeminiClient {
    async fn symbols(&self) -> AlertResult<Vec<String>> {
        self.get_json("/v1/symbols").await
    }

    async fn ticker(&self, symbol: &str) -> AlertResult<TickerSnapshot> {
        self.get_json(&format!("/v2/ticker/{symbol}")).await
    }
}

/// Turns a non-success response into an upstream error, preferring the
/// `message` field of the error body.
async fn check_status(response: Response) -> AlertResult<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<UpstreamErrorBody>(&body)
        .ok()
        .and_then(|b| b.message.or(b.reason))
        .filter(|m| !m.is_empty())
        .unwrap_or_else(|| format!("upstream responded with status {status}"));
    Err(AlertError::upstream(message))
}

#[cfg(test)]
mod tests {
    use super::*;

    use axum::http::StatusCode;
    use axum::routing::get;
    use axum::{Json, Router};
    use serde_json::json;

    use crate::error::UpstreamReason;

    async fn serve(app: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{addr}")
    }

    fn fake_gemini() -> Router {
        Router::new()
            .route("/v1/symbols", get(|| async { Json(json!(["btcusd", "ethusd"])) }))
            .route(
                "/v2/ticker/btcusd",
                get(|| async {
                    Json(json!({
                        "symbol": "BTCUSD",
                        "open": "98",
                        "high": "102",
                        "low": "97",
                        "close": "100",
                        "changes": ["98", "99", "101"],
                        "bid": "99.9",
                        "ask": "100.1"
                    }))
                }),
            )
            .route(
                "/v2/ticker/ethusd",
                get(|| async {
                    (
                        StatusCode::BAD_REQUEST,
                        Json(json!({
                            "result": "error",
                            "reason": "InvalidSymbol",
                            "message": "Supplied value 'ethusd' is not a valid symbol"
                        })),
                    )
                }),
            )
            .route("/v2/ticker/ltcusd", get(|| async { StatusCode::SERVICE_UNAVAILABLE }))
            .route("/v2/ticker/garbage", get(|| async { "not json" }))
    }

    async fn client() -> GeminiClient {
        GeminiClient::new(serve(fake_gemini()).await, Duration::from_secs(5)).unwrap()
    }

    #[tokio::test]
    async fn fetches_symbols_and_ticker() {
        let client = client().await;
        assert_eq!(client.symbols().await.unwrap(), vec!["btcusd", "ethusd"]);

        let ticker = client.ticker("btcusd").await.unwrap();
        assert_eq!(ticker.close, "100");
        assert_eq!(ticker.history().unwrap(), vec![98.0, 99.0, 101.0]);
    }

    #[tokio::test]
    async fn error_body_message_is_surfaced() {
        let err = client().await.ticker("ethusd").await.unwrap_err();
        assert_eq!(
            err,
            AlertError::Upstream {
                reason: UpstreamReason::Upstream,
                message: "Supplied value 'ethusd' is not a valid symbol".into(),
            }
        );
    }

    #[tokio::test]
    async fn empty_error_body_falls_back_to_status() {
        let err = client().await.ticker("ltcusd").await.unwrap_err();
        assert_eq!(err.reason(), "upstream");
        assert!(err.to_string().contains("503"), "{err}");
    }

    #[tokio::test]
    async fn undecodable_success_body_is_upstream_error() {
        let err = client().await.ticker("garbage").await.unwrap_err();
        assert_eq!(err.reason(), "upstream");
    }

    #[tokio::test]
    async fn unreachable_host_is_network_error() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let client = GeminiClient::new(format!("http://{addr}"), Duration::from_secs(5)).unwrap();
        let err = client.ticker("btcusd").await.unwrap_err();
        assert_eq!(err.reason(), "network");
    }

    #[tokio::test]
    async fn slow_upstream_is_timeout() {
        let app = Router::new().route(
            "/v2/ticker/btcusd",
            get(|| async {
                tokio::time::sleep(Duration::from_secs(5)).await;
                "late"
            }),
        );
        let client = GeminiClient::new(serve(app).await, Duration::from_millis(100)).unwrap();
        let err = client.ticker("btcusd").await.unwrap_err();
        assert_eq!(err.reason(), "timeout");
    }
}
