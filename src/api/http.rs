use async_trait::async_trait;
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use tracing::debug;

use super::{
    AssistantApi, BacktestResultsResponse, BacktestRunResponse, ChatRequest, ChatResponse,
    LlmStatus, PriceSnapshot, StrategiesResponse, ToolInfo, ToolsResponse,
};
use crate::config::ApiSettings;
use crate::error::ApiError;
use crate::types::BacktestRequest;

/// reqwest-backed client for the assistant backend. One attempt per call.
#[derive(Debug, Clone)]
pub struct HttpApiClient {
    client: Client,
    base_url: String,
}

impl HttpApiClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn from_settings(settings: &ApiSettings) -> Result<Self, ApiError> {
        let mut builder = Client::builder();
        if let Some(timeout) = settings.request_timeout() {
            builder = builder.timeout(timeout);
        }

        Ok(Self {
            client: builder.build()?,
            base_url: settings.base_url.trim().trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Decodes the body whatever the status: the backend answers 400/500 with
    /// `{success: false, error}` bodies. Only undecodable bodies of non-2xx
    /// responses turn into `ApiError::Status`.
    async fn decode<T: DeserializeOwned>(resp: Response) -> Result<T, ApiError> {
        let status = resp.status();
        let body = resp.text().await?;
        debug!("{} ({} bytes)", status, body.len());

        match serde_json::from_str::<T>(&body) {
            Ok(value) => Ok(value),
            Err(e) if status.is_success() => Err(ApiError::Decode(e)),
            Err(_) => Err(ApiError::Status {
                status: status.as_u16(),
            }),
        }
    }
}

#[async_trait]
impl AssistantApi for HttpApiClient {
    async fn chat(&self, message: &str) -> Result<ChatResponse, ApiError> {
        let url = self.url("/api/chat");
        debug!("POST {}", url);
        let resp = self
            .client
            .post(&url)
            .json(&ChatRequest { message })
            .send()
            .await?;
        Self::decode(resp).await
    }

    async fn reset(&self) -> Result<(), ApiError> {
        let url = self.url("/api/reset");
        debug!("POST {}", url);
        let resp = self.client.post(&url).send().await?;
        if resp.status().is_success() {
            Ok(())
        } else {
            Err(ApiError::Status {
                status: resp.status().as_u16(),
            })
        }
    }

    async fn run_backtest(&self, request: &BacktestRequest) -> Result<BacktestRunResponse, ApiError> {
        let url = self.url("/api/backtest/run");
        debug!("POST {} {:?}", url, request);
        let resp = self.client.post(&url).json(request).send().await?;
        Self::decode(resp).await
    }

    async fn backtest_results(&self, limit: usize) -> Result<BacktestResultsResponse, ApiError> {
        let url = self.url("/api/backtest/results");
        debug!("GET {} limit={}", url, limit);
        let resp = self
            .client
            .get(&url)
            .query(&[("limit", limit)])
            .send()
            .await?;
        Self::decode(resp).await
    }

    async fn price(&self, symbol: &str) -> Result<PriceSnapshot, ApiError> {
        let url = self.url(&format!("/api/price/{}", symbol.trim().to_uppercase()));
        debug!("GET {}", url);
        let resp = self.client.get(&url).send().await?;
        let snapshot: PriceSnapshot = Self::decode(resp).await?;
        match snapshot.error {
            Some(error) => Err(ApiError::Application(error)),
            None => Ok(snapshot),
        }
    }

    async fn llm_status(&self) -> Result<LlmStatus, ApiError> {
        let url = self.url("/api/llm/status");
        debug!("GET {}", url);
        let resp = self.client.get(&url).send().await?;
        Self::decode(resp).await
    }

    async fn tools(&self) -> Result<Vec<ToolInfo>, ApiError> {
        let url = self.url("/api/tools");
        debug!("GET {}", url);
        let resp = self.client.get(&url).send().await?;
        let body: ToolsResponse = Self::decode(resp).await?;
        Ok(body.tools)
    }

    async fn strategies(&self) -> Result<Vec<serde_json::Value>, ApiError> {
        let url = self.url("/api/strategies");
        debug!("GET {}", url);
        let resp = self.client.get(&url).send().await?;
        let body: StrategiesResponse = Self::decode(resp).await?;
        if body.success {
            Ok(body.strategies)
        } else {
            Err(ApiError::Application(
                body.error.unwrap_or_else(|| "unknown error".to_string()),
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        extract::{Path, Query},
        http::StatusCode,
        routing::{get, post},
        Json, Router,
    };
    use serde_json::{json, Value};
    use std::collections::HashMap;

    /// Binds a stand-in backend on an ephemeral port and returns its origin.
    async fn spawn_backend() -> String {
        let app = Router::new()
            .route(
                "/api/chat",
                post(|Json(body): Json<Value>| async move {
                    let message = body["message"].as_str().unwrap_or_default().to_string();
                    if message.is_empty() {
                        return (
                            StatusCode::BAD_REQUEST,
                            Json(json!({"success": false, "error": "No message provided"})),
                        );
                    }
                    (
                        StatusCode::OK,
                        Json(json!({
                            "success": true,
                            "message": format!("echo: {}", message),
                            "tool_used": "get_price",
                            "tool_result": {"success": true, "symbol": "BTC", "price": 97000.0}
                        })),
                    )
                }),
            )
            .route("/api/reset", post(|| async { Json(json!({"success": true})) }))
            .route(
                "/api/backtest/results",
                get(|Query(params): Query<HashMap<String, String>>| async move {
                    let limit: usize = params.get("limit").and_then(|l| l.parse().ok()).unwrap_or(0);
                    let results: Vec<Value> = (0..limit.min(2))
                        .map(|i| json!({"strategy": "technical", "total_return_pct": i as f64}))
                        .collect();
                    Json(json!({"success": true, "results": results}))
                }),
            )
            .route(
                "/api/backtest/run",
                post(|| async {
                    (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        Json(json!({"success": false, "error": "Unknown strategy: foo"})),
                    )
                }),
            )
            .route(
                "/api/price/:symbol",
                get(|Path(symbol): Path<String>| async move {
                    Json(json!({"symbol": symbol, "price_usd": 97000.0, "source": "coingecko"}))
                }),
            )
            .route(
                "/api/tools",
                get(|| async { (StatusCode::BAD_GATEWAY, "<html>bad gateway</html>") }),
            );

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{}", addr)
    }

    #[tokio::test]
    async fn test_chat_round_trip() {
        let client = HttpApiClient::new(spawn_backend().await);

        let resp = client.chat("BTC price?").await.unwrap();
        assert!(resp.success);
        assert_eq!(resp.message_text(), "echo: BTC price?");
        assert_eq!(resp.tool_used.as_deref(), Some("get_price"));
    }

    #[tokio::test]
    async fn test_application_failure_survives_error_status() {
        let client = HttpApiClient::new(spawn_backend().await);

        let resp = client.chat("").await.unwrap();
        assert!(!resp.success);
        assert_eq!(resp.error.as_deref(), Some("No message provided"));

        let request = BacktestRequest {
            symbol: "BTCUSDT".to_string(),
            timeframe: "1h".to_string(),
            strategy: "foo".to_string(),
            initial_capital: 10000.0,
            start_date: None,
            end_date: None,
        };
        let resp = client.run_backtest(&request).await.unwrap();
        assert!(!resp.success);
        assert_eq!(resp.error.as_deref(), Some("Unknown strategy: foo"));
    }

    #[tokio::test]
    async fn test_results_limit_and_misc_endpoints() {
        let base = spawn_backend().await;
        let client = HttpApiClient::new(format!("{}/", base));
        assert_eq!(client.base_url(), base);

        let resp = client.backtest_results(10).await.unwrap();
        assert!(resp.success);
        assert_eq!(resp.results.len(), 2);

        tokio_test::assert_ok!(client.reset().await);

        let snapshot = client.price("btc").await.unwrap();
        assert_eq!(snapshot.symbol, "BTC");

        match client.tools().await {
            Err(ApiError::Status { status }) => assert_eq!(status, 502),
            other => panic!("expected status error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_unreachable_backend_is_transport_error() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let client = HttpApiClient::new(format!("http://{}", addr));
        let err = client.chat("hello").await.unwrap_err();
        assert!(matches!(err, ApiError::Transport(_)));
        assert!(err.is_transport());
    }
}
