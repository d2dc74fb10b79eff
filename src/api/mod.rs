pub mod http;
pub mod messages;

pub use http::*;
pub use messages::*;

use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;

use crate::error::ApiError;
use crate::types::BacktestRequest;

/// The assistant backend as seen by the page controllers.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait AssistantApi: Send + Sync {
    async fn chat(&self, message: &str) -> Result<ChatResponse, ApiError>;
    async fn reset(&self) -> Result<(), ApiError>;
    async fn run_backtest(&self, request: &BacktestRequest) -> Result<BacktestRunResponse, ApiError>;
    async fn backtest_results(&self, limit: usize) -> Result<BacktestResultsResponse, ApiError>;
    async fn price(&self, symbol: &str) -> Result<PriceSnapshot, ApiError>;
    async fn llm_status(&self) -> Result<LlmStatus, ApiError>;
    async fn tools(&self) -> Result<Vec<ToolInfo>, ApiError>;
    async fn strategies(&self) -> Result<Vec<serde_json::Value>, ApiError>;
}

/// A backend that never answers. Futures awaiting it only end when dropped.
#[cfg(test)]
pub(crate) struct PendingApi;

#[cfg(test)]
#[async_trait]
impl AssistantApi for PendingApi {
    async fn chat(&self, _message: &str) -> Result<ChatResponse, ApiError> {
        std::future::pending().await
    }

    async fn reset(&self) -> Result<(), ApiError> {
        std::future::pending().await
    }

    async fn run_backtest(&self, _request: &BacktestRequest) -> Result<BacktestRunResponse, ApiError> {
        std::future::pending().await
    }

    async fn backtest_results(&self, _limit: usize) -> Result<BacktestResultsResponse, ApiError> {
        std::future::pending().await
    }

    async fn price(&self, _symbol: &str) -> Result<PriceSnapshot, ApiError> {
        std::future::pending().await
    }

    async fn llm_status(&self) -> Result<LlmStatus, ApiError> {
        std::future::pending().await
    }

    async fn tools(&self) -> Result<Vec<ToolInfo>, ApiError> {
        std::future::pending().await
    }

    async fn strategies(&self) -> Result<Vec<serde_json::Value>, ApiError> {
        std::future::pending().await
    }
}
