use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::types::BacktestRun;

#[derive(Debug, Clone, Serialize)]
pub struct ChatRequest<'a> {
    pub message: &'a str,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChatResponse {
    #[serde(default)]
    pub success: bool,
    /// The agent path of the backend names this field `response`.
    #[serde(default, alias = "response")]
    pub message: Option<String>,
    #[serde(default)]
    pub thinking: Option<String>,
    #[serde(default)]
    pub tool_used: Option<String>,
    #[serde(default)]
    pub tool_result: Option<Value>,
    #[serde(default)]
    pub error: Option<String>,
}

impl ChatResponse {
    pub fn message_text(&self) -> &str {
        self.message.as_deref().unwrap_or_default()
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BacktestRunResponse {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BacktestResultsResponse {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub results: Vec<BacktestRun>,
    #[serde(default)]
    pub error: Option<String>,
}

/// Snapshot returned by `/api/price/{symbol}`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PriceSnapshot {
    #[serde(default)]
    pub symbol: String,
    #[serde(default)]
    pub price_usd: f64,
    #[serde(default)]
    pub change_24h_percent: f64,
    #[serde(default)]
    pub volume_24h_usd: f64,
    #[serde(default)]
    pub market_cap_usd: f64,
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LlmStatus {
    pub status: String,
    #[serde(default)]
    pub host: Option<String>,
    #[serde(default)]
    pub models: Vec<String>,
    #[serde(default)]
    pub current_model: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

impl LlmStatus {
    pub fn is_connected(&self) -> bool {
        self.status == "connected"
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ToolInfo {
    pub name: String,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub(crate) struct ToolsResponse {
    #[serde(default)]
    pub tools: Vec<ToolInfo>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub(crate) struct StrategiesResponse {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub strategies: Vec<Value>,
    #[serde(default)]
    pub error: Option<String>,
}
