use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

/// Name of the backend tool that produces chart payloads.
pub const CHART_TOOL: &str = "create_chart";

/// Outcome of one backend tool invocation, as returned in `tool_result`.
///
/// The payload carries no discriminator, so the variant is recovered from
/// which fields are present. See [`classify`].
#[derive(Debug, Clone, PartialEq)]
pub enum ToolResult {
    Failed { error: Option<String> },
    Chart(ChartPayload),
    Price(PriceQuote),
    Sentiment(SentimentAggregate),
    Technical(TechnicalPrediction),
    Recommendation(CombinedRecommendation),
    Backtest(BacktestSummary),
    /// Successful result with none of the known shapes.
    Unrecognized,
}

impl ToolResult {
    pub fn kind(&self) -> &'static str {
        match self {
            ToolResult::Failed { .. } => "failed",
            ToolResult::Chart(_) => "chart",
            ToolResult::Price(_) => "price",
            ToolResult::Sentiment(_) => "sentiment",
            ToolResult::Technical(_) => "technical",
            ToolResult::Recommendation(_) => "recommendation",
            ToolResult::Backtest(_) => "backtest",
            ToolResult::Unrecognized => "unrecognized",
        }
    }
}

/// Picks the shape of a raw `tool_result` returned by `tool_name`, first
/// match wins: failure, chart payload (chart tool only), price quote,
/// sentiment aggregate, technical prediction, combined recommendation,
/// backtest summary.
pub fn classify(tool_name: &str, result: &Value) -> ToolResult {
    if !truthy(result.get("success")) {
        return ToolResult::Failed {
            error: result
                .get("error")
                .and_then(Value::as_str)
                .filter(|e| !e.is_empty())
                .map(str::to_string),
        };
    }

    if tool_name == CHART_TOOL && truthy(result.get("chart_data")) {
        return decode(result, ToolResult::Chart);
    }
    if truthy(result.get("symbol")) && truthy(result.get("price")) {
        return decode(result, ToolResult::Price);
    }
    if let Some(aggregate) = result.get("aggregate_sentiment").filter(|v| truthy(Some(v))) {
        return decode(aggregate, ToolResult::Sentiment);
    }
    if truthy(result.get("predicted_price")) {
        return decode(result, ToolResult::Technical);
    }
    if let Some(rec) = result.get("recommendation").filter(|v| truthy(Some(v))) {
        return decode(rec, ToolResult::Recommendation);
    }
    if result.get("final_value").map_or(false, |v| !v.is_null()) {
        return decode(result, ToolResult::Backtest);
    }

    ToolResult::Unrecognized
}

fn decode<T, F>(value: &Value, wrap: F) -> ToolResult
where
    T: DeserializeOwned,
    F: FnOnce(T) -> ToolResult,
{
    match serde_json::from_value::<T>(value.clone()) {
        Ok(shape) => wrap(shape),
        Err(e) => {
            warn!("Malformed tool result ({}), rendering as unrecognized", e);
            ToolResult::Unrecognized
        }
    }
}

/// JSON truthiness: missing, null, false, 0, "" and NaN are false.
fn truthy(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => false,
        Some(Value::Bool(b)) => *b,
        Some(Value::Number(n)) => n.as_f64().map_or(false, |f| f != 0.0 && !f.is_nan()),
        Some(Value::String(s)) => !s.is_empty(),
        Some(Value::Array(_)) | Some(Value::Object(_)) => true,
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ChartPayload {
    pub chart_data: ChartData,
    #[serde(default)]
    pub chart_html: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ChartData {
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
    #[serde(default)]
    pub timestamps: Option<Vec<Value>>,
    #[serde(default, alias = "prices")]
    pub values: Option<Vec<Value>>,
    #[serde(default)]
    pub title: Option<String>,
}

impl ChartData {
    pub fn is_candlestick(&self) -> bool {
        self.kind.as_deref() == Some("candlestick")
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PriceQuote {
    pub symbol: String,
    pub price: f64,
    pub change_24h: f64,
    pub volume_24h: f64,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SentimentAggregate {
    pub overall_sentiment: String,
    pub sentiment_score: f64,
    pub counts: SentimentCounts,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SentimentCounts {
    pub total: u64,
    pub positive: u64,
    pub neutral: u64,
    pub negative: u64,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TechnicalPrediction {
    pub current_price: f64,
    pub predicted_price: f64,
    pub predicted_change_pct: f64,
    pub signals: Option<TechnicalSignals>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TechnicalSignals {
    pub recommendation: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CombinedRecommendation {
    pub action: String,
    pub confidence: f64,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BacktestSummary {
    pub strategy: Option<String>,
    pub final_value: f64,
    pub total_return_pct: f64,
    pub sharpe_ratio: f64,
    pub max_drawdown_pct: f64,
    pub win_rate: f64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_failure_takes_priority() {
        let result = classify("get_price", &json!({"success": false, "error": "rate limited", "price": 1.0}));
        assert_eq!(result, ToolResult::Failed { error: Some("rate limited".to_string()) });

        let result = classify("get_price", &json!({"symbol": "BTC", "price": 97000.0}));
        assert_eq!(result, ToolResult::Failed { error: None });
    }

    #[test]
    fn test_chart_wins_over_price_for_chart_tool() {
        let result = classify(CHART_TOOL, &json!({
            "success": true,
            "symbol": "BTC",
            "price": 97000.0,
            "chart_data": {"type": "line", "timestamps": ["2024-01-01"], "prices": [42000.0]}
        }));
        match result {
            ToolResult::Chart(payload) => {
                assert_eq!(payload.chart_data.values.as_ref().map(Vec::len), Some(1));
                assert!(!payload.chart_data.is_candlestick());
            }
            other => panic!("expected chart, got {:?}", other.kind()),
        }
    }

    #[test]
    fn test_chart_data_from_other_tools_is_not_a_chart() {
        let result = classify("get_price", &json!({
            "success": true,
            "symbol": "BTC",
            "price": 97000.0,
            "chart_data": {"type": "line", "timestamps": ["2024-01-01"], "values": [42000.0]}
        }));
        assert_eq!(result.kind(), "price");

        let result = classify("get_price", &json!({
            "success": true,
            "chart_data": {"type": "line", "timestamps": ["2024-01-01"], "values": [42000.0]}
        }));
        assert_eq!(result, ToolResult::Unrecognized);
    }

    #[test]
    fn test_price_requires_truthy_price() {
        let result = classify("get_price", &json!({"success": true, "symbol": "BTC", "price": 0}));
        assert_eq!(result, ToolResult::Unrecognized);

        let result = classify("get_price", &json!({
            "success": true, "symbol": "ETH", "price": 3400.5, "change_24h": -1.2, "volume_24h": 1.5e9
        }));
        assert_eq!(result.kind(), "price");
    }

    #[test]
    fn test_priority_order_of_remaining_shapes() {
        let sentiment = json!({
            "success": true,
            "aggregate_sentiment": {"overall_sentiment": "positive", "sentiment_score": 0.4,
                "counts": {"total": 10, "positive": 6, "neutral": 3, "negative": 1}},
            "predicted_price": 100.0
        });
        match classify("get_price", &sentiment) {
            ToolResult::Sentiment(agg) => assert_eq!(agg.counts.positive, 6),
            other => panic!("expected sentiment, got {:?}", other.kind()),
        }

        let technical = json!({
            "success": true, "current_price": 100.0, "predicted_price": 104.0,
            "predicted_change_pct": 4.0, "recommendation": {"action": "BUY"}
        });
        assert_eq!(classify("get_price", &technical).kind(), "technical");

        let combined = json!({
            "success": true,
            "recommendation": {"action": "STRONG_BUY", "confidence": 0.82},
            "final_value": 12000.0
        });
        match classify("get_price", &combined) {
            ToolResult::Recommendation(rec) => assert_eq!(rec.action, "STRONG_BUY"),
            other => panic!("expected recommendation, got {:?}", other.kind()),
        }

        let backtest = json!({"success": true, "strategy": "technical", "final_value": 0});
        assert_eq!(classify("get_price", &backtest).kind(), "backtest");

        let backtest_null = json!({"success": true, "final_value": null});
        assert_eq!(classify("get_price", &backtest_null), ToolResult::Unrecognized);
    }

    #[test]
    fn test_malformed_shape_is_unrecognized() {
        let result = classify("get_price", &json!({"success": true, "aggregate_sentiment": {"counts": "many"}}));
        assert_eq!(result, ToolResult::Unrecognized);
    }
}
