use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// A stored backtest run as listed by `/api/backtest/results`.
///
/// Every metric is computed by the backend; this side only displays them.
/// Optional metrics stay `Option` so an absent field is distinguishable
/// from a zero one.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct BacktestRun {
    pub symbol: Option<String>,
    pub timeframe: Option<String>,
    pub strategy: Option<String>,
    #[serde(default)]
    pub initial_capital: f64,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    #[serde(default)]
    pub final_value: f64,
    #[serde(default)]
    pub total_return_pct: f64,
    pub sharpe_ratio: Option<f64>,
    #[serde(default)]
    pub max_drawdown_pct: f64,
    pub total_trades: Option<u64>,
    pub winning_trades: Option<u64>,
    pub losing_trades: Option<u64>,
    pub win_rate: Option<f64>,
    pub profit_factor: Option<f64>,
    pub avg_win: Option<f64>,
    pub avg_loss: Option<f64>,
    pub timestamp: Option<String>,
}

impl BacktestRun {
    pub fn is_profit(&self) -> bool {
        self.total_return_pct > 0.0
    }

    pub fn timeframe_or_default(&self) -> &str {
        self.timeframe.as_deref().unwrap_or("1h")
    }

    pub fn strategy_or_unknown(&self) -> &str {
        self.strategy
            .as_deref()
            .filter(|s| !s.is_empty())
            .unwrap_or("unknown")
    }
}

/// Body of `POST /api/backtest/run`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BacktestRequest {
    pub symbol: String,
    pub timeframe: String,
    pub strategy: String,
    pub initial_capital: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_date: Option<NaiveDate>,
}
