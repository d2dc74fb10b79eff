//! Chart.js and Plotly configurations built from backend payloads.

use serde_json::{json, Value};

use super::format::{strategy_color, strategy_name};
use crate::types::{BacktestRun, ChartData};
use crate::view::{ChartLibrary, ChartSpec};

const AXIS_TICK: &str = "#94a3b8";
const GRID_LINE: &str = "rgba(148, 163, 184, 0.1)";
const LEGEND_TEXT: &str = "#f1f5f9";

/// Stability proxy on the radar chart.
const STABLE: f64 = 80.0;
const UNSTABLE: f64 = 40.0;

/// Bar chart of return % per run with the Sharpe ratio as a line on a
/// secondary axis.
pub fn performance_chart(runs: &[BacktestRun]) -> ChartSpec {
    let labels: Vec<String> = (1..=runs.len()).map(|i| format!("Run {}", i)).collect();
    let returns: Vec<f64> = runs.iter().map(|r| r.total_return_pct).collect();
    let sharpe: Vec<Option<f64>> = runs.iter().map(|r| r.sharpe_ratio).collect();

    let background: Vec<&str> = returns
        .iter()
        .map(|r| if *r > 0.0 { "rgba(16, 185, 129, 0.6)" } else { "rgba(239, 68, 68, 0.6)" })
        .collect();
    let border: Vec<&str> = returns
        .iter()
        .map(|r| if *r > 0.0 { "rgb(16, 185, 129)" } else { "rgb(239, 68, 68)" })
        .collect();

    ChartSpec::new(
        ChartLibrary::ChartJs,
        json!({
            "type": "bar",
            "data": {
                "labels": labels,
                "datasets": [
                    {
                        "label": "Total return (%)",
                        "data": returns,
                        "backgroundColor": background,
                        "borderColor": border,
                        "borderWidth": 1,
                        "yAxisID": "y"
                    },
                    {
                        "label": "Sharpe ratio",
                        "data": sharpe,
                        "type": "line",
                        "borderColor": "rgb(124, 58, 237)",
                        "backgroundColor": "rgba(124, 58, 237, 0.1)",
                        "yAxisID": "y1"
                    }
                ]
            },
            "options": {
                "responsive": true,
                "maintainAspectRatio": false,
                "scales": {
                    "y": {
                        "type": "linear",
                        "display": true,
                        "position": "left",
                        "ticks": { "color": AXIS_TICK },
                        "grid": { "color": GRID_LINE }
                    },
                    "y1": {
                        "type": "linear",
                        "display": true,
                        "position": "right",
                        "ticks": { "color": AXIS_TICK },
                        "grid": { "drawOnChartArea": false }
                    },
                    "x": {
                        "ticks": { "color": AXIS_TICK },
                        "grid": { "color": GRID_LINE }
                    }
                },
                "plugins": { "legend": { "labels": { "color": LEGEND_TEXT } } }
            }
        }),
    )
}

#[derive(Debug, Clone, PartialEq)]
pub struct StrategyComparison {
    pub strategy: String,
    pub avg_return: f64,
    pub avg_win_rate: f64,
    pub stability: f64,
}

/// Per-strategy means in first-seen order. A missing win rate counts as 0.
pub fn strategy_comparison(runs: &[BacktestRun]) -> Vec<StrategyComparison> {
    let mut groups: Vec<(String, Vec<f64>, Vec<f64>)> = Vec::new();

    for run in runs {
        let strategy = run.strategy_or_unknown();
        let idx = match groups.iter().position(|(name, _, _)| name == strategy) {
            Some(idx) => idx,
            None => {
                groups.push((strategy.to_string(), Vec::new(), Vec::new()));
                groups.len() - 1
            }
        };
        groups[idx].1.push(run.total_return_pct);
        groups[idx].2.push(run.win_rate.unwrap_or(0.0));
    }

    groups
        .into_iter()
        .map(|(strategy, returns, wins)| {
            let avg_return = mean(&returns);
            StrategyComparison {
                strategy,
                avg_return,
                avg_win_rate: mean(&wins),
                stability: if avg_return > 0.0 { STABLE } else { UNSTABLE },
            }
        })
        .collect()
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        0.0
    } else {
        values.iter().sum::<f64>() / values.len() as f64
    }
}

/// Radar chart comparing strategies on mean return, mean win rate and
/// stability.
pub fn comparison_chart(runs: &[BacktestRun]) -> ChartSpec {
    let datasets: Vec<Value> = strategy_comparison(runs)
        .iter()
        .enumerate()
        .map(|(i, s)| {
            json!({
                "label": strategy_name(&s.strategy),
                "data": [s.avg_return, s.avg_win_rate, s.stability],
                "borderColor": strategy_color(i, 1.0),
                "backgroundColor": strategy_color(i, 0.2),
                "pointBackgroundColor": strategy_color(i, 1.0)
            })
        })
        .collect();

    ChartSpec::new(
        ChartLibrary::ChartJs,
        json!({
            "type": "radar",
            "data": {
                "labels": ["Average return", "Average win rate", "Stability"],
                "datasets": datasets
            },
            "options": {
                "responsive": true,
                "maintainAspectRatio": false,
                "scales": {
                    "r": {
                        "ticks": { "color": AXIS_TICK, "backdropColor": "transparent" },
                        "grid": { "color": GRID_LINE },
                        "pointLabels": { "color": LEGEND_TEXT }
                    }
                },
                "plugins": { "legend": { "labels": { "color": LEGEND_TEXT } } }
            }
        }),
    )
}

/// Plotly line figure for a chart payload carrying `timestamps` and `values`.
pub fn price_line_figure(data: &ChartData) -> Option<ChartSpec> {
    let (timestamps, values) = match (&data.timestamps, &data.values) {
        (Some(t), Some(v)) => (t, v),
        _ => return None,
    };
    let title = data.title.as_deref().filter(|t| !t.is_empty());

    Some(ChartSpec::new(
        ChartLibrary::Plotly,
        json!({
            "data": [{
                "x": timestamps,
                "y": values,
                "type": "scatter",
                "mode": "lines",
                "name": title.unwrap_or("Price"),
                "line": { "color": "#00D9FF", "width": 2 }
            }],
            "layout": {
                "title": title.unwrap_or("Price Trend"),
                "xaxis": { "title": "Time", "type": "date" },
                "yaxis": { "title": "Price (USDT)" },
                "template": "plotly_dark",
                "paper_bgcolor": "#1a1a2e",
                "plot_bgcolor": "#16213e",
                "hovermode": "x unified",
                "height": 500
            },
            "config": { "responsive": true }
        }),
    ))
}
