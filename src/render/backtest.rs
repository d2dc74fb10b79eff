//! Result cards for the backtest page.

use super::format::{escape_html, format_timestamp, group_thousands, strategy_name};
use crate::types::BacktestRun;

pub const RUNNING_MESSAGE: &str = r#"<p class="text-center">Running backtest...</p>"#;
pub const EMPTY_MESSAGE: &str =
    r#"<p class="text-center">No backtest results yet, run a backtest to get started.</p>"#;
pub const LOAD_FAILED_MESSAGE: &str = r#"<p class="text-center">Failed to load results.</p>"#;

const SUCCESS: &str = "var(--success-color)";
const DANGER: &str = "var(--danger-color)";
const WARNING: &str = "#f59e0b";

pub fn badge_class(run: &BacktestRun) -> &'static str {
    if run.is_profit() {
        "badge-success"
    } else {
        "badge-danger"
    }
}

/// Optional metrics are shown only when present and non-zero.
pub fn shown_metric(value: Option<f64>) -> Option<f64> {
    value.filter(|v| *v != 0.0 && !v.is_nan())
}

/// Cards for `runs`, already in display order.
pub fn results_list(runs: &[BacktestRun]) -> String {
    if runs.is_empty() {
        return EMPTY_MESSAGE.to_string();
    }
    runs.iter().map(result_card).collect()
}

pub fn result_card(run: &BacktestRun) -> String {
    let is_profit = run.is_profit();

    let date_range = if run.start_date.is_some() || run.end_date.is_some() {
        format!(
            " | {} ~ {}",
            escape_html(run.start_date.as_deref().unwrap_or("start")),
            escape_html(run.end_date.as_deref().unwrap_or("end")),
        )
    } else {
        String::new()
    };

    let sharpe = run.sharpe_ratio.unwrap_or(0.0);
    let sharpe_color = if sharpe > 1.0 {
        SUCCESS
    } else if sharpe > 0.0 {
        WARNING
    } else {
        DANGER
    };
    let win_rate = run.win_rate.unwrap_or(0.0);

    let mut metrics = vec![
        metric("Initial capital", None, &format!("${}", group_thousands(run.initial_capital))),
        metric("Final value", None, &format!("${:.2}", run.final_value)),
        metric(
            "Total return",
            Some(if is_profit { SUCCESS } else { DANGER }),
            &format!("{:.2}%", run.total_return_pct),
        ),
        metric("Sharpe ratio", Some(sharpe_color), &format!("{:.3}", sharpe)),
        metric("Max drawdown", Some(DANGER), &format!("{:.2}%", run.max_drawdown_pct)),
        metric("Total trades", None, &run.total_trades.unwrap_or(0).to_string()),
        metric("Winning trades", Some(SUCCESS), &run.winning_trades.unwrap_or(0).to_string()),
        metric("Losing trades", Some(DANGER), &run.losing_trades.unwrap_or(0).to_string()),
        metric(
            "Win rate",
            Some(if win_rate > 50.0 { SUCCESS } else { WARNING }),
            &format!("{:.1}%", win_rate),
        ),
    ];

    if let Some(pf) = shown_metric(run.profit_factor) {
        metrics.push(metric(
            "Profit factor",
            Some(if pf > 1.0 { SUCCESS } else { DANGER }),
            &format!("{:.2}", pf),
        ));
    }
    if let Some(avg_win) = shown_metric(run.avg_win) {
        metrics.push(metric("Average win", Some(SUCCESS), &format!("${:.2}", avg_win)));
    }
    if let Some(avg_loss) = shown_metric(run.avg_loss) {
        metrics.push(metric("Average loss", Some(DANGER), &format!("${:.2}", avg_loss.abs())));
    }

    format!(
        r#"<div class="result-card"><div class="result-header"><div><div class="result-title">{symbol} - {strategy}</div><small style="color: #94a3b8;">{timeframe}{range} | {when}</small></div><div class="result-badge {badge}">{arrow} {ret:.2}%</div></div><div class="metrics-grid">{metrics}</div></div>"#,
        symbol = escape_html(run.symbol.as_deref().filter(|s| !s.is_empty()).unwrap_or("N/A")),
        strategy = escape_html(&strategy_name(run.strategy.as_deref().unwrap_or(""))),
        timeframe = escape_html(run.timeframe_or_default()),
        range = date_range,
        when = escape_html(&format_timestamp(run.timestamp.as_deref())),
        badge = badge_class(run),
        arrow = if is_profit { "📈" } else { "📉" },
        ret = run.total_return_pct,
        metrics = metrics.concat(),
    )
}

fn metric(label: &str, color: Option<&str>, value: &str) -> String {
    let style = color
        .map(|c| format!(r#" style="color: {};""#, c))
        .unwrap_or_default();
    format!(
        r#"<div class="metric-item"><div class="metric-label">{}</div><div class="metric-value"{}>{}</div></div>"#,
        label, style, value
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(total_return_pct: f64) -> BacktestRun {
        BacktestRun {
            symbol: Some("BTCUSDT".to_string()),
            strategy: Some("technical".to_string()),
            initial_capital: 10000.0,
            final_value: 10000.0 * (1.0 + total_return_pct / 100.0),
            total_return_pct,
            timestamp: Some("2025-01-12T09:30:00".to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn test_badge_follows_sign_of_return() {
        assert_eq!(badge_class(&run(0.01)), "badge-success");
        assert_eq!(badge_class(&run(0.0)), "badge-danger");
        assert_eq!(badge_class(&run(-3.0)), "badge-danger");

        let card = result_card(&run(0.0));
        assert!(card.contains("result-badge badge-danger"));
        assert!(card.contains("📉 0.00%"));
    }

    #[test]
    fn test_card_defaults_for_missing_fields() {
        let card = result_card(&BacktestRun::default());
        assert!(card.contains("N/A - "));
        assert!(card.contains(">1h | N/A<"));
        assert!(card.contains(">0.000<"));
        assert!(card.contains(">0.0%<"));
        assert!(!card.contains("Profit factor"));
    }

    #[test]
    fn test_card_header_and_grid() {
        let mut r = run(12.5);
        r.timeframe = Some("4h".to_string());
        r.start_date = Some("2025-01-01".to_string());
        r.sharpe_ratio = Some(1.2345);
        r.total_trades = Some(8);
        r.winning_trades = Some(5);
        r.losing_trades = Some(3);
        r.win_rate = Some(62.5);

        let card = result_card(&r);
        assert!(card.contains("BTCUSDT - Technical Strategy"));
        assert!(card.contains("4h | 2025-01-01 ~ end | 2025-01-12 09:30:00"));
        assert!(card.contains("$10,000"));
        assert!(card.contains("$11250.00"));
        assert!(card.contains(">1.234<") || card.contains(">1.235<"));
        assert!(card.contains("62.5%"));
        assert!(card.contains("badge-success"));
    }

    #[test]
    fn test_zero_optional_metrics_are_suppressed() {
        let mut r = run(5.0);
        r.profit_factor = Some(0.0);
        r.avg_win = Some(120.0);
        r.avg_loss = Some(-80.5);

        let card = result_card(&r);
        assert!(!card.contains("Profit factor"));
        assert!(card.contains("Average win"));
        assert!(card.contains("$120.00"));
        assert!(card.contains("$80.50"));
        assert!(!card.contains("$-80.50"));
    }

    #[test]
    fn test_results_list() {
        assert_eq!(results_list(&[]), EMPTY_MESSAGE);
        let html = results_list(&[run(1.0), run(-1.0)]);
        assert_eq!(html.matches(r#"class="result-card""#).count(), 2);
    }
}
