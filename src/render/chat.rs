//! Markup for the chat transcript.

use super::format::{
    change_class, escape_html, format_number, recommendation_class, sentiment_class,
    sentiment_emoji, signed_pct,
};
use crate::types::ToolResult;

pub const GREETING: &str = "The conversation has been reset. Tell me what you would like to do!";
pub const TOOL_FAILURE_TITLE: &str = "❌ Tool execution failed";
pub const TOOL_FAILURE_FALLBACK: &str = "Unknown error";

const USER_LABEL: &str = "👤 You:";
const BOT_LABEL: &str = "🤖 AI Assistant:";

pub fn user_message(text: &str) -> String {
    message_div("user", USER_LABEL, text)
}

pub fn bot_message(text: &str) -> String {
    message_div("bot", BOT_LABEL, text)
}

fn message_div(kind: &str, label: &str, text: &str) -> String {
    format!(
        r#"<div class="message {kind}-message"><div class="message-content"><strong>{label}</strong><p>{text}</p></div></div>"#,
        kind = kind,
        label = label,
        text = escape_html(text),
    )
}

pub fn loading_message(id: &str) -> String {
    format!(
        r#"<div id="{id}" class="message bot-message loading-message"><div class="message-content"><strong>{label}</strong><div class="loading-dots"><span class="dot">●</span><span class="dot">●</span><span class="dot">●</span><span style="margin-left: 10px;">Analyzing your request...</span></div></div></div>"#,
        id = escape_html(id),
        label = BOT_LABEL,
    )
}

/// Assistant reply: optional reasoning, the message, then the tool panel.
pub fn bot_response(message: &str, thinking: Option<&str>, tool: Option<(&str, &ToolResult)>) -> String {
    let mut html = format!("<strong>{}</strong>", BOT_LABEL);

    if let Some(thinking) = thinking.filter(|t| !t.is_empty()) {
        html.push_str(&format!(
            r#"<p style="color: #94a3b8; font-style: italic; font-size: 0.9rem;">💭 {}</p>"#,
            escape_html(thinking)
        ));
    }

    html.push_str(&format!("<p>{}</p>", escape_html(message)));

    if let Some((tool_name, result)) = tool {
        html.push_str(&tool_panel(tool_name, result));
    }

    format!(
        r#"<div class="message bot-message"><div class="message-content">{}</div></div>"#,
        html
    )
}

pub fn tool_panel(tool_name: &str, result: &ToolResult) -> String {
    let items = match result {
        ToolResult::Failed { error } => {
            return format!(
                r#"<div class="tool-result"><div class="result-title">{}</div><p>{}</p></div>"#,
                TOOL_FAILURE_TITLE,
                escape_html(error.as_deref().unwrap_or(TOOL_FAILURE_FALLBACK)),
            );
        }
        ToolResult::Chart(_) => {
            return r#"<div class="tool-result"><div class="result-title">✅ Chart generated</div><p>The chart is shown in the display area above</p></div>"#
                .to_string();
        }
        ToolResult::Price(quote) => vec![
            item("Pair", "", &escape_html(&quote.symbol)),
            item("Current price", "", &format!("${:.2}", quote.price)),
            item("24h change", change_class(quote.change_24h), &signed_pct(quote.change_24h)),
            item("24h volume", "", &format!("${}", format_number(quote.volume_24h))),
        ],
        ToolResult::Sentiment(agg) => vec![
            item(
                "Overall sentiment",
                sentiment_class(&agg.overall_sentiment),
                &format!(
                    "{} {}",
                    sentiment_emoji(&agg.overall_sentiment),
                    escape_html(&agg.overall_sentiment.to_uppercase())
                ),
            ),
            item("Sentiment score", "", &format!("{:.3}", agg.sentiment_score)),
            item("Articles analyzed", "", &agg.counts.total.to_string()),
            item(
                "Positive/Neutral/Negative",
                "",
                &format!("{}/{}/{}", agg.counts.positive, agg.counts.neutral, agg.counts.negative),
            ),
        ],
        ToolResult::Technical(prediction) => {
            let mut items = vec![
                item("Current price", "", &format!("${:.2}", prediction.current_price)),
                item("Predicted price", "", &format!("${:.2}", prediction.predicted_price)),
                item(
                    "Predicted change",
                    change_class(prediction.predicted_change_pct),
                    &signed_pct(prediction.predicted_change_pct),
                ),
            ];
            let recommendation = prediction
                .signals
                .as_ref()
                .and_then(|s| s.recommendation.as_deref())
                .filter(|r| !r.is_empty());
            if let Some(rec) = recommendation {
                items.push(item("Suggested action", recommendation_class(rec), &escape_html(rec)));
            }
            items
        }
        ToolResult::Recommendation(rec) => vec![
            item("Overall recommendation", recommendation_class(&rec.action), &escape_html(&rec.action)),
            item("Confidence", "", &format!("{:.1}%", rec.confidence * 100.0)),
        ],
        ToolResult::Backtest(summary) => vec![
            item(
                "Strategy",
                "",
                &escape_html(summary.strategy.as_deref().unwrap_or("unknown")),
            ),
            item(
                "Total return",
                change_class(summary.total_return_pct),
                &signed_pct(summary.total_return_pct),
            ),
            item("Sharpe ratio", "", &format!("{:.2}", summary.sharpe_ratio)),
            item("Max drawdown", "negative", &format!("-{:.2}%", summary.max_drawdown_pct)),
            item("Win rate", "", &format!("{:.1}%", summary.win_rate)),
        ],
        ToolResult::Unrecognized => Vec::new(),
    };

    format!(
        r#"<div class="tool-result"><div class="result-title">✅ Tool result: {}</div><div class="result-data">{}</div></div>"#,
        escape_html(tool_name),
        items.concat(),
    )
}

fn item(label: &str, class: &str, value: &str) -> String {
    let class_attr = if class.is_empty() {
        "result-value".to_string()
    } else {
        format!("result-value {}", class)
    };
    format!(
        r#"<div class="result-item"><span class="result-label">{}</span><span class="{}">{}</span></div>"#,
        label, class_attr, value
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{classify, CombinedRecommendation, PriceQuote};
    use serde_json::json;

    const XSS: &str = "<script>alert(1)</script>";
    const ESCAPED: &str = "&lt;script&gt;alert(1)&lt;/script&gt;";

    #[test]
    fn test_user_and_bot_messages_escape_markup() {
        let user = user_message(XSS);
        assert!(user.contains(ESCAPED));
        assert!(!user.contains(XSS));
        assert!(user.contains("user-message"));

        let bot = bot_message(XSS);
        assert!(bot.contains(ESCAPED));
        assert!(!bot.contains(XSS));

        let reply = bot_response(XSS, Some(XSS), None);
        assert_eq!(reply.matches(ESCAPED).count(), 2);
        assert!(!reply.contains(XSS));
    }

    #[test]
    fn test_thinking_precedes_message() {
        let html = bot_response("BTC looks strong", Some("checking sentiment"), None);
        let thinking_at = html.find("💭 checking sentiment").unwrap();
        let message_at = html.find("<p>BTC looks strong</p>").unwrap();
        assert!(thinking_at < message_at);
        assert!(html.contains("font-style: italic"));
    }

    #[test]
    fn test_failure_panel() {
        let panel = tool_panel("get_price", &classify("get_price", &json!({"success": false, "error": "timeout"})));
        assert!(panel.contains(TOOL_FAILURE_TITLE));
        assert!(panel.contains("<p>timeout</p>"));

        let panel = tool_panel("get_price", &ToolResult::Failed { error: None });
        assert!(panel.contains(TOOL_FAILURE_TITLE));
        assert!(panel.contains(TOOL_FAILURE_FALLBACK));
    }

    #[test]
    fn test_price_panel() {
        let quote = ToolResult::Price(PriceQuote {
            symbol: "BTC".to_string(),
            price: 97123.456,
            change_24h: 2.5,
            volume_24h: 3.2e10,
        });
        let panel = tool_panel("get_price", &quote);
        assert!(panel.contains("Tool result: get_price"));
        assert!(panel.contains("$97123.46"));
        assert!(panel.contains(r#"<span class="result-value positive">+2.50%</span>"#));
        assert!(panel.contains("$32.00B"));
    }

    #[test]
    fn test_recommendation_panel() {
        let rec = ToolResult::Recommendation(CombinedRecommendation {
            action: "STRONG_SELL".to_string(),
            confidence: 0.734,
        });
        let panel = tool_panel("combined_analysis", &rec);
        assert!(panel.contains(r#"<span class="result-value negative">STRONG_SELL</span>"#));
        assert!(panel.contains("73.4%"));
    }

    #[test]
    fn test_backend_strings_are_escaped_in_panels() {
        let panel = tool_panel(
            "<b>tool</b>",
            &classify("<b>tool</b>", &json!({"success": true, "symbol": "<i>BTC</i>", "price": 1.0})),
        );
        assert!(panel.contains("&lt;b&gt;tool&lt;/b&gt;"));
        assert!(panel.contains("&lt;i&gt;BTC&lt;/i&gt;"));
    }
}
