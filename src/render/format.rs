//! Escaping and number formatting shared by both pages.

use chrono::{DateTime, NaiveDateTime};

/// Escapes the five HTML-significant characters.
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#039;"),
            _ => out.push(c),
        }
    }
    out
}

/// Compact magnitude: `1.50B`, `2.30M`, `4.00K`, `12.34`.
pub fn format_number(num: f64) -> String {
    if num >= 1e9 {
        format!("{:.2}B", num / 1e9)
    } else if num >= 1e6 {
        format!("{:.2}M", num / 1e6)
    } else if num >= 1e3 {
        format!("{:.2}K", num / 1e3)
    } else {
        format!("{:.2}", num)
    }
}

/// Percentage with an explicit `+` for gains: `+1.25%`, `-0.40%`, `0.00%`.
pub fn signed_pct(value: f64) -> String {
    let sign = if value > 0.0 { "+" } else { "" };
    format!("{}{:.2}%", sign, value)
}

/// Thousands separators with up to three fraction digits: `10,000`, `2,500.5`.
pub fn group_thousands(value: f64) -> String {
    let rounded = format!("{:.3}", value.abs());
    let (int_part, frac_part) = rounded.split_once('.').unwrap_or((rounded.as_str(), ""));
    let frac_part = frac_part.trim_end_matches('0');

    let mut grouped = String::with_capacity(int_part.len() + int_part.len() / 3);
    for (i, c) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(c);
    }

    let sign = if value < 0.0 && (int_part != "0" || !frac_part.is_empty()) { "-" } else { "" };
    if frac_part.is_empty() {
        format!("{}{}", sign, grouped)
    } else {
        format!("{}{}.{}", sign, grouped, frac_part)
    }
}

/// CSS class for a signed change.
pub fn change_class(value: f64) -> &'static str {
    if value > 0.0 {
        "positive"
    } else {
        "negative"
    }
}

pub fn sentiment_class(sentiment: &str) -> &'static str {
    match sentiment {
        "positive" => "positive",
        "negative" => "negative",
        _ => "",
    }
}

pub fn sentiment_emoji(sentiment: &str) -> &'static str {
    match sentiment {
        "positive" => "😊",
        "negative" => "😟",
        _ => "😐",
    }
}

/// `STRONG_BUY` and `BUY` read as positive, anything with `SELL` as negative.
pub fn recommendation_class(recommendation: &str) -> &'static str {
    if recommendation.contains("BUY") {
        "positive"
    } else if recommendation.contains("SELL") {
        "negative"
    } else {
        ""
    }
}

pub fn strategy_name(strategy: &str) -> String {
    match strategy {
        "sentiment" => "Sentiment Strategy".to_string(),
        "technical" => "Technical Strategy".to_string(),
        "combined" => "Combined Strategy".to_string(),
        "macd" => "MACD Strategy".to_string(),
        "ml" => "Machine Learning Strategy".to_string(),
        other => other.to_string(),
    }
}

const STRATEGY_PALETTE: [(u8, u8, u8); 4] = [
    (37, 99, 235),
    (124, 58, 237),
    (16, 185, 129),
    (245, 158, 11),
];

pub fn strategy_color(index: usize, alpha: f64) -> String {
    let (r, g, b) = STRATEGY_PALETTE[index % STRATEGY_PALETTE.len()];
    format!("rgba({}, {}, {}, {})", r, g, b, alpha)
}

/// Backend timestamps are ISO-8601, with or without an offset.
/// Anything unparseable is shown as received.
pub fn format_timestamp(raw: Option<&str>) -> String {
    let Some(raw) = raw.filter(|r| !r.is_empty()) else {
        return "N/A".to_string();
    };

    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return dt.format("%Y-%m-%d %H:%M:%S").to_string();
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f") {
        return dt.format("%Y-%m-%d %H:%M:%S").to_string();
    }
    raw.to_string()
}
