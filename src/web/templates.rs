use askama::Template;

use crate::controller::QUICK_ACTIONS;
use crate::view::{BacktestPage, ChartLibrary, ChatPage, LiveChart};

#[derive(Template)]
#[template(path = "chat.html")]
pub struct ChatTemplate<'a> {
    pub status_text: &'a str,
    pub status_class: &'static str,
    pub controls_disabled: bool,
    pub transcript_html: String,
    pub quick_actions: Vec<(usize, &'static str)>,
    pub chart_visible: bool,
    pub chart_markup: Option<&'a str>,
    pub chart_scripts: Vec<String>,
    pub alerts: &'a [String],
}

#[derive(Template)]
#[template(path = "backtest.html")]
pub struct BacktestTemplate<'a> {
    pub symbol: &'a str,
    pub timeframe: &'a str,
    pub strategy: &'a str,
    pub initial_capital: &'a str,
    pub start_date: &'a str,
    pub end_date: &'a str,
    pub running: bool,
    pub loading_visible: bool,
    pub results_html: &'a str,
    pub charts_visible: bool,
    pub chart_scripts: Vec<String>,
    pub alerts: &'a [String],
}

pub fn render_chat_page(page: &ChatPage, alerts: &[String]) -> Result<String, askama::Error> {
    ChatTemplate {
        status_text: &page.status.text,
        status_class: page.status.tone.css_class(),
        controls_disabled: page.controls_disabled,
        transcript_html: page.transcript_html(),
        quick_actions: QUICK_ACTIONS
            .iter()
            .enumerate()
            .map(|(i, action)| (i, action.label))
            .collect(),
        chart_visible: page.chart_visible,
        chart_markup: page.chart_markup.as_deref(),
        chart_scripts: page.charts.live().iter().map(chart_script).collect(),
        alerts,
    }
    .render()
}

/// `running` disables the submit button while a run is in flight.
pub fn render_backtest_page(
    page: &BacktestPage,
    running: bool,
    alerts: &[String],
) -> Result<String, askama::Error> {
    let form = &page.form;
    BacktestTemplate {
        symbol: &form.symbol,
        timeframe: &form.timeframe,
        strategy: &form.strategy,
        initial_capital: &form.initial_capital,
        start_date: &form.start_date,
        end_date: &form.end_date,
        running,
        loading_visible: page.loading_visible,
        results_html: &page.results_html,
        charts_visible: page.charts_visible,
        chart_scripts: page.charts.live().iter().map(chart_script).collect(),
        alerts,
    }
    .render()
}

/// The library call that draws `chart` on its canvas.
pub fn chart_script(chart: &LiveChart) -> String {
    let config = script_safe(&chart.spec.config.to_string());
    let canvas = script_safe(&serde_json::Value::from(chart.canvas.as_str()).to_string());
    match chart.spec.library {
        ChartLibrary::ChartJs => format!(
            "new Chart(document.getElementById({}), {});",
            canvas, config
        ),
        ChartLibrary::Plotly => format!(
            "(function (f) {{ Plotly.newPlot({}, f.data, f.layout, f.config); }})({});",
            canvas, config
        ),
    }
}

/// JSON placed inside a `<script>` element must not close it.
fn script_safe(json: &str) -> String {
    json.replace("</", "<\\/")
}
