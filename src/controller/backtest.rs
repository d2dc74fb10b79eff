use chrono::{Duration, NaiveDate};
use std::ops::{Deref, DerefMut};
use thiserror::Error;
use tracing::{debug, error, info, warn};

use crate::api::{AssistantApi, BacktestResultsResponse};
use crate::error::ApiError;
use crate::render::{backtest, charts};
use crate::types::{BacktestRequest, BacktestRun};
use crate::view::{BacktestForm, BacktestPage, ChartHandle, Dialogs};

use super::UNKNOWN_ERROR;

pub const PERFORMANCE_CANVAS: &str = "performanceChart";
pub const COMPARISON_CANVAS: &str = "comparisonChart";

pub const COMPLETE_ALERT: &str = "Backtest complete!";
pub const BUSY_ALERT: &str = "A backtest is already running";
pub const TRANSPORT_ALERT: &str = "An error occurred while running the backtest";

const DATE_FORMAT: &str = "%Y-%m-%d";

#[derive(Debug, Error, PartialEq)]
pub enum FormError {
    #[error("{0} is required")]
    Missing(&'static str),

    #[error("Initial capital must be a positive number, got '{0}'")]
    InvalidCapital(String),

    #[error("Invalid {field} '{value}', expected YYYY-MM-DD")]
    InvalidDate { field: &'static str, value: String },
}

impl BacktestForm {
    /// Validates the raw form values into a run request.
    pub fn to_request(&self) -> Result<BacktestRequest, FormError> {
        let symbol = required("Symbol", &self.symbol)?;
        let timeframe = required("Timeframe", &self.timeframe)?;
        let strategy = required("Strategy", &self.strategy)?;

        let capital = self.initial_capital.trim();
        let initial_capital = capital
            .parse::<f64>()
            .ok()
            .filter(|c| c.is_finite() && *c > 0.0)
            .ok_or_else(|| FormError::InvalidCapital(capital.to_string()))?;

        Ok(BacktestRequest {
            symbol,
            timeframe,
            strategy,
            initial_capital,
            start_date: optional_date("start date", &self.start_date)?,
            end_date: optional_date("end date", &self.end_date)?,
        })
    }
}

fn required(field: &'static str, value: &str) -> Result<String, FormError> {
    let value = value.trim();
    if value.is_empty() {
        Err(FormError::Missing(field))
    } else {
        Ok(value.to_string())
    }
}

fn optional_date(field: &'static str, value: &str) -> Result<Option<NaiveDate>, FormError> {
    let value = value.trim();
    if value.is_empty() {
        return Ok(None);
    }
    NaiveDate::parse_from_str(value, DATE_FORMAT)
        .map(Some)
        .map_err(|_| FormError::InvalidDate {
            field,
            value: value.to_string(),
        })
}

/// Generation of one results load. Only the newest ticket may apply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadTicket(u64);

/// Drives the backtest page: run form, results list and both charts.
pub struct BacktestController<A> {
    api: A,
    page: BacktestPage,
    /// Most recent first.
    results: Vec<BacktestRun>,
    performance_chart: ChartHandle,
    comparison_chart: ChartHandle,
    running: bool,
    generation: u64,
    results_limit: usize,
    lookback_days: u32,
}

impl<A: AssistantApi> BacktestController<A> {
    pub fn new(api: A, results_limit: usize, lookback_days: u32) -> Self {
        Self {
            api,
            page: BacktestPage::new(),
            results: Vec::new(),
            performance_chart: ChartHandle::new(PERFORMANCE_CANVAS),
            comparison_chart: ChartHandle::new(COMPARISON_CANVAS),
            running: false,
            generation: 0,
            results_limit,
            lookback_days,
        }
    }

    /// Fills the form defaults, a date range ending `today`, then loads the
    /// results list.
    pub async fn init(&mut self, today: NaiveDate) {
        let form = &mut self.page.form;
        if form.symbol.is_empty() {
            form.symbol = "BTC/USDT".to_string();
        }
        if form.timeframe.is_empty() {
            form.timeframe = "1h".to_string();
        }
        if form.strategy.is_empty() {
            form.strategy = "technical".to_string();
        }
        if form.initial_capital.is_empty() {
            form.initial_capital = "10000".to_string();
        }
        let start = today - Duration::days(i64::from(self.lookback_days));
        form.start_date = start.format(DATE_FORMAT).to_string();
        form.end_date = today.format(DATE_FORMAT).to_string();

        self.load_results().await;
    }

    pub fn page(&self) -> &BacktestPage {
        &self.page
    }

    pub fn form_mut(&mut self) -> &mut BacktestForm {
        &mut self.page.form
    }

    pub fn results(&self) -> &[BacktestRun] {
        &self.results
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Submits the form. Returns true when the backend accepted the run.
    pub async fn run<D: Dialogs>(&mut self, dialogs: &mut D) -> bool {
        if self.running {
            warn!("Backtest submit ignored, a run is already in flight");
            dialogs.alert(BUSY_ALERT);
            return false;
        }

        let request = match self.page.form.to_request() {
            Ok(request) => request,
            Err(e) => {
                warn!("Backtest form rejected: {}", e);
                dialogs.alert(&e.to_string());
                return false;
            }
        };

        let mut run = RunInFlight::begin(self);

        info!(
            "Running backtest: {} {} {} capital={}",
            request.symbol, request.timeframe, request.strategy, request.initial_capital
        );
        let outcome = run.api.run_backtest(&request).await;
        run.page.loading_visible = false;

        let accepted = match outcome {
            Ok(resp) if resp.success => {
                run.load_results().await;
                dialogs.alert(COMPLETE_ALERT);
                true
            }
            Ok(resp) => {
                let reason = resp.error.unwrap_or_else(|| UNKNOWN_ERROR.to_string());
                warn!("Backtest rejected: {}", reason);
                run.render_results();
                dialogs.alert(&format!("Backtest failed: {}", reason));
                false
            }
            Err(e) => {
                error!("Backtest request failed: {}", e);
                run.render_results();
                dialogs.alert(TRANSPORT_ALERT);
                false
            }
        };

        run.settle();
        accepted
    }

    pub async fn load_results(&mut self) -> bool {
        let ticket = self.begin_load();
        debug!("Loading backtest results (limit {})", self.results_limit);
        let outcome = self.api.backtest_results(self.results_limit).await;
        self.apply_results(ticket, outcome)
    }

    /// Starts a results load; any earlier ticket becomes stale.
    pub fn begin_load(&mut self) -> LoadTicket {
        self.generation += 1;
        LoadTicket(self.generation)
    }

    /// Applies a results response. Returns false when `ticket` is stale and
    /// the response was discarded.
    pub fn apply_results(
        &mut self,
        ticket: LoadTicket,
        outcome: Result<BacktestResultsResponse, ApiError>,
    ) -> bool {
        if ticket.0 != self.generation {
            debug!(
                "Discarding stale results (ticket {}, current {})",
                ticket.0, self.generation
            );
            return false;
        }

        match outcome {
            Ok(resp) if resp.success && !resp.results.is_empty() => {
                let mut runs = resp.results;
                runs.reverse();
                info!("Loaded {} backtest results", runs.len());
                self.results = runs;
                self.render_results();
                self.update_charts();
            }
            Ok(resp) => {
                if !resp.success {
                    warn!(
                        "Results list unavailable: {}",
                        resp.error.unwrap_or_default()
                    );
                }
                self.results.clear();
                self.page.results_html = backtest::EMPTY_MESSAGE.to_string();
                self.hide_charts();
            }
            Err(e) => {
                error!("Failed to load backtest results: {}", e);
                self.page.results_html = backtest::LOAD_FAILED_MESSAGE.to_string();
            }
        }
        true
    }

    fn render_results(&mut self) {
        self.page.results_html = backtest::results_list(&self.results);
    }

    /// Rebuilds both charts from the current results.
    pub fn update_charts(&mut self) {
        if self.results.is_empty() {
            return;
        }
        self.page.charts_visible = true;
        self.performance_chart
            .replace(&mut self.page.charts, charts::performance_chart(&self.results));
        self.comparison_chart
            .replace(&mut self.page.charts, charts::comparison_chart(&self.results));
    }

    fn hide_charts(&mut self) {
        self.performance_chart.dispose(&mut self.page.charts);
        self.comparison_chart.dispose(&mut self.page.charts);
        self.page.charts_visible = false;
    }

    pub fn teardown(&mut self) {
        self.hide_charts();
    }
}

/// A run in flight: busy flag set, loading indicator shown. Dropping the guard
/// clears both, and a run dropped before it settled puts the prior results
/// back on the page.
struct RunInFlight<'a, A> {
    controller: &'a mut BacktestController<A>,
    settled: bool,
}

impl<'a, A> RunInFlight<'a, A> {
    fn begin(controller: &'a mut BacktestController<A>) -> Self {
        controller.running = true;
        controller.page.loading_visible = true;
        controller.page.results_html = backtest::RUNNING_MESSAGE.to_string();
        Self {
            controller,
            settled: false,
        }
    }

    fn settle(&mut self) {
        self.settled = true;
    }
}

impl<A> Deref for RunInFlight<'_, A> {
    type Target = BacktestController<A>;

    fn deref(&self) -> &Self::Target {
        self.controller
    }
}

impl<A> DerefMut for RunInFlight<'_, A> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.controller
    }
}

impl<A> Drop for RunInFlight<'_, A> {
    fn drop(&mut self) {
        let controller = &mut *self.controller;
        controller.running = false;
        controller.page.loading_visible = false;
        if !self.settled {
            warn!("Backtest run dropped before it completed");
            controller.page.results_html = backtest::results_list(&controller.results);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{BacktestRunResponse, MockAssistantApi, PendingApi};
    use crate::view::{ChartLibrary, MockDialogs};
    use mockall::predicate::eq;
    use serde_json::json;
    use std::sync::{Arc, Mutex};

    fn run(symbol: &str, strategy: &str, ret: f64) -> BacktestRun {
        BacktestRun {
            symbol: Some(symbol.to_string()),
            strategy: Some(strategy.to_string()),
            total_return_pct: ret,
            ..Default::default()
        }
    }

    fn listing(runs: Vec<BacktestRun>) -> BacktestResultsResponse {
        BacktestResultsResponse {
            success: true,
            results: runs,
            error: None,
        }
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 3, 31).unwrap()
    }

    fn form() -> BacktestForm {
        BacktestForm {
            symbol: "BTCUSDT".to_string(),
            timeframe: "1h".to_string(),
            strategy: "technical".to_string(),
            initial_capital: "10000".to_string(),
            start_date: "2025-03-01".to_string(),
            end_date: String::new(),
        }
    }

    #[test]
    fn test_form_validation() {
        let request = form().to_request().unwrap();
        assert_eq!(request.initial_capital, 10000.0);
        assert_eq!(request.start_date, NaiveDate::from_ymd_opt(2025, 3, 1));
        assert_eq!(request.end_date, None);

        let mut blank = form();
        blank.symbol = "  ".to_string();
        assert_eq!(blank.to_request(), Err(FormError::Missing("Symbol")));

        for capital in ["", "abc", "0", "-5"] {
            let mut bad = form();
            bad.initial_capital = capital.to_string();
            assert!(matches!(bad.to_request(), Err(FormError::InvalidCapital(_))));
        }

        let mut bad_date = form();
        bad_date.end_date = "31/03/2025".to_string();
        assert!(matches!(
            bad_date.to_request(),
            Err(FormError::InvalidDate { field: "end date", .. })
        ));
    }

    #[tokio::test]
    async fn test_init_sets_date_range_and_loads() {
        let mut api = MockAssistantApi::new();
        api.expect_backtest_results()
            .with(eq(10usize))
            .times(1)
            .returning(|_| Ok(listing(vec![])));

        let mut controller = BacktestController::new(api, 10, 30);
        controller.init(today()).await;

        let page = controller.page();
        assert_eq!(page.form.start_date, "2025-03-01");
        assert_eq!(page.form.end_date, "2025-03-31");
        assert_eq!(page.form.initial_capital, "10000");
        assert_eq!(page.results_html, backtest::EMPTY_MESSAGE);
        assert!(!page.charts_visible);
    }

    #[tokio::test]
    async fn test_run_refetches_and_shows_new_run_first() {
        let stored: Arc<Mutex<Vec<BacktestRun>>> =
            Arc::new(Mutex::new(vec![run("ETHUSDT", "sentiment", -1.0)]));

        let mut api = MockAssistantApi::new();
        let listed = Arc::clone(&stored);
        api.expect_backtest_results()
            .times(2)
            .returning(move |_| Ok(listing(listed.lock().unwrap().clone())));
        let saved = Arc::clone(&stored);
        api.expect_run_backtest()
            .withf(|r| {
                r.symbol == "BTCUSDT" && r.strategy == "technical" && r.initial_capital == 10000.0
            })
            .times(1)
            .returning(move |r| {
                saved
                    .lock()
                    .unwrap()
                    .push(run(&r.symbol, &r.strategy, 4.2));
                Ok(BacktestRunResponse {
                    success: true,
                    error: None,
                })
            });

        let mut dialogs = MockDialogs::new();
        dialogs
            .expect_alert()
            .withf(|m| m == COMPLETE_ALERT)
            .times(1)
            .return_const(());

        let mut controller = BacktestController::new(api, 10, 30);
        controller.init(today()).await;
        assert_eq!(controller.results().len(), 1);

        *controller.form_mut() = form();
        assert!(controller.run(&mut dialogs).await);

        let results = controller.results();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].symbol.as_deref(), Some("BTCUSDT"));
        assert!(controller.page().results_html.find("BTCUSDT") < controller.page().results_html.find("ETHUSDT"));
        assert!(!controller.page().loading_visible);
        assert!(!controller.is_running());
    }

    #[tokio::test]
    async fn test_failed_run_keeps_prior_results() {
        let mut api = MockAssistantApi::new();
        api.expect_backtest_results()
            .times(1)
            .returning(|_| Ok(listing(vec![run("ETHUSDT", "macd", 2.0)])));
        api.expect_run_backtest().times(1).returning(|_| {
            Ok(serde_json::from_value(json!({"success": false, "error": "Unknown strategy: foo"}))
                .unwrap())
        });

        let mut dialogs = MockDialogs::new();
        dialogs
            .expect_alert()
            .withf(|m| m == "Backtest failed: Unknown strategy: foo")
            .times(1)
            .return_const(());

        let mut controller = BacktestController::new(api, 10, 30);
        controller.init(today()).await;
        let before = controller.page().results_html.clone();

        assert!(!controller.run(&mut dialogs).await);
        assert_eq!(controller.page().results_html, before);
        assert!(!controller.page().loading_visible);
    }

    #[tokio::test]
    async fn test_transport_failure_alerts_generic_message() {
        let mut api = MockAssistantApi::new();
        api.expect_run_backtest()
            .returning(|_| Err(ApiError::Status { status: 502 }));

        let mut dialogs = MockDialogs::new();
        dialogs
            .expect_alert()
            .withf(|m| m == TRANSPORT_ALERT)
            .times(1)
            .return_const(());

        let mut controller = BacktestController::new(api, 10, 30);
        *controller.form_mut() = form();
        assert!(!controller.run(&mut dialogs).await);
        assert!(!controller.page().loading_visible);
        assert_eq!(controller.page().results_html, backtest::EMPTY_MESSAGE);
    }

    #[tokio::test]
    async fn test_rejection_without_reason_alerts_unknown_error() {
        let mut api = MockAssistantApi::new();
        api.expect_run_backtest()
            .times(1)
            .returning(|_| Ok(serde_json::from_value(json!({"success": false})).unwrap()));

        let mut dialogs = MockDialogs::new();
        dialogs
            .expect_alert()
            .withf(|m| m == "Backtest failed: unknown error")
            .times(1)
            .return_const(());

        let mut controller = BacktestController::new(api, 10, 30);
        *controller.form_mut() = form();
        assert!(!controller.run(&mut dialogs).await);
        assert!(!controller.is_running());
        assert_eq!(controller.page().results_html, backtest::EMPTY_MESSAGE);
    }

    #[tokio::test]
    async fn test_dropped_run_clears_busy_state() {
        let mut dialogs = MockDialogs::new();
        dialogs.expect_alert().never();

        let mut controller = BacktestController::new(PendingApi, 10, 30);
        *controller.form_mut() = form();

        let timed_out =
            tokio::time::timeout(std::time::Duration::from_millis(20), controller.run(&mut dialogs))
                .await;
        assert!(timed_out.is_err());
        assert!(!controller.is_running());
        assert!(!controller.page().loading_visible);
        assert_eq!(controller.page().results_html, backtest::EMPTY_MESSAGE);

        // A later submit goes through instead of hitting the busy alert.
        let timed_out =
            tokio::time::timeout(std::time::Duration::from_millis(20), controller.run(&mut dialogs))
                .await;
        assert!(timed_out.is_err());
        assert!(!controller.is_running());
    }

    #[tokio::test]
    async fn test_invalid_form_sends_nothing() {
        let mut api = MockAssistantApi::new();
        api.expect_run_backtest().never();

        let mut dialogs = MockDialogs::new();
        dialogs
            .expect_alert()
            .withf(|m| m.starts_with("Initial capital"))
            .times(1)
            .return_const(());

        let mut controller = BacktestController::new(api, 10, 30);
        *controller.form_mut() = form();
        controller.form_mut().initial_capital = "lots".to_string();
        assert!(!controller.run(&mut dialogs).await);
    }

    #[test]
    fn test_stale_ticket_is_discarded() {
        let mut controller = BacktestController::new(MockAssistantApi::new(), 10, 30);

        let older = controller.begin_load();
        let newer = controller.begin_load();

        assert!(controller.apply_results(newer, Ok(listing(vec![run("BTCUSDT", "technical", 1.0)]))));
        assert!(!controller.apply_results(older, Ok(listing(vec![]))));

        assert_eq!(controller.results().len(), 1);
        assert!(controller.page().results_html.contains("BTCUSDT"));
    }

    #[test]
    fn test_load_failure_message() {
        let mut controller = BacktestController::new(MockAssistantApi::new(), 10, 30);
        let ticket = controller.begin_load();
        controller.apply_results(ticket, Err(ApiError::Status { status: 500 }));
        assert_eq!(controller.page().results_html, backtest::LOAD_FAILED_MESSAGE);
    }

    #[test]
    fn test_chart_refresh_keeps_one_instance_per_canvas() {
        let mut controller = BacktestController::new(MockAssistantApi::new(), 10, 30);
        let runs = vec![run("BTCUSDT", "technical", 3.0), run("ETHUSDT", "sentiment", -2.0)];

        for _ in 0..2 {
            let ticket = controller.begin_load();
            controller.apply_results(ticket, Ok(listing(runs.clone())));
        }

        let charts = &controller.page().charts;
        assert_eq!(charts.live().len(), 2);
        assert_eq!(charts.live_on(PERFORMANCE_CANVAS), 1);
        assert_eq!(charts.live_on(COMPARISON_CANVAS), 1);
        let comparison = charts.on_canvas(COMPARISON_CANVAS).unwrap();
        assert_eq!(comparison.spec.library, ChartLibrary::ChartJs);
        assert_eq!(comparison.spec.config["type"], "radar");

        controller.teardown();
        assert!(controller.page().charts.live().is_empty());
        assert!(!controller.page().charts_visible);
    }
}
