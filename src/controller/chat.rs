use std::ops::{Deref, DerefMut};
use tracing::{debug, error, info, warn};

use crate::api::{AssistantApi, ChatResponse};
use crate::render::{charts, chat};
use crate::types::{classify, ChartPayload, ChatExchange, ToolResult};
use crate::view::{ChartHandle, ChatPage, Dialogs, EntryKind, StatusTone};

pub const CHART_CANVAS: &str = "chartDisplay";
pub const RESET_PROMPT: &str = "Reset the conversation?";
pub const RESET_FAILED_ALERT: &str = "Failed to reset the conversation";

const STATUS_THINKING: &str = "🔄 AI is thinking...";
const STATUS_READY: &str = "✅ Ready";
const STATUS_ERROR: &str = "❌ Error";
const STATUS_CONNECTION_ERROR: &str = "❌ Connection error";
const STATUS_CANCELLED: &str = "❌ Request cancelled";

pub const UNKNOWN_ERROR: &str = "unknown error";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuickAction {
    pub label: &'static str,
    pub prompt: &'static str,
}

pub const QUICK_ACTIONS: &[QuickAction] = &[
    QuickAction { label: "💰 BTC price", prompt: "What is the current price of BTC?" },
    QuickAction { label: "📰 BTC sentiment", prompt: "Analyze the news sentiment for BTC" },
    QuickAction { label: "📈 ETH prediction", prompt: "Give me a technical price prediction for ETH" },
    QuickAction { label: "🧭 BTC recommendation", prompt: "Should I buy or sell BTC right now?" },
    QuickAction { label: "🧪 Backtest", prompt: "Run a backtest of the technical strategy on BTC/USDT" },
    QuickAction { label: "📊 BTC chart", prompt: "Show me the BTC price chart for the last 30 days" },
];

/// Drives the chat page: one request per submitted message.
pub struct ChatController<A> {
    api: A,
    page: ChatPage,
    transcript: Vec<ChatExchange>,
    chart: ChartHandle,
}

impl<A: AssistantApi> ChatController<A> {
    pub fn new(api: A) -> Self {
        Self {
            api,
            page: ChatPage::new(),
            transcript: Vec::new(),
            chart: ChartHandle::new(CHART_CANVAS),
        }
    }

    /// Shows the greeting and marks the page ready.
    pub fn init(&mut self) {
        self.show_greeting();
        self.page.set_status(STATUS_READY, StatusTone::Ready);
    }

    pub fn page(&self) -> &ChatPage {
        &self.page
    }

    pub fn transcript(&self) -> &[ChatExchange] {
        &self.transcript
    }

    pub fn set_input(&mut self, text: impl Into<String>) {
        self.page.input = text.into();
    }

    /// Enter submits, Shift+Enter does not. Returns whether a send happened.
    pub async fn key_press(&mut self, key: &str, shift: bool) -> bool {
        if key == "Enter" && !shift {
            self.send_message().await;
            true
        } else {
            false
        }
    }

    pub async fn quick_action(&mut self, prompt: &str) {
        self.set_input(prompt);
        self.send_message().await;
    }

    /// Sends the trimmed input. Controls stay disabled only while the request
    /// is in flight, whatever its outcome, including a dropped future.
    pub async fn send_message(&mut self) {
        let message = self.page.input.trim().to_string();
        if message.is_empty() {
            return;
        }

        self.page.input.clear();
        self.page
            .push_entry(EntryKind::User, message.clone(), chat::user_message(&message));
        self.transcript.push(ChatExchange::user(message.clone()));

        let mut in_flight = InFlight::begin(self);

        debug!("Sending chat message ({} chars)", message.len());
        let outcome = in_flight.api.chat(&message).await;
        in_flight.settle();

        match outcome {
            Ok(resp) if resp.success => {
                in_flight.add_bot_response(resp);
                in_flight.page.set_status(STATUS_READY, StatusTone::Ready);
            }
            Ok(resp) => {
                let reason = resp.error.unwrap_or_else(|| UNKNOWN_ERROR.to_string());
                warn!("Chat request rejected: {}", reason);
                in_flight.add_bot_message(&rejected_message(&reason));
                in_flight.page.set_status(STATUS_ERROR, StatusTone::Error);
            }
            Err(e) if e.is_transport() => {
                error!("Chat request failed: {}", e);
                in_flight.add_bot_message(&format!(
                    "❌ Could not reach the server, please check your connection. Details: {}",
                    e
                ));
                in_flight
                    .page
                    .set_status(STATUS_CONNECTION_ERROR, StatusTone::Error);
            }
            Err(e) => {
                warn!("Chat request rejected: {}", e);
                in_flight.add_bot_message(&rejected_message(&e.to_string()));
                in_flight.page.set_status(STATUS_ERROR, StatusTone::Error);
            }
        }
    }

    fn add_bot_message(&mut self, text: &str) {
        self.page
            .push_entry(EntryKind::Bot, text, chat::bot_message(text));
    }

    fn add_bot_response(&mut self, resp: ChatResponse) {
        let tool = match (resp.tool_used.as_deref(), resp.tool_result.as_ref()) {
            (Some(name), Some(raw)) => Some((name.to_string(), classify(name, raw))),
            _ => None,
        };

        if let Some((name, ToolResult::Chart(payload))) = &tool {
            info!("Tool {} returned a chart", name);
            self.display_chart(payload);
        }

        let message = resp.message_text();
        let html = chat::bot_response(
            message,
            resp.thinking.as_deref(),
            tool.as_ref().map(|(name, result)| (name.as_str(), result)),
        );
        let text = match &tool {
            Some((name, result)) => format!("{} [{}: {}]", message, name, result.kind()),
            None => message.to_string(),
        };
        self.page.push_entry(EntryKind::Bot, text, html);

        self.transcript.push(ChatExchange::assistant(
            message,
            resp.thinking.clone(),
            tool,
        ));
    }

    /// Pre-rendered candlestick markup wins; otherwise a line figure from the
    /// series; otherwise whatever markup came along.
    fn display_chart(&mut self, payload: &ChartPayload) {
        self.page.chart_visible = true;
        self.page.chart_markup = None;
        self.chart.dispose(&mut self.page.charts);

        let data = &payload.chart_data;
        if data.is_candlestick() && payload.chart_html.is_some() {
            self.page.chart_markup = payload.chart_html.clone();
        } else if let Some(figure) = charts::price_line_figure(data) {
            self.chart.replace(&mut self.page.charts, figure);
        } else if payload.chart_html.is_some() {
            self.page.chart_markup = payload.chart_html.clone();
        } else {
            warn!("Chart payload without series or markup");
        }

        self.page.chart_scrolled_into_view = true;
    }

    /// Clears the conversation on both sides. The local transcript is only
    /// dropped once the backend has confirmed the reset.
    pub async fn reset<D: Dialogs>(&mut self, dialogs: &mut D) {
        if !dialogs.confirm(RESET_PROMPT) {
            return;
        }

        match self.api.reset().await {
            Ok(()) => {
                info!("Conversation reset");
                self.transcript.clear();
                self.show_greeting();
                self.page.set_status(STATUS_READY, StatusTone::Ready);
            }
            Err(e) => {
                error!("Reset failed: {}", e);
                dialogs.alert(RESET_FAILED_ALERT);
            }
        }
    }

    fn show_greeting(&mut self) {
        self.page.clear_entries();
        self.add_bot_message(chat::GREETING);
    }

    pub fn teardown(&mut self) {
        self.chart.dispose(&mut self.page.charts);
        self.page.chart_visible = false;
        self.page.chart_markup = None;
    }
}

fn rejected_message(reason: &str) -> String {
    format!(
        "❌ Sorry, an error occurred while processing your request: {}",
        reason
    )
}

/// The chat page while a request is in flight: controls disabled, a loading
/// placeholder shown. Dropping the guard re-enables the controls, so a
/// cancelled request cannot leave the page locked.
struct InFlight<'a, A> {
    controller: &'a mut ChatController<A>,
    loading_id: String,
    settled: bool,
}

impl<'a, A> InFlight<'a, A> {
    fn begin(controller: &'a mut ChatController<A>) -> Self {
        let loading_id = format!("loading-{}", uuid::Uuid::new_v4());
        let page = &mut controller.page;
        page.controls_disabled = true;
        page.push_entry_with_id(
            loading_id.clone(),
            EntryKind::Loading,
            "Analyzing your request...".to_string(),
            chat::loading_message(&loading_id),
        );
        page.set_status(STATUS_THINKING, StatusTone::Busy);

        Self {
            controller,
            loading_id,
            settled: false,
        }
    }

    /// The request produced an outcome; drop the placeholder.
    fn settle(&mut self) {
        self.settled = true;
        self.controller.page.remove_entry(&self.loading_id);
    }
}

impl<A> Deref for InFlight<'_, A> {
    type Target = ChatController<A>;

    fn deref(&self) -> &Self::Target {
        self.controller
    }
}

impl<A> DerefMut for InFlight<'_, A> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.controller
    }
}

impl<A> Drop for InFlight<'_, A> {
    fn drop(&mut self) {
        let page = &mut self.controller.page;
        page.controls_disabled = false;
        if !self.settled {
            warn!("Chat request dropped before a reply arrived");
            page.remove_entry(&self.loading_id);
            page.set_status(STATUS_CANCELLED, StatusTone::Error);
        }
    }
}
