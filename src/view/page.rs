use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::ChartRegistry;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum EntryKind {
    User,
    Bot,
    Loading,
}

/// One element of the chat transcript view.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TranscriptEntry {
    pub id: String,
    pub kind: EntryKind,
    /// Plain text for terminal output.
    pub text: String,
    pub html: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum StatusTone {
    Ready,
    Busy,
    Error,
}

impl StatusTone {
    pub fn css_class(&self) -> &'static str {
        match self {
            StatusTone::Ready => "positive",
            StatusTone::Busy => "",
            StatusTone::Error => "negative",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatusLine {
    pub text: String,
    pub tone: StatusTone,
}

impl Default for StatusLine {
    fn default() -> Self {
        Self {
            text: String::new(),
            tone: StatusTone::Ready,
        }
    }
}

/// Element state of the chat page.
#[derive(Debug, Default)]
pub struct ChatPage {
    pub input: String,
    pub status: StatusLine,
    pub controls_disabled: bool,
    entries: Vec<TranscriptEntry>,
    /// Entry the transcript is scrolled to.
    scrolled_to: Option<String>,
    pub chart_visible: bool,
    /// Pre-rendered chart markup injected into the display area.
    pub chart_markup: Option<String>,
    pub chart_scrolled_into_view: bool,
    pub charts: ChartRegistry,
}

impl ChatPage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> &[TranscriptEntry] {
        &self.entries
    }

    pub fn scrolled_to(&self) -> Option<&str> {
        self.scrolled_to.as_deref()
    }

    /// Appends an entry and scrolls the transcript to it.
    pub fn push_entry(&mut self, kind: EntryKind, text: impl Into<String>, html: String) -> String {
        let id = format!("msg-{}", Uuid::new_v4());
        self.push_entry_with_id(id.clone(), kind, text.into(), html);
        id
    }

    pub fn push_entry_with_id(&mut self, id: String, kind: EntryKind, text: String, html: String) {
        self.entries.push(TranscriptEntry {
            id: id.clone(),
            kind,
            text,
            html,
        });
        self.scrolled_to = Some(id);
    }

    pub fn remove_entry(&mut self, id: &str) -> bool {
        let before = self.entries.len();
        self.entries.retain(|e| e.id != id);
        if self.scrolled_to.as_deref() == Some(id) {
            self.scrolled_to = self.entries.last().map(|e| e.id.clone());
        }
        before != self.entries.len()
    }

    pub fn clear_entries(&mut self) {
        self.entries.clear();
        self.scrolled_to = None;
    }

    pub fn set_status(&mut self, text: impl Into<String>, tone: StatusTone) {
        self.status = StatusLine {
            text: text.into(),
            tone,
        };
    }

    pub fn transcript_html(&self) -> String {
        self.entries.iter().map(|e| e.html.as_str()).collect()
    }
}

/// Raw values of the backtest form, as typed.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BacktestForm {
    pub symbol: String,
    pub timeframe: String,
    pub strategy: String,
    pub initial_capital: String,
    pub start_date: String,
    pub end_date: String,
}

/// Element state of the backtest page.
#[derive(Debug, Default)]
pub struct BacktestPage {
    pub form: BacktestForm,
    pub loading_visible: bool,
    pub results_html: String,
    pub charts_visible: bool,
    pub charts: ChartRegistry,
}

impl BacktestPage {
    pub fn new() -> Self {
        Self::default()
    }
}
