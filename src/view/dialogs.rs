use std::io::{self, BufRead, Write};
use tracing::warn;

/// Blocking user prompts (`confirm` / `alert`).
#[cfg_attr(test, mockall::automock)]
pub trait Dialogs: Send {
    fn confirm(&mut self, message: &str) -> bool;
    fn alert(&mut self, message: &str);
}

/// Prompts on the terminal. `assume_yes` answers every confirmation.
#[derive(Debug, Default)]
pub struct TerminalDialogs {
    pub assume_yes: bool,
}

impl TerminalDialogs {
    pub fn new(assume_yes: bool) -> Self {
        Self { assume_yes }
    }
}

impl Dialogs for TerminalDialogs {
    fn confirm(&mut self, message: &str) -> bool {
        if self.assume_yes {
            return true;
        }

        print!("{} [y/N] ", message);
        if io::stdout().flush().is_err() {
            return false;
        }

        let mut answer = String::new();
        match io::stdin().lock().read_line(&mut answer) {
            Ok(_) => matches!(answer.trim().to_lowercase().as_str(), "y" | "yes"),
            Err(e) => {
                warn!("Failed to read confirmation: {}", e);
                false
            }
        }
    }

    fn alert(&mut self, message: &str) {
        println!("{}", message);
    }
}

/// Answers confirmations with a fixed value and keeps alerts for later
/// display. Used where the prompt already happened elsewhere (a browser form).
#[derive(Debug, Default)]
pub struct RecordedDialogs {
    confirm_answer: bool,
    alerts: Vec<String>,
}

impl RecordedDialogs {
    pub fn answering(confirm_answer: bool) -> Self {
        Self {
            confirm_answer,
            alerts: Vec::new(),
        }
    }

    pub fn into_alerts(self) -> Vec<String> {
        self.alerts
    }
}

impl Dialogs for RecordedDialogs {
    fn confirm(&mut self, _message: &str) -> bool {
        self.confirm_answer
    }

    fn alert(&mut self, message: &str) {
        self.alerts.push(message.to_string());
    }
}
