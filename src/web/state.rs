use std::sync::Arc;
use tokio::sync::Mutex;

use crate::controller::{BacktestController, ChatController};

/// One page's controller plus the alerts it raised since the last render.
pub struct PageSession<C> {
    pub controller: C,
    alerts: Vec<String>,
}

impl<C> PageSession<C> {
    pub fn new(controller: C) -> Self {
        Self {
            controller,
            alerts: Vec::new(),
        }
    }

    pub fn push_alerts(&mut self, alerts: Vec<String>) {
        self.alerts.extend(alerts);
    }

    /// Alerts are shown once.
    pub fn take_alerts(&mut self) -> Vec<String> {
        std::mem::take(&mut self.alerts)
    }
}

/// Shared state of the preview server. Each page is serialized behind its own
/// lock.
pub struct AppState<A> {
    pub chat: Arc<Mutex<PageSession<ChatController<A>>>>,
    pub backtest: Arc<Mutex<PageSession<BacktestController<A>>>>,
}

impl<A> AppState<A> {
    pub fn new(chat: ChatController<A>, backtest: BacktestController<A>) -> Self {
        Self {
            chat: Arc::new(Mutex::new(PageSession::new(chat))),
            backtest: Arc::new(Mutex::new(PageSession::new(backtest))),
        }
    }
}

impl<A> Clone for AppState<A> {
    fn clone(&self) -> Self {
        Self {
            chat: Arc::clone(&self.chat),
            backtest: Arc::clone(&self.backtest),
        }
    }
}
