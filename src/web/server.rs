use axum::{
    extract::{Form, State},
    http::StatusCode,
    response::{Html, IntoResponse, Redirect, Response},
    routing::{get, post},
    Router,
};
use serde::Deserialize;
use std::net::SocketAddr;
use thiserror::Error;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{error, info};

use super::{render_backtest_page, render_chat_page, AppState};
use crate::api::AssistantApi;
use crate::controller::QUICK_ACTIONS;
use crate::view::{BacktestForm, RecordedDialogs};

#[derive(Debug, Error)]
pub enum PageError {
    #[error("bad_request: {0}")]
    BadRequest(String),

    #[error("render_error: {0}")]
    Render(#[from] askama::Error),
}

impl IntoResponse for PageError {
    fn into_response(self) -> Response {
        let status = match &self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Render(e) => {
                error!("Failed to render page: {}", e);
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        (status, self.to_string()).into_response()
    }
}

#[derive(Debug, Deserialize)]
pub struct MessageForm {
    #[serde(default)]
    pub message: String,
}

#[derive(Debug, Deserialize)]
pub struct QuickForm {
    pub index: usize,
}

#[derive(Debug, Deserialize)]
pub struct ResetForm {
    #[serde(default)]
    pub confirm: Option<String>,
}

impl ResetForm {
    fn confirmed(&self) -> bool {
        matches!(self.confirm.as_deref(), Some("yes" | "on" | "true"))
    }
}

pub fn router<A: AssistantApi + 'static>(state: AppState<A>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", get(chat_page::<A>))
        .route("/chat", post(post_chat::<A>))
        .route("/chat/quick", post(post_quick_action::<A>))
        .route("/reset", post(post_reset::<A>))
        .route("/backtest", get(backtest_page::<A>))
        .route("/backtest/run", post(post_backtest_run::<A>))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

pub async fn start_preview_server<A: AssistantApi + 'static>(
    state: AppState<A>,
    port: u16,
) -> anyhow::Result<()> {
    let app = router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    info!("Preview server starting on http://localhost:{}", port);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

async fn chat_page<A: AssistantApi>(
    State(state): State<AppState<A>>,
) -> Result<Html<String>, PageError> {
    let mut session = state.chat.lock().await;
    let alerts = session.take_alerts();
    Ok(Html(render_chat_page(session.controller.page(), &alerts)?))
}

async fn post_chat<A: AssistantApi>(
    State(state): State<AppState<A>>,
    Form(form): Form<MessageForm>,
) -> Redirect {
    let mut session = state.chat.lock().await;
    session.controller.set_input(form.message);
    session.controller.send_message().await;
    Redirect::to("/")
}

async fn post_quick_action<A: AssistantApi>(
    State(state): State<AppState<A>>,
    Form(form): Form<QuickForm>,
) -> Result<Redirect, PageError> {
    let action = QUICK_ACTIONS
        .get(form.index)
        .ok_or_else(|| PageError::BadRequest(format!("no quick action {}", form.index)))?;

    let mut session = state.chat.lock().await;
    session.controller.quick_action(action.prompt).await;
    Ok(Redirect::to("/"))
}

async fn post_reset<A: AssistantApi>(
    State(state): State<AppState<A>>,
    Form(form): Form<ResetForm>,
) -> Redirect {
    let mut dialogs = RecordedDialogs::answering(form.confirmed());
    let mut session = state.chat.lock().await;
    session.controller.reset(&mut dialogs).await;
    session.push_alerts(dialogs.into_alerts());
    Redirect::to("/")
}

async fn backtest_page<A: AssistantApi>(
    State(state): State<AppState<A>>,
) -> Result<Html<String>, PageError> {
    let mut session = state.backtest.lock().await;
    let alerts = session.take_alerts();
    let controller = &session.controller;
    Ok(Html(render_backtest_page(
        controller.page(),
        controller.is_running(),
        &alerts,
    )?))
}

async fn post_backtest_run<A: AssistantApi>(
    State(state): State<AppState<A>>,
    Form(form): Form<BacktestForm>,
) -> Redirect {
    let mut dialogs = RecordedDialogs::answering(true);
    let mut session = state.backtest.lock().await;
    *session.controller.form_mut() = form;
    session.controller.run(&mut dialogs).await;
    session.push_alerts(dialogs.into_alerts());
    Redirect::to("/backtest")
}
