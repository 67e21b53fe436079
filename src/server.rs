//! HTTP surface: routes each interactive control to a dashboard event

use crate::dashboard::{Dashboard, Event, RenderInstruction};
use crate::session::{Page, SessionContext, SessionStore, Theme};
use crate::types::patient::PatientForm;
use crate::views::{error_page, render_page};
use anyhow::Context;
use axum::extract::{Form, Query, State};
use axum::http::{header, HeaderMap, HeaderValue, StatusCode};
use axum::response::{Html, IntoResponse, Redirect, Response};
use axum::routing::{get, post};
use axum::Router;
use serde::Deserialize;
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::error;
use uuid::Uuid;

/// Name of the cookie carrying the session id
pub const SESSION_COOKIE: &str = "session_id";

/// State shared by all handlers
#[derive(Clone)]
pub struct AppState {
    pub dashboard: Arc<Dashboard>,
    pub sessions: Arc<SessionStore>,
}

impl AppState {
    pub fn new(dashboard: Arc<Dashboard>, sessions: Arc<SessionStore>) -> Self {
        Self {
            dashboard,
            sessions,
        }
    }

    /// Run `f` against the caller's session on the blocking pool.
    ///
    /// Inference and rendering happen inside `f`; only the caller's session
    /// is locked meanwhile.
    async fn on_session<T, F>(&self, headers: &HeaderMap, f: F) -> Result<(Uuid, T), AppError>
    where
        T: Send + 'static,
        F: FnOnce(&Dashboard, &mut SessionContext) -> anyhow::Result<T> + Send + 'static,
    {
        let dashboard = self.dashboard.clone();
        let sessions = self.sessions.clone();
        let id = session_id(headers);

        let (id, result) = tokio::task::spawn_blocking(move || {
            sessions.with_session(id, |session| f(dashboard.as_ref(), session))
        })
        .await
        .context("Session task failed")?;
        Ok((id, result?))
    }

    /// Run one event against the caller's session and render the result
    async fn dispatch(&self, headers: &HeaderMap, event: Event) -> Result<Response, AppError> {
        let (id, response) = self
            .on_session(headers, move |dashboard, session| {
                let instruction = dashboard.handle(session, event)?;
                Ok(respond(dashboard, session, instruction))
            })
            .await?;
        with_session_cookie(response, id)
    }
}

fn respond(dashboard: &Dashboard, session: &SessionContext, instruction: RenderInstruction) -> Response {
    match instruction {
        RenderInstruction::Download(download) => (
            [
                (header::CONTENT_TYPE, download.content_type.to_string()),
                (
                    header::CONTENT_DISPOSITION,
                    format!("attachment; filename=\"{}\"", download.file_name),
                ),
            ],
            download.body,
        )
            .into_response(),
        RenderInstruction::NothingToExport => (
            StatusCode::NOT_FOUND,
            Html(render_page(dashboard, session, &instruction)),
        )
            .into_response(),
        _ => Html(render_page(dashboard, session, &instruction)).into_response(),
    }
}

/// Build the dashboard router
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/about", get(about))
        .route("/predict", post(predict))
        .route("/theme", post(theme))
        .route("/history.csv", get(export_history))
        .route("/session/end", post(end_session))
        .route("/health", get(health))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[derive(Debug, Deserialize)]
struct IndexQuery {
    feature: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ThemeForm {
    theme: Theme,
}

async fn index(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<IndexQuery>,
) -> Result<Response, AppError> {
    let event = match query.feature {
        Some(feature) => Event::SelectFeature(feature),
        None => Event::Navigate(Page::Prediction),
    };
    state.dispatch(&headers, event).await
}

async fn about(State(state): State<AppState>, headers: HeaderMap) -> Result<Response, AppError> {
    state.dispatch(&headers, Event::Navigate(Page::About)).await
}

async fn predict(
    State(state): State<AppState>,
    headers: HeaderMap,
    Form(form): Form<PatientForm>,
) -> Result<Response, AppError> {
    state
        .dispatch(&headers, Event::Predict(form.into_record()))
        .await
}

async fn theme(
    State(state): State<AppState>,
    headers: HeaderMap,
    Form(form): Form<ThemeForm>,
) -> Result<Response, AppError> {
    let (id, instruction) = state
        .on_session(&headers, move |dashboard, session| {
            dashboard.handle(session, Event::SetTheme(form.theme))
        })
        .await?;
    let target = match instruction {
        RenderInstruction::AboutPage => "/about",
        _ => "/",
    };
    with_session_cookie(Redirect::to(target).into_response(), id)
}

async fn export_history(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Response, AppError> {
    state.dispatch(&headers, Event::ExportHistory).await
}

async fn end_session(State(state): State<AppState>, headers: HeaderMap) -> Response {
    if let Some(id) = session_id(&headers) {
        state.sessions.end(id);
    }
    let mut response = Redirect::to("/").into_response();
    response.headers_mut().insert(
        header::SET_COOKIE,
        HeaderValue::from_static("session_id=; Path=/; Max-Age=0; HttpOnly; SameSite=Lax"),
    );
    response
}

async fn health() -> &'static str {
    "ok"
}

/// Session id from the request cookies, if present and well-formed
fn session_id(headers: &HeaderMap) -> Option<Uuid> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == SESSION_COOKIE)
        .and_then(|(_, value)| Uuid::parse_str(value.trim()).ok())
}

fn with_session_cookie(mut response: Response, id: Uuid) -> Result<Response, AppError> {
    let cookie = format!("{}={}; Path=/; HttpOnly; SameSite=Lax", SESSION_COOKIE, id);
    response
        .headers_mut()
        .insert(header::SET_COOKIE, HeaderValue::from_str(&cookie)?);
    Ok(response)
}

/// Error surfaced to the browser as an HTTP 500 page
pub struct AppError(anyhow::Error);

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        error!(error = %format!("{:#}", self.0), "Request failed");
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Html(error_page(&format!("{:#}", self.0))),
        )
            .into_response()
    }
}

impl<E> From<E> for AppError
where
    E: Into<anyhow::Error>,
{
    fn from(err: E) -> Self {
        Self(err.into())
    }
}
