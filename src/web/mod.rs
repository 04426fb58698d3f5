//! HTTP surface.
//!
//! An axum router over the roster and statistics workflows. Pages are
//! rendered server-side; the acting user comes from a trusted header set by
//! the identity provider in front of this service.

pub mod handlers;
pub mod render;

use std::sync::{Arc, Mutex, MutexGuard};

use axum::http::{HeaderMap, StatusCode};
use axum::response::{Html, IntoResponse, Redirect, Response};
use axum::routing::{get, post};
use axum::Router;
use chrono::Datelike;
use url::form_urlencoded;
use uuid::Uuid;

use crate::messages::FlashMessage;
use crate::roster::{Actor, RosterStore};
use crate::storage::{AppConfig, Database, DatabaseError};

/// Header carrying the authenticated user id.
pub const USER_HEADER: &str = "x-roster-user";

/// Query parameter carrying flash messages across a redirect.
pub const MESSAGE_PARAM: &str = "msg";

/// Shared server state.
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<Mutex<Database>>,
    pub config: Arc<AppConfig>,
    /// Fixed year for the stats form; the local calendar year when unset
    pub current_year: Option<i32>,
}

impl AppState {
    pub fn new(db: Database, config: AppConfig) -> Self {
        Self {
            db: Arc::new(Mutex::new(db)),
            config: Arc::new(config),
            current_year: None,
        }
    }

    pub fn with_current_year(mut self, year: i32) -> Self {
        self.current_year = Some(year);
        self
    }

    pub fn current_year(&self) -> i32 {
        self.current_year
            .unwrap_or_else(|| chrono::Local::now().year())
    }

    /// Lock the database. Never hold the guard across an `.await`.
    pub(crate) fn lock_db(&self) -> Result<MutexGuard<'_, Database>, WebError> {
        self.db
            .lock()
            .map_err(|_| WebError::Internal("database lock poisoned".to_string()))
    }
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/healthz", get(handlers::healthz))
        .route("/athletes", get(handlers::athlete_list))
        .route("/athletes/delete", post(handlers::athletes_delete))
        .route(
            "/athletes/bulk-add",
            get(handlers::bulk_add).post(handlers::bulk_add_submit),
        )
        .route("/athletes/:id", get(handlers::athlete_detail))
        .route(
            "/athletes/:id/stats",
            get(handlers::stats_form).post(handlers::stats_submit),
        )
        .route(
            "/athletes/:id/edit",
            get(handlers::athlete_edit).post(handlers::athlete_edit_submit),
        )
        .route(
            "/athletes/:id/delete",
            get(handlers::athlete_delete_confirm).post(handlers::athlete_delete),
        )
        .route(
            "/games/:game_id/athletes/:athlete_id/report",
            get(handlers::game_report_form).post(handlers::game_report_submit),
        )
        .with_state(state)
}

/// Errors that end a request with an error page.
#[derive(Debug, thiserror::Error)]
pub enum WebError {
    #[error("Authentication required")]
    Unauthenticated,

    #[error("{0} not found")]
    NotFound(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<DatabaseError> for WebError {
    fn from(e: DatabaseError) -> Self {
        WebError::Internal(e.to_string())
    }
}

impl IntoResponse for WebError {
    fn into_response(self) -> Response {
        let (status, title, text) = match &self {
            WebError::Unauthenticated => (
                StatusCode::UNAUTHORIZED,
                "Unauthorized",
                "You must be signed in to view this page.".to_string(),
            ),
            WebError::NotFound(what) => (
                StatusCode::NOT_FOUND,
                "Not Found",
                format!("{} not found.", what),
            ),
            WebError::Internal(detail) => {
                tracing::error!(error = %detail, "Request failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Server Error",
                    "Something went wrong. Please try again.".to_string(),
                )
            }
        };
        (status, Html(render::message_page(title, &text))).into_response()
    }
}

/// Resolve the acting user from the identity header.
pub(crate) fn resolve_actor(db: &Database, headers: &HeaderMap) -> Result<Actor, WebError> {
    let user_id = headers
        .get(USER_HEADER)
        .and_then(|v| v.to_str().ok())
        .and_then(|raw| Uuid::parse_str(raw.trim()).ok())
        .ok_or(WebError::Unauthenticated)?;

    RosterStore::new(db.connection())
        .resolve_actor(user_id)?
        .ok_or(WebError::Unauthenticated)
}

/// 303 redirect carrying flash messages as `msg=<level>:<text>` parameters.
pub(crate) fn redirect_with(path: &str, messages: &[FlashMessage]) -> Response {
    if messages.is_empty() {
        return Redirect::to(path).into_response();
    }
    let mut query = form_urlencoded::Serializer::new(String::new());
    for message in messages {
        query.append_pair(MESSAGE_PARAM, &message.encode());
    }
    Redirect::to(&format!("{}?{}", path, query.finish())).into_response()
}

/// Pull flash messages out of query pairs.
pub(crate) fn take_messages(pairs: &[(String, String)]) -> Vec<FlashMessage> {
    pairs
        .iter()
        .filter(|(k, _)| k == MESSAGE_PARAM)
        .filter_map(|(_, v)| FlashMessage::decode(v))
        .collect()
}

/// Parse a path id; anything but a UUID is treated as a missing record.
pub(crate) fn parse_id(raw: &str, what: &str) -> Result<Uuid, WebError> {
    Uuid::parse_str(raw).map_err(|_| WebError::NotFound(what.to_string()))
}
