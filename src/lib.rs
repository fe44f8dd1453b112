pub mod bracket;
pub mod commands;
pub mod competitor;
pub mod config;
pub mod error;
pub mod ledger;
pub mod pairing;
pub mod progression;
pub mod ranking;
pub mod roster;
pub mod session;
pub mod snapshot;
pub mod types;

use config::*;
use error::{BracketError, CommandError, RosterError};
use roster::{NewCompetitor, Roster};
use session::TournamentSession;
use snapshot::load_snapshot;
use types::*;

use serde::Serialize;
use serde_json::json;
use std::{
    fs,
    sync::{Arc, Mutex},
};
use axum::{
    extract::{Path as AxumPath, State as AxumState},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Json,
    Router,
};
use tokio::net::TcpListener;
use tracing::{info, error, warn};
use tracing_subscriber::EnvFilter;

// ── Error responses ────────────────────────────────────────────────────

impl CommandError {
    pub fn status(&self) -> StatusCode {
        match self {
            CommandError::Bracket(BracketError::ValidationFailed { .. }) => StatusCode::UNPROCESSABLE_ENTITY,
            CommandError::Bracket(BracketError::InvalidReference(_)) => StatusCode::BAD_REQUEST,
            CommandError::Roster(RosterError::UnknownCompetitor(_)) => StatusCode::NOT_FOUND,
            CommandError::Roster(RosterError::Io(_)) => StatusCode::INTERNAL_SERVER_ERROR,
            CommandError::Roster(_) => StatusCode::BAD_REQUEST,
            CommandError::NoTournament => StatusCode::NOT_FOUND,
            CommandError::RosterLocked => StatusCode::CONFLICT,
            CommandError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for CommandError {
    fn into_response(self) -> Response {
        let status = self.status();
        let mut body = json!({ "error": self.to_string() });
        if let CommandError::Bracket(BracketError::ValidationFailed { pending }) = &self {
            body["pending"] = json!(pending);
        }
        if status.is_server_error() {
            error!("request failed: {self}");
        }
        (status, no_store_headers(), body.to_string()).into_response()
    }
}

fn no_store_headers() -> [(&'static str, &'static str); 2] {
    [("Content-Type", "application/json"), ("Cache-Control", "no-store")]
}

fn json_response<T: Serialize>(payload: &T) -> Response {
    let body = serde_json::to_string(payload).unwrap_or_else(|_| "{}".to_string());
    (no_store_headers(), body).into_response()
}

type ApiResult = Result<Response, CommandError>;

// ── Bracket HTTP server ────────────────────────────────────────────────

pub fn bracket_router(state: ServerState) -> Router {
    Router::new()
        .route("/state.json", get(get_state_json))
        .route("/ranking.json", get(get_ranking_json))
        .route("/history.json", get(get_history_json))
        .route("/roster", get(get_roster).post(post_roster))
        .route("/roster/:id", put(put_roster).delete(delete_roster))
        .route("/roster/import", post(post_roster_import))
        .route("/roster/export", post(post_roster_export))
        .route("/tournament/start", post(post_start))
        .route("/tournament/reset", post(post_reset))
        .route("/results", post(post_result))
        .route("/advance", post(post_advance))
        .route("/snapshot", post(post_snapshot))
        .with_state(state)
}

async fn start_server(state: ServerState) {
    let addr = state.config.bind_addr.clone();
    let app = bracket_router(state);
    let listener = match TcpListener::bind(&addr).await {
        Ok(listener) => listener,
        Err(e) => {
            error!("bracket server failed to bind {addr}: {e}");
            return;
        }
    };
    info!("bracket server listening at http://{addr}/");
    if let Err(e) = axum::serve(listener, app).await {
        error!("bracket server error: {e}");
    }
}

async fn get_state_json(AxumState(state): AxumState<ServerState>) -> ApiResult {
    Ok(json_response(&commands::bracket_state(&state)?))
}

async fn get_ranking_json(AxumState(state): AxumState<ServerState>) -> ApiResult {
    Ok(json_response(&commands::ranking(&state)?))
}

async fn get_history_json(AxumState(state): AxumState<ServerState>) -> ApiResult {
    Ok(json_response(&commands::history(&state)?))
}

async fn get_roster(AxumState(state): AxumState<ServerState>) -> ApiResult {
    Ok(json_response(&commands::list_roster(&state)?))
}

async fn post_roster(AxumState(state): AxumState<ServerState>, Json(entry): Json<NewCompetitor>) -> ApiResult {
    let competitor = commands::add_competitor(&state, entry)?;
    Ok((StatusCode::CREATED, json_response(&competitor)).into_response())
}

async fn put_roster(
    AxumState(state): AxumState<ServerState>,
    AxumPath(id): AxumPath<u32>,
    Json(entry): Json<NewCompetitor>,
) -> ApiResult {
    Ok(json_response(&commands::update_competitor(&state, id, entry)?))
}

async fn delete_roster(AxumState(state): AxumState<ServerState>, AxumPath(id): AxumPath<u32>) -> ApiResult {
    Ok(json_response(&commands::remove_competitor(&state, id)?))
}

async fn post_roster_import(
    AxumState(state): AxumState<ServerState>,
    Json(request): Json<RosterImportRequest>,
) -> ApiResult {
    Ok(json_response(&commands::import_roster(&state, request)?))
}

async fn post_roster_export(AxumState(state): AxumState<ServerState>) -> ApiResult {
    let path = commands::export_roster(&state)?;
    Ok(json_response(&json!({ "path": path })))
}

async fn post_start(AxumState(state): AxumState<ServerState>) -> ApiResult {
    Ok(json_response(&commands::start_tournament(&state)?))
}

async fn post_reset(AxumState(state): AxumState<ServerState>) -> ApiResult {
    let reset = commands::reset_tournament(&state)?;
    Ok(json_response(&json!({ "reset": reset })))
}

async fn post_result(
    AxumState(state): AxumState<ServerState>,
    Json(request): Json<MatchResultRequest>,
) -> ApiResult {
    Ok(json_response(&commands::record_result(&state, request)?))
}

async fn post_advance(AxumState(state): AxumState<ServerState>) -> ApiResult {
    Ok(json_response(&commands::advance_round(&state)?))
}

async fn post_snapshot(AxumState(state): AxumState<ServerState>) -> ApiResult {
    let saved_at = commands::write_snapshot(&state)?;
    Ok(json_response(&json!({ "savedAt": saved_at })))
}

// ── Startup ────────────────────────────────────────────────────────────

/// Snapshot first, then the roster file, then an empty session.
fn restore_session(config: &AppConfig) -> TournamentSession {
    match load_snapshot(&snapshot_path(config)) {
        Ok(Some(snapshot)) => return snapshot.session,
        Ok(None) => {}
        Err(e) => warn!("ignoring snapshot: {e}"),
    }

    let mut roster = Roster::new();
    let path = roster_path(config);
    if path.is_file() {
        if let Err(e) = roster.load_csv(&path) {
            warn!("ignoring roster file: {e}");
            roster = Roster::new();
        }
    }
    TournamentSession::new(roster)
}

// ── Entry point ────────────────────────────────────────────────────────

pub fn run() {
    load_env_file();
    let config = load_config_inner().unwrap_or_else(|e| {
        eprintln!("{e}; falling back to defaults");
        apply_env_defaults(AppConfig::default())
    });

    // Initialize tracing with a daily rolling file
    let log_dir = logs_dir(&config);
    fs::create_dir_all(&log_dir).ok();
    let file_appender = tracing_appender::rolling::daily(&log_dir, "bracket.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(non_blocking)
        .with_ansi(false)
        .init();
    info!("Double-chance bracket starting");
    log_env_warnings(&config);

    let session: SharedSession = Arc::new(Mutex::new(restore_session(&config)));
    let state = ServerState {
        session,
        config: Arc::new(config),
    };

    let runtime = match tokio::runtime::Builder::new_multi_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(e) => {
            error!("failed to start async runtime: {e}");
            return;
        }
    };
    runtime.block_on(start_server(state));
}
