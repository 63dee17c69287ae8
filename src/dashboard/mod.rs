//! Web dashboard.
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET`  | `/` | Single-page dashboard (Ask / Search / Analytics) |
//! | `GET`  | `/health` | Health check |
//! | `POST` | `/api/ask` | Answer a question |
//! | `GET`  | `/api/search?q=&limit=` | Raw wiki search |
//! | `GET`  | `/api/recent` | Recent activity summary |
//! | `GET`  | `/api/stats` | Recent pages per space |
//! | `POST` | `/api/refresh` | Rebuild the wiki and assistant clients |
//! | `GET`  | `/api/settings` | Effective settings, secrets masked |
//!
//! Errors use the body `{ "error": { "code": "...", "message": "..." } }`.


use std::collections::HashMap;
use std::sync::Arc;

use anyhow::Context as _;
use axum::{
    Json, Router,
    extract::{Query, State},
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::{info, warn};

use crate::assistant::{
    AnswerResult, Assistant, DEFAULT_RECENT_LIMIT, DEFAULT_RECENT_PREVIEW, RecentSummary,
    build_assistant,
};
use crate::config::{AnswerMode, Config, mask_secret};
use crate::config::settings::{CONFLUENCE_API_TOKEN, OPENAI_API_KEY};
use crate::confluence::{ConfluenceClient, RawSearchResult, WikiSource};

/// Pages sampled for the analytics view
pub const STATS_SAMPLE: usize = 50;

const INDEX_HTML: &str = include_str!("index.html");

/// The wiki and assistant shared by every request until the next refresh.
#[derive(Clone)]
pub struct Session {
    wiki: Arc<dyn WikiSource>,
    assistant: Arc<dyn Assistant>,
}

impl Session {
    #[inline]
    pub fn new(wiki: Arc<dyn WikiSource>, assistant: Arc<dyn Assistant>) -> Self {
        Self { wiki, assistant }
    }

    /// Build clients from `config` and check the wiki connection.
    ///
    /// Blocks on the network; call from a blocking context.
    #[inline]
    pub fn connect(config: &Config, mode: AnswerMode) -> anyhow::Result<(Self, bool)> {
        let client = Arc::new(
            ConfluenceClient::new(&config.confluence).context("Failed to create wiki client")?,
        );
        let connected = client.ping();
        let assistant = build_assistant(Arc::clone(&client), config, mode)?;
        Ok((Self::new(client, assistant), connected))
    }
}

#[derive(Clone)]
pub struct AppState {
    config: Arc<Config>,
    mode: AnswerMode,
    session: Arc<RwLock<Session>>,
}

impl AppState {
    #[inline]
    pub fn new(config: Config, mode: AnswerMode, session: Session) -> Self {
        Self {
            config: Arc::new(config),
            mode,
            session: Arc::new(RwLock::new(session)),
        }
    }
}

#[inline]
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(handle_index))
        .route("/health", get(handle_health))
        .route("/api/ask", post(handle_ask))
        .route("/api/search", get(handle_search))
        .route("/api/recent", get(handle_recent))
        .route("/api/stats", get(handle_stats))
        .route("/api/refresh", post(handle_refresh))
        .route("/api/settings", get(handle_settings))
        .with_state(state)
}

/// Connect to the wiki and serve the dashboard until the process exits.
#[inline]
pub async fn serve(config: Config, mode: AnswerMode, bind: Option<String>) -> anyhow::Result<()> {
    let bind_addr = bind.unwrap_or_else(|| config.dashboard_bind.clone());

    let session_config = config.clone();
    let (session, connected) =
        tokio::task::spawn_blocking(move || Session::connect(&session_config, mode))
            .await
            .context("Connection task failed")??;
    if !connected {
        warn!("Confluence is not reachable; use Refresh once credentials are fixed");
    }

    let app = router(AppState::new(config, mode, session));

    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("Failed to bind {}", bind_addr))?;
    info!("Dashboard listening on http://{}", bind_addr);
    println!("Dashboard listening on http://{}", bind_addr);

    axum::serve(listener, app).await?;
    Ok(())
}

// ============ Errors ============

#[derive(Serialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Serialize)]
struct ErrorDetail {
    code: String,
    message: String,
}

struct AppError {
    status: StatusCode,
    code: &'static str,
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: ErrorDetail {
                code: self.code.to_string(),
                message: self.message,
            },
        };
        (self.status, Json(body)).into_response()
    }
}

fn bad_request(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::BAD_REQUEST,
        code: "bad_request",
        message: message.into(),
    }
}

fn internal(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::INTERNAL_SERVER_ERROR,
        code: "internal",
        message: message.into(),
    }
}

/// Run blocking wiki/model work off the async workers
async fn blocking<T, F>(work: F) -> Result<T, AppError>
where
    T: Send + 'static,
    F: FnOnce() -> T + Send + 'static,
{
    tokio::task::spawn_blocking(work)
        .await
        .map_err(|e| internal(format!("Background task failed: {}", e)))
}

// ============ Handlers ============

async fn handle_index() -> Html<&'static str> {
    Html(INDEX_HTML)
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

async fn handle_health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

#[derive(Debug, Deserialize)]
struct AskRequest {
    question: String,
    #[serde(default)]
    max_context_tokens: Option<usize>,
}

async fn handle_ask(
    State(state): State<AppState>,
    Json(request): Json<AskRequest>,
) -> Result<Json<AnswerResult>, AppError> {
    let question = request.question.trim().to_string();
    if question.is_empty() {
        return Err(bad_request("question must not be empty"));
    }

    let budget = request
        .max_context_tokens
        .unwrap_or(state.config.retrieval.max_context_tokens);
    let assistant = Arc::clone(&state.session.read().await.assistant);

    let result = blocking(move || assistant.answer(&question, budget)).await?;
    Ok(Json(result))
}

#[derive(Debug, Deserialize)]
struct SearchParams {
    #[serde(default)]
    q: String,
    #[serde(default)]
    limit: Option<usize>,
}

/// One raw search hit as the dashboard lists it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchHit {
    pub id: String,
    pub title: String,
    pub space: String,
    #[serde(rename = "type")]
    pub content_type: String,
    pub last_modified: String,
    pub url: String,
}

impl From<&RawSearchResult> for SearchHit {
    #[inline]
    fn from(raw: &RawSearchResult) -> Self {
        Self {
            id: raw.id.clone(),
            title: raw.title().to_string(),
            space: raw.space_name().to_string(),
            content_type: raw.content_type().to_string(),
            last_modified: raw.last_modified().to_string(),
            url: raw.web_url(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SearchResponse {
    pub query: String,
    pub results: Vec<SearchHit>,
}

async fn handle_search(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> Result<Json<SearchResponse>, AppError> {
    let query = params.q.trim().to_string();
    if query.is_empty() {
        return Err(bad_request("query must not be empty"));
    }
    let limit = params
        .limit
        .filter(|limit| *limit > 0)
        .unwrap_or(state.config.retrieval.max_search_results);
    let wiki = Arc::clone(&state.session.read().await.wiki);

    let response = blocking(move || {
        let results = wiki.search(&query, limit);
        SearchResponse {
            results: results.iter().map(SearchHit::from).collect(),
            query,
        }
    })
    .await?;
    Ok(Json(response))
}

async fn handle_recent(State(state): State<AppState>) -> Result<Json<RecentSummary>, AppError> {
    let assistant = Arc::clone(&state.session.read().await.assistant);
    let summary =
        blocking(move || assistant.summarize_recent(DEFAULT_RECENT_LIMIT, DEFAULT_RECENT_PREVIEW))
            .await?;
    Ok(Json(summary))
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpaceCount {
    pub space: String,
    pub pages: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpaceStats {
    pub total_pages: usize,
    pub total_spaces: usize,
    pub spaces: Vec<SpaceCount>,
}

/// Count pages per space name, busiest space first, ties by name
#[inline]
pub fn aggregate_by_space(pages: &[RawSearchResult]) -> SpaceStats {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for page in pages {
        let space = match page.space_name() {
            "" => "Unknown",
            name => name,
        };
        *counts.entry(space).or_default() += 1;
    }

    let mut spaces: Vec<SpaceCount> = counts
        .into_iter()
        .map(|(space, pages)| SpaceCount {
            space: space.to_string(),
            pages,
        })
        .collect();
    spaces.sort_by(|a, b| b.pages.cmp(&a.pages).then_with(|| a.space.cmp(&b.space)));

    SpaceStats {
        total_pages: pages.len(),
        total_spaces: spaces.len(),
        spaces,
    }
}

async fn handle_stats(State(state): State<AppState>) -> Result<Json<SpaceStats>, AppError> {
    let wiki = Arc::clone(&state.session.read().await.wiki);
    let stats = blocking(move || aggregate_by_space(&wiki.list_recent(STATS_SAMPLE))).await?;
    Ok(Json(stats))
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RefreshResponse {
    pub connected: bool,
}

async fn handle_refresh(State(state): State<AppState>) -> Result<Json<RefreshResponse>, AppError> {
    let config = Arc::clone(&state.config);
    let mode = state.mode;

    let (session, connected) = blocking(move || Session::connect(&config, mode))
        .await?
        .map_err(|e| internal(format!("{:#}", e)))?;

    *state.session.write().await = session;
    info!("Dashboard session refreshed (connected: {})", connected);
    Ok(Json(RefreshResponse { connected }))
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettingEntry {
    pub key: String,
    pub value: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SettingsResponse {
    pub mode: String,
    pub settings: Vec<SettingEntry>,
}

/// Effective settings with credentials masked
#[inline]
pub fn masked_settings(config: &Config) -> Vec<SettingEntry> {
    config
        .env_entries()
        .into_iter()
        .map(|(key, value)| {
            let value = if key == CONFLUENCE_API_TOKEN || key == OPENAI_API_KEY {
                mask_secret(&value)
            } else {
                value
            };
            SettingEntry {
                key: key.to_string(),
                value,
            }
        })
        .collect()
}

async fn handle_settings(State(state): State<AppState>) -> Json<SettingsResponse> {
    let mode = match state.mode {
        AnswerMode::Model => "model",
        AnswerMode::Offline => "offline",
    };
    Json(SettingsResponse {
        mode: mode.to_string(),
        settings: masked_settings(&state.config),
    })
}
