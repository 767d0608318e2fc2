// REST API and web page over the record store.
//
// Handlers read a snapshot of the store per request and run the in-memory
// search helpers over it. The only writes are the draft toggle and the ESPN
// import.

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::{Method, StatusCode};
use axum::response::{Html, IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use serde_json::json;
use thiserror::Error;
use tower_http::cors::{Any, CorsLayer};
use tracing::{info, warn};

use gridiron_app::jobs::{self, JobError};
use gridiron_app::sources::stats::{default_seasons, StatsService};
use gridiron_app::AppContext;
use gridiron_core::model::{key_name, PlayerRecord, Position};
use gridiron_football::normalize::normalize_position;
use gridiron_football::search::{
    handcuffs, paginate, search, similar_players, sleeper_picks, summary, team_needs,
    top_by_position, value_picks, Pagination, ScoredPlayer, SearchParams, SortField,
};
use gridiron_football::stats::CareerStats;

const INDEX_HTML: &str = include_str!("../static/index.html");
const DEFAULT_TOP_LIMIT: usize = 10;

// ---------------------------------------------------------------------------
// State
// ---------------------------------------------------------------------------

pub struct AppState {
    pub ctx: AppContext,
    /// Career stats lookups; `None` when the stats client could not be built.
    pub stats: Option<StatsService>,
}

impl AppState {
    pub fn new(ctx: AppContext) -> Self {
        let stats = match ctx.stats_service() {
            Ok(service) => Some(service),
            Err(e) => {
                warn!("Career stats disabled: {e}");
                None
            }
        };
        Self { ctx, stats }
    }

    fn players(&self) -> Result<Vec<PlayerRecord>, ApiError> {
        Ok(self.ctx.store.find_all()?)
    }
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    Internal(String),
}

impl From<anyhow::Error> for ApiError {
    fn from(e: anyhow::Error) -> Self {
        Self::Internal(format!("{e:#}"))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        if status.is_server_error() {
            warn!("API error: {self}");
        }
        (status, Json(json!({ "success": false, "error": self.to_string() }))).into_response()
    }
}

type ApiResult<T> = Result<Json<T>, ApiError>;

// ---------------------------------------------------------------------------
// Router
// ---------------------------------------------------------------------------

pub fn router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers(Any);

    Router::new()
        .route("/", get(index))
        .route("/api/players", get(list_players))
        .route("/api/player/:name", get(player_detail))
        .route("/api/draft", post(toggle_draft))
        .route("/api/summary", get(get_summary))
        .route("/api/sleepers", get(get_sleepers))
        .route("/api/value-picks", get(get_value_picks))
        .route("/api/handcuffs/:name", get(get_handcuffs))
        .route("/api/top/:position", get(get_top))
        .route("/api/team-needs", post(post_team_needs))
        .route("/api/populate-espn", post(populate_espn))
        .with_state(state)
        .layer(cors)
}

async fn index() -> Html<&'static str> {
    Html(INDEX_HTML)
}

// ---------------------------------------------------------------------------
// Player list and detail
// ---------------------------------------------------------------------------

#[derive(Debug, Default, Deserialize)]
pub struct PlayersQuery {
    #[serde(default)]
    pub query: String,
    pub position: Option<String>,
    pub team: Option<String>,
    pub drafted: Option<bool>,
    pub available_only: Option<bool>,
    pub sort_by: Option<String>,
    pub sort_desc: Option<bool>,
    pub page: Option<usize>,
    pub per_page: Option<usize>,
}

impl PlayersQuery {
    fn search_params(&self) -> Result<SearchParams, ApiError> {
        let position = match self.position.as_deref().filter(|p| !p.is_empty()) {
            Some(raw) => Some(parse_position(raw)?),
            None => None,
        };
        Ok(SearchParams {
            query: self.query.clone(),
            position,
            team: self.team.clone().filter(|t| !t.is_empty()),
            drafted: self.drafted,
            // An explicit drafted filter overrides the availability default.
            available_only: self.available_only.unwrap_or(self.drafted.is_none()),
            sort_by: self.sort_by.as_deref().map(SortField::parse).unwrap_or_default(),
            sort_desc: self.sort_desc.unwrap_or(true),
            max_results: None,
        })
    }
}

#[derive(Debug, Serialize)]
pub struct PlayersPage {
    pub players: Vec<ScoredPlayer>,
    pub pagination: Pagination,
}

fn parse_position(raw: &str) -> Result<Position, ApiError> {
    Position::from_str_pos(&normalize_position(raw))
        .ok_or_else(|| ApiError::BadRequest(format!("unknown position: {raw}")))
}

async fn list_players(
    State(state): State<Arc<AppState>>,
    Query(q): Query<PlayersQuery>,
) -> ApiResult<PlayersPage> {
    let params = q.search_params()?;
    let players = state.players()?;
    let results = search(&players, &params);
    let per_page = q.per_page.unwrap_or(state.ctx.config.server.per_page);
    let (players, pagination) = paginate(&results, q.page.unwrap_or(1), per_page);
    Ok(Json(PlayersPage { players, pagination }))
}

/// Exact name first, then the same name ignoring case and punctuation.
fn find_by_name<'a>(players: &'a [PlayerRecord], name: &str) -> Option<&'a PlayerRecord> {
    let wanted = key_name(name);
    players
        .iter()
        .find(|p| p.name == name)
        .or_else(|| players.iter().find(|p| key_name(&p.name) == wanted))
}

#[derive(Debug, Serialize)]
pub struct PlayerDetail {
    pub player: PlayerRecord,
    pub career_stats: CareerStats,
    pub similar_players: Vec<PlayerRecord>,
}

async fn player_detail(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
) -> ApiResult<PlayerDetail> {
    let players = state.players()?;
    let player = find_by_name(&players, &name)
        .cloned()
        .ok_or_else(|| ApiError::NotFound(format!("player not found: {name}")))?;

    let career_stats = match &state.stats {
        Some(stats) => stats.career_stats(&player.name, player.position, &default_seasons()).await,
        None => CareerStats::empty(&player.name, player.position),
    };
    let similar_players = similar_players(&players, &player.name);
    Ok(Json(PlayerDetail {
        player,
        career_stats,
        similar_players,
    }))
}

// ---------------------------------------------------------------------------
// Draft toggle
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct DraftRequest {
    pub name: String,
    #[serde(default = "default_true")]
    pub drafted: bool,
}

fn default_true() -> bool {
    true
}

async fn toggle_draft(
    State(state): State<Arc<AppState>>,
    Json(req): Json<DraftRequest>,
) -> ApiResult<serde_json::Value> {
    if req.name.trim().is_empty() {
        return Err(ApiError::BadRequest("player name is required".into()));
    }
    if !state.ctx.store.set_drafted(&req.name, req.drafted)? {
        return Err(ApiError::NotFound(format!("player not found: {}", req.name)));
    }
    info!("{} marked {}", req.name, if req.drafted { "drafted" } else { "available" });
    Ok(Json(json!({ "success": true })))
}

// ---------------------------------------------------------------------------
// Draft helpers
// ---------------------------------------------------------------------------

async fn get_summary(State(state): State<Arc<AppState>>) -> ApiResult<serde_json::Value> {
    let players = state.players()?;
    Ok(Json(json!(summary(&players))))
}

async fn get_sleepers(State(state): State<Arc<AppState>>) -> ApiResult<Vec<ScoredPlayer>> {
    Ok(Json(sleeper_picks(&state.players()?)))
}

async fn get_value_picks(State(state): State<Arc<AppState>>) -> ApiResult<Vec<ScoredPlayer>> {
    Ok(Json(value_picks(&state.players()?)))
}

async fn get_handcuffs(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
) -> ApiResult<Vec<PlayerRecord>> {
    Ok(Json(handcuffs(&state.players()?, &name)))
}

#[derive(Debug, Deserialize)]
pub struct TopQuery {
    pub limit: Option<usize>,
}

async fn get_top(
    State(state): State<Arc<AppState>>,
    Path(position): Path<String>,
    Query(q): Query<TopQuery>,
) -> ApiResult<Vec<ScoredPlayer>> {
    let position = parse_position(&position)?;
    let limit = q.limit.unwrap_or(DEFAULT_TOP_LIMIT);
    Ok(Json(top_by_position(&state.players()?, position, limit)))
}

#[derive(Debug, Deserialize)]
pub struct TeamNeedsRequest {
    #[serde(default)]
    pub drafted_players: Vec<String>,
}

async fn post_team_needs(
    State(state): State<Arc<AppState>>,
    Json(req): Json<TeamNeedsRequest>,
) -> ApiResult<serde_json::Value> {
    let players = state.players()?;
    Ok(Json(json!(team_needs(&players, &req.drafted_players))))
}

// ---------------------------------------------------------------------------
// ESPN import
// ---------------------------------------------------------------------------

#[derive(Debug, Default, Deserialize)]
pub struct PopulateEspnRequest {
    pub league_id: Option<String>,
}

async fn populate_espn(
    State(state): State<Arc<AppState>>,
    body: Option<Json<PopulateEspnRequest>>,
) -> ApiResult<serde_json::Value> {
    let req = body.map(|Json(r)| r).unwrap_or_default();
    match jobs::populate_espn(&state.ctx, req.league_id.as_deref()).await {
        Ok(count) => Ok(Json(json!({ "success": true, "count": count }))),
        Err(JobError::MissingLeagueId) => {
            Err(ApiError::BadRequest("league_id is required".into()))
        }
        Err(e) => Err(ApiError::Internal(e.to_string())),
    }
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn players_query_defaults_to_available_only() {
        let params = PlayersQuery::default().search_params().unwrap();
        assert!(params.available_only);
        assert!(params.sort_desc);
        assert_eq!(params.max_results, None);
    }

    #[test]
    fn drafted_filter_turns_off_available_only() {
        let q = PlayersQuery {
            drafted: Some(true),
            ..Default::default()
        };
        let params = q.search_params().unwrap();
        assert!(!params.available_only);
        assert_eq!(params.drafted, Some(true));
    }

    #[test]
    fn position_aliases_accepted() {
        let q = PlayersQuery {
            position: Some("D/ST".into()),
            ..Default::default()
        };
        assert_eq!(q.search_params().unwrap().position, Some(Position::DEF));

        let bad = PlayersQuery {
            position: Some("OL".into()),
            ..Default::default()
        };
        match bad.search_params() {
            Err(ApiError::BadRequest(_)) => {}
            other => panic!("expected BadRequest, got {other:?}"),
        }
    }

    #[test]
    fn name_lookup_ignores_case_and_punctuation() {
        let players = vec![PlayerRecord::new("A.J. Brown", Position::WR, "PHI", "test")];
        assert!(find_by_name(&players, "aj brown").is_some());
        assert!(find_by_name(&players, "AJ Green").is_none());
    }
}
