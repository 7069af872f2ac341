//! Route handlers
//!
//! Handlers validate input, call into the resolver or upstream clients and
//! map failures onto [`ApiError`]. Stream routes never fail after input
//! validation: the resolver always produces a descriptor.

use axum::extract::State;
use axum::http::header::ACCEPT;
use axum::http::HeaderMap;
use axum::response::{Html, IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::debug;

use super::error::{ApiError, ApiResult};
use super::extract::{Path, Query};
use super::player;
use super::AppState;
use crate::models::{EpisodeListing, Language, SearchResponse, ServerCatalog, StreamDescriptor};
use crate::stream::resolver::{parse_episode, DEFAULT_SERVER};
use crate::stream::{StreamQuery, StreamRequest};

// =============================================================================
// Health
// =============================================================================

pub async fn health() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

// =============================================================================
// Stream Resolution
// =============================================================================

pub async fn stream(
    State(state): State<AppState>,
    Query(query): Query<StreamQuery>,
) -> ApiResult<Json<StreamDescriptor>> {
    let request = query
        .clone()
        .into_request()
        .map_err(|err| with_query_ids(ApiError::from(err), &query))?;

    Ok(Json(state.resolver.resolve(&request).await))
}

fn with_query_ids(mut err: ApiError, query: &StreamQuery) -> ApiError {
    for (key, value) in [
        ("anime_id", &query.anime_id),
        ("anilist_id", &query.anilist_id),
        ("episode", &query.episode),
    ] {
        if let Some(value) = value {
            err = err.with(key, value.clone());
        }
    }
    err
}

// =============================================================================
// Player Routes
// =============================================================================

/// Descriptor plus player options, as served by the player routes
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerResponse {
    #[serde(flatten)]
    pub descriptor: StreamDescriptor,
    pub autoplay: bool,
    pub player_url: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct PlayerParams {
    pub autoplay: Option<String>,
    pub server: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct AnilistParams {
    pub autoplay: Option<String>,
    pub lang: Option<String>,
}

/// `autoplay` defaults to on; an explicit value enables it only when `true`
fn autoplay_flag(raw: Option<&str>) -> bool {
    raw.map_or(true, |v| v.trim() == "true")
}

fn wants_html(headers: &HeaderMap) -> bool {
    headers
        .get(ACCEPT)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|accept| accept.contains("text/html"))
}

pub async fn player(
    State(state): State<AppState>,
    Path((anilist_id, episode, language)): Path<(String, String, String)>,
    Query(params): Query<PlayerParams>,
    headers: HeaderMap,
) -> ApiResult<Response> {
    let server = params
        .server
        .filter(|s| !s.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_SERVER.to_string());
    let autoplay = autoplay_flag(params.autoplay.as_deref());

    play(
        &state,
        PlayerTarget {
            anilist_id,
            episode,
            server,
            language,
            autoplay,
        },
        wants_html(&headers),
    )
    .await
}

pub async fn anilist(
    State(state): State<AppState>,
    Path((anilist_id, episode, server)): Path<(String, String, String)>,
    Query(params): Query<AnilistParams>,
    headers: HeaderMap,
) -> ApiResult<Response> {
    let language = params
        .lang
        .filter(|l| !l.trim().is_empty())
        .unwrap_or_else(|| Language::default().name().to_string());
    let autoplay = autoplay_flag(params.autoplay.as_deref());

    play(
        &state,
        PlayerTarget {
            anilist_id,
            episode,
            server,
            language,
            autoplay,
        },
        wants_html(&headers),
    )
    .await
}

/// Player paths missing the episode or language segment
pub async fn incomplete_player() -> ApiError {
    ApiError::invalid_input(
        "Invalid parameters. Expected: /api/player/{anilistId}/{episode}/{language}",
    )
}

pub async fn incomplete_anilist() -> ApiError {
    ApiError::invalid_input(
        "Invalid parameters. Expected: /api/anilist/{anilistId}/{episode}/{server}",
    )
}

struct PlayerTarget {
    anilist_id: String,
    episode: String,
    server: String,
    language: String,
    autoplay: bool,
}

async fn play(state: &AppState, target: PlayerTarget, html: bool) -> ApiResult<Response> {
    let episode = parse_episode(&target.episode).map_err(|err| {
        ApiError::from(err)
            .with("anilistId", target.anilist_id.clone())
            .with("episode", target.episode.clone())
            .with("language", target.language.clone())
    })?;
    let language = target.language.trim().to_lowercase();

    let request = StreamRequest::external(target.anilist_id.clone(), episode)
        .with_server(target.server.clone())
        .with_language(Language::from_name(&language));

    let mut descriptor = state.resolver.resolve(&request).await;
    descriptor.language = Some(language.clone());

    if html {
        debug!(anilist_id = %target.anilist_id, episode, "serving HTML player");
        return Ok(Html(player::render(&descriptor, &language, target.autoplay)).into_response());
    }

    let player_url = format!(
        "/api/player/{}/{}/{}?autoplay={}",
        urlencoding::encode(&target.anilist_id),
        episode,
        urlencoding::encode(&language),
        target.autoplay
    );

    Ok(Json(PlayerResponse {
        descriptor,
        autoplay: target.autoplay,
        player_url,
    })
    .into_response())
}

// =============================================================================
// Catalog Routes
// =============================================================================

#[derive(Debug, Default, Deserialize)]
pub struct SearchParams {
    pub q: Option<String>,
}

pub async fn search(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> ApiResult<Json<SearchResponse>> {
    let query = params
        .q
        .map(|q| q.trim().to_string())
        .filter(|q| !q.is_empty())
        .ok_or_else(|| ApiError::invalid_input("Search query required"))?;

    Ok(Json(state.catalog.search(&query).await))
}

#[derive(Debug, Default, Deserialize)]
pub struct EpisodesParams {
    pub source: Option<String>,
}

pub async fn episodes(
    State(state): State<AppState>,
    Path(anime_id): Path<String>,
    Query(params): Query<EpisodesParams>,
) -> ApiResult<Json<EpisodeListing>> {
    let source = params.source.unwrap_or_else(|| "animeworld".to_string());
    if source != "animeworld" {
        return Err(ApiError::invalid_input("Unsupported source")
            .with("animeId", anime_id)
            .with("source", source));
    }

    state
        .animeworld
        .episode_listing(&anime_id)
        .await
        .map(Json)
        .map_err(|err| ApiError::from_upstream(err).with("animeId", anime_id))
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServersParams {
    pub anilist_id: Option<String>,
    pub episode: Option<String>,
}

pub async fn servers(
    State(state): State<AppState>,
    Query(params): Query<ServersParams>,
) -> ApiResult<Json<ServerCatalog>> {
    let (Some(anilist_id), Some(episode)) = (
        params.anilist_id.filter(|id| !id.trim().is_empty()),
        params.episode,
    ) else {
        return Err(ApiError::invalid_input("anilistId and episode are required"));
    };
    let episode = parse_episode(&episode)
        .map_err(|err| ApiError::from(err).with("anilistId", anilist_id.clone()))?;

    Ok(Json(ServerCatalog::new(
        &anilist_id,
        episode,
        &state.config.servers,
    )))
}

// =============================================================================
// Fallbacks
// =============================================================================

pub async fn route_not_found() -> ApiError {
    ApiError::not_found("Route not found")
}
