//! HTTP surface
//!
//! Every route is GET-only. Other methods are rejected with a JSON 405
//! before routing; CORS preflight is answered by the CORS layer.

pub mod error;
pub mod extract;
pub mod handlers;
pub mod player;

pub use error::{ApiError, ApiResult};

use anyhow::{Context, Result};
use axum::extract::Request;
use axum::http::Method;
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::api::{AnimeWorldClient, CatalogSearch};
use crate::config::Config;
use crate::stream::StreamResolver;

/// Shared, read-only state handed to every handler
#[derive(Clone)]
pub struct AppState {
    pub resolver: Arc<StreamResolver>,
    pub catalog: Arc<CatalogSearch>,
    pub animeworld: Arc<AnimeWorldClient>,
    pub config: Arc<Config>,
}

impl AppState {
    pub fn from_config(config: Config) -> Self {
        Self {
            resolver: Arc::new(StreamResolver::from_config(&config)),
            catalog: Arc::new(CatalogSearch::from_config(&config)),
            animeworld: Arc::new(AnimeWorldClient::from_config(&config.upstream)),
            config: Arc::new(config),
        }
    }
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        .route("/api/stream", get(handlers::stream))
        .route("/api/search", get(handlers::search))
        .route("/api/anime/{id}/episodes", get(handlers::episodes))
        .route("/api/servers", get(handlers::servers))
        .route("/api/player", get(handlers::incomplete_player))
        .route("/api/player/{anilist_id}", get(handlers::incomplete_player))
        .route(
            "/api/player/{anilist_id}/{episode}",
            get(handlers::incomplete_player),
        )
        .route(
            "/api/player/{anilist_id}/{episode}/{language}",
            get(handlers::player),
        )
        .route("/api/anilist", get(handlers::incomplete_anilist))
        .route("/api/anilist/{anilist_id}", get(handlers::incomplete_anilist))
        .route(
            "/api/anilist/{anilist_id}/{episode}",
            get(handlers::incomplete_anilist),
        )
        .route(
            "/api/anilist/{anilist_id}/{episode}/{server}",
            get(handlers::anilist),
        )
        .fallback(handlers::route_not_found)
        .with_state(state)
        .layer(middleware::from_fn(reject_non_get))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

async fn reject_non_get(request: Request, next: Next) -> Response {
    match *request.method() {
        Method::GET | Method::HEAD | Method::OPTIONS => next.run(request).await,
        _ => ApiError::MethodNotAllowed.into_response(),
    }
}

/// Bind the configured address and serve until Ctrl-C
pub async fn serve(config: Config) -> Result<()> {
    let addr = config.listen.clone();
    let router = build_router(AppState::from_config(config));

    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;
    let local_addr = listener
        .local_addr()
        .context("failed to determine listener address")?;
    info!(%local_addr, "zanime listening");

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    info!("zanime shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(error) = tokio::signal::ctrl_c().await {
        tracing::error!(%error, "failed to listen for shutdown signal");
    }
}
