//! AnimeWorld API client
//!
//! Primary upstream for per-episode stream listings and series metadata.
//! Stream endpoints are probed leniently (any answer below 500 counts as an
//! answer); listing endpoints are plain request/response.

use reqwest::header::{ORIGIN, REFERER};
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, warn};

use super::{build_http_client, ProbeOutcome, UpstreamError};
use crate::config::UpstreamConfig;
use crate::models::{Episode, EpisodeListing};

const SITE_ORIGIN: &str = "https://animeworld.tv";

/// AnimeWorld API client
pub struct AnimeWorldClient {
    base_url: String,
    probe_client: reqwest::Client,
    listing_client: reqwest::Client,
}

impl AnimeWorldClient {
    /// Create a client with explicit per-call timeouts
    pub fn new(base_url: impl Into<String>, probe_timeout: Duration, listing_timeout: Duration) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            probe_client: build_http_client(probe_timeout),
            listing_client: build_http_client(listing_timeout),
        }
    }

    pub fn from_config(upstream: &UpstreamConfig) -> Self {
        Self::new(
            upstream.animeworld_url.clone(),
            upstream.probe_timeout(),
            upstream.listing_timeout(),
        )
    }

    /// Create a client with a custom base URL (for testing)
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self::from_config(&UpstreamConfig {
            animeworld_url: base_url.into(),
            ..UpstreamConfig::default()
        })
    }

    // -------------------------------------------------------------------------
    // Endpoint templates
    // -------------------------------------------------------------------------

    /// Episode-scoped stream endpoint for a native id
    pub fn episode_stream_url(&self, anime_id: &str, episode: u32, server: &str) -> String {
        format!(
            "{}/api/anime/{}/{}/server/{}",
            self.base_url,
            urlencoding::encode(anime_id),
            episode,
            urlencoding::encode(server)
        )
    }

    /// Stream endpoint addressed by AniList id
    pub fn anilist_stream_url(&self, anilist_id: &str, episode: u32, server: &str) -> String {
        format!(
            "{}/api/anilist/{}/{}/server/{}",
            self.base_url,
            urlencoding::encode(anilist_id),
            episode,
            urlencoding::encode(server)
        )
    }

    pub fn series_url(&self, anime_id: &str) -> String {
        format!("{}/api/series/{}", self.base_url, urlencoding::encode(anime_id))
    }

    pub fn player_url(&self, anime_id: &str) -> String {
        format!("{}/api/player/{}", self.base_url, urlencoding::encode(anime_id))
    }

    pub fn source_url(&self, anime_id: &str) -> String {
        format!(
            "{}/api/source/{}?server=1",
            self.base_url,
            urlencoding::encode(anime_id)
        )
    }

    // -------------------------------------------------------------------------
    // Requests
    // -------------------------------------------------------------------------

    /// Probe one candidate endpoint
    ///
    /// 5xx and transport failures are `Failed`, 4xx is `Rejected`, a 2xx
    /// with an empty or non-JSON body is `Empty`.
    pub async fn probe(&self, url: &str) -> ProbeOutcome<Value> {
        debug!(endpoint = url, "probing upstream");

        let response = match self
            .probe_client
            .get(url)
            .header(REFERER, format!("{}/", SITE_ORIGIN))
            .header(ORIGIN, SITE_ORIGIN)
            .send()
            .await
        {
            Ok(response) => response,
            Err(err) => {
                let err = UpstreamError::from(err);
                warn!(endpoint = url, error = %err, "upstream probe failed");
                return ProbeOutcome::Failed(err);
            }
        };

        let status = response.status();
        if status.is_server_error() {
            warn!(endpoint = url, status = status.as_u16(), "upstream server error");
            return ProbeOutcome::Failed(UpstreamError::Server {
                status: status.as_u16(),
            });
        }
        if !status.is_success() {
            debug!(endpoint = url, status = status.as_u16(), "upstream rejected probe");
            return ProbeOutcome::Rejected {
                status: status.as_u16(),
            };
        }

        let status = status.as_u16();
        let body = match response.text().await {
            Ok(body) => body,
            Err(err) => {
                let err = UpstreamError::from(err);
                warn!(endpoint = url, error = %err, "failed to read upstream body");
                return ProbeOutcome::Failed(err);
            }
        };

        match serde_json::from_str::<Value>(&body) {
            Ok(Value::Null) => ProbeOutcome::Empty { status },
            Ok(data) => ProbeOutcome::Found { status, data },
            Err(_) => {
                debug!(endpoint = url, "upstream body is not JSON");
                ProbeOutcome::Empty { status }
            }
        }
    }

    /// Raw series document
    pub async fn series(&self, anime_id: &str) -> Result<Value, UpstreamError> {
        let url = self.series_url(anime_id);
        let response = self.listing_client.get(&url).send().await?;

        let status = response.status();
        if status.is_server_error() {
            return Err(UpstreamError::Server {
                status: status.as_u16(),
            });
        }
        if !status.is_success() {
            return Err(UpstreamError::Rejected {
                status: status.as_u16(),
            });
        }

        let body = response.text().await?;
        if body.trim().is_empty() {
            return Ok(Value::Null);
        }
        serde_json::from_str(&body).map_err(|e| UpstreamError::Decode(format!("JSON parse error: {}", e)))
    }

    /// Episode listing for a title
    pub async fn episode_listing(&self, anime_id: &str) -> Result<EpisodeListing, UpstreamError> {
        let series = self.series(anime_id).await?;
        listing_from_series(anime_id, &series)
    }
}

// =============================================================================
// Response Structures (internal deserialization)
// =============================================================================

/// Largest episode count synthesised from a bare `totalEpisodes`
pub const MAX_PLACEHOLDER_EPISODES: u32 = 5000;

#[derive(Debug, Default, Deserialize)]
struct EpisodeRaw {
    #[serde(default)]
    number: Option<Value>,
    #[serde(default)]
    title: Option<Value>,
    #[serde(default)]
    id: Option<Value>,
    #[serde(default)]
    thumbnail: Option<Value>,
    #[serde(default)]
    description: Option<Value>,
}

impl EpisodeRaw {
    fn from_value(value: &Value) -> Self {
        serde_json::from_value(value.clone()).unwrap_or_default()
    }

    fn into_episode(self, index: usize) -> Episode {
        let number = self
            .number
            .as_ref()
            .and_then(value_as_u32)
            .filter(|n| *n > 0)
            .unwrap_or(index as u32 + 1);

        Episode {
            number,
            title: self
                .title
                .as_ref()
                .and_then(value_as_string)
                .unwrap_or_else(|| format!("Episode {}", number)),
            id: self.id.as_ref().and_then(value_as_string),
            thumbnail: self.thumbnail.as_ref().and_then(value_as_string),
            description: self.description.as_ref().and_then(value_as_string),
        }
    }
}

/// Turn a series document into an episode listing
///
/// Per-episode metadata wins; a bare `totalEpisodes` count yields
/// placeholder entries numbered 1..=N. Fields are read independently so a
/// malformed one never discards the others.
pub fn listing_from_series(anime_id: &str, series: &Value) -> Result<EpisodeListing, UpstreamError> {
    let listed = series
        .get("episodes")
        .and_then(Value::as_array)
        .filter(|items| !items.is_empty());

    let episodes: Vec<Episode> = match listed {
        Some(items) => items
            .iter()
            .enumerate()
            .map(|(i, item)| EpisodeRaw::from_value(item).into_episode(i))
            .collect(),
        None => {
            let total = series
                .get("totalEpisodes")
                .and_then(value_as_u32)
                .unwrap_or(0);
            if total > MAX_PLACEHOLDER_EPISODES {
                return Err(UpstreamError::Decode(format!(
                    "implausible episode count {} for {}",
                    total, anime_id
                )));
            }
            (1..=total).map(|n| Episode::placeholder(anime_id, n)).collect()
        }
    };

    Ok(EpisodeListing {
        anime_id: anime_id.to_string(),
        title: series
            .get("title")
            .and_then(value_as_string)
            .unwrap_or_else(|| "Unknown Anime".to_string()),
        total_episodes: episodes.len(),
        episodes,
    })
}

/// Numbers arrive as JSON numbers or numeric strings
fn value_as_u32(value: &Value) -> Option<u32> {
    match value {
        Value::Number(n) => n
            .as_u64()
            .or_else(|| {
                n.as_f64()
                    .filter(|f| f.fract() == 0.0 && *f >= 0.0 && *f <= f64::from(u32::MAX))
                    .map(|f| f as u64)
            })
            .and_then(|n| u32::try_from(n).ok()),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn value_as_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}
