//! Stream resolution
//!
//! Turns a (content id, episode) pair into a [`StreamDescriptor`]:
//! 1. probe the primary candidate endpoints in fixed order
//! 2. if none yields sources, retry the episode template with alternate servers
//! 3. if still nothing, substitute the canned fallback descriptor
//! 4. route segmented playlists through the rewriting proxy
//! 5. narrow sources to the requested language, never down to zero
//!
//! Resolution itself never fails; only malformed input is rejected, and
//! that happens in [`StreamQuery::into_request`] before any network call.

use chrono::Utc;
use serde::Deserialize;
use std::fmt;
use thiserror::Error;
use tracing::{info, info_span, warn, Instrument};
use uuid::Uuid;

use super::language::filter_by_language;
use super::normalize::{normalize, Normalized};
use super::probe::{first_success, Probed};
use super::rewrite::ProxyRewriter;
use crate::api::AnimeWorldClient;
use crate::config::Config;
use crate::models::{CatalogIdKind, Language, StreamDescriptor, StreamSource};

pub const DEFAULT_SERVER: &str = "vidcloud";
pub const DEFAULT_AUDIO: &str = "sub";

const FALLBACK_PRIMARY_URL: &str = "https://test-streams.mux.dev/x36xhzz/x36xhzz.m3u8";
const FALLBACK_BACKUP_URL: &str = "https://multiplatform-f.akamaihd.net/i/multi/will/bunny/big_buck_bunny_,640x360_400,640x360_700,640x360_1000,950x540_1500,.f4v.csmil/master.m3u8";
const FALLBACK_MESSAGE: &str = "Using test streams - AnimeWorld API unavailable";

// =============================================================================
// Input
// =============================================================================

/// Rejected before any upstream call
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum InputError {
    #[error("anime_id or anilist_id required")]
    MissingId,

    #[error("episode number required")]
    MissingEpisode,

    #[error("episode must be a positive integer, got '{0}'")]
    InvalidEpisode(String),
}

/// Raw resolution parameters as they arrive on the wire
#[derive(Debug, Clone, Default, Deserialize)]
pub struct StreamQuery {
    pub anime_id: Option<String>,
    pub anilist_id: Option<String>,
    pub episode: Option<String>,
    pub server: Option<String>,
    pub audio: Option<String>,
    pub lang: Option<String>,
}

impl StreamQuery {
    /// Validate into a request; an AniList id wins over a native one
    pub fn into_request(self) -> Result<StreamRequest, InputError> {
        let (content_id, id_kind) = match (non_blank(self.anilist_id), non_blank(self.anime_id)) {
            (Some(id), _) => (id, CatalogIdKind::External),
            (None, Some(id)) => (id, CatalogIdKind::Native),
            (None, None) => return Err(InputError::MissingId),
        };
        let episode = non_blank(self.episode).ok_or(InputError::MissingEpisode)?;
        let episode = parse_episode(&episode)?;

        Ok(StreamRequest {
            content_id,
            id_kind,
            episode,
            server: non_blank(self.server).unwrap_or_else(|| DEFAULT_SERVER.to_string()),
            audio: non_blank(self.audio).unwrap_or_else(|| DEFAULT_AUDIO.to_string()),
            language: self.lang.as_deref().and_then(Language::from_name),
        })
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Episode numbers are positive integers
pub fn parse_episode(raw: &str) -> Result<u32, InputError> {
    raw.trim()
        .parse::<u32>()
        .ok()
        .filter(|n| *n > 0)
        .ok_or_else(|| InputError::InvalidEpisode(raw.to_string()))
}

/// A validated resolution request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamRequest {
    pub content_id: String,
    pub id_kind: CatalogIdKind,
    pub episode: u32,
    pub server: String,
    pub audio: String,
    /// Language to narrow sources to; `None` keeps every source
    pub language: Option<Language>,
}

impl StreamRequest {
    pub fn native(content_id: impl Into<String>, episode: u32) -> Self {
        Self::new(content_id, episode, CatalogIdKind::Native)
    }

    pub fn external(content_id: impl Into<String>, episode: u32) -> Self {
        Self::new(content_id, episode, CatalogIdKind::External)
    }

    fn new(content_id: impl Into<String>, episode: u32, id_kind: CatalogIdKind) -> Self {
        Self {
            content_id: content_id.into(),
            id_kind,
            episode,
            server: DEFAULT_SERVER.to_string(),
            audio: DEFAULT_AUDIO.to_string(),
            language: None,
        }
    }

    pub fn with_server(mut self, server: impl Into<String>) -> Self {
        self.server = server.into();
        self
    }

    pub fn with_audio(mut self, audio: impl Into<String>) -> Self {
        self.audio = audio.into();
        self
    }

    pub fn with_language(mut self, language: Option<Language>) -> Self {
        self.language = language;
        self
    }
}

// =============================================================================
// Candidates
// =============================================================================

/// Which upstream template produced a candidate
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CandidateKind {
    EpisodeStream,
    Series,
    Player,
    Source,
    Anilist,
}

/// One endpoint to probe
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    pub kind: CandidateKind,
    /// Server tag the endpoint was built for
    pub server: String,
    pub url: String,
}

impl fmt::Display for Candidate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.url)
    }
}

// =============================================================================
// Resolver
// =============================================================================

pub struct StreamResolver {
    client: AnimeWorldClient,
    rewriter: ProxyRewriter,
    alternate_servers: Vec<String>,
}

impl StreamResolver {
    pub fn new(
        client: AnimeWorldClient,
        rewriter: ProxyRewriter,
        alternate_servers: Vec<String>,
    ) -> Self {
        Self {
            client,
            rewriter,
            alternate_servers,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            AnimeWorldClient::from_config(&config.upstream),
            ProxyRewriter::new(config.upstream.proxy_url.clone()),
            config.upstream.alternate_servers.clone(),
        )
    }

    /// Primary candidates in priority order
    pub fn candidates(&self, request: &StreamRequest) -> Vec<Candidate> {
        let id = &request.content_id;
        let server = &request.server;
        let candidate = |kind, url| Candidate {
            kind,
            server: server.clone(),
            url,
        };

        match request.id_kind {
            CatalogIdKind::External => vec![candidate(
                CandidateKind::Anilist,
                self.client.anilist_stream_url(id, request.episode, server),
            )],
            CatalogIdKind::Native => vec![
                candidate(
                    CandidateKind::EpisodeStream,
                    self.client.episode_stream_url(id, request.episode, server),
                ),
                candidate(CandidateKind::Series, self.client.series_url(id)),
                candidate(CandidateKind::Player, self.client.player_url(id)),
                candidate(CandidateKind::Source, self.client.source_url(id)),
            ],
        }
    }

    /// Server-scoped template retried with each alternate server tag
    pub fn alternates(&self, request: &StreamRequest) -> Vec<Candidate> {
        self.alternate_servers
            .iter()
            .filter(|server| !server.eq_ignore_ascii_case(&request.server))
            .map(|server| {
                let (kind, url) = match request.id_kind {
                    CatalogIdKind::External => (
                        CandidateKind::Anilist,
                        self.client
                            .anilist_stream_url(&request.content_id, request.episode, server),
                    ),
                    CatalogIdKind::Native => (
                        CandidateKind::EpisodeStream,
                        self.client
                            .episode_stream_url(&request.content_id, request.episode, server),
                    ),
                };
                Candidate {
                    kind,
                    server: server.clone(),
                    url,
                }
            })
            .collect()
    }

    /// Resolve a request; always produces a descriptor
    pub async fn resolve(&self, request: &StreamRequest) -> StreamDescriptor {
        let span = info_span!(
            "resolve",
            resolution_id = %Uuid::new_v4(),
            content_id = %request.content_id,
            id_kind = %request.id_kind,
            episode = request.episode,
        );
        self.resolve_inner(request).instrument(span).await
    }

    async fn resolve_inner(&self, request: &StreamRequest) -> StreamDescriptor {
        let primary = self.probe_candidates(self.candidates(request), request).await;
        let mut attempts = primary.attempts;
        let mut winner = primary.winner;

        if winner.is_none() {
            let alternates = self.alternates(request);
            if !alternates.is_empty() {
                info!(count = alternates.len(), "primary candidates exhausted, trying alternate servers");
                let secondary = self.probe_candidates(alternates, request).await;
                attempts.extend(secondary.attempts);
                winner = secondary.winner;
            }
        }

        let mut descriptor = match winner {
            Some((candidate, normalized)) => {
                info!(endpoint = %candidate.url, rule = normalized.rule, "resolved stream");
                Self::descriptor_from(request, &candidate, normalized)
            }
            None => {
                warn!(attempts = attempts.len(), "no upstream yielded sources, using fallback");
                Self::fallback(request)
            }
        };

        descriptor.attempts = attempts;
        descriptor.sources = self.rewriter.rewrite_all(descriptor.sources);
        if let Some(language) = request.language {
            descriptor.sources = filter_by_language(descriptor.sources, language);
        }
        descriptor
    }

    async fn probe_candidates(
        &self,
        candidates: Vec<Candidate>,
        request: &StreamRequest,
    ) -> Probed<Candidate, Normalized> {
        first_success(candidates, |candidate| {
            let url = candidate.url.clone();
            let server = candidate.server.clone();
            let audio = request.audio.clone();
            async move {
                self.client
                    .probe(&url)
                    .await
                    .filter_map(|body| normalize(&body, &server, &audio))
            }
        })
        .await
    }

    fn descriptor_from(
        request: &StreamRequest,
        candidate: &Candidate,
        normalized: Normalized,
    ) -> StreamDescriptor {
        StreamDescriptor {
            sources: normalized.sources,
            subtitle_tracks: normalized.subtitles,
            intro: normalized.intro,
            outro: normalized.outro,
            resolved_from: Some(candidate.url.clone()),
            ..Self::base_descriptor(request)
        }
    }

    /// Canned descriptor used when every candidate failed
    ///
    /// Carries the same two public test streams whatever was asked for.
    pub fn fallback(request: &StreamRequest) -> StreamDescriptor {
        let audio = request.audio.to_uppercase();
        let sources = vec![
            StreamSource::new(
                FALLBACK_PRIMARY_URL,
                format!("{} - {}", request.server.to_uppercase(), audio),
            )
            .with_quality("1080p"),
            StreamSource::new(FALLBACK_BACKUP_URL, format!("BACKUP - {}", audio))
                .with_quality("720p"),
        ];

        StreamDescriptor {
            sources,
            is_fallback: true,
            message: Some(FALLBACK_MESSAGE.to_string()),
            ..Self::base_descriptor(request)
        }
    }

    fn base_descriptor(request: &StreamRequest) -> StreamDescriptor {
        StreamDescriptor {
            content_id: request.content_id.clone(),
            id_kind: request.id_kind,
            episode_number: request.episode,
            server: request.server.clone(),
            audio_track: request.audio.clone(),
            language: request.language.map(|l| l.name().to_string()),
            sources: Vec::new(),
            subtitle_tracks: Vec::new(),
            intro: None,
            outro: None,
            is_fallback: false,
            message: None,
            resolved_from: None,
            attempts: Vec::new(),
            resolved_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::MediaKind;

    fn query(anime_id: Option<&str>, anilist_id: Option<&str>, episode: Option<&str>) -> StreamQuery {
        StreamQuery {
            anime_id: anime_id.map(String::from),
            anilist_id: anilist_id.map(String::from),
            episode: episode.map(String::from),
            ..StreamQuery::default()
        }
    }

    fn resolver() -> StreamResolver {
        StreamResolver::new(
            AnimeWorldClient::with_base_url("http://upstream"),
            ProxyRewriter::new("http://proxy"),
            vec!["streamwish".to_string(), "mp4upload".to_string()],
        )
    }

    #[test]
    fn test_query_defaults() {
        let request = query(Some("666243"), None, Some("1")).into_request().unwrap();
        assert_eq!(request.content_id, "666243");
        assert_eq!(request.id_kind, CatalogIdKind::Native);
        assert_eq!(request.episode, 1);
        assert_eq!(request.server, "vidcloud");
        assert_eq!(request.audio, "sub");
        assert_eq!(request.language, None);
    }

    #[test]
    fn test_query_anilist_wins() {
        let request = query(Some("666243"), Some("21"), Some("3")).into_request().unwrap();
        assert_eq!(request.content_id, "21");
        assert_eq!(request.id_kind, CatalogIdKind::External);
    }

    #[test]
    fn test_query_rejections() {
        assert_eq!(query(None, None, Some("1")).into_request(), Err(InputError::MissingId));
        assert_eq!(query(Some(" "), None, Some("1")).into_request(), Err(InputError::MissingId));
        assert_eq!(query(Some("x"), None, None).into_request(), Err(InputError::MissingEpisode));
        assert_eq!(
            query(Some("x"), None, Some("one")).into_request(),
            Err(InputError::InvalidEpisode("one".to_string()))
        );
        assert!(query(Some("x"), None, Some("0")).into_request().is_err());
        assert!(query(Some("x"), None, Some("-2")).into_request().is_err());
    }

    #[test]
    fn test_unknown_language_does_not_filter() {
        let mut q = query(Some("x"), None, Some("1"));
        q.lang = Some("klingon".to_string());
        assert_eq!(q.into_request().unwrap().language, None);
    }

    #[test]
    fn test_native_candidates_in_priority_order() {
        let candidates = resolver().candidates(&StreamRequest::native("666243", 1));
        let urls: Vec<_> = candidates.iter().map(|c| c.url.as_str()).collect();
        assert_eq!(
            urls,
            vec![
                "http://upstream/api/anime/666243/1/server/vidcloud",
                "http://upstream/api/series/666243",
                "http://upstream/api/player/666243",
                "http://upstream/api/source/666243?server=1",
            ]
        );
    }

    #[test]
    fn test_external_id_has_single_candidate() {
        let candidates = resolver().candidates(&StreamRequest::external("21", 4));
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].kind, CandidateKind::Anilist);
        assert_eq!(candidates[0].url, "http://upstream/api/anilist/21/4/server/vidcloud");
    }

    #[test]
    fn test_alternates_skip_requested_server() {
        let request = StreamRequest::native("x", 2).with_server("streamwish");
        let alternates = resolver().alternates(&request);
        assert_eq!(alternates.len(), 1);
        assert_eq!(alternates[0].server, "mp4upload");
        assert_eq!(alternates[0].url, "http://upstream/api/anime/x/2/server/mp4upload");
    }

    #[test]
    fn test_fallback_shape() {
        let request = StreamRequest::native("x", 2).with_audio("dub");
        let descriptor = StreamResolver::fallback(&request);
        assert!(descriptor.is_fallback);
        assert_eq!(descriptor.sources.len(), 2);
        assert_eq!(descriptor.sources[0].url, FALLBACK_PRIMARY_URL);
        assert_eq!(descriptor.sources[0].label, "VIDCLOUD - DUB");
        assert_eq!(descriptor.sources[1].label, "BACKUP - DUB");
        assert!(descriptor
            .sources
            .iter()
            .all(|s| s.media_kind == MediaKind::SegmentedPlaylist));
    }
}
