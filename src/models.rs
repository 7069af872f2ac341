//! Data structures and types for zanime
//!
//! Contains all shared models used across the crate organized by domain:
//! - **Streams**: resolved stream descriptors, sources and subtitle tracks
//! - **Addressing**: id schemes and audio language selection
//! - **Catalog**: search hits, episode listings and the server catalog

use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::sync::OnceLock;

// =============================================================================
// Stream Models
// =============================================================================

/// How a source is delivered, inferred from its URL rather than upstream metadata
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MediaKind {
    /// An `.m3u8`/manifest index of media segments
    SegmentedPlaylist,
    /// A single progressive media file (mp4 and friends)
    ProgressiveFile,
}

impl MediaKind {
    /// Classify a URL: an `.m3u8` or `manifest` substring anywhere marks a playlist
    pub fn detect(url: &str) -> Self {
        static SIGNATURE: OnceLock<Option<Regex>> = OnceLock::new();
        let signature = SIGNATURE
            .get_or_init(|| Regex::new(r"(?i)\.m3u8|manifest").ok())
            .as_ref();

        let matched = match signature {
            Some(re) => re.is_match(url),
            None => {
                let lower = url.to_ascii_lowercase();
                lower.contains(".m3u8") || lower.contains("manifest")
            }
        };

        if matched {
            MediaKind::SegmentedPlaylist
        } else {
            MediaKind::ProgressiveFile
        }
    }

    pub fn is_playlist(&self) -> bool {
        matches!(self, MediaKind::SegmentedPlaylist)
    }
}

impl fmt::Display for MediaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MediaKind::SegmentedPlaylist => write!(f, "hls"),
            MediaKind::ProgressiveFile => write!(f, "file"),
        }
    }
}

/// A playable source. The first source of a descriptor is the default one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StreamSource {
    pub url: String,
    /// Pre-rewrite URL, only present when `url` points at the rewriting proxy
    #[serde(skip_serializing_if = "Option::is_none")]
    pub original_url: Option<String>,
    pub label: String,
    pub media_kind: MediaKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quality: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lang: Option<String>,
}

impl StreamSource {
    /// Build a source, classifying it from its URL
    pub fn new(url: impl Into<String>, label: impl Into<String>) -> Self {
        let url = url.into();
        Self {
            media_kind: MediaKind::detect(&url),
            url,
            original_url: None,
            label: label.into(),
            quality: None,
            lang: None,
        }
    }

    pub fn with_quality(mut self, quality: impl Into<String>) -> Self {
        self.quality = Some(quality.into());
        self
    }

    /// The URL the content actually lives at, before any proxy rewrite
    pub fn origin_url(&self) -> &str {
        self.original_url.as_deref().unwrap_or(&self.url)
    }

    /// Conventional label for a server/audio pair, e.g. `VIDCLOUD-SUB`
    pub fn default_label(server: &str, audio: &str) -> String {
        format!("{}-{}", server, audio).to_uppercase()
    }
}

impl fmt::Display for StreamSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let quality = self.quality.as_deref().unwrap_or("???");
        write!(f, "[{}] {} ({}) {}", quality, self.label, self.media_kind, self.url)
    }
}

/// Subtitle track flavour
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SubtitleKind {
    Captions,
    #[default]
    Subtitles,
}

impl SubtitleKind {
    pub fn from_str_loose(s: &str) -> Self {
        if s.eq_ignore_ascii_case("captions") {
            SubtitleKind::Captions
        } else {
            SubtitleKind::Subtitles
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubtitleTrack {
    pub url: String,
    pub label: String,
    pub kind: SubtitleKind,
}

/// Opening/ending timestamps in seconds
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Marker {
    pub start: f64,
    pub end: f64,
}

/// One upstream probe, kept on the descriptor for debuggability
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attempt {
    pub endpoint: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub success: bool,
}

/// Canonical result of a stream resolution
///
/// Built fresh for every request, never cached or shared.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StreamDescriptor {
    pub content_id: String,
    pub id_kind: CatalogIdKind,
    pub episode_number: u32,
    pub server: String,
    pub audio_track: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    pub sources: Vec<StreamSource>,
    pub subtitle_tracks: Vec<SubtitleTrack>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub intro: Option<Marker>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub outro: Option<Marker>,
    pub is_fallback: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resolved_from: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub attempts: Vec<Attempt>,
    pub resolved_at: DateTime<Utc>,
}

impl StreamDescriptor {
    /// Default playable source
    pub fn primary(&self) -> Option<&StreamSource> {
        self.sources.first()
    }
}

// =============================================================================
// Addressing Models
// =============================================================================

/// Which id scheme a content id belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum CatalogIdKind {
    /// Id of the primary upstream service
    #[default]
    Native,
    /// Id from the external metadata catalog (AniList)
    External,
}

impl fmt::Display for CatalogIdKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CatalogIdKind::Native => write!(f, "native"),
            CatalogIdKind::External => write!(f, "anilist"),
        }
    }
}

/// Audio language a caller can ask the source list to be narrowed to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    #[default]
    English,
    Japanese,
    Hindi,
    Bangla,
    Tamil,
    Kannada,
    Malayalam,
    Telugu,
}

impl Language {
    pub const ALL: [Language; 8] = [
        Language::English,
        Language::Japanese,
        Language::Hindi,
        Language::Bangla,
        Language::Tamil,
        Language::Kannada,
        Language::Malayalam,
        Language::Telugu,
    ];

    /// Parse a case-insensitive language name; unknown names yield `None`
    pub fn from_name(name: &str) -> Option<Self> {
        let name = name.trim();
        Self::ALL
            .into_iter()
            .find(|lang| lang.name().eq_ignore_ascii_case(name))
    }

    pub fn name(&self) -> &'static str {
        match self {
            Language::English => "english",
            Language::Japanese => "japanese",
            Language::Hindi => "hindi",
            Language::Bangla => "bangla",
            Language::Tamil => "tamil",
            Language::Kannada => "kannada",
            Language::Malayalam => "malayalam",
            Language::Telugu => "telugu",
        }
    }

    /// Uppercase label keywords that mark a source as carrying this language
    pub fn keywords(&self) -> &'static [&'static str] {
        match self {
            Language::English => &["SUB", "ENGLISH"],
            Language::Japanese => &["SUB", "JAPANESE"],
            Language::Hindi => &["HINDI", "DUB"],
            Language::Bangla => &["BANGLA", "BENGALI"],
            Language::Tamil => &["TAMIL"],
            Language::Kannada => &["KANNADA"],
            Language::Malayalam => &["MALAYALAM"],
            Language::Telugu => &["TELUGU"],
        }
    }

    /// The default language never narrows the source list
    pub fn is_default(&self) -> bool {
        *self == Language::default()
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

// =============================================================================
// Catalog Models
// =============================================================================

/// One search result tagged with the provider it came from
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchHit {
    pub source: String,
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl SearchHit {
    /// Tag an upstream item; a `source` field of its own is replaced by the provider name
    pub fn tagged(source: impl Into<String>, item: Value) -> Self {
        let mut fields = match item {
            Value::Object(map) => map,
            other => {
                let mut map = Map::new();
                map.insert("value".to_string(), other);
                map
            }
        };
        fields.remove("source");
        Self {
            source: source.into(),
            fields,
        }
    }

    /// Title-ish field for display
    pub fn title(&self) -> Option<&str> {
        ["title", "name"]
            .iter()
            .find_map(|key| self.fields.get(*key).and_then(Value::as_str))
    }
}

/// Outcome of one search provider in a fan-out
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderStatus {
    pub name: String,
    pub ok: bool,
    pub count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Merged search across every configured provider
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResponse {
    pub query: String,
    pub combined: Vec<SearchHit>,
    pub providers: Vec<ProviderStatus>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Episode {
    pub number: u32,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thumbnail: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl Episode {
    /// Placeholder entry for listings that only report an episode count
    pub fn placeholder(anime_id: &str, number: u32) -> Self {
        Self {
            number,
            title: format!("Episode {}", number),
            id: Some(format!("{}-ep-{}", anime_id, number)),
            thumbnail: None,
            description: None,
        }
    }
}

impl fmt::Display for Episode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "E{:02} - {}", self.number, self.title)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EpisodeListing {
    pub anime_id: String,
    pub title: String,
    pub total_episodes: usize,
    pub episodes: Vec<Episode>,
}

/// Delivery server known to the upstream and the languages it carries
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerInfo {
    pub name: String,
    pub languages: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerEntry {
    pub name: String,
    pub languages: Vec<String>,
    pub endpoint: String,
}

/// Server catalog for one episode
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerCatalog {
    pub anilist_id: String,
    pub episode: u32,
    pub servers: Vec<ServerEntry>,
    pub endpoint_pattern: String,
    pub example: String,
}

impl ServerCatalog {
    pub fn new(anilist_id: &str, episode: u32, servers: &[ServerInfo]) -> Self {
        let servers = servers
            .iter()
            .map(|s| ServerEntry {
                name: s.name.clone(),
                languages: s.languages.clone(),
                endpoint: format!(
                    "/api/anilist/{}/{}/{}",
                    urlencoding::encode(anilist_id),
                    episode,
                    urlencoding::encode(&s.name)
                ),
            })
            .collect();

        Self {
            anilist_id: anilist_id.to_string(),
            episode,
            servers,
            endpoint_pattern: "/api/player/{anilistId}/{episode}/{language}?autoplay=true"
                .to_string(),
            example: format!(
                "/api/player/{}/{}/english?autoplay=true",
                urlencoding::encode(anilist_id),
                episode
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_media_kind_detect() {
        assert_eq!(
            MediaKind::detect("https://x/y.m3u8"),
            MediaKind::SegmentedPlaylist
        );
        assert_eq!(
            MediaKind::detect("https://cdn.example/master.M3U8?token=abc"),
            MediaKind::SegmentedPlaylist
        );
        assert_eq!(
            MediaKind::detect("https://cdn.example/dash/manifest/video"),
            MediaKind::SegmentedPlaylist
        );
        assert_eq!(
            MediaKind::detect("https://cdn.example/ep1.mp4"),
            MediaKind::ProgressiveFile
        );
    }

    #[test]
    fn test_media_kind_detect_m3u8_mid_path() {
        assert_eq!(
            MediaKind::detect("https://cdn.example/index.m3u8;sid=1"),
            MediaKind::SegmentedPlaylist
        );
        assert_eq!(
            MediaKind::detect("https://cdn.example/x.m3u8/chunk"),
            MediaKind::SegmentedPlaylist
        );
    }

    #[test]
    fn test_default_label() {
        assert_eq!(StreamSource::default_label("vidcloud", "sub"), "VIDCLOUD-SUB");
    }

    #[test]
    fn test_language_from_name() {
        assert_eq!(Language::from_name("hindi"), Some(Language::Hindi));
        assert_eq!(Language::from_name(" Tamil "), Some(Language::Tamil));
        assert_eq!(Language::from_name("klingon"), None);
        assert!(Language::English.is_default());
        assert_eq!(Language::Hindi.keywords(), &["HINDI", "DUB"]);
    }

    #[test]
    fn test_source_serializes_camel_case_without_empty_fields() {
        let source = StreamSource::new("https://cdn.example/ep1.mp4", "VIDCLOUD-SUB");
        let value = serde_json::to_value(&source).unwrap();
        assert_eq!(value["mediaKind"], "progressive-file");
        assert!(value.get("originalUrl").is_none());
        assert!(value.get("quality").is_none());
    }

    #[test]
    fn test_search_hit_replaces_source_field() {
        let hit = SearchHit::tagged("tanime", json!({"title": "Frieren", "source": "x"}));
        let value = serde_json::to_value(&hit).unwrap();
        assert_eq!(value["source"], "tanime");
        assert_eq!(value["title"], "Frieren");
        assert_eq!(hit.title(), Some("Frieren"));
    }

    #[test]
    fn test_episode_placeholder() {
        let ep = Episode::placeholder("one-piece", 3);
        assert_eq!(ep.title, "Episode 3");
        assert_eq!(ep.id.as_deref(), Some("one-piece-ep-3"));
    }

    #[test]
    fn test_server_catalog_endpoints() {
        let servers = vec![ServerInfo {
            name: "vidcloud".into(),
            languages: vec!["SUB".into()],
        }];
        let catalog = ServerCatalog::new("21", 5, &servers);
        assert_eq!(catalog.servers[0].endpoint, "/api/anilist/21/5/vidcloud");
        assert_eq!(catalog.example, "/api/player/21/5/english?autoplay=true");
    }
}
