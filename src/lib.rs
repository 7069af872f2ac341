//! zanime - anime stream resolution service
//!
//! Resolves a title/episode pair into a playable stream descriptor by probing
//! upstream listing endpoints in a fixed order, normalizing whatever answers,
//! routing playlists through a rewriting proxy and falling back to canned
//! test streams when nothing answers.
//!
//! # Modules
//!
//! - `models` - Stream descriptors, sources, catalog types
//! - `config` - TOML config with environment overrides
//! - `api` - Upstream clients (AnimeWorld, catalog search)
//! - `stream` - Resolution pipeline
//! - `server` - axum HTTP surface
//! - `cli` / `commands` - Scriptable command line

pub mod api;
pub mod cli;
pub mod commands;
pub mod config;
pub mod models;
pub mod server;
pub mod stream;
pub mod telemetry;

// Re-export commonly used types
pub use models::{
    CatalogIdKind, Episode, EpisodeListing, Language, MediaKind, SearchHit, SearchResponse,
    ServerCatalog, StreamDescriptor, StreamSource, SubtitleTrack,
};

pub use api::{AnimeWorldClient, CatalogSearch};
pub use config::Config;
pub use stream::{StreamQuery, StreamRequest, StreamResolver};
