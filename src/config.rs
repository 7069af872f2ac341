//! Configuration management for zanime
//!
//! Handles config file loading and environment overrides.
//! Config is stored at ~/.config/zanime/config.toml

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::models::ServerInfo;

const DEFAULT_ANIMEWORLD_URL: &str = "https://animeworlda.vercel.app";
const DEFAULT_TANIME_URL: &str = "https://tanime.tv/api";
const DEFAULT_PROXY_URL: &str = "https://m38u.vercel.app";

/// Application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Address the HTTP server binds to
    pub listen: String,
    pub upstream: UpstreamConfig,
    /// Delivery servers advertised by the server catalog
    pub servers: Vec<ServerInfo>,
    /// Search providers queried by the fan-out, in merge order
    pub search: Vec<SearchProviderConfig>,
}

/// Upstream services the resolver and clients talk to
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UpstreamConfig {
    /// Primary metadata/stream-listing service
    pub animeworld_url: String,
    pub tanime_url: String,
    /// Rewriting proxy that fronts segmented playlists
    pub proxy_url: String,
    pub probe_timeout_secs: u64,
    pub listing_timeout_secs: u64,
    /// Server tags tried when every primary candidate came up empty
    pub alternate_servers: Vec<String>,
}

/// One catalog search service
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchProviderConfig {
    pub name: String,
    /// Full search endpoint; derived from the upstream base URLs when omitted
    #[serde(default)]
    pub url: Option<String>,
    pub query_param: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            listen: "127.0.0.1:3000".to_string(),
            upstream: UpstreamConfig::default(),
            servers: vec![
                server("vidcloud", &["SUB", "ENGLISH", "HINDI", "JAPANESE", "TAMIL"]),
                server("streamwish", &["SUB", "ENGLISH", "HINDI"]),
                server("mp4upload", &["SUB", "ENGLISH"]),
            ],
            search: vec![
                SearchProviderConfig {
                    name: "animeworld".to_string(),
                    url: None,
                    query_param: "query".to_string(),
                },
                SearchProviderConfig {
                    name: "tanime".to_string(),
                    url: None,
                    query_param: "q".to_string(),
                },
            ],
        }
    }
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            animeworld_url: DEFAULT_ANIMEWORLD_URL.to_string(),
            tanime_url: DEFAULT_TANIME_URL.to_string(),
            proxy_url: DEFAULT_PROXY_URL.to_string(),
            probe_timeout_secs: 15,
            listing_timeout_secs: 10,
            alternate_servers: vec!["streamwish".to_string(), "mp4upload".to_string()],
        }
    }
}

fn server(name: &str, languages: &[&str]) -> ServerInfo {
    ServerInfo {
        name: name.to_string(),
        languages: languages.iter().map(|l| l.to_string()).collect(),
    }
}

impl Config {
    /// Get config file path (~/.config/zanime/config.toml)
    pub fn path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("zanime").join("config.toml"))
    }

    /// Load config, then apply environment overrides
    ///
    /// An explicit path must exist. Without one, a missing default file
    /// falls back to built-in defaults.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let mut config = match explicit {
            Some(path) => Self::from_file(path)?,
            None => match Self::path().filter(|p| p.exists()) {
                Some(path) => Self::from_file(&path)?,
                None => Self::default(),
            },
        };
        config.apply_env();
        config.normalize();
        Ok(config)
    }

    /// Parse a TOML config file
    pub fn from_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let mut config: Config = toml::from_str(&raw)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;
        config.normalize();
        Ok(config)
    }

    /// Environment variables win over the file
    pub fn apply_env(&mut self) {
        if let Ok(listen) = std::env::var("ZANIME_LISTEN") {
            self.listen = listen;
        }
        if let Ok(url) = std::env::var("ZANIME_ANIMEWORLD_URL") {
            self.upstream.animeworld_url = url;
        }
        if let Ok(url) = std::env::var("ZANIME_TANIME_URL") {
            self.upstream.tanime_url = url;
        }
        if let Ok(url) = std::env::var("ZANIME_PROXY_URL") {
            self.upstream.proxy_url = url;
        }
    }

    /// Config with every upstream (and the proxy) pointed at one base URL
    pub fn with_upstream_base(base_url: &str) -> Self {
        let mut config = Self::default();
        config.upstream.animeworld_url = base_url.to_string();
        config.upstream.tanime_url = format!("{}/tanime", base_url.trim_end_matches('/'));
        config.normalize();
        config
    }

    /// Resolved endpoint for a search provider
    pub fn search_url(&self, provider: &SearchProviderConfig) -> String {
        if let Some(url) = &provider.url {
            return url.clone();
        }
        match provider.name.as_str() {
            "tanime" => format!("{}/search", self.upstream.tanime_url),
            _ => format!("{}/api/search", self.upstream.animeworld_url),
        }
    }

    fn normalize(&mut self) {
        for url in [
            &mut self.upstream.animeworld_url,
            &mut self.upstream.tanime_url,
            &mut self.upstream.proxy_url,
        ] {
            let trimmed = url.trim_end_matches('/').len();
            url.truncate(trimmed);
        }
    }
}

impl UpstreamConfig {
    pub fn probe_timeout(&self) -> Duration {
        Duration::from_secs(self.probe_timeout_secs)
    }

    pub fn listing_timeout(&self) -> Duration {
        Duration::from_secs(self.listing_timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_config_default() {
        let config = Config::default();
        assert_eq!(config.listen, "127.0.0.1:3000");
        assert_eq!(config.upstream.proxy_url, "https://m38u.vercel.app");
        assert_eq!(config.upstream.probe_timeout(), Duration::from_secs(15));
        assert_eq!(config.upstream.alternate_servers, vec!["streamwish", "mp4upload"]);
        assert_eq!(config.servers.len(), 3);
    }

    #[test]
    fn test_from_file_fills_missing_fields_and_trims_slashes() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
listen = "0.0.0.0:8080"

[upstream]
proxy_url = "https://proxy.example/"
probe_timeout_secs = 20
"#
        )
        .unwrap();

        let config = Config::from_file(file.path()).unwrap();
        assert_eq!(config.listen, "0.0.0.0:8080");
        assert_eq!(config.upstream.proxy_url, "https://proxy.example");
        assert_eq!(config.upstream.probe_timeout_secs, 20);
        assert_eq!(config.upstream.animeworld_url, DEFAULT_ANIMEWORLD_URL);
        assert_eq!(config.search.len(), 2);
    }

    #[test]
    fn test_from_file_rejects_malformed_toml() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "listen = [not toml").unwrap();
        assert!(Config::from_file(file.path()).is_err());
    }

    #[test]
    fn test_load_missing_explicit_path_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope.toml");
        assert!(Config::load(Some(&missing)).is_err());
    }

    #[test]
    fn test_search_url_defaults() {
        let config = Config::default();
        assert_eq!(
            config.search_url(&config.search[0]),
            "https://animeworlda.vercel.app/api/search"
        );
        assert_eq!(
            config.search_url(&config.search[1]),
            "https://tanime.tv/api/search"
        );
    }
}
