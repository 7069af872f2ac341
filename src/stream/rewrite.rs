//! Proxy rewriting for segmented playlists
//!
//! Playlist URLs are wrapped as `{proxy}/proxy?url={encoded}` so the
//! browser fetches them through the rewriting proxy. Progressive files are
//! left untouched. Rewriting an already rewritten source is a no-op.

use crate::models::StreamSource;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProxyRewriter {
    base: String,
}

impl ProxyRewriter {
    pub fn new(base: impl Into<String>) -> Self {
        Self {
            base: base.into().trim_end_matches('/').to_string(),
        }
    }

    fn prefix(&self) -> String {
        format!("{}/proxy?url=", self.base)
    }

    /// Proxied form of `url`
    pub fn proxied_url(&self, url: &str) -> String {
        format!("{}{}", self.prefix(), urlencoding::encode(url))
    }

    /// The target of a URL that already points at this proxy
    pub fn unwrap_proxied(&self, url: &str) -> Option<String> {
        let encoded = url.strip_prefix(&self.prefix())?;
        urlencoding::decode(encoded).ok().map(|target| target.into_owned())
    }

    /// Rewrite one source
    pub fn rewrite(&self, mut source: StreamSource) -> StreamSource {
        if !source.media_kind.is_playlist() {
            return source;
        }

        if let Some(target) = self.unwrap_proxied(&source.url) {
            if source.original_url.is_none() {
                source.original_url = Some(target);
            }
            return source;
        }

        let original = std::mem::take(&mut source.url);
        source.url = self.proxied_url(&original);
        source.original_url = Some(original);
        source
    }

    pub fn rewrite_all(&self, sources: Vec<StreamSource>) -> Vec<StreamSource> {
        sources.into_iter().map(|s| self.rewrite(s)).collect()
    }
}
