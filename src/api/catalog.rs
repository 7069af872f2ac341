//! Catalog search fan-out
//!
//! Queries every configured search provider concurrently and merges the
//! answers in provider order. A failing provider is reported in the
//! provider status list and contributes no hits.

use futures::future::join_all;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, warn};

use super::{build_http_client, UpstreamError};
use crate::config::Config;
use crate::models::{ProviderStatus, SearchHit, SearchResponse};

/// A resolved search endpoint
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchProvider {
    pub name: String,
    pub url: String,
    pub query_param: String,
}

/// Multi-provider catalog search
pub struct CatalogSearch {
    providers: Vec<SearchProvider>,
    client: reqwest::Client,
}

impl CatalogSearch {
    pub fn new(providers: Vec<SearchProvider>, timeout: Duration) -> Self {
        Self {
            providers,
            client: build_http_client(timeout),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        let providers = config
            .search
            .iter()
            .map(|p| SearchProvider {
                name: p.name.clone(),
                url: config.search_url(p),
                query_param: p.query_param.clone(),
            })
            .collect();
        Self::new(providers, config.upstream.listing_timeout())
    }

    pub fn providers(&self) -> &[SearchProvider] {
        &self.providers
    }

    /// Search every provider; never fails as a whole
    pub async fn search(&self, query: &str) -> SearchResponse {
        let answers = join_all(
            self.providers
                .iter()
                .map(|provider| self.search_one(provider, query)),
        )
        .await;

        let mut combined = Vec::new();
        let mut statuses = Vec::with_capacity(self.providers.len());

        for (provider, answer) in self.providers.iter().zip(answers) {
            match answer {
                Ok(items) => {
                    statuses.push(ProviderStatus {
                        name: provider.name.clone(),
                        ok: true,
                        count: items.len(),
                        error: None,
                    });
                    combined.extend(
                        items
                            .into_iter()
                            .map(|item| SearchHit::tagged(provider.name.clone(), item)),
                    );
                }
                Err(err) => {
                    warn!(provider = %provider.name, error = %err, "search provider failed");
                    statuses.push(ProviderStatus {
                        name: provider.name.clone(),
                        ok: false,
                        count: 0,
                        error: Some(err.to_string()),
                    });
                }
            }
        }

        SearchResponse {
            query: query.to_string(),
            combined,
            providers: statuses,
        }
    }

    async fn search_one(
        &self,
        provider: &SearchProvider,
        query: &str,
    ) -> Result<Vec<Value>, UpstreamError> {
        debug!(provider = %provider.name, url = %provider.url, "searching");

        let response = self
            .client
            .get(&provider.url)
            .query(&[(provider.query_param.as_str(), query)])
            .send()
            .await?;

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
        let value: Value = serde_json::from_str(&body)
            .map_err(|e| UpstreamError::Decode(format!("JSON parse error: {}", e)))?;
        Ok(extract_items(value))
    }
}

/// Results arrive as a bare array or wrapped in `results`/`data`
fn extract_items(body: Value) -> Vec<Value> {
    match body {
        Value::Array(items) => items,
        Value::Object(mut map) => ["results", "data"]
            .iter()
            .find_map(|key| match map.remove(*key) {
                Some(Value::Array(items)) => Some(items),
                _ => None,
            })
            .unwrap_or_default(),
        _ => Vec::new(),
    }
}
