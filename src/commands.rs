//! CLI Command Handlers
//!
//! Implements all CLI commands by calling the same services the HTTP routes
//! use. Each handler takes CLI args, the loaded config and Output, and
//! returns ExitCode.

use crate::api::{AnimeWorldClient, CatalogSearch, UpstreamError};
use crate::cli::{EpisodesCmd, ExitCode, Output, ResolveCmd, SearchCmd, ServersCmd};
use crate::config::Config;
use crate::models::ServerCatalog;
use crate::stream::resolver::parse_episode;
use crate::stream::{StreamRequest, StreamResolver};

// =============================================================================
// Resolve Command
// =============================================================================

pub async fn resolve_cmd(cmd: ResolveCmd, config: &Config, output: &Output) -> ExitCode {
    let episode = match parse_episode(&cmd.episode) {
        Ok(episode) => episode,
        Err(e) => return output.error(e.to_string(), ExitCode::InvalidArgs),
    };

    let request = if cmd.anilist {
        StreamRequest::external(cmd.id, episode)
    } else {
        StreamRequest::native(cmd.id, episode)
    }
    .with_server(cmd.server)
    .with_audio(cmd.audio)
    .with_language(cmd.lang);

    output.info(format!(
        "Resolving {} episode {} on {}...",
        request.content_id, request.episode, request.server
    ));

    let resolver = StreamResolver::from_config(config);
    let descriptor = resolver.resolve(&request).await;

    if descriptor.is_fallback {
        output.info("No upstream answered; using fallback test streams");
    } else if let Some(endpoint) = &descriptor.resolved_from {
        output.info(format!("Resolved from {}", endpoint));
    }

    if !output.json && !output.quiet {
        for source in &descriptor.sources {
            output.info(format!("  {}", source));
        }
    }

    if let Err(e) = output.print(&descriptor) {
        return output.error(format!("Failed to serialize: {}", e), ExitCode::Error);
    }
    ExitCode::Success
}

// =============================================================================
// Search Command
// =============================================================================

pub async fn search_cmd(cmd: SearchCmd, config: &Config, output: &Output) -> ExitCode {
    let search = CatalogSearch::from_config(config);

    output.info(format!("Searching for: {}", cmd.query));

    let mut response = search.search(&cmd.query).await;

    // Every provider down is a network failure, not an empty result
    if !response.providers.is_empty() && response.providers.iter().all(|p| !p.ok) {
        let reasons: Vec<String> = response
            .providers
            .iter()
            .map(|p| format!("{}: {}", p.name, p.error.as_deref().unwrap_or("failed")))
            .collect();
        return output.error(
            format!("Search failed ({})", reasons.join("; ")),
            ExitCode::NetworkError,
        );
    }

    if let Some(limit) = cmd.limit {
        response.combined.truncate(limit);
    }

    if let Err(e) = output.print(&response) {
        return output.error(format!("Failed to serialize: {}", e), ExitCode::Error);
    }
    ExitCode::Success
}

// =============================================================================
// Episodes Command
// =============================================================================

pub async fn episodes_cmd(cmd: EpisodesCmd, config: &Config, output: &Output) -> ExitCode {
    let client = AnimeWorldClient::from_config(&config.upstream);

    output.info(format!("Fetching episodes for: {}", cmd.id));

    match client.episode_listing(&cmd.id).await {
        Ok(listing) => {
            if let Err(e) = output.print(&listing) {
                return output.error(format!("Failed to serialize: {}", e), ExitCode::Error);
            }
            ExitCode::Success
        }
        Err(e) if e.is_not_found() => {
            output.error(format!("Anime not found: {}", cmd.id), ExitCode::NotFound)
        }
        Err(e) => output.error(format!("Episode listing failed: {}", e), exit_code_for(&e)),
    }
}

fn exit_code_for(err: &UpstreamError) -> ExitCode {
    match err {
        UpstreamError::Decode(_) => ExitCode::Error,
        _ => ExitCode::NetworkError,
    }
}

// =============================================================================
// Servers Command
// =============================================================================

pub fn servers_cmd(cmd: ServersCmd, config: &Config, output: &Output) -> ExitCode {
    let episode = match parse_episode(&cmd.episode) {
        Ok(episode) => episode,
        Err(e) => return output.error(e.to_string(), ExitCode::InvalidArgs),
    };

    let catalog = ServerCatalog::new(&cmd.anilist_id, episode, &config.servers);
    if let Err(e) = output.print(&catalog) {
        return output.error(format!("Failed to serialize: {}", e), ExitCode::Error);
    }
    ExitCode::Success
}
