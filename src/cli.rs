//! CLI - Command Line Interface for zanime
//!
//! Runs the HTTP server by default. Every resolution operation the server
//! exposes is also scriptable, with JSON-parseable output.
//!
//! # Examples
//!
//! ```bash
//! # Serve the HTTP API
//! zanime serve --listen 0.0.0.0:3000
//!
//! # Resolve a stream
//! zanime resolve 666243 1 --server vidcloud
//! zanime resolve 21 7 --anilist --lang hindi --json
//!
//! # Catalog
//! zanime search "frieren"
//! zanime episodes frieren
//! zanime servers 21 7
//! ```

use clap::{Args, Parser, Subcommand};
use serde::{Deserialize, Serialize};
use std::io::IsTerminal;
use std::path::PathBuf;

use crate::models::Language;

// =============================================================================
// Exit Codes
// =============================================================================

/// Exit codes for CLI operations (semantic for scripting)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum ExitCode {
    /// Success
    Success = 0,
    /// General error
    Error = 1,
    /// Invalid arguments
    InvalidArgs = 2,
    /// Network error
    NetworkError = 3,
    /// Content not found
    NotFound = 4,
}

impl From<ExitCode> for i32 {
    fn from(code: ExitCode) -> i32 {
        code as i32
    }
}

// =============================================================================
// Main CLI Structure
// =============================================================================

/// zanime - anime stream resolution service
///
/// Run without arguments to start the HTTP server.
/// Use subcommands for one-shot resolution and scripting.
#[derive(Parser, Debug)]
#[command(
    name = "zanime",
    version,
    author = "Gorka & Hermes",
    about = "Anime stream resolution service",
    long_about = "Resolves anime episodes into playable stream descriptors, \
                  routing playlists through a rewriting proxy.\n\n\
                  Run without arguments to start the HTTP server.\n\
                  Use subcommands for automation and scripting.",
    after_help = "EXAMPLES:\n\
                  zanime                              Start the HTTP server\n\
                  zanime resolve 666243 1             Resolve episode 1\n\
                  zanime resolve 21 7 --anilist       Resolve by AniList id\n\
                  zanime search \"frieren\" --json      Search the catalogs"
)]
pub struct Cli {
    /// Output format as JSON (default for non-TTY)
    #[arg(long, short = 'j', global = true)]
    pub json: bool,

    /// Suppress non-essential output
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,

    /// Path to config file
    #[arg(long, short = 'c', global = true)]
    pub config: Option<PathBuf>,

    /// Subcommand to run (omit to serve)
    #[command(subcommand)]
    pub command: Option<Command>,
}

impl Cli {
    /// Check if running a one-shot command rather than the server
    pub fn is_cli_mode(&self) -> bool {
        !matches!(self.command, None | Some(Command::Serve(_)))
    }

    /// Check if JSON output should be used
    pub fn should_json(&self) -> bool {
        self.json || !std::io::stdout().is_terminal()
    }
}

// =============================================================================
// Subcommands
// =============================================================================

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run the HTTP server
    Serve(ServeCmd),

    /// Resolve a stream descriptor for an episode
    #[command(visible_alias = "r")]
    Resolve(ResolveCmd),

    /// Search every configured catalog
    #[command(visible_alias = "s")]
    Search(SearchCmd),

    /// List episodes of a title
    #[command(visible_alias = "ep")]
    Episodes(EpisodesCmd),

    /// Show the server catalog for an episode
    Servers(ServersCmd),
}

// =============================================================================
// Serve Command
// =============================================================================

/// Run the HTTP API
#[derive(Args, Debug, Default)]
pub struct ServeCmd {
    /// Listen address (overrides config)
    #[arg(long, short = 'l')]
    pub listen: Option<String>,
}

// =============================================================================
// Resolve Command
// =============================================================================

/// Resolve an episode into playable sources
#[derive(Args, Debug)]
pub struct ResolveCmd {
    /// Content id (native, or AniList with --anilist)
    #[arg(required = true)]
    pub id: String,

    /// Episode number
    #[arg(required = true)]
    pub episode: String,

    /// Treat the id as an AniList id
    #[arg(long, short = 'a')]
    pub anilist: bool,

    /// Delivery server tag
    #[arg(long, short = 's', default_value = "vidcloud")]
    pub server: String,

    /// Audio track tag
    #[arg(long, short = 'A', default_value = "sub")]
    pub audio: String,

    /// Narrow sources to a language
    #[arg(long, short = 'L', value_parser = parse_language)]
    pub lang: Option<Language>,
}

/// Parse a language name for `--lang`
pub fn parse_language(name: &str) -> Result<Language, String> {
    Language::from_name(name).ok_or_else(|| {
        let known: Vec<&str> = Language::ALL.iter().map(|l| l.name()).collect();
        format!("unknown language '{}' (expected one of: {})", name, known.join(", "))
    })
}

// =============================================================================
// Catalog Commands
// =============================================================================

/// Search catalogs by title
#[derive(Args, Debug)]
pub struct SearchCmd {
    /// Search query
    #[arg(required = true)]
    pub query: String,

    /// Maximum number of merged results
    #[arg(long, short = 'l')]
    pub limit: Option<usize>,
}

/// List the episodes of a title
#[derive(Args, Debug)]
pub struct EpisodesCmd {
    /// Native content id
    #[arg(required = true)]
    pub id: String,
}

/// Server catalog for an AniList episode
#[derive(Args, Debug)]
pub struct ServersCmd {
    /// AniList id
    #[arg(required = true)]
    pub anilist_id: String,

    /// Episode number
    #[arg(required = true)]
    pub episode: String,
}

// =============================================================================
// JSON Output Types
// =============================================================================

/// Generic JSON output wrapper with status
#[derive(Debug, Serialize, Deserialize)]
pub struct JsonOutput<T: Serialize> {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "is_zero")]
    pub exit_code: i32,
}

fn is_zero(n: &i32) -> bool {
    *n == 0
}

impl<T: Serialize> JsonOutput<T> {
    /// Create success output with data
    pub fn success(data: T) -> Self {
        Self {
            data: Some(data),
            error: None,
            exit_code: 0,
        }
    }

    /// Create error output (no data)
    pub fn error_msg(msg: impl Into<String>, code: ExitCode) -> JsonOutput<()> {
        JsonOutput::<()> {
            data: None,
            error: Some(msg.into()),
            exit_code: code.into(),
        }
    }
}

// =============================================================================
// Output Helpers
// =============================================================================

/// Output handler for consistent formatting
pub struct Output {
    pub json: bool,
    pub quiet: bool,
}

impl Output {
    pub fn new(cli: &Cli) -> Self {
        Self {
            json: cli.should_json(),
            quiet: cli.quiet,
        }
    }

    /// Print success data
    pub fn print<T: Serialize>(&self, data: T) -> anyhow::Result<()> {
        if self.json {
            let output = JsonOutput::success(data);
            println!("{}", serde_json::to_string_pretty(&output)?);
        } else {
            println!("{}", serde_json::to_string_pretty(&data)?);
        }
        Ok(())
    }

    /// Print error and return exit code
    pub fn error(&self, msg: impl Into<String>, code: ExitCode) -> ExitCode {
        let msg = msg.into();
        if self.json {
            let output = JsonOutput::<()>::error_msg(&msg, code);
            if let Ok(json) = serde_json::to_string_pretty(&output) {
                eprintln!("{}", json);
            }
        } else if !self.quiet {
            eprintln!("Error: {}", msg);
        }
        code
    }

    /// Print info message (suppressed in quiet mode)
    pub fn info(&self, msg: impl std::fmt::Display) {
        if !self.quiet && !self.json {
            eprintln!("{}", msg);
        }
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn verify_cli() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_no_args_serves() {
        let cli = Cli::parse_from(["zanime"]);
        assert!(cli.command.is_none());
        assert!(!cli.is_cli_mode());
    }

    #[test]
    fn test_serve_is_not_cli_mode() {
        let cli = Cli::parse_from(["zanime", "serve", "--listen", "0.0.0.0:8080"]);
        assert!(!cli.is_cli_mode());
        match cli.command {
            Some(Command::Serve(cmd)) => assert_eq!(cmd.listen.as_deref(), Some("0.0.0.0:8080")),
            _ => panic!("Expected Serve command"),
        }
    }

    #[test]
    fn test_resolve_defaults() {
        let cli = Cli::parse_from(["zanime", "resolve", "666243", "1"]);
        assert!(cli.is_cli_mode());
        match cli.command {
            Some(Command::Resolve(cmd)) => {
                assert_eq!(cmd.id, "666243");
                assert_eq!(cmd.episode, "1");
                assert!(!cmd.anilist);
                assert_eq!(cmd.server, "vidcloud");
                assert_eq!(cmd.audio, "sub");
                assert!(cmd.lang.is_none());
            }
            _ => panic!("Expected Resolve command"),
        }
    }

    #[test]
    fn test_resolve_anilist_with_language() {
        let cli = Cli::parse_from([
            "zanime", "--json", "resolve", "21", "7", "--anilist", "-s", "streamwish", "-L", "Hindi",
        ]);
        assert!(cli.json);
        match cli.command {
            Some(Command::Resolve(cmd)) => {
                assert!(cmd.anilist);
                assert_eq!(cmd.server, "streamwish");
                assert_eq!(cmd.lang, Some(Language::Hindi));
            }
            _ => panic!("Expected Resolve command"),
        }
    }

    #[test]
    fn test_unknown_language_rejected() {
        let result = Cli::try_parse_from(["zanime", "resolve", "21", "7", "--lang", "klingon"]);
        assert!(result.is_err());
        assert!(parse_language("klingon").unwrap_err().contains("telugu"));
    }

    #[test]
    fn test_exit_codes() {
        assert_eq!(i32::from(ExitCode::Success), 0);
        assert_eq!(i32::from(ExitCode::Error), 1);
        assert_eq!(i32::from(ExitCode::InvalidArgs), 2);
        assert_eq!(i32::from(ExitCode::NetworkError), 3);
        assert_eq!(i32::from(ExitCode::NotFound), 4);
    }
}
