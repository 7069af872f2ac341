//! CLI Command Tests
//!
//! Tests argument parsing, JSON output format, exit codes and the one-shot
//! commands against a mocked upstream.

// =============================================================================
// CLI Argument Parsing Tests
// =============================================================================

mod cli_parsing {
    use clap::Parser;
    use zanime::cli::{Cli, Command};
    use zanime::models::Language;

    #[test]
    fn test_global_flags_anywhere() {
        let cli = Cli::parse_from([
            "zanime",
            "search",
            "frieren",
            "--json",
            "--quiet",
            "--config",
            "/tmp/zanime.toml",
        ]);
        assert!(cli.json);
        assert!(cli.quiet);
        assert_eq!(
            cli.config.as_deref().map(|p| p.to_string_lossy().into_owned()),
            Some("/tmp/zanime.toml".to_string())
        );
        match cli.command {
            Some(Command::Search(cmd)) => {
                assert_eq!(cmd.query, "frieren");
                assert!(cmd.limit.is_none());
            }
            _ => panic!("Expected Search command"),
        }
    }

    #[test]
    fn test_aliases() {
        let cli = Cli::parse_from(["zanime", "r", "666243", "1"]);
        assert!(matches!(cli.command, Some(Command::Resolve(_))));

        let cli = Cli::parse_from(["zanime", "ep", "frieren"]);
        assert!(matches!(cli.command, Some(Command::Episodes(_))));
    }

    #[test]
    fn test_resolve_language_is_case_insensitive() {
        let cli = Cli::parse_from(["zanime", "resolve", "21", "1", "--lang", "MALAYALAM"]);
        match cli.command {
            Some(Command::Resolve(cmd)) => assert_eq!(cmd.lang, Some(Language::Malayalam)),
            _ => panic!("Expected Resolve command"),
        }
    }

    #[test]
    fn test_servers_requires_episode() {
        assert!(Cli::try_parse_from(["zanime", "servers", "21"]).is_err());
    }
}

// =============================================================================
// JSON Output Tests
// =============================================================================

mod json_output {
    use zanime::cli::{ExitCode, JsonOutput};

    #[test]
    fn test_success_omits_error_and_exit_code() {
        let output = JsonOutput::success(vec!["a", "b"]);
        let json = serde_json::to_value(&output).unwrap();
        assert_eq!(json["data"][1], "b");
        assert!(json.get("error").is_none());
        assert!(json.get("exit_code").is_none());
    }

    #[test]
    fn test_error_carries_exit_code() {
        let output = JsonOutput::<()>::error_msg("Anime not found: x", ExitCode::NotFound);
        let json = serde_json::to_value(&output).unwrap();
        assert_eq!(json["error"], "Anime not found: x");
        assert_eq!(json["exit_code"], 4);
        assert!(json.get("data").is_none());
    }
}

// =============================================================================
// Command Handler Tests
// =============================================================================

mod command_handlers {
    use mockito::Server;
    use zanime::cli::{EpisodesCmd, ExitCode, Output, ResolveCmd, ServersCmd};
    use zanime::commands;
    use zanime::config::Config;

    fn quiet_json() -> Output {
        Output {
            json: true,
            quiet: true,
        }
    }

    fn resolve(id: &str, episode: &str) -> ResolveCmd {
        ResolveCmd {
            id: id.to_string(),
            episode: episode.to_string(),
            anilist: false,
            server: "vidcloud".to_string(),
            audio: "sub".to_string(),
            lang: None,
        }
    }

    #[tokio::test]
    async fn test_resolve_rejects_bad_episode() {
        let config = Config::with_upstream_base("http://127.0.0.1:1");
        let code = commands::resolve_cmd(resolve("x", "0"), &config, &quiet_json()).await;
        assert_eq!(code, ExitCode::InvalidArgs);
    }

    #[tokio::test]
    async fn test_resolve_succeeds_even_on_fallback() {
        let mut config = Config::with_upstream_base("http://127.0.0.1:1");
        config.upstream.probe_timeout_secs = 2;
        let code = commands::resolve_cmd(resolve("x", "1"), &config, &quiet_json()).await;
        assert_eq!(code, ExitCode::Success);
    }

    #[tokio::test]
    async fn test_episodes_exit_codes() {
        let mut server = Server::new_async().await;
        server
            .mock("GET", "/api/series/frieren")
            .with_status(200)
            .with_body(r#"{"title": "Frieren", "totalEpisodes": 28}"#)
            .create_async()
            .await;
        server
            .mock("GET", "/api/series/missing")
            .with_status(404)
            .create_async()
            .await;
        server
            .mock("GET", "/api/series/down")
            .with_status(500)
            .create_async()
            .await;

        let config = Config::with_upstream_base(&server.url());
        let output = quiet_json();
        let episodes = |id: &str| EpisodesCmd { id: id.to_string() };

        assert_eq!(
            commands::episodes_cmd(episodes("frieren"), &config, &output).await,
            ExitCode::Success
        );
        assert_eq!(
            commands::episodes_cmd(episodes("missing"), &config, &output).await,
            ExitCode::NotFound
        );
        assert_eq!(
            commands::episodes_cmd(episodes("down"), &config, &output).await,
            ExitCode::NetworkError
        );
    }

    #[test]
    fn test_servers_command() {
        let config = Config::default();
        let output = quiet_json();

        let ok = ServersCmd {
            anilist_id: "21".to_string(),
            episode: "5".to_string(),
        };
        assert_eq!(commands::servers_cmd(ok, &config, &output), ExitCode::Success);

        let bad = ServersCmd {
            anilist_id: "21".to_string(),
            episode: "five".to_string(),
        };
        assert_eq!(commands::servers_cmd(bad, &config, &output), ExitCode::InvalidArgs);
    }
}
