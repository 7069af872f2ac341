//! zanime - anime stream resolution service
//!
//! # Usage
//!
//! ```bash
//! # Start the HTTP server
//! zanime
//! zanime serve --listen 0.0.0.0:3000
//!
//! # CLI mode (for automation)
//! zanime resolve 666243 1
//! zanime search "frieren" --json
//! ```

use anyhow::Result;
use clap::Parser;

use zanime::cli::{Cli, Command, ExitCode, Output};
use zanime::config::Config;
use zanime::{commands, server, telemetry};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // One-shot commands keep the terminal quiet unless RUST_LOG says otherwise
    let default_filter = if cli.is_cli_mode() { "warn" } else { "info" };
    telemetry::init(default_filter)?;

    let output = Output::new(&cli);
    let mut config = match Config::load(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            let code = output.error(format!("{:#}", e), ExitCode::InvalidArgs);
            std::process::exit(code.into());
        }
    };

    match cli.command {
        None => server::serve(config).await,
        Some(Command::Serve(cmd)) => {
            if let Some(listen) = cmd.listen {
                config.listen = listen;
            }
            server::serve(config).await
        }
        Some(command) => {
            let exit_code = run_cli(command, &config, &output).await;
            std::process::exit(exit_code.into());
        }
    }
}

/// Run a one-shot command and return its exit code
async fn run_cli(command: Command, config: &Config, output: &Output) -> ExitCode {
    match command {
        Command::Resolve(cmd) => commands::resolve_cmd(cmd, config, output).await,

        Command::Search(cmd) => commands::search_cmd(cmd, config, output).await,

        Command::Episodes(cmd) => commands::episodes_cmd(cmd, config, output).await,

        Command::Servers(cmd) => commands::servers_cmd(cmd, config, output),

        // Handled before dispatch
        Command::Serve(_) => ExitCode::Success,
    }
}
