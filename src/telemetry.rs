//! Tracing subscriber setup
//!
//! Filter defaults to `info` and is overridden by `RUST_LOG`. Output goes to
//! stderr so JSON on stdout stays parseable.

use anyhow::{anyhow, Context, Result};
use tracing_subscriber::EnvFilter;

pub fn init(default_filter: &str) -> Result<()> {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_filter))
        .context("failed to construct tracing filter")?;

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|err| anyhow!("failed to initialize tracing subscriber: {err}"))?;

    Ok(())
}
