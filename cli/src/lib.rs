pub mod classify_cmd;
pub mod state_cmd;
pub mod watch_cmd;

use anyhow::Context;
use anyhow::Result;
use clap::Parser;
use clap::Subcommand;
use outreach_backend_client::Client;
use outreach_core::SyncConfig;
use outreach_core::sync::ExecutionCache;
use outreach_core::sync::StateFetcher;
use serde::Serialize;
use std::sync::Arc;

/// Inspect campaign execution state and run the classifiers from a terminal.
#[derive(Debug, Parser)]
#[command(name = "outreach", version)]
pub struct Cli {
    /// Backend API base URL. Overrides config.toml and OUTREACH_API_BASE_URL.
    #[arg(long = "base-url", value_name = "URL", global = true)]
    pub base_url: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Fetch the execution state of a campaign once.
    State(state_cmd::StateCli),
    /// Follow a campaign's execution state until polling stops.
    Watch(watch_cmd::WatchCli),
    /// Evaluate the pure classifiers on ad hoc input.
    Classify(classify_cmd::ClassifyCli),
}

pub async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Command::State(state) => state_cmd::run(state, cli.base_url).await,
        Command::Watch(watch) => watch_cmd::run(watch, cli.base_url).await,
        Command::Classify(classify) => classify_cmd::run(classify),
    }
}

pub(crate) fn resolve_config(base_url: Option<String>) -> Result<SyncConfig> {
    let config = SyncConfig::load().context("failed to load sync config")?;
    match base_url {
        Some(base_url) => config
            .with_base_url(base_url)
            .context("invalid --base-url"),
        None => Ok(config),
    }
}

pub(crate) fn build_cache(config: &SyncConfig) -> Result<ExecutionCache> {
    let client = Client::new(&config.base_url)
        .with_context(|| format!("failed to build client for {}", config.base_url))?;
    let fetcher: Arc<dyn StateFetcher> = Arc::new(client);
    Ok(ExecutionCache::new(fetcher, config.cache_config()))
}

pub(crate) fn print_json<T: Serialize>(value: &T, pretty: bool) -> Result<()> {
    let rendered = if pretty {
        serde_json::to_string_pretty(value)?
    } else {
        serde_json::to_string(value)?
    };
    println!("{rendered}");
    Ok(())
}
