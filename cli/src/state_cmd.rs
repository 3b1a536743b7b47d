use anyhow::Context;
use anyhow::Result;
use clap::Parser;
use outreach_core::ExecutionSummary;
use outreach_core::sync::CacheStats;
use outreach_protocol::ExecutionState;
use serde::Serialize;

#[derive(Debug, Parser)]
pub struct StateCli {
    /// Campaign identifier.
    #[arg(long = "campaign", value_name = "ID")]
    campaign: String,
    /// Render pretty JSON instead of a single line.
    #[arg(long = "pretty", default_value_t = false)]
    pretty: bool,
    /// Include cache counters in the output.
    #[arg(long = "stats", default_value_t = false)]
    stats: bool,
}

#[derive(Debug, Serialize)]
struct StatePayload<'a> {
    state: &'a ExecutionState,
    summary: ExecutionSummary,
    #[serde(skip_serializing_if = "Option::is_none")]
    stats: Option<CacheStats>,
}

pub async fn run(cli: StateCli, base_url: Option<String>) -> Result<()> {
    let config = crate::resolve_config(base_url)?;
    let cache = crate::build_cache(&config)?;
    let state = cache
        .get(&cli.campaign, false)
        .await
        .with_context(|| format!("failed to fetch execution state for {}", cli.campaign))?;

    let payload = StatePayload {
        state: &state,
        summary: ExecutionSummary::from_state(&state),
        stats: cli.stats.then(|| cache.stats()),
    };
    crate::print_json(&payload, cli.pretty)
}
