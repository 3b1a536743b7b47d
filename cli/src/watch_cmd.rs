use anyhow::Result;
use anyhow::bail;
use clap::Parser;
use outreach_core::ExecutionSummary;
use outreach_core::sync::ControllerSnapshot;
use outreach_core::sync::ExecutionController;
use outreach_core::sync::LoadPhase;
use serde::Serialize;
use std::time::Duration;
use tracing::info;

#[derive(Debug, Parser)]
pub struct WatchCli {
    /// Campaign identifier.
    #[arg(long = "campaign", value_name = "ID")]
    campaign: String,
    /// Load once and exit without polling.
    #[arg(long = "no-poll", default_value_t = false)]
    no_poll: bool,
    /// Polling interval override in milliseconds.
    #[arg(long = "interval-ms", value_name = "MS")]
    interval_ms: Option<u64>,
}

#[derive(Debug, Serialize)]
struct WatchLine<'a> {
    #[serde(flatten)]
    snapshot: &'a ControllerSnapshot,
    summary: ExecutionSummary,
}

pub async fn run(cli: WatchCli, base_url: Option<String>) -> Result<()> {
    let mut config = crate::resolve_config(base_url)?;
    if let Some(interval_ms) = cli.interval_ms {
        config = config.with_poll_interval(Duration::from_millis(interval_ms))?;
    }
    let cache = crate::build_cache(&config)?;
    let mut polling = config.polling_config();
    polling.enabled = !cli.no_poll;

    let controller = ExecutionController::new(cache, cli.campaign.clone(), polling);
    let mut rx = controller.subscribe();
    controller.start();

    let last = loop {
        let snapshot = rx.borrow_and_update().clone();
        if snapshot.phase != LoadPhase::Loading {
            let line = WatchLine {
                snapshot: &snapshot,
                summary: ExecutionSummary::from_state(&snapshot.state),
            };
            crate::print_json(&line, false)?;
            if !snapshot.polling {
                break snapshot;
            }
        }

        tokio::select! {
            changed = rx.changed() => {
                if changed.is_err() {
                    break snapshot;
                }
            }
            _ = tokio::signal::ctrl_c() => {
                info!("interrupted; stopping watch for {}", cli.campaign);
                controller.stop();
                return Ok(());
            }
        }
    };
    controller.stop();

    if let Some(error) = last.error {
        bail!(
            "execution state for {} unavailable ({}): {}",
            cli.campaign,
            error.kind,
            error.message
        );
    }
    Ok(())
}
