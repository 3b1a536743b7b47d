use anyhow::Context;
use anyhow::Result;
use clap::Parser;
use clap::Subcommand;
use outreach_core::classify::GovernanceState;
use outreach_core::classify::ReadinessLevel;
use outreach_core::classify::ReadinessPayload;
use outreach_core::classify::RecordMeta;
use outreach_core::classify::classify_governance;
use outreach_core::classify::classify_record;
use outreach_core::classify::compute_readiness_level;
use serde::Serialize;
use serde_json::Value;

#[derive(Debug, Parser)]
pub struct ClassifyCli {
    #[command(subcommand)]
    command: ClassifyCommand,
}

#[derive(Debug, Subcommand)]
enum ClassifyCommand {
    /// Governance state for a campaign status.
    Governance {
        /// Backend campaign status, e.g. RUNNABLE.
        #[arg(long = "status", value_name = "STATUS")]
        status: String,
        /// Blocking reason reported by the backend (repeatable).
        #[arg(long = "blocking", value_name = "REASON")]
        blocking: Vec<String>,
        /// The backend reports the campaign as runnable.
        #[arg(long = "runnable", default_value_t = false)]
        runnable: bool,
    },
    /// Readiness level for a readiness payload; omit the payload to model an absent one.
    Readiness {
        #[arg(long = "payload", value_name = "JSON")]
        payload: Option<String>,
    },
    /// Provenance and confidence for record metadata.
    Record {
        #[arg(long = "meta", value_name = "JSON")]
        meta: String,
    },
}

#[derive(Debug, Serialize)]
struct GovernanceOutput {
    governance: GovernanceState,
}

#[derive(Debug, Serialize)]
struct ReadinessOutput {
    readiness: ReadinessLevel,
}

pub fn run(cli: ClassifyCli) -> Result<()> {
    match cli.command {
        ClassifyCommand::Governance {
            status,
            blocking,
            runnable,
        } => crate::print_json(
            &GovernanceOutput {
                governance: classify_governance(&status, blocking.as_slice(), runnable),
            },
            false,
        ),
        ClassifyCommand::Readiness { payload } => {
            let payload = payload
                .map(|raw| parse_json(&raw, "--payload"))
                .transpose()?
                .and_then(|value| ReadinessPayload::from_json(&value));
            crate::print_json(
                &ReadinessOutput {
                    readiness: compute_readiness_level(payload.as_ref()),
                },
                false,
            )
        }
        ClassifyCommand::Record { meta } => {
            let meta = RecordMeta::from_json(&parse_json(&meta, "--meta")?);
            crate::print_json(&classify_record(&meta), false)
        }
    }
}

fn parse_json(raw: &str, flag: &str) -> Result<Value> {
    serde_json::from_str(raw).with_context(|| format!("{flag} must be valid JSON"))
}
