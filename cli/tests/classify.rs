use std::path::Path;

use anyhow::Result;
use predicates::str::contains;
use pretty_assertions::assert_eq;
use serde_json::Value as JsonValue;
use serde_json::json;
use tempfile::TempDir;

fn outreach_command(outreach_home: &Path) -> Result<assert_cmd::Command> {
    let mut cmd = assert_cmd::Command::cargo_bin("outreach")?;
    cmd.env("OUTREACH_HOME", outreach_home)
        .env_remove("OUTREACH_API_BASE_URL");
    Ok(cmd)
}

fn stdout_json(output: std::process::Output) -> Result<JsonValue> {
    assert!(output.status.success(), "command failed: {output:?}");
    Ok(serde_json::from_slice(&output.stdout)?)
}

#[test]
fn governance_reports_executed_campaigns_as_read_only() -> Result<()> {
    let home = TempDir::new()?;
    let output = outreach_command(home.path())?
        .args([
            "classify",
            "governance",
            "--status",
            "completed",
            "--blocking",
            "NO_LEADS_PERSISTED",
        ])
        .output()?;
    assert_eq!(stdout_json(output)?, json!({ "governance": "EXECUTED_READ_ONLY" }));
    Ok(())
}

#[test]
fn governance_requires_runnable_flag() -> Result<()> {
    let home = TempDir::new()?;
    let blocked = outreach_command(home.path())?
        .args(["classify", "governance", "--status", "RUNNABLE"])
        .output()?;
    assert_eq!(stdout_json(blocked)?, json!({ "governance": "BLOCKED" }));

    let ready = outreach_command(home.path())?
        .args(["classify", "governance", "--status", "RUNNABLE", "--runnable"])
        .output()?;
    assert_eq!(stdout_json(ready)?, json!({ "governance": "APPROVED_READY" }));
    Ok(())
}

#[test]
fn readiness_without_payload_is_unknown() -> Result<()> {
    let home = TempDir::new()?;
    let output = outreach_command(home.path())?
        .args(["classify", "readiness"])
        .output()?;
    assert_eq!(stdout_json(output)?, json!({ "readiness": "UNKNOWN" }));
    Ok(())
}

#[test]
fn readiness_kill_switch_is_not_ready() -> Result<()> {
    let home = TempDir::new()?;
    let output = outreach_command(home.path())?
        .args([
            "classify",
            "readiness",
            "--payload",
            r#"{"is_ready":true,"mailbox_healthy":true,"kill_switch_enabled":true}"#,
        ])
        .output()?;
    assert_eq!(stdout_json(output)?, json!({ "readiness": "NOT_READY" }));
    Ok(())
}

#[test]
fn record_meta_is_classified() -> Result<()> {
    let home = TempDir::new()?;
    let output = outreach_command(home.path())?
        .args([
            "classify",
            "record",
            "--meta",
            r#"{"source_system":"ods","validation_status":"failed"}"#,
        ])
        .output()?;
    assert_eq!(
        stdout_json(output)?,
        json!({ "provenance": "CANONICAL", "confidence": "BLOCKED" })
    );
    Ok(())
}

#[test]
fn malformed_json_is_rejected() -> Result<()> {
    let home = TempDir::new()?;
    outreach_command(home.path())?
        .args(["classify", "record", "--meta", "{not json"])
        .assert()
        .failure()
        .stderr(contains("--meta must be valid JSON"));
    Ok(())
}
