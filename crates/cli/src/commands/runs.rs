use anyhow::{anyhow, Context, Result};
use serde::Serialize;
use weave_core::db::RunEntry;

use crate::commands::open_context;

#[derive(Debug, Serialize)]
pub struct RunDetails {
    #[serde(flatten)]
    pub run: RunEntry,
    pub report: Option<serde_json::Value>,
}

/// List recorded runs, oldest first, optionally only one kind.
pub fn list_runs_command(root: &str, kind: Option<&str>, json: bool) -> Result<()> {
    let ctx = open_context(root)?;
    let runs = ctx.db.list_runs(kind).context("Failed to list runs")?;

    if json {
        println!("{}", serde_json::to_string_pretty(&runs)?);
        return Ok(());
    }
    if runs.is_empty() {
        println!("No runs recorded.");
        return Ok(());
    }
    println!("Runs:");
    for run in &runs {
        let r = &run.record;
        println!(
            "- #{} {} '{}' [{}] started {}{}",
            run.id,
            r.kind,
            r.name,
            r.status,
            r.started_at,
            r.finished_at.as_deref().map(|f| format!(", finished {f}")).unwrap_or_default()
        );
    }
    Ok(())
}

/// Show one run and its stored report, if any.
pub fn show_run_command(root: &str, id: i64, json: bool) -> Result<()> {
    let ctx = open_context(root)?;
    let run = ctx
        .db
        .get_run(id)
        .context("Failed to load run")?
        .ok_or_else(|| anyhow!("Run {id} not found"))?;
    let report = match ctx.db.load_run_report(id).context("Failed to load run report")? {
        Some(body) => Some(serde_json::from_str(&body).context("Stored report is not valid JSON")?),
        None => None,
    };
    let details = RunDetails { run, report };

    if json {
        println!("{}", serde_json::to_string_pretty(&details)?);
        return Ok(());
    }
    let r = &details.run.record;
    println!("Run #{}", details.run.id);
    println!("  Kind: {}", r.kind);
    println!("  Name: {}", r.name);
    println!("  Status: {}", r.status);
    println!("  Input hash: {}", r.input_hash);
    println!("  Started: {}", r.started_at);
    println!("  Finished: {}", r.finished_at.as_deref().unwrap_or("-"));
    println!("  Output dir: {}", r.output_dir.as_deref().unwrap_or("-"));
    if let Some(report) = &details.report {
        println!("  Report:");
        println!("{}", serde_json::to_string_pretty(report)?);
    }
    Ok(())
}
