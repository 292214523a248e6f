use anyhow::{Context, Result};
use serde::Serialize;
use weave_core::corpus::write_jsonl;
use weave_core::services::{PartitionStats, ScoreMode};

use crate::commands::{emit, load_predictions, open_context, run_name_for, run_stage};
use crate::{hash_inputs, resolve_against};

#[derive(Debug, Serialize)]
pub struct ScoreSummary {
    pub run_id: i64,
    pub mode: ScoreMode,
    pub entries: usize,
    pub scored: usize,
    pub skipped_lines: usize,
    pub stats: PartitionStats,
    pub output: String,
}

fn fmt_mean(mean: Option<f64>) -> String {
    mean.map_or_else(|| "n/a".to_string(), |m| format!("{m:.4}"))
}

/// Attach precision/recall to every entry of a prediction corpus.
pub fn score_command(
    root: &str,
    predictions: &str,
    mode: Option<ScoreMode>,
    rescore_all: bool,
    json: bool,
) -> Result<()> {
    let ctx = open_context(root)?;
    let mut settings = ctx.config.settings.clone();
    if let Some(mode) = mode {
        settings.score_mode = mode;
    }
    let scorer = settings.scorer();

    let predictions_path = resolve_against(&ctx.layout.root, predictions);
    let input_hash = hash_inputs(&[&predictions_path])?;

    let summary = run_stage(&ctx, "score", &run_name_for(&predictions_path), &input_hash, |run| {
        let (mut entries, skipped_lines) = load_predictions(&predictions_path)?;
        let scored = scorer.score_entries(&mut entries, rescore_all);
        let stats = PartitionStats::from_samples(
            entries.iter().map(|e| (e.precision.unwrap_or(0.0), e.recall.unwrap_or(0.0))),
        );

        let output = run.output_dir.join("scored.jsonl");
        write_jsonl(&output, &entries)
            .with_context(|| format!("Failed to write scored corpus to {}", output.display()))?;

        Ok(ScoreSummary {
            run_id: run.id,
            mode: scorer.mode,
            entries: entries.len(),
            scored,
            skipped_lines,
            stats,
            output: output.display().to_string(),
        })
    })?;

    emit(&summary, json, |s| {
        println!("Scored predictions (run {}, {} mode):", s.run_id, s.mode);
        println!(
            "  Entries: {} ({} newly scored, {} lines skipped)",
            s.entries, s.scored, s.skipped_lines
        );
        println!("  Mean precision: {}", fmt_mean(s.stats.precision));
        println!("  Mean recall: {}", fmt_mean(s.stats.recall));
        println!("  Output: {}", s.output);
    })
}
