use anyhow::{Context, Result};
use serde::Serialize;
use weave_core::corpus::write_jsonl;
use weave_core::services::combine;

use crate::commands::{emit, load_predictions, open_context, run_name_for, run_stage};
use crate::{hash_inputs, resolve_against};

#[derive(Debug, Serialize)]
pub struct CombineSummary {
    pub run_id: i64,
    pub major_entries: usize,
    pub default_entries: usize,
    pub entries: usize,
    pub substituted: usize,
    pub skipped_lines: usize,
    pub output: String,
}

/// Fill sentinel predictions of `major` from `default`.
pub fn combine_command(root: &str, major: &str, default: &str, json: bool) -> Result<()> {
    let ctx = open_context(root)?;
    let major_path = resolve_against(&ctx.layout.root, major);
    let default_path = resolve_against(&ctx.layout.root, default);
    let input_hash = hash_inputs(&[&major_path, &default_path])?;

    let summary = run_stage(&ctx, "combine", &run_name_for(&major_path), &input_hash, |run| {
        let (major_entries, major_skipped) = load_predictions(&major_path)?;
        let (default_entries, default_skipped) = load_predictions(&default_path)?;
        let (major_count, default_count) = (major_entries.len(), default_entries.len());
        let outcome = combine(major_entries, default_entries);

        let output = run.output_dir.join("combined.jsonl");
        let written = write_jsonl(&output, &outcome.entries)
            .with_context(|| format!("Failed to write combined corpus to {}", output.display()))?;

        Ok(CombineSummary {
            run_id: run.id,
            major_entries: major_count,
            default_entries: default_count,
            entries: written,
            substituted: outcome.substituted,
            skipped_lines: major_skipped + default_skipped,
            output: output.display().to_string(),
        })
    })?;

    emit(&summary, json, |s| {
        println!("Combined predictions (run {}):", s.run_id);
        println!("  Major: {}  Default: {}", s.major_entries, s.default_entries);
        println!("  Entries: {} ({} filled from default)", s.entries, s.substituted);
        if s.skipped_lines > 0 {
            println!("  Lines skipped: {}", s.skipped_lines);
        }
        println!("  Output: {}", s.output);
    })
}
